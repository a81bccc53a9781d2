//! Service layer
//!
//! Services hold the agent's state: the supervised process and the buffer
//! its output is collected in. Both are trait-based so the control endpoint
//! can be tested against fakes.

mod log_buffer;
mod process;

// Re-export traits
pub use log_buffer::LogBufferService;
pub use process::ProcessService;

// Re-export implementations
pub use log_buffer::InMemoryLogBuffer;
pub use process::ShellProcessService;
