//! Log buffer service
//!
//! Keeps the most recent output lines of the supervised process in memory so
//! the manager can fetch them over the control endpoint.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Service for collecting process output
pub trait LogBufferService: Send + Sync {
    /// Appends one line, evicting the oldest line when full
    fn push_line(&self, line: String);

    /// Returns the last `lines` lines joined with newlines, or everything when `None`
    ///
    /// Whole lines are dropped from the front until the text fits in
    /// `max_bytes`; a newest line that alone is too long is cut to its end.
    fn tail(&self, lines: Option<usize>, max_bytes: usize) -> String;

    /// Number of buffered lines
    fn len(&self) -> usize;
}

/// Bounded in-memory ring of output lines
#[derive(Clone)]
pub struct InMemoryLogBuffer {
    buffer: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl InMemoryLogBuffer {
    /// Creates a new buffer holding at most `capacity` lines
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<String>> {
        // A panicking writer cannot leave a half-pushed line behind
        self.buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LogBufferService for InMemoryLogBuffer {
    fn push_line(&self, line: String) {
        let mut buffer = self.lock();
        while buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(line);
    }

    fn tail(&self, lines: Option<usize>, max_bytes: usize) -> String {
        let buffer = self.lock();
        let wanted = lines.map_or(buffer.len(), |n| n.min(buffer.len()));

        let mut taken = 0;
        let mut used = 0;
        for line in buffer.iter().rev().take(wanted) {
            let cost = line.len() + 1;
            if used + cost > max_bytes {
                break;
            }
            used += cost;
            taken += 1;
        }

        if taken == 0 {
            return match buffer.back() {
                Some(last) if wanted > 0 => suffix_within(&format!("{}\n", last), max_bytes),
                _ => String::new(),
            };
        }

        let mut out = String::with_capacity(used);
        for line in buffer.iter().skip(buffer.len() - taken) {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

/// The last `max_bytes` bytes of `text`, starting on a character boundary
fn suffix_within(text: &str, max_bytes: usize) -> String {
    let mut cut = text.len().saturating_sub(max_bytes);
    while !text.is_char_boundary(cut) {
        cut += 1;
    }
    text[cut..].to_string()
}
