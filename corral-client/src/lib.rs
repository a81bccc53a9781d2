//! Corral HTTP Client
//!
//! A simple, type-safe HTTP client for the Corral manager API.
//!
//! This crate is shared by the CLI and the runner agent (for self-registration)
//! so both speak the exact JSON contract the manager serves.
//!
//! # Example
//!
//! ```no_run
//! use corral_client::ManagerClient;
//!
//! #[tokio::main]
//! async fn main() -> corral_client::Result<()> {
//!     let client = ManagerClient::new("http://localhost:8098");
//!
//!     client
//!         .register_runner("build-01", "http://10.0.0.5:8099", "s3cret")
//!         .await?;
//!
//!     for runner in client.list_runners().await? {
//!         println!("{} is {}", runner.name, runner.status);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
mod runners;
mod system;

// Re-export commonly used types
pub use error::{ClientError, Result};

use corral_core::dto::runner::ActionResponse;
use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the Corral manager API
#[derive(Debug, Clone)]
pub struct ManagerClient {
    /// Base URL of the manager (e.g., "http://localhost:8098")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl ManagerClient {
    /// Create a new manager client
    ///
    /// # Example
    /// ```
    /// use corral_client::ManagerClient;
    ///
    /// let client = ManagerClient::new("http://localhost:8098");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new manager client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the manager
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// Failed requests are turned into `ClientError::ApiError` carrying the
    /// manager's `message`.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(
                status.as_u16(),
                extract_message(&error_text),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle a `{ success, message }` response
    ///
    /// A 2xx answer with `success: false` is still reported as an error.
    async fn handle_action(&self, response: reqwest::Response) -> Result<ActionResponse> {
        let status = response.status().as_u16();
        let body: ActionResponse = self.handle_response(response).await?;

        if !body.success {
            return Err(ClientError::api_error(
                status,
                body.message.unwrap_or_else(|| "Request failed".to_string()),
            ));
        }

        Ok(body)
    }
}

/// Pulls `message` out of a JSON error body, falling back to the raw text
fn extract_message(body: &str) -> String {
    serde_json::from_str::<ActionResponse>(body)
        .ok()
        .and_then(|r| r.message)
        .unwrap_or_else(|| body.trim().to_string())
}
