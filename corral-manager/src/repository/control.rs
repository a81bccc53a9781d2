//! Runner control repository
//!
//! Stateless HTTP client for a runner agent's control endpoint:
//! - Probing process status
//! - Restarting and stopping the supervised process
//!
//! Callers bound every call with their own deadline; dropping the returned
//! future cancels the outbound request.

use async_trait::async_trait;
use corral_core::domain::runner::RunnerRecord;
use corral_core::dto::agent::AgentStatus;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Largest error body kept for diagnostics
const MAX_ERROR_BODY: usize = 4 * 1024;

/// Largest accepted `/status` answer
const MAX_STATUS_BODY: usize = 64 * 1024;

/// Failure talking to a runner
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("runner unreachable: {0}")]
    Unreachable(String),

    #[error("runner rejected the request with status {status}")]
    Rejected { status: u16, body: String },

    #[error("invalid response from runner: {0}")]
    InvalidResponse(String),
}

/// Repository trait for control calls against a runner
#[async_trait]
pub trait RunnerControl: Send + Sync {
    /// Asks the runner whether its process is running
    async fn status(&self, runner: &RunnerRecord) -> Result<AgentStatus, ControlError>;

    /// Asks the runner to restart its process
    async fn restart(&self, runner: &RunnerRecord) -> Result<(), ControlError>;

    /// Asks the runner to stop its process
    async fn stop(&self, runner: &RunnerRecord) -> Result<(), ControlError>;
}

/// HTTP implementation of RunnerControl
pub struct HttpRunnerControl {
    client: Client,
}

impl HttpRunnerControl {
    /// Creates a control client whose connection attempts give up after `connect_timeout`
    pub fn new(connect_timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self { client })
    }

    async fn send_command(&self, runner: &RunnerRecord, command: &str) -> Result<(), ControlError> {
        let url = endpoint(&runner.url, command);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&runner.token)
            .send()
            .await
            .map_err(|e| ControlError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ControlError::Rejected {
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl RunnerControl for HttpRunnerControl {
    async fn status(&self, runner: &RunnerRecord) -> Result<AgentStatus, ControlError> {
        let url = endpoint(&runner.url, "status");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ControlError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ControlError::Rejected {
                status: status.as_u16(),
                body: error_body(response).await,
            });
        }

        let (body, truncated) = read_capped(response, MAX_STATUS_BODY)
            .await
            .map_err(|e| ControlError::InvalidResponse(e.to_string()))?;
        if truncated {
            return Err(ControlError::InvalidResponse(format!(
                "status answer larger than {} bytes",
                MAX_STATUS_BODY
            )));
        }

        serde_json::from_slice::<AgentStatus>(&body)
            .map_err(|e| ControlError::InvalidResponse(e.to_string()))
    }

    async fn restart(&self, runner: &RunnerRecord) -> Result<(), ControlError> {
        self.send_command(runner, "restart").await
    }

    async fn stop(&self, runner: &RunnerRecord) -> Result<(), ControlError> {
        self.send_command(runner, "stop").await
    }
}

/// Joins a runner base URL and a control path
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

/// Reads at most `limit` bytes of a response body
///
/// The flag is set when the runner sent more than `limit` bytes; the rest is
/// never read.
pub(crate) async fn read_capped(
    mut response: reqwest::Response,
    limit: usize,
) -> reqwest::Result<(Vec<u8>, bool)> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = limit - body.len();
        if chunk.len() > room {
            body.extend_from_slice(&chunk[..room]);
            return Ok((body, true));
        }
        body.extend_from_slice(&chunk);
    }
    Ok((body, false))
}

/// Leading part of an error body, for logs
async fn error_body(response: reqwest::Response) -> String {
    match read_capped(response, MAX_ERROR_BODY).await {
        Ok((body, truncated)) => {
            let mut text = String::from_utf8_lossy(&body).into_owned();
            if truncated {
                text.push_str("...");
            }
            text
        }
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corral_core::domain::runner::RunnerStatus;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn control() -> HttpRunnerControl {
        HttpRunnerControl::new(Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        assert_eq!(endpoint("http://a:8099/", "status"), "http://a:8099/status");
        assert_eq!(endpoint("http://a:8099", "stop"), "http://a:8099/stop");
    }

    #[tokio::test]
    async fn test_status_parses_agent_answer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "status": "stopped" })),
            )
            .mount(&server)
            .await;

        let runner = RunnerRecord::new("a", server.uri(), "tok");
        let status = control().status(&runner).await.unwrap();
        assert_eq!(status.status, RunnerStatus::Stopped);
    }

    #[tokio::test]
    async fn test_status_rejects_garbage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>hi</html>"))
            .mount(&server)
            .await;

        let runner = RunnerRecord::new("a", server.uri(), "tok");
        let result = control().status(&runner).await;
        assert!(matches!(result, Err(ControlError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_restart_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/restart"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let runner = RunnerRecord::new("a", server.uri(), "tok");
        control().restart(&runner).await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_reports_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stop"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let runner = RunnerRecord::new("a", server.uri(), "tok");
        let result = control().stop(&runner).await;
        assert!(matches!(
            result,
            Err(ControlError::Rejected { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn test_large_error_body_is_cut() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/restart"))
            .respond_with(ResponseTemplate::new(500).set_body_string("e".repeat(512 * 1024)))
            .mount(&server)
            .await;

        let runner = RunnerRecord::new("a", server.uri(), "tok");
        match control().restart(&runner).await {
            Err(ControlError::Rejected { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), MAX_ERROR_BODY + 3);
                assert!(body.ends_with("..."));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_oversized_status_answer_is_invalid() {
        let server = MockServer::start().await;
        let padding = "x".repeat(MAX_STATUS_BODY);
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "status": "running", "padding": padding })),
            )
            .mount(&server)
            .await;

        let runner = RunnerRecord::new("a", server.uri(), "tok");
        let result = control().status(&runner).await;
        assert!(matches!(result, Err(ControlError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_unreachable_runner() {
        let runner = RunnerRecord::new("a", "http://127.0.0.1:1", "tok");
        let result = control().status(&runner).await;
        assert!(matches!(result, Err(ControlError::Unreachable(_))));
    }
}
