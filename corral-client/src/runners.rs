//! Runner-related API endpoints

use crate::ManagerClient;
use crate::error::{ClientError, Result};
use corral_core::domain::runner::{RunnerRecord, RunnerStatus};
use corral_core::dto::runner::{
    ActionResponse, DeleteRunner, LogsResponse, RegisterRunner, RestartRunner, StatusResponse,
};

impl ManagerClient {
    // =============================================================================
    // Runner Registration & Lifecycle
    // =============================================================================

    /// Register a runner with the manager
    ///
    /// # Arguments
    /// * `name` - Unique name of the runner
    /// * `url` - Base URL of the runner's control endpoint
    /// * `token` - Shared secret needed to delete the runner later
    pub async fn register_runner(&self, name: &str, url: &str, token: &str) -> Result<ActionResponse> {
        tracing::debug!("Registering runner {} at {}", name, url);

        let response = self
            .client
            .post(self.url("runners/register"))
            .json(&RegisterRunner {
                name: name.to_string(),
                url: url.to_string(),
                token: token.to_string(),
            })
            .send()
            .await?;

        self.handle_action(response).await
    }

    /// Restart a runner's process
    pub async fn restart_runner(&self, name: &str) -> Result<ActionResponse> {
        let response = self
            .client
            .post(self.url("runners/restart"))
            .json(&RestartRunner {
                name: name.to_string(),
            })
            .send()
            .await?;

        self.handle_action(response).await
    }

    /// Stop and unregister a runner
    ///
    /// # Arguments
    /// * `name` - The runner to delete
    /// * `token` - Must match the token the runner was registered with
    pub async fn delete_runner(&self, name: &str, token: &str) -> Result<ActionResponse> {
        let response = self
            .client
            .post(self.url("runners/delete"))
            .json(&DeleteRunner {
                name: name.to_string(),
                token: token.to_string(),
            })
            .send()
            .await?;

        self.handle_action(response).await
    }

    // =============================================================================
    // Runner Query
    // =============================================================================

    /// List all registered runners in registration order
    pub async fn list_runners(&self) -> Result<Vec<RunnerRecord>> {
        let response = self.client.get(self.url("runners")).send().await?;

        self.handle_response(response).await
    }

    /// Recent log output of a runner
    pub async fn runner_logs(&self, name: &str) -> Result<String> {
        let response = self
            .client
            .get(self.url("runners/logs"))
            .query(&[("name", name)])
            .send()
            .await?;

        let body: LogsResponse = self.handle_response(response).await?;

        if !body.success {
            return Err(ClientError::api_error(
                200,
                body.message
                    .unwrap_or_else(|| "Failed to fetch logs".to_string()),
            ));
        }

        Ok(body.logs.unwrap_or_default())
    }

    /// Probe a runner now and return its status
    pub async fn runner_status(&self, name: &str) -> Result<RunnerStatus> {
        let response = self
            .client
            .get(self.url("runners/status"))
            .query(&[("name", name)])
            .send()
            .await?;

        let body: StatusResponse = self.handle_response(response).await?;
        Ok(body.status)
    }
}
