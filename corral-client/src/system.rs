//! System API endpoints

use crate::ManagerClient;
use crate::error::Result;
use corral_core::dto::system::VersionInfo;

impl ManagerClient {
    /// Build information of the manager
    pub async fn version(&self) -> Result<VersionInfo> {
        let response = self.client.get(self.url("version")).send().await?;

        self.handle_response(response).await
    }
}
