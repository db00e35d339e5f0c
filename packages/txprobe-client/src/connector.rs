use std::time::Duration;

use async_trait::async_trait;
use txprobe_core::{ConnectionConfig, Connector, SessionTarget};

use crate::auth;
use crate::error::Result;
use crate::session::WarehouseSession;

/// Opens password-authenticated sessions for one account.
#[derive(Debug, Clone)]
pub struct WarehouseConnector {
    config: ConnectionConfig,
    http: reqwest::Client,
}

impl WarehouseConnector {
    /// Builds the HTTP client; the configured timeout applies to every request.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(format!("{}/{}", auth::CLIENT_APP_ID, auth::CLIENT_APP_VERSION))
            .build()?;
        Ok(Self { config, http })
    }

    /// Logs in and returns a session bound to `target`.
    pub async fn open(&self, target: &SessionTarget) -> Result<WarehouseSession> {
        let token = auth::login(&self.http, &self.config, target).await?;
        Ok(WarehouseSession::new(
            self.http.clone(),
            self.config.base_url(),
            token,
            target.clone(),
        ))
    }
}

#[async_trait]
impl Connector for WarehouseConnector {
    type Session = WarehouseSession;

    async fn connect(&self, target: &SessionTarget) -> txprobe_core::Result<Self::Session> {
        Ok(self.open(target).await?)
    }
}
