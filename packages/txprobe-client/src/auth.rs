//! Password login and session token handling.
//!
//! Exchanges account credentials for a session token and attaches that token
//! to every subsequent request.

use std::fmt;

use txprobe_core::{ConnectionConfig, SessionTarget};
use uuid::Uuid;

use crate::error::{ClientError, Result};
use crate::models::{Envelope, LoginRequest, LoginRequestData, LoginResponseData};

pub const CLIENT_APP_ID: &str = "txprobe";
pub const CLIENT_APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Token returned by a successful login.
#[derive(Clone)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: String) -> Self {
        Self(token)
    }

    /// Attaches the `Authorization` header to a request.
    pub fn apply_to_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header(
            reqwest::header::AUTHORIZATION,
            format!("Snowflake Token=\"{}\"", self.0),
        )
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Query-string parameters of the login request.
fn login_params(config: &ConnectionConfig, target: &SessionTarget) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("databaseName", target.database.clone()),
        ("schemaName", target.schema.clone()),
    ];
    if let Some(warehouse) = &config.warehouse {
        params.push(("warehouse", warehouse.clone()));
    }
    if let Some(role) = &config.role {
        params.push(("roleName", role.clone()));
    }
    params.push(("requestId", Uuid::new_v4().to_string()));
    params
}

/// Logs in with the configured credentials and binds the session to `target`.
pub async fn login(
    http: &reqwest::Client,
    config: &ConnectionConfig,
    target: &SessionTarget,
) -> Result<SessionToken> {
    let url = format!("{}/session/v1/login-request", config.base_url());
    let body = LoginRequest {
        data: LoginRequestData {
            client_app_id: CLIENT_APP_ID.to_string(),
            client_app_version: CLIENT_APP_VERSION.to_string(),
            account_name: config.account.clone(),
            login_name: config.username.clone(),
            password: config.password.clone(),
        },
    };

    tracing::debug!("[LOGIN] POST {} as {} for {}", url, config.username, target);
    let response = http
        .post(&url)
        .query(&login_params(config, target))
        .header(reqwest::header::ACCEPT, "application/json")
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;
    let envelope: Envelope<LoginResponseData> = match serde_json::from_str(&text) {
        Ok(envelope) => envelope,
        Err(_) if !status.is_success() => {
            return Err(ClientError::ServerError {
                status: status.as_u16(),
                message: text,
            })
        }
        Err(e) => {
            return Err(ClientError::ProtocolError(format!(
                "unreadable login response: {}",
                e
            )))
        }
    };

    if !envelope.success {
        return Err(ClientError::LoginRejected {
            code: envelope.code.unwrap_or_default(),
            message: envelope
                .message
                .unwrap_or_else(|| "login failed".to_string()),
        });
    }

    let data = envelope
        .data
        .ok_or_else(|| ClientError::ProtocolError("login response has no data".to_string()))?;
    tracing::debug!(
        "[LOGIN] Session established, validity={:?}s",
        data.validity_in_seconds
    );
    Ok(SessionToken::new(data.token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_params() {
        let mut config = ConnectionConfig::new("acct", "user", "pw");
        let target = SessionTarget::default();
        let params = login_params(&config, &target);
        assert_eq!(params[0], ("databaseName", "DEMO_DB".to_string()));
        assert_eq!(params[1], ("schemaName", "PUBLIC".to_string()));
        assert_eq!(params.len(), 3);

        config.warehouse = Some("COMPUTE_WH".into());
        config.role = Some("SYSADMIN".into());
        let params = login_params(&config, &target);
        assert!(params.contains(&("warehouse", "COMPUTE_WH".to_string())));
        assert!(params.contains(&("roleName", "SYSADMIN".to_string())));
        assert_eq!(params.last().unwrap().0, "requestId");
    }

    #[test]
    fn test_token_is_not_debug_printed() {
        let token = SessionToken::new("abc123".into());
        assert!(!format!("{:?}", token).contains("abc123"));
    }
}
