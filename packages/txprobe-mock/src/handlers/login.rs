//! Password login handler.

use std::sync::Arc;

use hyper::{body::Bytes, Request, Response};
use serde::Deserialize;
use txprobe_core::config::{DEFAULT_DATABASE, DEFAULT_SCHEMA};
use txprobe_core::SessionTarget;
use uuid::Uuid;

use crate::router::{AppState, RouterError};

use super::request_utils::{json_response, parse_query_string, read_request_body_with_timeout};
use super::response::{codes, failure, success, LoginData, SessionInfo};

/// Lifetime advertised for issued tokens; the mock never expires them.
const TOKEN_VALIDITY_SECS: u64 = 3600;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub data: LoginRequestData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct LoginRequestData {
    pub account_name: String,
    pub login_name: String,
    pub password: String,
    pub client_app_id: Option<String>,
    pub client_app_version: Option<String>,
}

/// Authenticates a user and opens a simulated session.
///
/// # Endpoint
/// `POST /session/v1/login-request?databaseName=..&schemaName=..`
///
/// # Request Body
/// ```json
/// {"data": {"ACCOUNT_NAME": "mock", "LOGIN_NAME": "probe", "PASSWORD": "probe"}}
/// ```
///
/// # Response
/// Always **200 OK**. Rejections carry `success: false` and code
/// `390100` (bad credentials) or `390201` (unknown database or schema).
pub async fn login(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let params = parse_query_string(req.uri().query());
    let body = read_request_body_with_timeout(req, state.config.request_timeout_ms).await?;
    let request: LoginRequest = serde_json::from_slice(&body)
        .map_err(|e| RouterError::BadRequest(format!("Invalid login request: {}", e)))?;
    let credentials = request.data;

    let config = &state.config;
    if !credentials.account_name.eq_ignore_ascii_case(&config.account)
        || credentials.login_name != config.username
        || credentials.password != config.password
    {
        tracing::info!(user = %credentials.login_name, "login rejected");
        return json_response(
            200,
            &failure(
                codes::LOGIN_REJECTED,
                "Incorrect username or password was specified.".to_string(),
                serde_json::Value::Null,
            ),
        );
    }

    let target = SessionTarget::new(
        params
            .get("databaseName")
            .map(String::as_str)
            .unwrap_or(DEFAULT_DATABASE),
        params
            .get("schemaName")
            .map(String::as_str)
            .unwrap_or(DEFAULT_SCHEMA),
    );

    let session = match state.warehouse.open_session(&target) {
        Ok(session) => session,
        Err(e) => {
            tracing::info!(%target, "login for unknown target: {}", e);
            return json_response(
                200,
                &failure(codes::DATABASE_UNKNOWN, e.to_string(), serde_json::Value::Null),
            );
        }
    };

    let token = Uuid::new_v4().to_string();
    state
        .sessions
        .lock()
        .map_err(|_| RouterError::InternalError("Session table lock poisoned".to_string()))?
        .insert(token.clone(), Arc::new(session));

    tracing::info!(
        user = %credentials.login_name,
        %target,
        client = credentials.client_app_id.as_deref().unwrap_or("unknown"),
        "session opened"
    );

    json_response(
        200,
        &success(LoginData {
            token,
            master_token: Uuid::new_v4().to_string(),
            validity_in_seconds: TOKEN_VALIDITY_SECS,
            session_info: SessionInfo {
                database_name: target.database.clone(),
                schema_name: target.schema.clone(),
                warehouse_name: params.get("warehouse").cloned(),
                role_name: params.get("roleName").cloned(),
            },
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_accepts_missing_optional_fields() {
        let request: LoginRequest = serde_json::from_str(
            r#"{"data": {"ACCOUNT_NAME": "mock", "LOGIN_NAME": "probe", "PASSWORD": "pw"}}"#,
        )
        .unwrap();
        assert_eq!(request.data.account_name, "mock");
        assert_eq!(request.data.login_name, "probe");
        assert!(request.data.client_app_id.is_none());
    }
}
