//! Request and response bodies of the session protocol.

use serde::{Deserialize, Serialize};

/// Response code meaning the query is still running; poll `getResultUrl`.
pub const QUERY_IN_PROGRESS: &str = "333334";
/// Response code for a query still queued on the warehouse.
pub const QUERY_IN_PROGRESS_ASYNC: &str = "333333";

/// Envelope wrapping every response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self.code.as_deref(),
            Some(QUERY_IN_PROGRESS) | Some(QUERY_IN_PROGRESS_ASYNC)
        )
    }
}

/// Body of `POST /session/v1/login-request`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub data: LoginRequestData,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct LoginRequestData {
    pub client_app_id: String,
    pub client_app_version: String,
    pub account_name: String,
    pub login_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponseData {
    pub token: String,
    #[serde(default)]
    pub master_token: Option<String>,
    #[serde(default)]
    pub validity_in_seconds: Option<u64>,
}

/// Body of `POST /queries/v1/query-request`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub sql_text: String,
    pub async_exec: bool,
    pub sequence_id: u64,
    pub query_submission_time: u64,
}

/// Result column description.
#[derive(Debug, Clone, Deserialize)]
pub struct RowType {
    pub name: String,
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub nullable: Option<bool>,
}

/// Query result or failure details; every field is optional because failures
/// carry a different subset than results.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryResponseData {
    pub query_id: Option<String>,
    pub rowtype: Vec<RowType>,
    pub rowset: Vec<Vec<Option<String>>>,
    pub total: Option<u64>,
    pub sql_state: Option<String>,
    pub error_code: Option<String>,
    pub get_result_url: Option<String>,
}
