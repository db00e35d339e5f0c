//! Response envelopes of the session protocol.

use serde::Serialize;

/// Response codes the endpoint emits outside of statement rejections.
pub mod codes {
    /// Incorrect user name or password
    pub const LOGIN_REJECTED: &str = "390100";
    /// Requested database or schema is unknown
    pub const DATABASE_UNKNOWN: &str = "390201";
    /// Session token missing or expired
    pub const SESSION_GONE: &str = "390112";
    /// Query accepted but still running
    pub const QUERY_IN_PROGRESS: &str = "333334";
}

/// Envelope wrapping every response body.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: T,
    pub code: Option<String>,
    pub message: Option<String>,
    pub success: bool,
}

/// Wraps a successful payload.
pub fn success<T: Serialize>(data: T) -> Envelope<T> {
    Envelope {
        data,
        code: None,
        message: None,
        success: true,
    }
}

/// Wraps a failure with its code and message.
pub fn failure<T: Serialize>(code: &str, message: String, data: T) -> Envelope<T> {
    Envelope {
        data,
        code: Some(code.to_string()),
        message: Some(message),
        success: false,
    }
}

/// Envelope telling the client to poll `getResultUrl`.
pub fn in_progress(query_id: &str) -> Envelope<QueryData> {
    Envelope {
        data: QueryData {
            query_id: query_id.to_string(),
            get_result_url: Some(result_url(query_id)),
            ..QueryData::default()
        },
        code: Some(codes::QUERY_IN_PROGRESS.to_string()),
        message: Some(
            "Asynchronous execution in progress. Use provided query id to perform query monitoring."
                .to_string(),
        ),
        success: true,
    }
}

pub fn result_url(query_id: &str) -> String {
    format!("/queries/{}/result", query_id)
}

/// Payload of a successful login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub token: String,
    pub master_token: String,
    pub validity_in_seconds: u64,
    pub session_info: SessionInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub database_name: String,
    pub schema_name: String,
    pub warehouse_name: Option<String>,
    pub role_name: Option<String>,
}

/// Result column description.
#[derive(Debug, Serialize)]
pub struct RowType {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub nullable: bool,
}

/// Statement result, or the details of its rejection.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryData {
    pub query_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rowtype: Vec<RowType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rowset: Vec<Vec<Option<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get_result_url: Option<String>,
}

impl QueryData {
    /// Describes `rowset`, naming columns by position.
    pub fn rows(query_id: &str, rowset: Vec<Vec<Option<String>>>) -> Self {
        let width = rowset.first().map(Vec::len).unwrap_or(0);
        let rowtype = (1..=width)
            .map(|i| RowType {
                name: format!("COLUMN{}", i),
                type_name: "text".to_string(),
                nullable: true,
            })
            .collect();
        Self {
            query_id: query_id.to_string(),
            rowtype,
            total: Some(rowset.len() as u64),
            rowset,
            ..Self::default()
        }
    }

    pub fn rejected(query_id: &str, code: &str, sql_state: &str) -> Self {
        Self {
            query_id: query_id.to_string(),
            error_code: Some(code.to_string()),
            sql_state: Some(sql_state.to_string()),
            ..Self::default()
        }
    }
}
