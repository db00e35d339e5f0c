//! Request utilities for the protocol endpoints.

use std::collections::HashMap;

use http_body_util::BodyExt;
use hyper::header::{HeaderMap, AUTHORIZATION};
use hyper::{body::Bytes, Request, Response};
use percent_encoding::percent_decode_str;
use serde::Serialize;
use tokio::time;
use txprobe_core::sim::codes;

use crate::router::RouterError;

const TOKEN_PREFIX: &str = "Snowflake Token=\"";

/// Helper function to read request body with timeout
pub async fn read_request_body_with_timeout(
    req: Request<hyper::body::Incoming>,
    timeout_ms: u64,
) -> Result<Bytes, RouterError> {
    let timeout_duration = time::Duration::from_millis(timeout_ms);
    let body = time::timeout(timeout_duration, req.collect())
        .await
        .map_err(|_| RouterError::Timeout)?
        .map_err(|e| RouterError::InternalError(format!("Failed to read request body: {}", e)))?;
    Ok(body.to_bytes())
}

/// Serializes `body` into a JSON response.
pub fn json_response<T: Serialize>(status: u16, body: &T) -> Result<Response<Bytes>, RouterError> {
    let json = serde_json::to_vec(body)
        .map_err(|e| RouterError::InternalError(format!("Failed to serialize response: {}", e)))?;
    build_response(status, json)
}

/// Helper to build HTTP response with proper error handling
pub fn build_response(status: u16, json: Vec<u8>) -> Result<Response<Bytes>, RouterError> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Bytes::from(json))
        .map_err(|e| RouterError::InternalError(format!("Failed to build response: {}", e)))
}

/// Decodes a URL query string into key/value pairs.
///
/// Later duplicates win; pairs without `=` are skipped.
pub fn parse_query_string(query_str: Option<&str>) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let Some(query_str) = query_str else {
        return params;
    };

    for pair in query_str.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = value.replace('+', " ");
        let decoded = percent_decode_str(&value).decode_utf8_lossy().into_owned();
        params.insert(key.to_string(), decoded);
    }
    params
}

/// Extracts the session token from `Authorization: Snowflake Token="..."`.
pub fn session_token(headers: &HeaderMap) -> Result<String, RouterError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| RouterError::Unauthorized("Authorization header is missing".to_string()))?;
    let value = header
        .to_str()
        .map_err(|_| RouterError::Unauthorized("Authorization header is not ASCII".to_string()))?;

    value
        .strip_prefix(TOKEN_PREFIX)
        .and_then(|rest| rest.strip_suffix('"'))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| RouterError::Unauthorized("Malformed session token".to_string()))
}

/// SQLSTATE reported alongside a warehouse error code.
pub fn sql_state_for(code: &str) -> &'static str {
    match code {
        codes::NUMERIC_VALUE => "22018",
        codes::DOES_NOT_EXIST => "42S02",
        codes::ALREADY_EXISTS => "42710",
        codes::SYNTAX_ERROR => "42000",
        codes::COLUMN_MISMATCH => "21S01",
        codes::TRANSACTION_INACTIVE => "25000",
        _ => "XX000",
    }
}
