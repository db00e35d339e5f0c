//! Statement submission and result polling handlers.

use std::sync::Arc;

use hyper::{body::Bytes, Request, Response};
use serde::Deserialize;
use txprobe_core::sim::SimulatedSession;
use txprobe_core::{statement, ProbeError};
use uuid::Uuid;

use crate::router::{AppState, PendingResult, RouterError};

use super::request_utils::{
    build_response, json_response, read_request_body_with_timeout, session_token, sql_state_for,
};
use super::response::{failure, in_progress, success, QueryData};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub sql_text: String,
    #[serde(default)]
    pub sequence_id: u64,
    #[serde(default)]
    pub async_exec: bool,
}

fn lookup_session(state: &AppState, token: &str) -> Result<Arc<SimulatedSession>, RouterError> {
    state
        .sessions
        .lock()
        .map_err(|_| RouterError::InternalError("Session table lock poisoned".to_string()))?
        .get(token)
        .cloned()
        .ok_or_else(|| RouterError::Unauthorized("Session no longer exists".to_string()))
}

/// Runs one statement on the caller's session.
///
/// # Endpoint
/// `POST /queries/v1/query-request?requestId=..`
///
/// # Request Body
/// ```json
/// {"sqlText": "SELECT COUNT(*) FROM example", "sequenceId": 3, "asyncExec": false}
/// ```
///
/// # Response
/// - **200 OK**: rows under `data.rowset`, or `success: false` with the
///   warehouse error code when the statement is rejected
/// - **200 OK** with code `333334` when result polling is configured; the
///   statement has already run and its result is released at `getResultUrl`
///
/// # Errors
/// - **401 Unauthorized**: Missing or unknown session token
/// - **400 Bad Request**: Body is not a query request
pub async fn query(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let token = session_token(req.headers())?;
    let session = lookup_session(&state, &token)?;
    let body = read_request_body_with_timeout(req, state.config.request_timeout_ms).await?;
    let request: QueryRequest = serde_json::from_slice(&body)
        .map_err(|e| RouterError::BadRequest(format!("Invalid query request: {}", e)))?;

    let query_id = Uuid::new_v4().to_string();
    tracing::debug!(
        query_id = %query_id,
        sequence_id = request.sequence_id,
        "executing {}",
        statement::log_preview(&request.sql_text)
    );

    let result = session.run(&request.sql_text);
    let final_body = match result {
        Ok(rows) => serde_json::to_vec(&success(QueryData::rows(&query_id, rows))),
        Err(ProbeError::Statement { code, message, .. }) => serde_json::to_vec(&failure(
            &code,
            message,
            QueryData::rejected(&query_id, &code, sql_state_for(&code)),
        )),
        Err(e) => return Err(RouterError::InternalError(e.to_string())),
    }
    .map_err(|e| RouterError::InternalError(format!("Failed to serialize response: {}", e)))?;

    let polls = state.config.result_polls;
    if polls == 0 {
        return build_response(200, final_body);
    }

    state
        .pending
        .lock()
        .map_err(|_| RouterError::InternalError("Pending result lock poisoned".to_string()))?
        .insert(
            query_id.clone(),
            PendingResult {
                token,
                remaining_polls: polls - 1,
                body: final_body,
            },
        );
    json_response(200, &in_progress(&query_id))
}

/// Releases a held-back query result.
///
/// # Endpoint
/// `GET /queries/{query_id}/result`
///
/// # Response
/// - **200 OK**: code `333334` while polls remain, then the final result
///
/// # Errors
/// - **401 Unauthorized**: Token missing or not the session that issued the query
/// - **404 Not Found**: Unknown or already released query id
pub async fn query_result(
    req: Request<hyper::body::Incoming>,
    query_id: &str,
    state: AppState,
) -> Result<Response<Bytes>, RouterError> {
    let token = session_token(req.headers())?;
    let mut pending = state
        .pending
        .lock()
        .map_err(|_| RouterError::InternalError("Pending result lock poisoned".to_string()))?;

    let entry = pending
        .get_mut(query_id)
        .ok_or_else(|| RouterError::NotFound(format!("Query '{}' has no pending result", query_id)))?;
    if entry.token != token {
        return Err(RouterError::Unauthorized(
            "Query belongs to another session".to_string(),
        ));
    }

    if entry.remaining_polls > 0 {
        entry.remaining_polls -= 1;
        return json_response(200, &in_progress(query_id));
    }

    match pending.remove(query_id) {
        Some(entry) => build_response(200, entry.body),
        None => Err(RouterError::NotFound(format!(
            "Query '{}' has no pending result",
            query_id
        ))),
    }
}
