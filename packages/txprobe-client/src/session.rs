//! Statement execution on an authenticated session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use txprobe_core::{statement, Executor, Row, SessionTarget};
use uuid::Uuid;

use crate::auth::SessionToken;
use crate::error::{ClientError, Result};
use crate::models::{Envelope, QueryRequest, QueryResponseData};

const ACCEPT_SNOWFLAKE: &str = "application/snowflake";
/// Pause between result polls of a long-running query.
const POLL_INTERVAL_MS: u64 = 250;

/// One authenticated warehouse session.
///
/// Statements are numbered with a per-session sequence id; the session is
/// never closed explicitly.
#[derive(Debug)]
pub struct WarehouseSession {
    http: reqwest::Client,
    base_url: String,
    token: SessionToken,
    target: SessionTarget,
    sequence: AtomicU64,
}

impl WarehouseSession {
    pub(crate) fn new(
        http: reqwest::Client,
        base_url: String,
        token: SessionToken,
        target: SessionTarget,
    ) -> Self {
        Self {
            http,
            base_url,
            token,
            target,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn target(&self) -> &SessionTarget {
        &self.target
    }

    /// Sends one statement and waits for its final result.
    pub async fn run(&self, sql: &str) -> Result<Vec<Row>> {
        let sequence_id = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let request = QueryRequest {
            sql_text: sql.to_string(),
            async_exec: false,
            sequence_id,
            query_submission_time: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default(),
        };

        let sql_preview = statement::log_preview(sql);
        tracing::debug!("[QUERY] #{} \"{}\"", sequence_id, sql_preview);
        let started = Instant::now();

        let url = format!("{}/queries/v1/query-request", self.base_url);
        let builder = self
            .http
            .post(&url)
            .query(&[("requestId", Uuid::new_v4().to_string())])
            .header(reqwest::header::ACCEPT, ACCEPT_SNOWFLAKE)
            .json(&request);
        let mut envelope = self.send(builder).await?;

        while envelope.is_in_progress() {
            let result_url = envelope
                .data
                .as_ref()
                .and_then(|d| d.get_result_url.clone())
                .ok_or_else(|| {
                    ClientError::ProtocolError("query in progress without result URL".to_string())
                })?;
            tokio::time::sleep(tokio::time::Duration::from_millis(POLL_INTERVAL_MS)).await;
            tracing::debug!("[QUERY] #{} polling {}", sequence_id, result_url);
            let builder = self
                .http
                .get(format!("{}{}", self.base_url, result_url))
                .header(reqwest::header::ACCEPT, ACCEPT_SNOWFLAKE);
            envelope = self.send(builder).await?;
        }

        let elapsed_ms = started.elapsed().as_millis();
        if !envelope.success {
            let sql_state = envelope
                .data
                .as_ref()
                .and_then(|d| d.sql_state.clone())
                .unwrap_or_default();
            let code = envelope.code.unwrap_or_default();
            tracing::debug!(
                "[QUERY] #{} rejected code={} duration_ms={}",
                sequence_id,
                code,
                elapsed_ms
            );
            return Err(ClientError::StatementRejected {
                code,
                sql_state,
                message: envelope.message.unwrap_or_default(),
            });
        }

        let data = envelope.data.unwrap_or_default();
        tracing::debug!(
            "[QUERY] #{} ok rows={} query_id={:?} duration_ms={}",
            sequence_id,
            data.rowset.len(),
            data.query_id,
            elapsed_ms
        );
        Ok(data.rowset)
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<Envelope<QueryResponseData>> {
        let response = self.token.apply_to_request(builder).send().await?;
        let status = response.status();
        let text = response.text().await?;

        match serde_json::from_str::<Envelope<QueryResponseData>>(&text) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => {
                tracing::warn!("[QUERY] Server error: status={} body=\"{}\"", status, text);
                Err(ClientError::ServerError {
                    status: status.as_u16(),
                    message: text,
                })
            }
            Err(e) => Err(ClientError::ProtocolError(format!(
                "unreadable query response: {}",
                e
            ))),
        }
    }
}

#[async_trait]
impl Executor for WarehouseSession {
    async fn query(&self, sql: &str) -> txprobe_core::Result<Vec<Row>> {
        self.run(sql).await.map_err(|e| e.into_probe_error(sql))
    }
}
