//! Transaction test harness.
//!
//! One run creates the test table, inserts a committed batch of two rows,
//! then a second batch whose last insert is rejected by the server, rolls
//! back, counts what survived and drops the table again.
//!
//! ```text
//! NORMAL --(statement error)--> FAILED --ROLLBACK--> count
//! NORMAL --(all statements ok)-----------------> count
//! ```
//!
//! Every failure cause takes the same path; nothing is retried.

use std::fmt;
use std::io::Write;

use crate::error::{ProbeError, Result};
use crate::executor::Executor;
use crate::statement::{self, BEGIN, COMMIT, CREATE_TABLE, DROP_TABLE, MALFORMED_VALUE, ROLLBACK};

/// Row count a correctly behaving warehouse leaves behind.
pub const EXPECTED_ROWS: i64 = 2;

/// How batches are delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    /// Rely on the session's own transaction handling; only `COMMIT` is sent.
    Implicit,
    /// Open each batch with `BEGIN`.
    ExplicitBegin,
}

impl TransactionMode {
    pub fn uses_explicit_begin(self) -> bool {
        self == TransactionMode::ExplicitBegin
    }
}

/// Classification of the observed row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No rows at all
    Empty,
    /// First batch durable, second batch rolled back
    Expected,
    /// Anything else, with the literal count
    Unexpected(i64),
}

impl Outcome {
    pub fn classify(count: i64) -> Self {
        match count {
            0 => Outcome::Empty,
            EXPECTED_ROWS => Outcome::Expected,
            n => Outcome::Unexpected(n),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Empty => write!(f, "The table is empty, thus no inserts worked at all."),
            Outcome::Expected => write!(
                f,
                "There are {} rows in the table, thus transactions work as expected.",
                EXPECTED_ROWS
            ),
            Outcome::Unexpected(n) => write!(
                f,
                "There are {} rows in the table, thus transactions don't work.",
                n
            ),
        }
    }
}

/// First statement of the insert sequence that the server rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementFailure {
    pub sql: String,
    pub error: ProbeError,
}

/// What one harness run observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessReport {
    pub mode: TransactionMode,
    /// Set when the sequence short-circuited
    pub failure: Option<StatementFailure>,
    /// Whether `ROLLBACK` was sent
    pub rolled_back: bool,
    pub count: i64,
    pub outcome: Outcome,
}

/// Statements issued between `CREATE TABLE` and the rollback decision.
pub fn insert_sequence(mode: TransactionMode) -> Vec<String> {
    let mut steps = Vec::with_capacity(9);
    if mode.uses_explicit_begin() {
        steps.push(BEGIN.to_string());
    }
    steps.push(statement::insert_value(1));
    steps.push(statement::insert_value(2));
    steps.push(COMMIT.to_string());
    if mode.uses_explicit_begin() {
        steps.push(BEGIN.to_string());
    }
    steps.push(statement::insert_value(3));
    steps.push(statement::insert_value(4));
    steps.push(statement::insert(MALFORMED_VALUE));
    steps.push(COMMIT.to_string());
    steps
}

/// Runs the transaction protocol on a borrowed session.
pub struct TransactionHarness<'a, E: Executor + ?Sized> {
    session: &'a E,
    mode: TransactionMode,
}

impl<'a, E: Executor + ?Sized> TransactionHarness<'a, E> {
    pub fn new(session: &'a E, mode: TransactionMode) -> Self {
        Self { session, mode }
    }

    /// Executes one full run and writes the classification sentence to `out`.
    ///
    /// A failing `CREATE TABLE` is returned immediately. Once the table
    /// exists, `DROP TABLE` is always attempted before returning.
    pub async fn run<W: Write + Send>(&self, out: &mut W) -> Result<HarnessReport> {
        self.session.execute(CREATE_TABLE).await?;
        tracing::debug!(mode = ?self.mode, "test table created");

        let exercised = self.exercise(out).await;
        let dropped = self.session.execute(DROP_TABLE).await;

        match (exercised, dropped) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(drop_err)) => {
                tracing::error!("Failed to drop test table after error: {}", drop_err);
                Err(e)
            }
        }
    }

    async fn exercise<W: Write + Send>(&self, out: &mut W) -> Result<HarnessReport> {
        let mut failure = None;
        for sql in insert_sequence(self.mode) {
            if let Err(error) = self.session.execute(&sql).await {
                tracing::warn!("Statement '{}' failed, rolling back: {}", sql, error);
                failure = Some(StatementFailure { sql, error });
                break;
            }
        }

        let rolled_back = failure.is_some();
        if rolled_back {
            self.session.execute(ROLLBACK).await?;
        }

        let count = self.session.count().await?;
        let outcome = Outcome::classify(count);
        tracing::info!(mode = ?self.mode, count, ?outcome, "harness run classified");
        writeln!(out, "{}", outcome)?;

        Ok(HarnessReport {
            mode: self.mode,
            failure,
            rolled_back,
            count,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Row;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted session: fails the listed statements and answers the count
    /// query with a fixed value.
    struct ScriptedSession {
        log: Mutex<Vec<String>>,
        failing: Vec<String>,
        count: i64,
    }

    impl ScriptedSession {
        fn new(failing: &[&str], count: i64) -> Self {
            Self {
                log: Mutex::new(Vec::new()),
                failing: failing.iter().map(|s| s.to_string()).collect(),
                count,
            }
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Executor for ScriptedSession {
        async fn query(&self, sql: &str) -> Result<Vec<Row>> {
            self.log.lock().unwrap().push(sql.to_string());
            if self.failing.iter().any(|f| f == sql) {
                return Err(ProbeError::statement(sql, "100038", "rejected"));
            }
            if sql == statement::COUNT_ROWS {
                return Ok(vec![vec![Some(self.count.to_string())]]);
            }
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_outcome_messages() {
        assert_eq!(
            Outcome::classify(0).to_string(),
            "The table is empty, thus no inserts worked at all."
        );
        assert_eq!(
            Outcome::classify(2).to_string(),
            "There are 2 rows in the table, thus transactions work as expected."
        );
        assert_eq!(
            Outcome::classify(5).to_string(),
            "There are 5 rows in the table, thus transactions don't work."
        );
        assert_eq!(Outcome::classify(-1), Outcome::Unexpected(-1));
    }

    #[test]
    fn test_insert_sequence_shapes() {
        let implicit = insert_sequence(TransactionMode::Implicit);
        assert_eq!(implicit.len(), 7);
        assert!(!implicit.iter().any(|s| s == BEGIN));

        let explicit = insert_sequence(TransactionMode::ExplicitBegin);
        assert_eq!(explicit[0], BEGIN);
        assert_eq!(explicit[4], BEGIN);
        assert_eq!(explicit.last().map(String::as_str), Some(COMMIT));
    }

    #[tokio::test]
    async fn test_failure_short_circuits_to_rollback() {
        let malformed = statement::insert(MALFORMED_VALUE);
        let session = ScriptedSession::new(&[&malformed], 2);
        let mut out = Vec::new();

        let report = TransactionHarness::new(&session, TransactionMode::ExplicitBegin)
            .run(&mut out)
            .await
            .unwrap();

        assert!(report.rolled_back);
        assert_eq!(report.failure.as_ref().map(|f| f.sql.as_str()), Some(malformed.as_str()));
        assert_eq!(report.outcome, Outcome::Expected);

        let log = session.log();
        let pos = log.iter().position(|s| *s == malformed).unwrap();
        // No COMMIT after the rejected insert: straight to rollback, count, drop.
        assert_eq!(
            &log[pos + 1..],
            &[ROLLBACK, statement::COUNT_ROWS, DROP_TABLE]
        );
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "There are 2 rows in the table, thus transactions work as expected.\n"
        );
    }

    #[tokio::test]
    async fn test_early_failure_stops_remaining_inserts() {
        let session = ScriptedSession::new(&["INSERT INTO example VALUES (2)"], 1);
        let mut out = Vec::new();

        let report = TransactionHarness::new(&session, TransactionMode::Implicit)
            .run(&mut out)
            .await
            .unwrap();

        assert_eq!(report.outcome, Outcome::Unexpected(1));
        assert!(!session.log().iter().any(|s| s == "INSERT INTO example VALUES (3)"));
    }

    #[tokio::test]
    async fn test_clean_sequence_skips_rollback() {
        let session = ScriptedSession::new(&[], 5);
        let mut out = Vec::new();

        let report = TransactionHarness::new(&session, TransactionMode::Implicit)
            .run(&mut out)
            .await
            .unwrap();

        assert!(!report.rolled_back);
        assert!(report.failure.is_none());
        assert!(!session.log().iter().any(|s| s == ROLLBACK));
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "There are 5 rows in the table, thus transactions don't work.\n"
        );
    }

    #[tokio::test]
    async fn test_rollback_failure_propagates_after_drop() {
        let malformed = statement::insert(MALFORMED_VALUE);
        let session = ScriptedSession::new(&[&malformed, ROLLBACK], 2);
        let mut out = Vec::new();

        let err = TransactionHarness::new(&session, TransactionMode::Implicit)
            .run(&mut out)
            .await
            .unwrap_err();

        assert_eq!(err.code(), Some("100038"));
        assert_eq!(session.log().last().map(String::as_str), Some(DROP_TABLE));
        assert!(out.is_empty());
    }

    fn failed_sql(err: &ProbeError) -> Option<&str> {
        match err {
            ProbeError::Statement { sql, .. } => Some(sql.as_str()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_drop_failure_after_clean_run_is_returned() {
        let malformed = statement::insert(MALFORMED_VALUE);
        let session = ScriptedSession::new(&[&malformed, DROP_TABLE], 2);
        let mut out = Vec::new();

        let err = TransactionHarness::new(&session, TransactionMode::Implicit)
            .run(&mut out)
            .await
            .unwrap_err();

        assert_eq!(failed_sql(&err), Some(DROP_TABLE));
        assert_eq!(session.log().last().map(String::as_str), Some(DROP_TABLE));
        // classification was already printed before the drop
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "There are 2 rows in the table, thus transactions work as expected.\n"
        );
    }

    #[tokio::test]
    async fn test_count_failure_still_drops_table() {
        let session = ScriptedSession::new(&[statement::COUNT_ROWS], 2);
        let mut out = Vec::new();

        let err = TransactionHarness::new(&session, TransactionMode::Implicit)
            .run(&mut out)
            .await
            .unwrap_err();

        assert_eq!(failed_sql(&err), Some(statement::COUNT_ROWS));
        let log = session.log();
        assert_eq!(
            &log[log.len() - 2..],
            &[statement::COUNT_ROWS, DROP_TABLE]
        );
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_count_error_wins_over_drop_error() {
        let session = ScriptedSession::new(&[statement::COUNT_ROWS, DROP_TABLE], 2);
        let mut out = Vec::new();

        let err = TransactionHarness::new(&session, TransactionMode::ExplicitBegin)
            .run(&mut out)
            .await
            .unwrap_err();

        assert_eq!(failed_sql(&err), Some(statement::COUNT_ROWS));
        assert_eq!(session.log().last().map(String::as_str), Some(DROP_TABLE));
    }

    #[tokio::test]
    async fn test_create_failure_is_fatal() {
        let session = ScriptedSession::new(&[CREATE_TABLE], 0);
        let mut out = Vec::new();

        let result = TransactionHarness::new(&session, TransactionMode::Implicit)
            .run(&mut out)
            .await;

        assert!(result.is_err());
        assert_eq!(session.log(), vec![CREATE_TABLE.to_string()]);
    }
}
