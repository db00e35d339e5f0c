//! Session abstractions shared by the live client and the simulator.
//!
//! Every remote call is an `async fn` returning `Result`, so callers read as
//! straight-line code and await each statement before issuing the next.

use async_trait::async_trait;

use crate::config::SessionTarget;
use crate::error::{ProbeError, Result};
use crate::statement::COUNT_ROWS;

/// One result row; cells arrive as text, `None` for SQL NULL.
pub type Row = Vec<Option<String>>;

/// Runs statements on one established session.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Sends one statement and returns its result rows.
    async fn query(&self, sql: &str) -> Result<Vec<Row>>;

    /// Sends one statement and waits for acknowledgement, discarding rows.
    async fn execute(&self, sql: &str) -> Result<()> {
        self.query(sql).await.map(|_| ())
    }

    /// Reads the number of rows in the test table.
    async fn count(&self) -> Result<i64> {
        let rows = self.query(COUNT_ROWS).await?;
        scalar_count(&rows)
    }
}

/// Opens authenticated sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: Executor;

    /// Establishes one session bound to `target`. Errors are fatal to the run.
    async fn connect(&self, target: &SessionTarget) -> Result<Self::Session>;
}

/// Extracts a single integer from a one-row, one-column result.
pub fn scalar_count(rows: &[Row]) -> Result<i64> {
    let row = match rows {
        [row] => row,
        _ => {
            return Err(ProbeError::Protocol(format!(
                "expected exactly one row from count query, got {}",
                rows.len()
            )))
        }
    };
    let cell = match row.as_slice() {
        [cell] => cell,
        _ => {
            return Err(ProbeError::Protocol(format!(
                "expected exactly one column from count query, got {}",
                row.len()
            )))
        }
    };
    let text = cell
        .as_deref()
        .ok_or_else(|| ProbeError::Protocol("count query returned NULL".to_string()))?;
    text.trim()
        .parse::<i64>()
        .map_err(|e| ProbeError::Protocol(format!("count '{}' is not an integer: {}", text, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_count() {
        assert_eq!(scalar_count(&[vec![Some("2".to_string())]]).unwrap(), 2);
        assert_eq!(scalar_count(&[vec![Some(" 0 ".to_string())]]).unwrap(), 0);
    }

    #[test]
    fn test_scalar_count_shape_is_checked() {
        assert!(matches!(scalar_count(&[]), Err(ProbeError::Protocol(_))));
        assert!(matches!(
            scalar_count(&[vec![Some("1".into()), Some("2".into())]]),
            Err(ProbeError::Protocol(_))
        ));
        assert!(matches!(
            scalar_count(&[vec![None]]),
            Err(ProbeError::Protocol(_))
        ));
        assert!(matches!(
            scalar_count(&[vec![Some("two".into())]]),
            Err(ProbeError::Protocol(_))
        ));
    }
}
