//! SQL text issued by the probe.
//!
//! Statements are plain strings; values are interpolated as literals.

use crate::config::ExportTarget;

/// Table created and dropped by every harness run.
pub const TEST_TABLE: &str = "example";
/// Source table of the export stage, inside the sample dataset.
pub const EXPORT_SOURCE_TABLE: &str = "CUSTOMER";

pub const CREATE_TABLE: &str = "CREATE TABLE example ( id integer )";
pub const DROP_TABLE: &str = "DROP TABLE example";
pub const BEGIN: &str = "BEGIN";
pub const COMMIT: &str = "COMMIT";
pub const ROLLBACK: &str = "ROLLBACK";
pub const DISABLE_AUTOCOMMIT: &str = "ALTER SESSION SET AUTOCOMMIT = FALSE";
pub const COUNT_ROWS: &str = "SELECT COUNT(*) FROM example";

/// Value rejected by the integer column.
pub const MALFORMED_VALUE: &str = "'ASD'";

/// `INSERT` of a single literal into the test table.
pub fn insert(literal: &str) -> String {
    format!("INSERT INTO {} VALUES ({})", TEST_TABLE, literal)
}

/// `INSERT` of an integer into the test table.
pub fn insert_value(value: i64) -> String {
    insert(&value.to_string())
}

/// Bulk export of the sample `CUSTOMER` table as CSV.
pub fn copy_into(target: &ExportTarget) -> String {
    format!(
        "COPY INTO {} FROM \"{}\" credentials=(aws_key_id='{}' aws_secret_key='{}') file_format=(type=csv)",
        target.location, EXPORT_SOURCE_TABLE, target.aws_key_id, target.aws_secret_key
    )
}

/// Replaces the secret in an export statement before it reaches a log line.
pub fn redact(sql: &str, target: Option<&ExportTarget>) -> String {
    match target {
        Some(t) if !t.aws_secret_key.is_empty() => sql.replace(&t.aws_secret_key, "***"),
        _ => sql.to_string(),
    }
}

/// Longest statement text written to a log line.
const LOG_PREVIEW_CHARS: usize = 80;

/// Shortens statement text for log lines.
///
/// Everything from an inline `credentials` clause on is cut, so log output
/// never carries export keys.
pub fn log_preview(sql: &str) -> String {
    let visible = match sql.to_ascii_lowercase().find("credentials") {
        Some(pos) => sql[..pos].trim_end(),
        None => sql,
    };
    if visible.len() < sql.len() || visible.chars().count() > LOG_PREVIEW_CHARS {
        format!(
            "{}...",
            visible.chars().take(LOG_PREVIEW_CHARS).collect::<String>()
        )
    } else {
        visible.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_text() {
        assert_eq!(insert_value(3), "INSERT INTO example VALUES (3)");
        assert_eq!(insert(MALFORMED_VALUE), "INSERT INTO example VALUES ('ASD')");
    }

    #[test]
    fn test_copy_into_text() {
        let target = ExportTarget {
            location: "s3://bucket/customers/".to_string(),
            aws_key_id: "AKIAEXAMPLE".to_string(),
            aws_secret_key: "s3cr3t".to_string(),
        };
        let sql = copy_into(&target);
        assert_eq!(
            sql,
            "COPY INTO s3://bucket/customers/ FROM \"CUSTOMER\" credentials=(aws_key_id='AKIAEXAMPLE' aws_secret_key='s3cr3t') file_format=(type=csv)"
        );
        let redacted = redact(&sql, Some(&target));
        assert!(!redacted.contains("s3cr3t"));
        assert!(redacted.contains("aws_secret_key='***'"));
    }

    #[test]
    fn test_log_preview_hides_credentials() {
        let target = ExportTarget {
            location: "s3://bucket/customers/".to_string(),
            aws_key_id: "AKIAEXAMPLE".to_string(),
            aws_secret_key: "s3cr3t".to_string(),
        };
        let preview = log_preview(&copy_into(&target));
        assert_eq!(preview, "COPY INTO s3://bucket/customers/ FROM \"CUSTOMER\"...");
        assert!(!preview.contains("AKIAEXAMPLE"));
        assert!(!preview.contains("s3cr3t"));
    }

    #[test]
    fn test_log_preview_truncates_long_text() {
        assert_eq!(log_preview(COUNT_ROWS), COUNT_ROWS);
        let long = format!("INSERT INTO example VALUES ('{}')", "x".repeat(100));
        let preview = log_preview(&long);
        assert_eq!(preview.chars().count(), LOG_PREVIEW_CHARS + 3);
        assert!(preview.ends_with("..."));
    }
}
