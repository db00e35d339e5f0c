//! Probe error types.

use thiserror::Error;

/// Errors raised while connecting to a warehouse or running statements.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// Authentication or network setup failed
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Process configuration is missing or inconsistent
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The server rejected a statement
    #[error("Statement '{sql}' failed ({code}): {message}")]
    Statement {
        sql: String,
        code: String,
        message: String,
    },

    /// The server answered with something the probe cannot interpret
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Console output could not be written
    #[error("Output error: {0}")]
    Output(String),

    /// Lock poisoned (simulator catalogue)
    #[error("Lock poisoned")]
    LockPoisoned,
}

impl ProbeError {
    /// Builds a statement rejection.
    pub fn statement(sql: &str, code: impl Into<String>, message: impl Into<String>) -> Self {
        ProbeError::Statement {
            sql: sql.to_string(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// Returns the server error code for statement rejections.
    pub fn code(&self) -> Option<&str> {
        match self {
            ProbeError::Statement { code, .. } => Some(code),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ProbeError {
    fn from(e: std::io::Error) -> Self {
        ProbeError::Output(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProbeError>;
