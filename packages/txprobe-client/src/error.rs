use thiserror::Error;
use txprobe_core::ProbeError;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Login rejected ({code}): {message}")]
    LoginRejected { code: String, message: String },

    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    #[error("Statement rejected ({code}, state {sql_state}): {message}")]
    StatementRejected {
        code: String,
        sql_state: String,
        message: String,
    },

    #[error("Protocol error: {0}")]
    ProtocolError(String),
}

impl ClientError {
    /// Converts into the probe's error, attributing statement failures to `sql`.
    pub fn into_probe_error(self, sql: &str) -> ProbeError {
        match self {
            ClientError::StatementRejected { code, message, .. } => {
                ProbeError::statement(sql, code, message)
            }
            ClientError::ProtocolError(msg) => ProbeError::Protocol(msg),
            other => ProbeError::Connection(other.to_string()),
        }
    }
}

/// Login-time failures are all connection failures.
impl From<ClientError> for ProbeError {
    fn from(e: ClientError) -> Self {
        ProbeError::Connection(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
