//! Probe configuration.
//!
//! Built once at startup and handed to the connector; nothing below this
//! module reads process state.

use std::fmt;

use crate::error::{ProbeError, Result};

/// Default database for the transaction test session.
pub const DEFAULT_DATABASE: &str = "DEMO_DB";
/// Default schema for the transaction test session.
pub const DEFAULT_SCHEMA: &str = "PUBLIC";
/// Database holding the sample dataset used by the export stage.
pub const SAMPLE_DATABASE: &str = "SNOWFLAKE_SAMPLE_DATA";
/// Schema holding the sample dataset used by the export stage.
pub const SAMPLE_SCHEMA: &str = "TPCH_SF1";

/// Database/schema pair a session is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionTarget {
    pub database: String,
    pub schema: String,
}

impl SessionTarget {
    pub fn new(database: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
        }
    }

    /// The fixed sample dataset the export stage reads from.
    pub fn sample_data() -> Self {
        Self::new(SAMPLE_DATABASE, SAMPLE_SCHEMA)
    }
}

impl Default for SessionTarget {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE, DEFAULT_SCHEMA)
    }
}

impl fmt::Display for SessionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.schema)
    }
}

/// Credentials and endpoint for one warehouse account.
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Account identifier (e.g. `xy12345.eu-central-1`)
    pub account: String,
    /// Login name
    pub username: String,
    /// Login password
    pub password: String,
    /// Database/schema the primary session is bound to
    pub target: SessionTarget,
    /// Virtual warehouse to run statements on
    pub warehouse: Option<String>,
    /// Role to assume after login
    pub role: Option<String>,
    /// Endpoint override; defaults to the account's public host
    pub base_url: Option<String>,
    /// HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl ConnectionConfig {
    /// Creates a configuration for the default `DEMO_DB.PUBLIC` target.
    pub fn new(
        account: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            username: username.into(),
            password: password.into(),
            target: SessionTarget::default(),
            warehouse: None,
            role: None,
            base_url: None,
            request_timeout_ms: 60_000,
        }
    }

    /// Builds a configuration from optional parts, failing on missing credentials.
    pub fn from_parts(
        account: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Self> {
        let account = require("account identifier", account)?;
        let username = require("username", username)?;
        let password = require("password", password)?;
        Ok(Self::new(account, username, password))
    }

    /// Resolves the endpoint the client talks to.
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.snowflakecomputing.com", self.account),
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("account", &self.account)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("target", &self.target)
            .field("warehouse", &self.warehouse)
            .field("role", &self.role)
            .field("base_url", &self.base_url)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

/// Object-storage location and credentials for the bulk export stage.
#[derive(Clone, PartialEq, Eq)]
pub struct ExportTarget {
    /// Destination, e.g. `s3://bucket/prefix/`
    pub location: String,
    pub aws_key_id: String,
    pub aws_secret_key: String,
}

impl ExportTarget {
    /// Interprets the three export settings.
    ///
    /// All absent means no export; all present enables it. Anything in
    /// between is a configuration error.
    pub fn from_parts(
        location: Option<String>,
        aws_key_id: Option<String>,
        aws_secret_key: Option<String>,
    ) -> Result<Option<Self>> {
        match (location, aws_key_id, aws_secret_key) {
            (None, None, None) => Ok(None),
            (Some(location), Some(aws_key_id), Some(aws_secret_key)) => Ok(Some(Self {
                location,
                aws_key_id,
                aws_secret_key,
            })),
            (location, key, secret) => {
                let missing: Vec<&str> = [
                    ("export location", location.is_none()),
                    ("export key id", key.is_none()),
                    ("export secret key", secret.is_none()),
                ]
                .iter()
                .filter(|(_, absent)| *absent)
                .map(|(name, _)| *name)
                .collect();
                Err(ProbeError::Config(format!(
                    "export is partially configured, missing {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

impl fmt::Debug for ExportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportTarget")
            .field("location", &self.location)
            .field("aws_key_id", &self.aws_key_id)
            .field("aws_secret_key", &"<redacted>")
            .finish()
    }
}

/// Everything a probe run needs.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub connection: ConnectionConfig,
    /// Export stage runs only when set
    pub export: Option<ExportTarget>,
}

fn require(name: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ProbeError::Config(format!("{} is not set", name))),
    }
}
