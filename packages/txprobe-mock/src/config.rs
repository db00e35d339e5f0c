//! Mock endpoint configuration.

use txprobe_core::sim::TransactionModel;

/// Mock endpoint configuration.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Account name logins must present
    pub account: String,
    /// Accepted login name
    pub username: String,
    /// Accepted password
    pub password: String,
    /// Transaction discipline of the simulated warehouse
    pub model: TransactionModel,
    /// Number of "still running" answers before a query result is released
    /// (0 = answer synchronously)
    pub result_polls: u32,
    /// Request body read timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            account: "mock".to_string(),
            username: "probe".to_string(),
            password: "probe".to_string(),
            model: TransactionModel::Ansi,
            result_polls: 0,
            request_timeout_ms: 5000,
        }
    }
}
