//! In-process warehouse simulator.
//!
//! Understands exactly the statements the probe issues and models two
//! transaction disciplines, so the harness and driver can be exercised
//! without a live account. Sessions share one catalogue; each session keeps
//! its own autocommit flag and open transaction.

mod catalog;
mod parser;
mod session;
mod transaction;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::SessionTarget;
use crate::error::{ProbeError, Result};
use crate::executor::Connector;

pub use catalog::{Catalog, ExportRecord, Table, Value, SAMPLE_CUSTOMER_ROWS};
pub use parser::{parse, ColumnType, Literal, SimStatement};
pub use session::SimulatedSession;
pub use transaction::StagedTransaction;

/// Error codes returned by the simulator, matching the warehouse's own.
pub mod codes {
    /// SQL compilation error (syntax or unsupported construct)
    pub const SYNTAX_ERROR: &str = "001003";
    /// Object already exists
    pub const ALREADY_EXISTS: &str = "002002";
    /// Object does not exist or not authorized
    pub const DOES_NOT_EXIST: &str = "002003";
    /// Insert value list does not match column list
    pub const COLUMN_MISMATCH: &str = "002020";
    /// Numeric value is not recognized
    pub const NUMERIC_VALUE: &str = "100038";
    /// Transaction already committed or rolled back
    pub const TRANSACTION_INACTIVE: &str = "000603";
}

/// Statement rejection produced by the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimError {
    pub code: String,
    pub message: String,
}

impl SimError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn into_probe_error(self, sql: &str) -> ProbeError {
        ProbeError::statement(sql, self.code, self.message)
    }
}

/// How DML outside an explicit `BEGIN` is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransactionModel {
    /// DML outside a transaction opens an implicit one that lasts until
    /// `COMMIT` or `ROLLBACK`, whatever the autocommit setting.
    #[default]
    Ansi,
    /// With autocommit on, DML outside `BEGIN` commits immediately; with
    /// autocommit off it opens an implicit transaction.
    StatementAutocommit,
}

impl std::str::FromStr for TransactionModel {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ansi" => Ok(TransactionModel::Ansi),
            "statement-autocommit" | "statement_autocommit" => {
                Ok(TransactionModel::StatementAutocommit)
            }
            other => Err(ProbeError::Config(format!(
                "unknown transaction model '{}', expected 'ansi' or 'statement-autocommit'",
                other
            ))),
        }
    }
}

/// Connector handing out simulated sessions over a shared catalogue.
#[derive(Debug, Clone)]
pub struct SimulatedWarehouse {
    catalog: Arc<Mutex<Catalog>>,
    model: TransactionModel,
}

impl SimulatedWarehouse {
    /// Creates a warehouse with the default and sample databases.
    pub fn new(model: TransactionModel) -> Self {
        Self {
            catalog: Arc::new(Mutex::new(Catalog::with_defaults())),
            model,
        }
    }

    /// Opens a session without going through the async connector.
    pub fn open_session(&self, target: &SessionTarget) -> Result<SimulatedSession> {
        {
            let catalog = self.catalog.lock().map_err(|_| ProbeError::LockPoisoned)?;
            if !catalog.has_schema(target) {
                return Err(ProbeError::Connection(format!(
                    "Database '{}' does not exist or not authorized",
                    target
                )));
            }
        }
        Ok(SimulatedSession::new(
            Arc::clone(&self.catalog),
            target.clone(),
            self.model,
        ))
    }

    /// Runs `f` against the catalogue.
    pub fn inspect<T>(&self, f: impl FnOnce(&Catalog) -> T) -> Result<T> {
        let catalog = self.catalog.lock().map_err(|_| ProbeError::LockPoisoned)?;
        Ok(f(&catalog))
    }

    /// Statements executed so far, across all sessions, in order.
    pub fn history(&self) -> Result<Vec<String>> {
        self.inspect(|c| c.history().to_vec())
    }

    /// Whether `table` currently exists (committed state).
    ///
    /// `table` is resolved like an identifier in SQL text: unquoted names
    /// are case-insensitive.
    pub fn table_exists(&self, target: &SessionTarget, table: &str) -> Result<bool> {
        let name = parser::normalize_identifier(table);
        self.inspect(|c| c.table(target, &name).is_some())
    }

    /// Exports recorded by `COPY INTO`.
    pub fn exports(&self) -> Result<Vec<ExportRecord>> {
        self.inspect(|c| c.exports().to_vec())
    }
}

impl Default for SimulatedWarehouse {
    fn default() -> Self {
        Self::new(TransactionModel::default())
    }
}

#[async_trait]
impl Connector for SimulatedWarehouse {
    type Session = SimulatedSession;

    async fn connect(&self, target: &SessionTarget) -> Result<Self::Session> {
        self.open_session(target)
    }
}
