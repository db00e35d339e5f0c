//! Transaction semantics probe for cloud data warehouses.
//!
//! Provides the session abstractions, the transaction test harness, the run
//! driver that sequences harness runs under different session settings, and
//! an in-process warehouse simulator.

pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod harness;
pub mod sim;
pub mod statement;

pub use config::{ConnectionConfig, ExportTarget, ProbeConfig, SessionTarget};
pub use driver::{DriverReport, RunDriver, Stage};
pub use error::{ProbeError, Result};
pub use executor::{Connector, Executor, Row};
pub use harness::{HarnessReport, Outcome, TransactionHarness, TransactionMode};
