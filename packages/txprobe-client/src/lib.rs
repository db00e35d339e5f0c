//! Warehouse client for the transaction probe.
//!
//! Implements the probe's `Connector` and `Executor` traits over the HTTP
//! session protocol: password login, then one JSON request per statement.

pub mod auth;
pub mod connector;
pub mod error;
pub mod models;
pub mod session;

pub use connector::WarehouseConnector;
pub use error::{ClientError, Result};
pub use session::WarehouseSession;
