//! Mock warehouse endpoint.
//!
//! Serves the login and query routes of the session protocol over HTTP, with
//! every statement executed by the in-process simulator. Lets the real client
//! be exercised end to end without an account.

pub mod config;
pub mod handlers;
pub mod router;
pub mod server;

pub use config::MockConfig;
pub use router::{AppState, Router, RouterError};
pub use server::{serve_listener, Server};

use txprobe_core::sim::SimulatedWarehouse;

/// Builds a router over a fresh simulated warehouse.
pub fn build_router(config: MockConfig) -> Router {
    let warehouse = SimulatedWarehouse::new(config.model);
    Router::new(AppState::new(warehouse, config))
}
