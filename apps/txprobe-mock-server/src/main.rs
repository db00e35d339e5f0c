//! Mock warehouse server.
//!
//! Serves the session protocol on a local port with statements executed by
//! the in-process simulator. Point the probe at it with
//! `txprobe --base-url http://127.0.0.1:8085`.

use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use txprobe_core::sim::TransactionModel;
use txprobe_mock::{build_router, MockConfig, Server};

/// Command-line arguments for the mock server.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8085)]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Account name logins must present
    #[arg(long, default_value = "mock")]
    account: String,

    /// Accepted login name
    #[arg(long, default_value = "probe")]
    username: String,

    /// Accepted password
    #[arg(long, default_value = "probe")]
    password: String,

    /// Transaction model (`ansi` or `statement-autocommit`)
    #[arg(long, default_value = "ansi")]
    model: TransactionModel,

    /// "Still running" answers per query before its result is released
    #[arg(long, default_value_t = 0)]
    result_polls: u32,

    /// Request timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    request_timeout_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("Invalid listen address")?;

    let config = MockConfig {
        account: args.account,
        username: args.username,
        password: args.password,
        model: args.model,
        result_polls: args.result_polls,
        request_timeout_ms: args.request_timeout_ms,
    };

    println!("Starting mock warehouse server...");
    println!("  Address: {}", addr);
    println!("  Account: {}", config.account);
    println!("  User: {}", config.username);
    println!("  Transaction model: {:?}", config.model);
    println!("  Result polls: {}", config.result_polls);

    let server = Server::new(addr, build_router(config));
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.serve().await {
            tracing::error!("Server error: {}", e);
        }
    });

    signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c")?;
    println!("\nShutting down server...");
    server_handle.abort();

    Ok(())
}
