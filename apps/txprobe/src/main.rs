//! Transaction semantics probe.
//!
//! Connects to a warehouse account, runs the transaction harness under the
//! default session, with explicit `BEGIN` and with autocommit disabled, and
//! optionally exports the sample `CUSTOMER` table with `COPY INTO`.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use txprobe_client::WarehouseConnector;
use txprobe_core::config::{DEFAULT_DATABASE, DEFAULT_SCHEMA};
use txprobe_core::sim::{SimulatedWarehouse, TransactionModel};
use txprobe_core::{ConnectionConfig, Connector, ExportTarget, ProbeConfig, RunDriver, SessionTarget};

/// Command-line arguments; every option falls back to its environment variable.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Account identifier
    #[arg(long, env = "SNOWFLAKE_ACCOUNT_NAME")]
    account: Option<String>,

    /// Login name
    #[arg(long, env = "SNOWFLAKE_USERNAME")]
    username: Option<String>,

    /// Login password
    #[arg(long, env = "SNOWFLAKE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Database the test table is created in
    #[arg(long, env = "SNOWFLAKE_DATABASE", default_value = DEFAULT_DATABASE)]
    database: String,

    /// Schema the test table is created in
    #[arg(long, env = "SNOWFLAKE_SCHEMA", default_value = DEFAULT_SCHEMA)]
    schema: String,

    /// Virtual warehouse to run on
    #[arg(long, env = "SNOWFLAKE_WAREHOUSE")]
    warehouse: Option<String>,

    /// Role to assume after login
    #[arg(long, env = "SNOWFLAKE_ROLE")]
    role: Option<String>,

    /// Endpoint override (e.g. a local mock server)
    #[arg(long, env = "SNOWFLAKE_BASE_URL")]
    base_url: Option<String>,

    /// HTTP request timeout in milliseconds
    #[arg(long, default_value_t = 60_000)]
    request_timeout_ms: u64,

    /// COPY INTO destination for the sample CUSTOMER table
    #[arg(long, env = "EXPORT_LOCATION")]
    export_location: Option<String>,

    /// AWS key id for the export destination
    #[arg(long, env = "EXPORT_AWS_KEY_ID")]
    export_aws_key_id: Option<String>,

    /// AWS secret key for the export destination
    #[arg(long, env = "EXPORT_AWS_SECRET_KEY", hide_env_values = true)]
    export_aws_secret_key: Option<String>,

    /// Run against the in-process simulator instead of a live account
    /// (`ansi` or `statement-autocommit`)
    #[arg(long, value_name = "MODEL")]
    simulate: Option<TransactionModel>,
}

impl Args {
    fn target(&self) -> SessionTarget {
        SessionTarget::new(&self.database, &self.schema)
    }

    fn export(&self) -> anyhow::Result<Option<ExportTarget>> {
        ExportTarget::from_parts(
            self.export_location.clone(),
            self.export_aws_key_id.clone(),
            self.export_aws_secret_key.clone(),
        )
        .context("Invalid export configuration")
    }

    /// Builds the live configuration; credentials are required here.
    fn probe_config(&self) -> anyhow::Result<ProbeConfig> {
        let mut connection = ConnectionConfig::from_parts(
            self.account.clone(),
            self.username.clone(),
            self.password.clone(),
        )
        .context("Invalid connection configuration")?;
        connection.target = self.target();
        connection.warehouse = self.warehouse.clone();
        connection.role = self.role.clone();
        connection.base_url = self.base_url.clone();
        connection.request_timeout_ms = self.request_timeout_ms;

        Ok(ProbeConfig {
            connection,
            export: self.export()?,
        })
    }
}

async fn run<C: Connector>(
    connector: C,
    target: SessionTarget,
    export: Option<ExportTarget>,
) -> anyhow::Result<()> {
    let driver = RunDriver::new(connector, target, export);
    let mut out = std::io::stdout();
    let report = driver.run(&mut out).await?;
    tracing::info!(
        stages = report.stages.len(),
        exported = report.exported,
        "Probe finished"
    );
    Ok(())
}

/// Accepts a missing `.env`; a file that exists but cannot be read or parsed
/// is a configuration error.
fn check_env_file<T>(loaded: dotenvy::Result<T>) -> anyhow::Result<()> {
    match loaded {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e).context("Failed to load .env"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    check_env_file(dotenvy::dotenv())?;
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match args.simulate {
        Some(model) => {
            tracing::info!(?model, "Running against the simulator");
            run(SimulatedWarehouse::new(model), args.target(), args.export()?)
                .await
                .context("Simulated probe run failed")
        }
        None => {
            let config = args.probe_config()?;
            tracing::info!(
                account = %config.connection.account,
                target = %config.connection.target,
                "Running against {}",
                config.connection.base_url()
            );
            let target = config.connection.target.clone();
            let connector = WarehouseConnector::new(config.connection)
                .context("Failed to build HTTP client")?;
            run(connector, target, config.export)
                .await
                .context("Transaction probe failed")
        }
    }
}
