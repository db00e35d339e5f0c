//! Run driver.
//!
//! Opens the primary session, runs the harness under the three session
//! setups, then optionally exports the sample `CUSTOMER` table.

use std::io::Write;

use crate::config::{ExportTarget, SessionTarget};
use crate::error::{ProbeError, Result};
use crate::executor::{Connector, Executor};
use crate::harness::{HarnessReport, TransactionHarness, TransactionMode};
use crate::statement::{self, DISABLE_AUTOCOMMIT};

/// Session setups the harness is run under, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Default session settings, no explicit `BEGIN`
    DefaultSession,
    /// Default session settings, each batch opened with `BEGIN`
    ExplicitBegin,
    /// `AUTOCOMMIT = FALSE` on the session, no explicit `BEGIN`
    AutocommitDisabled,
}

impl Stage {
    pub const ALL: [Stage; 3] = [
        Stage::DefaultSession,
        Stage::ExplicitBegin,
        Stage::AutocommitDisabled,
    ];

    pub fn header(self) -> &'static str {
        match self {
            Stage::DefaultSession => "Running the test with the default connection.",
            Stage::ExplicitBegin => "Running the test with explicit BEGIN statements.",
            Stage::AutocommitDisabled => "Running the test without autocommit.",
        }
    }

    pub fn mode(self) -> TransactionMode {
        match self {
            Stage::ExplicitBegin => TransactionMode::ExplicitBegin,
            Stage::DefaultSession | Stage::AutocommitDisabled => TransactionMode::Implicit,
        }
    }
}

/// Results of a complete run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverReport {
    pub stages: Vec<(Stage, HarnessReport)>,
    /// Whether the export statement was issued and succeeded
    pub exported: bool,
}

/// Sequences harness runs and the export stage over one connector.
pub struct RunDriver<C: Connector> {
    connector: C,
    target: SessionTarget,
    export: Option<ExportTarget>,
}

impl<C: Connector> RunDriver<C> {
    /// Creates a driver.
    ///
    /// # Arguments
    /// * `connector` - Opens the primary and sample-data sessions
    /// * `target` - Database/schema of the primary session
    /// * `export` - Export destination; `None` skips the export stage
    pub fn new(connector: C, target: SessionTarget, export: Option<ExportTarget>) -> Self {
        Self {
            connector,
            target,
            export,
        }
    }

    /// Runs every stage, writing console lines to `out`, and finishes with `Done`.
    pub async fn run<W: Write + Send>(&self, out: &mut W) -> Result<DriverReport> {
        let session = self.connector.connect(&self.target).await?;
        tracing::info!("Connected to {}", self.target);

        let mut stages = Vec::with_capacity(Stage::ALL.len());
        for (i, stage) in Stage::ALL.into_iter().enumerate() {
            if i > 0 {
                writeln!(out)?;
            }
            writeln!(out, "{}", stage.header())?;
            if stage == Stage::AutocommitDisabled {
                session.execute(DISABLE_AUTOCOMMIT).await?;
            }
            let report = TransactionHarness::new(&session, stage.mode())
                .run(out)
                .await?;
            stages.push((stage, report));
        }

        let exported = match &self.export {
            Some(target) => {
                writeln!(out)?;
                self.run_export(target, out).await?;
                true
            }
            None => {
                tracing::info!("No export target configured, skipping export");
                false
            }
        };

        writeln!(out, "Done")?;
        Ok(DriverReport { stages, exported })
    }

    async fn run_export<W: Write + Send>(&self, target: &ExportTarget, out: &mut W) -> Result<()> {
        writeln!(
            out,
            "Exporting {} to {}.",
            statement::EXPORT_SOURCE_TABLE,
            target.location
        )?;

        let sample = SessionTarget::sample_data();
        let session = self.connector.connect(&sample).await?;
        tracing::info!("Connected to {}", sample);

        let sql = statement::copy_into(target);
        tracing::debug!("Issuing export: {}", statement::redact(&sql, Some(target)));
        session.execute(&sql).await.map_err(|e| match e {
            ProbeError::Statement { sql, code, message } => ProbeError::Statement {
                sql: statement::redact(&sql, Some(target)),
                code,
                message,
            },
            other => other,
        })?;

        writeln!(out, "Export finished.")?;
        Ok(())
    }
}
