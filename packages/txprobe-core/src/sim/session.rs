use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::catalog::{Catalog, ExportRecord};
use super::parser::{parse, SimStatement};
use super::transaction::StagedTransaction;
use super::{SimError, TransactionModel};
use crate::config::SessionTarget;
use crate::error::{ProbeError, Result};
use crate::executor::{Executor, Row};
use crate::statement;

/// Per-session state.
#[derive(Debug)]
struct SessionState {
    target: SessionTarget,
    autocommit: bool,
    txn: Option<StagedTransaction>,
}

/// One simulated session bound to a database/schema pair.
#[derive(Debug)]
pub struct SimulatedSession {
    catalog: Arc<Mutex<Catalog>>,
    state: Mutex<SessionState>,
    model: TransactionModel,
}

impl SimulatedSession {
    pub(super) fn new(
        catalog: Arc<Mutex<Catalog>>,
        target: SessionTarget,
        model: TransactionModel,
    ) -> Self {
        Self {
            catalog,
            state: Mutex::new(SessionState {
                target,
                autocommit: true,
                txn: None,
            }),
            model,
        }
    }

    pub fn autocommit(&self) -> Result<bool> {
        let state = self.state.lock().map_err(|_| ProbeError::LockPoisoned)?;
        Ok(state.autocommit)
    }

    pub fn in_transaction(&self) -> Result<bool> {
        let state = self.state.lock().map_err(|_| ProbeError::LockPoisoned)?;
        Ok(state.txn.is_some())
    }

    /// Executes one statement synchronously.
    ///
    /// Lock order is session state, then catalogue.
    pub fn run(&self, sql: &str) -> Result<Vec<Row>> {
        let mut state = self.state.lock().map_err(|_| ProbeError::LockPoisoned)?;
        let mut catalog = self.catalog.lock().map_err(|_| ProbeError::LockPoisoned)?;
        catalog.record_statement(sql);

        let result = parse(sql).and_then(|stmt| apply(self.model, &mut state, &mut catalog, stmt));
        let preview = statement::log_preview(sql);
        match result {
            Ok(rows) => {
                tracing::trace!(sql = %preview, rows = rows.len(), "simulated statement succeeded");
                Ok(rows)
            }
            Err(e) => {
                tracing::debug!(sql = %preview, code = %e.code, "simulated statement rejected: {}", e.message);
                Err(e.into_probe_error(sql))
            }
        }
    }
}

#[async_trait]
impl Executor for SimulatedSession {
    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        self.run(sql)
    }
}

fn status(message: impl Into<String>) -> Vec<Row> {
    vec![vec![Some(message.into())]]
}

fn commit_open(state: &mut SessionState, catalog: &mut Catalog) -> std::result::Result<(), SimError> {
    if let Some(mut txn) = state.txn.take() {
        let applied = txn.commit(catalog)?;
        tracing::trace!(applied, "open transaction committed");
    }
    Ok(())
}

fn apply(
    model: TransactionModel,
    state: &mut SessionState,
    catalog: &mut Catalog,
    stmt: SimStatement,
) -> std::result::Result<Vec<Row>, SimError> {
    if stmt.is_ddl() {
        commit_open(state, catalog)?;
    }

    match stmt {
        SimStatement::CreateTable { table, columns } => {
            catalog.create_table(&state.target, &table, columns)?;
            Ok(status(format!("Table {} successfully created.", table)))
        }
        SimStatement::DropTable { table } => {
            catalog.drop_table(&state.target, &table)?;
            Ok(status(format!("{} successfully dropped.", table)))
        }
        SimStatement::Insert { table, values } => {
            let row = catalog.require_table(&state.target, &table)?.coerce_row(&values)?;
            let autocommit_now = state.txn.is_none()
                && model == TransactionModel::StatementAutocommit
                && state.autocommit;
            if autocommit_now {
                catalog.append_rows(&state.target, &table, vec![row]);
            } else {
                let target = state.target.clone();
                state
                    .txn
                    .get_or_insert_with(|| StagedTransaction::new(target))
                    .stage_insert(&table, row)?;
            }
            Ok(vec![vec![Some("1".to_string())]])
        }
        SimStatement::Begin => {
            // BEGIN inside a transaction is ignored.
            if state.txn.is_none() {
                state.txn = Some(StagedTransaction::new(state.target.clone()));
            }
            Ok(status("Statement executed successfully."))
        }
        SimStatement::Commit => {
            commit_open(state, catalog)?;
            Ok(status("Statement executed successfully."))
        }
        SimStatement::Rollback => {
            if let Some(mut txn) = state.txn.take() {
                txn.abort();
            }
            Ok(status("Statement executed successfully."))
        }
        SimStatement::SetAutocommit(enabled) => {
            if enabled != state.autocommit {
                commit_open(state, catalog)?;
                state.autocommit = enabled;
            }
            Ok(status("Statement executed successfully."))
        }
        SimStatement::CountRows { table } => {
            let committed = catalog.require_table(&state.target, &table)?.rows.len();
            let staged = state.txn.as_ref().map_or(0, |txn| txn.staged_rows(&table));
            Ok(vec![vec![Some((committed + staged).to_string())]])
        }
        SimStatement::CopyInto {
            location,
            source,
            format,
        } => {
            let rows = catalog.require_table(&state.target, &source)?.rows.len();
            catalog.record_export(ExportRecord {
                location,
                source: format!("{}.{}", state.target, source),
                rows,
                format,
            });
            Ok(vec![vec![
                Some(rows.to_string()),
                Some("0".to_string()),
                Some("0".to_string()),
            ]])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{codes, SimulatedWarehouse};
    use crate::statement;

    fn session(model: TransactionModel) -> (SimulatedWarehouse, SimulatedSession) {
        let warehouse = SimulatedWarehouse::new(model);
        let session = warehouse.open_session(&SessionTarget::default()).unwrap();
        (warehouse, session)
    }

    fn count(session: &SimulatedSession) -> i64 {
        crate::executor::scalar_count(&session.run(statement::COUNT_ROWS).unwrap()).unwrap()
    }

    #[test]
    fn test_ansi_dml_waits_for_commit() {
        let (warehouse, session) = session(TransactionModel::Ansi);
        let other = warehouse.open_session(&SessionTarget::default()).unwrap();

        session.run(statement::CREATE_TABLE).unwrap();
        session.run(&statement::insert_value(1)).unwrap();
        assert!(session.in_transaction().unwrap());
        assert_eq!(count(&session), 1);
        assert_eq!(count(&other), 0);

        session.run(statement::COMMIT).unwrap();
        assert_eq!(count(&other), 1);
    }

    #[test]
    fn test_statement_autocommit_commits_each_insert() {
        let (warehouse, session) = session(TransactionModel::StatementAutocommit);
        let other = warehouse.open_session(&SessionTarget::default()).unwrap();

        session.run(statement::CREATE_TABLE).unwrap();
        session.run(&statement::insert_value(1)).unwrap();
        assert!(!session.in_transaction().unwrap());
        assert_eq!(count(&other), 1);

        session.run(statement::ROLLBACK).unwrap();
        assert_eq!(count(&other), 1);
    }

    #[test]
    fn test_autocommit_off_opens_implicit_transaction() {
        let (_warehouse, session) = session(TransactionModel::StatementAutocommit);
        session.run(statement::CREATE_TABLE).unwrap();
        session.run(statement::DISABLE_AUTOCOMMIT).unwrap();
        assert!(!session.autocommit().unwrap());

        session.run(&statement::insert_value(1)).unwrap();
        session.run(statement::ROLLBACK).unwrap();
        assert_eq!(count(&session), 0);
    }

    #[test]
    fn test_failed_insert_keeps_transaction_open() {
        let (_warehouse, session) = session(TransactionModel::Ansi);
        session.run(statement::CREATE_TABLE).unwrap();
        session.run(statement::BEGIN).unwrap();
        session.run(&statement::insert_value(3)).unwrap();

        let err = session
            .run(&statement::insert(statement::MALFORMED_VALUE))
            .unwrap_err();
        assert_eq!(err.code(), Some(codes::NUMERIC_VALUE));
        assert!(session.in_transaction().unwrap());
        assert_eq!(count(&session), 1);

        session.run(statement::ROLLBACK).unwrap();
        assert_eq!(count(&session), 0);
    }

    #[test]
    fn test_ddl_commits_open_transaction() {
        let (warehouse, session) = session(TransactionModel::Ansi);
        session.run(statement::CREATE_TABLE).unwrap();
        session.run(&statement::insert_value(1)).unwrap();
        session.run("CREATE TABLE other ( id integer )").unwrap();

        assert!(!session.in_transaction().unwrap());
        let other = warehouse.open_session(&SessionTarget::default()).unwrap();
        assert_eq!(count(&other), 1);
    }

    #[test]
    fn test_missing_table_is_rejected() {
        let (_warehouse, session) = session(TransactionModel::Ansi);
        let err = session.run(statement::COUNT_ROWS).unwrap_err();
        assert_eq!(err.code(), Some(codes::DOES_NOT_EXIST));
        let err = session.run(statement::DROP_TABLE).unwrap_err();
        assert_eq!(err.code(), Some(codes::DOES_NOT_EXIST));
    }

    #[test]
    fn test_table_exists_resolves_unquoted_names() {
        let (warehouse, session) = session(TransactionModel::Ansi);
        let target = SessionTarget::default();

        session.run(statement::CREATE_TABLE).unwrap();
        assert!(warehouse.table_exists(&target, statement::TEST_TABLE).unwrap());
        assert!(warehouse.table_exists(&target, "EXAMPLE").unwrap());
        assert!(!warehouse.table_exists(&target, "Example ").unwrap());

        session.run(statement::DROP_TABLE).unwrap();
        assert!(!warehouse.table_exists(&target, statement::TEST_TABLE).unwrap());
    }

    #[test]
    fn test_copy_into_records_export() {
        let warehouse = SimulatedWarehouse::default();
        let session = warehouse.open_session(&SessionTarget::sample_data()).unwrap();
        let rows = session
            .run("COPY INTO s3://bucket/out/ FROM \"CUSTOMER\" credentials=(aws_key_id='k' aws_secret_key='s') file_format=(type=csv)")
            .unwrap();
        assert_eq!(rows[0][0].as_deref(), Some("150"));

        let exports = warehouse.exports().unwrap();
        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].location, "s3://bucket/out/");
        assert_eq!(exports[0].source, "SNOWFLAKE_SAMPLE_DATA.TPCH_SF1.CUSTOMER");
        assert_eq!(exports[0].format, "CSV");
    }
}
