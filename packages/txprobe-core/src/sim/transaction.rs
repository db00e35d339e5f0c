use std::collections::HashMap;

use super::catalog::{Catalog, Value};
use super::{codes, SimError};
use crate::config::SessionTarget;

/// Rows inserted by one session that are not yet visible to others.
///
/// Changes are isolated from the catalogue until commit.
#[derive(Debug)]
pub struct StagedTransaction {
    /// Schema the transaction's tables live in
    target: SessionTarget,
    /// Map of table name to staged rows
    staging: HashMap<String, Vec<Vec<Value>>>,
    committed: bool,
    aborted: bool,
}

impl StagedTransaction {
    pub fn new(target: SessionTarget) -> Self {
        Self {
            target,
            staging: HashMap::new(),
            committed: false,
            aborted: false,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.committed && !self.aborted
    }

    pub fn has_staged_changes(&self) -> bool {
        self.staging.values().any(|rows| !rows.is_empty())
    }

    /// Number of rows staged for `table`.
    pub fn staged_rows(&self, table: &str) -> usize {
        self.staging.get(table).map_or(0, Vec::len)
    }

    /// Stages a row insert.
    pub fn stage_insert(&mut self, table: &str, row: Vec<Value>) -> Result<(), SimError> {
        if !self.is_active() {
            return Err(SimError::new(
                codes::TRANSACTION_INACTIVE,
                "Transaction is no longer active",
            ));
        }
        self.staging.entry(table.to_string()).or_default().push(row);
        Ok(())
    }

    /// Applies all staged rows to the catalogue, returning how many were applied.
    pub fn commit(&mut self, catalog: &mut Catalog) -> Result<usize, SimError> {
        if !self.is_active() {
            return Err(SimError::new(
                codes::TRANSACTION_INACTIVE,
                "Transaction is no longer active",
            ));
        }

        let mut table_names: Vec<String> = self.staging.keys().cloned().collect();
        table_names.sort();

        let mut applied = 0;
        for name in table_names {
            if let Some(rows) = self.staging.remove(&name) {
                applied += rows.len();
                catalog.append_rows(&self.target, &name, rows);
            }
        }

        self.committed = true;
        Ok(applied)
    }

    /// Aborts the transaction, discarding all staged rows.
    pub fn abort(&mut self) {
        if self.is_active() {
            self.aborted = true;
            self.staging.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ColumnType;

    fn catalog_with_example() -> Catalog {
        let mut catalog = Catalog::with_defaults();
        catalog
            .create_table(
                &SessionTarget::default(),
                "EXAMPLE",
                vec![("ID".to_string(), ColumnType::Integer)],
            )
            .unwrap();
        catalog
    }

    #[test]
    fn test_commit_applies_staged_rows() {
        let mut catalog = catalog_with_example();
        let mut txn = StagedTransaction::new(SessionTarget::default());

        txn.stage_insert("EXAMPLE", vec![Value::Integer(1)]).unwrap();
        txn.stage_insert("EXAMPLE", vec![Value::Integer(2)]).unwrap();
        assert_eq!(txn.staged_rows("EXAMPLE"), 2);
        assert_eq!(
            catalog
                .table(&SessionTarget::default(), "EXAMPLE")
                .unwrap()
                .rows
                .len(),
            0
        );

        assert_eq!(txn.commit(&mut catalog).unwrap(), 2);
        assert!(!txn.is_active());
        assert_eq!(
            catalog
                .table(&SessionTarget::default(), "EXAMPLE")
                .unwrap()
                .rows
                .len(),
            2
        );
        assert!(txn.commit(&mut catalog).is_err());
    }

    #[test]
    fn test_abort_discards_staged_rows() {
        let mut catalog = catalog_with_example();
        let mut txn = StagedTransaction::new(SessionTarget::default());

        txn.stage_insert("EXAMPLE", vec![Value::Integer(3)]).unwrap();
        assert!(txn.has_staged_changes());
        txn.abort();

        assert!(!txn.has_staged_changes());
        assert!(txn.stage_insert("EXAMPLE", vec![Value::Integer(4)]).is_err());
        assert!(txn.commit(&mut catalog).is_err());
        assert!(catalog
            .table(&SessionTarget::default(), "EXAMPLE")
            .unwrap()
            .rows
            .is_empty());
    }
}
