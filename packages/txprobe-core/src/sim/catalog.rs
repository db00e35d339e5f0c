//! Committed state shared by all simulated sessions.

use std::collections::HashMap;

use super::parser::{ColumnType, Literal};
use super::{codes, SimError};
use crate::config::SessionTarget;

/// Rows in the sample `CUSTOMER` table.
pub const SAMPLE_CUSTOMER_ROWS: usize = 150;

/// Stored cell value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    Text(String),
    Null,
}

/// Table schema and committed rows.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub columns: Vec<(String, ColumnType)>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(name: String, columns: Vec<(String, ColumnType)>) -> Self {
        Self {
            name,
            columns,
            rows: Vec::new(),
        }
    }

    /// Checks a `VALUES` list against the column types and converts it.
    pub fn coerce_row(&self, literals: &[Literal]) -> Result<Vec<Value>, SimError> {
        if literals.len() != self.columns.len() {
            return Err(SimError::new(
                codes::COLUMN_MISMATCH,
                format!(
                    "SQL compilation error: Insert value list does not match column list expecting {} but got {}",
                    self.columns.len(),
                    literals.len()
                ),
            ));
        }

        self.columns
            .iter()
            .zip(literals)
            .map(|((_, ty), literal)| match (ty, literal) {
                (_, Literal::Null) => Ok(Value::Null),
                (ColumnType::Integer, Literal::Number(text) | Literal::Text(text)) => text
                    .trim()
                    .parse::<i64>()
                    .map(Value::Integer)
                    .map_err(|_| {
                        SimError::new(
                            codes::NUMERIC_VALUE,
                            format!("Numeric value '{}' is not recognized", text),
                        )
                    }),
                (ColumnType::Text, Literal::Number(text) | Literal::Text(text)) => {
                    Ok(Value::Text(text.clone()))
                }
            })
            .collect()
    }
}

/// One `COPY INTO` unload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecord {
    pub location: String,
    /// Qualified source table (`DB.SCHEMA.TABLE`)
    pub source: String,
    pub rows: usize,
    pub format: String,
}

type SchemaKey = (String, String);

fn schema_key(target: &SessionTarget) -> SchemaKey {
    (
        target.database.to_ascii_uppercase(),
        target.schema.to_ascii_uppercase(),
    )
}

/// Databases, schemas and tables visible to every session.
#[derive(Debug, Default)]
pub struct Catalog {
    schemas: HashMap<SchemaKey, HashMap<String, Table>>,
    exports: Vec<ExportRecord>,
    history: Vec<String>,
}

impl Catalog {
    /// Catalogue holding `DEMO_DB.PUBLIC` and the seeded sample dataset.
    pub fn with_defaults() -> Self {
        let mut catalog = Self::default();
        catalog.add_schema(&SessionTarget::default());

        let sample = SessionTarget::sample_data();
        catalog.add_schema(&sample);
        let mut customer = Table::new(
            "CUSTOMER".to_string(),
            vec![
                ("C_CUSTKEY".to_string(), ColumnType::Integer),
                ("C_NAME".to_string(), ColumnType::Text),
            ],
        );
        customer.rows = (1..=SAMPLE_CUSTOMER_ROWS as i64)
            .map(|key| {
                vec![
                    Value::Integer(key),
                    Value::Text(format!("Customer#{:09}", key)),
                ]
            })
            .collect();
        if let Some(tables) = catalog.schemas.get_mut(&schema_key(&sample)) {
            tables.insert(customer.name.clone(), customer);
        }
        catalog
    }

    pub fn add_schema(&mut self, target: &SessionTarget) {
        self.schemas.entry(schema_key(target)).or_default();
    }

    pub fn has_schema(&self, target: &SessionTarget) -> bool {
        self.schemas.contains_key(&schema_key(target))
    }

    pub fn table(&self, target: &SessionTarget, name: &str) -> Option<&Table> {
        self.schemas.get(&schema_key(target))?.get(name)
    }

    fn tables_mut(&mut self, target: &SessionTarget) -> Result<&mut HashMap<String, Table>, SimError> {
        self.schemas.get_mut(&schema_key(target)).ok_or_else(|| {
            SimError::new(
                codes::DOES_NOT_EXIST,
                format!("Schema '{}' does not exist or not authorized.", target),
            )
        })
    }

    /// Looks up a table or produces the "does not exist" rejection.
    pub fn require_table(&self, target: &SessionTarget, name: &str) -> Result<&Table, SimError> {
        self.table(target, name).ok_or_else(|| missing_table(target, name))
    }

    pub fn create_table(
        &mut self,
        target: &SessionTarget,
        name: &str,
        columns: Vec<(String, ColumnType)>,
    ) -> Result<(), SimError> {
        let tables = self.tables_mut(target)?;
        if tables.contains_key(name) {
            return Err(SimError::new(
                codes::ALREADY_EXISTS,
                format!("SQL compilation error: Object '{}' already exists.", name),
            ));
        }
        tables.insert(name.to_string(), Table::new(name.to_string(), columns));
        Ok(())
    }

    pub fn drop_table(&mut self, target: &SessionTarget, name: &str) -> Result<(), SimError> {
        let tables = self.tables_mut(target)?;
        tables
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| missing_table(target, name))
    }

    /// Appends committed rows. Rows for tables dropped meanwhile are discarded.
    pub fn append_rows(&mut self, target: &SessionTarget, name: &str, rows: Vec<Vec<Value>>) {
        if let Some(table) = self
            .schemas
            .get_mut(&schema_key(target))
            .and_then(|tables| tables.get_mut(name))
        {
            table.rows.extend(rows);
        }
    }

    pub fn record_export(&mut self, record: ExportRecord) {
        self.exports.push(record);
    }

    pub fn exports(&self) -> &[ExportRecord] {
        &self.exports
    }

    pub fn record_statement(&mut self, sql: &str) {
        self.history.push(sql.to_string());
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }
}

fn missing_table(target: &SessionTarget, name: &str) -> SimError {
    SimError::new(
        codes::DOES_NOT_EXIST,
        format!(
            "SQL compilation error: Object '{}.{}' does not exist or not authorized.",
            target, name
        ),
    )
}
