//! CatalogReader trait definition.
//!
//! The CatalogReader trait abstracts over the read-only catalog calls a
//! database connection offers. Introspection consumes it; nothing in this
//! crate issues DDL or DML through it.

use serde::{Deserialize, Serialize};

/// Errors raised by catalog access.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Table not found in catalog: {0}")]
    TableNotFound(String),

    #[error("Catalog error: {0}")]
    Other(String),
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Column descriptor as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogColumn {
    pub name: String,
    /// Raw type string, e.g. `NVARCHAR(40)`.
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub autoincrement: bool,
}

impl CatalogColumn {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
            autoincrement: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self
    }
}

/// Primary-key constraint of a table. Empty when the table has none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKeyConstraint {
    pub name: Option<String>,
    pub constrained_columns: Vec<String>,
}

/// Foreign-key constraint of a table.
///
/// `constrained_columns[i]` references `referred_columns[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogForeignKey {
    pub name: Option<String>,
    pub constrained_columns: Vec<String>,
    pub referred_table: String,
    pub referred_columns: Vec<String>,
}

/// Read-only access to a database catalog.
///
/// Implementations must be shareable across threads; a service may be
/// introspected from any caller.
pub trait CatalogReader: Send + Sync {
    /// The engine's dialect name, e.g. `sqlite` or `postgresql+psycopg2`.
    fn dialect_name(&self) -> String;

    /// Database name, if the connection knows one.
    fn database_name(&self) -> Option<String>;

    /// List table names.
    fn table_names(&self) -> CatalogResult<Vec<String>>;

    /// Column descriptors of a table, in declaration order.
    fn columns(&self, table: &str) -> CatalogResult<Vec<CatalogColumn>>;

    /// Primary-key constraint of a table.
    fn primary_key(&self, table: &str) -> CatalogResult<PrimaryKeyConstraint>;

    /// Foreign-key constraints declared on a table.
    fn foreign_keys(&self, table: &str) -> CatalogResult<Vec<CatalogForeignKey>>;

    /// Table comment, where the engine supports them.
    fn table_comment(&self, _table: &str) -> CatalogResult<Option<String>> {
        Ok(None)
    }

    /// Approximate row count from catalog statistics, where available.
    fn row_count(&self, _table: &str) -> CatalogResult<Option<u64>> {
        Ok(None)
    }
}
