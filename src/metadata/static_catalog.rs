//! In-memory catalog built from pre-extracted metadata.
//!
//! Useful when the catalog has been exported to JSON ahead of time, and
//! as a deterministic catalog in tests.

use serde::{Deserialize, Serialize};

use super::provider::{
    CatalogColumn, CatalogError, CatalogForeignKey, CatalogReader, CatalogResult,
    PrimaryKeyConstraint,
};

/// A catalog whose contents are fixed at construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticCatalog {
    pub dialect: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub tables: Vec<StaticTable>,
}

/// One table of a [`StaticCatalog`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticTable {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<CatalogColumn>,
    #[serde(default)]
    pub primary_key: PrimaryKeyConstraint,
    #[serde(default)]
    pub foreign_keys: Vec<CatalogForeignKey>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub row_count: Option<u64>,
}

impl StaticCatalog {
    pub fn new(dialect: impl Into<String>) -> Self {
        Self {
            dialect: dialect.into(),
            database: None,
            tables: Vec::new(),
        }
    }

    /// Parse a catalog from its JSON export.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn named(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn table(mut self, table: StaticTable) -> Self {
        self.tables.push(table);
        self
    }

    fn find(&self, table: &str) -> CatalogResult<&StaticTable> {
        self.tables
            .iter()
            .find(|t| t.name == table)
            .ok_or_else(|| CatalogError::TableNotFound(table.to_string()))
    }
}

impl StaticTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: PrimaryKeyConstraint::default(),
            foreign_keys: Vec::new(),
            comment: None,
            row_count: None,
        }
    }

    pub fn column(mut self, column: CatalogColumn) -> Self {
        self.columns.push(column);
        self
    }

    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key.constrained_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn foreign_key(self, columns: &[&str], referred_table: &str, referred_columns: &[&str]) -> Self {
        self.named_foreign_key(None, columns, referred_table, referred_columns)
    }

    pub fn named_foreign_key(
        mut self,
        name: Option<&str>,
        columns: &[&str],
        referred_table: &str,
        referred_columns: &[&str],
    ) -> Self {
        self.foreign_keys.push(CatalogForeignKey {
            name: name.map(str::to_string),
            constrained_columns: columns.iter().map(|c| c.to_string()).collect(),
            referred_table: referred_table.to_string(),
            referred_columns: referred_columns.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn row_count(mut self, rows: u64) -> Self {
        self.row_count = Some(rows);
        self
    }
}

impl CatalogReader for StaticCatalog {
    fn dialect_name(&self) -> String {
        self.dialect.clone()
    }

    fn database_name(&self) -> Option<String> {
        self.database.clone()
    }

    fn table_names(&self) -> CatalogResult<Vec<String>> {
        Ok(self.tables.iter().map(|t| t.name.clone()).collect())
    }

    fn columns(&self, table: &str) -> CatalogResult<Vec<CatalogColumn>> {
        Ok(self.find(table)?.columns.clone())
    }

    fn primary_key(&self, table: &str) -> CatalogResult<PrimaryKeyConstraint> {
        Ok(self.find(table)?.primary_key.clone())
    }

    fn foreign_keys(&self, table: &str) -> CatalogResult<Vec<CatalogForeignKey>> {
        Ok(self.find(table)?.foreign_keys.clone())
    }

    fn table_comment(&self, table: &str) -> CatalogResult<Option<String>> {
        Ok(self.find(table)?.comment.clone())
    }

    fn row_count(&self, table: &str) -> CatalogResult<Option<u64>> {
        Ok(self.find(table)?.row_count)
    }
}
