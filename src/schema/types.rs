//! Normalized schema model produced by introspection.
//!
//! A [`DatabaseSchema`] is built in one pass and never mutated afterwards;
//! the next introspection replaces it wholesale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Column Types
// ============================================================================

/// Standardized column type category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Integer,
    Varchar,
    Text,
    Real,
    Blob,
    Boolean,
    Datetime,
    Date,
    Time,
    Decimal,
    Float,
    Double,
    Unknown,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Varchar => "VARCHAR",
            ColumnType::Text => "TEXT",
            ColumnType::Real => "REAL",
            ColumnType::Blob => "BLOB",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Datetime => "DATETIME",
            ColumnType::Date => "DATE",
            ColumnType::Time => "TIME",
            ColumnType::Decimal => "DECIMAL",
            ColumnType::Float => "FLOAT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Columns and Relationships
// ============================================================================

/// A single column of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Type string as reported by the database.
    #[serde(rename = "type")]
    pub data_type: String,
    pub type_category: ColumnType,
    pub nullable: bool,
    pub primary_key: bool,
    /// Referenced column as `table.column`, when this column is a foreign key.
    pub foreign_key: Option<String>,
    pub default_value: Option<String>,
    pub max_length: Option<u32>,
    pub auto_increment: bool,
}

/// A directed foreign-key link between two columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyRelation {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    pub constraint_name: Option<String>,
}

impl ForeignKeyRelation {
    /// Whether this relation links `a` and `b` in either direction.
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.from_table == a && self.to_table == b) || (self.from_table == b && self.to_table == a)
    }

    /// Whether `table` is either endpoint of this relation.
    pub fn touches(&self, table: &str) -> bool {
        self.from_table == table || self.to_table == table
    }
}

// ============================================================================
// Tables
// ============================================================================

/// Complete information about a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub primary_keys: Vec<String>,
    pub foreign_keys: Vec<ForeignKeyRelation>,
    pub row_count: Option<u64>,
    pub table_comment: Option<String>,
}

impl TableInfo {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn nullable_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.nullable)
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn required_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| !c.nullable)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Look up a column by name (case-insensitive).
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

// ============================================================================
// Database Schema
// ============================================================================

/// Complete database schema.
///
/// `relationships` is the concatenation of every table's `foreign_keys`
/// in table order, and `total_tables` always equals `tables.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub database_name: String,
    /// Normalized dialect (`postgresql`, `mysql`, `sqlite`, or the raw name).
    pub database_type: String,
    pub tables: Vec<TableInfo>,
    pub relationships: Vec<ForeignKeyRelation>,
    pub total_tables: usize,
    pub schema_version: String,
    pub extracted_at: DateTime<Utc>,
}

impl DatabaseSchema {
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Look up a table by name (case-insensitive).
    pub fn get_table(&self, table_name: &str) -> Option<&TableInfo> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(table_name))
    }

    /// Tables linked to `table_name` by a foreign key in either direction.
    ///
    /// Names are returned once each, in the order relationships were recorded.
    pub fn get_related_tables(&self, table_name: &str) -> Vec<String> {
        let mut related: Vec<String> = Vec::new();
        for rel in &self.relationships {
            let other = if rel.from_table.eq_ignore_ascii_case(table_name) {
                &rel.to_table
            } else if rel.to_table.eq_ignore_ascii_case(table_name) {
                &rel.from_table
            } else {
                continue;
            };
            if !related.contains(other) {
                related.push(other.clone());
            }
        }
        related
    }

    /// Direct relationships between two tables, in either direction.
    pub fn get_join_path(&self, table1: &str, table2: &str) -> Vec<&ForeignKeyRelation> {
        self.relationships
            .iter()
            .filter(|rel| {
                (rel.from_table.eq_ignore_ascii_case(table1)
                    && rel.to_table.eq_ignore_ascii_case(table2))
                    || (rel.from_table.eq_ignore_ascii_case(table2)
                        && rel.to_table.eq_ignore_ascii_case(table1))
            })
            .collect()
    }

    /// Relationships pointing at `table_name` from other tables.
    pub fn incoming_relationships(&self, table_name: &str) -> Vec<&ForeignKeyRelation> {
        self.relationships
            .iter()
            .filter(|rel| rel.to_table.eq_ignore_ascii_case(table_name))
            .collect()
    }
}
