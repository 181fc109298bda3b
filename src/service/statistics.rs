//! Per-table statistics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::schema::{DatabaseSchema, TableInfo};

/// Column and relationship counts for one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableStatistics {
    pub table: String,
    pub column_count: usize,
    pub primary_key_count: usize,
    /// Outgoing foreign keys.
    pub foreign_key_count: usize,
    /// Foreign keys in other tables pointing here.
    pub referenced_by_count: usize,
    pub nullable_columns: usize,
    pub required_columns: usize,
    pub row_count: Option<u64>,
    /// Column count per type category, keyed by category name.
    pub type_distribution: BTreeMap<String, usize>,
}

impl TableStatistics {
    pub fn compute(schema: &DatabaseSchema, table: &TableInfo) -> Self {
        let mut type_distribution = BTreeMap::new();
        for column in &table.columns {
            *type_distribution
                .entry(column.type_category.as_str().to_string())
                .or_insert(0) += 1;
        }

        let nullable_columns = table.nullable_columns().len();
        Self {
            table: table.name.clone(),
            column_count: table.columns.len(),
            primary_key_count: table.primary_keys.len(),
            foreign_key_count: table.foreign_keys.len(),
            referenced_by_count: schema.incoming_relationships(&table.name).len(),
            nullable_columns,
            required_columns: table.columns.len() - nullable_columns,
            row_count: table.row_count,
            type_distribution,
        }
    }
}
