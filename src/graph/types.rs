//! Result types for relationship graph queries.

use serde::{Deserialize, Serialize};

use crate::schema::ForeignKeyRelation;

/// A join path between two tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinPath {
    pub start_table: String,
    pub end_table: String,
    /// Table names from start to end, inclusive.
    pub tables: Vec<String>,
    /// One relation per consecutive pair in `tables`.
    pub steps: Vec<ForeignKeyRelation>,
}

impl JoinPath {
    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// A single join with no intermediate tables.
    pub fn is_direct(&self) -> bool {
        self.steps.len() == 1
    }

    /// Tables strictly between the start and end.
    pub fn intermediate_tables(&self) -> &[String] {
        if self.tables.len() <= 2 {
            return &[];
        }
        &self.tables[1..self.tables.len() - 1]
    }
}

/// Summary of how tables are connected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipAnalysis {
    pub total_tables: usize,
    pub total_relationships: usize,
    /// Number of distinct tables touched by at least one relationship.
    pub tables_with_relationships: usize,
    /// Tables touched by no relationship, in schema order.
    pub isolated_tables: Vec<String>,
    /// Up to five (table, degree) pairs, highest degree first.
    pub most_connected_tables: Vec<(String, usize)>,
}
