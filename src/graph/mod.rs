//! Foreign-key relationship graph.
//!
//! Treats the schema's flattened relationship list as an undirected graph
//! over table names. Direction is dropped for connectivity only; the
//! directed [`ForeignKeyRelation`]s stay in the schema and are looked up again
//! when a path is materialized into join edges.
//!
//! The graph borrows the schema snapshot it was built from, so a query always
//! sees one consistent version of the relationships.

pub mod query;
mod types;

pub use types::{JoinPath, RelationshipAnalysis};

use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::HashMap;

use crate::schema::{DatabaseSchema, ForeignKeyRelation};

/// Undirected adjacency view of a schema's foreign keys.
///
/// Edge weights are indices into `schema.relationships`, which keeps the
/// order relationships were recorded in available to traversal.
#[derive(Debug, Clone)]
pub struct RelationshipGraph<'a> {
    schema: &'a DatabaseSchema,

    /// The underlying undirected graph
    graph: UnGraph<String, usize>,

    /// Index: table name → NodeIndex
    node_index: HashMap<String, NodeIndex>,
}

impl<'a> RelationshipGraph<'a> {
    /// Build the graph from every relationship in the schema.
    ///
    /// Only tables touched by at least one relationship become nodes.
    pub fn from_schema(schema: &'a DatabaseSchema) -> Self {
        let mut graph = Self {
            schema,
            graph: UnGraph::default(),
            node_index: HashMap::new(),
        };

        for (idx, rel) in schema.relationships.iter().enumerate() {
            let from = graph.ensure_node(&rel.from_table);
            let to = graph.ensure_node(&rel.to_table);
            graph.graph.add_edge(from, to, idx);
        }

        graph
    }

    fn ensure_node(&mut self, table: &str) -> NodeIndex {
        if let Some(idx) = self.node_index.get(table) {
            return *idx;
        }
        let idx = self.graph.add_node(table.to_string());
        self.node_index.insert(table.to_string(), idx);
        idx
    }

    /// Whether `table` participates in any relationship.
    pub fn contains(&self, table: &str) -> bool {
        self.node_index.contains_key(table)
    }

    /// Number of tables touched by relationships.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of relationships.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn schema(&self) -> &'a DatabaseSchema {
        self.schema
    }

    fn relationship(&self, idx: usize) -> &'a ForeignKeyRelation {
        &self.schema.relationships[idx]
    }
}
