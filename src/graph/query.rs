//! Query interface for the relationship graph.
//!
//! - Path queries: shortest join path between two tables (BFS)
//! - Edge queries: turn a table path into concrete join relations
//! - Summary queries: connectivity analysis

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet, VecDeque};

use super::{JoinPath, RelationshipAnalysis, RelationshipGraph};
use crate::schema::ForeignKeyRelation;

/// Column name used for path steps with no recorded relationship.
pub const UNKNOWN_COLUMN: &str = "unknown";

/// Number of tables reported in [`RelationshipAnalysis::most_connected_tables`].
const MOST_CONNECTED_LIMIT: usize = 5;

impl<'a> RelationshipGraph<'a> {
    /// Neighbors of a node, ordered by the relationship that links them.
    fn ordered_neighbors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut linked: Vec<(usize, NodeIndex)> = self
            .graph
            .edges(node)
            .map(|edge| {
                let other = if edge.source() == node {
                    edge.target()
                } else {
                    edge.source()
                };
                (*edge.weight(), other)
            })
            .collect();
        linked.sort_by_key(|(rel_idx, _)| *rel_idx);
        linked.into_iter().map(|(_, other)| other).collect()
    }

    /// Tables directly linked to `table`, in relationship order.
    pub fn neighbors(&self, table: &str) -> Vec<String> {
        let Some(&idx) = self.node_index.get(table) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        self.ordered_neighbors(idx)
            .into_iter()
            .filter(|n| seen.insert(*n))
            .map(|n| self.graph[n].clone())
            .collect()
    }

    /// Find the shortest path between two tables.
    ///
    /// Uses BFS over the undirected foreign-key adjacency. Among paths of
    /// equal length the one discovered first wins, which follows the order
    /// relationships were recorded in the schema.
    ///
    /// Returns `[start]` when both ends are the same table, and `None` when
    /// either table is absent from the graph or the two are disconnected.
    ///
    /// # Example
    /// ```ignore
    /// let path = graph.shortest_path("InvoiceLine", "Customer");
    /// assert_eq!(path.unwrap(), vec!["InvoiceLine", "Invoice", "Customer"]);
    /// ```
    pub fn shortest_path(&self, start: &str, end: &str) -> Option<Vec<String>> {
        if start == end {
            return Some(vec![start.to_string()]);
        }

        let start_idx = *self.node_index.get(start)?;
        let end_idx = *self.node_index.get(end)?;

        let mut queue = VecDeque::new();
        let mut visited = HashSet::new();
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();

        queue.push_back(start_idx);
        visited.insert(start_idx);

        while let Some(current) = queue.pop_front() {
            for neighbor in self.ordered_neighbors(current) {
                if !visited.insert(neighbor) {
                    continue;
                }
                parent.insert(neighbor, current);
                if neighbor == end_idx {
                    return Some(self.reconstruct_path(end_idx, &parent));
                }
                queue.push_back(neighbor);
            }
        }

        None
    }

    /// Reconstruct a table path from the BFS parent map.
    fn reconstruct_path(&self, end_idx: NodeIndex, parent: &HashMap<NodeIndex, NodeIndex>) -> Vec<String> {
        let mut path = vec![self.graph[end_idx].clone()];
        let mut current = end_idx;

        // Walk backward from target to source
        while let Some(prev) = parent.get(&current) {
            path.push(self.graph[*prev].clone());
            current = *prev;
        }

        path.reverse();
        path
    }

    /// Convert a table path into one join relation per step.
    ///
    /// Each step uses the first recorded relationship between the two tables
    /// in either direction. A step with no relationship gets a placeholder
    /// whose columns are [`UNKNOWN_COLUMN`], so the output always has
    /// `path.len() - 1` entries.
    pub fn materialize_edges<S: AsRef<str>>(&self, path: &[S]) -> Vec<ForeignKeyRelation> {
        path.windows(2)
            .map(|pair| {
                let (a, b) = (pair[0].as_ref(), pair[1].as_ref());
                self.schema
                    .relationships
                    .iter()
                    .find(|rel| rel.connects(a, b))
                    .cloned()
                    .unwrap_or_else(|| ForeignKeyRelation {
                        from_table: a.to_string(),
                        from_column: UNKNOWN_COLUMN.to_string(),
                        to_table: b.to_string(),
                        to_column: UNKNOWN_COLUMN.to_string(),
                        constraint_name: None,
                    })
            })
            .collect()
    }

    /// Shortest path together with its join relations.
    pub fn join_path(&self, start: &str, end: &str) -> Option<JoinPath> {
        let tables = self.shortest_path(start, end)?;
        let steps = self.materialize_edges(&tables);
        Some(JoinPath {
            start_table: start.to_string(),
            end_table: end.to_string(),
            tables,
            steps,
        })
    }

    /// Summarize how the schema's tables are connected.
    pub fn analyze(&self) -> RelationshipAnalysis {
        let mut degree: HashMap<&str, usize> = HashMap::new();
        for idx in 0..self.schema.relationships.len() {
            let rel = self.relationship(idx);
            *degree.entry(rel.from_table.as_str()).or_default() += 1;
            *degree.entry(rel.to_table.as_str()).or_default() += 1;
        }

        // Natural order: schema tables first, then tables only known from
        // relationships in the order they were first seen.
        let mut ordered: Vec<&str> = self.schema.tables.iter().map(|t| t.name.as_str()).collect();
        for node in self.graph.node_indices() {
            let name = self.graph[node].as_str();
            if !ordered.contains(&name) {
                ordered.push(name);
            }
        }

        let isolated_tables = self
            .schema
            .tables
            .iter()
            .filter(|t| !self.contains(&t.name))
            .map(|t| t.name.clone())
            .collect();

        let mut connected: Vec<(String, usize)> = ordered
            .into_iter()
            .filter_map(|name| degree.get(name).map(|d| (name.to_string(), *d)))
            .collect();
        // Stable sort keeps natural order among equal degrees.
        connected.sort_by(|a, b| b.1.cmp(&a.1));
        connected.truncate(MOST_CONNECTED_LIMIT);

        RelationshipAnalysis {
            total_tables: self.schema.tables.len(),
            total_relationships: self.schema.relationships.len(),
            tables_with_relationships: self.node_count(),
            isolated_tables,
            most_connected_tables: connected,
        }
    }
}
