//! Schema context assembly for SQL generation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{select_relevant_tables, Embedder};
use crate::schema::{DatabaseSchema, TableInfo};

pub const DEFAULT_TOP_K: usize = 8;
pub const DEFAULT_MAX_TABLES: usize = 10;

/// Controls how many tables end up in a schema context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextOptions {
    /// Tables picked by relevance alone.
    pub top_k: usize,
    /// Ceiling once related tables are appended.
    pub max_tables: usize,
    /// Append tables linked by foreign keys to the relevant ones.
    pub include_relationships: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            max_tables: DEFAULT_MAX_TABLES,
            include_relationships: true,
        }
    }
}

/// Text context plus the tables and scores it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaContext {
    pub text: String,
    pub tables: Vec<String>,
    pub scores: BTreeMap<String, f64>,
}

/// Relevant tables for a query, optionally extended with FK neighbours.
///
/// Neighbours are appended in the order relationships were recorded, for
/// each selected table in rank order, until `max_tables` is reached. The
/// relevance selection itself is never cut down by `max_tables`.
pub fn related_tables_for_query<'a>(
    schema: &'a DatabaseSchema,
    query: &str,
    options: &ContextOptions,
    embedder: Option<&dyn Embedder>,
) -> (Vec<&'a TableInfo>, BTreeMap<String, f64>) {
    let ranking = select_relevant_tables(schema, query, options.top_k, embedder);
    let mut tables = ranking.tables;

    if options.include_relationships {
        let seeds: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        let mut extra: Vec<&'a TableInfo> = Vec::new();

        'seeds: for seed in seeds {
            for rel in &schema.relationships {
                if tables.len() + extra.len() >= options.max_tables {
                    break 'seeds;
                }
                let other = if rel.from_table == seed {
                    &rel.to_table
                } else if rel.to_table == seed {
                    &rel.from_table
                } else {
                    continue;
                };
                let already = tables.iter().chain(extra.iter()).any(|t| &t.name == other);
                if already {
                    continue;
                }
                if let Some(table) = schema.tables.iter().find(|t| &t.name == other) {
                    extra.push(table);
                }
            }
        }

        tables.extend(extra);
    }

    (tables, ranking.scores)
}

/// Compact one-table-per-block description of `tables`.
///
/// Join hints are only emitted for foreign keys whose target is also in
/// `tables`.
pub fn build_schema_snippet(tables: &[&TableInfo]) -> String {
    let mut lines = Vec::new();

    for table in tables {
        let columns = table
            .columns
            .iter()
            .map(|c| format!("{}:{}", c.name, c.data_type))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("- {}({})", table.name, columns));

        if !table.primary_keys.is_empty() {
            lines.push(format!("  PK: {}", table.primary_keys.join(", ")));
        }

        for fk in &table.foreign_keys {
            if !tables.iter().any(|t| t.name == fk.to_table) {
                continue;
            }
            let via = fk
                .constraint_name
                .as_ref()
                .map(|name| format!(" [FK {name}]"))
                .unwrap_or_default();
            lines.push(format!(
                "  joins {to} ON {from}.{from_col} = {to}.{to_col}{via}",
                to = fk.to_table,
                from = table.name,
                from_col = fk.from_column,
                to_col = fk.to_column,
            ));
        }
    }

    lines.join("\n")
}

/// Full context text for a query: database header followed by the snippet.
pub fn create_schema_context(
    schema: &DatabaseSchema,
    query: &str,
    options: &ContextOptions,
    embedder: Option<&dyn Embedder>,
) -> SchemaContext {
    let (tables, scores) = related_tables_for_query(schema, query, options, embedder);

    let mut text = format!(
        "Database: {} ({})\nTotal tables: {}\nRelevant tables ({}):\n",
        schema.database_name,
        schema.database_type,
        schema.total_tables,
        tables.len()
    );
    text.push_str(&build_schema_snippet(&tables));

    SchemaContext {
        text,
        tables: tables.iter().map(|t| t.name.clone()).collect(),
        scores,
    }
}
