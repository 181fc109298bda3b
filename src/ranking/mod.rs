//! Query-relevance ranking of tables.
//!
//! Scores every table of a schema against a natural-language query and
//! assembles the compact text context handed to SQL generation.
//!
//! # Scoring
//!
//! ```text
//! combined = 0.6 * keyword_score + 0.4 * semantic_score    (clamped to [0, 1])
//! ```
//!
//! The keyword score is purely lexical (see [`keyword_score`]). The semantic
//! score is the cosine similarity between embeddings of the query and of a
//! `"name: col1, col2"` summary of each table. Without an [`Embedder`], or
//! when the embedder fails, every semantic score is 0.

mod context;
mod embedding;
mod keywords;

pub use context::{
    build_schema_snippet, create_schema_context, related_tables_for_query, ContextOptions,
    SchemaContext, DEFAULT_MAX_TABLES, DEFAULT_TOP_K,
};
pub use embedding::{cosine, Embedder, EmbeddingError};
pub use keywords::{keyword_score, table_keywords, tokenize};

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::schema::{DatabaseSchema, TableInfo};

const KEYWORD_WEIGHT: f64 = 0.6;
const SEMANTIC_WEIGHT: f64 = 0.4;

/// Tables selected for a query, best first.
#[derive(Debug, Clone)]
pub struct Ranking<'a> {
    pub tables: Vec<&'a TableInfo>,
    /// Combined score of every table in the schema, not only the selected ones.
    pub scores: BTreeMap<String, f64>,
}

impl Ranking<'_> {
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn score(&self, table: &str) -> f64 {
        self.scores.get(table).copied().unwrap_or(0.0)
    }
}

/// Rank tables by combined keyword and semantic score, keeping the first `top_k`.
///
/// Sorting is stable, so tables with equal scores keep schema order.
pub fn select_relevant_tables<'a>(
    schema: &'a DatabaseSchema,
    query: &str,
    top_k: usize,
    embedder: Option<&dyn Embedder>,
) -> Ranking<'a> {
    let semantic = match embedder {
        Some(embedder) => semantic_scores(schema, query, embedder),
        None => vec![0.0; schema.tables.len()],
    };

    let scored: Vec<(&TableInfo, f64)> = schema
        .tables
        .iter()
        .zip(semantic)
        .map(|(table, semantic)| {
            let combined = KEYWORD_WEIGHT * keyword_score(query, table) + SEMANTIC_WEIGHT * semantic;
            (table, combined.clamp(0.0, 1.0))
        })
        .collect();

    let scores = scored
        .iter()
        .map(|(table, score)| (table.name.clone(), *score))
        .collect();

    let mut ranked = scored;
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(top_k);

    debug!(
        query,
        selected = ranked.len(),
        total = schema.tables.len(),
        "ranked tables"
    );

    Ranking {
        tables: ranked.into_iter().map(|(table, _)| table).collect(),
        scores,
    }
}

/// Semantic score per table in schema order, all zero on any embedder failure
/// or when a vector holds NaN or infinite components.
fn semantic_scores(schema: &DatabaseSchema, query: &str, embedder: &dyn Embedder) -> Vec<f64> {
    let zeros = vec![0.0; schema.tables.len()];
    let summaries: Vec<String> = schema
        .tables
        .iter()
        .map(|t| format!("{}: {}", t.name, t.column_names().join(", ")))
        .collect();

    let documents = match embedder.embed_documents(&summaries) {
        Ok(vectors) => vectors,
        Err(e) => {
            warn!(error = %e, "table embedding failed, using keyword scores only");
            return zeros;
        }
    };
    if documents.len() != summaries.len() {
        warn!(
            expected = summaries.len(),
            received = documents.len(),
            "embedder returned wrong number of vectors, using keyword scores only"
        );
        return zeros;
    }

    let query_vector = match embedder.embed_query(query) {
        Ok(vector) => vector,
        Err(e) => {
            warn!(error = %e, "query embedding failed, using keyword scores only");
            return zeros;
        }
    };

    let scores: Vec<f64> = documents
        .iter()
        .map(|doc| cosine(doc, &query_vector))
        .collect();
    if scores.iter().any(|s| !s.is_finite()) {
        warn!("embedder returned non-finite vectors, using keyword scores only");
        return zeros;
    }
    scores
}
