//! Keyword extraction and lexical scoring.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::schema::TableInfo;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9_]+").expect("valid token regex"));

/// Split text into lowercase `[a-z0-9_]` runs.
///
/// Everything else, including non-ASCII letters, acts as a separator.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Keyword set describing a table, deduplicated in first-seen order.
///
/// Covers the table name, every column name and raw column type, plus a
/// singular/plural variant of the name (`customers` → `customer`,
/// `invoice` → `invoices`).
pub fn table_keywords(table: &TableInfo) -> Vec<String> {
    let mut tokens = tokenize(&table.name);
    for column in &table.columns {
        tokens.extend(tokenize(&column.name));
        tokens.extend(tokenize(&column.data_type));
    }

    let variant = match table.name.strip_suffix('s') {
        Some(singular) => singular.to_string(),
        None => format!("{}s", table.name),
    };
    tokens.extend(tokenize(&variant));

    let mut seen = HashSet::new();
    tokens.retain(|t| seen.insert(t.clone()));
    tokens
}

/// Cosine-style overlap between query tokens and table keywords.
///
/// `|Q ∩ T| / sqrt(|Q| * |T|)` over token sets, 0 when either side is empty.
/// The result is always within `[0, 1]`.
pub fn keyword_score(query: &str, table: &TableInfo) -> f64 {
    let query_tokens: HashSet<String> = tokenize(query).into_iter().collect();
    let table_tokens: HashSet<String> = table_keywords(table).into_iter().collect();
    if query_tokens.is_empty() || table_tokens.is_empty() {
        return 0.0;
    }

    let shared = query_tokens.intersection(&table_tokens).count();
    shared as f64 / ((query_tokens.len() * table_tokens.len()) as f64).sqrt()
}
