//! Pluggable text embeddings for semantic scoring.

use thiserror::Error;

/// Failure reported by an [`Embedder`].
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding backend unavailable: {0}")]
    Unavailable(String),

    #[error("embedding request failed: {0}")]
    Request(String),
}

/// Turns text into dense vectors.
///
/// Implementations wrap whatever model or remote service is available.
/// Ranking never fails because of an embedder: any error degrades to
/// keyword-only scoring.
pub trait Embedder: Send + Sync {
    /// Embed a batch of documents, one vector per input, in input order.
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single query.
    fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Cosine similarity of two vectors.
///
/// Vectors of different length score 0. A zero-norm vector does not divide
/// by zero.
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    let denom = if denom == 0.0 { 1e-9 } else { denom };
    dot / denom
}
