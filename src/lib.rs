//! # schema-intel
//!
//! Schema intelligence for natural-language-to-SQL: introspects a
//! relational database into a normalized model, finds join paths over its
//! foreign keys, ranks tables against a question, and caches the results.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │            CatalogReader (SQLite, static JSON)           │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [introspect]
//! ┌─────────────────────────────────────────────────────────┐
//! │          DatabaseSchema (tables, columns, FKs)           │
//! │                  + structural hash                       │
//! └─────────────────────────────────────────────────────────┘
//!                 │                          │
//!                 ▼ [graph]                  ▼ [ranking]
//! ┌───────────────────────────┐  ┌───────────────────────────┐
//! │  RelationshipGraph (BFS)  │  │  keyword + embedding rank │
//! │  join paths, analysis     │  │  schema context text      │
//! └───────────────────────────┘  └───────────────────────────┘
//!                 │                          │
//!                 └────────────┬─────────────┘
//!                              ▼ [service]
//! ┌─────────────────────────────────────────────────────────┐
//! │     SchemaIntelligence  ◀──▶  MetadataCache (TTL/LRU)    │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod config;
pub mod graph;
pub mod introspect;
pub mod metadata;
pub mod ranking;
pub mod schema;
pub mod service;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::cache::{CacheKey, CacheNamespace, MetadataCache};
    pub use crate::config::Settings;
    pub use crate::graph::{JoinPath, RelationshipAnalysis, RelationshipGraph};
    pub use crate::introspect::{generate_schema_hash, introspect_schema};
    pub use crate::metadata::{CatalogReader, SqliteCatalog, StaticCatalog, StaticTable};
    pub use crate::ranking::{create_schema_context, ContextOptions, Embedder, SchemaContext};
    pub use crate::schema::{ColumnInfo, ColumnType, DatabaseSchema, ForeignKeyRelation, TableInfo};
    pub use crate::service::{SchemaIntelligence, ServiceError};
}

pub use schema::DatabaseSchema;
pub use service::SchemaIntelligence;
