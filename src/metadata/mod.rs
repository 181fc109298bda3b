//! Catalog access module.
//!
//! This module provides the read-only catalog abstraction that introspection
//! consumes, plus the implementations shipped with the crate.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      CatalogReader                              │
//! │  - dialect_name()          - columns(table)                     │
//! │  - database_name()         - primary_key(table)                 │
//! │  - table_names()           - foreign_keys(table)                │
//! └─────────────────────────────────────────────────────────────────┘
//!              │                                   │
//!              ▼                                   ▼
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │        SqliteCatalog         │   │        StaticCatalog         │
//! │  (sqlite_master + pragmas)   │   │  (builder / JSON export)     │
//! └──────────────────────────────┘   └──────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use schema_intel::metadata::{CatalogReader, SqliteCatalog};
//!
//! let catalog = SqliteCatalog::open("./chinook.db")?;
//! for table in catalog.table_names()? {
//!     let fks = catalog.foreign_keys(&table)?;
//! }
//! ```

mod provider;
mod sqlite;
mod static_catalog;

pub use provider::{
    CatalogColumn, CatalogError, CatalogForeignKey, CatalogReader, CatalogResult,
    PrimaryKeyConstraint,
};
pub use sqlite::SqliteCatalog;
pub use static_catalog::{StaticCatalog, StaticTable};
