//! Schema intelligence service.
//!
//! Composes catalog introspection, the relationship graph, relevance ranking
//! and the metadata cache behind one explicitly constructed handle.
//!
//! # Architecture
//!
//! ```text
//!                     ┌──────────────────────────┐
//!   callers ────────▶ │    SchemaIntelligence    │
//!                     └──────────────────────────┘
//!                       │          │          │
//!                       ▼          ▼          ▼
//!              ┌────────────┐ ┌─────────┐ ┌──────────────┐
//!              │ introspect │ │  graph  │ │   ranking    │
//!              │ (catalog)  │ │  (BFS)  │ │ (+ embedder) │
//!              └────────────┘ └─────────┘ └──────────────┘
//!                       │          │          │
//!                       └──────────┼──────────┘
//!                                  ▼
//!                         ┌─────────────────┐
//!                         │  MetadataCache  │
//!                         └─────────────────┘
//! ```
//!
//! Every lookup first consults the cache under its namespace and falls back
//! to the cached (or freshly introspected) schema. Schema builds are
//! serialized: concurrent callers that miss the cache wait for the one
//! introspection in flight instead of starting their own.

mod statistics;

pub use statistics::TableStatistics;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::{sha256_hex, CacheError, CacheKey, CacheNamespace, CacheStats, MetadataCache};
use crate::config::{CacheTtlSettings, Settings};
use crate::graph::{JoinPath, RelationshipAnalysis, RelationshipGraph};
use crate::introspect::{generate_schema_hash, introspect_schema, IntrospectError, DEFAULT_DATABASE_NAME};
use crate::metadata::CatalogReader;
use crate::ranking::{create_schema_context, ContextOptions, Embedder, SchemaContext};
use crate::schema::{DatabaseSchema, ForeignKeyRelation, TableInfo};

/// Errors surfaced by the service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("schema introspection failed: {0}")]
    Introspection(#[from] IntrospectError),

    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result of [`SchemaIntelligence::refresh`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshOutcome {
    pub schema_hash: String,
    /// Hash published before the refresh, if one was cached.
    pub previous_hash: Option<String>,
    /// True unless the previous hash is known and identical.
    pub changed: bool,
    /// Cache entries dropped by the refresh.
    pub entries_cleared: usize,
    pub total_tables: usize,
}

/// Hash and snapshot id published alongside each schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Published {
    schema_hash: String,
    /// Digest of the whole serialized schema; differs between introspections.
    snapshot: String,
}

impl Published {
    fn of(schema: &DatabaseSchema) -> ServiceResult<Self> {
        let json = serde_json::to_string(schema).map_err(CacheError::from)?;
        Ok(Self {
            schema_hash: generate_schema_hash(schema),
            snapshot: sha256_hex(&json),
        })
    }
}

/// Cached schema intelligence over one database.
pub struct SchemaIntelligence {
    catalog: Box<dyn CatalogReader>,
    cache: Arc<MetadataCache>,
    embedder: Option<Arc<dyn Embedder>>,
    ttl: CacheTtlSettings,
    context_options: ContextOptions,
    /// Database name used for the schema and to scope cache keys.
    database: String,
    /// Held while introspecting so only one build runs at a time.
    build_lock: Mutex<()>,
}

impl SchemaIntelligence {
    /// Create a service with default cache limits, TTLs and ranking options.
    pub fn new(catalog: Box<dyn CatalogReader>) -> Self {
        let database = catalog
            .database_name()
            .unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string());
        Self {
            catalog,
            cache: Arc::new(MetadataCache::new()),
            embedder: None,
            ttl: CacheTtlSettings::default(),
            context_options: ContextOptions::default(),
            database,
            build_lock: Mutex::new(()),
        }
    }

    /// Create a service configured from [`Settings`].
    pub fn with_settings(catalog: Box<dyn CatalogReader>, settings: &Settings) -> Self {
        let mut service = Self::new(catalog);
        service.cache = Arc::new(MetadataCache::with_limits(
            settings.cache.max_size,
            settings.cache.cleanup_interval(),
        ));
        service.ttl = settings.cache.ttl;
        service.context_options = settings.ranking.context_options();
        if let Some(name) = &settings.database.name {
            service.database = name.clone();
        }
        service
    }

    /// Enable semantic scoring with the given embedder.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Share an existing cache instead of the service's own.
    ///
    /// [`refresh`](Self::refresh) and [`clear_cache`](Self::clear_cache)
    /// clear the whole shared cache, not only this service's entries.
    pub fn with_cache(mut self, cache: Arc<MetadataCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn database_name(&self) -> &str {
        &self.database
    }

    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    fn ttl(&self, namespace: CacheNamespace) -> std::time::Duration {
        self.ttl.ttl(namespace)
    }

    // ========================================================================
    // Schema
    // ========================================================================

    /// The current schema, introspecting on a cache miss.
    pub fn schema(&self) -> ServiceResult<DatabaseSchema> {
        let key = CacheKey::schema(&self.database);
        if let Some(schema) = self.cache.get(&key)? {
            return Ok(schema);
        }

        let _guard = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Another caller may have finished the build while we waited.
        if let Some(schema) = self.cache.get(&key)? {
            debug!(database = %self.database, "schema built by concurrent caller");
            return Ok(schema);
        }

        let schema = introspect_schema(self.catalog.as_ref(), Some(&self.database))?;
        self.publish(&schema)?;
        Ok(schema)
    }

    /// Cache a schema together with its hash and snapshot id.
    fn publish(&self, schema: &DatabaseSchema) -> ServiceResult<Published> {
        let published = Published::of(schema)?;
        self.cache
            .set(&CacheKey::schema(&self.database), schema, self.ttl(CacheNamespace::Schema))?;
        self.cache.set(
            &CacheKey::schema_hash(&self.database),
            &published,
            self.ttl(CacheNamespace::SchemaHash),
        )?;
        Ok(published)
    }

    /// Hash and snapshot id of the current schema.
    fn published(&self) -> ServiceResult<Published> {
        let key = CacheKey::schema_hash(&self.database);
        if let Some(published) = self.cache.get(&key)? {
            return Ok(published);
        }

        let schema = self.schema()?;
        let published = Published::of(&schema)?;
        self.cache.set(&key, &published, self.ttl(CacheNamespace::SchemaHash))?;
        Ok(published)
    }

    /// Drop every cached entry and introspect again.
    ///
    /// Introspection runs before anything is cleared, so a failed refresh
    /// leaves the previously cached schema in place. The whole cache is
    /// cleared, including entries of other services sharing it through
    /// [`with_cache`](Self::with_cache).
    pub fn refresh(&self) -> ServiceResult<RefreshOutcome> {
        let _guard = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let previous_hash = self
            .cache
            .get::<Published>(&CacheKey::schema_hash(&self.database))?
            .map(|published| published.schema_hash);
        let schema = introspect_schema(self.catalog.as_ref(), Some(&self.database))?;

        let entries_cleared = self.cache.clear(None);
        let schema_hash = self.publish(&schema)?.schema_hash;
        let changed = previous_hash.as_deref() != Some(schema_hash.as_str());

        info!(
            database = %self.database,
            hash = %schema_hash,
            changed,
            entries_cleared,
            "refreshed schema"
        );

        Ok(RefreshOutcome {
            schema_hash,
            previous_hash,
            changed,
            entries_cleared,
            total_tables: schema.total_tables,
        })
    }

    /// Structural hash of the current schema.
    pub fn schema_hash(&self) -> ServiceResult<String> {
        Ok(self.published()?.schema_hash)
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// A result derived from the current schema, computed on a cache miss.
    ///
    /// Entries are keyed by the snapshot they were computed from, so once a
    /// newer schema is published the older results are no longer reachable.
    fn derived<T, K, F>(&self, namespace: CacheNamespace, key_for: K, compute: F) -> ServiceResult<T>
    where
        T: Serialize + DeserializeOwned,
        K: Fn(&str) -> String,
        F: FnOnce(&DatabaseSchema) -> ServiceResult<T>,
    {
        let published = self.published()?;
        if let Some(value) = self.cache.get(&key_for(&published.snapshot))? {
            return Ok(value);
        }

        let schema = self.schema()?;
        let value = compute(&schema)?;
        let snapshot = Published::of(&schema)?.snapshot;
        self.cache.set(&key_for(&snapshot), &value, self.ttl(namespace))?;
        Ok(value)
    }

    /// A single table, matched case-insensitively.
    pub fn table(&self, name: &str) -> ServiceResult<TableInfo> {
        self.derived(
            CacheNamespace::Tables,
            |snapshot| CacheKey::table(&self.database, snapshot, name),
            |schema| Ok(resolve_table(schema, name)?.clone()),
        )
    }

    /// Every foreign-key relationship in the schema.
    pub fn relationships(&self) -> ServiceResult<Vec<ForeignKeyRelation>> {
        self.derived(
            CacheNamespace::Relationships,
            |snapshot| CacheKey::relationships(&self.database, snapshot),
            |schema| Ok(schema.relationships.clone()),
        )
    }

    /// Tables linked to `name` by a foreign key in either direction.
    pub fn related_tables(&self, name: &str) -> ServiceResult<Vec<String>> {
        let schema = self.schema()?;
        let table = resolve_table(&schema, name)?;
        Ok(schema.get_related_tables(&table.name))
    }

    /// Shortest join path between two tables.
    ///
    /// `Ok(None)` when the tables exist but are not connected.
    pub fn join_path(&self, start: &str, end: &str) -> ServiceResult<Option<JoinPath>> {
        self.derived(
            CacheNamespace::JoinPaths,
            |snapshot| CacheKey::join_path(&self.database, snapshot, start, end),
            |schema| {
                let start_name = resolve_table(schema, start)?.name.as_str();
                let end_name = resolve_table(schema, end)?.name.as_str();

                let path = RelationshipGraph::from_schema(schema).join_path(start_name, end_name);
                if path.is_none() {
                    debug!(start = %start_name, end = %end_name, "no join path");
                }
                Ok(path)
            },
        )
    }

    /// Connectivity summary of the schema.
    pub fn analysis(&self) -> ServiceResult<RelationshipAnalysis> {
        self.derived(
            CacheNamespace::Analysis,
            |snapshot| CacheKey::analysis(&self.database, snapshot),
            |schema| Ok(RelationshipGraph::from_schema(schema).analyze()),
        )
    }

    /// Column and relationship counts for one table.
    pub fn table_statistics(&self, name: &str) -> ServiceResult<TableStatistics> {
        self.derived(
            CacheNamespace::Statistics,
            |snapshot| CacheKey::statistics(&self.database, snapshot, name),
            |schema| Ok(TableStatistics::compute(schema, resolve_table(schema, name)?)),
        )
    }

    /// Text context of the tables most relevant to `query`.
    ///
    /// Uses the service's configured options when `options` is `None`.
    pub fn schema_context(&self, query: &str, options: Option<ContextOptions>) -> ServiceResult<SchemaContext> {
        let schema = self.schema()?;
        let options = options.unwrap_or(self.context_options);
        Ok(create_schema_context(
            &schema,
            query,
            &options,
            self.embedder.as_deref(),
        ))
    }

    // ========================================================================
    // Cache
    // ========================================================================

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop every cached entry. Returns the number removed.
    pub fn clear_cache(&self) -> usize {
        self.cache.clear(None)
    }
}

fn resolve_table<'s>(schema: &'s DatabaseSchema, name: &str) -> ServiceResult<&'s TableInfo> {
    schema
        .get_table(name)
        .ok_or_else(|| ServiceError::TableNotFound(name.to_string()))
}
