//! Integration tests for the schema intelligence service.

use schema_intel::cache::{CacheKey, MetadataCache};
use schema_intel::config::Settings;
use schema_intel::metadata::{
    CatalogColumn, CatalogError, CatalogForeignKey, CatalogReader, CatalogResult,
    PrimaryKeyConstraint, StaticCatalog, StaticTable,
};
use schema_intel::ranking::ContextOptions;
use schema_intel::service::{SchemaIntelligence, ServiceError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

// ============================================================================
// Test catalog
// ============================================================================

/// Catalog whose contents can be swapped or broken mid-test, counting
/// how many full introspections ran.
#[derive(Default)]
struct Shared {
    catalog: RwLock<StaticCatalog>,
    introspections: AtomicUsize,
    failing: AtomicBool,
    delay: Option<Duration>,
}

struct SharedCatalog(Arc<Shared>);

impl CatalogReader for SharedCatalog {
    fn dialect_name(&self) -> String {
        self.0.catalog.read().unwrap().dialect_name()
    }

    fn database_name(&self) -> Option<String> {
        self.0.catalog.read().unwrap().database_name()
    }

    fn table_names(&self) -> CatalogResult<Vec<String>> {
        self.0.introspections.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.0.delay {
            thread::sleep(delay);
        }
        if self.0.failing.load(Ordering::SeqCst) {
            return Err(CatalogError::Other("connection lost".to_string()));
        }
        self.0.catalog.read().unwrap().table_names()
    }

    fn columns(&self, table: &str) -> CatalogResult<Vec<CatalogColumn>> {
        self.0.catalog.read().unwrap().columns(table)
    }

    fn primary_key(&self, table: &str) -> CatalogResult<PrimaryKeyConstraint> {
        self.0.catalog.read().unwrap().primary_key(table)
    }

    fn foreign_keys(&self, table: &str) -> CatalogResult<Vec<CatalogForeignKey>> {
        self.0.catalog.read().unwrap().foreign_keys(table)
    }
}

fn customer(extra_column: Option<&str>) -> StaticTable {
    let mut table = StaticTable::new("Customer")
        .column(CatalogColumn::new("CustomerId", "INTEGER").not_null())
        .column(CatalogColumn::new("Name", "TEXT"));
    if let Some(name) = extra_column {
        table = table.column(CatalogColumn::new(name, "TEXT"));
    }
    table.primary_key(&["CustomerId"])
}

fn shop() -> StaticCatalog {
    shop_with(None)
}

fn shop_with(extra_customer_column: Option<&str>) -> StaticCatalog {
    StaticCatalog::new("sqlite")
        .named("shop")
        .table(customer(extra_customer_column))
        .table(
            StaticTable::new("Invoice")
                .column(CatalogColumn::new("InvoiceId", "INTEGER").not_null())
                .column(CatalogColumn::new("CustomerId", "INTEGER").not_null())
                .column(CatalogColumn::new("Total", "DECIMAL(10,2)"))
                .primary_key(&["InvoiceId"])
                .foreign_key(&["CustomerId"], "Customer", &["CustomerId"]),
        )
        .table(
            StaticTable::new("InvoiceLine")
                .column(CatalogColumn::new("InvoiceLineId", "INTEGER").not_null())
                .column(CatalogColumn::new("InvoiceId", "INTEGER").not_null())
                .primary_key(&["InvoiceLineId"])
                .foreign_key(&["InvoiceId"], "Invoice", &["InvoiceId"]),
        )
        .table(StaticTable::new("Setting").column(CatalogColumn::new("Key", "TEXT")))
}

fn shared(delay: Option<Duration>) -> Arc<Shared> {
    Arc::new(Shared {
        catalog: RwLock::new(shop()),
        delay,
        ..Default::default()
    })
}

fn service_over(shared: &Arc<Shared>) -> SchemaIntelligence {
    SchemaIntelligence::new(Box::new(SharedCatalog(Arc::clone(shared))))
}

// ============================================================================
// Introspection and caching
// ============================================================================

#[test]
fn test_concurrent_first_access_introspects_once() {
    let shared = shared(Some(Duration::from_millis(50)));
    let service = service_over(&shared);

    thread::scope(|scope| {
        let handles: Vec<_> = (0..8).map(|_| scope.spawn(|| service.schema())).collect();
        for handle in handles {
            let schema = handle.join().unwrap().unwrap();
            assert_eq!(schema.total_tables, 4);
        }
    });

    assert_eq!(shared.introspections.load(Ordering::SeqCst), 1);
}

#[test]
fn test_lookups_reuse_cached_schema() {
    let shared = shared(None);
    let service = service_over(&shared);

    service.schema().unwrap();
    service.table("Invoice").unwrap();
    service.relationships().unwrap();
    service.related_tables("Customer").unwrap();
    service.join_path("InvoiceLine", "Customer").unwrap();
    service.analysis().unwrap();
    service.table_statistics("Invoice").unwrap();
    service.schema_context("invoices", None).unwrap();
    service.schema_hash().unwrap();

    assert_eq!(shared.introspections.load(Ordering::SeqCst), 1);
}

#[test]
fn test_lookup_results() {
    let shared = shared(None);
    let service = service_over(&shared);

    assert_eq!(service.database_name(), "shop");
    assert_eq!(service.relationships().unwrap().len(), 2);
    assert_eq!(service.related_tables("invoice").unwrap(), vec!["Customer", "InvoiceLine"]);

    let path = service.join_path("InvoiceLine", "Customer").unwrap().unwrap();
    assert_eq!(path.tables, vec!["InvoiceLine", "Invoice", "Customer"]);

    let analysis = service.analysis().unwrap();
    assert_eq!(analysis.isolated_tables, vec!["Setting"]);
    assert_eq!(analysis.most_connected_tables[0], ("Invoice".to_string(), 2));

    let stats = service.table_statistics("Invoice").unwrap();
    assert_eq!(stats.column_count, 3);
    assert_eq!(stats.foreign_key_count, 1);
    assert_eq!(stats.referenced_by_count, 1);
    assert_eq!(stats.type_distribution.get("DECIMAL"), Some(&1));

    let context = service
        .schema_context(
            "customer invoices",
            Some(ContextOptions {
                top_k: 2,
                max_tables: 3,
                include_relationships: true,
            }),
        )
        .unwrap();
    assert_eq!(context.tables, vec!["Customer", "Invoice", "InvoiceLine"]);
}

#[test]
fn test_disconnected_and_missing_tables() {
    let shared = shared(None);
    let service = service_over(&shared);

    assert_eq!(service.join_path("Setting", "Customer").unwrap(), None);
    assert!(matches!(
        service.table("Nope"),
        Err(ServiceError::TableNotFound(name)) if name == "Nope"
    ));
    assert!(matches!(
        service.table_statistics("Nope"),
        Err(ServiceError::TableNotFound(_))
    ));
    assert!(matches!(
        service.related_tables("Nope"),
        Err(ServiceError::TableNotFound(_))
    ));
}

// ============================================================================
// Refresh
// ============================================================================

#[test]
fn test_refresh_reports_hash() {
    let shared = shared(None);
    let service = service_over(&shared);

    let hash = service.schema_hash().unwrap();
    service.table("Customer").unwrap();

    let outcome = service.refresh().unwrap();
    assert_eq!(outcome.schema_hash, hash);
    assert_eq!(outcome.previous_hash.as_deref(), Some(hash.as_str()));
    assert!(!outcome.changed);
    assert_eq!(outcome.total_tables, 4);
    assert!(outcome.entries_cleared >= 3);
    assert_eq!(service.schema_hash().unwrap(), hash);
    assert_eq!(shared.introspections.load(Ordering::SeqCst), 2);
}

#[test]
fn test_refresh_picks_up_changes() {
    let shared = shared(None);
    let service = service_over(&shared);
    let before = service.schema_hash().unwrap();
    assert_eq!(service.schema().unwrap().total_tables, 4);

    {
        let mut catalog = shared.catalog.write().unwrap();
        *catalog = shop().table(StaticTable::new("Track").column(CatalogColumn::new("TrackId", "INTEGER")));
    }
    // Still served from cache until refreshed.
    assert_eq!(service.schema().unwrap().total_tables, 4);

    let outcome = service.refresh().unwrap();
    assert!(outcome.changed);
    assert_eq!(outcome.previous_hash.as_deref(), Some(before.as_str()));
    assert_ne!(outcome.schema_hash, before);
    assert_eq!(outcome.total_tables, 5);
    assert!(service.table("Track").is_ok());
}

#[test]
fn test_expired_schema_supersedes_derived_results() {
    let shared = shared(None);
    let mut settings = Settings::default();
    settings.cache.ttl.schema = 1;
    let service = SchemaIntelligence::with_settings(Box::new(SharedCatalog(Arc::clone(&shared))), &settings);

    assert_eq!(service.table("Customer").unwrap().columns.len(), 2);
    assert_eq!(service.table_statistics("Customer").unwrap().column_count, 2);
    let hash = service.schema_hash().unwrap();

    *shared.catalog.write().unwrap() = shop_with(Some("Phone"));
    assert_eq!(service.table("Customer").unwrap().columns.len(), 2);

    thread::sleep(Duration::from_millis(1100));

    let schema = service.schema().unwrap();
    assert_eq!(schema.get_table("Customer").unwrap().columns.len(), 3);
    assert_eq!(service.table("Customer").unwrap().columns.len(), 3);
    assert_eq!(service.table_statistics("Customer").unwrap().column_count, 3);
    assert_ne!(service.schema_hash().unwrap(), hash);
    assert_eq!(shared.introspections.load(Ordering::SeqCst), 2);
}

#[test]
fn test_failed_refresh_keeps_cached_schema() {
    let shared = shared(None);
    let service = service_over(&shared);
    let hash = service.schema_hash().unwrap();

    shared.failing.store(true, Ordering::SeqCst);
    assert!(matches!(service.refresh(), Err(ServiceError::Introspection(_))));

    assert_eq!(service.schema().unwrap().total_tables, 4);
    assert_eq!(service.schema_hash().unwrap(), hash);
}

#[test]
fn test_failed_first_build_surfaces_error() {
    let shared = shared(None);
    shared.failing.store(true, Ordering::SeqCst);
    let service = service_over(&shared);

    assert!(matches!(service.schema(), Err(ServiceError::Introspection(_))));

    shared.failing.store(false, Ordering::SeqCst);
    assert_eq!(service.schema().unwrap().total_tables, 4);
}

// ============================================================================
// Cache surface
// ============================================================================

#[test]
fn test_cache_stats_and_clear() {
    let shared = shared(None);
    let service = service_over(&shared);

    service.table("Customer").unwrap();
    let stats = service.cache_stats();
    // schema, schema hash, table
    assert_eq!(stats.total_entries, 3);
    assert!(service.cache().exists(&CacheKey::schema("shop")));
    assert!(service.cache().exists(&CacheKey::schema_hash("shop")));

    assert_eq!(service.clear_cache(), 3);
    assert_eq!(service.cache_stats().total_entries, 0);

    service.table("Customer").unwrap();
    assert_eq!(shared.introspections.load(Ordering::SeqCst), 2);
}

#[test]
fn test_refresh_clears_whole_shared_cache() {
    let cache = Arc::new(MetadataCache::new());
    let first = shared(None);
    let second = Arc::new(Shared {
        catalog: RwLock::new(shop().named("archive")),
        ..Default::default()
    });
    let shop_service = service_over(&first).with_cache(Arc::clone(&cache));
    let archive_service = service_over(&second).with_cache(Arc::clone(&cache));

    shop_service.table("Customer").unwrap();
    archive_service.table("Customer").unwrap();
    assert!(cache.exists(&CacheKey::schema("archive")));

    let outcome = shop_service.refresh().unwrap();
    assert_eq!(outcome.entries_cleared, 6);
    assert!(!cache.exists(&CacheKey::schema("archive")));
    assert!(cache.exists(&CacheKey::schema("shop")));

    // The other service rebuilds on its next lookup.
    archive_service.table("Customer").unwrap();
    assert_eq!(second.introspections.load(Ordering::SeqCst), 2);
}
