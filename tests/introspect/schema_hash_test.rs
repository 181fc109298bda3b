//! Integration tests for the structural schema hash.

use schema_intel::introspect::{generate_schema_hash, introspect_schema};
use schema_intel::metadata::{CatalogColumn, StaticCatalog, StaticTable};
use schema_intel::schema::DatabaseSchema;

fn customer() -> StaticTable {
    StaticTable::new("Customer")
        .column(CatalogColumn::new("CustomerId", "INTEGER").not_null())
        .column(CatalogColumn::new("Name", "TEXT"))
        .column(CatalogColumn::new("Email", "VARCHAR(60)"))
        .primary_key(&["CustomerId"])
}

fn invoice() -> StaticTable {
    StaticTable::new("Invoice")
        .column(CatalogColumn::new("InvoiceId", "INTEGER").not_null())
        .column(CatalogColumn::new("CustomerId", "INTEGER"))
        .column(CatalogColumn::new("SupportRepId", "INTEGER"))
        .primary_key(&["InvoiceId"])
        .foreign_key(&["CustomerId"], "Customer", &["CustomerId"])
        .foreign_key(&["SupportRepId"], "Customer", &["CustomerId"])
}

fn schema_of(catalog: StaticCatalog) -> DatabaseSchema {
    introspect_schema(&catalog, Some("shop")).unwrap()
}

fn reversed(mut table: StaticTable) -> StaticTable {
    table.columns.reverse();
    table.foreign_keys.reverse();
    table
}

#[test]
fn test_hash_shape() {
    let hash = generate_schema_hash(&schema_of(StaticCatalog::new("sqlite").table(customer())));
    assert_eq!(hash.len(), 16);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_hash_ignores_table_and_column_order() {
    let a = schema_of(StaticCatalog::new("sqlite").table(customer()).table(invoice()));
    let b = schema_of(
        StaticCatalog::new("sqlite")
            .table(reversed(invoice()))
            .table(reversed(customer())),
    );

    assert_ne!(a.tables[0].name, b.tables[0].name);
    assert_eq!(generate_schema_hash(&a), generate_schema_hash(&b));
}

#[test]
fn test_hash_ignores_names_and_timestamps() {
    let a = schema_of(StaticCatalog::new("sqlite").table(customer()));
    let b = introspect_schema(&StaticCatalog::new("postgresql").table(customer()), Some("other")).unwrap();
    assert_eq!(generate_schema_hash(&a), generate_schema_hash(&b));
}

#[test]
fn test_hash_changes_with_structure() {
    let base = generate_schema_hash(&schema_of(StaticCatalog::new("sqlite").table(customer())));

    let retyped = StaticTable::new("Customer")
        .column(CatalogColumn::new("CustomerId", "BIGINT").not_null())
        .column(CatalogColumn::new("Name", "TEXT"))
        .column(CatalogColumn::new("Email", "VARCHAR(60)"));
    let nullable = StaticTable::new("Customer")
        .column(CatalogColumn::new("CustomerId", "INTEGER"))
        .column(CatalogColumn::new("Name", "TEXT"))
        .column(CatalogColumn::new("Email", "VARCHAR(60)"));
    let extra_column = customer().column(CatalogColumn::new("Phone", "TEXT"));

    for variant in [retyped, nullable, extra_column] {
        let hash = generate_schema_hash(&schema_of(StaticCatalog::new("sqlite").table(variant)));
        assert_ne!(hash, base);
    }

    let with_invoice = generate_schema_hash(&schema_of(
        StaticCatalog::new("sqlite").table(customer()).table(invoice()),
    ));
    assert_ne!(with_invoice, base);
}
