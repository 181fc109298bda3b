//! Integration tests for join path search over introspected schemas.

use schema_intel::graph::{query::UNKNOWN_COLUMN, RelationshipGraph};
use schema_intel::introspect::introspect_schema;
use schema_intel::metadata::{CatalogColumn, StaticCatalog, StaticTable};
use schema_intel::schema::DatabaseSchema;

fn id_table(name: &str) -> StaticTable {
    StaticTable::new(name)
        .column(CatalogColumn::new("Id", "INTEGER").not_null())
        .primary_key(&["Id"])
}

/// A–B–C and A–D–C, plus an unconnected Z.
fn diamond() -> DatabaseSchema {
    let catalog = StaticCatalog::new("sqlite")
        .table(id_table("A"))
        .table(
            id_table("B")
                .column(CatalogColumn::new("AId", "INTEGER"))
                .column(CatalogColumn::new("CId", "INTEGER"))
                .foreign_key(&["AId"], "A", &["Id"])
                .foreign_key(&["CId"], "C", &["Id"]),
        )
        .table(id_table("C"))
        .table(
            id_table("D")
                .column(CatalogColumn::new("AId", "INTEGER"))
                .column(CatalogColumn::new("CId", "INTEGER"))
                .foreign_key(&["AId"], "A", &["Id"])
                .foreign_key(&["CId"], "C", &["Id"]),
        )
        .table(id_table("Z"));
    introspect_schema(&catalog, Some("diamond")).unwrap()
}

/// Chinook-style chain: InvoiceLine → Invoice → Customer → Employee.
fn chinook() -> DatabaseSchema {
    let catalog = StaticCatalog::new("sqlite")
        .table(
            StaticTable::new("Employee")
                .column(CatalogColumn::new("EmployeeId", "INTEGER").not_null())
                .column(CatalogColumn::new("ReportsTo", "INTEGER"))
                .primary_key(&["EmployeeId"])
                .foreign_key(&["ReportsTo"], "Employee", &["EmployeeId"]),
        )
        .table(
            StaticTable::new("Customer")
                .column(CatalogColumn::new("CustomerId", "INTEGER").not_null())
                .column(CatalogColumn::new("SupportRepId", "INTEGER"))
                .primary_key(&["CustomerId"])
                .named_foreign_key(
                    Some("FK_CustomerSupportRepId"),
                    &["SupportRepId"],
                    "Employee",
                    &["EmployeeId"],
                ),
        )
        .table(
            StaticTable::new("Invoice")
                .column(CatalogColumn::new("InvoiceId", "INTEGER").not_null())
                .column(CatalogColumn::new("CustomerId", "INTEGER").not_null())
                .primary_key(&["InvoiceId"])
                .foreign_key(&["CustomerId"], "Customer", &["CustomerId"]),
        )
        .table(
            StaticTable::new("InvoiceLine")
                .column(CatalogColumn::new("InvoiceLineId", "INTEGER").not_null())
                .column(CatalogColumn::new("InvoiceId", "INTEGER").not_null())
                .primary_key(&["InvoiceLineId"])
                .foreign_key(&["InvoiceId"], "Invoice", &["InvoiceId"]),
        );
    introspect_schema(&catalog, Some("chinook")).unwrap()
}

// ============================================================================
// Shortest path
// ============================================================================

#[test]
fn test_diamond_path_has_three_nodes() {
    let schema = diamond();
    let graph = RelationshipGraph::from_schema(&schema);

    let path = graph.shortest_path("A", "C").unwrap();
    assert_eq!(path.len(), 3);
    assert_eq!(path.first().map(String::as_str), Some("A"));
    assert_eq!(path.last().map(String::as_str), Some("C"));
    // B's relationships were recorded first.
    assert_eq!(path, vec!["A", "B", "C"]);
}

#[test]
fn test_path_to_self() {
    let schema = diamond();
    let graph = RelationshipGraph::from_schema(&schema);
    assert_eq!(graph.shortest_path("A", "A").unwrap(), vec!["A"]);
    // Holds even for a table outside the graph.
    assert_eq!(graph.shortest_path("Z", "Z").unwrap(), vec!["Z"]);
}

#[test]
fn test_unconnected_or_unknown_tables_have_no_path() {
    let schema = diamond();
    let graph = RelationshipGraph::from_schema(&schema);
    assert_eq!(graph.shortest_path("A", "Z"), None);
    assert_eq!(graph.shortest_path("Z", "A"), None);
    assert_eq!(graph.shortest_path("A", "Nope"), None);
    assert!(graph.join_path("A", "Z").is_none());
}

#[test]
fn test_path_is_symmetric_in_length() {
    let schema = chinook();
    let graph = RelationshipGraph::from_schema(&schema);

    let forward = graph.shortest_path("InvoiceLine", "Employee").unwrap();
    let backward = graph.shortest_path("Employee", "InvoiceLine").unwrap();
    assert_eq!(forward, vec!["InvoiceLine", "Invoice", "Customer", "Employee"]);
    assert_eq!(forward.len(), backward.len());
}

// ============================================================================
// Join materialization
// ============================================================================

#[test]
fn test_join_path_steps() {
    let schema = chinook();
    let graph = RelationshipGraph::from_schema(&schema);

    let path = graph.join_path("InvoiceLine", "Customer").unwrap();
    assert_eq!(path.tables, vec!["InvoiceLine", "Invoice", "Customer"]);
    assert_eq!(path.total_steps(), 2);
    assert!(!path.is_direct());
    assert_eq!(path.intermediate_tables(), ["Invoice".to_string()]);

    assert_eq!(path.steps[0].from_table, "InvoiceLine");
    assert_eq!(path.steps[0].from_column, "InvoiceId");
    assert_eq!(path.steps[0].to_table, "Invoice");
    assert_eq!(path.steps[1].from_table, "Invoice");
    assert_eq!(path.steps[1].to_column, "CustomerId");
}

#[test]
fn test_steps_keep_recorded_direction() {
    let schema = chinook();
    let graph = RelationshipGraph::from_schema(&schema);

    let path = graph.join_path("Employee", "Customer").unwrap();
    assert!(path.is_direct());
    let step = &path.steps[0];
    assert_eq!(step.from_table, "Customer");
    assert_eq!(step.from_column, "SupportRepId");
    assert_eq!(step.to_table, "Employee");
    assert_eq!(step.constraint_name.as_deref(), Some("FK_CustomerSupportRepId"));
}

#[test]
fn test_materialize_unlinked_pair_uses_placeholder() {
    let schema = diamond();
    let graph = RelationshipGraph::from_schema(&schema);

    let edges = graph.materialize_edges(&["A", "Z"]);
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].from_table, "A");
    assert_eq!(edges[0].to_table, "Z");
    assert_eq!(edges[0].from_column, UNKNOWN_COLUMN);
    assert_eq!(edges[0].to_column, UNKNOWN_COLUMN);
}

// ============================================================================
// Analysis
// ============================================================================

#[test]
fn test_analysis() {
    let schema = diamond();
    let analysis = RelationshipGraph::from_schema(&schema).analyze();

    assert_eq!(analysis.total_tables, 5);
    assert_eq!(analysis.total_relationships, 4);
    assert_eq!(analysis.tables_with_relationships, 4);
    assert_eq!(analysis.isolated_tables, vec!["Z"]);
    assert_eq!(
        analysis.most_connected_tables,
        vec![
            ("A".to_string(), 2),
            ("B".to_string(), 2),
            ("C".to_string(), 2),
            ("D".to_string(), 2)
        ]
    );
}

#[test]
fn test_self_reference_counts_twice() {
    let schema = chinook();
    let graph = RelationshipGraph::from_schema(&schema);
    let analysis = graph.analyze();

    // Employee.ReportsTo plus Customer.SupportRepId
    assert_eq!(analysis.most_connected_tables[0], ("Employee".to_string(), 3));
    assert_eq!(graph.neighbors("Employee"), vec!["Employee", "Customer"]);
}
