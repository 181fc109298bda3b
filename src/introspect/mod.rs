//! Schema introspection.
//!
//! Reflects a database catalog into a normalized [`DatabaseSchema`]. The pass
//! is all-or-nothing: any catalog failure aborts it and no partial schema is
//! returned.
//!
//! # Example
//!
//! ```ignore
//! use schema_intel::introspect::{introspect_schema, generate_schema_hash};
//! use schema_intel::metadata::SqliteCatalog;
//!
//! let catalog = SqliteCatalog::open("./chinook.db")?;
//! let schema = introspect_schema(&catalog, None)?;
//! let fingerprint = generate_schema_hash(&schema);
//! ```

use std::collections::HashSet;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::cache::sha256_hex;
use crate::metadata::{CatalogError, CatalogForeignKey, CatalogReader};
use crate::schema::{ColumnInfo, ColumnType, DatabaseSchema, ForeignKeyRelation, TableInfo};

/// Version tag stamped on every introspected schema.
pub const SCHEMA_VERSION: &str = "1.0";

/// Name used when neither the caller nor the catalog names the database.
pub const DEFAULT_DATABASE_NAME: &str = "default";

static TYPE_LENGTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*(\d+)").expect("valid length regex"));

/// Errors that abort an introspection pass.
#[derive(Debug, thiserror::Error)]
pub enum IntrospectError {
    #[error("Catalog access failed: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Database contains no tables")]
    EmptySchema,

    #[error("Duplicate table name: {0}")]
    DuplicateTable(String),
}

pub type IntrospectResult<T> = Result<T, IntrospectError>;

/// Ordered substring rules; the first match wins.
const TYPE_RULES: &[(&[&str], ColumnType)] = &[
    (&["INT"], ColumnType::Integer),
    (&["VARCHAR", "CHAR"], ColumnType::Varchar),
    (&["TEXT"], ColumnType::Text),
    (&["REAL", "DOUBLE", "FLOAT"], ColumnType::Real),
    (&["BLOB"], ColumnType::Blob),
    (&["BOOLEAN", "BOOL"], ColumnType::Boolean),
    (&["DATETIME"], ColumnType::Datetime),
    (&["DATE"], ColumnType::Date),
    (&["TIME"], ColumnType::Time),
    (&["DECIMAL"], ColumnType::Decimal),
];

/// Map a raw database type string to its standardized category.
pub fn map_column_type(raw: &str) -> ColumnType {
    let upper = raw.to_uppercase();
    TYPE_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| upper.contains(n)))
        .map(|(_, category)| *category)
        .unwrap_or(ColumnType::Unknown)
}

/// Normalize an engine's dialect name.
pub fn normalize_dialect(name: &str) -> String {
    if name.starts_with("postgres") {
        "postgresql".to_string()
    } else if name.starts_with("mysql") {
        "mysql".to_string()
    } else if name.starts_with("sqlite") {
        "sqlite".to_string()
    } else {
        name.to_string()
    }
}

/// Declared length of a character type, e.g. 40 for `NVARCHAR(40)`.
fn type_length(raw: &str, category: ColumnType) -> Option<u32> {
    if category != ColumnType::Varchar {
        return None;
    }
    TYPE_LENGTH
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Resolve the referenced column for `column` within a foreign-key constraint.
fn referred_column(fk: &CatalogForeignKey, column: &str) -> String {
    fk.constrained_columns
        .iter()
        .position(|c| c == column)
        .and_then(|i| fk.referred_columns.get(i))
        .or_else(|| fk.referred_columns.first())
        .cloned()
        .unwrap_or_else(|| column.to_string())
}

/// Introspect one table.
fn introspect_table<C: CatalogReader + ?Sized>(
    catalog: &C,
    table_name: &str,
) -> IntrospectResult<TableInfo> {
    let raw_columns = catalog.columns(table_name)?;
    let pk_columns = catalog.primary_key(table_name)?.constrained_columns;
    let raw_foreign_keys = catalog.foreign_keys(table_name)?;

    let mut columns = Vec::with_capacity(raw_columns.len());
    let mut foreign_keys = Vec::new();

    for col in raw_columns {
        let type_category = map_column_type(&col.data_type);
        let fk = raw_foreign_keys
            .iter()
            .find(|fk| fk.constrained_columns.contains(&col.name));

        let foreign_key = fk.map(|fk| {
            let to_column = referred_column(fk, &col.name);
            let relation = ForeignKeyRelation {
                from_table: table_name.to_string(),
                from_column: col.name.clone(),
                to_table: fk.referred_table.clone(),
                to_column: to_column.clone(),
                constraint_name: fk.name.clone(),
            };
            foreign_keys.push(relation);
            format!("{}.{}", fk.referred_table, to_column)
        });

        columns.push(ColumnInfo {
            primary_key: pk_columns.contains(&col.name),
            max_length: type_length(&col.data_type, type_category),
            name: col.name,
            data_type: col.data_type,
            type_category,
            nullable: col.nullable,
            foreign_key,
            default_value: col.default,
            auto_increment: col.autoincrement,
        });
    }

    debug!(
        table = table_name,
        columns = columns.len(),
        foreign_keys = foreign_keys.len(),
        "introspected table"
    );

    Ok(TableInfo {
        name: table_name.to_string(),
        columns,
        primary_keys: pk_columns,
        foreign_keys,
        row_count: catalog.row_count(table_name)?,
        table_comment: catalog.table_comment(table_name)?,
    })
}

/// Introspect the full schema of a catalog.
///
/// The database name is taken from `database_name`, else the catalog, else
/// [`DEFAULT_DATABASE_NAME`]. A catalog without tables is an error.
pub fn introspect_schema<C: CatalogReader + ?Sized>(
    catalog: &C,
    database_name: Option<&str>,
) -> IntrospectResult<DatabaseSchema> {
    let dialect = normalize_dialect(&catalog.dialect_name());
    let database_name = database_name
        .map(str::to_string)
        .or_else(|| catalog.database_name())
        .unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string());

    let table_names = catalog.table_names()?;
    if table_names.is_empty() {
        return Err(IntrospectError::EmptySchema);
    }

    let mut seen = HashSet::with_capacity(table_names.len());
    let mut tables = Vec::with_capacity(table_names.len());
    for table_name in &table_names {
        if !seen.insert(table_name.to_lowercase()) {
            return Err(IntrospectError::DuplicateTable(table_name.clone()));
        }
        tables.push(introspect_table(catalog, table_name)?);
    }

    let relationships: Vec<ForeignKeyRelation> = tables
        .iter()
        .flat_map(|t| t.foreign_keys.iter().cloned())
        .collect();

    info!(
        database = %database_name,
        dialect = %dialect,
        tables = tables.len(),
        relationships = relationships.len(),
        "introspected schema"
    );

    Ok(DatabaseSchema {
        database_name,
        database_type: dialect,
        total_tables: tables.len(),
        tables,
        relationships,
        schema_version: SCHEMA_VERSION.to_string(),
        extracted_at: Utc::now(),
    })
}

/// Deterministic fingerprint of a schema's structure.
///
/// Tables, columns and foreign keys are sorted before hashing, so the hash
/// does not depend on the order the catalog reported them in. Returns the
/// first 16 hex characters of a SHA256 digest.
pub fn generate_schema_hash(schema: &DatabaseSchema) -> String {
    let mut parts: Vec<&str> = Vec::new();

    let mut tables: Vec<&TableInfo> = schema.tables.iter().collect();
    tables.sort_by(|a, b| a.name.cmp(&b.name));

    for table in tables {
        parts.push(&table.name);

        let mut columns: Vec<&ColumnInfo> = table.columns.iter().collect();
        columns.sort_by(|a, b| a.name.cmp(&b.name));
        for col in columns {
            parts.push(&col.name);
            parts.push(&col.data_type);
            parts.push(if col.nullable { "1" } else { "0" });
        }

        let mut fks: Vec<&ForeignKeyRelation> = table.foreign_keys.iter().collect();
        fks.sort_by(|a, b| {
            (&a.from_table, &a.to_table, &a.from_column, &a.to_column)
                .cmp(&(&b.from_table, &b.to_table, &b.from_column, &b.to_column))
        });
        for fk in fks {
            parts.push(&fk.from_table);
            parts.push(&fk.to_table);
            parts.push(&fk.from_column);
            parts.push(&fk.to_column);
        }
    }

    let mut digest = sha256_hex(&parts.join("|"));
    digest.truncate(16);
    digest
}
