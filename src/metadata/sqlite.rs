//! SQLite catalog reader.
//!
//! Reads structure through `sqlite_master` and the table-valued pragma
//! functions, so no row data is ever touched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{params, Connection, OpenFlags};
use tracing::debug;

use super::provider::{
    CatalogColumn, CatalogError, CatalogForeignKey, CatalogReader, CatalogResult,
    PrimaryKeyConstraint,
};

const TABLES_QUERY: &str = r#"
SELECT name FROM sqlite_master
WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
ORDER BY name
"#;

const COLUMNS_QUERY: &str = r#"
SELECT name, type, "notnull", dflt_value, pk
FROM pragma_table_info(?1)
ORDER BY cid
"#;

const FOREIGN_KEYS_QUERY: &str = r#"
SELECT id, seq, "table", "from", "to"
FROM pragma_foreign_key_list(?1)
ORDER BY id, seq
"#;

/// CatalogReader over a SQLite database.
///
/// The connection is guarded by a mutex so the reader can be shared
/// between threads.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
    name: Option<String>,
}

struct PragmaColumn {
    name: String,
    data_type: String,
    not_null: bool,
    default: Option<String>,
    pk_position: i64,
}

impl SqliteCatalog {
    /// Open a database file read-only.
    ///
    /// Fails if the file does not exist or is not a SQLite database.
    pub fn open(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
        )?;
        // Forces a header read so a non-database file fails here, not mid-introspection.
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })?;

        debug!(path = %path.display(), "opened sqlite catalog");
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
            name: None,
        })
    }

    /// Wrap an existing connection (e.g. an in-memory database).
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            path: None,
            name: None,
        }
    }

    /// Override the reported database name.
    pub fn with_database_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pragma_columns(&self, table: &str) -> CatalogResult<Vec<PragmaColumn>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(COLUMNS_QUERY)?;
        let columns = stmt
            .query_map(params![table], |row| {
                Ok(PragmaColumn {
                    name: row.get(0)?,
                    data_type: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    not_null: row.get::<_, i64>(2)? != 0,
                    default: row.get(3)?,
                    pk_position: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Err(CatalogError::TableNotFound(table.to_string()));
        }
        Ok(columns)
    }
}

impl CatalogReader for SqliteCatalog {
    fn dialect_name(&self) -> String {
        "sqlite".to_string()
    }

    fn database_name(&self) -> Option<String> {
        if let Some(name) = &self.name {
            return Some(name.clone());
        }
        self.path
            .as_ref()
            .and_then(|p| p.file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
    }

    fn table_names(&self) -> CatalogResult<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(TABLES_QUERY)?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn columns(&self, table: &str) -> CatalogResult<Vec<CatalogColumn>> {
        let columns = self.pragma_columns(table)?;

        // A single INTEGER PRIMARY KEY column aliases the rowid.
        let pk_columns: Vec<&PragmaColumn> =
            columns.iter().filter(|c| c.pk_position > 0).collect();
        let rowid_alias = match pk_columns.as_slice() {
            [only] if only.data_type.eq_ignore_ascii_case("INTEGER") => Some(only.name.clone()),
            _ => None,
        };

        Ok(columns
            .into_iter()
            .map(|c| CatalogColumn {
                autoincrement: rowid_alias.as_deref() == Some(c.name.as_str()),
                nullable: !c.not_null,
                name: c.name,
                data_type: c.data_type,
                default: c.default,
            })
            .collect())
    }

    fn primary_key(&self, table: &str) -> CatalogResult<PrimaryKeyConstraint> {
        let mut pk: Vec<PragmaColumn> = self
            .pragma_columns(table)?
            .into_iter()
            .filter(|c| c.pk_position > 0)
            .collect();
        pk.sort_by_key(|c| c.pk_position);

        Ok(PrimaryKeyConstraint {
            name: None,
            constrained_columns: pk.into_iter().map(|c| c.name).collect(),
        })
    }

    fn foreign_keys(&self, table: &str) -> CatalogResult<Vec<CatalogForeignKey>> {
        // (id) -> rows ordered by seq: (referred table, from column, to column)
        let mut grouped: BTreeMap<i64, Vec<(String, String, Option<String>)>> = BTreeMap::new();
        {
            let conn = self.conn();
            let mut stmt = conn.prepare(FOREIGN_KEYS_QUERY)?;
            let rows = stmt.query_map(params![table], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?;
            for row in rows {
                let (id, referred, from, to) = row?;
                grouped.entry(id).or_default().push((referred, from, to));
            }
        }

        let mut foreign_keys = Vec::with_capacity(grouped.len());
        for (_, rows) in grouped {
            let referred_table = rows[0].0.clone();
            let mut referred_pk: Option<Vec<String>> = None;
            let mut constrained_columns = Vec::with_capacity(rows.len());
            let mut referred_columns = Vec::with_capacity(rows.len());

            for (position, (_, from, to)) in rows.into_iter().enumerate() {
                let to = match to {
                    Some(to) => to,
                    // `REFERENCES t` without columns targets t's primary key.
                    None => {
                        if referred_pk.is_none() {
                            referred_pk = Some(
                                self.primary_key(&referred_table)
                                    .map(|pk| pk.constrained_columns)
                                    .unwrap_or_default(),
                            );
                        }
                        referred_pk
                            .as_ref()
                            .and_then(|pk| pk.get(position).cloned())
                            .unwrap_or_else(|| from.clone())
                    }
                };
                constrained_columns.push(from);
                referred_columns.push(to);
            }

            foreign_keys.push(CatalogForeignKey {
                name: None,
                constrained_columns,
                referred_table,
                referred_columns,
            });
        }

        Ok(foreign_keys)
    }
}
