use crate::{Connection, Error, Result, SqlWriter, truncate_long};
use std::{
    collections::HashMap,
    sync::{Arc, OnceLock},
};
use tokio::sync::RwLock;

/// Discovered shape of one table: its primary key and ordered column list.
///
/// Built once from database introspection and immutable afterwards; every
/// operation on the table shares the same instance through the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table: String,
    pub primary_key: String,
    /// All column names in database order. Contains `primary_key`.
    pub columns: Vec<String>,
}

impl TableSchema {
    pub fn new(
        table: impl Into<String>,
        primary_key: impl Into<String>,
        columns: Vec<String>,
    ) -> Result<Self> {
        let table = table.into();
        let primary_key = primary_key.into();
        if !columns.iter().any(|c| *c == primary_key) {
            return Err(Error::msg(format!(
                "Primary key `{}` of table `{}` is not among its columns {:?}",
                primary_key, table, columns,
            )));
        }
        Ok(Self {
            table,
            primary_key,
            columns,
        })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }
}

/// Process-wide cache of table name to [`TableSchema`].
///
/// Lazily populated: the first reference to a table introspects the database
/// through the connection's dialect writer, later references hit the cache.
/// Append-only for the process lifetime; schema drift in a running process
/// is unsupported. Under concurrent first access the first completed writer
/// wins and every caller observes its entry.
#[derive(Default)]
pub struct SchemaCatalog {
    tables: RwLock<HashMap<String, Arc<TableSchema>>>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached schema for `table`, introspecting on first access.
    ///
    /// An unknown table or an undiscoverable primary key is a fatal error;
    /// there is no fallback schema and failures are not cached.
    pub async fn resolve<C: Connection>(
        &self,
        con: &mut C,
        table: &str,
    ) -> Result<Arc<TableSchema>> {
        if let Some(schema) = self.tables.read().await.get(table) {
            return Ok(schema.clone());
        }
        let writer = con.sql_writer();
        let mut sql = String::with_capacity(256);
        writer.write_table_columns(&mut sql, table);
        log::debug!("{}", truncate_long!(sql));
        let rows = con.fetch_all(&sql).await?;
        let schema = Arc::new(writer.parse_table_columns(table, rows)?);
        let mut tables = self.tables.write().await;
        Ok(tables
            .entry(table.to_owned())
            .or_insert(schema)
            .clone())
    }

    /// Cached entry, if the table was already resolved.
    pub async fn cached(&self, table: &str) -> Option<Arc<TableSchema>> {
        self.tables.read().await.get(table).cloned()
    }
}

/// The process-wide catalog instance shared by all adapters.
pub fn catalog() -> &'static SchemaCatalog {
    static CATALOG: OnceLock<SchemaCatalog> = OnceLock::new();
    CATALOG.get_or_init(SchemaCatalog::new)
}
