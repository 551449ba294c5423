pub mod gateway;
pub mod models;
mod pg;
pub mod queries;
mod seed;
mod sqlite;

use std::path::Path;

use crate::gateway::{Gateway, Row, Value};
pub use crate::gateway::{DbError, DbResult};

/// Handle to the persistence gateway. The backend is fixed at construction;
/// everything above this type speaks domain operations, never SQL.
pub struct Database {
    gw: Box<dyn Gateway>,
}

impl Database {
    /// Open (or create) the embedded single-file store.
    pub fn open_sqlite(path: &Path) -> DbResult<Self> {
        let db = Self {
            gw: Box::new(sqlite::SqliteGateway::open(path)?),
        };
        db.gw.create_schema()?;
        Ok(db)
    }

    /// In-memory store, used by the test suites.
    pub fn open_in_memory() -> DbResult<Self> {
        let db = Self {
            gw: Box::new(sqlite::SqliteGateway::open_in_memory()?),
        };
        db.gw.create_schema()?;
        Ok(db)
    }

    /// Connect to the networked store.
    pub fn connect_postgres(url: &str) -> DbResult<Self> {
        let db = Self {
            gw: Box::new(pg::PostgresGateway::connect(url)?),
        };
        db.gw.create_schema()?;
        Ok(db)
    }

    pub(crate) fn execute(&self, sql: &str, params: &[Value]) -> DbResult<u64> {
        self.gw.execute(sql, params)
    }

    pub(crate) fn query(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>> {
        self.gw.query(sql, params)
    }

    pub(crate) fn query_row(&self, sql: &str, params: &[Value]) -> DbResult<Option<Row>> {
        Ok(self.gw.query(sql, params)?.into_iter().next())
    }
}
