use std::path::Path;
use std::sync::Mutex;

use anyhow::anyhow;
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use tracing::info;

use crate::gateway::{DbError, DbResult, Gateway, Row, Value};

/// Embedded single-file backend.
pub struct SqliteGateway {
    conn: Mutex<Connection>,
}

impl SqliteGateway {
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path).map_err(classify)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(classify)?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(classify)?;

        info!("SQLite database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database for tests. WAL does not apply here.
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory().map_err(classify)?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(classify)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DbError::Other(anyhow!("DB lock poisoned: {}", e)))?;
        f(&conn)
    }
}

impl Gateway for SqliteGateway {
    fn execute(&self, sql: &str, params: &[Value]) -> DbResult<u64> {
        self.with_conn(|conn| {
            let count = conn
                .execute(sql, rusqlite::params_from_iter(to_sqlite(params)))
                .map_err(classify)?;
            Ok(count as u64)
        })
    }

    fn query(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql).map_err(classify)?;
            let ncols = stmt.column_count();
            let mut rows = stmt
                .query(rusqlite::params_from_iter(to_sqlite(params)))
                .map_err(classify)?;

            let mut out = Vec::new();
            while let Some(row) = rows.next().map_err(classify)? {
                let mut cols = Vec::with_capacity(ncols);
                for i in 0..ncols {
                    cols.push(from_sqlite(row.get_ref(i).map_err(classify)?)?);
                }
                out.push(Row(cols));
            }
            Ok(out)
        })
    }

    fn create_schema(&self) -> DbResult<()> {
        self.with_conn(|conn| {
            conn.execute_batch(SCHEMA).map_err(classify)?;
            info!("SQLite schema ready");
            Ok(())
        })
    }
}

fn to_sqlite(params: &[Value]) -> Vec<rusqlite::types::Value> {
    params
        .iter()
        .map(|v| match v {
            Value::Int(Some(i)) => rusqlite::types::Value::Integer(*i),
            Value::Real(Some(r)) => rusqlite::types::Value::Real(*r),
            Value::Text(Some(s)) => rusqlite::types::Value::Text(s.clone()),
            Value::Int(None) | Value::Real(None) | Value::Text(None) => {
                rusqlite::types::Value::Null
            }
        })
        .collect()
}

fn from_sqlite(value: ValueRef<'_>) -> DbResult<Value> {
    match value {
        ValueRef::Null => Ok(Value::Text(None)),
        ValueRef::Integer(i) => Ok(Value::Int(Some(i))),
        ValueRef::Real(r) => Ok(Value::Real(Some(r))),
        ValueRef::Text(t) => Ok(Value::Text(Some(
            String::from_utf8_lossy(t).into_owned(),
        ))),
        ValueRef::Blob(_) => Err(anyhow!("unexpected BLOB column").into()),
    }
}

fn classify(e: rusqlite::Error) -> DbError {
    let conflict = matches!(
        &e,
        rusqlite::Error::SqliteFailure(err, Some(msg))
            if err.code == rusqlite::ErrorCode::ConstraintViolation && msg.contains("UNIQUE")
    );
    if conflict {
        DbError::Conflict
    } else {
        DbError::Other(e.into())
    }
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        email             TEXT UNIQUE NOT NULL,
        password          TEXT NOT NULL,
        first_name        TEXT NOT NULL,
        last_name         TEXT NOT NULL,
        phone             TEXT,
        major             TEXT,
        graduation_year   INTEGER,
        campus            TEXT,
        bio               TEXT,
        preferred_contact TEXT DEFAULT 'email',
        notifications     INTEGER DEFAULT 1,
        messages          INTEGER DEFAULT 1,
        created_at        DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at        DATETIME DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS listings (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id     INTEGER NOT NULL REFERENCES users(id),
        title       TEXT NOT NULL,
        description TEXT NOT NULL,
        category    TEXT NOT NULL,
        price       DECIMAL(10,2),
        status      TEXT DEFAULT 'active',
        images      TEXT,
        created_at  DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at  DATETIME DEFAULT CURRENT_TIMESTAMP
    );

    CREATE INDEX IF NOT EXISTS idx_listings_owner
        ON listings(user_id, created_at);

    CREATE TABLE IF NOT EXISTS email_verifications (
        id                INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id           INTEGER NOT NULL REFERENCES users(id),
        verification_code TEXT NOT NULL,
        verified          INTEGER DEFAULT 0,
        created_at        DATETIME DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS messages (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        listing_id   INTEGER NOT NULL REFERENCES listings(id),
        sender_id    INTEGER NOT NULL REFERENCES users(id),
        recipient_id INTEGER NOT NULL REFERENCES users(id),
        message      TEXT NOT NULL,
        created_at   DATETIME DEFAULT CURRENT_TIMESTAMP
    );
";
