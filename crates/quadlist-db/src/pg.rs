use std::sync::Mutex;

use anyhow::anyhow;
use chrono::{DateTime, NaiveDateTime, Utc};
use postgres::error::SqlState;
use postgres::types::{ToSql, Type};
use postgres::{Client, NoTls};
use tracing::info;

use crate::gateway::{DbError, DbResult, Gateway, Row, Value, numbered_placeholders};

/// Networked relational backend. The synchronous client mirrors the SQLite
/// adapter's locked-connection access pattern; callers already run gateway
/// work on blocking threads.
pub struct PostgresGateway {
    client: Mutex<Client>,
}

impl PostgresGateway {
    pub fn connect(url: &str) -> DbResult<Self> {
        let client = Client::connect(url, NoTls).map_err(classify)?;
        info!("Connected to PostgreSQL");
        Ok(Self {
            client: Mutex::new(client),
        })
    }

    fn with_client<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&mut Client) -> DbResult<T>,
    {
        let mut client = self
            .client
            .lock()
            .map_err(|e| DbError::Other(anyhow!("DB lock poisoned: {}", e)))?;
        f(&mut client)
    }
}

impl Gateway for PostgresGateway {
    fn execute(&self, sql: &str, params: &[Value]) -> DbResult<u64> {
        let sql = numbered_placeholders(sql);
        self.with_client(|client| {
            client
                .execute(sql.as_str(), &pg_params(params))
                .map_err(classify)
        })
    }

    fn query(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>> {
        let sql = numbered_placeholders(sql);
        self.with_client(|client| {
            let rows = client
                .query(sql.as_str(), &pg_params(params))
                .map_err(classify)?;
            rows.iter().map(from_pg).collect()
        })
    }

    fn create_schema(&self) -> DbResult<()> {
        self.with_client(|client| {
            client.batch_execute(SCHEMA).map_err(classify)?;
            info!("PostgreSQL schema ready");
            Ok(())
        })
    }
}

fn pg_params(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params
        .iter()
        .map(|v| match v {
            Value::Int(o) => o as &(dyn ToSql + Sync),
            Value::Real(o) => o as &(dyn ToSql + Sync),
            Value::Text(o) => o as &(dyn ToSql + Sync),
        })
        .collect()
}

fn from_pg(row: &postgres::Row) -> DbResult<Row> {
    let mut cols = Vec::with_capacity(row.len());
    for (i, col) in row.columns().iter().enumerate() {
        let ty = col.type_();
        let value = if *ty == Type::INT2 {
            Value::Int(
                row.try_get::<_, Option<i16>>(i)
                    .map_err(classify)?
                    .map(i64::from),
            )
        } else if *ty == Type::INT4 {
            Value::Int(
                row.try_get::<_, Option<i32>>(i)
                    .map_err(classify)?
                    .map(i64::from),
            )
        } else if *ty == Type::INT8 {
            Value::Int(row.try_get::<_, Option<i64>>(i).map_err(classify)?)
        } else if *ty == Type::FLOAT4 {
            Value::Real(
                row.try_get::<_, Option<f32>>(i)
                    .map_err(classify)?
                    .map(f64::from),
            )
        } else if *ty == Type::FLOAT8 {
            Value::Real(row.try_get::<_, Option<f64>>(i).map_err(classify)?)
        } else if *ty == Type::BOOL {
            Value::Int(
                row.try_get::<_, Option<bool>>(i)
                    .map_err(classify)?
                    .map(i64::from),
            )
        } else if *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR {
            Value::Text(row.try_get::<_, Option<String>>(i).map_err(classify)?)
        } else if *ty == Type::TIMESTAMPTZ {
            Value::Text(
                row.try_get::<_, Option<DateTime<Utc>>>(i)
                    .map_err(classify)?
                    .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            )
        } else if *ty == Type::TIMESTAMP {
            Value::Text(
                row.try_get::<_, Option<NaiveDateTime>>(i)
                    .map_err(classify)?
                    .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            )
        } else {
            return Err(anyhow!("unsupported column type {}", ty).into());
        };
        cols.push(value);
    }
    Ok(Row(cols))
}

fn classify(e: postgres::Error) -> DbError {
    if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        DbError::Conflict
    } else {
        DbError::Other(e.into())
    }
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id                BIGSERIAL PRIMARY KEY,
        email             TEXT UNIQUE NOT NULL,
        password          TEXT NOT NULL,
        first_name        TEXT NOT NULL,
        last_name         TEXT NOT NULL,
        phone             TEXT,
        major             TEXT,
        graduation_year   BIGINT,
        campus            TEXT,
        bio               TEXT,
        preferred_contact TEXT DEFAULT 'email',
        notifications     BIGINT DEFAULT 1,
        messages          BIGINT DEFAULT 1,
        created_at        TIMESTAMPTZ DEFAULT now(),
        updated_at        TIMESTAMPTZ DEFAULT now()
    );

    CREATE TABLE IF NOT EXISTS listings (
        id          BIGSERIAL PRIMARY KEY,
        user_id     BIGINT NOT NULL REFERENCES users(id),
        title       TEXT NOT NULL,
        description TEXT NOT NULL,
        category    TEXT NOT NULL,
        price       DOUBLE PRECISION,
        status      TEXT DEFAULT 'active',
        images      TEXT,
        created_at  TIMESTAMPTZ DEFAULT now(),
        updated_at  TIMESTAMPTZ DEFAULT now()
    );

    CREATE INDEX IF NOT EXISTS idx_listings_owner
        ON listings(user_id, created_at);

    CREATE TABLE IF NOT EXISTS email_verifications (
        id                BIGSERIAL PRIMARY KEY,
        user_id           BIGINT NOT NULL REFERENCES users(id),
        verification_code TEXT NOT NULL,
        verified          BIGINT DEFAULT 0,
        created_at        TIMESTAMPTZ DEFAULT now()
    );

    CREATE TABLE IF NOT EXISTS messages (
        id           BIGSERIAL PRIMARY KEY,
        listing_id   BIGINT NOT NULL REFERENCES listings(id),
        sender_id    BIGINT NOT NULL REFERENCES users(id),
        recipient_id BIGINT NOT NULL REFERENCES users(id),
        message      TEXT NOT NULL,
        created_at   TIMESTAMPTZ DEFAULT now()
    );
";
