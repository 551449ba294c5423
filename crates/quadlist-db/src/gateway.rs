use anyhow::anyhow;
use thiserror::Error;

/// Failures surfaced by a storage backend. Unique-constraint violations get
/// their own variant so callers can remap duplicate emails to a conflict
/// response instead of a generic storage failure.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("unique constraint violated")]
    Conflict,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Backend-neutral parameter and column value. Each variant keeps its SQL
/// type even when NULL so the PostgreSQL driver can bind typed nulls.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(Option<i64>),
    Real(Option<f64>),
    Text(Option<String>),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(Some(v))
    }
}

impl From<Option<i64>> for Value {
    fn from(v: Option<i64>) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(Some(v))
    }
}

impl From<Option<f64>> for Value {
    fn from(v: Option<f64>) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(Some(v.to_string()))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(Some(v))
    }
}

impl From<Option<String>> for Value {
    fn from(v: Option<String>) -> Self {
        Value::Text(v)
    }
}

/// Booleans are encoded 0/1 at the storage boundary; the rest of the code
/// works with real `bool`s.
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Int(Some(v as i64))
    }
}

impl Value {
    fn is_null(&self) -> bool {
        matches!(
            self,
            Value::Int(None) | Value::Real(None) | Value::Text(None)
        )
    }
}

/// One result row. Columns are addressed positionally, in the order of the
/// statement's select list.
#[derive(Debug)]
pub struct Row(pub(crate) Vec<Value>);

impl Row {
    fn value(&self, idx: usize) -> DbResult<&Value> {
        self.0
            .get(idx)
            .ok_or_else(|| anyhow!("column index {} out of range", idx).into())
    }

    pub fn get_i64(&self, idx: usize) -> DbResult<i64> {
        self.get_opt_i64(idx)?
            .ok_or_else(|| anyhow!("unexpected NULL in column {}", idx).into())
    }

    pub fn get_opt_i64(&self, idx: usize) -> DbResult<Option<i64>> {
        match self.value(idx)? {
            v if v.is_null() => Ok(None),
            Value::Int(Some(i)) => Ok(Some(*i)),
            other => Err(anyhow!("column {}: expected integer, got {:?}", idx, other).into()),
        }
    }

    /// SQLite's NUMERIC affinity may hand a whole-number price back as an
    /// integer, so both numeric variants are accepted.
    pub fn get_opt_f64(&self, idx: usize) -> DbResult<Option<f64>> {
        match self.value(idx)? {
            v if v.is_null() => Ok(None),
            Value::Real(Some(r)) => Ok(Some(*r)),
            Value::Int(Some(i)) => Ok(Some(*i as f64)),
            other => Err(anyhow!("column {}: expected real, got {:?}", idx, other).into()),
        }
    }

    pub fn get_str(&self, idx: usize) -> DbResult<String> {
        self.get_opt_str(idx)?
            .ok_or_else(|| anyhow!("unexpected NULL in column {}", idx).into())
    }

    pub fn get_opt_str(&self, idx: usize) -> DbResult<Option<String>> {
        match self.value(idx)? {
            v if v.is_null() => Ok(None),
            Value::Text(Some(s)) => Ok(Some(s.clone())),
            other => Err(anyhow!("column {}: expected text, got {:?}", idx, other).into()),
        }
    }

    pub fn get_bool(&self, idx: usize) -> DbResult<bool> {
        Ok(self.get_i64(idx)? != 0)
    }
}

/// Uniform data-access contract satisfied by both backends. Statements are
/// written once with `?` placeholders; adapters translate as needed. Callers
/// never concatenate user input into SQL.
pub trait Gateway: Send + Sync {
    /// Run a statement, returning the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> DbResult<u64>;

    /// Run a query, returning the full rowset.
    fn query(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>>;

    /// Create the schema if absent. Safe to call repeatedly.
    fn create_schema(&self) -> DbResult<()>;
}

/// Rewrite `?` placeholders to PostgreSQL's `$1..$n`, leaving quoted string
/// literals alone.
pub(crate) fn numbered_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut n = 0;
    let mut in_literal = false;
    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_literal = !in_literal;
                out.push(ch);
            }
            '?' if !in_literal => {
                n += 1;
                out.push('$');
                out.push_str(&n.to_string());
            }
            _ => out.push(ch),
        }
    }
    out
}
