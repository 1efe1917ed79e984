//! Row-store collaborator consumed by the mappers.
//!
//! A row is a column -> value map. Every table has an `id` primary key
//! column; ids travel as strings and stores convert them to their native
//! key type.

pub mod memory;
pub mod sql;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::errors::PariahError;
use crate::model::{Key, Value};

pub use memory::MemoryStore;
pub use sql::SqlStore;

/// Primary key column of every table.
pub const PRIMARY_KEY: &str = "id";

/// Column name -> value.
pub type Row = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Ordering and pagination for `find_where`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowQuery {
    pub order: Option<(String, Direction)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Synchronous row storage.
///
/// Implementations must be shareable across threads; a mapper holds one
/// store for its whole lifetime and calls it from any request thread.
pub trait RowStore: Send + Sync {
    fn find_by_id(&self, table: &str, id: &str) -> Result<Option<Row>, PariahError>;

    /// Rows whose columns equal every predicate, ordered and paginated.
    fn find_where(
        &self,
        table: &str,
        predicates: &Row,
        query: &RowQuery,
    ) -> Result<Vec<Row>, PariahError>;

    /// Insert a row and return its new id.
    fn insert(&self, table: &str, columns: &Row) -> Result<Key, PariahError>;

    fn update(&self, table: &str, columns: &Row, id: &str) -> Result<(), PariahError>;

    fn delete(&self, table: &str, id: &str) -> Result<(), PariahError>;
}

/// Ordering used by stores that sort in process: null first, then numbers,
/// then strings, then anything else by its JSON text.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            _ => 4,
        }
    }

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a)
            .cmp(&rank(b))
            .then_with(|| a.to_string().cmp(&b.to_string())),
    }
}

/// Equality that treats `3` and `"3"` as the same key.
pub(crate) fn loosely_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            n.to_string() == *s
        }
        _ => false,
    }
}
