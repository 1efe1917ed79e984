use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde_json::json;

use crate::errors::PariahError;
use crate::model::{value_to_key, Key};
use crate::storage::{compare_values, loosely_equal, Direction, Row, RowQuery, RowStore, PRIMARY_KEY};

#[derive(Debug, Default)]
struct MemoryTable {
    rows: Vec<Row>,
    next_id: u64,
}

impl MemoryTable {
    fn position(&self, id: &str) -> Option<usize> {
        self.rows.iter().position(|row| {
            row.get(PRIMARY_KEY)
                .and_then(value_to_key)
                .map_or(false, |k| k == id)
        })
    }
}

/// In-process row store. Tables are created on first insert; reading an
/// unknown table yields no rows. Rows keep insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<BTreeMap<String, MemoryTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every row in a table.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .read()
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }
}

impl RowStore for MemoryStore {
    fn find_by_id(&self, table: &str, id: &str) -> Result<Option<Row>, PariahError> {
        let tables = self.tables.read();
        Ok(tables
            .get(table)
            .and_then(|t| t.position(id).map(|i| t.rows[i].clone())))
    }

    fn find_where(
        &self,
        table: &str,
        predicates: &Row,
        query: &RowQuery,
    ) -> Result<Vec<Row>, PariahError> {
        let tables = self.tables.read();
        let Some(t) = tables.get(table) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<Row> = t
            .rows
            .iter()
            .filter(|row| {
                predicates.iter().all(|(column, expected)| match row.get(column) {
                    Some(actual) => loosely_equal(actual, expected),
                    None => expected.is_null(),
                })
            })
            .cloned()
            .collect();

        if let Some((column, direction)) = &query.order {
            rows.sort_by(|a, b| {
                let a = a.get(column).unwrap_or(&serde_json::Value::Null);
                let b = b.get(column).unwrap_or(&serde_json::Value::Null);
                match direction {
                    Direction::Asc => compare_values(a, b),
                    Direction::Desc => compare_values(b, a),
                }
            });
        }

        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    fn insert(&self, table: &str, columns: &Row) -> Result<Key, PariahError> {
        let mut tables = self.tables.write();
        let t = tables.entry(table.to_string()).or_default();

        let mut row = columns.clone();
        let id = match columns.get(PRIMARY_KEY).and_then(value_to_key) {
            Some(id) => {
                if t.position(&id).is_some() {
                    return Err(PariahError::Schema(format!(
                        "duplicate primary key {id} in `{table}`"
                    )));
                }
                if let Ok(n) = id.parse::<u64>() {
                    t.next_id = t.next_id.max(n);
                }
                id
            }
            None => {
                t.next_id += 1;
                row.insert(PRIMARY_KEY.to_string(), json!(t.next_id));
                t.next_id.to_string()
            }
        };

        t.rows.push(row);
        tracing::debug!(table, %id, "Inserted row");
        Ok(id)
    }

    fn update(&self, table: &str, columns: &Row, id: &str) -> Result<(), PariahError> {
        let mut tables = self.tables.write();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| PariahError::NotFound(format!("{table} row {id}")))?;
        let index = t
            .position(id)
            .ok_or_else(|| PariahError::NotFound(format!("{table} row {id}")))?;

        let row = &mut t.rows[index];
        for (column, value) in columns {
            if column != PRIMARY_KEY {
                row.insert(column.clone(), value.clone());
            }
        }
        Ok(())
    }

    fn delete(&self, table: &str, id: &str) -> Result<(), PariahError> {
        let mut tables = self.tables.write();
        if let Some(t) = tables.get_mut(table) {
            if let Some(index) = t.position(id) {
                t.rows.remove(index);
            }
        }
        Ok(())
    }
}
