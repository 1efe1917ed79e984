use sea_orm::sea_query::{
    Alias, Asterisk, Expr, Order, Query, SelectStatement, SimpleExpr, Value as SqlValue,
};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, FromQueryResult, JsonValue};
use tokio::runtime::{Builder, Runtime};

use crate::errors::PariahError;
use crate::model::{Key, Value};
use crate::settings::Database as DbCfg;
use crate::storage::{Direction, Row, RowQuery, RowStore, PRIMARY_KEY};

/// Row store over a SeaORM connection.
///
/// The store owns a small tokio runtime and blocks on every call, so it must
/// not be used from inside an async context.
pub struct SqlStore {
    db: DatabaseConnection,
    runtime: Runtime,
}

impl std::fmt::Debug for SqlStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlStore")
            .field("backend", &self.db.get_database_backend())
            .finish()
    }
}

impl SqlStore {
    /// Connect to a SQLite database. Other backends are rejected.
    pub fn connect(cfg: &DbCfg) -> Result<Self, PariahError> {
        if !cfg.url.starts_with("sqlite:") {
            return Err(PariahError::Configuration(format!(
                "unsupported database url `{}`: only sqlite is built in",
                cfg.url
            )));
        }
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;
        let db = runtime.block_on(Database::connect(&cfg.url))?;
        tracing::info!(backend = ?db.get_database_backend(), "Connected to row store");
        Ok(Self { db, runtime })
    }

    /// Run raw SQL, e.g. a schema script.
    pub fn execute_script(&self, sql: &str) -> Result<(), PariahError> {
        self.runtime.block_on(self.db.execute_unprepared(sql))?;
        Ok(())
    }

    fn query_rows(&self, select: &SelectStatement) -> Result<Vec<Row>, PariahError> {
        let stmt = self.db.get_database_backend().build(select);
        let values = self
            .runtime
            .block_on(JsonValue::find_by_statement(stmt).all(&self.db))?;

        values
            .into_iter()
            .map(|value| match value {
                Value::Object(map) => Ok(map.into_iter().collect()),
                other => Err(PariahError::Schema(format!(
                    "expected a row object, got {other}"
                ))),
            })
            .collect()
    }
}

/// Keys that look numeric bind as integers so they compare against
/// integer primary keys on every backend.
fn key_to_sql(id: &str) -> SqlValue {
    match id.parse::<i64>() {
        Ok(n) => n.into(),
        Err(_) => id.to_string().into(),
    }
}

fn to_sql(value: &Value) -> SimpleExpr {
    let value: SqlValue = match value {
        Value::Null => Option::<String>::None.into(),
        Value::Bool(b) => (*b).into(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.into(),
            None => n.as_f64().unwrap_or_default().into(),
        },
        Value::String(s) => s.clone().into(),
        other => other.to_string().into(),
    };
    value.into()
}

impl RowStore for SqlStore {
    fn find_by_id(&self, table: &str, id: &str) -> Result<Option<Row>, PariahError> {
        let mut select = Query::select();
        select
            .column(Asterisk)
            .from(Alias::new(table))
            .and_where(Expr::col(Alias::new(PRIMARY_KEY)).eq(key_to_sql(id)))
            .limit(1);
        Ok(self.query_rows(&select)?.into_iter().next())
    }

    fn find_where(
        &self,
        table: &str,
        predicates: &Row,
        query: &RowQuery,
    ) -> Result<Vec<Row>, PariahError> {
        let mut select = Query::select();
        select.column(Asterisk).from(Alias::new(table));
        for (column, value) in predicates {
            let condition = if value.is_null() {
                Expr::col(Alias::new(column.as_str())).is_null()
            } else {
                Expr::col(Alias::new(column.as_str())).eq(to_sql(value))
            };
            select.and_where(condition);
        }
        if let Some((column, direction)) = &query.order {
            let order = match direction {
                Direction::Asc => Order::Asc,
                Direction::Desc => Order::Desc,
            };
            select.order_by(Alias::new(column.as_str()), order);
        }
        if let Some(limit) = query.limit {
            select.limit(limit);
        }
        if let Some(offset) = query.offset {
            select.offset(offset);
        }
        self.query_rows(&select)
    }

    fn insert(&self, table: &str, columns: &Row) -> Result<Key, PariahError> {
        let mut insert = Query::insert();
        insert.into_table(Alias::new(table));
        if columns.is_empty() {
            insert.or_default_values();
        } else {
            insert.columns(columns.keys().map(|c| Alias::new(c.as_str())));
            insert
                .values(columns.values().map(to_sql))
                .map_err(|e| PariahError::Schema(e.to_string()))?;
        }

        let stmt = self.db.get_database_backend().build(&insert);
        let result = self.runtime.block_on(self.db.execute(stmt))?;
        let id = result.last_insert_id().to_string();
        tracing::debug!(table, %id, "Inserted row");
        Ok(id)
    }

    fn update(&self, table: &str, columns: &Row, id: &str) -> Result<(), PariahError> {
        let values: Vec<(Alias, SimpleExpr)> = columns
            .iter()
            .filter(|(column, _)| column.as_str() != PRIMARY_KEY)
            .map(|(column, value)| (Alias::new(column.as_str()), to_sql(value)))
            .collect();
        if values.is_empty() {
            return Ok(());
        }

        let mut update = Query::update();
        update
            .table(Alias::new(table))
            .values(values)
            .and_where(Expr::col(Alias::new(PRIMARY_KEY)).eq(key_to_sql(id)));

        let stmt = self.db.get_database_backend().build(&update);
        let result = self.runtime.block_on(self.db.execute(stmt))?;
        if result.rows_affected() == 0 {
            return Err(PariahError::NotFound(format!("{table} row {id}")));
        }
        Ok(())
    }

    fn delete(&self, table: &str, id: &str) -> Result<(), PariahError> {
        let mut delete = Query::delete();
        delete
            .from_table(Alias::new(table))
            .and_where(Expr::col(Alias::new(PRIMARY_KEY)).eq(key_to_sql(id)));

        let stmt = self.db.get_database_backend().build(&delete);
        self.runtime.block_on(self.db.execute(stmt))?;
        Ok(())
    }
}
