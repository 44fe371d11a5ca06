// Transaction-scoped adapter. Holds a live sqlx transaction behind a Mutex
// so the object-safe trait methods (&self) can still borrow it mutably;
// commit and rollback consume the adapter.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use splitbook_core::db::adapter::{
    Adapter, AdapterResult, FindManyQuery, SchemaOptions, SchemaStatus, TransactionAdapter,
    WhereClause,
};
use splitbook_core::db::schema::AppSchema;
use splitbook_core::error::SplitbookError;
use splitbook_core::utils::generate_id;
use tokio::sync::Mutex;

use crate::adapter::{json_to_bind, map_db_err, row_to_json, BindValue};
use crate::query_builder::{
    build_insert, build_limit_offset, build_order_by, build_update_set, build_where,
    quote_identifier,
};

pub struct SqlxTransactionAdapter {
    tx: Mutex<Option<sqlx::Transaction<'static, sqlx::Any>>>,
}

impl SqlxTransactionAdapter {
    pub fn new(tx: sqlx::Transaction<'static, sqlx::Any>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
        }
    }
}

impl fmt::Debug for SqlxTransactionAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlxTransactionAdapter").finish_non_exhaustive()
    }
}

fn prepare_binds(binds: &[Value]) -> Vec<BindValue> {
    binds.iter().map(json_to_bind).collect()
}

// The query macros keep the Mutex lock scope tight: bind values first,
// borrow the transaction only for the actual round trip.

macro_rules! tx_fetch_all {
    ($self:expr, $sql:expr, $binds:expr) => {{
        let mut query = sqlx::query($sql);
        for bind in prepare_binds($binds) {
            query = match bind {
                BindValue::Text(s) => query.bind(s),
                BindValue::Int(i) => query.bind(i),
                BindValue::Float(f) => query.bind(f),
                BindValue::Null => query.bind(Option::<String>::None),
            };
        }
        let mut guard = $self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(|| {
            SplitbookError::Database("Transaction already consumed".to_string())
        })?;
        let rows = query
            .fetch_all(&mut **tx)
            .await
            .map_err(|e| map_db_err("Query failed", e))?;
        rows.iter().map(row_to_json).collect::<Vec<Value>>()
    }};
}

macro_rules! tx_fetch_optional {
    ($self:expr, $sql:expr, $binds:expr) => {{
        let mut query = sqlx::query($sql);
        for bind in prepare_binds($binds) {
            query = match bind {
                BindValue::Text(s) => query.bind(s),
                BindValue::Int(i) => query.bind(i),
                BindValue::Float(f) => query.bind(f),
                BindValue::Null => query.bind(Option::<String>::None),
            };
        }
        let mut guard = $self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(|| {
            SplitbookError::Database("Transaction already consumed".to_string())
        })?;
        let row = query
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_db_err("Query failed", e))?;
        row.as_ref().map(row_to_json)
    }};
}

macro_rules! tx_execute {
    ($self:expr, $sql:expr, $binds:expr) => {{
        let mut query = sqlx::query($sql);
        for bind in prepare_binds($binds) {
            query = match bind {
                BindValue::Text(s) => query.bind(s),
                BindValue::Int(i) => query.bind(i),
                BindValue::Float(f) => query.bind(f),
                BindValue::Null => query.bind(Option::<String>::None),
            };
        }
        let mut guard = $self.tx.lock().await;
        let tx = guard.as_mut().ok_or_else(|| {
            SplitbookError::Database("Transaction already consumed".to_string())
        })?;
        let result = query
            .execute(&mut **tx)
            .await
            .map_err(|e| map_db_err("Statement failed", e))?;
        result.rows_affected()
    }};
}

#[async_trait]
impl Adapter for SqlxTransactionAdapter {
    async fn create(&self, model: &str, mut data: Value) -> AdapterResult<Value> {
        let obj = data.as_object_mut().ok_or_else(|| {
            SplitbookError::Serialization("create payload must be a JSON object".to_string())
        })?;
        if !matches!(obj.get("id"), Some(Value::String(_))) {
            obj.insert("id".to_string(), Value::String(generate_id()));
        }

        let fragment = build_insert(model, &data);
        tx_execute!(self, &fragment.sql, &fragment.binds);

        let id = data
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let sql = format!(
            "SELECT * FROM {} WHERE \"id\" = $1",
            quote_identifier(model)
        );
        let binds = vec![Value::String(id)];
        tx_fetch_optional!(self, &sql, &binds).ok_or_else(|| {
            SplitbookError::Database(format!("Created {} row could not be read back", model))
        })
    }

    async fn find_one(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<Option<Value>> {
        let fragment = build_where(where_clauses, 0);
        let sql = format!(
            "SELECT * FROM {}{} LIMIT 1",
            quote_identifier(model),
            fragment.sql
        );
        Ok(tx_fetch_optional!(self, &sql, &fragment.binds))
    }

    async fn find_many(&self, model: &str, query: FindManyQuery) -> AdapterResult<Vec<Value>> {
        let fragment = build_where(&query.where_clauses, 0);
        let sql = format!(
            "SELECT * FROM {}{}{}{}",
            quote_identifier(model),
            fragment.sql,
            build_order_by(&query.sort_by),
            build_limit_offset(query.limit, query.offset)
        );
        Ok(tx_fetch_all!(self, &sql, &fragment.binds))
    }

    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        let fragment = build_where(where_clauses, 0);
        let sql = format!(
            "SELECT COUNT(*) AS count FROM {}{}",
            quote_identifier(model),
            fragment.sql
        );
        let row = tx_fetch_optional!(self, &sql, &fragment.binds);
        let count = row
            .as_ref()
            .and_then(|v| v.get("count"))
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        Ok(count)
    }

    async fn update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: Value,
    ) -> AdapterResult<Option<Value>> {
        let set_fragment = build_update_set(&data, 0);
        if set_fragment.sql.is_empty() {
            return Err(SplitbookError::Serialization(
                "update payload must be a JSON object".to_string(),
            ));
        }
        let where_fragment = build_where(where_clauses, set_fragment.binds.len());
        let sql = format!(
            "UPDATE {}{}{}",
            quote_identifier(model),
            set_fragment.sql,
            where_fragment.sql
        );
        let mut binds = set_fragment.binds;
        binds.extend(where_fragment.binds);

        let affected = tx_execute!(self, &sql, &binds);
        if affected == 0 {
            return Ok(None);
        }

        let select_fragment = build_where(where_clauses, 0);
        let sql = format!(
            "SELECT * FROM {}{} LIMIT 1",
            quote_identifier(model),
            select_fragment.sql
        );
        Ok(tx_fetch_optional!(self, &sql, &select_fragment.binds))
    }

    async fn delete(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<()> {
        let fragment = build_where(where_clauses, 0);
        let sql = format!("DELETE FROM {}{}", quote_identifier(model), fragment.sql);
        tx_execute!(self, &sql, &fragment.binds);
        Ok(())
    }

    async fn delete_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<i64> {
        let fragment = build_where(where_clauses, 0);
        let sql = format!("DELETE FROM {}{}", quote_identifier(model), fragment.sql);
        let affected = tx_execute!(self, &sql, &fragment.binds);
        Ok(affected as i64)
    }

    async fn create_schema(
        &self,
        _schema: &AppSchema,
        _options: &SchemaOptions,
    ) -> AdapterResult<SchemaStatus> {
        Err(SplitbookError::Database(
            "Schema changes are not supported inside a transaction".to_string(),
        ))
    }

    async fn begin_transaction(&self) -> AdapterResult<Box<dyn TransactionAdapter>> {
        Err(SplitbookError::Database(
            "Nested transactions are not supported".to_string(),
        ))
    }
}

#[async_trait]
impl TransactionAdapter for SqlxTransactionAdapter {
    async fn commit(self: Box<Self>) -> AdapterResult<()> {
        let tx = self.tx.into_inner().ok_or_else(|| {
            SplitbookError::Database("Transaction already consumed".to_string())
        })?;
        tx.commit()
            .await
            .map_err(|e| SplitbookError::Database(format!("Failed to commit transaction: {}", e)))
    }

    async fn rollback(self: Box<Self>) -> AdapterResult<()> {
        let tx = self.tx.into_inner().ok_or_else(|| {
            SplitbookError::Database("Transaction already consumed".to_string())
        })?;
        tx.rollback()
            .await
            .map_err(|e| SplitbookError::Database(format!("Failed to rollback transaction: {}", e)))
    }
}
