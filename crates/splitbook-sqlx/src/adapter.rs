// Pool-backed adapter. Connects through sqlx's Any driver so the same code
// serves SQLite, Postgres, and MySQL; rows travel as serde_json::Value
// between here and the typed store layer.

use async_trait::async_trait;
use serde_json::Value;
use splitbook_core::db::adapter::{
    Adapter, AdapterResult, FindManyQuery, SchemaOptions, SchemaStatus, TransactionAdapter,
    WhereClause,
};
use splitbook_core::db::schema::AppSchema;
use splitbook_core::error::SplitbookError;
use splitbook_core::utils::generate_id;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Column, Row};

use crate::query_builder::{
    build_insert, build_limit_offset, build_order_by, build_update_set, build_where,
    quote_identifier,
};
use crate::transaction::SqlxTransactionAdapter;

/// SQLx-backed implementation of the core [`Adapter`] trait.
#[derive(Debug, Clone)]
pub struct SqlxAdapter {
    pool: AnyPool,
}

impl SqlxAdapter {
    /// Connect to the database at `url` and return a ready adapter.
    ///
    /// In-memory SQLite databases are capped at a single connection, since
    /// every pooled connection would otherwise see its own empty database.
    pub async fn connect(url: &str) -> Result<Self, SplitbookError> {
        sqlx::any::install_default_drivers();

        let is_memory = url.contains(":memory:") || url.contains("mode=memory");
        let options = if is_memory {
            AnyPoolOptions::new().max_connections(1)
        } else {
            AnyPoolOptions::new()
        };

        let pool = options
            .connect(url)
            .await
            .map_err(|e| SplitbookError::Database(format!("Failed to connect to {}: {}", url, e)))?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

// ─── Row / bind conversion ───────────────────────────────────────

/// Convert a database row into a JSON object. The Any driver exposes no
/// column type info we can trust across backends, so decoding is by
/// trial: text, then integers, then floats, then booleans.
pub(crate) fn row_to_json(row: &AnyRow) -> Value {
    let mut map = serde_json::Map::new();

    for column in row.columns() {
        let name = column.name();
        let value = if let Ok(v) = row.try_get::<String, _>(name) {
            Value::String(v)
        } else if let Ok(v) = row.try_get::<i64, _>(name) {
            Value::Number(v.into())
        } else if let Ok(v) = row.try_get::<i32, _>(name) {
            Value::Number(v.into())
        } else if let Ok(v) = row.try_get::<f64, _>(name) {
            serde_json::Number::from_f64(v)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        } else if let Ok(v) = row.try_get::<bool, _>(name) {
            Value::Bool(v)
        } else {
            Value::Null
        };
        map.insert(name.to_string(), value);
    }

    Value::Object(map)
}

/// A JSON value lowered to something sqlx can bind.
pub(crate) enum BindValue {
    Text(String),
    Int(i64),
    Float(f64),
    Null,
}

pub(crate) fn json_to_bind(value: &Value) -> BindValue {
    match value {
        Value::String(s) => BindValue::Text(s.clone()),
        Value::Bool(b) => BindValue::Int(if *b { 1 } else { 0 }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                BindValue::Int(i)
            } else if let Some(f) = n.as_f64() {
                BindValue::Float(f)
            } else {
                BindValue::Null
            }
        }
        Value::Null => BindValue::Null,
        other => BindValue::Text(other.to_string()),
    }
}

/// Translate a sqlx error into the crate error type. Unique constraint
/// violations keep their identity so the operation layer can answer with
/// a conflict instead of a plain database failure.
pub(crate) fn map_db_err(context: &str, err: sqlx::Error) -> SplitbookError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            SplitbookError::UniqueViolation(db_err.message().to_string())
        }
        _ => SplitbookError::Database(format!("{}: {}", context, err)),
    }
}

// ─── Pool query helpers ──────────────────────────────────────────

pub(crate) async fn execute_fetch_all(
    pool: &AnyPool,
    sql: &str,
    binds: &[Value],
) -> AdapterResult<Vec<Value>> {
    let mut query = sqlx::query(sql);
    for bind in binds {
        query = match json_to_bind(bind) {
            BindValue::Text(s) => query.bind(s),
            BindValue::Int(i) => query.bind(i),
            BindValue::Float(f) => query.bind(f),
            BindValue::Null => query.bind(Option::<String>::None),
        };
    }
    let rows = query
        .fetch_all(pool)
        .await
        .map_err(|e| map_db_err("Query failed", e))?;
    Ok(rows.iter().map(row_to_json).collect())
}

pub(crate) async fn execute_fetch_optional(
    pool: &AnyPool,
    sql: &str,
    binds: &[Value],
) -> AdapterResult<Option<Value>> {
    let mut query = sqlx::query(sql);
    for bind in binds {
        query = match json_to_bind(bind) {
            BindValue::Text(s) => query.bind(s),
            BindValue::Int(i) => query.bind(i),
            BindValue::Float(f) => query.bind(f),
            BindValue::Null => query.bind(Option::<String>::None),
        };
    }
    let row = query
        .fetch_optional(pool)
        .await
        .map_err(|e| map_db_err("Query failed", e))?;
    Ok(row.as_ref().map(row_to_json))
}

/// Execute a statement and return the number of affected rows.
pub(crate) async fn execute_statement(
    pool: &AnyPool,
    sql: &str,
    binds: &[Value],
) -> AdapterResult<u64> {
    let mut query = sqlx::query(sql);
    for bind in binds {
        query = match json_to_bind(bind) {
            BindValue::Text(s) => query.bind(s),
            BindValue::Int(i) => query.bind(i),
            BindValue::Float(f) => query.bind(f),
            BindValue::Null => query.bind(Option::<String>::None),
        };
    }
    let result = query
        .execute(pool)
        .await
        .map_err(|e| map_db_err("Statement failed", e))?;
    Ok(result.rows_affected())
}

// ─── Adapter impl ────────────────────────────────────────────────

#[async_trait]
impl Adapter for SqlxAdapter {
    async fn create(&self, model: &str, mut data: Value) -> AdapterResult<Value> {
        let obj = data.as_object_mut().ok_or_else(|| {
            SplitbookError::Serialization("create payload must be a JSON object".to_string())
        })?;
        if !matches!(obj.get("id"), Some(Value::String(_))) {
            obj.insert("id".to_string(), Value::String(generate_id()));
        }

        let fragment = build_insert(model, &data);
        execute_statement(&self.pool, &fragment.sql, &fragment.binds).await?;

        // The Any driver has no portable RETURNING, so read the row back.
        let id = data
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let sql = format!(
            "SELECT * FROM {} WHERE \"id\" = $1",
            quote_identifier(model)
        );
        execute_fetch_optional(&self.pool, &sql, &[Value::String(id)])
            .await?
            .ok_or_else(|| {
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
        execute_fetch_optional(&self.pool, &sql, &fragment.binds).await
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
        execute_fetch_all(&self.pool, &sql, &fragment.binds).await
    }

    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        let fragment = build_where(where_clauses, 0);
        let sql = format!(
            "SELECT COUNT(*) AS count FROM {}{}",
            quote_identifier(model),
            fragment.sql
        );
        let row = execute_fetch_optional(&self.pool, &sql, &fragment.binds).await?;
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

        let affected = execute_statement(&self.pool, &sql, &binds).await?;
        if affected == 0 {
            return Ok(None);
        }

        let select_fragment = build_where(where_clauses, 0);
        let sql = format!(
            "SELECT * FROM {}{} LIMIT 1",
            quote_identifier(model),
            select_fragment.sql
        );
        execute_fetch_optional(&self.pool, &sql, &select_fragment.binds).await
    }

    async fn delete(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<()> {
        let fragment = build_where(where_clauses, 0);
        let sql = format!("DELETE FROM {}{}", quote_identifier(model), fragment.sql);
        execute_statement(&self.pool, &sql, &fragment.binds).await?;
        Ok(())
    }

    async fn delete_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<i64> {
        let fragment = build_where(where_clauses, 0);
        let sql = format!("DELETE FROM {}{}", quote_identifier(model), fragment.sql);
        let affected = execute_statement(&self.pool, &sql, &fragment.binds).await?;
        Ok(affected as i64)
    }

    async fn create_schema(
        &self,
        schema: &AppSchema,
        options: &SchemaOptions,
    ) -> AdapterResult<SchemaStatus> {
        crate::schema::create_schema(&self.pool, schema, options).await
    }

    async fn begin_transaction(&self) -> AdapterResult<Box<dyn TransactionAdapter>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| SplitbookError::Database(format!("Failed to begin transaction: {}", e)))?;
        Ok(Box::new(SqlxTransactionAdapter::new(tx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn memory_adapter() -> SqlxAdapter {
        let adapter = SqlxAdapter::connect("sqlite::memory:")
            .await
            .expect("connect");
        let options = SchemaOptions { auto_migrate: true };
        adapter
            .create_schema(&AppSchema::default_schema(), &options)
            .await
            .expect("create schema");
        adapter
    }

    #[tokio::test]
    async fn test_create_generates_id_and_reads_back() {
        let adapter = memory_adapter().await;
        let created = adapter
            .create(
                "user",
                json!({"username": "alice", "createdAt": "2026-01-01T00:00:00+00:00"}),
            )
            .await
            .expect("create");
        let id = created.get("id").and_then(|v| v.as_str()).expect("id");
        assert_eq!(id.len(), 21);
        assert_eq!(created.get("username"), Some(&json!("alice")));
    }

    #[tokio::test]
    async fn test_find_one_and_count() {
        let adapter = memory_adapter().await;
        adapter
            .create(
                "user",
                json!({"id": "u1", "username": "alice", "createdAt": "2026-01-01T00:00:00+00:00"}),
            )
            .await
            .expect("create");

        let found = adapter
            .find_one("user", &[WhereClause::eq("username", json!("alice"))])
            .await
            .expect("find_one");
        assert_eq!(
            found.and_then(|v| v.get("id").cloned()),
            Some(json!("u1"))
        );

        let count = adapter.count("user", &[]).await.expect("count");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_update_missing_row_returns_none() {
        let adapter = memory_adapter().await;
        let updated = adapter
            .update(
                "user",
                &[WhereClause::eq("id", json!("missing"))],
                json!({"username": "nobody"}),
            )
            .await
            .expect("update");
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_a_unique_violation() {
        let adapter = memory_adapter().await;
        adapter
            .create(
                "user",
                json!({"id": "u1", "username": "alice", "createdAt": "2026-01-01T00:00:00+00:00"}),
            )
            .await
            .expect("create");

        let err = adapter
            .create(
                "user",
                json!({"id": "u2", "username": "alice", "createdAt": "2026-01-01T00:00:00+00:00"}),
            )
            .await
            .expect_err("duplicate should fail");
        assert!(matches!(err, SplitbookError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn test_duplicate_membership_is_a_unique_violation() {
        let adapter = memory_adapter().await;
        let member = json!({
            "id": "m1",
            "groupId": "g1",
            "userId": "u1",
            "role": "member",
            "status": "accepted",
            "joinedAt": "2026-01-01T00:00:00+00:00"
        });
        adapter
            .create("groupMember", member.clone())
            .await
            .expect("create");

        let mut dup = member;
        dup["id"] = json!("m2");
        let err = adapter
            .create("groupMember", dup)
            .await
            .expect_err("duplicate membership should fail");
        assert!(matches!(err, SplitbookError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn test_delete_many_returns_affected_rows() {
        let adapter = memory_adapter().await;
        for (id, name) in [("c1", "Dining"), ("c2", "Transport")] {
            adapter
                .create(
                    "category",
                    json!({"id": id, "userId": "u1", "name": name, "kind": "expense"}),
                )
                .await
                .expect("create");
        }
        let deleted = adapter
            .delete_many("category", &[WhereClause::eq("userId", json!("u1"))])
            .await
            .expect("delete_many");
        assert_eq!(deleted, 2);
        assert_eq!(adapter.count("category", &[]).await.expect("count"), 0);
    }
}
