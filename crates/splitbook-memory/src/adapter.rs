// In-memory database adapter — HashMap-based store implementing the core Adapter trait.
//
// Stores data in `HashMap<String, Vec<serde_json::Value>>` keyed by model/table name.
// Thread-safe via `tokio::sync::RwLock`. Unique constraints (single-column and
// composite) are enforced from the schema, so constraint races surface the same
// way they do on a SQL backend. Transactions are serialized by an owned mutex
// guard; writes go straight to the store and a pre-transaction snapshot is
// restored on rollback.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use splitbook_core::db::adapter::{
    Adapter, AdapterResult, Connector, FindManyQuery, Operator, SchemaOptions, SchemaStatus,
    SortDirection, TransactionAdapter, WhereClause,
};
use splitbook_core::db::schema::AppSchema;
use splitbook_core::error::SplitbookError;
use splitbook_core::utils::generate_id;

/// Type alias for the in-memory store.
type Store = HashMap<String, Vec<serde_json::Value>>;

/// In-memory database adapter.
///
/// All data is stored in a `HashMap` wrapped in an `Arc<RwLock<...>>` for
/// thread-safe concurrent access. Data is lost when the adapter is dropped.
#[derive(Debug, Clone)]
pub struct MemoryAdapter {
    store: Arc<RwLock<Store>>,
    schema: Arc<AppSchema>,
    tx_lock: Arc<Mutex<()>>,
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAdapter {
    /// Create a new empty adapter enforcing the default splitbook schema.
    pub fn new() -> Self {
        Self::with_schema(AppSchema::default_schema())
    }

    /// Create a new empty adapter enforcing the given schema.
    pub fn with_schema(schema: AppSchema) -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
            schema: Arc::new(schema),
            tx_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Get a snapshot of all data (for debugging/testing).
    pub async fn snapshot(&self) -> Store {
        self.store.read().await.clone()
    }

    /// Clear all data.
    pub async fn clear(&self) {
        self.store.write().await.clear();
    }

    /// Get record count for a specific model.
    pub async fn model_count(&self, model: &str) -> usize {
        self.store
            .read()
            .await
            .get(model)
            .map(|v| v.len())
            .unwrap_or(0)
    }
}

/// Check if a record matches a set of WHERE clauses.
fn matches_where(record: &serde_json::Value, clauses: &[WhereClause]) -> bool {
    if clauses.is_empty() {
        return true;
    }

    let mut result = true;
    let mut pending_or = false;

    for clause in clauses {
        let field_val = record
            .get(&clause.field)
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        let clause_match = match_operator(&field_val, &clause.value, &clause.operator);

        if pending_or {
            result = result || clause_match;
        } else {
            result = result && clause_match;
        }

        pending_or = matches!(clause.connector, Some(Connector::Or));
    }

    result
}

/// Match a single operator condition.
fn match_operator(field_val: &serde_json::Value, target: &serde_json::Value, op: &Operator) -> bool {
    match op {
        Operator::Eq => field_val == target,
        Operator::Ne => field_val != target,
        Operator::Lt => compare_json(field_val, target).map_or(false, |c| c < 0),
        Operator::Lte => compare_json(field_val, target).map_or(false, |c| c <= 0),
        Operator::Gt => compare_json(field_val, target).map_or(false, |c| c > 0),
        Operator::Gte => compare_json(field_val, target).map_or(false, |c| c >= 0),
        Operator::In => {
            if let serde_json::Value::Array(arr) = target {
                arr.contains(field_val)
            } else {
                false
            }
        }
    }
}

/// Compare two JSON values numerically/lexicographically.
fn compare_json(a: &serde_json::Value, b: &serde_json::Value) -> Option<i8> {
    match (a, b) {
        (serde_json::Value::Number(an), serde_json::Value::Number(bn)) => {
            let af = an.as_f64()?;
            let bf = bn.as_f64()?;
            Some(af.partial_cmp(&bf).map(|o| match o {
                std::cmp::Ordering::Less => -1,
                std::cmp::Ordering::Equal => 0,
                std::cmp::Ordering::Greater => 1,
            })?)
        }
        (serde_json::Value::String(a_s), serde_json::Value::String(b_s)) => {
            Some(match a_s.cmp(b_s) {
                std::cmp::Ordering::Less => -1,
                std::cmp::Ordering::Equal => 0,
                std::cmp::Ordering::Greater => 1,
            })
        }
        _ => None,
    }
}

/// Apply sorting to records.
fn sort_records(records: &mut [serde_json::Value], query: &FindManyQuery) {
    if let Some(ref sort) = query.sort_by {
        records.sort_by(|a, b| {
            let av = a.get(&sort.field);
            let bv = b.get(&sort.field);
            let cmp = match (av, bv) {
                (Some(av), Some(bv)) => compare_json(av, bv).unwrap_or(0),
                (Some(_), None) => 1,
                (None, Some(_)) => -1,
                (None, None) => 0,
            };
            match sort.direction {
                SortDirection::Asc => cmp.cmp(&0),
                SortDirection::Desc => cmp.cmp(&0).reverse(),
            }
        });
    }
}

/// Merge update data into an existing record.
fn merge_update(record: &mut serde_json::Value, data: &serde_json::Value) {
    if let (Some(rec_obj), Some(data_obj)) = (record.as_object_mut(), data.as_object()) {
        for (k, v) in data_obj {
            rec_obj.insert(k.clone(), v.clone());
        }
    }
}

fn non_null(value: Option<&serde_json::Value>) -> Option<&serde_json::Value> {
    value.filter(|v| !v.is_null())
}

/// Enforce the schema's unique constraints for `candidate` against the model's
/// existing records. `exclude_id` skips the record being updated so an update
/// never conflicts with itself. Null values never conflict, matching SQL.
fn check_unique_constraints(
    schema: &AppSchema,
    model: &str,
    records: &[serde_json::Value],
    candidate: &serde_json::Value,
    exclude_id: Option<&serde_json::Value>,
) -> AdapterResult<()> {
    let Some(table) = schema.tables.get(model) else {
        return Ok(());
    };

    let others = || {
        records.iter().filter(|r| match exclude_id {
            Some(id) => r.get("id") != Some(id),
            None => true,
        })
    };

    for (field_name, field) in &table.fields {
        if !field.unique {
            continue;
        }
        let Some(value) = non_null(candidate.get(field_name)) else {
            continue;
        };
        if others().any(|r| r.get(field_name) == Some(value)) {
            return Err(SplitbookError::UniqueViolation(format!(
                "{model}.{field_name} already has value {value}"
            )));
        }
    }

    for columns in &table.unique_together {
        let values: Vec<&serde_json::Value> = columns
            .iter()
            .filter_map(|c| non_null(candidate.get(c)))
            .collect();
        if values.len() != columns.len() {
            continue;
        }
        let collides = others().any(|r| {
            columns
                .iter()
                .zip(&values)
                .all(|(c, v)| r.get(c) == Some(*v))
        });
        if collides {
            return Err(SplitbookError::UniqueViolation(format!(
                "{model} already has a record for ({})",
                columns.join(", ")
            )));
        }
    }

    Ok(())
}

/// Insert a record into the store, assigning an id when missing and enforcing
/// unique constraints.
fn insert_record(
    store: &mut Store,
    schema: &AppSchema,
    model: &str,
    data: serde_json::Value,
) -> AdapterResult<serde_json::Value> {
    let mut record = data;
    let obj = record.as_object_mut().ok_or_else(|| {
        SplitbookError::Serialization("create payload must be a JSON object".into())
    })?;
    if obj.get("id").map_or(true, |id| id.is_null()) {
        obj.insert("id".to_string(), serde_json::Value::String(generate_id()));
    }

    let records = store.entry(model.to_string()).or_default();
    check_unique_constraints(schema, model, records, &record, None)?;
    records.push(record.clone());
    Ok(record)
}

/// Update the first matching record in place, enforcing unique constraints on
/// the merged result.
fn update_record(
    store: &mut Store,
    schema: &AppSchema,
    model: &str,
    where_clauses: &[WhereClause],
    data: &serde_json::Value,
) -> AdapterResult<Option<serde_json::Value>> {
    let Some(records) = store.get_mut(model) else {
        return Ok(None);
    };
    let Some(pos) = records.iter().position(|r| matches_where(r, where_clauses)) else {
        return Ok(None);
    };

    let mut merged = records[pos].clone();
    merge_update(&mut merged, data);
    let exclude_id = records[pos].get("id").cloned();
    check_unique_constraints(schema, model, records, &merged, exclude_id.as_ref())?;

    records[pos] = merged.clone();
    Ok(Some(merged))
}

fn find_many_in(store: &Store, model: &str, query: &FindManyQuery) -> Vec<serde_json::Value> {
    let empty = Vec::new();
    let records = store.get(model).unwrap_or(&empty);

    let mut result: Vec<serde_json::Value> = records
        .iter()
        .filter(|r| matches_where(r, &query.where_clauses))
        .cloned()
        .collect();

    sort_records(&mut result, query);

    if let Some(offset) = query.offset {
        if (offset as usize) < result.len() {
            result = result.split_off(offset as usize);
        } else {
            result.clear();
        }
    }

    if let Some(limit) = query.limit {
        result.truncate(limit as usize);
    }

    result
}

#[async_trait]
impl Adapter for MemoryAdapter {
    async fn create(
        &self,
        model: &str,
        data: serde_json::Value,
    ) -> AdapterResult<serde_json::Value> {
        let mut store = self.store.write().await;
        insert_record(&mut store, &self.schema, model, data)
    }

    async fn find_one(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<Option<serde_json::Value>> {
        let store = self.store.read().await;
        Ok(store
            .get(model)
            .and_then(|recs| recs.iter().find(|r| matches_where(r, where_clauses)).cloned()))
    }

    async fn find_many(
        &self,
        model: &str,
        query: FindManyQuery,
    ) -> AdapterResult<Vec<serde_json::Value>> {
        let store = self.store.read().await;
        Ok(find_many_in(&store, model, &query))
    }

    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        let store = self.store.read().await;
        let count = store
            .get(model)
            .map(|recs| recs.iter().filter(|r| matches_where(r, where_clauses)).count())
            .unwrap_or(0);
        Ok(count as i64)
    }

    async fn update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<Option<serde_json::Value>> {
        let mut store = self.store.write().await;
        update_record(&mut store, &self.schema, model, where_clauses, &data)
    }

    async fn delete(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<()> {
        let mut store = self.store.write().await;
        if let Some(recs) = store.get_mut(model) {
            if let Some(pos) = recs.iter().position(|r| matches_where(r, where_clauses)) {
                recs.remove(pos);
            }
        }
        Ok(())
    }

    async fn delete_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<i64> {
        let mut store = self.store.write().await;
        if let Some(recs) = store.get_mut(model) {
            let before = recs.len();
            recs.retain(|r| !matches_where(r, where_clauses));
            Ok((before - recs.len()) as i64)
        } else {
            Ok(0)
        }
    }

    async fn create_schema(
        &self,
        _schema: &AppSchema,
        _options: &SchemaOptions,
    ) -> AdapterResult<SchemaStatus> {
        // In-memory adapter has no persistent schema; always up to date.
        Ok(SchemaStatus::UpToDate)
    }

    async fn begin_transaction(&self) -> AdapterResult<Box<dyn TransactionAdapter>> {
        // One writer at a time; the guard is released on commit or rollback.
        let guard = self.tx_lock.clone().lock_owned().await;
        let snapshot = self.store.read().await.clone();
        Ok(Box::new(MemoryTransactionAdapter {
            store: self.store.clone(),
            schema: self.schema.clone(),
            snapshot,
            _guard: guard,
        }))
    }
}

// ─── Transaction Adapter ─────────────────────────────────────────

/// In-memory transaction adapter.
///
/// Holds the adapter's transaction lock for its whole lifetime, so concurrent
/// transactions run one after another. Operations write directly to the shared
/// store; rollback restores the snapshot taken at the start.
struct MemoryTransactionAdapter {
    store: Arc<RwLock<Store>>,
    schema: Arc<AppSchema>,
    snapshot: Store,
    _guard: OwnedMutexGuard<()>,
}

impl std::fmt::Debug for MemoryTransactionAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransactionAdapter").finish()
    }
}

#[async_trait]
impl Adapter for MemoryTransactionAdapter {
    async fn create(
        &self,
        model: &str,
        data: serde_json::Value,
    ) -> AdapterResult<serde_json::Value> {
        let mut store = self.store.write().await;
        insert_record(&mut store, &self.schema, model, data)
    }

    async fn find_one(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<Option<serde_json::Value>> {
        let store = self.store.read().await;
        Ok(store
            .get(model)
            .and_then(|recs| recs.iter().find(|r| matches_where(r, where_clauses)).cloned()))
    }

    async fn find_many(
        &self,
        model: &str,
        query: FindManyQuery,
    ) -> AdapterResult<Vec<serde_json::Value>> {
        let store = self.store.read().await;
        Ok(find_many_in(&store, model, &query))
    }

    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64> {
        let store = self.store.read().await;
        let count = store
            .get(model)
            .map(|recs| recs.iter().filter(|r| matches_where(r, where_clauses)).count())
            .unwrap_or(0);
        Ok(count as i64)
    }

    async fn update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<Option<serde_json::Value>> {
        let mut store = self.store.write().await;
        update_record(&mut store, &self.schema, model, where_clauses, &data)
    }

    async fn delete(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<()> {
        let mut store = self.store.write().await;
        if let Some(recs) = store.get_mut(model) {
            if let Some(pos) = recs.iter().position(|r| matches_where(r, where_clauses)) {
                recs.remove(pos);
            }
        }
        Ok(())
    }

    async fn delete_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<i64> {
        let mut store = self.store.write().await;
        if let Some(recs) = store.get_mut(model) {
            let before = recs.len();
            recs.retain(|r| !matches_where(r, where_clauses));
            Ok((before - recs.len()) as i64)
        } else {
            Ok(0)
        }
    }

    async fn create_schema(
        &self,
        _schema: &AppSchema,
        _options: &SchemaOptions,
    ) -> AdapterResult<SchemaStatus> {
        Ok(SchemaStatus::UpToDate)
    }

    async fn begin_transaction(&self) -> AdapterResult<Box<dyn TransactionAdapter>> {
        Err(SplitbookError::Other(
            "Nested transactions are not supported in the memory adapter".into(),
        ))
    }
}

#[async_trait]
impl TransactionAdapter for MemoryTransactionAdapter {
    async fn commit(self: Box<Self>) -> AdapterResult<()> {
        // Writes are already in the shared store; dropping self releases the lock.
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AdapterResult<()> {
        let this = *self;
        let mut store = this.store.write().await;
        *store = this.snapshot;
        Ok(())
    }
}
