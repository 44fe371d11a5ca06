// Typed storage layer over the raw `Adapter` trait.
//
// Handlers work with the model structs from `splitbook_core`; this module
// translates them to and from the JSON rows the adapters speak and folds
// driver failures into `StoreError`.

use serde::de::DeserializeOwned;
use serde_json::Value;
use splitbook_core::db::adapter::{
    Adapter, FindManyQuery, SortBy, SortDirection, WhereClause,
};
use splitbook_core::error::{ApiError, ErrorCode, ErrorKind, SplitbookError};
use splitbook_core::{generate_id, Category, Entry, EntryKind, User};

/// Errors surfaced by the typed stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Record not found")]
    NotFound,

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<SplitbookError> for StoreError {
    fn from(err: SplitbookError) -> Self {
        match err {
            SplitbookError::UniqueViolation(msg) => Self::Duplicate(msg),
            SplitbookError::Serialization(msg) => Self::Serialization(msg),
            other => Self::Database(other.to_string()),
        }
    }
}

/// Fallback mapping for store failures a handler did not translate itself.
/// Unique-constraint losers become conflicts so a check-then-act race never
/// surfaces as an internal fault.
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::not_found(ErrorCode::RecordNotFound),
            StoreError::Duplicate(_) => ApiError::conflict(ErrorCode::DuplicateRecord),
            StoreError::Database(msg) | StoreError::Serialization(msg) => {
                ApiError::with_message(ErrorKind::Internal, ErrorCode::InternalServerError, msg)
            }
        }
    }
}

/// Decode an adapter row into a model struct.
pub(crate) fn decode<T: DeserializeOwned>(row: Value) -> Result<T, StoreError> {
    serde_json::from_value(row).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Decode a batch of adapter rows.
pub(crate) fn decode_vec<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, StoreError> {
    rows.into_iter().map(decode).collect()
}

pub(crate) fn encode<T: serde::Serialize>(model: &T) -> Result<Value, StoreError> {
    serde_json::to_value(model).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn sort_desc(field: &str) -> SortBy {
    SortBy {
        field: field.to_string(),
        direction: SortDirection::Desc,
    }
}

fn sort_asc(field: &str) -> SortBy {
    SortBy {
        field: field.to_string(),
        direction: SortDirection::Asc,
    }
}

// ─── Users ───────────────────────────────────────────────────────

/// Typed queries against the `user` table.
///
/// Generic over the adapter so the same store runs on the pool adapter and
/// inside a transaction.
pub struct UserStore<'a, A: Adapter + ?Sized> {
    adapter: &'a A,
}

impl<'a, A: Adapter + ?Sized> UserStore<'a, A> {
    pub fn new(adapter: &'a A) -> Self {
        Self { adapter }
    }

    pub async fn create_user(&self, username: &str) -> Result<User, StoreError> {
        let user = User::new(generate_id(), username.to_string());
        let row = self.adapter.create("user", encode(&user)?).await?;
        decode(row)
    }

    pub async fn find_by_id(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let row = self
            .adapter
            .find_one("user", &[WhereClause::eq("id", user_id)])
            .await?;
        row.map(decode).transpose()
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let row = self
            .adapter
            .find_one("user", &[WhereClause::eq("username", username)])
            .await?;
        row.map(decode).transpose()
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<(), StoreError> {
        self.adapter
            .delete("user", &[WhereClause::eq("id", user_id)])
            .await?;
        Ok(())
    }
}

// ─── Ledger ──────────────────────────────────────────────────────

/// Typed queries against the `category` and `entry` tables.
pub struct LedgerStore<'a, A: Adapter + ?Sized> {
    adapter: &'a A,
}

impl<'a, A: Adapter + ?Sized> LedgerStore<'a, A> {
    pub fn new(adapter: &'a A) -> Self {
        Self { adapter }
    }

    // Categories

    pub async fn create_category(
        &self,
        user_id: &str,
        name: &str,
        kind: EntryKind,
    ) -> Result<Category, StoreError> {
        let category = Category {
            id: generate_id(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            kind,
        };
        let row = self.adapter.create("category", encode(&category)?).await?;
        decode(row)
    }

    pub async fn find_category(&self, category_id: &str) -> Result<Option<Category>, StoreError> {
        let row = self
            .adapter
            .find_one("category", &[WhereClause::eq("id", category_id)])
            .await?;
        row.map(decode).transpose()
    }

    pub async fn find_category_by_name(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<Category>, StoreError> {
        let row = self
            .adapter
            .find_one(
                "category",
                &[
                    WhereClause::eq("userId", user_id).and(),
                    WhereClause::eq("name", name),
                ],
            )
            .await?;
        row.map(decode).transpose()
    }

    pub async fn list_categories(&self, user_id: &str) -> Result<Vec<Category>, StoreError> {
        let rows = self
            .adapter
            .find_many(
                "category",
                FindManyQuery {
                    where_clauses: vec![WhereClause::eq("userId", user_id)],
                    sort_by: Some(sort_asc("name")),
                    ..Default::default()
                },
            )
            .await?;
        decode_vec(rows)
    }

    pub async fn update_category(
        &self,
        category_id: &str,
        data: Value,
    ) -> Result<Option<Category>, StoreError> {
        let row = self
            .adapter
            .update("category", &[WhereClause::eq("id", category_id)], data)
            .await?;
        row.map(decode).transpose()
    }

    pub async fn delete_category(&self, category_id: &str) -> Result<(), StoreError> {
        self.adapter
            .delete("category", &[WhereClause::eq("id", category_id)])
            .await?;
        Ok(())
    }

    pub async fn delete_categories_for_user(&self, user_id: &str) -> Result<i64, StoreError> {
        let deleted = self
            .adapter
            .delete_many("category", &[WhereClause::eq("userId", user_id)])
            .await?;
        Ok(deleted)
    }

    pub async fn count_entries_for_category(&self, category_id: &str) -> Result<i64, StoreError> {
        let count = self
            .adapter
            .count("entry", &[WhereClause::eq("categoryId", category_id)])
            .await?;
        Ok(count)
    }

    // Entries

    pub async fn create_entry(&self, entry: &Entry) -> Result<Entry, StoreError> {
        let row = self.adapter.create("entry", encode(entry)?).await?;
        decode(row)
    }

    pub async fn find_entry(&self, entry_id: &str) -> Result<Option<Entry>, StoreError> {
        let row = self
            .adapter
            .find_one("entry", &[WhereClause::eq("id", entry_id)])
            .await?;
        row.map(decode).transpose()
    }

    /// Personal ledger rows only (`groupId IS NULL`), newest first.
    pub async fn list_personal_entries(&self, user_id: &str) -> Result<Vec<Entry>, StoreError> {
        let rows = self
            .adapter
            .find_many(
                "entry",
                FindManyQuery {
                    where_clauses: vec![
                        WhereClause::eq("userId", user_id).and(),
                        WhereClause::eq("groupId", Value::Null),
                    ],
                    sort_by: Some(sort_desc("createdAt")),
                    ..Default::default()
                },
            )
            .await?;
        decode_vec(rows)
    }

    /// Every row recorded in the group, regardless of recorder, newest first.
    pub async fn list_group_entries(&self, group_id: &str) -> Result<Vec<Entry>, StoreError> {
        let rows = self
            .adapter
            .find_many(
                "entry",
                FindManyQuery {
                    where_clauses: vec![WhereClause::eq("groupId", group_id)],
                    sort_by: Some(sort_desc("createdAt")),
                    ..Default::default()
                },
            )
            .await?;
        decode_vec(rows)
    }

    pub async fn update_entry(
        &self,
        entry_id: &str,
        data: Value,
    ) -> Result<Option<Entry>, StoreError> {
        let row = self
            .adapter
            .update("entry", &[WhereClause::eq("id", entry_id)], data)
            .await?;
        row.map(decode).transpose()
    }

    pub async fn delete_entry(&self, entry_id: &str) -> Result<(), StoreError> {
        self.adapter
            .delete("entry", &[WhereClause::eq("id", entry_id)])
            .await?;
        Ok(())
    }

    pub async fn delete_entries_for_user(&self, user_id: &str) -> Result<i64, StoreError> {
        let deleted = self
            .adapter
            .delete_many("entry", &[WhereClause::eq("userId", user_id)])
            .await?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_from_unique_violation() {
        let err: StoreError =
            SplitbookError::UniqueViolation("UNIQUE constraint failed".to_string()).into();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[test]
    fn test_store_error_from_database_error() {
        let err: StoreError = SplitbookError::Database("connection reset".to_string()).into();
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[test]
    fn test_duplicate_becomes_conflict_api_error() {
        let api: ApiError = StoreError::Duplicate("groupMember".to_string()).into();
        assert_eq!(api.kind, ErrorKind::Conflict);
        assert_eq!(api.code, ErrorCode::DuplicateRecord);
    }

    #[test]
    fn test_not_found_keeps_its_kind() {
        let api: ApiError = StoreError::NotFound.into();
        assert_eq!(api.kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_database_error_is_internal() {
        let api: ApiError = StoreError::Database("boom".to_string()).into();
        assert_eq!(api.kind, ErrorKind::Internal);
        assert_eq!(api.message, "boom");
    }
}
