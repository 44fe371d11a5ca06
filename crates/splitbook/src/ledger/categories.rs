// Income/expense categories, unique per owner by name.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use splitbook_core::db::adapter::Adapter;
use splitbook_core::error::{ApiError, ErrorCode};
use splitbook_core::{Category, EntryKind};

use crate::context::{finish, SplitbookContext};
use crate::store::{LedgerStore, StoreError};

/// Categories every fresh account starts with.
pub const DEFAULT_CATEGORIES: [(&str, EntryKind); 11] = [
    ("Salary", EntryKind::Income),
    ("Part-time", EntryKind::Income),
    ("Investment", EntryKind::Income),
    ("Gift", EntryKind::Income),
    ("Dining", EntryKind::Expense),
    ("Transport", EntryKind::Expense),
    ("Shopping", EntryKind::Expense),
    ("Entertainment", EntryKind::Expense),
    ("Utilities", EntryKind::Expense),
    ("Rent", EntryKind::Expense),
    ("Medical", EntryKind::Expense),
];

/// Seed the default category set for a new user. Runs inside the caller's
/// transaction.
pub async fn seed_default_categories<A: Adapter + ?Sized>(
    adapter: &A,
    user_id: &str,
) -> Result<(), StoreError> {
    let store = LedgerStore::new(adapter);
    for (name, kind) in DEFAULT_CATEGORIES {
        store.create_category(user_id, name, kind).await?;
    }
    Ok(())
}

// ─── Requests ────────────────────────────────────────────────────

/// `kind` stays a raw string so unknown values surface as a typed
/// validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub name: String,
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    pub category_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

fn parse_kind(raw: &str) -> Result<EntryKind, ApiError> {
    EntryKind::from_str(raw).ok_or_else(|| ApiError::validation(ErrorCode::InvalidEntryKind))
}

// ─── Handlers ────────────────────────────────────────────────────

/// The actor's categories, sorted by name.
pub async fn handle_list_categories(
    ctx: &SplitbookContext,
    actor_id: &str,
) -> Result<Vec<Category>, ApiError> {
    let tx = ctx.begin().await?;
    let result: Result<Vec<Category>, ApiError> = async {
        let store = LedgerStore::new(&*tx);
        Ok(store.list_categories(actor_id).await?)
    }
    .await;
    finish(tx, result).await
}

pub async fn handle_create_category(
    ctx: &SplitbookContext,
    actor_id: &str,
    body: CreateCategoryRequest,
) -> Result<Category, ApiError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::validation(ErrorCode::CategoryNameRequired));
    }
    let kind = parse_kind(&body.kind)?;

    let tx = ctx.begin().await?;
    let result: Result<Category, ApiError> = async {
        let store = LedgerStore::new(&*tx);
        if store.find_category_by_name(actor_id, name).await?.is_some() {
            return Err(ApiError::conflict(ErrorCode::CategoryNameTaken));
        }
        let category = store
            .create_category(actor_id, name, kind)
            .await
            .map_err(|err| match err {
                StoreError::Duplicate(_) => ApiError::conflict(ErrorCode::CategoryNameTaken),
                other => other.into(),
            })?;
        Ok(category)
    }
    .await;
    finish(tx, result).await
}

pub async fn handle_update_category(
    ctx: &SplitbookContext,
    actor_id: &str,
    body: UpdateCategoryRequest,
) -> Result<Category, ApiError> {
    let tx = ctx.begin().await?;
    let result: Result<Category, ApiError> = async {
        let store = LedgerStore::new(&*tx);

        // Only the owner sees the category at all
        let category = store
            .find_category(&body.category_id)
            .await?
            .filter(|category| category.user_id == actor_id)
            .ok_or_else(|| ApiError::not_found(ErrorCode::CategoryNotFound))?;

        let mut updates = serde_json::Map::new();
        if let Some(name) = &body.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(ApiError::validation(ErrorCode::CategoryNameRequired));
            }
            if let Some(existing) = store.find_category_by_name(actor_id, name).await? {
                if existing.id != category.id {
                    return Err(ApiError::conflict(ErrorCode::CategoryNameTaken));
                }
            }
            updates.insert("name".to_string(), json!(name));
        }
        if let Some(kind) = &body.kind {
            updates.insert("kind".to_string(), json!(parse_kind(kind)?.as_str()));
        }

        let updated = store
            .update_category(&category.id, Value::Object(updates))
            .await
            .map_err(|err| match err {
                StoreError::Duplicate(_) => ApiError::conflict(ErrorCode::CategoryNameTaken),
                other => other.into(),
            })?
            .ok_or_else(|| ApiError::not_found(ErrorCode::CategoryNotFound))?;
        Ok(updated)
    }
    .await;
    finish(tx, result).await
}

/// Delete a category. Refused while any entry still references it.
pub async fn handle_delete_category(
    ctx: &SplitbookContext,
    actor_id: &str,
    category_id: &str,
) -> Result<Category, ApiError> {
    let tx = ctx.begin().await?;
    let result: Result<Category, ApiError> = async {
        let store = LedgerStore::new(&*tx);

        let category = store
            .find_category(category_id)
            .await?
            .filter(|category| category.user_id == actor_id)
            .ok_or_else(|| ApiError::not_found(ErrorCode::CategoryNotFound))?;

        if store.count_entries_for_category(&category.id).await? > 0 {
            return Err(ApiError::conflict(ErrorCode::CategoryInUse));
        }

        store.delete_category(&category.id).await?;
        Ok(category)
    }
    .await;
    finish(tx, result).await
}
