// Ledger entries, personal and group-scoped.
//
// Rows always carry the recorder's `userId`; group rows carry `groupId` as
// well and are readable by every accepted member. Updates and deletes stay
// with the recorder.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use splitbook_core::error::{ApiError, ErrorCode};
use splitbook_core::{generate_id, Entry, EntryKind};

use crate::context::{finish, SplitbookContext};
use crate::groups::guard;
use crate::groups::or_group_not_found;
use crate::groups::store::GroupStore;
use crate::store::LedgerStore;

// ─── Requests ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntryRequest {
    /// Absent for personal entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    pub kind: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `YYYY-MM-DD`.
    pub entry_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntryRequest {
    pub entry_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_date: Option<String>,
}

fn parse_kind(raw: &str) -> Result<EntryKind, ApiError> {
    EntryKind::from_str(raw).ok_or_else(|| ApiError::validation(ErrorCode::InvalidEntryKind))
}

fn parse_amount(amount: f64) -> Result<f64, ApiError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ApiError::validation(ErrorCode::InvalidAmount));
    }
    Ok(amount)
}

fn parse_entry_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::validation(ErrorCode::InvalidDate))
}

// ─── Handlers ────────────────────────────────────────────────────

/// Record an entry, personal or into a group.
pub async fn handle_create_entry(
    ctx: &SplitbookContext,
    actor_id: &str,
    body: CreateEntryRequest,
) -> Result<Entry, ApiError> {
    let kind = parse_kind(&body.kind)?;
    let amount = parse_amount(body.amount)?;
    let entry_date = parse_entry_date(&body.entry_date)?;

    let tx = ctx.begin().await?;
    let result: Result<Entry, ApiError> = async {
        let ledger = LedgerStore::new(&*tx);

        // Group rows need an accepted seat; the lock keeps a concurrent
        // dissolution from leaving this row orphaned.
        if let Some(group_id) = &body.group_id {
            let groups = GroupStore::new(&*tx);
            groups.lock_group(group_id).await.map_err(or_group_not_found)?;
            groups
                .find_membership(group_id, actor_id)
                .await?
                .filter(|member| guard::is_accepted(member))
                .ok_or_else(|| ApiError::not_found(ErrorCode::NotAMember))?;
        }

        // The category must be the recorder's own
        if let Some(category_id) = &body.category_id {
            ledger
                .find_category(category_id)
                .await?
                .filter(|category| category.user_id == actor_id)
                .ok_or_else(|| ApiError::not_found(ErrorCode::CategoryNotFound))?;
        }

        let entry = Entry {
            id: generate_id(),
            user_id: actor_id.to_string(),
            group_id: body.group_id.clone(),
            category_id: body.category_id.clone(),
            kind,
            amount,
            description: body.description.clone(),
            entry_date,
            created_at: Utc::now(),
        };
        Ok(ledger.create_entry(&entry).await?)
    }
    .await;
    finish(tx, result).await
}

/// Personal entries when `group_id` is `None`, otherwise the group's shared
/// ledger; both newest first.
pub async fn handle_list_entries(
    ctx: &SplitbookContext,
    actor_id: &str,
    group_id: Option<&str>,
) -> Result<Vec<Entry>, ApiError> {
    let tx = ctx.begin().await?;
    let result: Result<Vec<Entry>, ApiError> = async {
        let ledger = LedgerStore::new(&*tx);
        match group_id {
            None => Ok(ledger.list_personal_entries(actor_id).await?),
            Some(group_id) => {
                let groups = GroupStore::new(&*tx);
                groups
                    .find_group(group_id)
                    .await?
                    .ok_or_else(|| ApiError::not_found(ErrorCode::GroupNotFound))?;
                groups
                    .find_membership(group_id, actor_id)
                    .await?
                    .filter(|member| guard::is_accepted(member))
                    .ok_or_else(|| ApiError::not_found(ErrorCode::NotAMember))?;
                Ok(ledger.list_group_entries(group_id).await?)
            }
        }
    }
    .await;
    finish(tx, result).await
}

/// Edit an entry. Only the recorder may touch it, group rows included.
pub async fn handle_update_entry(
    ctx: &SplitbookContext,
    actor_id: &str,
    body: UpdateEntryRequest,
) -> Result<Entry, ApiError> {
    let tx = ctx.begin().await?;
    let result: Result<Entry, ApiError> = async {
        let ledger = LedgerStore::new(&*tx);

        let entry = ledger
            .find_entry(&body.entry_id)
            .await?
            .filter(|entry| entry.user_id == actor_id)
            .ok_or_else(|| ApiError::not_found(ErrorCode::EntryNotFound))?;

        let mut updates = serde_json::Map::new();
        if let Some(kind) = &body.kind {
            updates.insert("kind".to_string(), json!(parse_kind(kind)?.as_str()));
        }
        if let Some(amount) = body.amount {
            updates.insert("amount".to_string(), json!(parse_amount(amount)?));
        }
        if let Some(entry_date) = &body.entry_date {
            updates.insert("entryDate".to_string(), json!(parse_entry_date(entry_date)?));
        }
        if let Some(description) = &body.description {
            updates.insert("description".to_string(), json!(description));
        }
        if let Some(category_id) = &body.category_id {
            ledger
                .find_category(category_id)
                .await?
                .filter(|category| category.user_id == actor_id)
                .ok_or_else(|| ApiError::not_found(ErrorCode::CategoryNotFound))?;
            updates.insert("categoryId".to_string(), json!(category_id));
        }

        let updated = ledger
            .update_entry(&entry.id, Value::Object(updates))
            .await?
            .ok_or_else(|| ApiError::not_found(ErrorCode::EntryNotFound))?;
        Ok(updated)
    }
    .await;
    finish(tx, result).await
}

pub async fn handle_delete_entry(
    ctx: &SplitbookContext,
    actor_id: &str,
    entry_id: &str,
) -> Result<Entry, ApiError> {
    let tx = ctx.begin().await?;
    let result: Result<Entry, ApiError> = async {
        let ledger = LedgerStore::new(&*tx);

        let entry = ledger
            .find_entry(entry_id)
            .await?
            .filter(|entry| entry.user_id == actor_id)
            .ok_or_else(|| ApiError::not_found(ErrorCode::EntryNotFound))?;

        ledger.delete_entry(&entry.id).await?;
        Ok(entry)
    }
    .await;
    finish(tx, result).await
}
