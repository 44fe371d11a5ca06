// Account deletion: the guard and the cascade.

use splitbook_core::db::adapter::Adapter;
use splitbook_core::error::{ApiError, ErrorCode};
use splitbook_core::User;

use crate::context::{finish, SplitbookContext};
use crate::groups::guard;
use crate::groups::store::GroupStore;
use crate::store::{LedgerStore, UserStore};

/// Check whether an account may be deleted right now.
///
/// Refused while the user holds an accepted membership anywhere, or while
/// any group they created still exists; the user has to leave or dissolve
/// those first.
pub async fn can_delete_account<A: Adapter + ?Sized>(
    adapter: &A,
    user_id: &str,
) -> Result<(), ApiError> {
    let groups = GroupStore::new(adapter);

    let memberships = groups.list_memberships_for_user(user_id).await?;
    if memberships.iter().any(|m| guard::is_accepted(m)) {
        return Err(ApiError::conflict(ErrorCode::ActiveGroupMembership));
    }

    let created = groups.list_groups_created_by(user_id).await?;
    if !created.is_empty() {
        return Err(ApiError::conflict(ErrorCode::OwnsActiveGroups));
    }

    Ok(())
}

/// Delete an account and its private data, in order: ledger entries,
/// categories, invitations in either direction, then the user row.
pub async fn handle_delete_account(ctx: &SplitbookContext, user_id: &str) -> Result<User, ApiError> {
    let tx = ctx.begin().await?;
    let result: Result<User, ApiError> = async {
        let users = UserStore::new(&*tx);
        let user = users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::not_found(ErrorCode::UserNotFound))?;

        can_delete_account(&*tx, user_id).await?;

        let ledger = LedgerStore::new(&*tx);
        let groups = GroupStore::new(&*tx);
        ledger.delete_entries_for_user(user_id).await?;
        ledger.delete_categories_for_user(user_id).await?;
        groups.delete_invitations_for_user(user_id).await?;
        users.delete_user(user_id).await?;

        ctx.logger.info(&format!("Deleted account {user_id}"));
        Ok(user)
    }
    .await;
    finish(tx, result).await
}
