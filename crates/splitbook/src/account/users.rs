// User provisioning. Passwords and sessions belong to the identity
// collaborator; these operations exist for seeding and account management.

use splitbook_core::error::{ApiError, ErrorCode};
use splitbook_core::User;

use crate::context::{finish, SplitbookContext};
use crate::ledger::categories::seed_default_categories;
use crate::store::{StoreError, UserStore};

/// Create a user and seed the default category set in one transaction.
pub async fn handle_create_user(ctx: &SplitbookContext, username: &str) -> Result<User, ApiError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ApiError::validation(ErrorCode::UsernameRequired));
    }

    let tx = ctx.begin().await?;
    let result: Result<User, ApiError> = async {
        let users = UserStore::new(&*tx);
        if users.find_by_username(username).await?.is_some() {
            return Err(ApiError::conflict(ErrorCode::UsernameTaken));
        }
        let user = users.create_user(username).await.map_err(|err| match err {
            StoreError::Duplicate(_) => ApiError::conflict(ErrorCode::UsernameTaken),
            other => other.into(),
        })?;
        seed_default_categories(&*tx, &user.id).await?;

        ctx.logger
            .info(&format!("Created user {} ({username})", user.id));
        Ok(user)
    }
    .await;
    finish(tx, result).await
}
