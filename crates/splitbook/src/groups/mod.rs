// Group membership and invitation subsystem.

pub mod guard;
pub mod invitations;
pub mod lifecycle;
pub mod store;
pub mod types;

use splitbook_core::error::{ApiError, ErrorCode};

use crate::store::StoreError;

pub use invitations::{
    handle_accept_invitation, handle_invite_member, handle_list_pending_invitations,
    handle_reject_invitation,
};
pub use lifecycle::{
    handle_change_role, handle_create_group, handle_dissolve_group, handle_get_group_detail,
    handle_leave_group, handle_list_user_groups, handle_remove_member, handle_update_group,
};

/// Failing to lock a group is the ordinary "group not found" outcome.
pub(crate) fn or_group_not_found(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound => ApiError::not_found(ErrorCode::GroupNotFound),
        other => other.into(),
    }
}
