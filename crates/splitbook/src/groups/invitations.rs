// Invitation lifecycle: invite, accept, reject, list.
//
// Every handler runs inside one transaction and takes the per-group lock
// before any check-then-act sequence, so concurrent invitations and
// membership changes for the same group are serialized.

use splitbook_core::error::{ApiError, ErrorCode, ErrorKind};
use splitbook_core::{GroupMember, GroupRole, Invitation, InvitationStatus};

use crate::context::{finish, SplitbookContext};
use crate::groups::guard;
use crate::groups::or_group_not_found;
use crate::groups::store::GroupStore;
use crate::groups::types::{
    AcceptInvitationRequest, InvitationView, InviteMemberRequest, RejectInvitationRequest,
};
use crate::store::UserStore;

// ─── Invite ──────────────────────────────────────────────────────

/// Invite a user to a group by username.
///
/// Reuses the single invitation row per (group, user): a resolved row is
/// re-armed back to pending, a still-pending row is a conflict.
pub async fn handle_invite_member(
    ctx: &SplitbookContext,
    actor_id: &str,
    body: InviteMemberRequest,
) -> Result<Invitation, ApiError> {
    let tx = ctx.begin().await?;
    let result: Result<Invitation, ApiError> = async {
        let store = GroupStore::new(&*tx);
        let users = UserStore::new(&*tx);

        store
            .lock_group(&body.group_id)
            .await
            .map_err(or_group_not_found)?;

        // Only accepted admins may invite
        let actor = store
            .find_membership(&body.group_id, actor_id)
            .await?
            .ok_or_else(|| ApiError::not_found(ErrorCode::NotAMember))?;
        if !guard::can_modify_group(&actor) {
            return Err(ApiError::forbidden(ErrorCode::AdminRoleRequired));
        }

        // Resolve the invitee
        let invitee = users
            .find_by_username(&body.username)
            .await?
            .ok_or_else(|| ApiError::not_found(ErrorCode::UserNotFound))?;
        if invitee.id == actor_id {
            return Err(ApiError::validation(ErrorCode::CannotInviteYourself));
        }

        // Already holding a seat?
        if let Some(membership) = store.find_membership(&body.group_id, &invitee.id).await? {
            if guard::is_accepted(&membership) {
                return Err(ApiError::conflict(ErrorCode::AlreadyAMember));
            }
        }

        // Accepted seats plus outstanding invitations count against the limit
        let seats = store.count_accepted_members(&body.group_id).await?
            + store.count_pending_invitations(&body.group_id).await?;
        if seats >= ctx.options.group.members_limit as i64 {
            return Err(ApiError::forbidden(ErrorCode::MemberLimitReached));
        }

        let expires_at = guard::invitation_expiry(ctx.options.group.invitation_expires_in);
        let invitation = match store
            .find_invitation_for_user(&body.group_id, &invitee.id)
            .await?
        {
            None => {
                store
                    .create_invitation(&body.group_id, &invitee.id, actor_id, expires_at)
                    .await?
            }
            Some(existing) if existing.status == InvitationStatus::Pending => {
                return Err(ApiError::conflict(ErrorCode::InvitationAlreadyPending));
            }
            Some(existing) => store
                .reset_invitation(&existing.id, actor_id, expires_at)
                .await?
                .ok_or_else(|| ApiError::internal(ErrorCode::InternalServerError))?,
        };

        ctx.logger.info(&format!(
            "User {actor_id} invited {} to group {}",
            invitee.id, body.group_id
        ));
        Ok(invitation)
    }
    .await;
    finish(tx, result).await
}

// ─── Accept ──────────────────────────────────────────────────────

enum AcceptOutcome {
    Joined(GroupMember),
    /// The invitee already held a seat; the invitation was retired but the
    /// caller still gets a conflict.
    AlreadyMember,
}

/// Accept a pending invitation addressed to the actor, creating an accepted
/// `member` seat.
pub async fn handle_accept_invitation(
    ctx: &SplitbookContext,
    actor_id: &str,
    body: AcceptInvitationRequest,
) -> Result<GroupMember, ApiError> {
    let tx = ctx.begin().await?;
    let result: Result<AcceptOutcome, ApiError> = async {
        let store = GroupStore::new(&*tx);

        // Invitations are only visible to their invitee. The first read just
        // learns the group; the authoritative read happens under the lock.
        let invitation = store
            .find_invitation(&body.invitation_id)
            .await?
            .filter(|inv| inv.user_id == actor_id)
            .ok_or_else(|| ApiError::not_found(ErrorCode::InvitationNotFound))?;

        store
            .lock_group(&invitation.group_id)
            .await
            .map_err(or_group_not_found)?;

        let invitation = store
            .find_invitation(&body.invitation_id)
            .await?
            .filter(|inv| inv.user_id == actor_id)
            .ok_or_else(|| ApiError::not_found(ErrorCode::InvitationNotFound))?;
        if invitation.status != InvitationStatus::Pending {
            return Err(ApiError::with_message(
                ErrorKind::NotFound,
                ErrorCode::InvitationNotFound,
                "Invitation is no longer pending",
            ));
        }

        // Expiry is checked here and nowhere else; the row is left as-is
        if guard::is_invitation_expired(&invitation) {
            return Err(ApiError::conflict(ErrorCode::InvitationExpired));
        }

        // The invitee may have gained a seat since the invitation went out;
        // retire the invitation and report the conflict.
        if let Some(membership) = store
            .find_membership(&invitation.group_id, actor_id)
            .await?
        {
            if guard::is_accepted(&membership) {
                store
                    .mark_invitation(&invitation.id, InvitationStatus::Rejected)
                    .await?;
                return Ok(AcceptOutcome::AlreadyMember);
            }
        }

        let member = store
            .create_member(&invitation.group_id, actor_id, GroupRole::Member)
            .await?;
        store
            .mark_invitation(&invitation.id, InvitationStatus::Accepted)
            .await?;

        ctx.logger.info(&format!(
            "User {actor_id} joined group {}",
            invitation.group_id
        ));
        Ok(AcceptOutcome::Joined(member))
    }
    .await;

    // The AlreadyMember branch must commit (the invitation was retired)
    // before the conflict is reported.
    match finish(tx, result).await? {
        AcceptOutcome::Joined(member) => Ok(member),
        AcceptOutcome::AlreadyMember => Err(ApiError::conflict(ErrorCode::AlreadyAMember)),
    }
}

// ─── Reject ──────────────────────────────────────────────────────

/// Decline a pending invitation addressed to the actor. The row is kept,
/// flipped to `rejected`, so a later re-invite reuses it.
pub async fn handle_reject_invitation(
    ctx: &SplitbookContext,
    actor_id: &str,
    body: RejectInvitationRequest,
) -> Result<Invitation, ApiError> {
    let tx = ctx.begin().await?;
    let result: Result<Invitation, ApiError> = async {
        let store = GroupStore::new(&*tx);

        let invitation = store
            .find_invitation(&body.invitation_id)
            .await?
            .filter(|inv| inv.user_id == actor_id)
            .ok_or_else(|| ApiError::not_found(ErrorCode::InvitationNotFound))?;

        store
            .lock_group(&invitation.group_id)
            .await
            .map_err(or_group_not_found)?;

        let invitation = store
            .find_invitation(&body.invitation_id)
            .await?
            .filter(|inv| inv.user_id == actor_id)
            .ok_or_else(|| ApiError::not_found(ErrorCode::InvitationNotFound))?;
        if invitation.status != InvitationStatus::Pending {
            return Err(ApiError::with_message(
                ErrorKind::NotFound,
                ErrorCode::InvitationNotFound,
                "Invitation is no longer pending",
            ));
        }

        let rejected = store
            .mark_invitation(&invitation.id, InvitationStatus::Rejected)
            .await?
            .ok_or_else(|| ApiError::internal(ErrorCode::InternalServerError))?;

        ctx.logger.info(&format!(
            "User {actor_id} declined invitation to group {}",
            invitation.group_id
        ));
        Ok(rejected)
    }
    .await;
    finish(tx, result).await
}

// ─── List ────────────────────────────────────────────────────────

/// The actor's pending invitations, newest first, joined with the group
/// name and the inviter's username.
pub async fn handle_list_pending_invitations(
    ctx: &SplitbookContext,
    actor_id: &str,
) -> Result<Vec<InvitationView>, ApiError> {
    let tx = ctx.begin().await?;
    let result: Result<Vec<InvitationView>, ApiError> = async {
        let store = GroupStore::new(&*tx);
        let users = UserStore::new(&*tx);

        let invitations = store.list_pending_invitations_for_user(actor_id).await?;
        let mut views = Vec::with_capacity(invitations.len());
        for invitation in invitations {
            let Some(group) = store.find_group(&invitation.group_id).await? else {
                continue;
            };
            let inviter_username = users
                .find_by_id(&invitation.inviter_id)
                .await?
                .map(|user| user.username)
                .unwrap_or_default();
            views.push(InvitationView::from_invitation(
                invitation,
                group.name,
                inviter_username,
            ));
        }
        Ok(views)
    }
    .await;
    finish(tx, result).await
}
