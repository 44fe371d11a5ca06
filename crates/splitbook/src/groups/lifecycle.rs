// Group lifecycle: create, update, membership changes, dissolution, views.
//
// Mutating handlers take the per-group lock first, then read a membership
// snapshot and run the guards against it, so the sole-admin invariant holds
// under concurrent requests.

use serde_json::{json, Value};
use splitbook_core::error::{ApiError, ErrorCode};
use splitbook_core::{Group, GroupMember, GroupRole};

use crate::context::{finish, SplitbookContext};
use crate::groups::guard;
use crate::groups::or_group_not_found;
use crate::groups::store::GroupStore;
use crate::groups::types::{
    ChangeRoleRequest, CreateGroupRequest, DissolveGroupRequest, GroupDetail, GroupSummary,
    InvitationView, LeaveGroupRequest, MemberView, RemoveMemberRequest, UpdateGroupRequest,
};
use crate::store::UserStore;

// ─── Create / update ─────────────────────────────────────────────

/// Create a group. The creator becomes its first accepted admin in the same
/// transaction.
pub async fn handle_create_group(
    ctx: &SplitbookContext,
    actor_id: &str,
    body: CreateGroupRequest,
) -> Result<Group, ApiError> {
    if !ctx.options.group.allow_user_to_create_group {
        return Err(ApiError::forbidden(ErrorCode::GroupCreationDisabled));
    }
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::validation(ErrorCode::GroupNameRequired));
    }

    let tx = ctx.begin().await?;
    let result: Result<Group, ApiError> = async {
        let store = GroupStore::new(&*tx);

        // The creation cap counts groups that still exist
        let created = store.list_groups_created_by(actor_id).await?;
        if created.len() >= ctx.options.group.group_limit {
            return Err(ApiError::forbidden(ErrorCode::GroupLimitReached));
        }

        let group = store
            .create_group(name, body.description.clone(), actor_id)
            .await?;
        store
            .create_member(&group.id, actor_id, GroupRole::Admin)
            .await?;

        ctx.logger
            .info(&format!("User {actor_id} created group {}", group.id));
        Ok(group)
    }
    .await;
    finish(tx, result).await
}

/// Rename a group or replace its description. Admin only.
pub async fn handle_update_group(
    ctx: &SplitbookContext,
    actor_id: &str,
    body: UpdateGroupRequest,
) -> Result<Group, ApiError> {
    let tx = ctx.begin().await?;
    let result: Result<Group, ApiError> = async {
        let store = GroupStore::new(&*tx);

        store
            .lock_group(&body.group_id)
            .await
            .map_err(or_group_not_found)?;
        let actor = store
            .find_membership(&body.group_id, actor_id)
            .await?
            .ok_or_else(|| ApiError::not_found(ErrorCode::NotAMember))?;
        if !guard::can_modify_group(&actor) {
            return Err(ApiError::forbidden(ErrorCode::AdminRoleRequired));
        }

        let mut updates = serde_json::Map::new();
        if let Some(name) = &body.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(ApiError::validation(ErrorCode::GroupNameRequired));
            }
            updates.insert("name".to_string(), json!(name));
        }
        if let Some(description) = &body.description {
            updates.insert("description".to_string(), json!(description));
        }

        let updated = store
            .update_group(&body.group_id, Value::Object(updates))
            .await?
            .ok_or_else(|| ApiError::not_found(ErrorCode::GroupNotFound))?;
        Ok(updated)
    }
    .await;
    finish(tx, result).await
}

// ─── Membership changes ──────────────────────────────────────────

/// Remove an accepted member from a group. Admin only; self-removal goes
/// through `leave_group` instead.
pub async fn handle_remove_member(
    ctx: &SplitbookContext,
    actor_id: &str,
    body: RemoveMemberRequest,
) -> Result<GroupMember, ApiError> {
    let tx = ctx.begin().await?;
    let result: Result<GroupMember, ApiError> = async {
        let store = GroupStore::new(&*tx);

        store
            .lock_group(&body.group_id)
            .await
            .map_err(or_group_not_found)?;
        let actor = store
            .find_membership(&body.group_id, actor_id)
            .await?
            .ok_or_else(|| ApiError::not_found(ErrorCode::NotAMember))?;
        if !guard::can_modify_group(&actor) {
            return Err(ApiError::forbidden(ErrorCode::AdminRoleRequired));
        }
        if body.user_id == actor_id {
            return Err(ApiError::forbidden(ErrorCode::CannotRemoveYourself));
        }

        let members = store.list_members(&body.group_id).await?;
        let target = guard::membership_of(&members, &body.user_id)
            .filter(|member| guard::is_accepted(member))
            .ok_or_else(|| ApiError::not_found(ErrorCode::MemberNotFound))?;
        if !guard::can_downgrade_or_remove(&members, &body.user_id) {
            return Err(ApiError::invariant(ErrorCode::LastAdminProtected));
        }

        store.delete_member(&target.id).await?;
        ctx.logger.info(&format!(
            "User {actor_id} removed {} from group {}",
            body.user_id, body.group_id
        ));
        Ok(target.clone())
    }
    .await;
    finish(tx, result).await
}

/// Promote or demote an accepted member. Admin only; acting on yourself is
/// refused.
pub async fn handle_change_role(
    ctx: &SplitbookContext,
    actor_id: &str,
    body: ChangeRoleRequest,
) -> Result<GroupMember, ApiError> {
    let tx = ctx.begin().await?;
    let result: Result<GroupMember, ApiError> = async {
        let store = GroupStore::new(&*tx);

        store
            .lock_group(&body.group_id)
            .await
            .map_err(or_group_not_found)?;
        let actor = store
            .find_membership(&body.group_id, actor_id)
            .await?
            .ok_or_else(|| ApiError::not_found(ErrorCode::NotAMember))?;
        if !guard::can_modify_group(&actor) {
            return Err(ApiError::forbidden(ErrorCode::AdminRoleRequired));
        }
        if body.user_id == actor_id {
            return Err(ApiError::forbidden(ErrorCode::CannotChangeYourOwnRole));
        }

        let role =
            GroupRole::from_str(&body.role).ok_or_else(|| ApiError::validation(ErrorCode::InvalidRole))?;

        let members = store.list_members(&body.group_id).await?;
        let target = guard::membership_of(&members, &body.user_id)
            .filter(|member| guard::is_accepted(member))
            .ok_or_else(|| ApiError::not_found(ErrorCode::MemberNotFound))?;

        // Demotion is where the last admin could disappear
        if role == GroupRole::Member && !guard::can_downgrade_or_remove(&members, &body.user_id) {
            return Err(ApiError::invariant(ErrorCode::LastAdminProtected));
        }

        let updated = store
            .update_member_role(&target.id, role)
            .await?
            .ok_or_else(|| ApiError::internal(ErrorCode::InternalServerError))?;
        ctx.logger.info(&format!(
            "User {actor_id} set {} to {} in group {}",
            body.user_id,
            role.as_str(),
            body.group_id
        ));
        Ok(updated)
    }
    .await;
    finish(tx, result).await
}

/// Leave a group. A sole admin must hand off the role first unless they are
/// also the last member; the group itself stays behind.
pub async fn handle_leave_group(
    ctx: &SplitbookContext,
    actor_id: &str,
    body: LeaveGroupRequest,
) -> Result<GroupMember, ApiError> {
    let tx = ctx.begin().await?;
    let result: Result<GroupMember, ApiError> = async {
        let store = GroupStore::new(&*tx);

        store
            .lock_group(&body.group_id)
            .await
            .map_err(or_group_not_found)?;
        let members = store.list_members(&body.group_id).await?;
        let me = guard::membership_of(&members, actor_id)
            .filter(|member| guard::is_accepted(member))
            .ok_or_else(|| ApiError::not_found(ErrorCode::NotAMember))?;
        if !guard::can_downgrade_or_remove(&members, actor_id) {
            ctx.logger.warn(&format!(
                "Refused leave for sole admin {actor_id} of group {}",
                body.group_id
            ));
            return Err(ApiError::invariant(ErrorCode::LastAdminProtected));
        }

        store.delete_member(&me.id).await?;
        ctx.logger
            .info(&format!("User {actor_id} left group {}", body.group_id));
        Ok(me.clone())
    }
    .await;
    finish(tx, result).await
}

// ─── Dissolution ─────────────────────────────────────────────────

/// Dissolve a group, cascading over memberships, invitations, and group
/// ledger entries. Allowed for an admin who is the last accepted member,
/// and for the creator once the group is empty.
pub async fn handle_dissolve_group(
    ctx: &SplitbookContext,
    actor_id: &str,
    body: DissolveGroupRequest,
) -> Result<Group, ApiError> {
    let tx = ctx.begin().await?;
    let result: Result<Group, ApiError> = async {
        let store = GroupStore::new(&*tx);

        let group = store
            .lock_group(&body.group_id)
            .await
            .map_err(or_group_not_found)?;
        let members = store.list_members(&body.group_id).await?;

        match guard::membership_of(&members, actor_id) {
            Some(member) if guard::can_modify_group(member) => {
                if !guard::can_dissolve_group(&members) {
                    return Err(ApiError::invariant(ErrorCode::GroupStillHasMembers));
                }
            }
            Some(_) => return Err(ApiError::forbidden(ErrorCode::AdminRoleRequired)),
            None => {
                // The creator may sweep up an empty group they once led
                if guard::accepted_member_count(&members) != 0 || group.created_by != actor_id {
                    return Err(ApiError::not_found(ErrorCode::NotAMember));
                }
            }
        }

        store.delete_group_cascade(&group.id).await?;
        ctx.logger
            .info(&format!("User {actor_id} dissolved group {}", group.id));
        Ok(group)
    }
    .await;
    finish(tx, result).await
}

// ─── Views ───────────────────────────────────────────────────────

/// Groups where the actor holds an accepted seat, with role and accepted
/// head count.
pub async fn handle_list_user_groups(
    ctx: &SplitbookContext,
    actor_id: &str,
) -> Result<Vec<GroupSummary>, ApiError> {
    let tx = ctx.begin().await?;
    let result: Result<Vec<GroupSummary>, ApiError> = async {
        let store = GroupStore::new(&*tx);

        let memberships = store.list_memberships_for_user(actor_id).await?;
        let mut summaries = Vec::new();
        for membership in memberships.iter().filter(|m| guard::is_accepted(m)) {
            let Some(group) = store.find_group(&membership.group_id).await? else {
                continue;
            };
            let member_count = store.count_accepted_members(&group.id).await?;
            summaries.push(GroupSummary {
                id: group.id,
                name: group.name,
                description: group.description,
                created_by: group.created_by,
                created_at: group.created_at,
                updated_at: group.updated_at,
                role: membership.role,
                member_count,
            });
        }
        Ok(summaries)
    }
    .await;
    finish(tx, result).await
}

/// Full group view for an accepted member. Outsiders get `NotFound`, never
/// `Forbidden`: the group does not exist for them. Pending invitations are
/// included for admins only.
pub async fn handle_get_group_detail(
    ctx: &SplitbookContext,
    actor_id: &str,
    group_id: &str,
) -> Result<GroupDetail, ApiError> {
    let tx = ctx.begin().await?;
    let result: Result<GroupDetail, ApiError> = async {
        let store = GroupStore::new(&*tx);
        let users = UserStore::new(&*tx);

        let group = store
            .find_group(group_id)
            .await?
            .ok_or_else(|| ApiError::not_found(ErrorCode::GroupNotFound))?;
        let members = store.list_members(group_id).await?;
        let me = guard::membership_of(&members, actor_id)
            .filter(|member| guard::is_accepted(member))
            .ok_or_else(|| ApiError::not_found(ErrorCode::NotAMember))?;
        let is_admin = guard::is_accepted_admin(me);

        let mut member_views = Vec::with_capacity(members.len());
        for member in &members {
            let username = users
                .find_by_id(&member.user_id)
                .await?
                .map(|user| user.username)
                .unwrap_or_default();
            member_views.push(MemberView::from_member(member.clone(), username));
        }

        let invitations = if is_admin {
            let pending = store.list_pending_invitations_for_group(group_id).await?;
            let mut views = Vec::with_capacity(pending.len());
            for invitation in pending {
                let inviter_username = users
                    .find_by_id(&invitation.inviter_id)
                    .await?
                    .map(|user| user.username)
                    .unwrap_or_default();
                views.push(InvitationView::from_invitation(
                    invitation,
                    group.name.clone(),
                    inviter_username,
                ));
            }
            Some(views)
        } else {
            None
        };

        Ok(GroupDetail {
            id: group.id,
            name: group.name,
            description: group.description,
            created_by: group.created_by,
            created_at: group.created_at,
            updated_at: group.updated_at,
            members: member_views,
            invitations,
        })
    }
    .await;
    finish(tx, result).await
}
