// Request and response payloads for the group subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use splitbook_core::{GroupMember, GroupRole, Invitation, InvitationStatus, MemberStatus};

// ─── Requests ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupRequest {
    pub group_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The invitee is addressed by username, not id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteMemberRequest {
    pub group_id: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptInvitationRequest {
    pub invitation_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectInvitationRequest {
    pub invitation_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveMemberRequest {
    pub group_id: String,
    pub user_id: String,
}

/// `role` stays a raw string so unknown values surface as a typed
/// validation error instead of a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRoleRequest {
    pub group_id: String,
    pub user_id: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveGroupRequest {
    pub group_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DissolveGroupRequest {
    pub group_id: String,
}

// ─── Responses ───────────────────────────────────────────────────

/// One row of `list_user_groups`: a group the actor belongs to, with the
/// actor's role and the accepted head count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub role: GroupRole,
    pub member_count: i64,
}

/// Membership row joined with the member's username.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub role: GroupRole,
    pub status: MemberStatus,
    pub joined_at: DateTime<Utc>,
}

/// Invitation row joined with the group name and the inviter's username.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationView {
    pub id: String,
    pub group_id: String,
    pub group_name: String,
    pub user_id: String,
    pub inviter_id: String,
    pub inviter_username: String,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl MemberView {
    pub(crate) fn from_member(member: GroupMember, username: impl Into<String>) -> Self {
        Self {
            id: member.id,
            user_id: member.user_id,
            username: username.into(),
            role: member.role,
            status: member.status,
            joined_at: member.joined_at,
        }
    }
}

impl InvitationView {
    pub(crate) fn from_invitation(
        invitation: Invitation,
        group_name: impl Into<String>,
        inviter_username: impl Into<String>,
    ) -> Self {
        Self {
            id: invitation.id,
            group_id: invitation.group_id,
            group_name: group_name.into(),
            user_id: invitation.user_id,
            inviter_id: invitation.inviter_id,
            inviter_username: inviter_username.into(),
            status: invitation.status,
            created_at: invitation.created_at,
            expires_at: invitation.expires_at,
        }
    }
}

/// Full group view for members. Pending invitations are only populated for
/// admins; members receive `null` there.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetail {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub members: Vec<MemberView>,
    pub invitations: Option<Vec<InvitationView>>,
}
