// Typed queries for the `group`, `groupMember`, and `invitation` tables.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use splitbook_core::db::adapter::{Adapter, FindManyQuery, SortBy, SortDirection, WhereClause};
use splitbook_core::{
    generate_id, Group, GroupMember, GroupRole, Invitation, InvitationStatus, MemberStatus,
};

use crate::store::{decode, decode_vec, encode, StoreError};

pub struct GroupStore<'a, A: Adapter + ?Sized> {
    adapter: &'a A,
}

impl<'a, A: Adapter + ?Sized> GroupStore<'a, A> {
    pub fn new(adapter: &'a A) -> Self {
        Self { adapter }
    }

    // ─── Groups ──────────────────────────────────────────────────

    /// Take the per-group write lock for this transaction and return the
    /// locked row.
    ///
    /// The lock is an `UPDATE` that bumps `updatedAt`: it blocks concurrent
    /// writers of the same group until commit and doubles as the existence
    /// check. A missing group reports zero affected rows and surfaces as
    /// `StoreError::NotFound`.
    pub async fn lock_group(&self, group_id: &str) -> Result<Group, StoreError> {
        let row = self
            .adapter
            .update(
                "group",
                &[WhereClause::eq("id", group_id)],
                json!({ "updatedAt": Utc::now() }),
            )
            .await?;
        match row {
            Some(row) => decode(row),
            None => Err(StoreError::NotFound),
        }
    }

    pub async fn create_group(
        &self,
        name: &str,
        description: Option<String>,
        created_by: &str,
    ) -> Result<Group, StoreError> {
        let now = Utc::now();
        let group = Group {
            id: generate_id(),
            name: name.to_string(),
            description,
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        };
        let row = self.adapter.create("group", encode(&group)?).await?;
        decode(row)
    }

    pub async fn find_group(&self, group_id: &str) -> Result<Option<Group>, StoreError> {
        let row = self
            .adapter
            .find_one("group", &[WhereClause::eq("id", group_id)])
            .await?;
        row.map(decode).transpose()
    }

    /// Apply a partial update to the group row. `updatedAt` is bumped here so
    /// callers only pass the fields they change.
    pub async fn update_group(
        &self,
        group_id: &str,
        mut data: Value,
    ) -> Result<Option<Group>, StoreError> {
        if let Some(obj) = data.as_object_mut() {
            obj.insert("updatedAt".to_string(), json!(Utc::now()));
        }
        let row = self
            .adapter
            .update("group", &[WhereClause::eq("id", group_id)], data)
            .await?;
        row.map(decode).transpose()
    }

    pub async fn list_groups_created_by(&self, user_id: &str) -> Result<Vec<Group>, StoreError> {
        let rows = self
            .adapter
            .find_many(
                "group",
                FindManyQuery {
                    where_clauses: vec![WhereClause::eq("createdBy", user_id)],
                    sort_by: Some(SortBy {
                        field: "createdAt".to_string(),
                        direction: SortDirection::Asc,
                    }),
                    ..Default::default()
                },
            )
            .await?;
        decode_vec(rows)
    }

    /// Delete a group and everything hanging off it, in dependency order:
    /// membership rows, invitation rows, group ledger entries, the group row.
    pub async fn delete_group_cascade(&self, group_id: &str) -> Result<(), StoreError> {
        self.adapter
            .delete_many("groupMember", &[WhereClause::eq("groupId", group_id)])
            .await?;
        self.adapter
            .delete_many("invitation", &[WhereClause::eq("groupId", group_id)])
            .await?;
        self.adapter
            .delete_many("entry", &[WhereClause::eq("groupId", group_id)])
            .await?;
        self.adapter
            .delete("group", &[WhereClause::eq("id", group_id)])
            .await?;
        Ok(())
    }

    // ─── Memberships ─────────────────────────────────────────────

    /// Insert an accepted membership seat. The pending state lives in the
    /// invitation table, never here.
    pub async fn create_member(
        &self,
        group_id: &str,
        user_id: &str,
        role: GroupRole,
    ) -> Result<GroupMember, StoreError> {
        let member = GroupMember {
            id: generate_id(),
            group_id: group_id.to_string(),
            user_id: user_id.to_string(),
            role,
            status: MemberStatus::Accepted,
            joined_at: Utc::now(),
        };
        let row = self.adapter.create("groupMember", encode(&member)?).await?;
        decode(row)
    }

    pub async fn find_membership(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<Option<GroupMember>, StoreError> {
        let row = self
            .adapter
            .find_one(
                "groupMember",
                &[
                    WhereClause::eq("groupId", group_id).and(),
                    WhereClause::eq("userId", user_id),
                ],
            )
            .await?;
        row.map(decode).transpose()
    }

    pub async fn list_members(&self, group_id: &str) -> Result<Vec<GroupMember>, StoreError> {
        let rows = self
            .adapter
            .find_many(
                "groupMember",
                FindManyQuery {
                    where_clauses: vec![WhereClause::eq("groupId", group_id)],
                    sort_by: Some(SortBy {
                        field: "joinedAt".to_string(),
                        direction: SortDirection::Asc,
                    }),
                    ..Default::default()
                },
            )
            .await?;
        decode_vec(rows)
    }

    pub async fn list_memberships_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<GroupMember>, StoreError> {
        let rows = self
            .adapter
            .find_many(
                "groupMember",
                FindManyQuery {
                    where_clauses: vec![WhereClause::eq("userId", user_id)],
                    sort_by: Some(SortBy {
                        field: "joinedAt".to_string(),
                        direction: SortDirection::Asc,
                    }),
                    ..Default::default()
                },
            )
            .await?;
        decode_vec(rows)
    }

    pub async fn count_accepted_members(&self, group_id: &str) -> Result<i64, StoreError> {
        let count = self
            .adapter
            .count(
                "groupMember",
                &[
                    WhereClause::eq("groupId", group_id).and(),
                    WhereClause::eq("status", MemberStatus::Accepted.as_str()),
                ],
            )
            .await?;
        Ok(count)
    }

    pub async fn update_member_role(
        &self,
        member_id: &str,
        role: GroupRole,
    ) -> Result<Option<GroupMember>, StoreError> {
        let row = self
            .adapter
            .update(
                "groupMember",
                &[WhereClause::eq("id", member_id)],
                json!({ "role": role.as_str() }),
            )
            .await?;
        row.map(decode).transpose()
    }

    pub async fn delete_member(&self, member_id: &str) -> Result<(), StoreError> {
        self.adapter
            .delete("groupMember", &[WhereClause::eq("id", member_id)])
            .await?;
        Ok(())
    }

    // ─── Invitations ─────────────────────────────────────────────

    pub async fn find_invitation(
        &self,
        invitation_id: &str,
    ) -> Result<Option<Invitation>, StoreError> {
        let row = self
            .adapter
            .find_one("invitation", &[WhereClause::eq("id", invitation_id)])
            .await?;
        row.map(decode).transpose()
    }

    /// The at-most-one invitation row for this (group, user) pair, whatever
    /// its status.
    pub async fn find_invitation_for_user(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<Option<Invitation>, StoreError> {
        let row = self
            .adapter
            .find_one(
                "invitation",
                &[
                    WhereClause::eq("groupId", group_id).and(),
                    WhereClause::eq("userId", user_id),
                ],
            )
            .await?;
        row.map(decode).transpose()
    }

    pub async fn create_invitation(
        &self,
        group_id: &str,
        user_id: &str,
        inviter_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Invitation, StoreError> {
        let invitation = Invitation {
            id: generate_id(),
            group_id: group_id.to_string(),
            user_id: user_id.to_string(),
            inviter_id: inviter_id.to_string(),
            status: InvitationStatus::Pending,
            created_at: Utc::now(),
            expires_at: Some(expires_at),
        };
        let row = self.adapter.create("invitation", encode(&invitation)?).await?;
        decode(row)
    }

    /// Re-arm a resolved invitation row: back to pending under the new
    /// inviter, with fresh timestamps. The row identity is preserved.
    pub async fn reset_invitation(
        &self,
        invitation_id: &str,
        inviter_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<Invitation>, StoreError> {
        let row = self
            .adapter
            .update(
                "invitation",
                &[WhereClause::eq("id", invitation_id)],
                json!({
                    "status": InvitationStatus::Pending.as_str(),
                    "inviterId": inviter_id,
                    "createdAt": Utc::now(),
                    "expiresAt": expires_at,
                }),
            )
            .await?;
        row.map(decode).transpose()
    }

    /// Flip an invitation to a resolved status.
    pub async fn mark_invitation(
        &self,
        invitation_id: &str,
        status: InvitationStatus,
    ) -> Result<Option<Invitation>, StoreError> {
        let row = self
            .adapter
            .update(
                "invitation",
                &[WhereClause::eq("id", invitation_id)],
                json!({ "status": status.as_str() }),
            )
            .await?;
        row.map(decode).transpose()
    }

    pub async fn list_pending_invitations_for_group(
        &self,
        group_id: &str,
    ) -> Result<Vec<Invitation>, StoreError> {
        let rows = self
            .adapter
            .find_many(
                "invitation",
                FindManyQuery {
                    where_clauses: vec![
                        WhereClause::eq("groupId", group_id).and(),
                        WhereClause::eq("status", InvitationStatus::Pending.as_str()),
                    ],
                    sort_by: Some(SortBy {
                        field: "createdAt".to_string(),
                        direction: SortDirection::Asc,
                    }),
                    ..Default::default()
                },
            )
            .await?;
        decode_vec(rows)
    }

    pub async fn list_pending_invitations_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Invitation>, StoreError> {
        let rows = self
            .adapter
            .find_many(
                "invitation",
                FindManyQuery {
                    where_clauses: vec![
                        WhereClause::eq("userId", user_id).and(),
                        WhereClause::eq("status", InvitationStatus::Pending.as_str()),
                    ],
                    sort_by: Some(SortBy {
                        field: "createdAt".to_string(),
                        direction: SortDirection::Desc,
                    }),
                    ..Default::default()
                },
            )
            .await?;
        decode_vec(rows)
    }

    pub async fn count_pending_invitations(&self, group_id: &str) -> Result<i64, StoreError> {
        let count = self
            .adapter
            .count(
                "invitation",
                &[
                    WhereClause::eq("groupId", group_id).and(),
                    WhereClause::eq("status", InvitationStatus::Pending.as_str()),
                ],
            )
            .await?;
        Ok(count)
    }

    /// Remove every invitation the user appears on, as invitee or inviter.
    pub async fn delete_invitations_for_user(&self, user_id: &str) -> Result<i64, StoreError> {
        let deleted = self
            .adapter
            .delete_many(
                "invitation",
                &[
                    WhereClause::eq("userId", user_id).or(),
                    WhereClause::eq("inviterId", user_id),
                ],
            )
            .await?;
        Ok(deleted)
    }
}
