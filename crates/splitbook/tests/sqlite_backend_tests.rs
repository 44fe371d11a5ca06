//! The same invariants exercised against the SQL adapter on an in-memory
//! SQLite database: real transactions, real unique indexes, real rollbacks.

mod common;

use chrono::Utc;
use splitbook::groups::types::*;
use splitbook::groups::{
    handle_accept_invitation, handle_dissolve_group, handle_get_group_detail,
    handle_invite_member, handle_leave_group, handle_list_user_groups, handle_reject_invitation,
    handle_remove_member,
};
use splitbook::ledger::entries::CreateEntryRequest;
use splitbook::ledger::handle_create_entry;
use splitbook_core::db::adapter::{SchemaStatus, WhereClause};
use splitbook_core::error::{ErrorCode, ErrorKind};
use splitbook_core::{
    Adapter, GroupMember, GroupRole, InvitationStatus, MemberStatus, SplitbookError,
};

#[tokio::test]
async fn test_schema_bootstraps_up_to_date() {
    let ctx = common::sqlite_ctx().await;
    let status = ctx.check_schema().await.expect("schema check");
    assert!(matches!(status, SchemaStatus::UpToDate));
}

#[tokio::test]
async fn test_group_membership_round_trip() {
    let ctx = common::sqlite_ctx().await;
    let alice = common::user(&ctx, "alice").await;
    let bob = common::user(&ctx, "bob").await;
    let group = common::group(&ctx, &alice, "Trip").await;
    common::join(&ctx, &alice, &group, &bob).await;

    let groups = handle_list_user_groups(&ctx, &bob.id).await.expect("list");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].member_count, 2);
    assert_eq!(groups[0].role, GroupRole::Member);

    let detail = handle_get_group_detail(&ctx, &alice.id, &group.id)
        .await
        .expect("detail");
    assert_eq!(detail.members.len(), 2);
}

#[tokio::test]
async fn test_sole_admin_cannot_abandon_a_live_group() {
    let ctx = common::sqlite_ctx().await;
    let alice = common::user(&ctx, "alice").await;
    let bob = common::user(&ctx, "bob").await;
    let group = common::group(&ctx, &alice, "Trip").await;
    common::join(&ctx, &alice, &group, &bob).await;

    let err = handle_leave_group(
        &ctx,
        &alice.id,
        LeaveGroupRequest {
            group_id: group.id.clone(),
        },
    )
    .await
    .expect_err("sole admin leaving");
    assert_eq!(err.kind, ErrorKind::InvariantViolation);
    assert_eq!(err.code, ErrorCode::LastAdminProtected);
}

#[tokio::test]
async fn test_reinvite_reuses_the_unique_row() {
    let ctx = common::sqlite_ctx().await;
    let alice = common::user(&ctx, "alice").await;
    let carol = common::user(&ctx, "carol").await;
    let group = common::group(&ctx, &alice, "Trip").await;

    let first = handle_invite_member(
        &ctx,
        &alice.id,
        InviteMemberRequest {
            group_id: group.id.clone(),
            username: carol.username.clone(),
        },
    )
    .await
    .expect("invite");
    handle_reject_invitation(
        &ctx,
        &carol.id,
        RejectInvitationRequest {
            invitation_id: first.id.clone(),
        },
    )
    .await
    .expect("reject");

    let second = handle_invite_member(
        &ctx,
        &alice.id,
        InviteMemberRequest {
            group_id: group.id.clone(),
            username: carol.username.clone(),
        },
    )
    .await
    .expect("re-invite");
    assert_eq!(second.id, first.id);
    assert_eq!(second.status, InvitationStatus::Pending);

    handle_accept_invitation(
        &ctx,
        &carol.id,
        AcceptInvitationRequest {
            invitation_id: second.id.clone(),
        },
    )
    .await
    .expect("accept");
}

#[tokio::test]
async fn test_duplicate_membership_hits_the_unique_index() {
    let ctx = common::sqlite_ctx().await;
    let alice = common::user(&ctx, "alice").await;
    let group = common::group(&ctx, &alice, "Trip").await;

    let duplicate = GroupMember {
        id: "dup-seat".to_string(),
        group_id: group.id.clone(),
        user_id: alice.id.clone(),
        role: GroupRole::Member,
        status: MemberStatus::Accepted,
        joined_at: Utc::now(),
    };
    let err = ctx
        .adapter
        .create(
            "groupMember",
            serde_json::to_value(&duplicate).expect("encode"),
        )
        .await
        .expect_err("second seat for the same user");
    assert!(matches!(err, SplitbookError::UniqueViolation(_)));
}

#[tokio::test]
async fn test_refused_dissolution_rolls_back_the_lock() {
    let ctx = common::sqlite_ctx().await;
    let alice = common::user(&ctx, "alice").await;
    let bob = common::user(&ctx, "bob").await;
    let group = common::group(&ctx, &alice, "Trip").await;
    common::join(&ctx, &alice, &group, &bob).await;

    let before = handle_get_group_detail(&ctx, &alice.id, &group.id)
        .await
        .expect("detail");

    let err = handle_dissolve_group(
        &ctx,
        &alice.id,
        DissolveGroupRequest {
            group_id: group.id.clone(),
        },
    )
    .await
    .expect_err("members still present");
    assert_eq!(err.code, ErrorCode::GroupStillHasMembers);

    let after = handle_get_group_detail(&ctx, &alice.id, &group.id)
        .await
        .expect("detail");
    assert_eq!(after.updated_at, before.updated_at);
}

#[tokio::test]
async fn test_dissolution_cascade_on_sql() {
    let ctx = common::sqlite_ctx().await;
    let alice = common::user(&ctx, "alice").await;
    let bob = common::user(&ctx, "bob").await;
    let carol = common::user(&ctx, "carol").await;
    let group = common::group(&ctx, &alice, "Trip").await;
    common::join(&ctx, &alice, &group, &bob).await;

    handle_invite_member(
        &ctx,
        &alice.id,
        InviteMemberRequest {
            group_id: group.id.clone(),
            username: carol.username.clone(),
        },
    )
    .await
    .expect("invite carol");
    handle_create_entry(
        &ctx,
        &bob.id,
        CreateEntryRequest {
            group_id: Some(group.id.clone()),
            category_id: None,
            kind: "expense".to_string(),
            amount: 42.5,
            description: None,
            entry_date: "2026-08-01".to_string(),
        },
    )
    .await
    .expect("group entry");

    handle_remove_member(
        &ctx,
        &alice.id,
        RemoveMemberRequest {
            group_id: group.id.clone(),
            user_id: bob.id.clone(),
        },
    )
    .await
    .expect("remove bob");
    handle_dissolve_group(
        &ctx,
        &alice.id,
        DissolveGroupRequest {
            group_id: group.id.clone(),
        },
    )
    .await
    .expect("dissolve");

    let group_filter = [WhereClause::eq("groupId", group.id.clone())];
    for model in ["groupMember", "invitation", "entry"] {
        assert_eq!(
            ctx.adapter.count(model, &group_filter).await.expect("count"),
            0,
            "{model} rows linger after dissolution"
        );
    }
    assert_eq!(
        ctx.adapter
            .count("group", &[WhereClause::eq("id", group.id.clone())])
            .await
            .expect("count"),
        0
    );
}
