//! Account creation (with the seeded category set) and account deletion with
//! its guards and cascade.

mod common;

use splitbook::account::{handle_create_user, handle_delete_account};
use splitbook::groups::types::*;
use splitbook::groups::{
    handle_change_role, handle_dissolve_group, handle_invite_member, handle_leave_group,
};
use splitbook::ledger::entries::CreateEntryRequest;
use splitbook::ledger::{handle_create_entry, handle_list_categories, DEFAULT_CATEGORIES};
use splitbook_core::db::adapter::WhereClause;
use splitbook_core::error::{ErrorCode, ErrorKind};
use splitbook_core::{Adapter, EntryKind};

mod creation {
    use super::*;

    #[tokio::test]
    async fn test_new_accounts_start_with_the_default_categories() {
        let ctx = common::memory_ctx().await;
        let alice = common::user(&ctx, "alice").await;

        let categories = handle_list_categories(&ctx, &alice.id).await.expect("list");
        assert_eq!(categories.len(), DEFAULT_CATEGORIES.len());
        assert_eq!(
            categories.iter().filter(|c| c.kind == EntryKind::Income).count(),
            4
        );
        assert_eq!(
            categories.iter().filter(|c| c.kind == EntryKind::Expense).count(),
            7
        );
        assert!(categories.iter().any(|c| c.name == "Salary"));
        assert!(categories.iter().any(|c| c.name == "Dining"));
    }

    #[tokio::test]
    async fn test_usernames_are_trimmed_and_required() {
        let ctx = common::memory_ctx().await;

        let err = handle_create_user(&ctx, "   ").await.expect_err("blank");
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.code, ErrorCode::UsernameRequired);

        let user = handle_create_user(&ctx, "  alice  ").await.expect("create");
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn test_duplicate_usernames_conflict() {
        let ctx = common::memory_ctx().await;
        common::user(&ctx, "alice").await;

        let err = handle_create_user(&ctx, "alice").await.expect_err("duplicate");
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(err.code, ErrorCode::UsernameTaken);
    }
}

mod deletion {
    use super::*;

    #[tokio::test]
    async fn test_deletion_waits_for_group_ties() {
        let ctx = common::memory_ctx().await;
        let alice = common::user(&ctx, "alice").await;
        let bob = common::user(&ctx, "bob").await;
        let own = common::group(&ctx, &alice, "Alice's flat").await;
        let bobs = common::group(&ctx, &bob, "Bob's trip").await;
        common::join(&ctx, &bob, &bobs, &alice).await;

        // Holding any accepted seat blocks deletion
        let err = handle_delete_account(&ctx, &alice.id)
            .await
            .expect_err("still a member");
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(err.code, ErrorCode::ActiveGroupMembership);

        handle_leave_group(
            &ctx,
            &alice.id,
            LeaveGroupRequest {
                group_id: bobs.id.clone(),
            },
        )
        .await
        .expect("leave bob's group");
        handle_leave_group(
            &ctx,
            &alice.id,
            LeaveGroupRequest {
                group_id: own.id.clone(),
            },
        )
        .await
        .expect("leave own group");

        // No seats left, but the created group still exists
        let err = handle_delete_account(&ctx, &alice.id)
            .await
            .expect_err("still owns a group");
        assert_eq!(err.code, ErrorCode::OwnsActiveGroups);

        handle_dissolve_group(
            &ctx,
            &alice.id,
            DissolveGroupRequest {
                group_id: own.id.clone(),
            },
        )
        .await
        .expect("dissolve own group");

        let deleted = handle_delete_account(&ctx, &alice.id).await.expect("delete");
        assert_eq!(deleted.id, alice.id);

        let err = handle_delete_account(&ctx, &alice.id)
            .await
            .expect_err("already gone");
        assert_eq!(err.code, ErrorCode::UserNotFound);
    }

    #[tokio::test]
    async fn test_deletion_cascade_clears_the_user_footprint() {
        let ctx = common::memory_ctx().await;
        let alice = common::user(&ctx, "alice").await;
        let bob = common::user(&ctx, "bob").await;
        let carol = common::user(&ctx, "carol").await;
        let bobs = common::group(&ctx, &bob, "Bob's trip").await;
        common::join(&ctx, &bob, &bobs, &alice).await;

        // Alice records a personal entry, invites carol from an admin seat,
        // and receives an invitation she never answers
        handle_create_entry(
            &ctx,
            &alice.id,
            CreateEntryRequest {
                group_id: None,
                category_id: None,
                kind: "expense".to_string(),
                amount: 9.5,
                description: None,
                entry_date: "2026-08-10".to_string(),
            },
        )
        .await
        .expect("personal entry");
        handle_change_role(
            &ctx,
            &bob.id,
            ChangeRoleRequest {
                group_id: bobs.id.clone(),
                user_id: alice.id.clone(),
                role: "admin".to_string(),
            },
        )
        .await
        .expect("promote alice");
        handle_invite_member(
            &ctx,
            &alice.id,
            InviteMemberRequest {
                group_id: bobs.id.clone(),
                username: carol.username.clone(),
            },
        )
        .await
        .expect("alice invites carol");
        let carols = common::group(&ctx, &carol, "Carol's club").await;
        handle_invite_member(
            &ctx,
            &carol.id,
            InviteMemberRequest {
                group_id: carols.id.clone(),
                username: alice.username.clone(),
            },
        )
        .await
        .expect("carol invites alice");

        handle_leave_group(
            &ctx,
            &alice.id,
            LeaveGroupRequest {
                group_id: bobs.id.clone(),
            },
        )
        .await
        .expect("alice leaves");
        handle_delete_account(&ctx, &alice.id).await.expect("delete");

        let alice_filter = [WhereClause::eq("userId", alice.id.clone())];
        assert_eq!(ctx.adapter.count("user", &[WhereClause::eq("id", alice.id.clone())]).await.expect("count"), 0);
        assert_eq!(ctx.adapter.count("category", &alice_filter).await.expect("count"), 0);
        assert_eq!(ctx.adapter.count("entry", &alice_filter).await.expect("count"), 0);
        assert_eq!(ctx.adapter.count("invitation", &alice_filter).await.expect("count"), 0);
        assert_eq!(
            ctx.adapter
                .count("invitation", &[WhereClause::eq("inviterId", alice.id.clone())])
                .await
                .expect("count"),
            0,
            "invitations alice issued are withdrawn"
        );

        // Everyone else's data is untouched
        assert_eq!(
            ctx.adapter
                .count("category", &[WhereClause::eq("userId", bob.id.clone())])
                .await
                .expect("count"),
            DEFAULT_CATEGORIES.len() as i64
        );
        assert_eq!(
            ctx.adapter
                .count("group", &[WhereClause::eq("id", bobs.id.clone())])
                .await
                .expect("count"),
            1
        );
    }
}
