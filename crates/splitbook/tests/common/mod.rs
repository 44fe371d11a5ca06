// Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use splitbook::account::handle_create_user;
use splitbook::context::SplitbookContext;
use splitbook::groups::types::{
    AcceptInvitationRequest, CreateGroupRequest, InviteMemberRequest,
};
use splitbook::groups::{handle_accept_invitation, handle_create_group, handle_invite_member};
use splitbook_core::{Group, GroupMember, SplitbookOptions, User};
use splitbook_memory::MemoryAdapter;
use splitbook_sqlx::SqlxAdapter;

pub async fn memory_ctx() -> Arc<SplitbookContext> {
    memory_ctx_with(SplitbookOptions::default()).await
}

pub async fn memory_ctx_with(options: SplitbookOptions) -> Arc<SplitbookContext> {
    let ctx = SplitbookContext::new(options, Arc::new(MemoryAdapter::new()));
    ctx.init().await.expect("init");
    ctx
}

pub async fn sqlite_ctx() -> Arc<SplitbookContext> {
    let adapter = SqlxAdapter::connect("sqlite::memory:")
        .await
        .expect("connect sqlite");
    let ctx = SplitbookContext::new(SplitbookOptions::default(), Arc::new(adapter));
    ctx.init().await.expect("init");
    ctx
}

pub async fn user(ctx: &SplitbookContext, username: &str) -> User {
    handle_create_user(ctx, username).await.expect("create user")
}

pub async fn group(ctx: &SplitbookContext, owner: &User, name: &str) -> Group {
    handle_create_group(
        ctx,
        &owner.id,
        CreateGroupRequest {
            name: name.to_string(),
            description: None,
        },
    )
    .await
    .expect("create group")
}

/// Invite `invitee` by username and accept right away.
pub async fn join(
    ctx: &SplitbookContext,
    admin: &User,
    group: &Group,
    invitee: &User,
) -> GroupMember {
    let invitation = handle_invite_member(
        ctx,
        &admin.id,
        InviteMemberRequest {
            group_id: group.id.clone(),
            username: invitee.username.clone(),
        },
    )
    .await
    .expect("invite");
    handle_accept_invitation(
        ctx,
        &invitee.id,
        AcceptInvitationRequest {
            invitation_id: invitation.id,
        },
    )
    .await
    .expect("accept")
}
