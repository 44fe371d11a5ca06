// Pure predicates behind the group lifecycle rules.
//
// Handlers load a membership snapshot inside their transaction and ask these
// functions what the actor may do. Nothing here touches storage, so every
// rule is unit-testable in isolation.

use chrono::{DateTime, Duration, Utc};
use splitbook_core::{GroupMember, GroupRole, Invitation, MemberStatus};

/// True when the membership is an accepted admin seat.
pub fn is_accepted_admin(member: &GroupMember) -> bool {
    member.status == MemberStatus::Accepted && member.role == GroupRole::Admin
}

pub fn is_accepted(member: &GroupMember) -> bool {
    member.status == MemberStatus::Accepted
}

pub fn accepted_member_count(members: &[GroupMember]) -> usize {
    members.iter().filter(|m| is_accepted(m)).count()
}

pub fn accepted_admin_count(members: &[GroupMember]) -> usize {
    members.iter().filter(|m| is_accepted_admin(m)).count()
}

/// Find a user's membership row in a snapshot.
pub fn membership_of<'a>(members: &'a [GroupMember], user_id: &str) -> Option<&'a GroupMember> {
    members.iter().find(|m| m.user_id == user_id)
}

/// Whether the membership grants group modification: rename, invite,
/// remove, role changes, dissolution.
pub fn can_modify_group(member: &GroupMember) -> bool {
    is_accepted_admin(member)
}

/// Whether `target_user_id` may be demoted, removed, or may leave.
///
/// The only refusal is stripping the last admin of a group that still has
/// other accepted members. A sole admin who is also the sole member is free
/// to go; the group stays behind, empty and dissolvable.
pub fn can_downgrade_or_remove(members: &[GroupMember], target_user_id: &str) -> bool {
    let target = match membership_of(members, target_user_id) {
        Some(member) => member,
        None => return true,
    };
    if !is_accepted_admin(target) {
        return true;
    }
    accepted_admin_count(members) > 1 || accepted_member_count(members) <= 1
}

/// Dissolution is allowed once at most one accepted member remains.
pub fn can_dissolve_group(members: &[GroupMember]) -> bool {
    accepted_member_count(members) <= 1
}

/// Expiry timestamp for a fresh invitation.
pub fn invitation_expiry(expires_in_seconds: u64) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(expires_in_seconds as i64)
}

/// Expiry is advisory at rest; it is consulted here, at accept time, and
/// nowhere else.
pub fn is_invitation_expired(invitation: &Invitation) -> bool {
    match invitation.expires_at {
        Some(expires_at) => expires_at < Utc::now(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitbook_core::InvitationStatus;

    fn member(user_id: &str, role: GroupRole, status: MemberStatus) -> GroupMember {
        GroupMember {
            id: format!("m-{user_id}"),
            group_id: "g1".to_string(),
            user_id: user_id.to_string(),
            role,
            status,
            joined_at: Utc::now(),
        }
    }

    fn admin(user_id: &str) -> GroupMember {
        member(user_id, GroupRole::Admin, MemberStatus::Accepted)
    }

    fn plain(user_id: &str) -> GroupMember {
        member(user_id, GroupRole::Member, MemberStatus::Accepted)
    }

    #[test]
    fn test_sole_admin_alone_may_leave() {
        let members = vec![admin("u1")];
        assert!(can_downgrade_or_remove(&members, "u1"));
        assert!(can_dissolve_group(&members));
    }

    #[test]
    fn test_sole_admin_with_other_members_is_protected() {
        let members = vec![admin("u1"), plain("u2")];
        assert!(!can_downgrade_or_remove(&members, "u1"));
        assert!(!can_dissolve_group(&members));
    }

    #[test]
    fn test_second_admin_releases_the_protection() {
        let members = vec![admin("u1"), admin("u2"), plain("u3")];
        assert!(can_downgrade_or_remove(&members, "u1"));
        assert!(can_downgrade_or_remove(&members, "u2"));
    }

    #[test]
    fn test_plain_members_are_always_removable() {
        let members = vec![admin("u1"), plain("u2")];
        assert!(can_downgrade_or_remove(&members, "u2"));
    }

    #[test]
    fn test_unknown_target_is_not_protected() {
        let members = vec![admin("u1")];
        assert!(can_downgrade_or_remove(&members, "stranger"));
    }

    #[test]
    fn test_pending_rows_do_not_count() {
        // A pending seat is not a second member yet.
        let members = vec![
            admin("u1"),
            member("u2", GroupRole::Member, MemberStatus::Pending),
        ];
        assert_eq!(accepted_member_count(&members), 1);
        assert!(can_downgrade_or_remove(&members, "u1"));
        assert!(can_dissolve_group(&members));
    }

    #[test]
    fn test_can_modify_group_requires_accepted_admin() {
        assert!(can_modify_group(&admin("u1")));
        assert!(!can_modify_group(&plain("u1")));
        assert!(!can_modify_group(&member(
            "u1",
            GroupRole::Admin,
            MemberStatus::Pending
        )));
    }

    fn invitation(expires_at: Option<DateTime<Utc>>) -> Invitation {
        Invitation {
            id: "i1".to_string(),
            group_id: "g1".to_string(),
            user_id: "u2".to_string(),
            inviter_id: "u1".to_string(),
            status: InvitationStatus::Pending,
            created_at: Utc::now(),
            expires_at,
        }
    }

    #[test]
    fn test_future_expiry_is_not_expired() {
        let inv = invitation(Some(Utc::now() + Duration::hours(1)));
        assert!(!is_invitation_expired(&inv));
    }

    #[test]
    fn test_past_expiry_is_expired() {
        let inv = invitation(Some(Utc::now() - Duration::hours(1)));
        assert!(is_invitation_expired(&inv));
    }

    #[test]
    fn test_missing_expiry_never_expires() {
        let inv = invitation(None);
        assert!(!is_invitation_expired(&inv));
    }

    #[test]
    fn test_invitation_expiry_lands_in_the_future() {
        let expiry = invitation_expiry(3600);
        assert!(expiry > Utc::now());
        assert!(expiry <= Utc::now() + Duration::seconds(3660));
    }
}
