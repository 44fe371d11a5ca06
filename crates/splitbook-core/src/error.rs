// Error taxonomy for splitbook operations.
//
// Every operation returns a typed failure: a stable machine code plus the
// kind it belongs to. Errors are per-request outcomes, never process-fatal.

use std::fmt;

use serde::{Deserialize, Serialize};

/// All machine-readable error codes emitted by splitbook operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Groups and memberships
    GroupNotFound,
    GroupNameRequired,
    GroupCreationDisabled,
    GroupLimitReached,
    NotAMember,
    AdminRoleRequired,
    MemberNotFound,
    AlreadyAMember,
    MemberLimitReached,
    CannotRemoveYourself,
    CannotChangeYourOwnRole,
    LastAdminProtected,
    GroupStillHasMembers,
    InvalidRole,

    // Invitations
    InvitationNotFound,
    InvitationAlreadyPending,
    InvitationExpired,
    CannotInviteYourself,

    // Users and account deletion
    UserNotFound,
    UsernameRequired,
    UsernameTaken,
    ActiveGroupMembership,
    OwnsActiveGroups,

    // Ledger
    CategoryNotFound,
    CategoryNameRequired,
    CategoryNameTaken,
    CategoryInUse,
    EntryNotFound,
    InvalidAmount,
    InvalidEntryKind,
    InvalidDate,

    // Generic
    RecordNotFound,
    DuplicateRecord,
    InternalServerError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::GroupNotFound => "Group not found",
            Self::GroupNameRequired => "Group name is required",
            Self::GroupCreationDisabled => "Group creation is disabled",
            Self::GroupLimitReached => "You have reached the maximum number of groups",
            Self::NotAMember => "You are not a member of this group",
            Self::AdminRoleRequired => "You must be a group admin to perform this action",
            Self::MemberNotFound => "Member not found",
            Self::AlreadyAMember => "User is already a member of this group",
            Self::MemberLimitReached => "Group member limit reached",
            Self::CannotRemoveYourself => "You cannot remove yourself, use leave instead",
            Self::CannotChangeYourOwnRole => "You cannot change your own role",
            Self::LastAdminProtected => {
                "Cannot remove the last admin while other members remain"
            }
            Self::GroupStillHasMembers => {
                "Cannot dissolve a group that still has other members"
            }
            Self::InvalidRole => "Invalid role value",
            Self::InvitationNotFound => "Invitation not found",
            Self::InvitationAlreadyPending => {
                "An invitation for this user is already pending"
            }
            Self::InvitationExpired => "Invitation has expired",
            Self::CannotInviteYourself => "You cannot invite yourself",
            Self::UserNotFound => "User not found",
            Self::UsernameRequired => "Username is required",
            Self::UsernameTaken => "Username already exists",
            Self::ActiveGroupMembership => "Account has active group memberships",
            Self::OwnsActiveGroups => "Account still owns groups that must be dissolved",
            Self::CategoryNotFound => "Category not found",
            Self::CategoryNameRequired => "Category name and kind are required",
            Self::CategoryNameTaken => "A category with this name already exists",
            Self::CategoryInUse => "Cannot delete a category with recorded entries",
            Self::EntryNotFound => "Entry not found",
            Self::InvalidAmount => "Amount must be a positive number",
            Self::InvalidEntryKind => "Invalid entry kind",
            Self::InvalidDate => "Invalid date, expected YYYY-MM-DD",
            Self::RecordNotFound => "Record not found",
            Self::DuplicateRecord => "Duplicate record",
            Self::InternalServerError => "Internal server error",
        };
        write!(f, "{msg}")
    }
}

/// The failure classes an operation can report.
///
/// Every [`ApiError`] belongs to exactly one kind; the out-of-scope API
/// surface maps kinds to HTTP statuses via [`ErrorKind::http_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Referenced group/membership/invitation/user does not exist or is not
    /// visible to the actor.
    NotFound,
    /// Actor lacks the required role, or targets self where that is disallowed.
    Forbidden,
    /// Duplicate membership, duplicate pending invitation, or a race loser
    /// on a unique constraint.
    Conflict,
    /// The action would strip a group's last administrator while other
    /// accepted members remain.
    InvariantViolation,
    /// Malformed input (unknown enum value, missing required field).
    Validation,
    /// Unexpected storage or serialization failure.
    Internal,
}

impl ErrorKind {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::Forbidden => 403,
            Self::Conflict | Self::InvariantViolation => 409,
            Self::Validation => 400,
            Self::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::Conflict => "conflict",
            Self::InvariantViolation => "invariant_violation",
            Self::Validation => "validation",
            Self::Internal => "internal",
        };
        write!(f, "{name}")
    }
}

/// Typed operation failure: kind + code + human-readable message.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} {code:?}: {message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, code: ErrorCode) -> Self {
        Self {
            message: code.to_string(),
            kind,
            code,
        }
    }

    pub fn with_message(kind: ErrorKind, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
        }
    }

    pub fn not_found(code: ErrorCode) -> Self {
        Self::new(ErrorKind::NotFound, code)
    }

    pub fn forbidden(code: ErrorCode) -> Self {
        Self::new(ErrorKind::Forbidden, code)
    }

    pub fn conflict(code: ErrorCode) -> Self {
        Self::new(ErrorKind::Conflict, code)
    }

    pub fn invariant(code: ErrorCode) -> Self {
        Self::new(ErrorKind::InvariantViolation, code)
    }

    pub fn validation(code: ErrorCode) -> Self {
        Self::new(ErrorKind::Validation, code)
    }

    pub fn internal(code: ErrorCode) -> Self {
        Self::new(ErrorKind::Internal, code)
    }

    /// Build a JSON body for the error response.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "kind": self.kind,
            "code": self.code,
            "message": self.message,
        })
    }
}

/// Internal (non-operation) error: configuration, storage, serialization.
#[derive(Debug, thiserror::Error)]
pub enum SplitbookError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Unified result type for splitbook operations.
pub type Result<T> = std::result::Result<T, SplitbookError>;
