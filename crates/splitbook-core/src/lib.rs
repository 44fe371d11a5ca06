#![doc = include_str!("../README.md")]

pub mod db;
pub mod error;
pub mod logger;
pub mod options;
pub mod utils;

// Re-exports for convenience
pub use db::adapter::{Adapter, TransactionAdapter};
pub use db::models::{Category, Entry, Group, GroupMember, Invitation, User};
pub use db::models::{EntryKind, GroupRole, InvitationStatus, MemberStatus};
pub use db::schema::AppSchema;
pub use error::{ApiError, ErrorCode, ErrorKind, SplitbookError};
pub use logger::{LogHandler, LogLevel, LoggerConfig, SplitbookLogger};
pub use options::{GroupOptions, SplitbookOptions};
pub use utils::generate_id;
