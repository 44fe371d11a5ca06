// Configuration for a splitbook instance.

use crate::logger::LoggerConfig;

/// Top-level configuration passed to `SplitbookContext::new` alongside the
/// storage adapter.
#[derive(Debug, Clone)]
pub struct SplitbookOptions {
    /// Application name, used in log output and seed metadata.
    pub app_name: String,

    /// Logger configuration.
    pub logger: LoggerConfig,

    /// Group and invitation behavior.
    pub group: GroupOptions,
}

impl Default for SplitbookOptions {
    fn default() -> Self {
        Self {
            app_name: "splitbook".to_string(),
            logger: LoggerConfig::default(),
            group: GroupOptions::default(),
        }
    }
}

impl SplitbookOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    pub fn logger(mut self, config: LoggerConfig) -> Self {
        self.logger = config;
        self
    }

    pub fn group(mut self, options: GroupOptions) -> Self {
        self.group = options;
        self
    }
}

/// Group and invitation options.
#[derive(Debug, Clone)]
pub struct GroupOptions {
    /// Whether users may create groups (default: true).
    pub allow_user_to_create_group: bool,
    /// Maximum number of groups a user can create (default: 10).
    pub group_limit: usize,
    /// Maximum number of members per group, counting accepted members and
    /// pending invitations (default: 100).
    pub members_limit: usize,
    /// Invitation expiry in seconds (default: 48 hours).
    pub invitation_expires_in: u64,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            allow_user_to_create_group: true,
            group_limit: 10,
            members_limit: 100,
            invitation_expires_in: DEFAULT_INVITATION_EXPIRY,
        }
    }
}

/// Default invitation expiry in seconds (48 hours).
pub const DEFAULT_INVITATION_EXPIRY: u64 = 48 * 60 * 60;
