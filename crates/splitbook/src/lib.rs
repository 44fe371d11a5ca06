// splitbook — main library crate
//
// Wires together the context, the typed store layer, group membership and
// invitations, account management, and the ledger.

pub mod account;
pub mod context;
pub mod groups;
pub mod ledger;
pub mod store;

pub use context::SplitbookContext;
pub use store::StoreError;
