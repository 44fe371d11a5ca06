// Owner-scoped ledger: categories and entries.

pub mod categories;
pub mod entries;

pub use categories::{
    handle_create_category, handle_delete_category, handle_list_categories,
    handle_update_category, seed_default_categories, DEFAULT_CATEGORIES,
};
pub use entries::{
    handle_create_entry, handle_delete_entry, handle_list_entries, handle_update_entry,
};
