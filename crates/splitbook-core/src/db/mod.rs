pub mod adapter;
pub mod models;
pub mod schema;

pub use adapter::Adapter;
pub use models::{Category, Entry, Group, GroupMember, Invitation, User};
pub use schema::{AppSchema, AppTable, FieldType, SchemaField};
