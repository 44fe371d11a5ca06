// Account provisioning and deletion.

pub mod deletion;
pub mod users;

pub use deletion::{can_delete_account, handle_delete_account};
pub use users::handle_create_user;
