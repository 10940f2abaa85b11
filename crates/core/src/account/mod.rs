//! User accounts and login sessions.

mod password;
mod sqlite_store;
mod store;
mod types;

pub use password::{hash_password, verify_password};
pub use sqlite_store::SqliteAccountStore;
pub use store::{AccountError, AccountStore};
pub use types::*;
