pub mod manager;
pub mod models;
pub mod users;

pub use manager::{Database, DatabaseError};
pub use models::{NewUser, User};
pub use users::{find_or_create_user, PgUserStore, UserLookup, UserStore};
