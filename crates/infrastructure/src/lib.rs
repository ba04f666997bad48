pub mod database;
pub mod storage;

pub use database::sqlite::SqliteTaskStore;
pub use storage::{provision_storage, sqlite_url};
