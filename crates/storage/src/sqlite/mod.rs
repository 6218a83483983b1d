mod database;
mod record_repo;

pub use database::{Database, DatabaseConfig, PurgeStats};
pub use record_repo::SqliteRecordStore;
