// Adapters layer: concrete implementations for external systems (SQLite, local files).

pub mod local_storage;
pub mod sqlite;

pub use local_storage::LocalStorage;
pub use sqlite::Database;
