//! SQLite-backed store for projects, locations, samples and laboratory data.
//!
//! One `Database` wraps a single connection behind a mutex; every public
//! operation takes the lock for its own duration, so calls are serialised.

pub(crate) mod abbreviations;
mod locations;
mod projects;
mod records;
mod samples;
pub(crate) mod schema;
pub(crate) mod trials;

use crate::utils::error::{GeostorError, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

impl Database {
    /// Opens (or creates) the database file and ensures the schema exists.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        let db = Self::from_connection(conn, Some(db_path.to_path_buf()))?;
        tracing::debug!("Opened database {}", db_path.display());
        Ok(db)
    }

    /// Opens an existing database without creating anything.
    pub fn open_existing(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if !db_path.exists() {
            return Err(GeostorError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Database file not found: {}", db_path.display()),
            )));
        }
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(db_path.to_path_buf()),
        })
    }

    /// In-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None)
    }

    /// Creates a fresh database at `db_path`.
    ///
    /// An existing file is refused unless `force` is set, in which case every
    /// geostor table is dropped and recreated.
    pub fn initialize(db_path: impl AsRef<Path>, force: bool) -> Result<Self> {
        let db_path = db_path.as_ref();
        let existed = db_path.exists();
        if existed && !force {
            return Err(GeostorError::conflict(format!(
                "A database already exists at '{}'",
                db_path.display()
            )));
        }

        let db = Self::open(db_path)?;
        if existed {
            tracing::warn!("Recreating all tables in {}", db_path.display());
            let conn = db.lock();
            conn.execute_batch(schema::DROP_SCHEMA)?;
            conn.execute_batch(schema::CREATE_SCHEMA)?;
        }
        tracing::info!("Database created successfully at '{}'", db_path.display());
        Ok(db)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(schema::CREATE_SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Checks that the tables and columns used by the analysis are present.
    pub fn verify_schema(&self) -> Result<()> {
        schema::verify(&self.lock())
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
