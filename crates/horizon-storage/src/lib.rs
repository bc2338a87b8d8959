//! Event Horizon Storage - project persistence on top of redb.
//!
//! Projects are kept in a single table, `event-horizon-projects`, keyed by
//! project id with JSON-encoded values. The streaming core never touches this
//! crate; callers persist the finalized turn content and extracted code.

pub mod paths;
pub mod project;
mod simple_storage;

use anyhow::Result;
use redb::Database;
use std::path::Path;
use std::sync::Arc;

pub use project::ProjectStorage;
pub use simple_storage::SimpleStorage;

/// Central storage handle
pub struct Storage {
    db: Arc<Database>,
    pub projects: ProjectStorage,
}

impl Storage {
    /// Open (or create) the database at `path` and initialize its tables.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Arc::new(Database::create(path)?);
        let projects = ProjectStorage::new(db.clone())?;
        tracing::debug!(path = %path.display(), "Opened project database");

        Ok(Self { db, projects })
    }

    pub fn db(&self) -> Arc<Database> {
        self.db.clone()
    }
}
