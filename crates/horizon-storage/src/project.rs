//! Project storage - typed access to the `event-horizon-projects` table.

use anyhow::{Context, Result};
use horizon_models::Project;
use redb::{Database, TableDefinition};
use std::sync::Arc;

use crate::SimpleStorage;

const PROJECTS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("event-horizon-projects");

#[derive(Debug, Clone)]
pub struct ProjectStorage {
    db: Arc<Database>,
}

impl SimpleStorage for ProjectStorage {
    const TABLE: TableDefinition<'static, &'static str, &'static [u8]> = PROJECTS_TABLE;

    fn db(&self) -> &Arc<Database> {
        &self.db
    }
}

impl ProjectStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let storage = Self { db };
        storage.init_table()?;
        Ok(storage)
    }

    /// Insert or replace a project.
    pub fn save(&self, project: &Project) -> Result<()> {
        let data = serde_json::to_vec(project)?;
        self.put_raw(&project.id, &data)
    }

    pub fn get(&self, id: &str) -> Result<Option<Project>> {
        match self.get_raw(id)? {
            Some(data) => {
                let project = serde_json::from_slice(&data)
                    .with_context(|| format!("Corrupt project record: {id}"))?;
                Ok(Some(project))
            }
            None => Ok(None),
        }
    }

    /// All projects, most recently updated first. Undecodable records are
    /// skipped with a warning.
    pub fn list(&self) -> Result<Vec<Project>> {
        let mut projects: Vec<Project> = self
            .list_raw()?
            .into_iter()
            .filter_map(|(id, data)| match serde_json::from_slice(&data) {
                Ok(project) => Some(project),
                Err(err) => {
                    tracing::warn!(project_id = %id, error = %err, "Skipping corrupt project record");
                    None
                }
            })
            .collect();
        projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(projects)
    }

    /// Resolve a full id from a unique prefix.
    pub fn resolve_id(&self, prefix: &str) -> Result<Option<String>> {
        if self.exists(prefix)? {
            return Ok(Some(prefix.to_string()));
        }

        let matches: Vec<String> = self
            .list_raw()?
            .into_iter()
            .map(|(id, _)| id)
            .filter(|id| id.starts_with(prefix))
            .collect();

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.into_iter().next()),
            n => anyhow::bail!("Ambiguous project id '{prefix}' matches {n} projects"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_models::Message;
    use tempfile::tempdir;

    fn storage() -> (tempfile::TempDir, ProjectStorage) {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(Database::create(db_path).unwrap());
        (temp_dir, ProjectStorage::new(db).unwrap())
    }

    #[test]
    fn test_save_and_get() {
        let (_dir, storage) = storage();
        let mut project = Project::new("Landing");
        project.push_message(Message::user("hero section please"));

        storage.save(&project).unwrap();

        let loaded = storage.get(&project.id).unwrap().unwrap();
        assert_eq!(loaded, project);
        assert!(storage.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_list_sorted_by_updated_at() {
        let (_dir, storage) = storage();
        let mut older = Project::new("Older");
        older.updated_at = 1_000;
        let mut newer = Project::new("Newer");
        newer.updated_at = 2_000;

        storage.save(&older).unwrap();
        storage.save(&newer).unwrap();

        let names: Vec<String> = storage.list().unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Newer", "Older"]);
        assert_eq!(storage.count().unwrap(), 2);
    }

    #[test]
    fn test_list_skips_corrupt_records() {
        let (_dir, storage) = storage();
        storage.save(&Project::new("Good")).unwrap();
        storage.put_raw("broken", b"not json").unwrap();

        let projects = storage.list().unwrap();
        assert_eq!(projects.len(), 1);
        assert!(storage.get("broken").is_err());
    }

    #[test]
    fn test_delete() {
        let (_dir, storage) = storage();
        let project = Project::new("Temp");
        storage.save(&project).unwrap();

        assert!(storage.delete(&project.id).unwrap());
        assert!(!storage.delete(&project.id).unwrap());
        assert!(!storage.exists(&project.id).unwrap());
    }

    #[test]
    fn test_resolve_id_prefix() {
        let (_dir, storage) = storage();
        let mut first = Project::new("First");
        first.id = "abc123".to_string();
        let mut second = Project::new("Second");
        second.id = "abd456".to_string();
        storage.save(&first).unwrap();
        storage.save(&second).unwrap();

        assert_eq!(storage.resolve_id("abc").unwrap().as_deref(), Some("abc123"));
        assert_eq!(storage.resolve_id("abd456").unwrap().as_deref(), Some("abd456"));
        assert!(storage.resolve_id("zzz").unwrap().is_none());
        assert!(storage.resolve_id("ab").is_err());
    }
}
