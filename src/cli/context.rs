//! Shared command context: config, catalog, cache, and the hydrated store.

use std::path::PathBuf;

use crate::cache::{FileCache, LocalCache};
use crate::catalog::{sample_catalog, Catalog};
use crate::comment::User;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fabric::{builtin_fabrics, find_fabric};
use crate::store::Store;

pub struct AppContext {
    pub config: Config,
    pub dir: PathBuf,
    pub catalog_path: PathBuf,
    pub cache: FileCache,
    pub store: Store,
}

impl AppContext {
    /// Load config, catalog, and cached state from the working directory.
    pub fn load(dir: Option<PathBuf>) -> Result<Self> {
        let dir = match dir {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };
        let config = Config::load_from_dir(&dir)?;

        let catalog_path = config.catalog_path(&dir);
        let catalog = if catalog_path.exists() {
            Catalog::load(&catalog_path)?
        } else {
            sample_catalog()
        };

        let mut store = Store::new(catalog, builtin_fabrics(), config.default_fabric.clone());
        store.upsert_user(User {
            id: config.user.id.clone(),
            display_name: config.user.display_name.clone(),
        });
        store.set_current_user(&config.user.id);

        let cache = FileCache::new(config.cache_path(&dir));
        if let Some(snapshot) = cache.load()? {
            store.load_snapshot(snapshot);
        }

        Ok(Self {
            config,
            dir,
            catalog_path,
            cache,
            store,
        })
    }

    /// Persist the current state to the snapshot cache.
    pub fn save_state(&mut self) -> Result<()> {
        let snapshot = self.store.snapshot();
        self.cache.store(&snapshot)
    }

    /// Persist the catalog after an append.
    pub fn save_catalog(&self) -> Result<()> {
        self.store.catalog().save(&self.catalog_path)
    }

    /// Resolve an optional fabric argument to a validated fabric id.
    pub fn resolve_fabric(&self, fabric: Option<String>) -> Result<String> {
        match fabric {
            Some(id) => {
                find_fabric(self.store.fabrics(), &id)
                    .ok_or_else(|| Error::UnknownFabric(id.clone()))?;
                Ok(id)
            }
            None => Ok(self.store.current_fabric().to_string()),
        }
    }

    /// Resolve a task reference: an exact task id, or a test-case id.
    pub fn resolve_task(&self, reference: &str) -> Result<String> {
        if let Some(task) = self.store.catalog().find_task(reference) {
            return Ok(task.id.clone());
        }
        if let Some(task) = self.store.catalog().find_task_by_tc(reference) {
            return Ok(task.id.clone());
        }
        Err(Error::UnknownTask(reference.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_defaults_in_empty_dir() {
        let temp = TempDir::new().unwrap();
        let ctx = AppContext::load(Some(temp.path().to_path_buf())).unwrap();
        assert_eq!(ctx.store.current_fabric(), "north-it");
        assert!(ctx.store.catalog().tasks().next().is_some());
    }

    #[test]
    fn state_round_trips_through_cache() {
        let temp = TempDir::new().unwrap();
        let mut ctx = AppContext::load(Some(temp.path().to_path_buf())).unwrap();
        let task_id = ctx.store.catalog().find_task_by_tc("TC-ACC-001").unwrap().id.clone();

        ctx.store.set_task_state("north-it", &task_id, true);
        ctx.save_state().unwrap();

        let reloaded = AppContext::load(Some(temp.path().to_path_buf())).unwrap();
        assert!(reloaded.store.state().task_checked("north-it", &task_id));
    }

    #[test]
    fn resolve_rejects_unknowns() {
        let temp = TempDir::new().unwrap();
        let ctx = AppContext::load(Some(temp.path().to_path_buf())).unwrap();

        assert!(matches!(
            ctx.resolve_fabric(Some("west-it".into())),
            Err(Error::UnknownFabric(_))
        ));
        assert!(matches!(
            ctx.resolve_task("task-nope"),
            Err(Error::UnknownTask(_))
        ));
        // A test-case id resolves to its owning task.
        assert!(ctx.resolve_task("TC-ACC-001").is_ok());
    }
}
