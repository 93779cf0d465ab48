use crate::error::{Result, StoreError};
use crate::identity::StoreIdentity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StoreConfig {
    /// Explicit storage root; wins over every other source
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Application-group container shared with extension processes
    #[serde(default)]
    pub shared_container: Option<PathBuf>,
    #[serde(default = "default_folder_name")]
    pub folder_name: String,
    #[serde(default = "default_file_name")]
    pub file_name: String,
    /// Pretty-print persisted snapshots
    #[serde(default)]
    pub pretty: bool,
}

fn default_folder_name() -> String {
    "SyncResponse".to_string()
}

fn default_file_name() -> String {
    "syncResponse".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: None,
            shared_container: None,
            folder_name: default_folder_name(),
            file_name: default_file_name(),
            pretty: false,
        }
    }
}

impl StoreConfig {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            ..Self::default()
        }
    }

    /// Load a config file, falling back to defaults when it is missing or unreadable.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(StoreConfig::default());
        }

        let content = fs::read_to_string(path).await?;

        if content.trim().is_empty() {
            tracing::warn!("Config file {:?} is empty, using default config", path);
            return Ok(StoreConfig::default());
        }

        let config: StoreConfig = match serde_json::from_str(&content) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(
                    "Failed to parse config {:?} ({}), using default. File may be corrupted.",
                    path,
                    e
                );
                return Ok(StoreConfig::default());
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("folder_name", &self.folder_name), ("file_name", &self.file_name)] {
            if value.is_empty() {
                return Err(StoreError::Config(format!("{} must not be empty", field)));
            }
            if value.contains(['/', '\\']) || value == "." || value == ".." {
                return Err(StoreError::Config(format!(
                    "{} must be a single path component, got {:?}",
                    field, value
                )));
            }
        }
        Ok(())
    }

    /// Explicit root, then the shared container, then the platform cache root.
    pub fn resolve_root(&self) -> PathBuf {
        if let Some(root) = &self.root {
            return root.clone();
        }
        if let Some(container) = &self.shared_container {
            return container.clone();
        }
        syncstore_common::cache_root()
    }

    /// `<root>/<folder_name>/<identity>/<file_name>`
    pub fn snapshot_path(&self, identity: &StoreIdentity) -> PathBuf {
        self.resolve_root()
            .join(&self.folder_name)
            .join(identity.dir_name())
            .join(&self.file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_snapshot_path_layout() {
        let config = StoreConfig::with_root("/cache");
        let id = StoreIdentity::new("@alice:example.org").unwrap();
        assert_eq!(
            config.snapshot_path(&id),
            PathBuf::from("/cache/SyncResponse/@alice:example.org/syncResponse")
        );
    }

    #[test]
    fn test_shared_container_preferred_over_cache() {
        let config = StoreConfig {
            shared_container: Some(PathBuf::from("/group")),
            ..StoreConfig::default()
        };
        assert_eq!(config.resolve_root(), PathBuf::from("/group"));

        let explicit = StoreConfig {
            root: Some(PathBuf::from("/explicit")),
            ..config
        };
        assert_eq!(explicit.resolve_root(), PathBuf::from("/explicit"));
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        let mut config = StoreConfig::default();
        assert!(config.validate().is_ok());

        config.file_name = "a/b".to_string();
        assert!(matches!(config.validate(), Err(StoreError::Config(_))));

        config.file_name = String::new();
        assert!(matches!(config.validate(), Err(StoreError::Config(_))));

        let parent = StoreConfig {
            folder_name: "..".to_string(),
            ..StoreConfig::default()
        };
        assert!(matches!(parent.validate(), Err(StoreError::Config(_))));
    }

    #[tokio::test]
    async fn test_load_missing_file_gives_default() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::load(&dir.path().join("missing.json")).await.unwrap();
        assert_eq!(config, StoreConfig::default());
    }

    #[tokio::test]
    async fn test_load_corrupt_file_gives_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{{{").unwrap();
        let config = StoreConfig::load(&path).await.unwrap();
        assert_eq!(config, StoreConfig::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conf").join("store.json");
        let config = StoreConfig {
            root: Some(dir.path().to_path_buf()),
            pretty: true,
            ..StoreConfig::default()
        };
        config.save(&path).await.unwrap();
        assert_eq!(StoreConfig::load(&path).await.unwrap(), config);
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"pretty": true}"#).unwrap();
        let config = StoreConfig::load(&path).await.unwrap();
        assert!(config.pretty);
        assert_eq!(config.folder_name, "SyncResponse");
        assert_eq!(config.file_name, "syncResponse");
    }
}
