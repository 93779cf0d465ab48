//! Storage-root resolution for syncstore
//!
//! Resolution order for the cache root:
//! ```text
//! 1. $SYNCSTORE_ROOT                      # explicit override
//! 2. shared container (persisted pref)    # application-group container
//! 3. <platform cache dir>/syncstore       # private cache directory
//! 4. ./syncstore_data                     # last resort
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable that overrides the cache root.
pub const ENV_ROOT: &str = "SYNCSTORE_ROOT";

/// Folder created under the platform cache directory.
const CACHE_FOLDER: &str = "syncstore";

#[derive(Serialize, Deserialize, Debug, Default)]
struct RootPreferences {
    #[serde(default)]
    shared_container: Option<PathBuf>,
}

/// Get the global preferences path
fn get_preferences_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CACHE_FOLDER).join("config.json"))
}

/// Load the shared container root the hosting app configured, if any
pub fn load_shared_container() -> Option<PathBuf> {
    load_shared_container_from(&get_preferences_path()?)
}

/// Load the shared container root from an explicit preferences file
pub fn load_shared_container_from(path: &Path) -> Option<PathBuf> {
    if !path.exists() {
        return None;
    }

    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<RootPreferences>(&content) {
            Ok(prefs) => prefs.shared_container,
            Err(e) => {
                warn!("Failed to parse preferences at {:?}: {}", path, e);
                None
            }
        },
        Err(e) => {
            warn!("Failed to read preferences at {:?}: {}", path, e);
            None
        }
    }
}

/// Persist a shared container root so later processes prefer it
pub fn save_shared_container(container: PathBuf) -> anyhow::Result<()> {
    let path = get_preferences_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config dir"))?;
    save_shared_container_to(&path, container)
}

/// Persist a shared container root to an explicit preferences file
pub fn save_shared_container_to(path: &Path, container: PathBuf) -> anyhow::Result<()> {
    ensure_parent(path)?;

    let prefs = RootPreferences {
        shared_container: Some(container),
    };
    let json = serde_json::to_string_pretty(&prefs)?;
    fs::write(path, json)?;
    Ok(())
}

/// Get the cache root from environment, shared container, or platform cache dir
pub fn cache_root() -> PathBuf {
    if let Ok(val) = std::env::var(ENV_ROOT) {
        if !val.trim().is_empty() {
            return PathBuf::from(val);
        }
    }

    if let Some(container) = load_shared_container() {
        return container;
    }

    match dirs::cache_dir() {
        Some(dir) => dir.join(CACHE_FOLDER),
        None => PathBuf::from("syncstore_data"),
    }
}

/// Ensure a single directory exists
pub fn ensure_dir(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
        info!("Created directory: {:?}", path);
    }
    Ok(())
}

/// Ensure a file's parent directory exists
pub fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }
    Ok(())
}
