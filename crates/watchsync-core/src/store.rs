use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use watchsync_config::PathManager;

use crate::registry::{AlreadyExistsRegistry, SkipRegistry};

/// Durable storage for the two registries and the registered-source count.
///
/// Everything is pretty-printed JSON under the state directory; a corrupt
/// file is deleted and replaced with defaults rather than failing the
/// engine.
#[derive(Clone)]
pub struct RegistryStore {
    state_dir: PathBuf,
}

impl RegistryStore {
    pub fn new(path_manager: &PathManager) -> Result<Self> {
        let state_dir = path_manager.state_dir();
        std::fs::create_dir_all(&state_dir)?;
        Ok(Self { state_dir })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.state_dir.join(format!("{}.json", name))
    }

    pub fn load_skip(&self) -> SkipRegistry {
        self.load_or_default("skip_registry")
    }

    pub fn save_skip(&self, registry: &SkipRegistry) -> Result<()> {
        self.save("skip_registry", registry)
    }

    pub fn load_already_exists(&self) -> AlreadyExistsRegistry {
        self.load_or_default("already_exists")
    }

    pub fn save_already_exists(&self, registry: &AlreadyExistsRegistry) -> Result<()> {
        self.save("already_exists", registry)
    }

    pub fn load_source_count(&self) -> usize {
        let count: Option<usize> = self.load_optional("source_count");
        count.unwrap_or(1)
    }

    pub fn save_source_count(&self, count: usize) -> Result<()> {
        self.save("source_count", &count)
    }

    pub fn clear(&self) -> Result<()> {
        for name in ["skip_registry", "already_exists", "source_count"] {
            let path = self.path(name);
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
        }
        info!("Cleared registry state directory: {:?}", self.state_dir);
        Ok(())
    }

    fn load_or_default<T>(&self, name: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        self.load_optional(name).unwrap_or_default()
    }

    fn load_optional<T>(&self, name: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let path = self.path(name);
        if !path.exists() {
            debug!("State miss: {} (file does not exist)", name);
            return None;
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<T>(&content) {
                Ok(value) => {
                    debug!("State loaded: {}", name);
                    Some(value)
                }
                Err(e) => {
                    warn!(
                        "State corruption detected for {}: {}. Deleting corrupted file.",
                        name, e
                    );
                    if let Err(rm_err) = std::fs::remove_file(&path) {
                        warn!("Failed to delete corrupted state file: {}", rm_err);
                    }
                    None
                }
            },
            Err(e) => {
                warn!("Failed to read state file {}: {}", name, e);
                None
            }
        }
    }

    fn save<T>(&self, name: &str, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        let path = self.path(name);
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| anyhow!("Failed to serialize state {}: {}", name, e))?;
        std::fs::write(&path, json).map_err(|e| anyhow!("Failed to write state {}: {}", name, e))?;
        debug!("State saved: {}", name);
        Ok(())
    }
}
