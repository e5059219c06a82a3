use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub sync: SyncOptions,
    #[serde(default)]
    pub scheduler: Option<SchedulerConfig>,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RemoteConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Display name of the tracking service, used in logs and summaries.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            service_name: default_service_name(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SyncOptions {
    #[serde(default = "default_true")]
    pub sync_collection: bool,
    #[serde(default = "default_true")]
    pub sync_watched: bool,
    /// Remove remote collection entries no longer present locally.
    /// Off by default: clean-up is destructive on false positives.
    #[serde(default)]
    pub cleanup_remote_collection: bool,
    /// Keep the currently-playing item out of background mark-seen pushes.
    #[serde(default = "default_true")]
    pub exclude_now_playing: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            sync_collection: true,
            sync_watched: true,
            cleanup_remote_collection: false,
            exclude_now_playing: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SchedulerConfig {
    #[serde(default = "default_schedule")]
    pub schedule: String,
    #[serde(default = "default_true")]
    pub run_on_startup: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json_logging")]
    pub json: bool,
    pub file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_service_name() -> String {
    "tracker".to_string()
}

fn default_schedule() -> String {
    // Every hour, offset from the top to avoid service-side rush
    "0 10 * * * *".to_string()
}

pub fn default_scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        schedule: default_schedule(),
        run_on_startup: default_true(),
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json_logging() -> bool {
    use std::io::IsTerminal;
    !std::io::stdout().is_terminal()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            sync: SyncOptions::default(),
            scheduler: Some(default_scheduler_config()),
            logging: None,
        }
    }
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.remote.service_name.trim().is_empty() {
            return Err(anyhow::anyhow!("remote.service_name cannot be empty"));
        }
        if let Some(ref scheduler) = self.scheduler {
            if scheduler.schedule.trim().is_empty() {
                return Err(anyhow::anyhow!("scheduler.schedule cannot be empty"));
            }
        }
        if self.sync.cleanup_remote_collection && !self.sync.sync_collection {
            return Err(anyhow::anyhow!(
                "cleanup_remote_collection requires sync_collection to be enabled"
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_load_and_save() {
        let file = NamedTempFile::new().unwrap();
        let config = Config {
            remote: RemoteConfig {
                enabled: true,
                service_name: "trakt".to_string(),
            },
            sync: SyncOptions {
                sync_collection: true,
                sync_watched: true,
                cleanup_remote_collection: true,
                exclude_now_playing: true,
            },
            scheduler: Some(default_scheduler_config()),
            logging: None,
        };

        let path = file.path().to_path_buf();
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.remote.service_name, "trakt");
        assert!(loaded.sync.cleanup_remote_collection);
        assert!(loaded.scheduler.is_some());
    }

    #[test]
    fn test_defaults_are_conservative() {
        let config = Config::default();
        assert!(config.sync.sync_collection);
        assert!(config.sync.sync_watched);
        // Clean-up must be opt-in
        assert!(!config.sync.cleanup_remote_collection);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_cleanup_without_collection_sync() {
        let config = Config {
            sync: SyncOptions {
                sync_collection: false,
                cleanup_remote_collection: true,
                ..SyncOptions::default()
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
