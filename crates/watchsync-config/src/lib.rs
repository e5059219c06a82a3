pub mod config;
pub mod paths;

pub use config::{
    default_scheduler_config, Config, LoggingConfig, RemoteConfig, SchedulerConfig, SyncOptions,
};
pub use paths::{container_base_path, PathManager};
