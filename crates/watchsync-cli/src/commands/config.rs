use crate::output::{Output, OutputFormat};
use crate::ConfigCommands;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use watchsync_config::{Config, PathManager};

pub async fn run_config(cmd: ConfigCommands, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();

    match cmd {
        ConfigCommands::Show => show_config(&path_manager, output),
        ConfigCommands::Init { force } => init_config(&path_manager, force, output),
    }
}

fn show_config(path_manager: &PathManager, output: &Output) -> Result<()> {
    let config_file = path_manager.config_file();
    if !config_file.exists() {
        output.warn(format!(
            "No configuration file at {}. Run 'watchsync config init' to create one.",
            config_file.display()
        ));
        return Ok(());
    }

    let config = Config::load_from_file(&config_file)
        .map_err(|e| eyre!("Failed to load {}: {}", config_file.display(), e))?;

    match output.format() {
        OutputFormat::Human => {
            output.println(format!("Configuration: {}", config_file.display()));
            output.println("");
            output.println(format!("  remote.enabled             {}", config.remote.enabled));
            output.println(format!(
                "  remote.service_name        {}",
                config.remote.service_name
            ));
            output.println(format!(
                "  sync.sync_collection       {}",
                config.sync.sync_collection
            ));
            output.println(format!(
                "  sync.sync_watched          {}",
                config.sync.sync_watched
            ));
            output.println(format!(
                "  sync.cleanup_remote_collection  {}",
                config.sync.cleanup_remote_collection
            ));
            output.println(format!(
                "  sync.exclude_now_playing   {}",
                config.sync.exclude_now_playing
            ));
            match &config.scheduler {
                Some(scheduler) => {
                    output.println(format!("  scheduler.schedule         {}", scheduler.schedule));
                    output.println(format!(
                        "  scheduler.run_on_startup   {}",
                        scheduler.run_on_startup
                    ));
                }
                None => output.println("  scheduler                  disabled"),
            }
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            output.json(&serde_json::to_value(&config)?);
        }
    }

    Ok(())
}

fn init_config(path_manager: &PathManager, force: bool, output: &Output) -> Result<()> {
    let config_file = path_manager.config_file();
    if config_file.exists() && !force {
        output.error(format!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_file.display()
        ));
        return Ok(());
    }

    path_manager
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create application directories: {}", e))?;

    let config = Config::default();
    config
        .save_to_file(&config_file)
        .map_err(|e| eyre!("Failed to write {}: {}", config_file.display(), e))?;
    output.success(format!("Wrote default configuration: {}", config_file.display()));
    Ok(())
}
