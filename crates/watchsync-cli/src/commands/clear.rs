use crate::output::Output;
use color_eyre::eyre::{eyre, Context};
use color_eyre::Result;
use std::fs;
use watchsync_config::PathManager;
use watchsync_core::RegistryStore;

pub async fn run_clear(all: bool, registries: bool, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();

    if all {
        let state_dir = path_manager.state_dir();
        if state_dir.exists() {
            fs::remove_dir_all(&state_dir).with_context(|| {
                format!("Failed to remove state directory {}", state_dir.display())
            })?;
            output.success(format!("Cleared state directory: {}", state_dir.display()));
        } else {
            output.info("No state directory found to clear");
        }
        return Ok(());
    }

    if registries {
        let store = RegistryStore::new(&path_manager)
            .map_err(|e| eyre!("Failed to open state directory: {}", e))?;
        store
            .clear()
            .map_err(|e| eyre!("Failed to clear registries: {}", e))?;
        output.success("Cleared skip and already-exists registries");
        return Ok(());
    }

    output.warn("No clear option specified. Use --registries or --all");
    output.println("\nExample: watchsync clear --registries");
    Ok(())
}
