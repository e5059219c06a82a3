use crate::output::{Output, OutputFormat};
use crate::RegistryCommands;
use chrono::Duration;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use serde_json::json;
use watchsync_config::PathManager;
use watchsync_core::{RegistryStore, SKIP_COOLDOWN_DAYS};

pub async fn run_registry(cmd: RegistryCommands, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    let store = RegistryStore::new(&path_manager)
        .map_err(|e| eyre!("Failed to open state directory: {}", e))?;

    match cmd {
        RegistryCommands::Show => show_registries(&store, output),
        RegistryCommands::Clear {
            skip,
            already_exists,
        } => clear_registries(&store, skip, already_exists, output),
    }
}

fn show_registries(store: &RegistryStore, output: &Output) -> Result<()> {
    let skip = store.load_skip();
    let already_exists = store.load_already_exists();

    if let OutputFormat::Json | OutputFormat::JsonPretty = output.format() {
        output.json(&json!({
            "skip": serde_json::to_value(&skip)?,
            "already_exists": serde_json::to_value(&already_exists)?,
        }));
        return Ok(());
    }

    if skip.is_empty() && already_exists.is_empty() {
        output.info("Both registries are empty");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Registry", "Title", "Year", "External id"]);
    for record in skip.records() {
        table.add_row(vec![
            Cell::new("skip"),
            Cell::new(&record.title),
            Cell::new(record.year.map_or(String::new(), |y| y.to_string())),
            Cell::new(record.external_id.as_deref().unwrap_or("-")),
        ]);
    }
    for record in already_exists.records() {
        table.add_row(vec![
            Cell::new("already-exists"),
            Cell::new(&record.title),
            Cell::new(record.year.map_or(String::new(), |y| y.to_string())),
            Cell::new(record.external_id.as_deref().unwrap_or("-")),
        ]);
    }
    output.println(table.to_string());

    if !skip.is_empty() {
        let retry_at = skip.last_skip_sync() + Duration::days(SKIP_COOLDOWN_DAYS);
        output.info(format!(
            "{} skipped item(s) retry after {}",
            skip.len(),
            retry_at.format("%Y-%m-%d %H:%M UTC")
        ));
    }
    if !already_exists.is_empty() {
        output.warn(format!(
            "{} already-exists record(s) present: remote collection clean-up is suppressed until they resolve",
            already_exists.len()
        ));
    }

    Ok(())
}

fn clear_registries(
    store: &RegistryStore,
    skip: bool,
    already_exists: bool,
    output: &Output,
) -> Result<()> {
    // No flags clears both, matching what operators usually want
    let clear_skip = skip || !already_exists;
    let clear_exists = already_exists || !skip;

    if clear_skip {
        let mut registry = store.load_skip();
        let count = registry.len();
        registry.clear();
        store
            .save_skip(&registry)
            .map_err(|e| eyre!("Failed to save skip registry: {}", e))?;
        output.success(format!("Cleared {} skip record(s)", count));
    }
    if clear_exists {
        let mut registry = store.load_already_exists();
        let count = registry.len();
        registry.clear();
        store
            .save_already_exists(&registry)
            .map_err(|e| eyre!("Failed to save already-exists registry: {}", e))?;
        output.success(format!("Cleared {} already-exists record(s)", count));
    }

    Ok(())
}
