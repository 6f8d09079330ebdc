// apikeys — CLI Command Handlers
//
// `execute` is the composition root: it resolves configuration, opens one
// `ApiKeyStore`, hands it to the command handler and closes it afterwards.
// Handlers trim user input and apply the case-insensitive name check
// before calling the store.

use std::path::Path;

use crate::config::{AppConfig, ConfigStore};
use crate::error::AppError;
use crate::store::{ApiKey, ApiKeyStore, ApiKeySummary, KeyField, StoreError};

use super::{Cli, Commands, ConfigAction};

/// The config store for an explicit path, or the default location.
pub fn config_store(path: Option<&Path>) -> ConfigStore {
    match path {
        Some(path) => ConfigStore::with_path(path),
        None => ConfigStore::new(),
    }
}

/// Execute the parsed CLI command.
pub async fn execute(cli: Cli) -> Result<(), AppError> {
    let configs = config_store(cli.config.as_deref());

    match cli.command {
        Commands::Config { action } => cmd_config(&configs, action),
        command => {
            let overrides = AppConfig {
                database_path: cli.db,
                ..Default::default()
            };
            let config = configs.load()?.merge(overrides);

            let store = ApiKeyStore::with_busy_timeout(
                config.database_path_or_default(),
                config.busy_timeout_or_default(),
            );
            store.open().await?;

            let result = run(&store, command).await;
            let closed = store.close().await.map_err(AppError::from);
            // The command's own error takes precedence over a close failure.
            result.and(closed)
        }
    }
}

async fn run(store: &ApiKeyStore, command: Commands) -> Result<(), AppError> {
    match command {
        Commands::Init => cmd_init(store),
        Commands::Add { name, value } => cmd_add(store, name, value).await,
        Commands::List { json } => cmd_list(store, json).await,
        Commands::Active { reveal } => cmd_active(store, reveal).await,
        Commands::Update { id, name, value } => cmd_update(store, id, name, value).await,
        Commands::Delete { id } => cmd_delete(store, id).await,
        Commands::Activate { id } => cmd_activate(store, id).await,
        Commands::Stats => cmd_stats(store).await,
        Commands::Reset { yes } => cmd_reset(store, yes).await,
        Commands::Config { action } => Err(AppError::Other(format!(
            "config {:?} does not use the key database",
            action
        ))),
    }
}

// ─── Init ────────────────────────────────────────────────────────────────────

fn cmd_init(store: &ApiKeyStore) -> Result<(), AppError> {
    println!("✓ Key store ready");
    if let Some(path) = store.path() {
        println!("  Database: {}", path.display());
    }
    println!();
    println!("Next: add a key with `apikeys add --name <name> --value <secret>`");
    Ok(())
}

// ─── Add / Update ────────────────────────────────────────────────────────────

async fn cmd_add(store: &ApiKeyStore, name: String, value: String) -> Result<(), AppError> {
    let name = name.trim();
    let value = value.trim();

    ensure_name_available(store, name, None).await?;
    let id = store.add(name, value).await?;

    println!("✓ API key stored");
    println!("  ID:   {}", id);
    println!("  Name: {}", name);
    Ok(())
}

async fn cmd_update(
    store: &ApiKeyStore,
    id: i64,
    name: String,
    value: String,
) -> Result<(), AppError> {
    let name = name.trim();
    let value = value.trim();

    ensure_name_available(store, name, Some(id)).await?;
    store.update(id, name, value).await?;

    println!("✓ API key {} updated", id);
    Ok(())
}

/// Names differing only in case are treated as duplicates here.
/// The store itself compares names exactly.
async fn ensure_name_available(
    store: &ApiKeyStore,
    name: &str,
    exclude: Option<i64>,
) -> Result<(), AppError> {
    let wanted = name.to_lowercase();
    let taken = store
        .list()
        .await?
        .iter()
        .any(|key| Some(key.id) != exclude && key.name.to_lowercase() == wanted);

    if taken {
        tracing::warn!(name = %name, "Rejected name differing only in case");
        return Err(StoreError::Conflict {
            field: KeyField::Name,
        }
        .into());
    }
    Ok(())
}

// ─── List / Active / Stats ───────────────────────────────────────────────────

async fn cmd_list(store: &ApiKeyStore, json: bool) -> Result<(), AppError> {
    let keys = store.list().await?;

    if json {
        let summaries: Vec<ApiKeySummary> = keys.iter().map(ApiKey::summary).collect();
        let out = serde_json::to_string_pretty(&summaries)
            .map_err(|e| AppError::Other(format!("Failed to encode JSON: {}", e)))?;
        println!("{}", out);
        return Ok(());
    }

    if keys.is_empty() {
        println!("No API keys stored yet.");
        println!("Add one with: apikeys add --name <name> --value <secret>");
        return Ok(());
    }

    println!("Stored API keys ({}):\n", keys.len());
    for key in &keys {
        println!(
            "  {:>4} │ {} │ {:20} │ {:8} │ {}",
            key.id,
            if key.active { "*" } else { " " },
            key.name,
            key.masked_value(),
            key.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        );
    }

    Ok(())
}

async fn cmd_active(store: &ApiKeyStore, reveal: bool) -> Result<(), AppError> {
    match store.get_active().await? {
        Some(key) => {
            println!("Active API key:\n");
            println!("  ID:      {}", key.id);
            println!("  Name:    {}", key.name);
            if reveal {
                println!("  Value:   {}", key.value());
            } else {
                println!("  Value:   {}", key.masked_value());
            }
            println!("  Created: {}", key.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        None => {
            println!("No active API key.");
            println!("Activate one with: apikeys activate <id>");
        }
    }

    Ok(())
}

async fn cmd_stats(store: &ApiKeyStore) -> Result<(), AppError> {
    let stats = store.stats().await?;
    println!("Total keys:  {}", stats.total);
    println!("Active keys: {}", stats.active);
    Ok(())
}

// ─── Delete / Activate / Reset ───────────────────────────────────────────────

async fn cmd_delete(store: &ApiKeyStore, id: i64) -> Result<(), AppError> {
    let was_active = store.get(id).await?.map(|key| key.active).unwrap_or(false);

    store.delete(id).await?;

    println!("✓ API key {} deleted", id);
    if was_active {
        println!("  It was the active key; no key is active now.");
    }
    Ok(())
}

async fn cmd_activate(store: &ApiKeyStore, id: i64) -> Result<(), AppError> {
    store.activate(id).await?;
    println!("✓ API key {} is now active", id);
    Ok(())
}

async fn cmd_reset(store: &ApiKeyStore, yes: bool) -> Result<(), AppError> {
    if !yes {
        return Err(AppError::Other(
            "Reset deletes every stored key. Re-run with --yes to confirm.".to_string(),
        ));
    }

    store.reset().await?;
    println!("✓ Key table reset");
    Ok(())
}

// ─── Config ──────────────────────────────────────────────────────────────────

fn cmd_config(configs: &ConfigStore, action: ConfigAction) -> Result<(), AppError> {
    match action {
        ConfigAction::Path => {
            println!("{}", configs.path().display());
        }
        ConfigAction::Init => {
            configs.init()?;
            println!("✓ Config written to {}", configs.path().display());
        }
        ConfigAction::Show => {
            let config = configs.load()?;
            println!("Config file: {}", configs.path().display());
            println!(
                "  database_path:   {}",
                config.database_path_or_default().display()
            );
            println!(
                "  busy_timeout_ms: {}",
                config.busy_timeout_or_default().as_millis()
            );
            println!("  log_filter:      {}", config.log_filter_or_default());
        }
    }

    Ok(())
}
