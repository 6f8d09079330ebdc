// apikeys — CLI Module
//
// Command-line interface using clap derive macros.
// Subcommands: init, add, list, active, update, delete, activate, stats,
// reset, config.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{config_store, execute};

/// apikeys — Local store for the API keys used by the transcription app.
#[derive(Parser, Debug)]
#[command(name = "apikeys")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the key database (overrides the config file).
    #[arg(long, global = true, env = "APIKEYS_DB")]
    pub db: Option<PathBuf>,

    /// Path to the config file.
    #[arg(long, global = true, env = "APIKEYS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the key database if it does not exist yet.
    Init,

    /// Add a new API key. New keys start inactive.
    Add {
        /// A unique, human-readable name (e.g., "prod", "personal").
        #[arg(long)]
        name: String,

        /// The secret value.
        /// Prefer the APIKEYS_VALUE environment variable to keep it out of shell history.
        #[arg(long, env = "APIKEYS_VALUE", hide_env_values = true)]
        value: String,
    },

    /// List stored keys, newest first. Values are masked.
    List {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show the active key.
    Active {
        /// Print the full secret value.
        #[arg(long)]
        reveal: bool,
    },

    /// Change the name and value of a key.
    Update {
        /// The id of the key to change.
        id: i64,

        #[arg(long)]
        name: String,

        #[arg(long, env = "APIKEYS_VALUE", hide_env_values = true)]
        value: String,
    },

    /// Delete a key. Deleting the active key leaves no key active.
    Delete {
        /// The id of the key to delete.
        id: i64,
    },

    /// Make a key the active one.
    Activate {
        /// The id of the key to activate.
        id: i64,
    },

    /// Show key counts.
    Stats,

    /// Drop and recreate the key table. Deletes every stored key.
    Reset {
        /// Confirm the reset.
        #[arg(long)]
        yes: bool,
    },

    /// Manage the config file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a config file with default values.
    Init,

    /// Print the effective config file contents.
    Show,

    /// Print the config file path.
    Path,
}
