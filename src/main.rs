// apikeys — Application Entry Point
//
// Parses CLI arguments, initializes structured logging, and dispatches to
// the command handler.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use apikeys::cli::{config_store, execute, Cli};

/// Exit code for rejected input or a stale id, as opposed to a failure.
const EXIT_RECOVERABLE: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // A broken config file is reported by the command itself; here it only
    // falls back to the default log filter.
    let config = config_store(cli.config.as_deref())
        .load()
        .unwrap_or_default();

    // RUST_LOG wins over the config file. Secret values are never logged.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter_or_default())),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = execute(cli).await {
        eprintln!("Error: {}", e);
        if e.is_recoverable() {
            eprintln!("Run `apikeys list` to see the current keys.");
            std::process::exit(EXIT_RECOVERABLE);
        }
        std::process::exit(1);
    }
}
