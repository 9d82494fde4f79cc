//! # Satchel
//!
//! Runs a command script against a fresh inventory session.
//!
//! Usage: `satchel [script] [config]`. Without a script, commands are read
//! from standard input.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use satchel_sandbox::commands::run_script;
use satchel_sandbox::config::{SandboxConfig, CONFIG_FILE};
use satchel_sandbox::session::GameSession;

/// Main entry point.
fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let script_path = args.next().map(PathBuf::from);
    let config_path = args.next().map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);

    let config = SandboxConfig::load_from(&config_path);

    // RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("Satchel sandbox starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let script = match &script_path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        },
    };

    let mut session = GameSession::new(config)?;
    let report = run_script(&mut session, &script);
    info!(
        "Script finished: {} command(s) ran, {} failed",
        report.executed, report.failed
    );

    if session.config().autosave_after_script {
        session.save(None)?;
    }
    println!("{}", session.describe());
    Ok(())
}
