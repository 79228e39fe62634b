//! # configurator: Preview Host
//!
//! Runs a catalog through the configurator engine outside a browser.
//!
//! ## User Workflow
//! ```text
//! configurator --catalog catalog.json --actions actions.json
//!   1. Load configurator.toml (FX table, channel, log filter)
//!   2. Load and validate the catalog
//!   3. Start a session (fresh, or rehydrated from --selection)
//!   4. Print the initial state, then one state per action (JSON lines)
//!   5. Optionally save the final selection (--save)
//! ```
//!
//! Logs go to stderr so stdout stays machine-readable.

mod commands;
mod config;
mod error;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use configurator_core::{
    Catalog, ConfiguratorSession, DerivedState, MarginStatus, SelectionSnapshot,
};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::commands::Action;
use crate::config::ConfiguratorConfig;
use crate::error::{CliError, CliResult};

#[derive(Debug, Parser)]
#[command(name = "configurator", version, about = "Replay configurator actions against a catalog")]
struct Cli {
    /// Catalog JSON file.
    #[arg(long)]
    catalog: PathBuf,

    /// Config file. Defaults to configurator.toml in the platform config dir.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Saved selection snapshot to start from.
    #[arg(long)]
    selection: Option<PathBuf>,

    /// JSON array of actions to replay.
    #[arg(long)]
    actions: Option<PathBuf>,

    /// Active channel, overriding config and environment.
    #[arg(long)]
    channel: Option<String>,

    /// Write the final selection snapshot here.
    #[arg(long)]
    save: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ConfiguratorConfig::load(cli.config.clone()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configurator: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.logging.filter);
    match &config.source {
        Some(path) => info!(?path, "Loaded configurator config"),
        None => debug!("No config file found, using defaults"),
    }
    debug!(channel = ?config.storefront.active_channel, "Active channel");

    match run(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Configurator run failed");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the tracing subscriber on stderr.
///
/// `RUST_LOG` wins over the configured filter.
fn init_tracing(configured: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new("info,configurator=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli, config: ConfiguratorConfig) -> CliResult<()> {
    let catalog: Catalog = read_json(&cli.catalog)?;
    catalog.validate()?;
    info!(
        path = ?cli.catalog,
        groups = catalog.option_groups.len(),
        add_ons = catalog.add_ons.len(),
        presets = catalog.configuration_presets.len(),
        "Catalog loaded"
    );

    let context = config.pricing_context(cli.channel);
    let session = match &cli.selection {
        Some(path) => {
            let snapshot: SelectionSnapshot = read_json(path)?;
            info!(?path, "Rehydrating saved selection");
            ConfiguratorSession::rehydrate(catalog, context, &snapshot)
        }
        None => ConfiguratorSession::new(catalog, context),
    };
    let mut session = session.with_listener(warn_on_failing_margins);

    let actions: Vec<Action> = match &cli.actions {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };

    let session_id = Uuid::new_v4();
    let stdout = std::io::stdout();
    let written = commands::replay(&mut session, &actions, session_id, &mut stdout.lock())?;
    info!(%session_id, states = written, "Replay finished");

    if let Some(path) = &cli.save {
        let json = serde_json::to_string_pretty(&session.to_snapshot())
            .map_err(|e| CliError::json(path, e))?;
        std::fs::write(path, json).map_err(|e| CliError::io(path, e))?;
        info!(?path, "Selection saved");
    }

    Ok(())
}

fn warn_on_failing_margins(state: &DerivedState) {
    for health in &state.add_on_health {
        if health.status == MarginStatus::Fail {
            warn!(
                add_on = %health.add_on_id,
                margin = ?health.margin_value,
                "Add-on priced below its margin guardrail"
            );
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let contents = std::fs::read_to_string(path).map_err(|e| CliError::io(path, e))?;
    serde_json::from_str(&contents).map_err(|e| CliError::json(path, e))
}
