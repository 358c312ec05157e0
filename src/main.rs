use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use taskboard::cli::Cli;
use taskboard::cmd::*;
use taskboard::config::{load_config_with_fallback, merge_overrides, LogConfig};
use taskboard::dates::today;
use taskboard::entity::Field;

/// `RUST_LOG` wins over the configured filter. The dashboard owns the terminal,
/// so it logs to a file instead of stderr.
fn init_logging(config: &LogConfig, to_file: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));
    if to_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.file)
            .with_context(|| format!("opening log file {}", config.file.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = load_config_with_fallback(cli.config.as_deref());
    let config = merge_overrides(&loaded.config, &cli.overrides());
    init_logging(&config.log, matches!(cli.command, Commands::Ui))?;
    if let Some(err) = loaded.error {
        warn!(error = %err, "config not loaded, using defaults");
    }

    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    let remote = || Remote::new(&config.client);

    match cli.command {
        Commands::Serve { .. } => runtime.block_on(cmd_serve(&config.server)),

        Commands::Ui => cmd_ui(&config.client, runtime.handle().clone()),

        Commands::List { kind, status } => runtime.block_on(cmd_list(&remote()?, kind, status)),

        Commands::Add { kind, title, fields } => runtime.block_on(cmd_add(&remote()?, kind, title, &fields)),

        Commands::Update {
            kind, id, title, fields, clear_due, clear_start_on, clear_started,
        } => {
            let clear: Vec<Field> = [
                (clear_due, Field::DueDate),
                (clear_start_on, Field::StartOn),
                (clear_started, Field::Started),
            ]
            .into_iter()
            .filter_map(|(on, field)| on.then_some(field))
            .collect();
            let patch = build_values(kind, title, &fields, &clear, today())?;
            runtime.block_on(cmd_update(&remote()?, kind, &id, patch))
        }

        Commands::Complete { kind, id } => runtime.block_on(cmd_complete(&remote()?, kind, &id)),

        Commands::Delete { kind, id } => runtime.block_on(cmd_delete(&remote()?, kind, &id)),

        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    }
}
