#![forbid(unsafe_code)]

mod batch;
mod cmd;
mod input;
mod output;

use clap::{Parser, Subcommand};
use cstate_core::ErrorCode;
use cstate_core::config::resolve_config;
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "cstate: canonical changeset state from code host snapshots and events",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Alias for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Worker threads for batch input (overrides `CSTATE_WORKERS` and config).
    #[arg(long, global = true)]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self, user_output: Option<&str>) -> OutputMode {
        resolve_output_mode(self.format, self.json, user_output)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "State",
        about = "Reconstruct the current state of changesets",
        long_about = "Reconstruct external, review and check state plus labels for each changeset \
                      from its last snapshot and the events observed since.",
        after_help = "EXAMPLES:\n    # Reconstruct one changeset\n    cstate reconstruct changeset.json\n\n    # Reconstruct a batch from stdin on 8 workers\n    cat batch.json | cstate reconstruct - --workers 8\n\n    # Emit machine-readable output\n    cstate reconstruct batch.json --format json"
    )]
    Reconstruct(cmd::BatchArgs),

    #[command(
        next_help_heading = "State",
        about = "Show how changesets got to their current state",
        long_about = "Fold each changeset's events into point-in-time external and review \
                      state samples, oldest first.",
        after_help = "EXAMPLES:\n    # Show the state history of a changeset\n    cstate history changeset.json\n\n    # Stop at the first malformed changeset\n    cstate history batch.json --fail-fast"
    )]
    History(cmd::BatchArgs),

    #[command(
        next_help_heading = "Configuration",
        about = "Show the effective configuration",
        long_about = "Show configuration resolved from flags, environment, \
                      .cstate/config.toml and the user config file.",
        after_help = "EXAMPLES:\n    # Show resolved configuration\n    cstate config\n\n    # Check the worker count a batch would use\n    CSTATE_WORKERS=2 cstate config --format text"
    )]
    Config,
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("CSTATE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "cstate=debug,info"
        } else {
            "cstate=info,warn"
        })
    });

    let format = env::var("CSTATE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = std::env::current_dir()?;

    let mut output = cli.output_mode(None);
    let config = match resolve_config(&project_root, cli.workers, |user_output| {
        output = cli.output_mode(user_output);
        output.as_str().to_string()
    }) {
        Ok(config) => config,
        Err(err) => {
            render_error(
                output,
                &CliError::from_code(ErrorCode::ConfigParseError, format!("{err:#}")),
            )?;
            return Err(err);
        }
    };

    match cli.command {
        Commands::Reconstruct(ref args) => {
            cmd::reconstruct::run_reconstruct(args, output, &config)
        }
        Commands::History(ref args) => cmd::history::run_history(args, output, &config),
        Commands::Config => cmd::config::run_config(&config, output),
    }
}
