//! vgl - 3D force-directed layout for graph documents.
//!
//! Reads `{ "nodes": [...], "links": [...] }`, simulates one body per node
//! and writes the final positions as JSON.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::run::{ModeArg, RunOptions};
use commands::{config as config_cmd, run};
use config::Config;

/// 3D force-directed graph layout.
#[derive(Parser, Debug)]
#[command(
    name = "vgl",
    author,
    version,
    about = "Vibe-Graph Layout: 3D force-directed positions for a graph",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file (defaults to the per-user config directory).
    #[arg(short, long, global = true, env = "VGL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Lay out a graph document.
    ///
    /// Runs until the total movement settles, or exactly `--steps` steps.
    Run {
        /// Graph document (JSON).
        graph: PathBuf,

        /// Write positions to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Run exactly this many steps.
        #[arg(long)]
        steps: Option<u64>,

        /// Step budget when running until stable.
        #[arg(long)]
        max_steps: Option<u64>,

        /// Gravity evaluation for every configured gravity force.
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Barnes-Hut opening angle for every configured gravity force.
        #[arg(long)]
        theta: Option<f64>,
    },

    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show the effective configuration.
    Show,

    /// Reset the config file to defaults.
    Reset,

    /// Show path to config file.
    Path,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flags
    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            graph,
            output,
            steps,
            max_steps,
            mode,
            theta,
        } => {
            let config = Config::load(cli.config.as_deref())?;
            let options = RunOptions {
                output,
                steps,
                mode,
                theta,
                max_steps,
            };
            let report = run::execute(config.layout, config.pretty, &graph, &options)?;
            if !cli.quiet && options.output.is_some() {
                eprintln!(
                    "Layout {} after {} steps (movement {:.4})",
                    run::status(report.termination),
                    report.steps,
                    report.movement
                );
            }
        }

        Commands::Config(config_cmd_inner) => match config_cmd_inner {
            ConfigCommands::Show => {
                let config = Config::load(cli.config.as_deref())?;
                config_cmd::show(&config)?;
            }
            ConfigCommands::Reset => {
                config_cmd::reset()?;
            }
            ConfigCommands::Path => {
                if let Some(path) = Config::config_file_path() {
                    println!("{}", path.display());
                } else {
                    println!("(no config file path available)");
                }
            }
        },
    }

    Ok(())
}
