// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # AEGIS Diagnose CLI
//!
//! The `aegis-diagnose` binary runs the diagnostics engine in-process
//! against one workspace's fix memory and reflexion store.
//!
//! ## Commands
//!
//! - `aegis-diagnose analyze` - Classify an error and print the routed report
//! - `aegis-diagnose fix record|list|similar` - Workspace fix memory
//! - `aegis-diagnose reflexion outcome|feedback|status|prune` - Reflexion loop
//! - `aegis-diagnose config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;
mod embedded;

use commands::{AnalyzeArgs, ConfigCommand, FixCommand, ReflexionCommand};

/// AEGIS Diagnose - Error analysis and reflexion learning
#[derive(Parser)]
#[command(name = "aegis-diagnose")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "AEGIS_DIAGNOSTICS_CONFIG",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Workspace root holding the fix memory and reflexion files
    #[arg(short, long, global = true, default_value = ".", value_name = "DIR")]
    workspace: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "AEGIS_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an error
    #[command(name = "analyze")]
    Analyze(AnalyzeArgs),

    /// Workspace fix memory
    #[command(name = "fix")]
    Fix {
        #[command(subcommand)]
        command: FixCommand,
    },

    /// Reflexion loop operations
    #[command(name = "reflexion")]
    Reflexion {
        #[command(subcommand)]
        command: ReflexionCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    match cli.command {
        Some(Commands::Analyze(args)) => {
            commands::analyze::execute(args, cli.config, cli.workspace).await
        }
        Some(Commands::Fix { command }) => {
            commands::fix::handle_command(command, cli.config, cli.workspace).await
        }
        Some(Commands::Reflexion { command }) => {
            commands::reflexion::handle_command(command, cli.config, cli.workspace).await
        }
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
