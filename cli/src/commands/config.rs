// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use aegis_diagnostics::config::CONFIG_PATH_ENV;
use aegis_diagnostics::DiagnosticsConfig;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,

        /// Print the effective manifest as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate a configuration file with default values
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./aegis-diagnostics.yaml")]
        output: PathBuf,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths, yaml } => show(config_override, paths, yaml).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output } => generate(output).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool, as_yaml: bool) -> Result<()> {
    let config = DiagnosticsConfig::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. {}: {}",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./aegis-diagnostics.yaml");
        println!("  4. ~/.aegis/diagnostics.yaml");
        println!("  5. /etc/aegis/diagnostics.yaml");
        println!();
    }

    if as_yaml {
        print!("{}", config.to_yaml_string()?);
        return Ok(());
    }

    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    let spec = &config.spec;

    println!("{}", "Fix Memory:".bold());
    println!("  File: {}", spec.fix_memory.file_name.display());
    println!("  Capacity: {}", spec.fix_memory.capacity);
    println!("  Similar limit: {}", spec.fix_memory.similar_limit);
    println!();

    println!("{}", "Suggestions:".bold());
    println!(
        "  From memory: {} (verified {}%, unverified {}%)",
        spec.suggestions.max_from_memory,
        spec.suggestions.verified_confidence,
        spec.suggestions.unverified_confidence
    );
    println!("  From hypotheses: {}", spec.suggestions.max_from_hypotheses);
    println!();

    let reflexion = &spec.reflexion.loop_config;
    println!("{}", "Reflexion:".bold());
    println!("  File: {}", spec.reflexion.file_name.display());
    println!("  Max attempts: {}", reflexion.max_attempts);
    println!("  Retrieval limit: {}", reflexion.retrieval_limit);
    println!("  Effectiveness threshold: {}", reflexion.effectiveness_threshold);
    println!();

    println!("{}", "Retry:".bold());
    println!(
        "  {} attempts, {}ms base delay x{} (max {}ms)",
        spec.retry.max_attempts, spec.retry.base_delay_ms, spec.retry.factor, spec.retry.max_delay_ms
    );
    println!();

    println!("{}", "Retention:".bold());
    if spec.retention.enabled {
        println!("  Enabled: {}", "yes".green());
    } else {
        println!("  Enabled: {}", "no".dimmed());
    }
    println!(
        "  Prune below {} after {} outcomes, or older than {} days",
        spec.retention.min_effectiveness, spec.retention.min_observations, spec.retention.max_age_days
    );
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = DiagnosticsConfig::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf) -> Result<()> {
    DiagnosticsConfig::default()
        .to_yaml_file(&output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
