// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Fix memory commands
//!
//! Commands: record, list, similar

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use aegis_diagnostics::{classify, ErrorCategory, ErrorSignature, FixMemoryEntry};

use crate::embedded::EmbeddedEngine;

#[derive(Subcommand)]
pub enum FixCommand {
    /// Analyze an error and record the fix that resolved it
    Record {
        /// Error message
        #[arg(short, long)]
        message: String,

        /// Error code
        #[arg(long)]
        code: Option<String>,

        /// Description of the fix that was applied
        #[arg(long, value_name = "TEXT")]
        fix: String,

        /// The fix was not confirmed to work (not stored in fix memory)
        #[arg(long)]
        unverified: bool,
    },

    /// List fix memory entries
    List {
        /// Only show entries of this category
        #[arg(long)]
        category: Option<ErrorCategory>,
    },

    /// Show fixes recorded for similar errors
    Similar {
        /// Error message
        #[arg(short, long)]
        message: String,

        /// Error code
        #[arg(long)]
        code: Option<String>,
    },
}

pub async fn handle_command(
    command: FixCommand,
    config_path: Option<PathBuf>,
    workspace: PathBuf,
) -> Result<()> {
    let engine = EmbeddedEngine::new(config_path, workspace)?;

    match command {
        FixCommand::Record {
            message,
            code,
            fix,
            unverified,
        } => record(&engine, message, code, fix, !unverified).await,
        FixCommand::List { category } => list(&engine, category).await,
        FixCommand::Similar { message, code } => similar(&engine, message, code).await,
    }
}

async fn record(
    engine: &EmbeddedEngine,
    message: String,
    code: Option<String>,
    fix: String,
    verified: bool,
) -> Result<()> {
    let error = super::observation(message, code, None);
    let service = engine.analysis();

    let mut analysis = service.analyze(&engine.workspace, error).await;
    let recorded = service
        .resolve(&engine.workspace, &mut analysis, fix, verified)
        .await
        .context("Failed to record fix")?;

    println!("Analysis: {} [{}]", analysis.id, analysis.category);
    println!("Signature: {}", analysis.signature);
    if recorded {
        println!(
            "{}",
            format!("✓ Fix recorded in {}", engine.fix_memory_path().display()).green()
        );
    } else {
        println!(
            "{}",
            "⚠ Resolution is unverified; fix memory unchanged".yellow()
        );
    }

    Ok(())
}

async fn list(engine: &EmbeddedEngine, category: Option<ErrorCategory>) -> Result<()> {
    let mut entries = engine
        .fix_memory()
        .entries()
        .await
        .context("Failed to load fix memory")?;
    if let Some(category) = category {
        entries.retain(|e| e.category == category);
    }

    if entries.is_empty() {
        println!("{}", "No fixes recorded.".dimmed());
        return Ok(());
    }

    println!(
        "{}",
        format!("{} fix(es) in {}", entries.len(), engine.fix_memory_path().display()).bold()
    );
    for entry in entries.iter().rev() {
        print_entry(entry);
    }

    Ok(())
}

async fn similar(engine: &EmbeddedEngine, message: String, code: Option<String>) -> Result<()> {
    let error = super::observation(message, code, None);
    let category = classify(&error);
    let signature = ErrorSignature::from_observation(&error);

    let matches = engine
        .fix_memory()
        .find_similar(&signature, category)
        .await
        .context("Failed to search fix memory")?;

    println!("Signature: {}", signature);
    println!("Category: {}", category);
    println!();

    if matches.is_empty() {
        println!("{}", "No similar errors found.".dimmed());
        return Ok(());
    }

    for entry in &matches {
        print_entry(entry);
    }

    Ok(())
}

fn print_entry(entry: &FixMemoryEntry) {
    let status = if entry.verified {
        "verified".green()
    } else {
        "unverified".yellow()
    };
    println!(
        "  {} {} [{}] {}",
        entry.timestamp.format("%Y-%m-%d %H:%M"),
        entry.id.to_string().dimmed(),
        entry.category,
        status
    );
    println!("    Signature: {}", entry.signature);
    println!("    Fix: {}", entry.fix_applied);
}
