// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Error analysis command

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use aegis_diagnostics::route;

use crate::embedded::EmbeddedEngine;

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Error message
    #[arg(short, long)]
    message: String,

    /// Error code (e.g. ENOENT, ETIMEDOUT)
    #[arg(long)]
    code: Option<String>,

    /// Stack trace
    #[arg(long)]
    stack: Option<String>,

    /// Print the analysis as JSON
    #[arg(long)]
    json: bool,
}

pub async fn execute(args: AnalyzeArgs, config_path: Option<PathBuf>, workspace: PathBuf) -> Result<()> {
    let engine = EmbeddedEngine::new(config_path, workspace)?;
    let error = super::observation(args.message, args.code, args.stack);

    let analysis = engine.analysis().analyze(&engine.workspace, error).await;

    if args.json {
        let json = serde_json::to_string_pretty(&analysis).context("Failed to serialize analysis")?;
        println!("{}", json);
        return Ok(());
    }

    let routed = route(&analysis);
    println!(
        "{} {} {}",
        "Category:".bold(),
        analysis.category.to_string().cyan(),
        format!("(primary: {}, secondary: {})", routed.primary_persona, routed.secondary_persona).dimmed()
    );
    println!();
    print!("{}", routed.report);

    Ok(())
}
