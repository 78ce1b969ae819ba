// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Reflexion loop commands
//!
//! Commands: outcome, feedback, status, prune

use anyhow::{Context, Result};
use clap::{ArgGroup, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use aegis_diagnostics::{ReflectionId, TaskContext, TaskOutcome};

use crate::embedded::EmbeddedEngine;

#[derive(Subcommand)]
pub enum ReflexionCommand {
    /// Report a task outcome and get the retry decision
    #[command(group(
        ArgGroup::new("status")
            .required(true)
            .args(["success", "partial", "failure"])
    ))]
    Outcome {
        /// Agent or component that ran the task
        #[arg(long)]
        actor: String,

        /// Task type (e.g. deploy, build, test)
        #[arg(long)]
        task_type: String,

        /// What the task was trying to do
        #[arg(long)]
        description: String,

        /// 1-based attempt number
        #[arg(long, default_value_t = 1)]
        attempt: u32,

        /// Task succeeded
        #[arg(long)]
        success: bool,

        /// Task partially succeeded
        #[arg(long)]
        partial: bool,

        /// Task failed (requires --message)
        #[arg(long, requires = "message")]
        failure: bool,

        /// Error message
        #[arg(short, long)]
        message: Option<String>,

        /// Error code
        #[arg(long)]
        code: Option<String>,

        /// Lesson learned, stored with the episode
        #[arg(long)]
        lesson: Option<String>,
    },

    /// Report whether an injected reflection helped
    #[command(group(
        ArgGroup::new("verdict")
            .required(true)
            .args(["helped", "not_helped"])
    ))]
    Feedback {
        /// Reflection ID
        #[arg(value_name = "REFLECTION_ID")]
        reflection_id: ReflectionId,

        #[arg(long)]
        helped: bool,

        #[arg(long)]
        not_helped: bool,
    },

    /// Show reflexion memory statistics
    Status {
        /// Summarize a single actor
        #[arg(long)]
        actor: Option<String>,
    },

    /// Remove stale and ineffective reflections now
    Prune,
}

pub async fn handle_command(
    command: ReflexionCommand,
    config_path: Option<PathBuf>,
    workspace: PathBuf,
) -> Result<()> {
    let engine = EmbeddedEngine::new(config_path, workspace)?;

    match command {
        ReflexionCommand::Outcome {
            actor,
            task_type,
            description,
            attempt,
            success,
            partial,
            failure: _,
            message,
            code,
            lesson,
        } => {
            let task = TaskContext::new(actor, task_type, description).with_attempt(attempt);
            let error = message.map(|m| super::observation(m, code, None));
            let mut outcome = match (success, partial, error) {
                (true, _, _) => TaskOutcome::success(),
                (_, true, error) => TaskOutcome::partial(error),
                (_, _, Some(error)) => TaskOutcome::failure(error),
                (_, _, None) => anyhow::bail!("--failure requires --message"),
            };
            if let Some(lesson) = lesson {
                outcome = outcome.with_lesson(lesson);
            }
            outcome_cmd(&engine, task, outcome).await
        }
        ReflexionCommand::Feedback {
            reflection_id,
            helped,
            not_helped: _,
        } => feedback(&engine, reflection_id, helped).await,
        ReflexionCommand::Status { actor } => status(&engine, actor).await,
        ReflexionCommand::Prune => prune(&engine).await,
    }
}

async fn outcome_cmd(engine: &EmbeddedEngine, task: TaskContext, outcome: TaskOutcome) -> Result<()> {
    let result = engine
        .reflexion()
        .process_outcome(&task, &outcome)
        .await
        .context("Failed to process outcome")?;

    println!("Episode: {}", result.episodic_id);
    match &result.reflection_id {
        Some(id) => println!("Reflection: {}", id.to_string().cyan()),
        None => println!("Reflection: {}", "(none)".dimmed()),
    }
    println!("Prior reflections: {}", result.prior_reflections.len());

    if result.should_retry {
        println!("{}", "✓ Retry recommended".green());
    } else {
        println!("{}", "✗ Do not retry".yellow());
    }

    if let Some(context) = &result.injected_context {
        println!();
        println!("{}", context);
    }

    Ok(())
}

async fn feedback(engine: &EmbeddedEngine, id: ReflectionId, helped: bool) -> Result<()> {
    let reflection = engine
        .reflexion()
        .record_outcome(id, helped)
        .await
        .with_context(|| format!("Failed to update reflection {}", id))?;

    println!(
        "{}",
        format!(
            "✓ Reflection {} effectiveness now {:.0}% (helped {}, failed {})",
            id,
            reflection.effectiveness_score * 100.0,
            reflection.times_helped,
            reflection.times_failed
        )
        .green()
    );

    Ok(())
}

async fn status(engine: &EmbeddedEngine, actor: Option<String>) -> Result<()> {
    let reflexion = engine.reflexion();
    let repo = reflexion.repository();

    println!("{}", format!("Reflexion memory: {}", engine.reflexion_path().display()).bold());
    println!();

    let stats = repo.stats().await.context("Failed to read reflexion memory")?;
    println!("{}", "Episodes:".bold());
    println!("  Total: {}", stats.episodes);
    println!("  Success: {}", stats.successes.to_string().green());
    println!("  Partial: {}", stats.partials.to_string().yellow());
    println!("  Failure: {}", stats.failures.to_string().red());
    println!();

    println!("{}", "Reflections:".bold());
    println!("  Total: {}", stats.reflections);
    match stats.average_effectiveness {
        Some(avg) => println!("  Average effectiveness: {:.0}%", avg * 100.0),
        None => println!("  Average effectiveness: {}", "(n/a)".dimmed()),
    }

    if let Some(actor) = actor {
        let summary = repo
            .actor_summary(&actor)
            .await
            .context("Failed to read reflexion memory")?;
        println!();
        println!("{}", format!("Actor {}:", summary.actor).bold());
        println!("  Episodes: {}", summary.episodes);
        println!("  Failures: {}", summary.failures);
        println!("  Reflections: {}", summary.reflections);
        match summary.last_activity {
            Some(at) => println!("  Last activity: {}", at.to_rfc3339()),
            None => println!("  Last activity: {}", "(never)".dimmed()),
        }
    }

    Ok(())
}

async fn prune(engine: &EmbeddedEngine) -> Result<()> {
    let pruned = engine
        .pruner()
        .prune_cycle()
        .await
        .context("Failed to prune reflections")?;

    println!("{}", format!("✓ Pruned {} reflection(s)", pruned).green());
    Ok(())
}
