// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Domain events for the diagnostics bounded context

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::analysis::AnalysisId;
use super::category::ErrorCategory;
use super::fix::FixId;
use super::reflection::{EpisodeId, OutcomeStatus, ReflectionId};
use super::signature::ErrorSignature;

/// Diagnostics domain events
/// Published to the EventBus for observability and integration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiagnosticEvent {
    /// An error was classified and analysed
    ErrorAnalyzed {
        analysis_id: AnalysisId,
        category: ErrorCategory,
        signature: ErrorSignature,
        related_fixes: usize,
        timestamp: DateTime<Utc>,
    },

    /// A verified fix was written to fix memory
    FixRecorded {
        fix_id: FixId,
        signature: ErrorSignature,
        category: ErrorCategory,
        /// An entry with the same signature was overwritten
        replaced: bool,
        timestamp: DateTime<Utc>,
    },

    /// Oldest entries dropped to stay within capacity
    FixesEvicted {
        count: usize,
        capacity: usize,
        timestamp: DateTime<Utc>,
    },

    EpisodeLogged {
        episode_id: EpisodeId,
        actor: String,
        outcome: OutcomeStatus,
        timestamp: DateTime<Utc>,
    },

    ReflectionCreated {
        reflection_id: ReflectionId,
        actor: String,
        task_type: String,
        category: ErrorCategory,
        timestamp: DateTime<Utc>,
    },

    ReflectionEffectivenessUpdated {
        reflection_id: ReflectionId,
        helped: bool,
        old_score: f64,
        new_score: f64,
        times_helped: u32,
        times_failed: u32,
        timestamp: DateTime<Utc>,
    },

    /// Retention pass removed stale or ineffective reflections
    ReflectionsPruned {
        count: usize,
        timestamp: DateTime<Utc>,
    },

    /// All retry attempts failed; carries the analysis of the last error
    RetryBudgetExhausted {
        analysis_id: AnalysisId,
        attempts: u32,
        category: ErrorCategory,
        timestamp: DateTime<Utc>,
    },
}

impl DiagnosticEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DiagnosticEvent::ErrorAnalyzed { timestamp, .. } => *timestamp,
            DiagnosticEvent::FixRecorded { timestamp, .. } => *timestamp,
            DiagnosticEvent::FixesEvicted { timestamp, .. } => *timestamp,
            DiagnosticEvent::EpisodeLogged { timestamp, .. } => *timestamp,
            DiagnosticEvent::ReflectionCreated { timestamp, .. } => *timestamp,
            DiagnosticEvent::ReflectionEffectivenessUpdated { timestamp, .. } => *timestamp,
            DiagnosticEvent::ReflectionsPruned { timestamp, .. } => *timestamp,
            DiagnosticEvent::RetryBudgetExhausted { timestamp, .. } => *timestamp,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            DiagnosticEvent::ErrorAnalyzed { .. } => "error_analyzed",
            DiagnosticEvent::FixRecorded { .. } => "fix_recorded",
            DiagnosticEvent::FixesEvicted { .. } => "fixes_evicted",
            DiagnosticEvent::EpisodeLogged { .. } => "episode_logged",
            DiagnosticEvent::ReflectionCreated { .. } => "reflection_created",
            DiagnosticEvent::ReflectionEffectivenessUpdated { .. } => "reflection_effectiveness_updated",
            DiagnosticEvent::ReflectionsPruned { .. } => "reflections_pruned",
            DiagnosticEvent::RetryBudgetExhausted { .. } => "retry_budget_exhausted",
        }
    }
}
