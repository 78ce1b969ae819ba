// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Retry wrapper with exponential backoff and post-mortem analysis.
//!
//! Attempts run strictly one after another. When the budget is spent the
//! last error is analysed, summarised at `error!` level and returned as-is.

use chrono::Utc;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

use super::analysis_service::AnalysisService;
use super::fix_memory::WorkspaceRef;
use super::publish_event;
use crate::domain::{DiagnosticEvent, ErrorObservation};

const SUMMARY_SUGGESTIONS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub factor: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay after the given 1-based attempt: `min(base * factor^(attempt-1), max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = self.base_delay.as_secs_f64() * self.factor.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(scaled.max(0.0))
        }
    }
}

/// Errors that can be turned into an [`ErrorObservation`] for analysis.
pub trait Diagnosable {
    fn observation(&self) -> ErrorObservation;
}

impl Diagnosable for ErrorObservation {
    fn observation(&self) -> ErrorObservation {
        self.clone()
    }
}

impl Diagnosable for std::io::Error {
    fn observation(&self) -> ErrorObservation {
        ErrorObservation::from(self)
    }
}

impl Diagnosable for anyhow::Error {
    fn observation(&self) -> ErrorObservation {
        ErrorObservation::from(self)
    }
}

/// Run `operation` up to `policy.max_attempts` times. The closure receives the
/// 1-based attempt number.
pub async fn retry_with_analysis<T, E, F, Fut>(
    policy: &RetryPolicy,
    service: &AnalysisService,
    workspace: &WorkspaceRef,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Diagnosable,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    info!("Operation succeeded on attempt {}", attempt);
                }
                return Ok(value);
            }
            Err(e) if attempt < max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "Operation failed (attempt {}/{}): {}; retrying in {:?}",
                    attempt,
                    max_attempts,
                    e.observation().message,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                let analysis = service.analyze(workspace, e.observation()).await;
                let suggestions: Vec<String> = analysis
                    .top_suggestions(SUMMARY_SUGGESTIONS)
                    .map(|s| format!("[{}%] {}", s.confidence, s.description))
                    .collect();

                error!(
                    attempts = max_attempts,
                    analysis_id = %analysis.id,
                    category = %analysis.category,
                    root_cause = %analysis.decomposition.root_cause,
                    suggestions = %suggestions.join("; "),
                    "Retry budget exhausted"
                );

                publish_event(
                    service.event_bus(),
                    DiagnosticEvent::RetryBudgetExhausted {
                        analysis_id: analysis.id.clone(),
                        attempts: max_attempts,
                        category: analysis.category,
                        timestamp: Utc::now(),
                    },
                )
                .await;

                return Err(e);
            }
        }
    }
}
