// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Reflection Pruner - Background retention task for reflexion memory
//!
//! Reflections are never deduplicated, so without retention the store
//! grows with every failure. The pruner periodically removes reflections
//! that are too old, or that have been tried enough times to show they do
//! not help.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Opt-in retention policy for reflections

use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{publish_event, EventBus};
use crate::domain::{DiagnosticEvent, Reflection, ReflectionRepository};

/// Retention settings for the reflection pruner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Whether pruning is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Reflections scoring below this are candidates once observed enough
    #[serde(default = "default_min_effectiveness")]
    pub min_effectiveness: f64,

    /// Outcome reports required before a low score counts
    #[serde(default = "default_min_observations")]
    pub min_observations: u32,

    /// Reflections older than this are removed regardless of score
    #[serde(default = "default_max_age_days")]
    pub max_age_days: i64,

    /// How often to run the pruner (in seconds)
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
}

fn default_min_effectiveness() -> f64 {
    0.2
}

fn default_min_observations() -> u32 {
    3
}

fn default_max_age_days() -> i64 {
    90
}

fn default_interval_seconds() -> u64 {
    3600
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_effectiveness: default_min_effectiveness(),
            min_observations: default_min_observations(),
            max_age_days: default_max_age_days(),
            interval_seconds: default_interval_seconds(),
        }
    }
}

impl RetentionConfig {
    pub fn should_prune(&self, reflection: &Reflection, now: DateTime<Utc>) -> bool {
        // An age limit beyond chrono's range never expires anything
        let too_old = ChronoDuration::try_days(self.max_age_days)
            .is_some_and(|max_age| now - reflection.timestamp > max_age);
        let ineffective = reflection.observations() >= self.min_observations
            && reflection.effectiveness_score < self.min_effectiveness;
        too_old || ineffective
    }
}

/// Reflection Pruner - Background task
pub struct ReflectionPruner {
    repo: Arc<dyn ReflectionRepository>,
    event_bus: Arc<dyn EventBus>,
    config: RetentionConfig,
    shutdown_token: CancellationToken,
}

impl ReflectionPruner {
    pub fn new(
        repo: Arc<dyn ReflectionRepository>,
        event_bus: Arc<dyn EventBus>,
        config: RetentionConfig,
    ) -> Self {
        Self {
            repo,
            event_bus,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        if !self.config.enabled {
            info!("Reflection pruner is disabled");
            return;
        }

        info!(
            interval_seconds = self.config.interval_seconds,
            min_effectiveness = self.config.min_effectiveness,
            min_observations = self.config.min_observations,
            max_age_days = self.config.max_age_days,
            "Starting reflection pruner background task"
        );

        let mut tick = interval(Duration::from_secs(self.config.interval_seconds.max(1)));

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    debug!("Running reflection pruner cycle");

                    match self.prune_cycle().await {
                        Ok(pruned_count) => {
                            info!(pruned_count, "Reflection pruner cycle completed");
                        }
                        Err(e) => {
                            warn!("Reflection pruner cycle failed: {}", e);
                        }
                    }
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping reflection pruner");
                    break;
                }
            }
        }

        info!("Reflection pruner background task stopped");
    }

    /// Execute a single pruning cycle
    pub async fn prune_cycle(&self) -> Result<usize> {
        let now = Utc::now();
        let candidates: Vec<Reflection> = self
            .repo
            .all_reflections()
            .await?
            .into_iter()
            .filter(|r| self.config.should_prune(r, now))
            .collect();

        for reflection in &candidates {
            debug!(
                reflection_id = %reflection.id,
                score = reflection.effectiveness_score,
                observations = reflection.observations(),
                "Pruning reflection"
            );
            self.repo.delete_reflection(reflection.id).await?;
        }

        if !candidates.is_empty() {
            publish_event(
                self.event_bus.as_ref(),
                DiagnosticEvent::ReflectionsPruned {
                    count: candidates.len(),
                    timestamp: now,
                },
            )
            .await;
        }

        Ok(candidates.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::MockEventBus;
    use crate::domain::{OutcomeStatus, ReflectionId};
    use crate::infrastructure::InMemoryReflectionRepository;

    fn reflection(age_days: i64, helped: u32, failed: u32) -> Reflection {
        Reflection {
            id: ReflectionId::new(),
            timestamp: Utc::now() - ChronoDuration::days(age_days),
            actor: "builder".to_string(),
            task_type: "deploy".to_string(),
            task_description: "ship it".to_string(),
            attempt_number: 1,
            outcome: OutcomeStatus::Failure,
            root_cause: "rc".to_string(),
            specific_error: "err".to_string(),
            correction_action: "act".to_string(),
            correction_reasoning: "why".to_string(),
            correction_confidence: 0.5,
            keywords: vec!["deploy".to_string()],
            times_helped: helped,
            times_failed: failed,
            effectiveness_score: crate::domain::effectiveness(helped, failed),
        }
    }

    #[tokio::test]
    async fn test_pruner_configuration() {
        let config = RetentionConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.min_effectiveness, 0.2);
        assert_eq!(config.min_observations, 3);
        assert_eq!(config.max_age_days, 90);
        assert_eq!(config.interval_seconds, 3600);
    }

    #[test]
    fn test_should_prune() {
        let config = RetentionConfig::default();
        let now = Utc::now();
        assert!(!config.should_prune(&reflection(1, 0, 0), now));
        assert!(config.should_prune(&reflection(120, 5, 0), now));
        // (0+1)/(0+5+2) ≈ 0.14 with enough observations
        assert!(config.should_prune(&reflection(1, 0, 5), now));
        // Low score but too few observations to judge
        assert!(!config.should_prune(&reflection(1, 0, 2), now));
    }

    #[test]
    fn test_huge_max_age_never_expires() {
        let config = RetentionConfig {
            max_age_days: i64::MAX / 2,
            ..RetentionConfig::default()
        };
        let now = Utc::now();
        assert!(!config.should_prune(&reflection(5000, 2, 0), now));
        // Effectiveness rule still applies
        assert!(config.should_prune(&reflection(1, 0, 5), now));
    }

    #[tokio::test]
    async fn test_prune_cycle() {
        let repo = Arc::new(InMemoryReflectionRepository::new());
        let keep = reflection(1, 2, 0);
        repo.create_reflection(&keep).await.unwrap();
        repo.create_reflection(&reflection(200, 0, 0)).await.unwrap();
        repo.create_reflection(&reflection(1, 0, 6)).await.unwrap();

        let bus = MockEventBus::new();
        let pruner = ReflectionPruner::new(repo.clone(), Arc::new(bus.clone()), RetentionConfig::default());

        assert_eq!(pruner.prune_cycle().await.unwrap(), 2);
        let remaining = repo.all_reflections().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, keep.id);
        assert_eq!(bus.event_types(), vec!["reflections_pruned"]);

        assert_eq!(pruner.prune_cycle().await.unwrap(), 0);
        assert_eq!(bus.get_events().len(), 1);
    }

    #[tokio::test]
    async fn test_pruner_disabled() {
        let repo = Arc::new(InMemoryReflectionRepository::new());
        let pruner = Arc::new(ReflectionPruner::new(
            repo,
            Arc::new(MockEventBus::new()),
            RetentionConfig::default(),
        ));

        let handle = pruner.start();
        let result = tokio::time::timeout(Duration::from_millis(200), handle).await;
        assert!(result.is_ok(), "disabled pruner should exit immediately");
    }

    #[tokio::test]
    async fn test_pruner_shutdown() {
        let repo = Arc::new(InMemoryReflectionRepository::new());
        let config = RetentionConfig {
            enabled: true,
            interval_seconds: 1,
            ..RetentionConfig::default()
        };
        let pruner = Arc::new(ReflectionPruner::new(repo, Arc::new(MockEventBus::new()), config));
        let token = pruner.shutdown_token();

        let handle = pruner.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(2), handle).await;
        assert!(result.is_ok(), "pruner should stop after cancellation");
    }
}
