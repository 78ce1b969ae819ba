// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # ReflexionService: learning from task outcomes
//!
//! Every outcome is logged as an episode. A failed task that carries an
//! error yields a [`Reflection`]: root cause and corrective action from the
//! category tables, plus keywords for later retrieval.
//!
//! ## Retry decision
//!
//! Prior reflections relevant to the task are fetched before the new one is
//! stored. A retry is advised while `attempt_number < max_attempts` and at
//! least one prior reflection scores above `effectiveness_threshold`. Their
//! corrective actions then form the context injected into the next attempt.
//!
//! ## Feedback
//!
//! `record_outcome` reports whether an injected reflection helped and
//! updates its Laplace-smoothed effectiveness.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use super::{publish_event, EventBus};
use crate::domain::decomposition::root_cause;
use crate::domain::{
    classify, effectiveness, extract_keywords, DiagnosticEvent, EpisodeId,
    EpisodicRecord, ErrorObservation, OutcomeStatus, Reflection, ReflectionId,
    ReflectionRepository, RepositoryError,
};

const INJECTED_CONTEXT_HEADER: &str = "Lessons from previous attempts at this task:";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflexionConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retrieval_limit")]
    pub retrieval_limit: usize,
    #[serde(default = "default_effectiveness_threshold")]
    pub effectiveness_threshold: f64,
    #[serde(default = "default_max_keywords")]
    pub max_keywords: usize,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retrieval_limit() -> usize {
    3
}

fn default_effectiveness_threshold() -> f64 {
    0.5
}

fn default_max_keywords() -> usize {
    10
}

impl Default for ReflexionConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retrieval_limit: default_retrieval_limit(),
            effectiveness_threshold: default_effectiveness_threshold(),
            max_keywords: default_max_keywords(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskContext {
    pub actor: String,
    pub task_type: String,
    pub task_description: String,
    /// 1-based
    pub attempt_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl TaskContext {
    pub fn new(
        actor: impl Into<String>,
        task_type: impl Into<String>,
        task_description: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.into(),
            task_type: task_type.into(),
            task_description: task_description.into(),
            attempt_number: 1,
            context: None,
        }
    }

    pub fn with_attempt(mut self, attempt_number: u32) -> Self {
        self.attempt_number = attempt_number;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObservation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson: Option<String>,
}

impl TaskOutcome {
    pub fn success() -> Self {
        Self {
            status: OutcomeStatus::Success,
            error: None,
            lesson: None,
        }
    }

    pub fn failure(error: ErrorObservation) -> Self {
        Self {
            status: OutcomeStatus::Failure,
            error: Some(error),
            lesson: None,
        }
    }

    pub fn partial(error: Option<ErrorObservation>) -> Self {
        Self {
            status: OutcomeStatus::Partial,
            error,
            lesson: None,
        }
    }

    pub fn with_lesson(mut self, lesson: impl Into<String>) -> Self {
        self.lesson = Some(lesson.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflexionResult {
    pub episodic_id: EpisodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection_id: Option<ReflectionId>,
    pub prior_reflections: Vec<Reflection>,
    pub should_retry: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injected_context: Option<String>,
}

pub struct ReflexionService {
    repo: Arc<dyn ReflectionRepository>,
    event_bus: Arc<dyn EventBus>,
    config: ReflexionConfig,
}

impl ReflexionService {
    pub fn new(repo: Arc<dyn ReflectionRepository>, event_bus: Arc<dyn EventBus>) -> Self {
        Self {
            repo,
            event_bus,
            config: ReflexionConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReflexionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn repository(&self) -> &Arc<dyn ReflectionRepository> {
        &self.repo
    }

    pub async fn process_outcome(
        &self,
        task: &TaskContext,
        outcome: &TaskOutcome,
    ) -> Result<ReflexionResult, RepositoryError> {
        let category = outcome.error.as_ref().map(classify);

        let mut tags = vec![task.task_type.clone(), outcome.status.to_string()];
        if let Some(category) = category {
            tags.push(category.as_str().to_lowercase());
        }

        let episode = EpisodicRecord {
            id: EpisodeId::new(),
            timestamp: Utc::now(),
            actor: task.actor.clone(),
            event_kind: task.task_type.clone(),
            action: task.task_description.clone(),
            context: task.context.clone(),
            outcome: outcome.status,
            lesson: outcome.lesson.clone(),
            tags,
            importance: outcome.status.importance(),
        };
        let episodic_id = self.repo.create_episodic_record(&episode).await?;
        debug!(episode_id = %episodic_id, actor = %task.actor, outcome = %outcome.status, "Episode logged");

        publish_event(
            self.event_bus.as_ref(),
            DiagnosticEvent::EpisodeLogged {
                episode_id: episodic_id,
                actor: task.actor.clone(),
                outcome: outcome.status,
                timestamp: episode.timestamp,
            },
        )
        .await;

        let (Some(error), Some(category), false) = (&outcome.error, category, outcome.status.is_success()) else {
            return Ok(ReflexionResult {
                episodic_id,
                reflection_id: None,
                prior_reflections: Vec::new(),
                should_retry: false,
                injected_context: None,
            });
        };

        let keywords = extract_keywords(
            &task.task_type,
            &task.task_description,
            category,
            error.code.as_deref(),
            self.config.max_keywords,
        );

        // Fetch before storing so the new reflection is never its own prior.
        let prior_reflections = self
            .repo
            .find_relevant_reflections(&task.task_type, &keywords, self.config.retrieval_limit)
            .await?;

        let remediation = category.remediation();
        let reflection = Reflection {
            id: ReflectionId::new(),
            timestamp: Utc::now(),
            actor: task.actor.clone(),
            task_type: task.task_type.clone(),
            task_description: task.task_description.clone(),
            attempt_number: task.attempt_number,
            outcome: outcome.status,
            root_cause: root_cause(category).to_string(),
            specific_error: error.message.clone(),
            correction_action: remediation.action,
            correction_reasoning: remediation.reasoning,
            correction_confidence: remediation.confidence,
            keywords,
            times_helped: 0,
            times_failed: 0,
            effectiveness_score: effectiveness(0, 0),
        };
        let reflection_id = self.repo.create_reflection(&reflection).await?;

        info!(
            reflection_id = %reflection_id,
            actor = %task.actor,
            task_type = %task.task_type,
            category = %category,
            prior = prior_reflections.len(),
            "Reflection created"
        );

        publish_event(
            self.event_bus.as_ref(),
            DiagnosticEvent::ReflectionCreated {
                reflection_id,
                actor: task.actor.clone(),
                task_type: task.task_type.clone(),
                category,
                timestamp: reflection.timestamp,
            },
        )
        .await;

        let should_retry = task.attempt_number < self.config.max_attempts
            && prior_reflections
                .iter()
                .any(|r| r.effectiveness_score > self.config.effectiveness_threshold);

        let injected_context = (should_retry && !prior_reflections.is_empty())
            .then(|| render_injected_context(&prior_reflections));

        Ok(ReflexionResult {
            episodic_id,
            reflection_id: Some(reflection_id),
            prior_reflections,
            should_retry,
            injected_context,
        })
    }

    /// Report whether a reflection injected into a retry helped.
    pub async fn record_outcome(&self, id: ReflectionId, helped: bool) -> Result<Reflection, RepositoryError> {
        let updated = self.repo.update_reflection_effectiveness(id, helped).await?;
        let old_score = if helped {
            effectiveness(updated.times_helped.saturating_sub(1), updated.times_failed)
        } else {
            effectiveness(updated.times_helped, updated.times_failed.saturating_sub(1))
        };

        info!(
            reflection_id = %id,
            helped,
            old_score,
            new_score = updated.effectiveness_score,
            "Reflection effectiveness updated"
        );

        publish_event(
            self.event_bus.as_ref(),
            DiagnosticEvent::ReflectionEffectivenessUpdated {
                reflection_id: id,
                helped,
                old_score,
                new_score: updated.effectiveness_score,
                times_helped: updated.times_helped,
                times_failed: updated.times_failed,
                timestamp: Utc::now(),
            },
        )
        .await;

        Ok(updated)
    }
}

fn render_injected_context(reflections: &[Reflection]) -> String {
    let mut lines = vec![INJECTED_CONTEXT_HEADER.to_string()];
    lines.extend(reflections.iter().map(|r| {
        format!(
            "[{}%] {}",
            (r.effectiveness_score * 100.0).round() as u32,
            r.correction_action
        )
    }));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::MockEventBus;
    use crate::domain::ErrorCategory;
    use crate::infrastructure::InMemoryReflectionRepository;

    fn service(bus: &MockEventBus) -> (ReflexionService, Arc<InMemoryReflectionRepository>) {
        let repo = Arc::new(InMemoryReflectionRepository::new());
        (ReflexionService::new(repo.clone(), Arc::new(bus.clone())), repo)
    }

    fn deploy_task() -> TaskContext {
        TaskContext::new("builder", "deploy", "Deploy the API to production")
    }

    fn timeout() -> ErrorObservation {
        ErrorObservation::new("Connection timed out to api.example.com").with_code("ETIMEDOUT")
    }

    #[tokio::test]
    async fn test_success_logs_episode_only() {
        let bus = MockEventBus::new();
        let (service, repo) = service(&bus);

        let result = service.process_outcome(&deploy_task(), &TaskOutcome::success()).await.unwrap();

        assert!(result.reflection_id.is_none());
        assert!(!result.should_retry);
        assert!(result.injected_context.is_none());
        assert_eq!(repo.stats().await.unwrap().episodes, 1);
        assert_eq!(repo.stats().await.unwrap().reflections, 0);
        assert_eq!(bus.event_types(), vec!["episode_logged"]);
    }

    #[tokio::test]
    async fn test_failure_creates_reflection() {
        let bus = MockEventBus::new();
        let (service, repo) = service(&bus);

        let result = service
            .process_outcome(&deploy_task(), &TaskOutcome::failure(timeout()))
            .await
            .unwrap();

        let id = result.reflection_id.unwrap();
        let stored = repo.find_reflection(id).await.unwrap().unwrap();
        assert_eq!(stored.effectiveness_score, 0.5);
        assert_eq!(stored.correction_action, ErrorCategory::Network.remediation().action);
        assert_eq!(stored.specific_error, "Connection timed out to api.example.com");
        assert!(stored.keywords.contains(&"network".to_string()));
        assert!(stored.keywords.contains(&"etimedout".to_string()));
        assert!(result.prior_reflections.is_empty());
        assert!(!result.should_retry);
        assert_eq!(bus.event_types(), vec!["episode_logged", "reflection_created"]);
    }

    #[tokio::test]
    async fn test_failure_without_error_has_no_reflection() {
        let (service, _repo) = service(&MockEventBus::new());
        let outcome = TaskOutcome {
            status: OutcomeStatus::Failure,
            error: None,
            lesson: Some("ran out of time".to_string()),
        };
        let result = service.process_outcome(&deploy_task(), &outcome).await.unwrap();
        assert!(result.reflection_id.is_none());
    }

    #[tokio::test]
    async fn test_partial_with_error_reflects() {
        let (service, repo) = service(&MockEventBus::new());
        let result = service
            .process_outcome(&deploy_task(), &TaskOutcome::partial(Some(timeout())))
            .await
            .unwrap();
        assert!(result.reflection_id.is_some());
        assert_eq!(repo.stats().await.unwrap().partials, 1);
    }

    #[tokio::test]
    async fn test_fresh_reflection_does_not_trigger_retry() {
        let (service, _repo) = service(&MockEventBus::new());
        let first = service
            .process_outcome(&deploy_task(), &TaskOutcome::failure(timeout()))
            .await
            .unwrap();
        let second = service
            .process_outcome(&deploy_task().with_attempt(2), &TaskOutcome::failure(timeout()))
            .await
            .unwrap();

        assert_eq!(second.prior_reflections.len(), 1);
        assert_eq!(second.prior_reflections[0].id, first.reflection_id.unwrap());
        assert!(!second.should_retry);
        assert!(second.injected_context.is_none());
    }

    #[tokio::test]
    async fn test_helpful_reflection_enables_retry_with_context() {
        let (service, _repo) = service(&MockEventBus::new());
        let first = service
            .process_outcome(&deploy_task(), &TaskOutcome::failure(timeout()))
            .await
            .unwrap();
        service.record_outcome(first.reflection_id.unwrap(), true).await.unwrap();

        let retry = service
            .process_outcome(&deploy_task().with_attempt(2), &TaskOutcome::failure(timeout()))
            .await
            .unwrap();

        assert!(retry.should_retry);
        let context = retry.injected_context.unwrap();
        assert!(context.starts_with(INJECTED_CONTEXT_HEADER));
        assert!(context.contains(&format!(
            "[67%] {}",
            ErrorCategory::Network.remediation().action
        )));
    }

    #[tokio::test]
    async fn test_attempt_budget_blocks_retry() {
        let (service, _repo) = service(&MockEventBus::new());
        let first = service
            .process_outcome(&deploy_task(), &TaskOutcome::failure(timeout()))
            .await
            .unwrap();
        service.record_outcome(first.reflection_id.unwrap(), true).await.unwrap();

        let last = service
            .process_outcome(&deploy_task().with_attempt(3), &TaskOutcome::failure(timeout()))
            .await
            .unwrap();
        assert!(!last.prior_reflections.is_empty());
        assert!(!last.should_retry);
        assert!(last.injected_context.is_none());
    }

    #[tokio::test]
    async fn test_record_outcome_confidence_arithmetic() {
        let bus = MockEventBus::new();
        let (service, _repo) = service(&bus);
        let id = service
            .process_outcome(&deploy_task(), &TaskOutcome::failure(timeout()))
            .await
            .unwrap()
            .reflection_id
            .unwrap();

        let helped = service.record_outcome(id, true).await.unwrap();
        assert!((helped.effectiveness_score - 2.0 / 3.0).abs() < 1e-9);
        let failed = service.record_outcome(id, false).await.unwrap();
        assert_eq!(failed.effectiveness_score, 0.5);

        match bus.get_events().last().unwrap() {
            DiagnosticEvent::ReflectionEffectivenessUpdated { old_score, new_score, .. } => {
                assert!((old_score - 2.0 / 3.0).abs() < 1e-9);
                assert_eq!(*new_score, 0.5);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_record_outcome_unknown_id() {
        let (service, _repo) = service(&MockEventBus::new());
        let err = service.record_outcome(ReflectionId::new(), true).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }
}
