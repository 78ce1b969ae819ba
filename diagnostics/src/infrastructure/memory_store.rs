// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory store implementations
//! Used by tests and by callers that do not need durability

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::application::{FixStoreProvider, WorkspaceRef};
use crate::domain::{
    rank_relevant, ActorSummary, EpisodeId, EpisodicRecord, FixMemoryEntry, FixStore, Reflection,
    ReflectionId, ReflectionRepository, ReflexionStats, RepositoryError,
};

#[derive(Default)]
pub struct InMemoryFixStore {
    entries: RwLock<Vec<FixMemoryEntry>>,
}

impl InMemoryFixStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FixStore for InMemoryFixStore {
    async fn load(&self) -> Result<Vec<FixMemoryEntry>, RepositoryError> {
        Ok(self.entries.read().clone())
    }

    async fn save(&self, entries: &[FixMemoryEntry]) -> Result<(), RepositoryError> {
        *self.entries.write() = entries.to_vec();
        Ok(())
    }
}

/// A fresh in-memory store per workspace
pub struct InMemoryFixStoreProvider;

impl FixStoreProvider for InMemoryFixStoreProvider {
    fn store_for(&self, _workspace: &WorkspaceRef) -> Arc<dyn FixStore> {
        Arc::new(InMemoryFixStore::new())
    }
}

/// Episodes and reflections as one document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct ReflexionState {
    #[serde(default)]
    pub episodes: Vec<EpisodicRecord>,
    #[serde(default)]
    pub reflections: Vec<Reflection>,
}

impl ReflexionState {
    pub fn update_effectiveness(&mut self, id: ReflectionId, helped: bool) -> Result<Reflection, RepositoryError> {
        let reflection = self
            .reflections
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Reflection {} not found", id)))?;
        reflection.record_outcome(helped);
        Ok(reflection.clone())
    }

    pub fn delete_reflection(&mut self, id: ReflectionId) -> Result<(), RepositoryError> {
        let before = self.reflections.len();
        self.reflections.retain(|r| r.id != id);
        if self.reflections.len() == before {
            return Err(RepositoryError::NotFound(format!("Reflection {} not found", id)));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryReflectionRepository {
    state: RwLock<ReflexionState>,
}

impl InMemoryReflectionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReflectionRepository for InMemoryReflectionRepository {
    async fn create_episodic_record(&self, record: &EpisodicRecord) -> Result<EpisodeId, RepositoryError> {
        self.state.write().episodes.push(record.clone());
        Ok(record.id)
    }

    async fn create_reflection(&self, reflection: &Reflection) -> Result<ReflectionId, RepositoryError> {
        self.state.write().reflections.push(reflection.clone());
        Ok(reflection.id)
    }

    async fn find_relevant_reflections(
        &self,
        task_type: &str,
        keywords: &[String],
        limit: usize,
    ) -> Result<Vec<Reflection>, RepositoryError> {
        Ok(rank_relevant(&self.state.read().reflections, task_type, keywords, limit))
    }

    async fn update_reflection_effectiveness(
        &self,
        id: ReflectionId,
        helped: bool,
    ) -> Result<Reflection, RepositoryError> {
        self.state.write().update_effectiveness(id, helped)
    }

    async fn find_reflection(&self, id: ReflectionId) -> Result<Option<Reflection>, RepositoryError> {
        Ok(self.state.read().reflections.iter().find(|r| r.id == id).cloned())
    }

    async fn all_reflections(&self) -> Result<Vec<Reflection>, RepositoryError> {
        Ok(self.state.read().reflections.clone())
    }

    async fn delete_reflection(&self, id: ReflectionId) -> Result<(), RepositoryError> {
        self.state.write().delete_reflection(id)
    }

    async fn stats(&self) -> Result<ReflexionStats, RepositoryError> {
        let state = self.state.read();
        Ok(ReflexionStats::compute(&state.episodes, &state.reflections))
    }

    async fn actor_summary(&self, actor: &str) -> Result<ActorSummary, RepositoryError> {
        let state = self.state.read();
        Ok(ActorSummary::compute(actor, &state.episodes, &state.reflections))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{effectiveness, OutcomeStatus};
    use chrono::Utc;

    fn reflection(task_type: &str) -> Reflection {
        Reflection {
            id: ReflectionId::new(),
            timestamp: Utc::now(),
            actor: "builder".to_string(),
            task_type: task_type.to_string(),
            task_description: "desc".to_string(),
            attempt_number: 1,
            outcome: OutcomeStatus::Failure,
            root_cause: "rc".to_string(),
            specific_error: "err".to_string(),
            correction_action: "act".to_string(),
            correction_reasoning: "why".to_string(),
            correction_confidence: 0.5,
            keywords: vec!["api".to_string()],
            times_helped: 0,
            times_failed: 0,
            effectiveness_score: effectiveness(0, 0),
        }
    }

    #[test]
    fn test_fix_store_starts_empty() {
        let store = InMemoryFixStore::new();
        let entries = tokio_test::block_on(store.load()).unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_find_relevant_and_update() {
        let repo = InMemoryReflectionRepository::new();
        let r = reflection("deploy");
        repo.create_reflection(&r).await.unwrap();
        repo.create_reflection(&reflection("lint")).await.unwrap();

        let found = repo.find_relevant_reflections("DEPLOY", &[], 3).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, r.id);

        let updated = repo.update_reflection_effectiveness(r.id, true).await.unwrap();
        assert_eq!(updated.times_helped, 1);
        let stored = repo.find_reflection(r.id).await.unwrap().unwrap();
        assert_eq!(stored.effectiveness_score, updated.effectiveness_score);
    }

    #[tokio::test]
    async fn test_missing_reflection_is_not_found() {
        let repo = InMemoryReflectionRepository::new();
        assert!(matches!(
            repo.update_reflection_effectiveness(ReflectionId::new(), true).await,
            Err(RepositoryError::NotFound(_))
        ));
        assert!(matches!(
            repo.delete_reflection(ReflectionId::new()).await,
            Err(RepositoryError::NotFound(_))
        ));
    }
}
