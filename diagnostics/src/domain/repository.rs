// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository interfaces for the diagnostics bounded context
//! Defines the contracts for fix memory and reflexion storage

use async_trait::async_trait;
use thiserror::Error;

use super::fix::FixMemoryEntry;
use super::reflection::{ActorSummary, EpisodeId, EpisodicRecord, Reflection, ReflectionId, ReflexionStats};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<std::io::Error> for RepositoryError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => RepositoryError::NotFound(err.to_string()),
            _ => RepositoryError::Io(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

/// Whole-collection store for one workspace's fix memory.
///
/// `load` on a store that was never written returns an empty list.
#[async_trait]
pub trait FixStore: Send + Sync {
    async fn load(&self) -> Result<Vec<FixMemoryEntry>, RepositoryError>;

    async fn save(&self, entries: &[FixMemoryEntry]) -> Result<(), RepositoryError>;
}

/// Repository for episodic records and reflections
#[async_trait]
pub trait ReflectionRepository: Send + Sync {
    async fn create_episodic_record(&self, record: &EpisodicRecord) -> Result<EpisodeId, RepositoryError>;

    async fn create_reflection(&self, reflection: &Reflection) -> Result<ReflectionId, RepositoryError>;

    /// Up to `limit` reflections ranked by relevance to the task
    async fn find_relevant_reflections(
        &self,
        task_type: &str,
        keywords: &[String],
        limit: usize,
    ) -> Result<Vec<Reflection>, RepositoryError>;

    /// Count one outcome against the reflection and return the updated record
    async fn update_reflection_effectiveness(
        &self,
        id: ReflectionId,
        helped: bool,
    ) -> Result<Reflection, RepositoryError>;

    async fn find_reflection(&self, id: ReflectionId) -> Result<Option<Reflection>, RepositoryError>;

    /// Get all reflections (for retention passes)
    async fn all_reflections(&self) -> Result<Vec<Reflection>, RepositoryError>;

    async fn delete_reflection(&self, id: ReflectionId) -> Result<(), RepositoryError>;

    async fn stats(&self) -> Result<ReflexionStats, RepositoryError>;

    async fn actor_summary(&self, actor: &str) -> Result<ActorSummary, RepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let err: RepositoryError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, RepositoryError::NotFound(_)));

        let err: RepositoryError = std::io::Error::other("disk on fire").into();
        assert!(matches!(err, RepositoryError::Io(_)));
    }

    #[test]
    fn test_serde_error_maps_to_serialization() {
        let parse = serde_json::from_str::<Vec<FixMemoryEntry>>("{not json").unwrap_err();
        let err: RepositoryError = parse.into();
        assert!(err.to_string().starts_with("Serialization error"));
    }
}
