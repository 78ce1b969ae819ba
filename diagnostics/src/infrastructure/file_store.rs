// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! JSON file stores
//!
//! Fix memory is a JSON array of entries at `<workspace>/<file_name>`.
//! Reflexion memory is one JSON document holding episodes and reflections.
//! A missing file reads as empty. Writes go to a sibling temp file that is
//! renamed over the target, so readers never see a partial document.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::memory_store::ReflexionState;
use crate::application::{FixStoreProvider, WorkspaceRef};
use crate::domain::{
    rank_relevant, ActorSummary, EpisodeId, EpisodicRecord, FixMemoryEntry, FixStore, Reflection,
    ReflectionId, ReflectionRepository, ReflexionStats, RepositoryError,
};

pub const DEFAULT_FIX_MEMORY_FILE: &str = ".aegis/fix-memory.json";
pub const DEFAULT_REFLEXION_FILE: &str = ".aegis/reflexion.json";

async fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>, RepositoryError> {
    match tokio::fs::read(path).await {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(None),
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), RepositoryError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .ok_or_else(|| RepositoryError::Io(format!("Invalid store path: {}", path.display())))?;
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

pub struct JsonFileFixStore {
    path: PathBuf,
}

impl JsonFileFixStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FixStore for JsonFileFixStore {
    async fn load(&self) -> Result<Vec<FixMemoryEntry>, RepositoryError> {
        match read_if_exists(&self.path).await? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => {
                debug!(path = %self.path.display(), "No fix memory file, starting empty");
                Ok(Vec::new())
            }
        }
    }

    async fn save(&self, entries: &[FixMemoryEntry]) -> Result<(), RepositoryError> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        write_atomically(&self.path, &bytes).await?;
        debug!(path = %self.path.display(), entries = entries.len(), "Fix memory saved");
        Ok(())
    }
}

/// Resolves `<workspace root>/<file_name>` for each workspace
pub struct JsonFileStoreProvider {
    file_name: PathBuf,
}

impl JsonFileStoreProvider {
    pub fn new(file_name: impl Into<PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }
}

impl Default for JsonFileStoreProvider {
    fn default() -> Self {
        Self::new(DEFAULT_FIX_MEMORY_FILE)
    }
}

impl FixStoreProvider for JsonFileStoreProvider {
    fn store_for(&self, workspace: &WorkspaceRef) -> Arc<dyn FixStore> {
        Arc::new(JsonFileFixStore::new(workspace.root().join(&self.file_name)))
    }
}

/// Reflexion repository persisted as a single JSON document
pub struct JsonFileReflectionRepository {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileReflectionRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<ReflexionState, RepositoryError> {
        match read_if_exists(&self.path).await? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(ReflexionState::default()),
        }
    }

    async fn persist(&self, state: &ReflexionState) -> Result<(), RepositoryError> {
        let bytes = serde_json::to_vec_pretty(state)?;
        write_atomically(&self.path, &bytes).await
    }

    /// Load, mutate and save under the write lock.
    async fn modify<T: Send>(
        &self,
        f: impl FnOnce(&mut ReflexionState) -> Result<T, RepositoryError> + Send,
    ) -> Result<T, RepositoryError> {
        let _guard = self.lock.lock().await;
        let mut state = self.load().await?;
        let value = f(&mut state)?;
        self.persist(&state).await?;
        Ok(value)
    }
}

#[async_trait]
impl ReflectionRepository for JsonFileReflectionRepository {
    async fn create_episodic_record(&self, record: &EpisodicRecord) -> Result<EpisodeId, RepositoryError> {
        let record = record.clone();
        self.modify(move |state| {
            let id = record.id;
            state.episodes.push(record);
            Ok(id)
        })
        .await
    }

    async fn create_reflection(&self, reflection: &Reflection) -> Result<ReflectionId, RepositoryError> {
        let reflection = reflection.clone();
        self.modify(move |state| {
            let id = reflection.id;
            state.reflections.push(reflection);
            Ok(id)
        })
        .await
    }

    async fn find_relevant_reflections(
        &self,
        task_type: &str,
        keywords: &[String],
        limit: usize,
    ) -> Result<Vec<Reflection>, RepositoryError> {
        let state = self.load().await?;
        Ok(rank_relevant(&state.reflections, task_type, keywords, limit))
    }

    async fn update_reflection_effectiveness(
        &self,
        id: ReflectionId,
        helped: bool,
    ) -> Result<Reflection, RepositoryError> {
        self.modify(move |state| state.update_effectiveness(id, helped)).await
    }

    async fn find_reflection(&self, id: ReflectionId) -> Result<Option<Reflection>, RepositoryError> {
        let state = self.load().await?;
        Ok(state.reflections.into_iter().find(|r| r.id == id))
    }

    async fn all_reflections(&self) -> Result<Vec<Reflection>, RepositoryError> {
        Ok(self.load().await?.reflections)
    }

    async fn delete_reflection(&self, id: ReflectionId) -> Result<(), RepositoryError> {
        self.modify(move |state| state.delete_reflection(id)).await
    }

    async fn stats(&self) -> Result<ReflexionStats, RepositoryError> {
        let state = self.load().await?;
        Ok(ReflexionStats::compute(&state.episodes, &state.reflections))
    }

    async fn actor_summary(&self, actor: &str) -> Result<ActorSummary, RepositoryError> {
        let state = self.load().await?;
        Ok(ActorSummary::compute(actor, &state.episodes, &state.reflections))
    }
}
