// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # FixMemory: verified fixes indexed by signature
//!
//! One verified fix becomes reusable for every later error that shares its
//! signature or, failing that, its category.
//!
//! ## Recording
//!
//! - Only analyses with a verified resolution are recorded.
//! - An entry with the same signature is overwritten in place.
//! - Over capacity, the oldest entries are dropped from the front (FIFO).
//!
//! ## Concurrency
//!
//! Each workspace's `load → mutate → save` cycle runs under a
//! per-`FixMemory` async mutex. [`FixMemoryRegistry`] hands out one
//! `FixMemory` per workspace so all writers share that lock.

use dashmap::DashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{publish_event, EventBus};
use crate::domain::{
    Analysis, DiagnosticEvent, ErrorCategory, ErrorSignature, FixMemoryEntry, FixStore,
    RepositoryError,
};

pub const DEFAULT_CAPACITY: usize = 1000;
pub const DEFAULT_SIMILAR_LIMIT: usize = 5;

/// Root directory of a workspace whose fix memory is shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkspaceRef(PathBuf);

impl WorkspaceRef {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self(root.into())
    }

    pub fn root(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for WorkspaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

pub struct FixMemory {
    store: Arc<dyn FixStore>,
    event_bus: Arc<dyn EventBus>,
    write_lock: Mutex<()>,
    capacity: usize,
    similar_limit: usize,
}

impl FixMemory {
    pub fn new(store: Arc<dyn FixStore>, event_bus: Arc<dyn EventBus>) -> Self {
        Self {
            store,
            event_bus,
            write_lock: Mutex::new(()),
            capacity: DEFAULT_CAPACITY,
            similar_limit: DEFAULT_SIMILAR_LIMIT,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_similar_limit(mut self, limit: usize) -> Self {
        self.similar_limit = limit;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn entries(&self) -> Result<Vec<FixMemoryEntry>, RepositoryError> {
        self.store.load().await
    }

    /// Exact signature matches (verified or not); if there are none, the most
    /// recent verified entries sharing `category`.
    pub async fn find_similar(
        &self,
        signature: &ErrorSignature,
        category: ErrorCategory,
    ) -> Result<Vec<FixMemoryEntry>, RepositoryError> {
        let entries = self.store.load().await?;
        let similar = select_similar(&entries, signature, category, self.similar_limit);
        debug!(
            signature = %signature,
            category = %category,
            found = similar.len(),
            "Fix memory lookup"
        );
        Ok(similar)
    }

    /// Promote a verified resolution into fix memory.
    ///
    /// Returns the written entry, or `None` when the analysis is not verified.
    pub async fn record(&self, analysis: &Analysis) -> Result<Option<FixMemoryEntry>, RepositoryError> {
        let Some(entry) = FixMemoryEntry::from_verified(analysis) else {
            debug!(analysis_id = %analysis.id, "Resolution not verified, fix memory unchanged");
            return Ok(None);
        };

        let (replaced, evicted) = {
            let _guard = self.write_lock.lock().await;
            let mut entries = self.store.load().await?;
            let outcome = upsert(&mut entries, entry.clone(), self.capacity);
            self.store.save(&entries).await?;
            outcome
        };

        info!(
            fix_id = %entry.id,
            signature = %entry.signature,
            category = %entry.category,
            replaced,
            "Recorded verified fix"
        );

        publish_event(
            self.event_bus.as_ref(),
            DiagnosticEvent::FixRecorded {
                fix_id: entry.id,
                signature: entry.signature.clone(),
                category: entry.category,
                replaced,
                timestamp: entry.timestamp,
            },
        )
        .await;

        if evicted > 0 {
            info!(evicted, capacity = self.capacity, "Evicted oldest fixes over capacity");
            publish_event(
                self.event_bus.as_ref(),
                DiagnosticEvent::FixesEvicted {
                    count: evicted,
                    capacity: self.capacity,
                    timestamp: entry.timestamp,
                },
            )
            .await;
        }

        Ok(Some(entry))
    }
}

fn select_similar(
    entries: &[FixMemoryEntry],
    signature: &ErrorSignature,
    category: ErrorCategory,
    limit: usize,
) -> Vec<FixMemoryEntry> {
    let exact: Vec<FixMemoryEntry> = entries
        .iter()
        .filter(|e| &e.signature == signature)
        .cloned()
        .collect();
    if !exact.is_empty() {
        return exact;
    }

    let mut same_category: Vec<FixMemoryEntry> = entries
        .iter()
        .filter(|e| e.verified && e.category == category)
        .cloned()
        .collect();
    same_category.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    same_category.truncate(limit);
    same_category
}

/// Overwrite by signature or append, then trim the front to `capacity`.
/// Returns `(replaced, evicted)`.
fn upsert(entries: &mut Vec<FixMemoryEntry>, entry: FixMemoryEntry, capacity: usize) -> (bool, usize) {
    let replaced = match entries.iter_mut().find(|e| e.signature == entry.signature) {
        Some(existing) => {
            *existing = entry;
            true
        }
        None => {
            entries.push(entry);
            false
        }
    };

    let evicted = entries.len().saturating_sub(capacity);
    if evicted > 0 {
        entries.drain(..evicted);
    }
    (replaced, evicted)
}

/// Resolves the backing store for a workspace.
pub trait FixStoreProvider: Send + Sync {
    fn store_for(&self, workspace: &WorkspaceRef) -> Arc<dyn FixStore>;
}

/// One [`FixMemory`] per workspace, created on first use.
pub struct FixMemoryRegistry {
    provider: Arc<dyn FixStoreProvider>,
    event_bus: Arc<dyn EventBus>,
    capacity: usize,
    similar_limit: usize,
    memories: DashMap<WorkspaceRef, Arc<FixMemory>>,
}

impl FixMemoryRegistry {
    pub fn new(provider: Arc<dyn FixStoreProvider>, event_bus: Arc<dyn EventBus>) -> Self {
        Self {
            provider,
            event_bus,
            capacity: DEFAULT_CAPACITY,
            similar_limit: DEFAULT_SIMILAR_LIMIT,
            memories: DashMap::new(),
        }
    }

    pub fn with_limits(mut self, capacity: usize, similar_limit: usize) -> Self {
        self.capacity = capacity;
        self.similar_limit = similar_limit;
        self
    }

    pub fn for_workspace(&self, workspace: &WorkspaceRef) -> Arc<FixMemory> {
        self.memories
            .entry(workspace.clone())
            .or_insert_with(|| {
                debug!(workspace = %workspace, "Opening fix memory");
                Arc::new(
                    FixMemory::new(self.provider.store_for(workspace), self.event_bus.clone())
                        .with_capacity(self.capacity)
                        .with_similar_limit(self.similar_limit),
                )
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::MockEventBus;
    use crate::domain::{ErrorObservation, SuggestionPolicy};
    use crate::infrastructure::InMemoryFixStore;
    use chrono::{Duration, Utc};

    fn memory(bus: &MockEventBus) -> FixMemory {
        FixMemory::new(Arc::new(InMemoryFixStore::new()), Arc::new(bus.clone()))
    }

    fn resolved(message: &str, code: Option<&str>, fix: &str, verified: bool) -> Analysis {
        let mut error = ErrorObservation::new(message);
        if let Some(code) = code {
            error = error.with_code(code);
        }
        let mut analysis = Analysis::assemble(error, &[], &SuggestionPolicy::default());
        analysis.resolve(fix, verified);
        analysis
    }

    #[tokio::test]
    async fn test_record_and_find_round_trip() {
        let bus = MockEventBus::new();
        let memory = memory(&bus);
        let analysis = resolved("File /a/b.txt not found", Some("ENOENT"), "create the file", true);

        let entry = memory.record(&analysis).await.unwrap().unwrap();
        let similar = memory
            .find_similar(&ErrorSignature::from_observation(&analysis.error), analysis.category)
            .await
            .unwrap();

        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].id, entry.id);
        assert_eq!(bus.event_types(), vec!["fix_recorded"]);
    }

    #[tokio::test]
    async fn test_unverified_is_noop() {
        let bus = MockEventBus::new();
        let memory = memory(&bus);
        let analysis = resolved("boom", None, "guess", false);

        assert!(memory.record(&analysis).await.unwrap().is_none());
        assert!(memory.entries().await.unwrap().is_empty());
        assert!(bus.get_events().is_empty());
    }

    #[tokio::test]
    async fn test_same_signature_overwrites() {
        let bus = MockEventBus::new();
        let memory = memory(&bus);

        memory
            .record(&resolved("File /a/b.txt not found", Some("ENOENT"), "first", true))
            .await
            .unwrap();
        memory
            .record(&resolved("File /x/y/z.txt not found", Some("ENOENT"), "second", true))
            .await
            .unwrap();

        let entries = memory.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].fix_applied, "second");

        match &bus.get_events()[1] {
            DiagnosticEvent::FixRecorded { replaced, .. } => assert!(*replaced),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fifo_eviction_over_capacity() {
        let bus = MockEventBus::new();
        let memory = memory(&bus).with_capacity(2);

        for (i, word) in ["alpha", "beta", "gamma"].iter().enumerate() {
            memory
                .record(&resolved(&format!("{word} exploded"), None, &format!("fix {i}"), true))
                .await
                .unwrap();
        }

        let fixes: Vec<String> = memory
            .entries()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.fix_applied)
            .collect();
        assert_eq!(fixes, vec!["fix 1", "fix 2"]);
        assert!(bus.event_types().contains(&"fixes_evicted"));
    }

    #[tokio::test]
    async fn test_category_fallback_only_verified_newest_first() {
        let store = Arc::new(InMemoryFixStore::new());
        let now = Utc::now();
        let entry = |sig: &str, verified: bool, age_min: i64| FixMemoryEntry {
            id: crate::domain::FixId::new(),
            timestamp: now - Duration::minutes(age_min),
            signature: ErrorSignature::from_observation(&ErrorObservation::new(sig).with_code("ETIMEDOUT")),
            category: ErrorCategory::Network,
            root_cause: "rc".to_string(),
            fix_applied: sig.to_string(),
            verified,
            related_ids: vec![],
        };
        let mut seeded: Vec<FixMemoryEntry> = (0..7).map(|i| entry(&format!("verified {}", "x".repeat(i + 1)), true, i as i64)).collect();
        seeded.push(entry("unverified", false, 0));
        store.save(&seeded).await.unwrap();

        let memory = FixMemory::new(store, Arc::new(MockEventBus::new()));
        let other = ErrorSignature::from_observation(&ErrorObservation::new("socket hang up"));
        let similar = memory.find_similar(&other, ErrorCategory::Network).await.unwrap();

        assert_eq!(similar.len(), DEFAULT_SIMILAR_LIMIT);
        assert!(similar.iter().all(|e| e.verified));
        assert!(similar.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        assert!(memory.find_similar(&other, ErrorCategory::Auth).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exact_match_includes_unverified() {
        let store = Arc::new(InMemoryFixStore::new());
        let signature = ErrorSignature::from_observation(&ErrorObservation::new("boom"));
        store
            .save(&[FixMemoryEntry {
                id: crate::domain::FixId::new(),
                timestamp: Utc::now(),
                signature: signature.clone(),
                category: ErrorCategory::Unknown,
                root_cause: "rc".to_string(),
                fix_applied: "imported".to_string(),
                verified: false,
                related_ids: vec![],
            }])
            .await
            .unwrap();

        let memory = FixMemory::new(store, Arc::new(MockEventBus::new()));
        let similar = memory.find_similar(&signature, ErrorCategory::Unknown).await.unwrap();
        assert_eq!(similar.len(), 1);
        assert!(!similar[0].verified);
    }

    #[tokio::test]
    async fn test_concurrent_records_are_not_lost() {
        let memory = Arc::new(memory(&MockEventBus::new()));
        let mut handles = Vec::new();
        for i in 0..20 {
            let memory = memory.clone();
            handles.push(tokio::spawn(async move {
                let word: String = std::iter::repeat('z').take(i + 1).collect();
                memory
                    .record(&resolved(&format!("{word} failed"), None, "fix", true))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(memory.entries().await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_registry_shares_memory_per_workspace() {
        struct Provider;
        impl FixStoreProvider for Provider {
            fn store_for(&self, _workspace: &WorkspaceRef) -> Arc<dyn FixStore> {
                Arc::new(InMemoryFixStore::new())
            }
        }

        let registry = FixMemoryRegistry::new(Arc::new(Provider), Arc::new(MockEventBus::new()))
            .with_limits(10, 2);
        let a = registry.for_workspace(&WorkspaceRef::new("/work/a"));
        let a_again = registry.for_workspace(&WorkspaceRef::new("/work/a"));
        let b = registry.for_workspace(&WorkspaceRef::new("/work/b"));

        assert!(Arc::ptr_eq(&a, &a_again));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.capacity(), 10);
    }
}
