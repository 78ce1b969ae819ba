// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Embedded engine
//!
//! Builds the diagnostics services in-process from the loaded configuration,
//! backed by the JSON files under the selected workspace.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use aegis_diagnostics::{
    AnalysisService, BroadcastEventBus, DiagnosticsConfig, FixMemory, FixMemoryRegistry,
    JsonFileReflectionRepository, JsonFileStoreProvider, ReflectionPruner, ReflexionService,
    WorkspaceRef,
};

pub struct EmbeddedEngine {
    pub config: DiagnosticsConfig,
    pub workspace: WorkspaceRef,
    event_bus: Arc<BroadcastEventBus>,
    analysis: AnalysisService,
}

impl EmbeddedEngine {
    pub fn new(config_path: Option<PathBuf>, workspace: PathBuf) -> Result<Self> {
        let config =
            DiagnosticsConfig::load_or_default(config_path).context("Failed to load configuration")?;
        config.validate().context("Configuration validation failed")?;

        let workspace = WorkspaceRef::new(workspace);
        debug!(workspace = %workspace, "Starting embedded diagnostics engine");

        let event_bus = Arc::new(BroadcastEventBus::with_default_capacity());
        let spec = &config.spec;
        let registry = Arc::new(
            FixMemoryRegistry::new(
                Arc::new(JsonFileStoreProvider::new(&spec.fix_memory.file_name)),
                event_bus.clone(),
            )
            .with_limits(spec.fix_memory.capacity, spec.fix_memory.similar_limit),
        );
        let analysis =
            AnalysisService::new(registry, event_bus.clone()).with_policy(spec.suggestions.clone());

        Ok(Self {
            config,
            workspace,
            event_bus,
            analysis,
        })
    }

    pub fn analysis(&self) -> &AnalysisService {
        &self.analysis
    }

    pub fn fix_memory(&self) -> Arc<FixMemory> {
        self.analysis.fix_memory().for_workspace(&self.workspace)
    }

    pub fn reflexion(&self) -> ReflexionService {
        ReflexionService::new(self.reflection_repository(), self.event_bus.clone())
            .with_config(self.config.spec.reflexion.loop_config.clone())
    }

    pub fn pruner(&self) -> ReflectionPruner {
        ReflectionPruner::new(
            self.reflection_repository(),
            self.event_bus.clone(),
            self.config.spec.retention.clone(),
        )
    }

    pub fn fix_memory_path(&self) -> PathBuf {
        self.config.fix_memory_path(&self.workspace)
    }

    pub fn reflexion_path(&self) -> PathBuf {
        self.config.reflexion_path(&self.workspace)
    }

    fn reflection_repository(&self) -> Arc<JsonFileReflectionRepository> {
        Arc::new(JsonFileReflectionRepository::new(self.reflexion_path()))
    }
}
