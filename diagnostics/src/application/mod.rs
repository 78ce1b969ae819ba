// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application
//!
//! Services that drive the domain through the store contracts.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Fix memory, analysis orchestration, the reflexion loop,
//!   retry wrapping and reflection retention

pub mod analysis_service;
pub mod fix_memory;
pub mod reflection_pruner;
pub mod reflexion;
pub mod retry;

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use crate::domain::DiagnosticEvent;

pub use analysis_service::AnalysisService;
pub use fix_memory::{FixMemory, FixMemoryRegistry, FixStoreProvider, WorkspaceRef};
pub use reflection_pruner::{ReflectionPruner, RetentionConfig};
pub use reflexion::{ReflexionConfig, ReflexionResult, ReflexionService, TaskContext, TaskOutcome};
pub use retry::{retry_with_analysis, Diagnosable, RetryPolicy};

/// Event bus trait for publishing domain events
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: DiagnosticEvent) -> Result<()>;
}

/// Publish and log on failure. Event delivery never fails the calling operation.
pub(crate) async fn publish_event(bus: &dyn EventBus, event: DiagnosticEvent) {
    let event_type = event.event_type();
    if let Err(e) = bus.publish(event).await {
        warn!(event_type, "Failed to publish diagnostic event: {}", e);
    }
}
