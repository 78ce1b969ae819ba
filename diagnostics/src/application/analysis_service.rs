// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # AnalysisService: error analysis orchestration
//!
//! Classifies, fingerprints, looks up fix memory, decomposes and ranks
//! hypotheses, then merges everything into one [`Analysis`].
//!
//! `analyze` never fails. An unreadable fix memory degrades to "no similar
//! fixes" and the pure components still produce a complete analysis. Only
//! `resolve` can surface a storage error, after the analysis already exists.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::fix_memory::{FixMemoryRegistry, WorkspaceRef};
use super::{publish_event, EventBus};
use crate::domain::{
    classify, Analysis, DiagnosticEvent, ErrorObservation, ErrorSignature, RepositoryError,
    SuggestionPolicy,
};

pub struct AnalysisService {
    fix_memory: Arc<FixMemoryRegistry>,
    event_bus: Arc<dyn EventBus>,
    policy: SuggestionPolicy,
}

impl AnalysisService {
    pub fn new(fix_memory: Arc<FixMemoryRegistry>, event_bus: Arc<dyn EventBus>) -> Self {
        Self {
            fix_memory,
            event_bus,
            policy: SuggestionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: SuggestionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn fix_memory(&self) -> &FixMemoryRegistry {
        &self.fix_memory
    }

    pub(crate) fn event_bus(&self) -> &dyn EventBus {
        self.event_bus.as_ref()
    }

    pub async fn analyze(&self, workspace: &WorkspaceRef, error: ErrorObservation) -> Analysis {
        let category = classify(&error);
        let signature = ErrorSignature::from_observation(&error);

        let similar = match self
            .fix_memory
            .for_workspace(workspace)
            .find_similar(&signature, category)
            .await
        {
            Ok(similar) => similar,
            Err(e) => {
                warn!(
                    workspace = %workspace,
                    "Fix memory unavailable, continuing without similar fixes: {}", e
                );
                Vec::new()
            }
        };

        let analysis = Analysis::from_parts(error, category, signature, &similar, &self.policy);

        debug!(
            analysis_id = %analysis.id,
            category = %analysis.category,
            signature = %analysis.signature,
            related_fixes = analysis.related_fix_ids.len(),
            suggestions = analysis.suggested_fixes.len(),
            "Error analyzed"
        );

        publish_event(
            self.event_bus.as_ref(),
            DiagnosticEvent::ErrorAnalyzed {
                analysis_id: analysis.id.clone(),
                category: analysis.category,
                signature: analysis.signature.clone(),
                related_fixes: analysis.related_fix_ids.len(),
                timestamp: analysis.timestamp,
            },
        )
        .await;

        analysis
    }

    /// Attach a resolution and record it when verified.
    ///
    /// Returns `true` when an entry was written to fix memory.
    pub async fn resolve(
        &self,
        workspace: &WorkspaceRef,
        analysis: &mut Analysis,
        fix_applied: impl Into<String>,
        verified: bool,
    ) -> Result<bool, RepositoryError> {
        analysis.resolve(fix_applied, verified);
        let recorded = self
            .fix_memory
            .for_workspace(workspace)
            .record(analysis)
            .await?
            .is_some();

        if recorded {
            info!(analysis_id = %analysis.id, workspace = %workspace, "Resolution promoted to fix memory");
        }
        Ok(recorded)
    }
}
