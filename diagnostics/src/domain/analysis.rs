// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Analysis
//!
//! One diagnosis per error occurrence. Assembled from the classifier,
//! signature, decomposition, hypotheses and fix memory lookup.
//!
//! Suggested fixes list fix-memory suggestions first, then
//! hypothesis-derived ones; each group is capped by [`SuggestionPolicy`].
//!
//! The only mutable part is `resolution`:
//!
//! | resolution | state |
//! |------------|-------|
//! | `None` | `Pending` |
//! | `Some(verified = true)` | `ResolvedVerified` |
//! | `Some(verified = false)` | `ResolvedUnverified` |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::category::ErrorCategory;
use super::classifier::classify;
use super::decomposition::{decompose, Decomposition};
use super::fix::{FixId, FixMemoryEntry};
use super::hypothesis::{hypotheses, Hypothesis};
use super::observation::ErrorObservation;
use super::signature::ErrorSignature;

/// `ERR-<unix millis>-<random suffix>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisId(pub String);

impl AnalysisId {
    pub fn generate() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("ERR-{}-{}", Utc::now().timestamp_millis(), &suffix[..9]))
    }
}

impl fmt::Display for AnalysisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuggestionSource {
    FixMemory { fix_id: FixId, verified: bool },
    Hypothesis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedFix {
    pub description: String,
    /// 0..=100
    pub confidence: u8,
    pub source: SuggestionSource,
}

/// Caps and confidences used when merging suggestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionPolicy {
    #[serde(default = "default_max_suggestions")]
    pub max_from_memory: usize,
    #[serde(default = "default_max_suggestions")]
    pub max_from_hypotheses: usize,
    #[serde(default = "default_verified_confidence")]
    pub verified_confidence: u8,
    #[serde(default = "default_unverified_confidence")]
    pub unverified_confidence: u8,
}

fn default_max_suggestions() -> usize {
    3
}

fn default_verified_confidence() -> u8 {
    90
}

fn default_unverified_confidence() -> u8 {
    70
}

impl Default for SuggestionPolicy {
    fn default() -> Self {
        Self {
            max_from_memory: default_max_suggestions(),
            max_from_hypotheses: default_max_suggestions(),
            verified_confidence: default_verified_confidence(),
            unverified_confidence: default_unverified_confidence(),
        }
    }
}

impl SuggestionPolicy {
    pub fn merge(&self, similar: &[FixMemoryEntry], hypotheses: &[Hypothesis]) -> Vec<SuggestedFix> {
        let from_memory = similar.iter().take(self.max_from_memory).map(|entry| SuggestedFix {
            description: entry.fix_applied.clone(),
            confidence: if entry.verified {
                self.verified_confidence
            } else {
                self.unverified_confidence
            },
            source: SuggestionSource::FixMemory {
                fix_id: entry.id,
                verified: entry.verified,
            },
        });

        let from_hypotheses = hypotheses
            .iter()
            .take(self.max_from_hypotheses)
            .map(|h| SuggestedFix {
                description: format!("{}: {}", h.description, h.test_method),
                confidence: h.likelihood,
                source: SuggestionSource::Hypothesis,
            });

        from_memory.chain(from_hypotheses).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub fix_applied: String,
    pub verified: bool,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionState {
    Pending,
    ResolvedVerified,
    ResolvedUnverified,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub id: AnalysisId,
    pub timestamp: DateTime<Utc>,
    pub error: ErrorObservation,
    pub category: ErrorCategory,
    pub signature: ErrorSignature,
    pub decomposition: Decomposition,
    pub hypotheses: Vec<Hypothesis>,
    pub related_fix_ids: Vec<FixId>,
    pub suggested_fixes: Vec<SuggestedFix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

impl Analysis {
    /// Run the pure components over `error` and merge in `similar` fixes.
    pub fn assemble(
        error: ErrorObservation,
        similar: &[FixMemoryEntry],
        policy: &SuggestionPolicy,
    ) -> Self {
        let category = classify(&error);
        let signature = ErrorSignature::from_observation(&error);
        Self::from_parts(error, category, signature, similar, policy)
    }

    pub(crate) fn from_parts(
        error: ErrorObservation,
        category: ErrorCategory,
        signature: ErrorSignature,
        similar: &[FixMemoryEntry],
        policy: &SuggestionPolicy,
    ) -> Self {
        let decomposition = decompose(&error, category);
        let hypotheses = hypotheses(&error, category);
        let suggested_fixes = policy.merge(similar, &hypotheses);

        Self {
            id: AnalysisId::generate(),
            timestamp: Utc::now(),
            error,
            category,
            signature,
            decomposition,
            hypotheses,
            related_fix_ids: similar.iter().map(|entry| entry.id).collect(),
            suggested_fixes,
            resolution: None,
        }
    }

    pub fn resolve(&mut self, fix_applied: impl Into<String>, verified: bool) {
        self.resolution = Some(Resolution {
            fix_applied: fix_applied.into(),
            verified,
            resolved_at: Utc::now(),
        });
    }

    pub fn state(&self) -> ResolutionState {
        match &self.resolution {
            None => ResolutionState::Pending,
            Some(r) if r.verified => ResolutionState::ResolvedVerified,
            Some(_) => ResolutionState::ResolvedUnverified,
        }
    }

    pub fn top_suggestions(&self, n: usize) -> impl Iterator<Item = &SuggestedFix> {
        self.suggested_fixes.iter().take(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(fix: &str, verified: bool) -> FixMemoryEntry {
        FixMemoryEntry {
            id: FixId::new(),
            timestamp: Utc::now(),
            signature: ErrorSignature::from_observation(&ErrorObservation::new("x")),
            category: ErrorCategory::Network,
            root_cause: "rc".to_string(),
            fix_applied: fix.to_string(),
            verified,
            related_ids: vec![],
        }
    }

    #[test]
    fn test_analysis_id_format() {
        let id = AnalysisId::generate();
        let parts: Vec<&str> = id.0.splitn(3, '-').collect();
        assert_eq!(parts[0], "ERR");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert_ne!(AnalysisId::generate(), AnalysisId::generate());
    }

    #[test]
    fn test_memory_suggestions_come_first() {
        let similar = vec![entry("a", true), entry("b", false)];
        let analysis = Analysis::assemble(
            ErrorObservation::new("ETIMEDOUT").with_code("ETIMEDOUT"),
            &similar,
            &SuggestionPolicy::default(),
        );

        let confidences: Vec<u8> = analysis.suggested_fixes.iter().map(|s| s.confidence).collect();
        assert_eq!(analysis.suggested_fixes[0].description, "a");
        assert_eq!(confidences[0], 90);
        assert_eq!(confidences[1], 70);
        assert!(matches!(analysis.suggested_fixes[2].source, SuggestionSource::Hypothesis));
        assert_eq!(analysis.suggested_fixes[2].confidence, analysis.hypotheses[0].likelihood);
        assert_eq!(analysis.related_fix_ids.len(), 2);
    }

    #[test]
    fn test_each_group_capped() {
        let similar: Vec<_> = (0..5).map(|i| entry(&format!("fix {i}"), true)).collect();
        let analysis = Analysis::assemble(
            ErrorObservation::new("timeout"),
            &similar,
            &SuggestionPolicy::default(),
        );
        let memory = analysis
            .suggested_fixes
            .iter()
            .filter(|s| matches!(s.source, SuggestionSource::FixMemory { .. }))
            .count();
        assert_eq!(memory, 3);
        assert_eq!(analysis.suggested_fixes.len(), 6);
    }

    #[test]
    fn test_unknown_without_memory_has_single_suggestion() {
        let analysis = Analysis::assemble(
            ErrorObservation::new("something odd"),
            &[],
            &SuggestionPolicy::default(),
        );
        assert_eq!(analysis.category, ErrorCategory::Unknown);
        assert_eq!(analysis.suggested_fixes.len(), 1);
        assert_eq!(analysis.suggested_fixes[0].confidence, 100);
    }

    #[test]
    fn test_resolution_states() {
        let mut analysis =
            Analysis::assemble(ErrorObservation::new("x"), &[], &SuggestionPolicy::default());
        assert_eq!(analysis.state(), ResolutionState::Pending);
        analysis.resolve("guess", false);
        assert_eq!(analysis.state(), ResolutionState::ResolvedUnverified);
        analysis.resolve("real fix", true);
        assert_eq!(analysis.state(), ResolutionState::ResolvedVerified);
    }

    #[test]
    fn test_analysis_round_trips_json() {
        let analysis =
            Analysis::assemble(ErrorObservation::new("x"), &[entry("a", true)], &SuggestionPolicy::default());
        let json = serde_json::to_string(&analysis).unwrap();
        let back: Analysis = serde_json::from_str(&json).unwrap();
        assert_eq!(back, analysis);
    }
}
