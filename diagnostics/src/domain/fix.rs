// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Fix memory entries: verified corrections indexed by error signature.
//!
//! Persisted as a JSON array with camelCase fields
//! (`id, timestamp, signature, category, rootCause, fixApplied, verified, relatedIds`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::analysis::Analysis;
use super::category::ErrorCategory;
use super::signature::ErrorSignature;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FixId(pub Uuid);

impl FixId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FixId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FixId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixMemoryEntry {
    pub id: FixId,
    pub timestamp: DateTime<Utc>,
    pub signature: ErrorSignature,
    pub category: ErrorCategory,
    pub root_cause: String,
    pub fix_applied: String,
    pub verified: bool,
    #[serde(default)]
    pub related_ids: Vec<FixId>,
}

impl FixMemoryEntry {
    /// Build an entry from a resolved analysis. `None` unless the resolution is verified.
    pub fn from_verified(analysis: &Analysis) -> Option<Self> {
        let resolution = analysis.resolution.as_ref().filter(|r| r.verified)?;
        Some(Self {
            id: FixId::new(),
            timestamp: resolution.resolved_at,
            signature: analysis.signature.clone(),
            category: analysis.category,
            root_cause: analysis.decomposition.root_cause.clone(),
            fix_applied: resolution.fix_applied.clone(),
            verified: true,
            related_ids: analysis.related_fix_ids.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::SuggestionPolicy;
    use crate::domain::observation::ErrorObservation;

    fn analysis() -> Analysis {
        Analysis::assemble(ErrorObservation::new("boom"), &[], &SuggestionPolicy::default())
    }

    #[test]
    fn test_pending_analysis_yields_nothing() {
        assert!(FixMemoryEntry::from_verified(&analysis()).is_none());
    }

    #[test]
    fn test_unverified_resolution_yields_nothing() {
        let mut a = analysis();
        a.resolve("tried something", false);
        assert!(FixMemoryEntry::from_verified(&a).is_none());
    }

    #[test]
    fn test_verified_resolution_builds_entry() {
        let mut a = analysis();
        a.resolve("restarted the worker", true);
        let entry = FixMemoryEntry::from_verified(&a).unwrap();
        assert_eq!(entry.signature, a.signature);
        assert_eq!(entry.category, a.category);
        assert_eq!(entry.fix_applied, "restarted the worker");
        assert_eq!(entry.root_cause, a.decomposition.root_cause);
        assert!(entry.verified);
    }

    #[test]
    fn test_persisted_field_names() {
        let mut a = analysis();
        a.resolve("fix", true);
        let entry = FixMemoryEntry::from_verified(&a).unwrap();
        let json = serde_json::to_value(&entry).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["category", "fixApplied", "id", "relatedIds", "rootCause", "signature", "timestamp", "verified"]
        );
    }
}
