// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Category-keyed corrective actions used when synthesising reflections.

use serde::{Deserialize, Serialize};

use super::category::ErrorCategory;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Remediation {
    pub action: String,
    pub reasoning: String,
    /// 0.0..=1.0
    pub confidence: f64,
}

impl ErrorCategory {
    pub fn remediation(&self) -> Remediation {
        let (action, reasoning, confidence) = match self {
            ErrorCategory::Network => (
                "Retry with exponential backoff and verify the remote endpoint is reachable before calling it",
                "Network failures are usually transient; backoff absorbs blips while the reachability check exposes outages",
                0.7,
            ),
            ErrorCategory::Auth => (
                "Refresh or re-read credentials from the environment and confirm the required scopes before retrying",
                "Auth failures do not resolve by retrying with the same credentials",
                0.75,
            ),
            ErrorCategory::Syntax => (
                "Re-generate the affected file completely and run the parser or linter before writing it",
                "Syntax errors come from malformed output and are caught cheaply by a parse check",
                0.8,
            ),
            ErrorCategory::Runtime => (
                "Add guards for null or undefined values and validate value shapes at the failing call site",
                "Runtime errors trace back to unchecked assumptions about values",
                0.6,
            ),
            ErrorCategory::Resource => (
                "Verify the path exists and is accessible before use, creating directories or fixing permissions as needed",
                "Missing or protected resources fail deterministically until the environment changes",
                0.7,
            ),
            ErrorCategory::Config => (
                "List required configuration up front and fail fast with a clear message when a value is missing",
                "Configuration gaps repeat on every attempt until the setting is supplied",
                0.75,
            ),
            ErrorCategory::Dependency => (
                "Install or pin the missing dependency and confirm the import path matches the package exports",
                "Dependency errors persist until the installed graph matches what the code imports",
                0.8,
            ),
            ErrorCategory::State => (
                "Reload current state before mutating it and make the operation idempotent",
                "State conflicts arise from acting on stale or concurrently modified data",
                0.6,
            ),
            ErrorCategory::Unknown => (
                "Capture the full error output and reproduce the failure in isolation before changing code",
                "Without a recognised pattern the safest correction is more information",
                0.3,
            ),
        };
        Remediation {
            action: action.to_string(),
            reasoning: reasoning.to_string(),
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_in_unit_range() {
        for category in ErrorCategory::ALL {
            let r = category.remediation();
            assert!((0.0..=1.0).contains(&r.confidence), "{category}");
            assert!(!r.action.is_empty());
        }
    }

    #[test]
    fn test_unknown_is_least_confident() {
        let unknown = ErrorCategory::Unknown.remediation().confidence;
        assert!(ErrorCategory::ALL
            .iter()
            .filter(|c| **c != ErrorCategory::Unknown)
            .all(|c| c.remediation().confidence > unknown));
    }
}
