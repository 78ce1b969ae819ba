// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Ranked candidate causes per category.

use serde::{Deserialize, Serialize};

use super::category::ErrorCategory;
use super::observation::ErrorObservation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hypothesis {
    pub description: String,
    /// 0..=100
    pub likelihood: u8,
    pub test_method: String,
}

type Row = (&'static str, u8, &'static str);

// Each table is kept sorted by likelihood, highest first.
fn table(category: ErrorCategory) -> &'static [Row] {
    match category {
        ErrorCategory::Network => &[
            ("Remote service is down or restarting", 40, "Check the endpoint health check or status page"),
            ("Request timeout is too short for the operation", 25, "Repeat the request with a longer timeout and compare"),
            ("DNS resolution or proxy misconfiguration", 20, "Resolve the hostname and inspect proxy environment variables"),
            ("Rate limiting or connection pool exhaustion", 15, "Inspect response headers and open connection counts"),
        ],
        ErrorCategory::Auth => &[
            ("Token or API key has expired", 40, "Decode the token or check key expiry in the provider console"),
            ("Credential missing from the environment", 30, "Print which auth variables are set (not their values)"),
            ("Identity lacks the required scope or role", 20, "Compare granted scopes with those the endpoint requires"),
            ("Credentials belong to a different environment", 10, "Verify the project or tenant the key was issued for"),
        ],
        ErrorCategory::Syntax => &[
            ("Incomplete or truncated generated code", 45, "Run the language parser or linter on the file"),
            ("Mismatched brackets, quotes or delimiters", 30, "Inspect the reported line and the lines just before it"),
            ("Language feature unsupported by the toolchain version", 15, "Check the compiler or runtime version against the syntax used"),
            ("Malformed JSON or YAML payload", 10, "Validate the payload with a strict parser"),
        ],
        ErrorCategory::Runtime => &[
            ("Null or undefined value accessed", 40, "Trace where the value is produced and add a guard"),
            ("Value has an unexpected type or shape", 30, "Log the value's type and structure before the failing call"),
            ("API changed and the called function no longer exists", 20, "Check the dependency changelog for removed or renamed functions"),
            ("Unbounded recursion", 10, "Inspect the stack trace for repeating frames"),
        ],
        ErrorCategory::Resource => &[
            ("Referenced file or directory does not exist", 40, "List the path and its parent directory"),
            ("Process lacks permission for the path", 30, "Check ownership and mode bits against the running user"),
            ("Disk, memory or descriptor limit reached", 20, "Check free disk, memory usage and ulimit values"),
            ("Path built from a wrong working directory", 10, "Print the working directory and the resolved absolute path"),
        ],
        ErrorCategory::Config => &[
            ("Required environment variable not set", 45, "Compare the environment against the documented variables"),
            ("Configuration file missing or not loaded", 25, "Confirm which config path the process actually reads"),
            ("Setting has an invalid value or format", 20, "Validate each setting against its expected format"),
            ("Configuration intended for another environment", 10, "Diff the active config against the target environment's"),
        ],
        ErrorCategory::Dependency => &[
            ("Package not installed", 45, "Reinstall dependencies from the lockfile"),
            ("Version conflict between packages", 25, "Inspect the resolved dependency tree for duplicates"),
            ("Import path does not match the package layout", 20, "Compare the import path with the package's exports"),
            ("Lockfile out of sync with the manifest", 10, "Regenerate the lockfile and diff it"),
        ],
        ErrorCategory::State => &[
            ("Concurrent modification of the same record", 40, "Look for overlapping writers in logs around the failure time"),
            ("Cached or local state is stale", 30, "Reload from the source of truth and retry"),
            ("Operation ran out of the expected order", 20, "Trace the sequence of state transitions leading to the failure"),
            ("Resource already exists from a previous attempt", 10, "Query for the existing resource and make the operation idempotent"),
        ],
        ErrorCategory::Unknown => &[(
            "Requires manual investigation",
            100,
            "Read the full error output and reproduce the failure",
        )],
    }
}

/// Candidate causes for a category, sorted by likelihood descending. Never empty.
pub fn hypotheses(_error: &ErrorObservation, category: ErrorCategory) -> Vec<Hypothesis> {
    table(category)
        .iter()
        .map(|(description, likelihood, test_method)| Hypothesis {
            description: description.to_string(),
            likelihood: *likelihood,
            test_method: test_method.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_and_sorted_descending() {
        for category in ErrorCategory::ALL {
            let list = hypotheses(&ErrorObservation::new("x"), category);
            assert!(!list.is_empty(), "{category} has no hypotheses");
            assert!(
                list.windows(2).all(|w| w[0].likelihood >= w[1].likelihood),
                "{category} hypotheses are not sorted"
            );
            assert!(list.iter().all(|h| h.likelihood <= 100));
        }
    }

    #[test]
    fn test_unknown_is_single_certain_hypothesis() {
        let list = hypotheses(&ErrorObservation::new("x"), ErrorCategory::Unknown);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].likelihood, 100);
        assert!(list[0].description.to_lowercase().contains("manual investigation"));
    }
}
