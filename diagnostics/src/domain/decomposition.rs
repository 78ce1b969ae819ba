// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! First-principles decomposition of a failure.
//!
//! The content depends only on the category; the observation is not read.

use serde::{Deserialize, Serialize};

use super::category::ErrorCategory;
use super::observation::ErrorObservation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decomposition {
    pub what_failed: String,
    pub why_it_failed: String,
    pub assumptions: Vec<String>,
    pub root_cause: String,
}

struct Template {
    what_failed: &'static str,
    why_it_failed: &'static str,
    assumptions: &'static [&'static str],
    root_cause: &'static str,
}

fn template(category: ErrorCategory) -> Template {
    match category {
        ErrorCategory::Network => Template {
            what_failed: "A network request or connection to a remote service",
            why_it_failed: "The remote endpoint was unreachable, slow to respond, or dropped the connection",
            assumptions: &[
                "The remote service is running and reachable from this host",
                "DNS resolves the target hostname",
                "Request timeouts are long enough for the operation",
            ],
            root_cause: "Connectivity between this process and the remote service is broken or degraded",
        },
        ErrorCategory::Auth => Template {
            what_failed: "Authentication or authorization against a protected resource",
            why_it_failed: "The presented credentials were missing, invalid, expired, or lacked the required scope",
            assumptions: &[
                "Credentials are present in the environment",
                "The token or key has not expired or been revoked",
                "The identity has permission for the requested operation",
            ],
            root_cause: "Credentials presented to the service do not grant the requested access",
        },
        ErrorCategory::Syntax => Template {
            what_failed: "Parsing of source code or structured data",
            why_it_failed: "The input does not conform to the grammar the parser expects",
            assumptions: &[
                "Generated or edited code is syntactically complete",
                "Structured payloads (JSON, YAML) are well formed",
                "The parser targets the same language version as the code",
            ],
            root_cause: "Malformed source or data reached a parser",
        },
        ErrorCategory::Runtime => Template {
            what_failed: "Execution of program logic",
            why_it_failed: "A value had an unexpected type or shape, or an operation was invoked on null/undefined",
            assumptions: &[
                "Values have the types the code expects",
                "Optional values are checked before use",
                "Called functions exist with the expected signatures",
            ],
            root_cause: "Program logic made an invalid assumption about runtime values",
        },
        ErrorCategory::Resource => Template {
            what_failed: "Access to a local system resource (file, memory, descriptor, disk)",
            why_it_failed: "The resource was missing, inaccessible to this user, or exhausted",
            assumptions: &[
                "Referenced files and directories exist",
                "The process has permission to read or write them",
                "Enough memory, disk and file descriptors are available",
            ],
            root_cause: "A required local resource is absent, protected, or exhausted",
        },
        ErrorCategory::Config => Template {
            what_failed: "Loading or applying configuration",
            why_it_failed: "A required setting is missing or holds an invalid value",
            assumptions: &[
                "All required environment variables are set",
                "Configuration files are present and valid",
                "Settings match the target environment",
            ],
            root_cause: "The runtime configuration is incomplete or inconsistent with the environment",
        },
        ErrorCategory::Dependency => Template {
            what_failed: "Resolution or loading of a dependency",
            why_it_failed: "A package or module is not installed, not resolvable, or has an incompatible version",
            assumptions: &[
                "Dependencies are installed",
                "Installed versions satisfy declared constraints",
                "Import paths match the package layout",
            ],
            root_cause: "The dependency graph declared by the project does not match what is installed",
        },
        ErrorCategory::State => Template {
            what_failed: "An operation that depends on shared or persisted state",
            why_it_failed: "The state was stale, conflicting, or modified concurrently",
            assumptions: &[
                "No other actor modifies the same state concurrently",
                "Cached state reflects the source of truth",
                "Operations run in the expected order",
            ],
            root_cause: "The operation observed state that no longer matched its preconditions",
        },
        ErrorCategory::Unknown => Template {
            what_failed: "An operation whose failure did not match any known pattern",
            why_it_failed: "The error text carries no recognised signal",
            assumptions: &["The error message describes the actual failure"],
            root_cause: "Unclassified failure; requires manual investigation",
        },
    }
}

pub fn decompose(_error: &ErrorObservation, category: ErrorCategory) -> Decomposition {
    let template = template(category);
    Decomposition {
        what_failed: template.what_failed.to_string(),
        why_it_failed: template.why_it_failed.to_string(),
        assumptions: template.assumptions.iter().map(|a| a.to_string()).collect(),
        root_cause: template.root_cause.to_string(),
    }
}

/// Root cause text for a category without building a full decomposition.
pub fn root_cause(category: ErrorCategory) -> &'static str {
    template(category).root_cause
}
