// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Classifier
//!
//! Maps an [`ErrorObservation`] to an [`ErrorCategory`] by walking
//! [`PATTERN_TABLE`] in order and returning the first rule with a needle
//! contained in the observation's lower-cased code + message + stack.
//!
//! ## Ordering
//!
//! The table is first-match-wins and its order is part of the contract.
//! Resource rules (`enoent`, `eperm`, `eacces`, ...) sit ahead of the network
//! rules because messages like `connect EACCES 127.0.0.1:80` would otherwise
//! be captured by generic connection patterns. Auth sits ahead of network for
//! the same reason (`401` responses mention the request that failed).
//! Do not sort this table.

use super::category::ErrorCategory;
use super::observation::ErrorObservation;

/// One classifier rule. Needles are lower-case substrings.
///
/// A needle ending in a digit only matches when the next character is not a
/// digit, so `status 401` does not match `status 4010`.
#[derive(Debug, Clone, Copy)]
pub struct PatternRule {
    pub category: ErrorCategory,
    pub needles: &'static [&'static str],
}

impl PatternRule {
    fn matches(&self, text: &str) -> bool {
        self.needles.iter().any(|needle| contains_needle(text, needle))
    }
}

fn contains_needle(text: &str, needle: &str) -> bool {
    if !needle.ends_with(|c: char| c.is_ascii_digit()) {
        return text.contains(needle);
    }
    text.match_indices(needle).any(|(start, matched)| {
        !text[start + matched.len()..].starts_with(|c: char| c.is_ascii_digit())
    })
}

pub static PATTERN_TABLE: &[PatternRule] = &[
    PatternRule {
        category: ErrorCategory::Resource,
        needles: &[
            "enoent",
            "eperm",
            "eacces",
            "enospc",
            "enomem",
            "emfile",
            "no such file or directory",
            "permission denied",
            "operation not permitted",
            "out of memory",
            "heap out of memory",
            "disk full",
            "no space left",
            "too many open files",
            "quota exceeded",
        ],
    },
    PatternRule {
        category: ErrorCategory::Auth,
        needles: &[
            "unauthorized",
            "unauthenticated",
            "forbidden",
            "status 401",
            "status code 401",
            "http 401",
            "error 401",
            "status 403",
            "status code 403",
            "http 403",
            "error 403",
            "authentication failed",
            "invalid credentials",
            "invalid token",
            "token expired",
            "jwt",
            "api key",
            "access denied",
            "not authorized",
        ],
    },
    PatternRule {
        category: ErrorCategory::Network,
        needles: &[
            "etimedout",
            "econnrefused",
            "econnreset",
            "enotfound",
            "eaddrinuse",
            "ehostunreach",
            "socket hang up",
            "timed out",
            "timeout",
            "network",
            "fetch failed",
            "getaddrinfo",
            "dns",
            "connection refused",
            "connection reset",
            "bad gateway",
            "service unavailable",
        ],
    },
    PatternRule {
        category: ErrorCategory::Syntax,
        needles: &[
            "syntaxerror",
            "syntax error",
            "unexpected token",
            "unexpected end of",
            "unexpected identifier",
            "parse error",
            "parsing error",
            "invalid syntax",
            "unterminated",
            "expected expression",
        ],
    },
    PatternRule {
        category: ErrorCategory::Dependency,
        needles: &[
            "cannot find module",
            "module not found",
            "modulenotfounderror",
            "importerror",
            "no module named",
            "eresolve",
            "peer dep",
            "unresolved import",
            "could not resolve dependency",
            "package not found",
            "version conflict",
        ],
    },
    PatternRule {
        category: ErrorCategory::Config,
        needles: &[
            "environment variable",
            "env var",
            "missing required",
            "invalid configuration",
            "misconfigured",
            "not configured",
            "config",
            ".env",
        ],
    },
    PatternRule {
        category: ErrorCategory::State,
        needles: &[
            "race condition",
            "deadlock",
            "conflict",
            "already exists",
            "stale",
            "inconsistent state",
            "invalid state",
            "concurrent modification",
            "optimistic lock",
            "out of sync",
        ],
    },
    PatternRule {
        category: ErrorCategory::Runtime,
        needles: &[
            "typeerror",
            "referenceerror",
            "rangeerror",
            "is not a function",
            "is not defined",
            "cannot read propert",
            "undefined is not",
            "null pointer",
            "nullpointerexception",
            "panicked at",
            "segmentation fault",
            "stack overflow",
            "maximum call stack",
            "unhandled promise rejection",
        ],
    },
];

/// Classify an observation. Total: unmatched input falls back to `Unknown`.
pub fn classify(error: &ErrorObservation) -> ErrorCategory {
    let text = error.searchable_text();
    PATTERN_TABLE
        .iter()
        .find(|rule| rule.matches(&text))
        .map(|rule| rule.category)
        .unwrap_or(ErrorCategory::Unknown)
}
