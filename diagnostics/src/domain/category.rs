// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Closed error taxonomy.
//!
//! Every per-category table in the engine (decomposition, hypotheses,
//! remediation, persona routing) is an exhaustive `match` on
//! [`ErrorCategory`], so adding a variant without filling every table is a
//! compile error rather than a silent fall-through to `Unknown`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Network,
    Auth,
    Syntax,
    Runtime,
    Resource,
    Config,
    Dependency,
    State,
    Unknown,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 9] = [
        ErrorCategory::Network,
        ErrorCategory::Auth,
        ErrorCategory::Syntax,
        ErrorCategory::Runtime,
        ErrorCategory::Resource,
        ErrorCategory::Config,
        ErrorCategory::Dependency,
        ErrorCategory::State,
        ErrorCategory::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "NETWORK",
            ErrorCategory::Auth => "AUTH",
            ErrorCategory::Syntax => "SYNTAX",
            ErrorCategory::Runtime => "RUNTIME",
            ErrorCategory::Resource => "RESOURCE",
            ErrorCategory::Config => "CONFIG",
            ErrorCategory::Dependency => "DEPENDENCY",
            ErrorCategory::State => "STATE",
            ErrorCategory::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown error category: {0}")]
pub struct ParseCategoryError(pub String);

impl FromStr for ErrorCategory {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}
