// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Error signatures: the deduplication key for recurring failures.
//!
//! Normalisation steps, in order: lower-case, digit runs → `<num>`,
//! quoted substrings → `<str>`, path-like tokens → `<path>`, whitespace
//! collapsed, truncated to [`MAX_SIGNATURE_BODY`] characters, prefixed with
//! the error code (or `UNKNOWN`). Two observations that differ only in
//! embedded numbers, quoted strings or paths share one signature.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::observation::ErrorObservation;

pub const MAX_SIGNATURE_BODY: usize = 100;

const UNKNOWN_CODE: &str = "UNKNOWN";

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("static regex"));

static QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""[^"]*"|`[^`]*`"#).expect("static regex"));

// A single quote opens a string only when it does not follow a word
// character, so contractions like `can't` are left alone.
static SINGLE_QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^\w])'[^']*'").expect("static regex"));

// Absolute, relative (./ ../ ~/) and Windows drive paths; a token needs at
// least one separator to count as a path.
static PATHS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:[a-z]:|~|\.{1,2})?(?:[/\\][\w.<>@+-]+)+[/\\]?").expect("static regex")
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorSignature(String);

impl ErrorSignature {
    pub fn from_observation(error: &ErrorObservation) -> Self {
        let lowered = error.message.to_lowercase();
        let numbers = DIGITS.replace_all(&lowered, "<num>");
        let strings = QUOTED.replace_all(&numbers, "<str>");
        let strings = SINGLE_QUOTED.replace_all(&strings, "${1}<str>");
        let paths = PATHS.replace_all(&strings, "<path>");
        let collapsed = WHITESPACE.replace_all(paths.trim(), " ");
        let body: String = collapsed.chars().take(MAX_SIGNATURE_BODY).collect();

        let code = error
            .code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .unwrap_or(UNKNOWN_CODE);

        Self(format!("{code}:{body}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&ErrorObservation> for ErrorSignature {
    fn from(error: &ErrorObservation) -> Self {
        Self::from_observation(error)
    }
}

impl fmt::Display for ErrorSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(code: Option<&str>, message: &str) -> ErrorSignature {
        let mut obs = ErrorObservation::new(message);
        if let Some(code) = code {
            obs = obs.with_code(code);
        }
        ErrorSignature::from_observation(&obs)
    }

    #[test]
    fn test_path_invariance() {
        assert_eq!(
            sig(Some("ENOENT"), "File /a/b.txt not found"),
            sig(Some("ENOENT"), "File /x/y/z.txt not found")
        );
        assert_eq!(sig(Some("ENOENT"), "File /a/b.txt not found").as_str(), "ENOENT:file <path> not found");
    }

    #[test]
    fn test_number_invariance() {
        assert_eq!(sig(None, "Error at line 42"), sig(None, "Error at line 100"));
        assert_eq!(sig(None, "Error at line 42").as_str(), "UNKNOWN:error at line <num>");
    }

    #[test]
    fn test_quoted_invariance() {
        assert_eq!(
            sig(None, "Cannot find module 'lodash'"),
            sig(None, "Cannot find module \"react-dom\"")
        );
    }

    #[test]
    fn test_contractions_do_not_open_quotes() {
        let lodash = sig(None, "Module not found: Error: Can't resolve 'lodash' in '/app/src'");
        let react = sig(None, "Module not found: Error: Can't resolve 'react' in '/srv/web/src'");
        assert_eq!(lodash, react);
        assert_eq!(lodash.as_str(), "UNKNOWN:module not found: error: can't resolve <str> in <str>");
        assert_eq!(sig(None, "'x' isn't 'y'").as_str(), "UNKNOWN:<str> isn't <str>");
    }

    #[test]
    fn test_relative_and_windows_paths() {
        assert_eq!(
            sig(None, "failed to open ./src/lib.rs"),
            sig(None, "failed to open ../other/main.rs")
        );
        assert_eq!(
            sig(None, r"failed to open C:\Users\dev\app.json"),
            sig(None, r"failed to open D:\tmp\x.json")
        );
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(sig(None, "  too   many\n\tspaces "), sig(None, "too many spaces"));
    }

    #[test]
    fn test_truncated_to_limit() {
        let long = "x".repeat(500);
        let signature = sig(Some("E"), &long);
        assert_eq!(signature.as_str().len(), "E:".len() + MAX_SIGNATURE_BODY);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let long = "é".repeat(300);
        let signature = sig(None, &long);
        assert_eq!(signature.as_str().chars().count(), "UNKNOWN:".len() + MAX_SIGNATURE_BODY);
    }

    #[test]
    fn test_code_distinguishes_signatures() {
        assert_ne!(sig(Some("EPERM"), "denied"), sig(Some("EACCES"), "denied"));
        assert_eq!(sig(Some("  "), "denied"), sig(None, "denied"));
    }
}
