// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Raw error observations handed to the diagnostics engine by any subsystem.

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;

/// A failure as reported by the caller at the moment an operation failed.
///
/// Only `message` is required; `code` and `stack` default to absent and every
/// downstream component tolerates their absence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorObservation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Code, message and stack joined and lower-cased; the text the classifier matches on.
    pub fn searchable_text(&self) -> String {
        let mut text = String::with_capacity(
            self.message.len()
                + self.code.as_deref().map_or(0, str::len)
                + self.stack.as_deref().map_or(0, str::len)
                + 2,
        );
        if let Some(code) = &self.code {
            text.push_str(code);
            text.push(' ');
        }
        text.push_str(&self.message);
        if let Some(stack) = &self.stack {
            text.push('\n');
            text.push_str(stack);
        }
        text.to_lowercase()
    }
}

/// errno-style code for the io error kinds the classifier knows about
fn io_error_code(kind: ErrorKind) -> Option<&'static str> {
    match kind {
        ErrorKind::NotFound => Some("ENOENT"),
        ErrorKind::PermissionDenied => Some("EACCES"),
        ErrorKind::TimedOut => Some("ETIMEDOUT"),
        ErrorKind::ConnectionRefused => Some("ECONNREFUSED"),
        ErrorKind::ConnectionReset => Some("ECONNRESET"),
        ErrorKind::AddrInUse => Some("EADDRINUSE"),
        ErrorKind::OutOfMemory => Some("ENOMEM"),
        _ => None,
    }
}

impl From<&std::io::Error> for ErrorObservation {
    fn from(err: &std::io::Error) -> Self {
        Self {
            code: io_error_code(err.kind()).map(str::to_string),
            message: err.to_string(),
            stack: None,
        }
    }
}

impl From<&anyhow::Error> for ErrorObservation {
    fn from(err: &anyhow::Error) -> Self {
        let code = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<std::io::Error>())
            .and_then(|io| io_error_code(io.kind()))
            .map(str::to_string);

        let causes: Vec<String> = err.chain().skip(1).map(|cause| cause.to_string()).collect();
        let stack = if causes.is_empty() {
            None
        } else {
            Some(
                causes
                    .iter()
                    .map(|cause| format!("Caused by: {cause}"))
                    .collect::<Vec<_>>()
                    .join("\n"),
            )
        };

        Self {
            code,
            message: err.to_string(),
            stack,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_searchable_text_includes_all_fields() {
        let obs = ErrorObservation::new("Connection Timed Out")
            .with_code("ETIMEDOUT")
            .with_stack("at Socket.connect");

        let text = obs.searchable_text();
        assert!(text.starts_with("etimedout connection timed out"));
        assert!(text.contains("at socket.connect"));
    }

    #[test]
    fn test_missing_optional_fields() {
        let obs = ErrorObservation::new("boom");
        assert_eq!(obs.searchable_text(), "boom");
    }

    #[test]
    fn test_from_io_error_maps_code() {
        let err = std::io::Error::new(ErrorKind::PermissionDenied, "open /etc/shadow");
        let obs = ErrorObservation::from(&err);
        assert_eq!(obs.code.as_deref(), Some("EACCES"));
        assert_eq!(obs.message, "open /etc/shadow");

        let other = std::io::Error::new(ErrorKind::Other, "weird");
        assert!(ErrorObservation::from(&other).code.is_none());
    }

    #[test]
    fn test_from_anyhow_walks_chain() {
        let io = std::io::Error::new(ErrorKind::NotFound, "config.yaml missing");
        let err = Err::<(), _>(io)
            .context("failed to load settings")
            .unwrap_err();

        let obs = ErrorObservation::from(&err);
        assert_eq!(obs.code.as_deref(), Some("ENOENT"));
        assert_eq!(obs.message, "failed to load settings");
        assert_eq!(obs.stack.as_deref(), Some("Caused by: config.yaml missing"));
    }

    #[test]
    fn test_deserialize_without_optional_fields() {
        let obs: ErrorObservation = serde_json::from_str(r#"{"message":"x"}"#).unwrap();
        assert_eq!(obs, ErrorObservation::new("x"));
    }
}
