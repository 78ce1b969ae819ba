// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the AEGIS diagnose CLI

pub mod analyze;
pub mod config;
pub mod fix;
pub mod reflexion;

pub use self::analyze::AnalyzeArgs;
pub use self::config::ConfigCommand;
pub use self::fix::FixCommand;
pub use self::reflexion::ReflexionCommand;

use aegis_diagnostics::ErrorObservation;

pub(crate) fn observation(message: String, code: Option<String>, stack: Option<String>) -> ErrorObservation {
    let mut error = ErrorObservation::new(message);
    if let Some(code) = code {
        error = error.with_code(code);
    }
    if let Some(stack) = stack {
        error = error.with_stack(stack);
    }
    error
}
