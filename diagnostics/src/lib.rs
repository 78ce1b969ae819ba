// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! AEGIS Diagnostics
//!
//! Classifies failures, remembers verified fixes per workspace and turns
//! failed attempts into reflections that are fed back into later retries.
//!
//! # Architecture
//!
//! - **Layer:** Learning & Memory Layer
//! - **Purpose:** Error analysis, fix memory and reflexion learning

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::{
    retry_with_analysis, AnalysisService, Diagnosable, EventBus, FixMemory, FixMemoryRegistry,
    FixStoreProvider, ReflectionPruner, ReflexionConfig, ReflexionResult, ReflexionService,
    RetentionConfig, RetryPolicy, TaskContext, TaskOutcome, WorkspaceRef,
};
pub use config::DiagnosticsConfig;
pub use domain::*;
pub use infrastructure::*;
