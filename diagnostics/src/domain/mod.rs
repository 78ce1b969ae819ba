// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Pure diagnostic types and functions. Nothing in this layer performs I/O.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Classification, signatures, decomposition, hypotheses,
//!   reflexion records and the contracts their stores implement

pub mod analysis;
pub mod category;
pub mod classifier;
pub mod decomposition;
pub mod events;
pub mod fix;
pub mod hypothesis;
pub mod observation;
pub mod persona;
pub mod reflection;
pub mod remediation;
pub mod repository;
pub mod signature;

pub use analysis::*;
pub use category::*;
pub use classifier::classify;
pub use decomposition::{decompose, Decomposition};
pub use events::*;
pub use fix::*;
pub use hypothesis::{hypotheses, Hypothesis};
pub use observation::*;
pub use persona::*;
pub use reflection::*;
pub use remediation::*;
pub use repository::*;
pub use signature::*;
