// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Infrastructure layer for the diagnostics bounded context

pub mod event_bus;
pub mod file_store;
pub mod memory_store;

pub use event_bus::{BroadcastEventBus, EventBusError, EventReceiver};
pub use file_store::{
    JsonFileFixStore, JsonFileReflectionRepository, JsonFileStoreProvider, DEFAULT_FIX_MEMORY_FILE,
    DEFAULT_REFLEXION_FILE,
};
pub use memory_store::{InMemoryFixStore, InMemoryFixStoreProvider, InMemoryReflectionRepository};
