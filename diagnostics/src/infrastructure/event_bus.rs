// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Diagnostic Events
//
// In-memory fan-out over a tokio broadcast channel. Events published with
// no subscribers are dropped.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::application::EventBus;
use crate::domain::DiagnosticEvent;

/// Broadcast event bus for diagnostic events
#[derive(Clone)]
pub struct BroadcastEventBus {
    sender: Arc<broadcast::Sender<DiagnosticEvent>>,
}

impl BroadcastEventBus {
    /// Capacity is how many events are buffered before slow receivers lag
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
            event_type: None,
        }
    }

    /// Subscribe to a single event type, e.g. `"fix_recorded"`
    pub fn subscribe_type(&self, event_type: &'static str) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
            event_type: Some(event_type),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[async_trait]
impl EventBus for BroadcastEventBus {
    async fn publish(&self, event: DiagnosticEvent) -> Result<()> {
        debug!(event_type = event.event_type(), "Publishing event");

        // send() only fails when nobody is subscribed
        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
        Ok(())
    }
}

/// Receiver for diagnostic events, optionally filtered by type
pub struct EventReceiver {
    receiver: broadcast::Receiver<DiagnosticEvent>,
    event_type: Option<&'static str>,
}

impl EventReceiver {
    /// Receive the next matching event
    pub async fn recv(&mut self) -> Result<DiagnosticEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(|e| match e {
                broadcast::error::RecvError::Closed => EventBusError::Closed,
                broadcast::error::RecvError::Lagged(n) => {
                    warn!("Event receiver lagged by {} events", n);
                    EventBusError::Lagged(n)
                }
            })?;

            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Try to receive a matching event without waiting
    pub fn try_recv(&mut self) -> Result<DiagnosticEvent, EventBusError> {
        loop {
            let event = self.receiver.try_recv().map_err(|e| match e {
                broadcast::error::TryRecvError::Empty => EventBusError::Empty,
                broadcast::error::TryRecvError::Closed => EventBusError::Closed,
                broadcast::error::TryRecvError::Lagged(n) => {
                    warn!("Event receiver lagged by {} events", n);
                    EventBusError::Lagged(n)
                }
            })?;

            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    fn matches(&self, event: &DiagnosticEvent) -> bool {
        self.event_type.is_none_or(|wanted| event.event_type() == wanted)
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn pruned(count: usize) -> DiagnosticEvent {
        DiagnosticEvent::ReflectionsPruned {
            count,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = BroadcastEventBus::new(10);
        let mut receiver = bus.subscribe();

        bus.publish(pruned(3)).await.unwrap();

        match receiver.recv().await.unwrap() {
            DiagnosticEvent::ReflectionsPruned { count, .. } => assert_eq!(count, 3),
            other => panic!("Wrong event type received: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = BroadcastEventBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus.publish(pruned(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_type_filtering() {
        let bus = BroadcastEventBus::new(10);
        let mut receiver = bus.subscribe_type("reflections_pruned");

        bus.publish(DiagnosticEvent::FixesEvicted {
            count: 1,
            capacity: 10,
            timestamp: Utc::now(),
        })
        .await
        .unwrap();
        bus.publish(pruned(7)).await.unwrap();

        let event = receiver.try_recv().unwrap();
        assert_eq!(event.event_type(), "reflections_pruned");
        assert!(matches!(receiver.try_recv(), Err(EventBusError::Empty)));
    }

    #[tokio::test]
    async fn test_lagged_receiver() {
        let bus = BroadcastEventBus::new(1);
        let mut receiver = bus.subscribe();

        bus.publish(pruned(1)).await.unwrap();
        bus.publish(pruned(2)).await.unwrap();

        assert!(matches!(receiver.try_recv(), Err(EventBusError::Lagged(1))));
        assert!(receiver.try_recv().is_ok());
    }
}
