//! Publisher-only message-bus abstraction.
//!
//! Everything that mutates dynamic configuration or prompts announces the
//! change on a named topic so other services can hot-reload. The broker
//! itself is an external collaborator; this crate only knows how to
//! publish to it (see [`amqp`]) and how to pretend to ([`RecordingPublisher`]).

pub mod amqp;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use na_domain::error::Result;

pub use amqp::AmqpPublisher;

/// Topics published by the admin control plane. Every payload carries
/// enough key material for subscribers to refetch the changed entity.
pub mod topics {
    pub const PROMPT_CREATED: &str = "prompt.created";
    pub const PROMPT_UPDATED: &str = "prompt.updated";
    pub const PROMPT_DELETED: &str = "prompt.deleted";
    pub const PROMPT_KEY_DELETED: &str = "prompt.key.deleted";
    pub const CONFIG_CREATED: &str = "config.created";
    pub const CONFIG_UPDATED: &str = "config.updated";
    /// Operator-initiated notification to a single player.
    pub const PUSH_USER: &str = "push.user";
}

/// The single capability the rest of the service needs from the bus.
///
/// `publish` returns `Error::Transient` when the broker is unreachable;
/// callers that publish after a successful store commit log that and move
/// on (delivery is the bus's responsibility, not theirs). Implementations
/// must not retain the payload after returning.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: &Value) -> Result<()>;

    /// Graceful shutdown: drain pending publishes within a bounded window,
    /// then close channel and connection.
    async fn close(&self);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Recording publisher
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// In-process publisher that records every event instead of sending it.
/// Used by tests to assert on published topics and payloads.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<(String, Value)>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far, in order.
    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().clone()
    }

    /// Events published to one topic.
    pub fn on_topic(&self, topic: &str) -> Vec<Value> {
        self.events
            .lock()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: &Value) -> Result<()> {
        self.events.lock().push((topic.to_string(), payload.clone()));
        Ok(())
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn recording_publisher_keeps_order() {
        let bus = RecordingPublisher::new();
        bus.publish(topics::CONFIG_CREATED, &json!({"key": "a"}))
            .await
            .unwrap();
        bus.publish(topics::CONFIG_UPDATED, &json!({"key": "a"}))
            .await
            .unwrap();
        let events = bus.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, topics::CONFIG_CREATED);
        assert_eq!(bus.on_topic(topics::CONFIG_UPDATED).len(), 1);
    }
}
