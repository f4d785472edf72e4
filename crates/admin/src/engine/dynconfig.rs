//! Dynamic-configuration engine: a key → value store whose mutations are
//! announced on the bus so other services hot-reload.
//!
//! Events are published *after* the store commit. A publish failure is
//! logged and absorbed; the commit stands, and redelivery is the bus's
//! problem, not the operator's.

use std::sync::Arc;

use serde_json::json;

use na_bus::{topics, EventPublisher};
use na_domain::dyncfg::{is_valid_key, ConfigEntry};
use na_domain::error::{Error, Result};
use na_store::ConfigStore;

pub struct DynamicConfigEngine {
    store: Arc<dyn ConfigStore>,
    bus: Arc<dyn EventPublisher>,
}

impl DynamicConfigEngine {
    pub fn new(store: Arc<dyn ConfigStore>, bus: Arc<dyn EventPublisher>) -> Self {
        Self { store, bus }
    }

    // ── reads (never publish) ────────────────────────────────────────

    pub async fn get_all(&self) -> Result<Vec<ConfigEntry>> {
        self.store.get_all().await
    }

    pub async fn get(&self, key: &str) -> Result<ConfigEntry> {
        self.store.get(key).await
    }

    // ── mutations ────────────────────────────────────────────────────

    /// Insert a new key. `AlreadyExists` when present.
    pub async fn create(&self, key: &str, value: &str) -> Result<ConfigEntry> {
        validate(key, value)?;
        let entry = self.store.insert(key, value).await?;
        self.announce(topics::CONFIG_CREATED, &entry).await;
        Ok(entry)
    }

    /// Overwrite an existing key. `NotFound` when absent.
    pub async fn update(&self, key: &str, value: &str) -> Result<ConfigEntry> {
        validate(key, value)?;
        let entry = self.store.update(key, value).await?;
        self.announce(topics::CONFIG_UPDATED, &entry).await;
        Ok(entry)
    }

    async fn announce(&self, topic: &str, entry: &ConfigEntry) {
        let payload = json!({
            "key": entry.key,
            "value": entry.value,
        });
        if let Err(e) = self.bus.publish(topic, &payload).await {
            // The store commit already happened; the mutation stands.
            tracing::error!(topic, key = %entry.key, error = %e, "config change event not published");
        }
    }
}

fn validate(key: &str, value: &str) -> Result<()> {
    if !is_valid_key(key) {
        return Err(Error::InvalidInput(format!(
            "config key must match [a-z0-9_]+(.[a-z0-9_]+)*, got \"{key}\""
        )));
    }
    if value.is_empty() {
        return Err(Error::InvalidInput("config value must not be empty".into()));
    }
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use na_bus::RecordingPublisher;
    use na_store::MemoryStore;

    fn engine() -> (DynamicConfigEngine, Arc<RecordingPublisher>) {
        let bus = Arc::new(RecordingPublisher::new());
        let engine = DynamicConfigEngine::new(Arc::new(MemoryStore::new()), bus.clone());
        (engine, bus)
    }

    #[tokio::test]
    async fn create_commits_and_publishes_once() {
        let (engine, bus) = engine();
        engine.create("generation.npc_count", "5").await.unwrap();

        let stored = engine.get("generation.npc_count").await.unwrap();
        assert_eq!(stored.value, "5");

        let events = bus.on_topic(topics::CONFIG_CREATED);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["key"], "generation.npc_count");
        assert_eq!(events[0]["value"], "5");
    }

    #[tokio::test]
    async fn duplicate_create_fails_without_event() {
        let (engine, bus) = engine();
        engine.create("a.b", "1").await.unwrap();
        let err = engine.create("a.b", "2").await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)), "{err}");
        assert_eq!(bus.on_topic(topics::CONFIG_CREATED).len(), 1);
    }

    #[tokio::test]
    async fn update_requires_presence_and_publishes() {
        let (engine, bus) = engine();
        let err = engine.update("a.b", "1").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)), "{err}");
        assert!(bus.on_topic(topics::CONFIG_UPDATED).is_empty());

        engine.create("a.b", "1").await.unwrap();
        engine.update("a.b", "2").await.unwrap();
        assert_eq!(bus.on_topic(topics::CONFIG_UPDATED).len(), 1);
        assert_eq!(engine.get("a.b").await.unwrap().value, "2");
    }

    #[tokio::test]
    async fn reads_never_publish() {
        let (engine, bus) = engine();
        engine.create("a.b", "1").await.unwrap();
        let before = bus.events().len();
        engine.get("a.b").await.unwrap();
        engine.get_all().await.unwrap();
        assert_eq!(bus.events().len(), before);
    }

    #[tokio::test]
    async fn invalid_keys_are_rejected() {
        let (engine, bus) = engine();
        for key in ["", "Bad.Key", "trailing.", "sp ace"] {
            let err = engine.create(key, "1").await.unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "{key}: {err}");
        }
        assert!(bus.events().is_empty());
    }
}
