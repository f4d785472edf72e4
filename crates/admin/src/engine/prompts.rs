//! Prompt registry: upsert / list / delete of (key, language) prompt
//! templates, with change events for the generator service.
//!
//! Same commit-then-publish discipline as the config engine: the store
//! mutation is the source of truth, events are best-effort announcements
//! carrying (key, language) so subscribers can refetch.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;

use na_bus::{topics, EventPublisher};
use na_domain::error::{Error, Result};
use na_domain::prompt::Prompt;
use na_store::PromptStore;

pub struct PromptRegistry {
    store: Arc<dyn PromptStore>,
    bus: Arc<dyn EventPublisher>,
}

impl PromptRegistry {
    pub fn new(store: Arc<dyn PromptStore>, bus: Arc<dyn EventPublisher>) -> Self {
        Self { store, bus }
    }

    // ── reads ────────────────────────────────────────────────────────

    pub async fn get(&self, key: &str, language: &str) -> Result<Prompt> {
        self.store.get(key, language).await
    }

    pub async fn get_by_key(&self, key: &str) -> Result<BTreeMap<String, Prompt>> {
        self.store.get_by_key(key).await
    }

    pub async fn list_keys(&self) -> Result<Vec<String>> {
        self.store.list_keys().await
    }

    // ── mutations ────────────────────────────────────────────────────

    /// Insert-or-overwrite. Emits `prompt.created` for an insert,
    /// `prompt.updated` for an overwrite.
    pub async fn upsert(&self, key: &str, language: &str, content: &str) -> Result<Prompt> {
        validate(key, language)?;
        let prompt = self.store.upsert(key, language, content).await?;
        let topic = if prompt.is_newly_created() {
            topics::PROMPT_CREATED
        } else {
            topics::PROMPT_UPDATED
        };
        self.announce(topic, key, Some(language)).await;
        Ok(prompt)
    }

    /// Seed a new key with an empty default-language row.
    pub async fn create_key(&self, key: &str) -> Result<Prompt> {
        if key.trim().is_empty() {
            return Err(Error::InvalidInput("prompt key must not be empty".into()));
        }
        let prompt = self.store.insert_key(key).await?;
        self.announce(topics::PROMPT_CREATED, key, Some(&prompt.language))
            .await;
        Ok(prompt)
    }

    /// Idempotent: deleting an absent row succeeds and publishes nothing.
    pub async fn delete_by_key_and_lang(&self, key: &str, language: &str) -> Result<()> {
        if self.store.delete_by_key_and_lang(key, language).await? {
            self.announce(topics::PROMPT_DELETED, key, Some(language)).await;
        }
        Ok(())
    }

    /// Remove every language row for a key. One `prompt.key.deleted`
    /// event regardless of how many rows existed; none when the key was
    /// already gone.
    pub async fn delete_by_key(&self, key: &str) -> Result<()> {
        let removed = self.store.delete_by_key(key).await?;
        if removed > 0 {
            self.announce(topics::PROMPT_KEY_DELETED, key, None).await;
        }
        Ok(())
    }

    async fn announce(&self, topic: &str, key: &str, language: Option<&str>) {
        let payload = match language {
            Some(language) => json!({ "key": key, "language": language }),
            None => json!({ "key": key }),
        };
        if let Err(e) = self.bus.publish(topic, &payload).await {
            tracing::error!(topic, key, error = %e, "prompt change event not published");
        }
    }
}

fn validate(key: &str, language: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::InvalidInput("prompt key must not be empty".into()));
    }
    if language.trim().is_empty() {
        return Err(Error::InvalidInput("prompt language must not be empty".into()));
    }
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
