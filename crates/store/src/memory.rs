//! In-memory implementation of both store traits.
//!
//! Backs tests and `store.driver = "memory"` dev runs. Semantics mirror
//! the Postgres adapter exactly, including `created_at` preservation
//! across upserts.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use na_domain::dyncfg::ConfigEntry;
use na_domain::error::{Error, Result};
use na_domain::prompt::{Prompt, DEFAULT_LANGUAGE};

use crate::{ConfigStore, PromptStore};

#[derive(Default)]
pub struct MemoryStore {
    configs: RwLock<BTreeMap<String, ConfigEntry>>,
    prompts: RwLock<BTreeMap<(String, String), Prompt>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn get_all(&self) -> Result<Vec<ConfigEntry>> {
        Ok(self.configs.read().await.values().cloned().collect())
    }

    async fn get(&self, key: &str) -> Result<ConfigEntry> {
        self.configs
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("config key \"{key}\"")))
    }

    async fn insert(&self, key: &str, value: &str) -> Result<ConfigEntry> {
        let mut configs = self.configs.write().await;
        if configs.contains_key(key) {
            return Err(Error::AlreadyExists(format!("config key \"{key}\"")));
        }
        let entry = ConfigEntry {
            key: key.to_string(),
            value: value.to_string(),
            updated_at: Utc::now(),
        };
        configs.insert(key.to_string(), entry.clone());
        Ok(entry)
    }

    async fn update(&self, key: &str, value: &str) -> Result<ConfigEntry> {
        let mut configs = self.configs.write().await;
        let entry = configs
            .get_mut(key)
            .ok_or_else(|| Error::NotFound(format!("config key \"{key}\"")))?;
        entry.value = value.to_string();
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }
}

#[async_trait]
impl PromptStore for MemoryStore {
    async fn upsert(&self, key: &str, language: &str, content: &str) -> Result<Prompt> {
        let mut prompts = self.prompts.write().await;
        let id = (key.to_string(), language.to_string());
        let now = Utc::now();
        let prompt = match prompts.get(&id) {
            Some(existing) => Prompt {
                content: content.to_string(),
                updated_at: now,
                ..existing.clone()
            },
            None => Prompt {
                id: Uuid::new_v4(),
                key: key.to_string(),
                language: language.to_string(),
                content: content.to_string(),
                created_at: now,
                updated_at: now,
            },
        };
        prompts.insert(id, prompt.clone());
        Ok(prompt)
    }

    async fn get(&self, key: &str, language: &str) -> Result<Prompt> {
        self.prompts
            .read()
            .await
            .get(&(key.to_string(), language.to_string()))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("prompt \"{key}\" ({language})")))
    }

    async fn get_by_key(&self, key: &str) -> Result<BTreeMap<String, Prompt>> {
        let prompts = self.prompts.read().await;
        let map: BTreeMap<String, Prompt> = prompts
            .values()
            .filter(|p| p.key == key)
            .map(|p| (p.language.clone(), p.clone()))
            .collect();
        if map.is_empty() {
            return Err(Error::NotFound(format!("prompt key \"{key}\"")));
        }
        Ok(map)
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let prompts = self.prompts.read().await;
        let mut keys: Vec<String> = prompts.keys().map(|(k, _)| k.clone()).collect();
        keys.dedup();
        Ok(keys)
    }

    async fn delete_by_key_and_lang(&self, key: &str, language: &str) -> Result<bool> {
        Ok(self
            .prompts
            .write()
            .await
            .remove(&(key.to_string(), language.to_string()))
            .is_some())
    }

    async fn delete_by_key(&self, key: &str) -> Result<u64> {
        let mut prompts = self.prompts.write().await;
        let before = prompts.len();
        prompts.retain(|(k, _), _| k != key);
        Ok((before - prompts.len()) as u64)
    }

    async fn insert_key(&self, key: &str) -> Result<Prompt> {
        let mut prompts = self.prompts.write().await;
        if prompts.keys().any(|(k, _)| k == key) {
            return Err(Error::AlreadyExists(format!("prompt key \"{key}\"")));
        }
        let now = Utc::now();
        let prompt = Prompt {
            id: Uuid::new_v4(),
            key: key.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            content: String::new(),
            created_at: now,
            updated_at: now,
        };
        prompts.insert((key.to_string(), DEFAULT_LANGUAGE.to_string()), prompt.clone());
        Ok(prompt)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
