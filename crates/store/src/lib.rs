//! Storage ports for the dynamic-config engine and the prompt registry.
//!
//! The relational engine itself (and its migrations) is an external
//! concern; this crate defines the two traits the engines consume, a
//! Postgres adapter over `sqlx`, and an in-memory implementation for
//! tests and single-node dev runs.

pub mod memory;
pub mod postgres;

use std::collections::BTreeMap;

use async_trait::async_trait;

use na_domain::dyncfg::ConfigEntry;
use na_domain::error::Result;
use na_domain::prompt::Prompt;

pub use memory::MemoryStore;
pub use postgres::{connect_pool, PgStore};

/// Key → value store for runtime parameters.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get_all(&self) -> Result<Vec<ConfigEntry>>;

    /// `NotFound` when the key is absent.
    async fn get(&self, key: &str) -> Result<ConfigEntry>;

    /// `AlreadyExists` when the key is present.
    async fn insert(&self, key: &str, value: &str) -> Result<ConfigEntry>;

    /// `NotFound` when the key is absent.
    async fn update(&self, key: &str, value: &str) -> Result<ConfigEntry>;
}

/// (key, language) → content store for prompt templates.
#[async_trait]
pub trait PromptStore: Send + Sync {
    /// Insert-or-overwrite in one atomic statement. `created_at` is
    /// preserved across overwrites; the returned row's
    /// [`Prompt::is_newly_created`] tells the two cases apart.
    async fn upsert(&self, key: &str, language: &str, content: &str) -> Result<Prompt>;

    /// `NotFound` when absent.
    async fn get(&self, key: &str, language: &str) -> Result<Prompt>;

    /// All language rows for a key. `NotFound` when the key has none.
    async fn get_by_key(&self, key: &str) -> Result<BTreeMap<String, Prompt>>;

    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Returns whether a row was actually removed.
    async fn delete_by_key_and_lang(&self, key: &str, language: &str) -> Result<bool>;

    /// Removes every language row for the key; returns how many.
    async fn delete_by_key(&self, key: &str) -> Result<u64>;

    /// Seed a new key with an empty default-language row.
    /// `AlreadyExists` when the key has any row.
    async fn insert_key(&self, key: &str) -> Result<Prompt>;
}
