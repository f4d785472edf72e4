//! Schema provider: marries the pure schema generator to live dynamic
//! configuration.
//!
//! Shape parameters are read from the config store on **every** call so
//! an operator changing `generation.npc_count` affects the very next
//! generation. Nothing is cached here and the generator caches nothing
//! either, so returned schemas are always independently mutable.

use std::sync::Arc;

use serde_json::Value;

use na_domain::dyncfg::keys;
use na_domain::error::Error;
use na_story_codec::schema::{DEFAULT_CHOICE_COUNT, DEFAULT_NPC_COUNT};
use na_story_codec::{schema_for, GenerationParams, PromptKind};

use crate::engine::dynconfig::DynamicConfigEngine;

pub struct SchemaProvider {
    dyncfg: Arc<DynamicConfigEngine>,
}

impl SchemaProvider {
    pub fn new(dyncfg: Arc<DynamicConfigEngine>) -> Self {
        Self { dyncfg }
    }

    /// Current shape parameters. Unset keys fall back to the documented
    /// defaults.
    pub async fn params(&self) -> GenerationParams {
        GenerationParams {
            npc_count: self.read_count(keys::NPC_COUNT, DEFAULT_NPC_COUNT).await,
            choice_count: self
                .read_count(keys::CHOICE_COUNT, DEFAULT_CHOICE_COUNT)
                .await,
        }
    }

    /// Generate the schema for one prompt type under the current
    /// parameters.
    pub async fn schema(&self, kind: PromptKind) -> (Value, &'static str) {
        let params = self.params().await;
        schema_for(kind, &params)
    }

    async fn read_count(&self, key: &str, default: usize) -> usize {
        match self.dyncfg.get(key).await {
            Ok(entry) => match entry.as_usize() {
                Some(n) if n > 0 => n,
                _ => {
                    tracing::warn!(key, value = %entry.value, default, "unusable dynamic config value; using default");
                    default
                }
            },
            Err(Error::NotFound(_)) => {
                tracing::debug!(key, default, "dynamic config key unset; using default");
                default
            }
            Err(e) => {
                tracing::warn!(key, default, error = %e, "dynamic config read failed; using default");
                default
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
