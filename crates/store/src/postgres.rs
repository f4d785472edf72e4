//! Postgres adapter for [`ConfigStore`] and [`PromptStore`].
//!
//! Expected schema (owned by the storage collaborator, not migrated here):
//!
//! ```sql
//! CREATE TABLE dynamic_config (
//!     key        TEXT PRIMARY KEY,
//!     value      TEXT NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//!
//! CREATE TABLE prompts (
//!     id         UUID PRIMARY KEY,
//!     key        TEXT NOT NULL,
//!     language   TEXT NOT NULL,
//!     content    TEXT NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
//!     UNIQUE (key, language)
//! );
//! ```
//!
//! Every operation is a single statement, so each is atomic on its own;
//! the upsert relies on `ON CONFLICT ... DO UPDATE` to stay one round
//! trip.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use na_domain::config::StoreConfig;
use na_domain::dyncfg::ConfigEntry;
use na_domain::error::{Error, Result};
use na_domain::prompt::{Prompt, DEFAULT_LANGUAGE};

use crate::{ConfigStore, PromptStore};

/// Open the shared connection pool.
pub async fn connect_pool(cfg: &StoreConfig) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .connect(&cfg.dsn)
        .await
        .map_err(|e| Error::Transient(format!("connecting to store: {e}")))
}

/// Postgres-backed store; cheap to clone, shares one pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn from_sqlx(e: sqlx::Error) -> Error {
    match &e {
        sqlx::Error::RowNotFound => Error::NotFound("row not found".into()),
        sqlx::Error::Database(db)
            if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
        {
            Error::AlreadyExists(db.message().to_string())
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => Error::Transient(e.to_string()),
        _ => Error::Internal(format!("store: {e}")),
    }
}

fn config_row(row: &PgRow) -> std::result::Result<ConfigEntry, sqlx::Error> {
    Ok(ConfigEntry {
        key: row.try_get("key")?,
        value: row.try_get("value")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn prompt_row(row: &PgRow) -> std::result::Result<Prompt, sqlx::Error> {
    Ok(Prompt {
        id: row.try_get("id")?,
        key: row.try_get("key")?,
        language: row.try_get("language")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ConfigStore
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl ConfigStore for PgStore {
    async fn get_all(&self) -> Result<Vec<ConfigEntry>> {
        let rows = sqlx::query("SELECT key, value, updated_at FROM dynamic_config ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(from_sqlx)?;
        rows.iter().map(|r| config_row(r).map_err(from_sqlx)).collect()
    }

    async fn get(&self, key: &str) -> Result<ConfigEntry> {
        let row = sqlx::query("SELECT key, value, updated_at FROM dynamic_config WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(from_sqlx)?
            .ok_or_else(|| Error::NotFound(format!("config key \"{key}\"")))?;
        config_row(&row).map_err(from_sqlx)
    }

    async fn insert(&self, key: &str, value: &str) -> Result<ConfigEntry> {
        let row = sqlx::query(
            "INSERT INTO dynamic_config (key, value, updated_at) VALUES ($1, $2, now()) \
             ON CONFLICT (key) DO NOTHING \
             RETURNING key, value, updated_at",
        )
        .bind(key)
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(from_sqlx)?
        .ok_or_else(|| Error::AlreadyExists(format!("config key \"{key}\"")))?;
        config_row(&row).map_err(from_sqlx)
    }

    async fn update(&self, key: &str, value: &str) -> Result<ConfigEntry> {
        let row = sqlx::query(
            "UPDATE dynamic_config SET value = $2, updated_at = now() WHERE key = $1 \
             RETURNING key, value, updated_at",
        )
        .bind(key)
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(from_sqlx)?
        .ok_or_else(|| Error::NotFound(format!("config key \"{key}\"")))?;
        config_row(&row).map_err(from_sqlx)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PromptStore
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const PROMPT_COLUMNS: &str = "id, key, language, content, created_at, updated_at";

#[async_trait]
impl PromptStore for PgStore {
    async fn upsert(&self, key: &str, language: &str, content: &str) -> Result<Prompt> {
        let row = sqlx::query(
            "INSERT INTO prompts (id, key, language, content, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, now(), now()) \
             ON CONFLICT (key, language) \
             DO UPDATE SET content = EXCLUDED.content, updated_at = now() \
             RETURNING id, key, language, content, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(key)
        .bind(language)
        .bind(content)
        .fetch_one(&self.pool)
        .await
        .map_err(from_sqlx)?;
        prompt_row(&row).map_err(from_sqlx)
    }

    async fn get(&self, key: &str, language: &str) -> Result<Prompt> {
        let row = sqlx::query(&format!(
            "SELECT {PROMPT_COLUMNS} FROM prompts WHERE key = $1 AND language = $2"
        ))
        .bind(key)
        .bind(language)
        .fetch_optional(&self.pool)
        .await
        .map_err(from_sqlx)?
        .ok_or_else(|| Error::NotFound(format!("prompt \"{key}\" ({language})")))?;
        prompt_row(&row).map_err(from_sqlx)
    }

    async fn get_by_key(&self, key: &str) -> Result<BTreeMap<String, Prompt>> {
        let rows = sqlx::query(&format!(
            "SELECT {PROMPT_COLUMNS} FROM prompts WHERE key = $1 ORDER BY language"
        ))
        .bind(key)
        .fetch_all(&self.pool)
        .await
        .map_err(from_sqlx)?;
        if rows.is_empty() {
            return Err(Error::NotFound(format!("prompt key \"{key}\"")));
        }
        let mut map = BTreeMap::new();
        for row in &rows {
            let prompt = prompt_row(row).map_err(from_sqlx)?;
            map.insert(prompt.language.clone(), prompt);
        }
        Ok(map)
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT DISTINCT key FROM prompts ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(from_sqlx)?;
        rows.iter()
            .map(|r| r.try_get::<String, _>("key").map_err(from_sqlx))
            .collect()
    }

    async fn delete_by_key_and_lang(&self, key: &str, language: &str) -> Result<bool> {
        let done = sqlx::query("DELETE FROM prompts WHERE key = $1 AND language = $2")
            .bind(key)
            .bind(language)
            .execute(&self.pool)
            .await
            .map_err(from_sqlx)?;
        Ok(done.rows_affected() > 0)
    }

    async fn delete_by_key(&self, key: &str) -> Result<u64> {
        let done = sqlx::query("DELETE FROM prompts WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(from_sqlx)?;
        Ok(done.rows_affected())
    }

    async fn insert_key(&self, key: &str) -> Result<Prompt> {
        if !sqlx::query("SELECT 1 AS one FROM prompts WHERE key = $1 LIMIT 1")
            .bind(key)
            .fetch_all(&self.pool)
            .await
            .map_err(from_sqlx)?
            .is_empty()
        {
            return Err(Error::AlreadyExists(format!("prompt key \"{key}\"")));
        }
        let row = sqlx::query(
            "INSERT INTO prompts (id, key, language, content, created_at, updated_at) \
             VALUES ($1, $2, $3, '', now(), now()) \
             ON CONFLICT (key, language) DO NOTHING \
             RETURNING id, key, language, content, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(key)
        .bind(DEFAULT_LANGUAGE)
        .fetch_optional(&self.pool)
        .await
        .map_err(from_sqlx)?
        .ok_or_else(|| Error::AlreadyExists(format!("prompt key \"{key}\"")))?;
        prompt_row(&row).map_err(from_sqlx)
    }
}
