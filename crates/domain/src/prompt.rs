//! Prompt records: LLM prompt templates keyed by (key, language).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Language tag used when a key is seeded without any translation yet.
pub const DEFAULT_LANGUAGE: &str = "en";

/// One prompt template. Composite uniqueness on (key, language); the
/// surrogate id exists only for storage bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prompt {
    pub id: Uuid,
    pub key: String,
    pub language: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Prompt {
    /// A prompt is newly created iff the upsert that produced it did an
    /// insert rather than an overwrite.
    pub fn is_newly_created(&self) -> bool {
        self.created_at == self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn newly_created_iff_timestamps_match() {
        let now = Utc::now();
        let mut p = Prompt {
            id: Uuid::new_v4(),
            key: "scene.system".into(),
            language: "en".into(),
            content: "...".into(),
            created_at: now,
            updated_at: now,
        };
        assert!(p.is_newly_created());
        p.updated_at = now + Duration::seconds(1);
        assert!(!p.is_newly_created());
    }
}
