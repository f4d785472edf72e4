//! Dynamic-configuration entries: runtime parameters other services
//! hot-reload when a change event arrives on the bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Well-known dynamic-config keys consumed inside this service.
pub mod keys {
    /// Number of characters a novel setup must carry.
    pub const NPC_COUNT: &str = "generation.npc_count";
    /// Number of choice blocks a scene must carry.
    pub const CHOICE_COUNT: &str = "generation.choice_count";
}

/// Validates a dynamic-config key: `^[a-z0-9_]+(\.[a-z0-9_]+)*$`
pub fn is_valid_key(key: &str) -> bool {
    if key.is_empty() {
        return false;
    }
    let mut expect_segment_char = true;
    for ch in key.chars() {
        if ch == '.' {
            if expect_segment_char {
                return false; // empty segment
            }
            expect_segment_char = true;
        } else if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' {
            expect_segment_char = false;
        } else {
            return false;
        }
    }
    // Must not end with a dot.
    !expect_segment_char
}

/// One runtime parameter. Values are strings on the wire; consumers type
/// them at the point of use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

impl ConfigEntry {
    pub fn as_usize(&self) -> Option<usize> {
        self.value.trim().parse().ok()
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.value.trim().parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_reads() {
        let e = ConfigEntry {
            key: keys::NPC_COUNT.into(),
            value: " 5 ".into(),
            updated_at: Utc::now(),
        };
        assert_eq!(e.as_usize(), Some(5));
        assert_eq!(e.as_f64(), Some(5.0));
    }

    #[test]
    fn key_validation() {
        assert!(is_valid_key("generation.npc_count"));
        assert!(is_valid_key("a"));
        assert!(is_valid_key("a_b.c_d.e2"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key(".leading"));
        assert!(!is_valid_key("trailing."));
        assert!(!is_valid_key("double..dot"));
        assert!(!is_valid_key("Upper.Case"));
        assert!(!is_valid_key("sp ace"));
    }

    #[test]
    fn garbage_reads_as_none() {
        let e = ConfigEntry {
            key: "k".into(),
            value: "five".into(),
            updated_at: Utc::now(),
        };
        assert_eq!(e.as_usize(), None);
    }
}
