//! The story object model exchanged over the plain-text codec: story
//! configs, novel setups, scenes, and game-over endings.
//!
//! Maps are `BTreeMap` so that encoding is deterministic and structural
//! equality ignores insertion order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Story config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Which end of the stat range terminates the story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameOverCondition {
    Min,
    Max,
    Both,
}

impl GameOverCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameOverCondition::Min => "min",
            GameOverCondition::Max => "max",
            GameOverCondition::Both => "both",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "min" => Some(GameOverCondition::Min),
            "max" => Some(GameOverCondition::Max),
            "both" => Some(GameOverCondition::Both),
            _ => None,
        }
    }
}

/// Definition of one core stat. Initial values live in `0..=100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatDef {
    pub description: String,
    pub initial: i64,
    pub game_over: GameOverCondition,
}

/// Number of core stats every story carries.
pub const CORE_STAT_COUNT: usize = 4;

/// Number of options in every choice block.
pub const OPTIONS_PER_CHOICE: usize = 2;

/// The story premise an operator (or the generator) authors before play
/// begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryConfig {
    pub title: String,
    pub genre: String,
    pub world: String,
    pub protagonist: String,
    /// Exactly [`CORE_STAT_COUNT`] entries, keyed by stat name.
    pub stats: BTreeMap<String, StatDef>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Novel setup
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A non-player character in the cast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub description: String,
    pub personality: String,
    pub appearance: String,
    pub background: String,
    /// Relation to the protagonist.
    pub relation: String,
    pub image_prompt: String,
}

/// The generated setup a story starts from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NovelSetup {
    pub summary_so_far: String,
    pub future_direction: String,
    /// Exactly [`CORE_STAT_COUNT`] entries, keyed by stat name.
    pub stats: BTreeMap<String, StatDef>,
    /// Exactly `generation.npc_count` characters, in cast order.
    pub characters: Vec<Character>,
    pub preview_image_prompt: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scenes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A typed story-variable value. Inference precedence on the wire:
/// bool, int, float, then verbatim string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl VarValue {
    /// Parse a wire token into the most specific type that accepts it.
    pub fn infer(raw: &str) -> VarValue {
        match raw {
            "true" => return VarValue::Bool(true),
            "false" => return VarValue::Bool(false),
            _ => {}
        }
        if let Ok(i) = raw.parse::<i64>() {
            return VarValue::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return VarValue::Float(f);
        }
        VarValue::Str(raw.to_string())
    }

    /// Wire form. Inverse of [`VarValue::infer`] for all values that
    /// round-trip (strings that look like numbers do not).
    pub fn to_wire(&self) -> String {
        match self {
            VarValue::Bool(b) => b.to_string(),
            VarValue::Int(i) => i.to_string(),
            VarValue::Float(f) => f.to_string(),
            VarValue::Str(s) => s.clone(),
        }
    }
}

/// What picking one option does to the story state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneOption {
    pub text: String,
    /// Core-stat deltas, keyed by stat name.
    pub stat_deltas: BTreeMap<String, i64>,
    /// Story-variable mutations, keyed by variable name.
    pub var_mutations: BTreeMap<String, VarValue>,
    /// Global flags appended when this option is picked.
    pub global_flags: Vec<String>,
}

/// One choice block: a prompt plus exactly [`OPTIONS_PER_CHOICE`] options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub prompt: String,
    pub options: Vec<SceneOption>,
}

/// A generated scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub title: Option<String>,
    pub text: String,
    /// Variable-impact summary shown to the player.
    #[serde(default)]
    pub variable_impact: Option<String>,
    /// Definitions for every story variable this scene's options mutate.
    pub variable_defs: BTreeMap<String, String>,
    /// Exactly `generation.choice_count` choice blocks.
    pub choices: Vec<Choice>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Game over
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameOver {
    pub title: String,
    pub ending: String,
    #[serde(default)]
    pub image_prompt: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_value_inference_precedence() {
        assert_eq!(VarValue::infer("true"), VarValue::Bool(true));
        assert_eq!(VarValue::infer("false"), VarValue::Bool(false));
        assert_eq!(VarValue::infer("42"), VarValue::Int(42));
        assert_eq!(VarValue::infer("-7"), VarValue::Int(-7));
        assert_eq!(VarValue::infer("3.5"), VarValue::Float(3.5));
        assert_eq!(
            VarValue::infer("ancient sword"),
            VarValue::Str("ancient sword".into())
        );
    }

    #[test]
    fn var_value_wire_round_trip() {
        for v in [
            VarValue::Bool(true),
            VarValue::Int(-3),
            VarValue::Float(0.25),
            VarValue::Str("torch".into()),
        ] {
            assert_eq!(VarValue::infer(&v.to_wire()), v);
        }
    }

    #[test]
    fn game_over_condition_strings() {
        for c in [
            GameOverCondition::Min,
            GameOverCondition::Max,
            GameOverCondition::Both,
        ] {
            assert_eq!(GameOverCondition::parse(c.as_str()), Some(c));
        }
        assert_eq!(GameOverCondition::parse("neither"), None);
    }
}
