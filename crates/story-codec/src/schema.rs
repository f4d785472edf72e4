//! JSON-schema generation for structured generator output.
//!
//! Schemas are built fresh on every call, never cached, so a
//! dynamic-config change (NPC count, choice count) takes effect on the
//! very next generation, and callers may freely mutate what they get
//! back without poisoning anyone else.

use serde_json::{json, Value};

use na_domain::story::{CORE_STAT_COUNT, OPTIONS_PER_CHOICE};

/// Fallback cast size when `generation.npc_count` is unset.
pub const DEFAULT_NPC_COUNT: usize = 3;

/// Fallback choice-block count when `generation.choice_count` is unset.
pub const DEFAULT_CHOICE_COUNT: usize = 2;

/// Shape parameters read from dynamic configuration at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationParams {
    pub npc_count: usize,
    pub choice_count: usize,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            npc_count: DEFAULT_NPC_COUNT,
            choice_count: DEFAULT_CHOICE_COUNT,
        }
    }
}

/// The prompt types the generator is driven with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    StoryConfig,
    NovelSetup,
    FirstScene,
    NextScene,
    GameOver,
}

impl PromptKind {
    pub fn schema_name(&self) -> &'static str {
        match self {
            PromptKind::StoryConfig => "story_config",
            PromptKind::NovelSetup => "novel_setup",
            PromptKind::FirstScene => "first_scene",
            PromptKind::NextScene => "next_scene",
            PromptKind::GameOver => "game_over",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "story_config" => Some(PromptKind::StoryConfig),
            "novel_setup" => Some(PromptKind::NovelSetup),
            "first_scene" => Some(PromptKind::FirstScene),
            "next_scene" => Some(PromptKind::NextScene),
            "game_over" => Some(PromptKind::GameOver),
            _ => None,
        }
    }

    pub fn all() -> [PromptKind; 5] {
        [
            PromptKind::StoryConfig,
            PromptKind::NovelSetup,
            PromptKind::FirstScene,
            PromptKind::NextScene,
            PromptKind::GameOver,
        ]
    }
}

/// Build the JSON schema for one prompt type under the given shape
/// parameters. Returns the schema and its registered name.
pub fn schema_for(kind: PromptKind, params: &GenerationParams) -> (Value, &'static str) {
    let schema = match kind {
        PromptKind::StoryConfig => story_config_schema(),
        PromptKind::NovelSetup => novel_setup_schema(params),
        PromptKind::FirstScene => scene_schema(params, false),
        PromptKind::NextScene => scene_schema(params, true),
        PromptKind::GameOver => game_over_schema(),
    };
    (schema, kind.schema_name())
}

fn stat_def_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "description": { "type": "string" },
            "initial": { "type": "integer", "minimum": 0, "maximum": 100 },
            "game_over": { "type": "string", "enum": ["min", "max", "both"] }
        },
        "required": ["description", "initial", "game_over"],
        "additionalProperties": false
    })
}

fn stat_map_schema() -> Value {
    json!({
        "type": "object",
        "minProperties": CORE_STAT_COUNT,
        "maxProperties": CORE_STAT_COUNT,
        "additionalProperties": stat_def_schema()
    })
}

fn story_config_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "t": { "type": "string" },
            "g": { "type": "string" },
            "w": { "type": "string" },
            "pc": { "type": "string" },
            "csd": stat_map_schema()
        },
        "required": ["t", "g", "w", "pc", "csd"],
        "additionalProperties": false
    })
}

fn character_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": { "type": "string" },
            "description": { "type": "string" },
            "personality": { "type": "string" },
            "appearance": { "type": "string" },
            "background": { "type": "string" },
            "relation": { "type": "string" },
            "image_prompt": { "type": "string" }
        },
        "required": [
            "name", "description", "personality", "appearance",
            "background", "relation", "image_prompt"
        ],
        "additionalProperties": false
    })
}

fn novel_setup_schema(params: &GenerationParams) -> Value {
    json!({
        "type": "object",
        "properties": {
            "sssf": { "type": "string" },
            "fd": { "type": "string" },
            "csd": stat_map_schema(),
            "chars": {
                "type": "array",
                "minItems": params.npc_count,
                "maxItems": params.npc_count,
                "items": character_schema()
            },
            "spi": { "type": "string" }
        },
        "required": ["sssf", "fd", "csd", "chars", "spi"],
        "additionalProperties": false
    })
}

fn option_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "text": { "type": "string" },
            "cs": {
                "type": "object",
                "additionalProperties": { "type": "integer" }
            },
            "sv": {
                "type": "object",
                "additionalProperties": {
                    "type": ["boolean", "integer", "number", "string"]
                }
            },
            "gf": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["text"],
        "additionalProperties": false
    })
}

fn choice_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "prompt": { "type": "string" },
            "options": {
                "type": "array",
                "minItems": OPTIONS_PER_CHOICE,
                "maxItems": OPTIONS_PER_CHOICE,
                "items": option_schema()
            }
        },
        "required": ["prompt", "options"],
        "additionalProperties": false
    })
}

fn scene_schema(params: &GenerationParams, allow_game_over: bool) -> Value {
    let mut schema = json!({
        "type": "object",
        "properties": {
            "st": { "type": "string" },
            "txt": { "type": "string" },
            "vis": { "type": "string" },
            "svd": {
                "type": "object",
                "additionalProperties": { "type": "string" }
            },
            "ch": {
                "type": "array",
                "minItems": params.choice_count,
                "maxItems": params.choice_count,
                "items": choice_schema()
            }
        },
        "required": ["txt", "svd", "ch"],
        "additionalProperties": false
    });
    if allow_game_over {
        schema["properties"]["game_over"] = game_over_schema();
    }
    schema
}

fn game_over_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "et": { "type": "string" },
            "es": { "type": "string" },
            "spi": { "type": "string" }
        },
        "required": ["et", "es"],
        "additionalProperties": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_schema_pins_cast_size() {
        let params = GenerationParams {
            npc_count: 5,
            choice_count: 2,
        };
        let (schema, name) = schema_for(PromptKind::NovelSetup, &params);
        assert_eq!(name, "novel_setup");
        assert_eq!(schema["properties"]["chars"]["minItems"], 5);
        assert_eq!(schema["properties"]["chars"]["maxItems"], 5);
    }

    #[test]
    fn scene_schema_pins_choice_count() {
        let params = GenerationParams {
            npc_count: 3,
            choice_count: 4,
        };
        for kind in [PromptKind::FirstScene, PromptKind::NextScene] {
            let (schema, _) = schema_for(kind, &params);
            assert_eq!(schema["properties"]["ch"]["minItems"], 4);
            assert_eq!(schema["properties"]["ch"]["maxItems"], 4);
        }
    }

    #[test]
    fn story_config_pins_stat_count() {
        let (schema, _) = schema_for(PromptKind::StoryConfig, &GenerationParams::default());
        assert_eq!(schema["properties"]["csd"]["minProperties"], 4);
        assert_eq!(schema["properties"]["csd"]["maxProperties"], 4);
    }

    #[test]
    fn next_scene_allows_game_over() {
        let params = GenerationParams::default();
        let (first, _) = schema_for(PromptKind::FirstScene, &params);
        let (next, _) = schema_for(PromptKind::NextScene, &params);
        assert!(first["properties"].get("game_over").is_none());
        assert!(next["properties"].get("game_over").is_some());
    }

    // A caller extending one returned schema must not leak into the next
    // request; interleaved prompt types stay independent.
    #[test]
    fn returned_schemas_are_independent() {
        let params = GenerationParams::default();
        let (mut setup, _) = schema_for(PromptKind::NovelSetup, &params);
        setup["required"]
            .as_array_mut()
            .unwrap()
            .push(serde_json::json!("injected"));
        setup["properties"]["chars"]["minItems"] = serde_json::json!(99);

        let (scene, _) = schema_for(PromptKind::FirstScene, &params);
        assert!(scene["required"].as_array().unwrap().iter().all(|v| v != "injected"));

        let (fresh_setup, _) = schema_for(PromptKind::NovelSetup, &params);
        assert_eq!(fresh_setup["properties"]["chars"]["minItems"], 3);
        assert!(fresh_setup["required"].as_array().unwrap().iter().all(|v| v != "injected"));
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in PromptKind::all() {
            assert_eq!(PromptKind::parse(kind.schema_name()), Some(kind));
        }
        assert_eq!(PromptKind::parse("unknown"), None);
    }
}
