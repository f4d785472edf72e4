//! Story objects → plain text.
//!
//! Encoding is deterministic: maps iterate in key order, index references
//! are emitted sorted, empty fields are never written, and no line carries
//! trailing whitespace. `decode(encode(x))` returns a structurally equal
//! object for every well-formed `x`.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use na_domain::error::{Error, Result};
use na_domain::story::{GameOver, NovelSetup, Scene, SceneOption, StatDef, StoryConfig};

fn push_field(out: &mut String, key: &str, value: &str) {
    if !value.is_empty() {
        let _ = writeln!(out, "{key}: {value}");
    }
}

fn push_stat_block(out: &mut String, stats: &BTreeMap<String, StatDef>) {
    out.push_str("csd:\n");
    for (name, def) in stats {
        let _ = writeln!(out, "{name}");
        let _ = writeln!(out, "{}", def.description);
        let _ = writeln!(out, "{}", def.initial);
        let _ = writeln!(out, "{}", def.game_over.as_str());
    }
    out.push('\n');
}

/// Encode a novel setup. Field order: `sssf`, `fd`, `spi`, then the
/// `csd` and `chars` blocks.
pub fn encode_setup(setup: &NovelSetup) -> String {
    let mut out = String::new();
    push_field(&mut out, "sssf", &setup.summary_so_far);
    push_field(&mut out, "fd", &setup.future_direction);
    push_field(&mut out, "spi", &setup.preview_image_prompt);
    push_stat_block(&mut out, &setup.stats);
    out.push_str("chars:\n");
    for c in &setup.characters {
        for line in [
            &c.name,
            &c.description,
            &c.personality,
            &c.appearance,
            &c.background,
            &c.relation,
            &c.image_prompt,
        ] {
            let _ = writeln!(out, "{line}");
        }
    }
    out.push('\n');
    out
}

/// Encode a story config. Field order: `t`, `g`, `w`, `pc`, `csd`.
pub fn encode_config(config: &StoryConfig) -> String {
    let mut out = String::new();
    push_field(&mut out, "t", &config.title);
    push_field(&mut out, "g", &config.genre);
    push_field(&mut out, "w", &config.world);
    push_field(&mut out, "pc", &config.protagonist);
    push_stat_block(&mut out, &config.stats);
    out
}

/// Encode a scene against the same ordered name arrays the decoder uses.
///
/// Fails with `InvalidInput` if an option references a stat or variable
/// name missing from the arrays, since consequences are written as indices.
pub fn encode_scene(scene: &Scene, stat_names: &[String], var_names: &[String]) -> Result<String> {
    let mut out = String::new();
    if let Some(title) = &scene.title {
        push_field(&mut out, "st", title);
    }
    push_field(&mut out, "txt", &scene.text);
    if let Some(vis) = &scene.variable_impact {
        push_field(&mut out, "vis", vis);
    }

    if !scene.variable_defs.is_empty() {
        out.push_str("svd:\n");
        for (name, def) in &scene.variable_defs {
            let _ = writeln!(out, "{name}");
            let _ = writeln!(out, "{def}");
        }
        out.push('\n');
    }

    for choice in &scene.choices {
        out.push_str("ch:\n");
        let _ = writeln!(out, "{}", choice.prompt);
        for option in &choice.options {
            push_option(&mut out, option, stat_names, var_names)?;
        }
        out.push('\n');
    }
    Ok(out)
}

fn push_option(
    out: &mut String,
    option: &SceneOption,
    stat_names: &[String],
    var_names: &[String],
) -> Result<()> {
    let _ = writeln!(out, "o: {}", option.text);

    if !option.stat_deltas.is_empty() {
        let mut refs: Vec<(usize, i64)> = Vec::with_capacity(option.stat_deltas.len());
        for (name, delta) in &option.stat_deltas {
            let idx = index_of(stat_names, name)
                .ok_or_else(|| Error::InvalidInput(format!("stat \"{name}\" is not in the stat-name array")))?;
            refs.push((idx, *delta));
        }
        refs.sort_unstable_by_key(|(idx, _)| *idx);
        let parts: Vec<String> = refs.iter().map(|(i, d)| format!("{i}:{d}")).collect();
        let _ = writeln!(out, "cs: {}", parts.join(", "));
    }

    if !option.var_mutations.is_empty() {
        let mut refs: Vec<(usize, String)> = Vec::with_capacity(option.var_mutations.len());
        for (name, value) in &option.var_mutations {
            let idx = index_of(var_names, name)
                .ok_or_else(|| Error::InvalidInput(format!("variable \"{name}\" is not in the variable-name array")))?;
            refs.push((idx, value.to_wire()));
        }
        refs.sort_unstable_by_key(|(idx, _)| *idx);
        let parts: Vec<String> = refs.iter().map(|(i, v)| format!("{i}:{v}")).collect();
        let _ = writeln!(out, "sv: {}", parts.join(", "));
    }

    if !option.global_flags.is_empty() {
        let _ = writeln!(out, "gf: {}", option.global_flags.join(", "));
    }
    Ok(())
}

fn index_of(names: &[String], name: &str) -> Option<usize> {
    names.iter().position(|n| n == name)
}

/// Encode a game-over ending.
pub fn encode_game_over(go: &GameOver) -> String {
    let mut out = String::new();
    push_field(&mut out, "et", &go.title);
    push_field(&mut out, "es", &go.ending);
    if let Some(spi) = &go.image_prompt {
        push_field(&mut out, "spi", spi);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use na_domain::story::{Choice, GameOverCondition, VarValue};

    #[test]
    fn encode_skips_empty_fields() {
        let go = GameOver {
            title: "The End".into(),
            ending: "It is done.".into(),
            image_prompt: None,
        };
        let text = encode_game_over(&go);
        assert!(!text.contains("spi"));
    }

    #[test]
    fn no_trailing_whitespace() {
        let go = GameOver {
            title: "The End".into(),
            ending: "It is done.".into(),
            image_prompt: Some("ruins at dawn".into()),
        };
        for line in encode_game_over(&go).lines() {
            assert_eq!(line, line.trim_end());
        }
    }

    #[test]
    fn scene_consequences_emitted_as_sorted_indices() {
        let stat_names: Vec<String> = ["Courage", "Luck"].map(String::from).to_vec();
        let var_names: Vec<String> = ["gold"].map(String::from).to_vec();
        let mut option = SceneOption {
            text: "Go".into(),
            ..SceneOption::default()
        };
        option.stat_deltas.insert("Luck".into(), -5);
        option.stat_deltas.insert("Courage".into(), 10);
        option.var_mutations.insert("gold".into(), VarValue::Int(3));
        let scene = Scene {
            title: None,
            text: "A fork in the road.".into(),
            variable_impact: None,
            variable_defs: [("gold".to_string(), "Coins.".to_string())].into_iter().collect(),
            choices: vec![Choice {
                prompt: "Which way?".into(),
                options: vec![option.clone(), option],
            }],
        };
        let text = encode_scene(&scene, &stat_names, &var_names).unwrap();
        assert!(text.contains("cs: 0:10, 1:-5"), "{text}");
        assert!(text.contains("sv: 0:3"), "{text}");
    }

    #[test]
    fn scene_with_unknown_stat_fails() {
        let scene = Scene {
            title: None,
            text: "x".into(),
            variable_impact: None,
            variable_defs: BTreeMap::new(),
            choices: vec![Choice {
                prompt: "p".into(),
                options: vec![
                    SceneOption {
                        text: "a".into(),
                        stat_deltas: [("Ghost".to_string(), 1)].into_iter().collect(),
                        ..SceneOption::default()
                    },
                    SceneOption {
                        text: "b".into(),
                        ..SceneOption::default()
                    },
                ],
            }],
        };
        let err = encode_scene(&scene, &[], &[]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)), "{err}");
    }

    #[test]
    fn stat_block_is_key_sorted() {
        let mut stats = BTreeMap::new();
        stats.insert(
            "Zeal".to_string(),
            StatDef {
                description: "z".into(),
                initial: 1,
                game_over: GameOverCondition::Min,
            },
        );
        stats.insert(
            "Awe".to_string(),
            StatDef {
                description: "a".into(),
                initial: 2,
                game_over: GameOverCondition::Max,
            },
        );
        let config = StoryConfig {
            title: "t".into(),
            genre: "g".into(),
            world: "w".into(),
            protagonist: "p".into(),
            stats,
        };
        let text = encode_config(&config);
        let awe = text.find("Awe").unwrap();
        let zeal = text.find("Zeal").unwrap();
        assert!(awe < zeal);
    }
}
