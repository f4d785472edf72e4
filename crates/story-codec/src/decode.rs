//! Plain-text → story objects.
//!
//! Each decoder is a small state machine: `mode` tracks the open block,
//! `block` buffers its lines, and an empty line (or EOF) finalizes it.
//! All errors are `Error::Corrupted` with a 1-based line position.

use std::collections::BTreeMap;

use na_domain::error::{Error, Result};
use na_domain::story::{
    Character, Choice, GameOver, GameOverCondition, NovelSetup, Scene, SceneOption, StatDef,
    StoryConfig, VarValue, CORE_STAT_COUNT, OPTIONS_PER_CHOICE,
};

/// Lines a stat record occupies: name, description, initial, condition.
const STAT_RECORD_LINES: usize = 4;

/// Lines a character record occupies: name, description, personality,
/// appearance, background, relation, image prompt.
const CHAR_RECORD_LINES: usize = 7;

fn corrupt(line: usize, msg: impl std::fmt::Display) -> Error {
    Error::Corrupted(format!("line {line}: {msg}"))
}

/// Split a `key: value` line. Returns (key, value) with the value
/// whitespace-trimmed; `None` when the line carries no colon.
fn split_field(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    Some((key.trim(), value.trim()))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Shared block parsers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse a finalized `csd:` block into the stat map. The block must hold
/// exactly four 4-line records.
fn parse_stat_block(block: &[(usize, String)], opened_at: usize) -> Result<BTreeMap<String, StatDef>> {
    let expected = CORE_STAT_COUNT * STAT_RECORD_LINES;
    if block.len() != expected {
        return Err(corrupt(
            opened_at,
            format!(
                "csd block must hold exactly {expected} lines ({CORE_STAT_COUNT} stats of {STAT_RECORD_LINES} lines), got {}",
                block.len()
            ),
        ));
    }

    let mut stats = BTreeMap::new();
    for record in block.chunks(STAT_RECORD_LINES) {
        let (name_ln, name) = (&record[0].0, record[0].1.as_str());
        let description = record[1].1.clone();
        let (init_ln, init_raw) = (&record[2].0, record[2].1.as_str());
        let (go_ln, go_raw) = (&record[3].0, record[3].1.as_str());

        if name.is_empty() {
            return Err(corrupt(*name_ln, "stat name must not be empty"));
        }
        let initial: i64 = init_raw
            .parse()
            .map_err(|_| corrupt(*init_ln, format!("stat initial is not an integer: \"{init_raw}\"")))?;
        if !(0..=100).contains(&initial) {
            return Err(corrupt(*init_ln, format!("stat initial {initial} outside 0..=100")));
        }
        let game_over = GameOverCondition::parse(go_raw).ok_or_else(|| {
            corrupt(*go_ln, format!("game-over condition must be min, max or both, got \"{go_raw}\""))
        })?;

        if stats
            .insert(name.to_string(), StatDef { description, initial, game_over })
            .is_some()
        {
            return Err(corrupt(*name_ln, format!("duplicate stat \"{name}\"")));
        }
    }
    Ok(stats)
}

/// Parse a finalized `chars:` block: exactly `npc_count` 7-line records,
/// in cast order.
fn parse_char_block(
    block: &[(usize, String)],
    opened_at: usize,
    npc_count: usize,
) -> Result<Vec<Character>> {
    let expected = npc_count * CHAR_RECORD_LINES;
    if block.len() != expected {
        return Err(corrupt(
            opened_at,
            format!(
                "chars block must hold exactly {expected} lines ({npc_count} characters of {CHAR_RECORD_LINES} lines), got {}",
                block.len()
            ),
        ));
    }

    let mut characters = Vec::with_capacity(npc_count);
    for record in block.chunks(CHAR_RECORD_LINES) {
        if record[0].1.is_empty() {
            return Err(corrupt(record[0].0, "character name must not be empty"));
        }
        characters.push(Character {
            name: record[0].1.clone(),
            description: record[1].1.clone(),
            personality: record[2].1.clone(),
            appearance: record[3].1.clone(),
            background: record[4].1.clone(),
            relation: record[5].1.clone(),
            image_prompt: record[6].1.clone(),
        });
    }
    Ok(characters)
}

fn require<T>(field: Option<T>, name: &str) -> Result<T> {
    field.ok_or_else(|| Error::Corrupted(format!("missing required field \"{name}\"")))
}

/// Set a single-line field, rejecting duplicates.
fn set_once(slot: &mut Option<String>, value: &str, key: &str, line: usize) -> Result<()> {
    if slot.is_some() {
        return Err(corrupt(line, format!("duplicate field \"{key}\"")));
    }
    *slot = Some(value.to_string());
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Novel setup
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(PartialEq)]
enum SetupMode {
    None,
    Csd,
    Chars,
}

/// Decode a novel setup. `npc_count` comes from dynamic configuration
/// (`generation.npc_count`); the cast size must match exactly.
pub fn decode_setup(input: &str, npc_count: usize) -> Result<NovelSetup> {
    let mut mode = SetupMode::None;
    let mut block: Vec<(usize, String)> = Vec::new();
    let mut block_opened_at = 0usize;

    let mut summary_so_far = None;
    let mut future_direction = None;
    let mut preview_image_prompt = None;
    let mut stats: Option<BTreeMap<String, StatDef>> = None;
    let mut characters: Option<Vec<Character>> = None;

    let mut finalize = |mode: &mut SetupMode,
                        block: &mut Vec<(usize, String)>,
                        opened_at: usize,
                        stats: &mut Option<BTreeMap<String, StatDef>>,
                        characters: &mut Option<Vec<Character>>|
     -> Result<()> {
        match mode {
            SetupMode::None => {}
            SetupMode::Csd => *stats = Some(parse_stat_block(block, opened_at)?),
            SetupMode::Chars => *characters = Some(parse_char_block(block, opened_at, npc_count)?),
        }
        block.clear();
        *mode = SetupMode::None;
        Ok(())
    };

    for (idx, raw) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end();

        if line.trim().is_empty() {
            finalize(&mut mode, &mut block, block_opened_at, &mut stats, &mut characters)?;
            continue;
        }

        if mode != SetupMode::None {
            block.push((line_no, line.trim().to_string()));
            continue;
        }

        let (key, value) =
            split_field(line).ok_or_else(|| corrupt(line_no, format!("expected \"key: value\", got \"{line}\"")))?;
        match key {
            "sssf" => set_once(&mut summary_so_far, value, key, line_no)?,
            "fd" => set_once(&mut future_direction, value, key, line_no)?,
            "spi" => set_once(&mut preview_image_prompt, value, key, line_no)?,
            "csd" | "chars" => {
                if !value.is_empty() {
                    return Err(corrupt(line_no, format!("block introducer \"{key}:\" takes no value")));
                }
                if (key == "csd" && stats.is_some()) || (key == "chars" && characters.is_some()) {
                    return Err(corrupt(line_no, format!("duplicate block \"{key}\"")));
                }
                block_opened_at = line_no;
                mode = if key == "csd" { SetupMode::Csd } else { SetupMode::Chars };
            }
            other => return Err(corrupt(line_no, format!("unknown field \"{other}\""))),
        }
    }
    finalize(&mut mode, &mut block, block_opened_at, &mut stats, &mut characters)?;

    Ok(NovelSetup {
        summary_so_far: require(summary_so_far, "sssf")?,
        future_direction: require(future_direction, "fd")?,
        stats: require(stats, "csd")?,
        characters: require(characters, "chars")?,
        preview_image_prompt: require(preview_image_prompt, "spi")?,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Story config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Decode a story config: `t`, `g`, `w`, `pc` plus a `csd:` block.
pub fn decode_config(input: &str) -> Result<StoryConfig> {
    let mut in_csd = false;
    let mut block: Vec<(usize, String)> = Vec::new();
    let mut block_opened_at = 0usize;

    let mut title = None;
    let mut genre = None;
    let mut world = None;
    let mut protagonist = None;
    let mut stats: Option<BTreeMap<String, StatDef>> = None;

    for (idx, raw) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end();

        if line.trim().is_empty() {
            if in_csd {
                stats = Some(parse_stat_block(&block, block_opened_at)?);
                block.clear();
                in_csd = false;
            }
            continue;
        }
        if in_csd {
            block.push((line_no, line.trim().to_string()));
            continue;
        }

        let (key, value) =
            split_field(line).ok_or_else(|| corrupt(line_no, format!("expected \"key: value\", got \"{line}\"")))?;
        match key {
            "t" => set_once(&mut title, value, key, line_no)?,
            "g" => set_once(&mut genre, value, key, line_no)?,
            "w" => set_once(&mut world, value, key, line_no)?,
            "pc" => set_once(&mut protagonist, value, key, line_no)?,
            "csd" => {
                if !value.is_empty() {
                    return Err(corrupt(line_no, "block introducer \"csd:\" takes no value"));
                }
                if stats.is_some() {
                    return Err(corrupt(line_no, "duplicate block \"csd\""));
                }
                block_opened_at = line_no;
                in_csd = true;
            }
            other => return Err(corrupt(line_no, format!("unknown field \"{other}\""))),
        }
    }
    if in_csd {
        stats = Some(parse_stat_block(&block, block_opened_at)?);
    }

    Ok(StoryConfig {
        title: require(title, "t")?,
        genre: require(genre, "g")?,
        world: require(world, "w")?,
        protagonist: require(protagonist, "pc")?,
        stats: require(stats, "csd")?,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scenes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(PartialEq)]
enum SceneMode {
    None,
    Svd,
    Ch,
}

/// Decode a scene.
///
/// `stat_names` and `var_names` are the ordered name arrays the scene's
/// index-based consequence references (`cs:`, `sv:`) resolve against;
/// `choice_count` comes from `generation.choice_count`. Every referenced
/// story variable must carry a definition in the scene's `svd` map.
pub fn decode_scene(
    input: &str,
    stat_names: &[String],
    var_names: &[String],
    choice_count: usize,
) -> Result<Scene> {
    let mut mode = SceneMode::None;
    let mut block: Vec<(usize, String)> = Vec::new();
    let mut block_opened_at = 0usize;

    let mut title = None;
    let mut text = None;
    let mut variable_impact = None;
    let mut variable_defs: Option<BTreeMap<String, String>> = None;
    let mut choices: Vec<Choice> = Vec::new();

    let mut finalize = |mode: &mut SceneMode,
                        block: &mut Vec<(usize, String)>,
                        opened_at: usize,
                        variable_defs: &mut Option<BTreeMap<String, String>>,
                        choices: &mut Vec<Choice>|
     -> Result<()> {
        match mode {
            SceneMode::None => {}
            SceneMode::Svd => *variable_defs = Some(parse_svd_block(block, opened_at)?),
            SceneMode::Ch => choices.push(parse_choice_block(block, opened_at, stat_names, var_names)?),
        }
        block.clear();
        *mode = SceneMode::None;
        Ok(())
    };

    for (idx, raw) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end();

        if line.trim().is_empty() {
            finalize(&mut mode, &mut block, block_opened_at, &mut variable_defs, &mut choices)?;
            continue;
        }
        if mode != SceneMode::None {
            block.push((line_no, line.trim().to_string()));
            continue;
        }

        let (key, value) =
            split_field(line).ok_or_else(|| corrupt(line_no, format!("expected \"key: value\", got \"{line}\"")))?;
        match key {
            "st" => set_once(&mut title, value, key, line_no)?,
            "txt" => set_once(&mut text, value, key, line_no)?,
            "vis" => set_once(&mut variable_impact, value, key, line_no)?,
            "svd" => {
                if !value.is_empty() {
                    return Err(corrupt(line_no, "block introducer \"svd:\" takes no value"));
                }
                if variable_defs.is_some() {
                    return Err(corrupt(line_no, "duplicate block \"svd\""));
                }
                block_opened_at = line_no;
                mode = SceneMode::Svd;
            }
            "ch" => {
                if !value.is_empty() {
                    return Err(corrupt(line_no, "block introducer \"ch:\" takes no value"));
                }
                block_opened_at = line_no;
                mode = SceneMode::Ch;
            }
            other => return Err(corrupt(line_no, format!("unknown field \"{other}\""))),
        }
    }
    finalize(&mut mode, &mut block, block_opened_at, &mut variable_defs, &mut choices)?;

    if choices.len() != choice_count {
        return Err(Error::Corrupted(format!(
            "expected {choice_count} choice blocks, got {}",
            choices.len()
        )));
    }

    let scene = Scene {
        title,
        text: require(text, "txt")?,
        variable_impact,
        variable_defs: variable_defs.unwrap_or_default(),
        choices,
    };

    // Every mutated story variable needs a definition in this scene.
    for (ci, choice) in scene.choices.iter().enumerate() {
        for (oi, option) in choice.options.iter().enumerate() {
            for name in option.var_mutations.keys() {
                if !scene.variable_defs.contains_key(name) {
                    return Err(Error::Corrupted(format!(
                        "choice {}, option {}: story variable \"{name}\" has no definition in svd",
                        ci + 1,
                        oi + 1
                    )));
                }
            }
        }
    }

    Ok(scene)
}

/// Parse a finalized `svd:` block: 2-line records (name, definition).
fn parse_svd_block(block: &[(usize, String)], opened_at: usize) -> Result<BTreeMap<String, String>> {
    if block.len() % 2 != 0 {
        return Err(corrupt(
            opened_at,
            format!("svd block must hold 2-line records (name, definition), got {} lines", block.len()),
        ));
    }
    let mut defs = BTreeMap::new();
    for record in block.chunks(2) {
        let (name_ln, name) = (&record[0].0, record[0].1.as_str());
        if name.is_empty() {
            return Err(corrupt(*name_ln, "story variable name must not be empty"));
        }
        if defs.insert(name.to_string(), record[1].1.clone()).is_some() {
            return Err(corrupt(*name_ln, format!("duplicate story variable \"{name}\"")));
        }
    }
    Ok(defs)
}

/// Parse a finalized `ch:` block: a prompt line followed by exactly two
/// option groups (`o:` line plus optional `cs:` / `sv:` / `gf:` lines).
fn parse_choice_block(
    block: &[(usize, String)],
    opened_at: usize,
    stat_names: &[String],
    var_names: &[String],
) -> Result<Choice> {
    let mut lines = block.iter();
    let (_, prompt) = lines
        .next()
        .ok_or_else(|| corrupt(opened_at, "choice block is empty"))?;
    if split_field(prompt).map(|(k, _)| matches!(k, "o" | "cs" | "sv" | "gf")) == Some(true) {
        return Err(corrupt(opened_at, "choice block is missing its prompt line"));
    }

    let mut options: Vec<SceneOption> = Vec::new();
    for (line_no, line) in lines {
        let (key, value) = split_field(line)
            .ok_or_else(|| corrupt(*line_no, format!("expected \"key: value\" inside choice block, got \"{line}\"")))?;
        match key {
            "o" => options.push(SceneOption {
                text: value.to_string(),
                ..SceneOption::default()
            }),
            "cs" | "sv" | "gf" => {
                let option = options
                    .last_mut()
                    .ok_or_else(|| corrupt(*line_no, format!("\"{key}:\" before any \"o:\" option line")))?;
                match key {
                    "cs" => parse_stat_deltas(option, value, *line_no, stat_names)?,
                    "sv" => parse_var_mutations(option, value, *line_no, var_names)?,
                    _ => parse_global_flags(option, value),
                }
            }
            other => return Err(corrupt(*line_no, format!("unknown field \"{other}\" inside choice block"))),
        }
    }

    if options.len() != OPTIONS_PER_CHOICE {
        return Err(corrupt(
            opened_at,
            format!("choice block must hold exactly {OPTIONS_PER_CHOICE} options, got {}", options.len()),
        ));
    }
    Ok(Choice {
        prompt: prompt.clone(),
        options,
    })
}

/// `cs: 0:10, 2:-5`: indexes into the caller-supplied stat-name array.
fn parse_stat_deltas(
    option: &mut SceneOption,
    value: &str,
    line_no: usize,
    stat_names: &[String],
) -> Result<()> {
    for part in value.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (idx_raw, delta_raw) = part
            .split_once(':')
            .ok_or_else(|| corrupt(line_no, format!("expected \"index:delta\", got \"{part}\"")))?;
        let idx: usize = idx_raw
            .trim()
            .parse()
            .map_err(|_| corrupt(line_no, format!("stat index is not a number: \"{idx_raw}\"")))?;
        let name = stat_names
            .get(idx)
            .ok_or_else(|| corrupt(line_no, format!("stat index {idx} out of range ({} stats)", stat_names.len())))?;
        let delta: i64 = delta_raw
            .trim()
            .parse()
            .map_err(|_| corrupt(line_no, format!("stat delta is not an integer: \"{delta_raw}\"")))?;
        if option.stat_deltas.insert(name.clone(), delta).is_some() {
            return Err(corrupt(line_no, format!("duplicate stat reference {idx} (\"{name}\")")));
        }
    }
    Ok(())
}

/// `sv: 0:true, 1:42`: indexes into the caller-supplied variable-name
/// array; values are type-inferred.
fn parse_var_mutations(
    option: &mut SceneOption,
    value: &str,
    line_no: usize,
    var_names: &[String],
) -> Result<()> {
    for part in value.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (idx_raw, val_raw) = part
            .split_once(':')
            .ok_or_else(|| corrupt(line_no, format!("expected \"index:value\", got \"{part}\"")))?;
        let idx: usize = idx_raw
            .trim()
            .parse()
            .map_err(|_| corrupt(line_no, format!("variable index is not a number: \"{idx_raw}\"")))?;
        let name = var_names.get(idx).ok_or_else(|| {
            corrupt(line_no, format!("variable index {idx} out of range ({} variables)", var_names.len()))
        })?;
        let parsed = VarValue::infer(val_raw.trim());
        if option.var_mutations.insert(name.clone(), parsed).is_some() {
            return Err(corrupt(line_no, format!("duplicate variable reference {idx} (\"{name}\")")));
        }
    }
    Ok(())
}

/// `gf: flag_a, flag_b`: appended in order.
fn parse_global_flags(option: &mut SceneOption, value: &str) {
    for part in value.split(',') {
        let part = part.trim();
        if !part.is_empty() {
            option.global_flags.push(part.to_string());
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Game over
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Decode a game-over ending: `et` (title) and `es` (ending story) are
/// required, `spi` is optional.
pub fn decode_game_over(input: &str) -> Result<GameOver> {
    let mut title = None;
    let mut ending = None;
    let mut image_prompt = None;

    for (idx, raw) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        let (key, value) =
            split_field(line).ok_or_else(|| corrupt(line_no, format!("expected \"key: value\", got \"{line}\"")))?;
        match key {
            "et" => set_once(&mut title, value, key, line_no)?,
            "es" => set_once(&mut ending, value, key, line_no)?,
            "spi" => set_once(&mut image_prompt, value, key, line_no)?,
            other => return Err(corrupt(line_no, format!("unknown field \"{other}\""))),
        }
    }

    Ok(GameOver {
        title: require(title, "et")?,
        ending: require(ending, "es")?,
        image_prompt,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
