//! Codec between the story object model and the constrained plain-text
//! wire format used for LLM output, plus the JSON-schema generator for
//! structured-output prompting.
//!
//! The plain-text format is line-oriented: single-line `key: value`
//! fields, and block introducers (`csd:`, `chars:`, `svd:`, `ch:`)
//! followed by fixed-shape records. An empty line finalizes the open
//! block. Decoding is strict: wrong record sizes, unknown fields, and
//! out-of-range index references fail the whole decode with a
//! position-qualified error.
//!
//! Both directions are pure functions (no I/O, no logging) so the
//! round-trip law (`decode(encode(x)) == x` for well-formed `x`) can be
//! tested exhaustively.

pub mod decode;
pub mod encode;
pub mod schema;

pub use decode::{decode_config, decode_game_over, decode_scene, decode_setup};
pub use encode::{encode_config, encode_game_over, encode_scene, encode_setup};
pub use schema::{schema_for, GenerationParams, PromptKind};
