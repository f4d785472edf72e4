//! Shared domain types for the novel-platform admin control plane.
//!
//! Everything here is transport-agnostic: the error taxonomy, the service
//! configuration, and the data model exchanged with the auth / gameplay /
//! story-generator collaborators.

pub mod config;
pub mod dyncfg;
pub mod error;
pub mod prompt;
pub mod story;
pub mod stream;
pub mod user;

pub use error::{Error, Result};
