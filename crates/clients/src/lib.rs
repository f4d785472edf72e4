//! Outbound HTTP clients for the collaborator services (auth, gameplay,
//! story-generator), the shared inter-service credential they send, and
//! the background task that keeps that credential fresh.
//!
//! One client per collaborator, each wrapping a `reqwest::Client` with the
//! collaborator's own timeout. All requests carry the current credential in
//! `X-Internal-Service-Token`; a 401/403 triggers exactly one credential
//! reissue and one resend (see [`transport`]).

pub mod auth;
pub mod gameplay;
pub mod generator;
pub mod token;
pub mod transport;
pub mod types;

pub use auth::AuthClient;
pub use gameplay::GameplayClient;
pub use generator::GeneratorClient;
pub use token::{ServiceTokenCell, TokenLifecycleManager};
