use std::sync::Arc;

use na_bus::EventPublisher;
use na_clients::{AuthClient, GameplayClient, GeneratorClient};
use na_domain::config::Config;

use crate::engine::dynconfig::DynamicConfigEngine;
use crate::engine::generation::SchemaProvider;
use crate::engine::prompts::PromptRegistry;

/// Shared application state passed to all handlers.
///
/// Fields are grouped by concern:
/// - **Config & secrets** — immutable after boot
/// - **Outbound clients** — one per collaborator, sharing the credential cell
/// - **Engines** — dynamic config, prompts, schema generation
/// - **Bus** — change-event publisher
#[derive(Clone)]
pub struct AppState {
    // ── Config & secrets ──────────────────────────────────────────────
    pub config: Arc<Config>,
    /// HMAC key for the flash cookie (read from env once at startup).
    pub flash_secret: Arc<Vec<u8>>,

    // ── Outbound clients ──────────────────────────────────────────────
    pub auth: Arc<AuthClient>,
    pub gameplay: Arc<GameplayClient>,
    pub generator: Arc<GeneratorClient>,

    // ── Engines ───────────────────────────────────────────────────────
    pub dyncfg: Arc<DynamicConfigEngine>,
    pub prompts: Arc<PromptRegistry>,
    pub schemas: Arc<SchemaProvider>,

    // ── Bus ───────────────────────────────────────────────────────────
    pub bus: Arc<dyn EventPublisher>,
}
