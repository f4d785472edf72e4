use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::EnvFilter;

use na_admin::api;
use na_admin::cli::{Cli, Command, ConfigCommand};
use na_admin::engine::dynconfig::DynamicConfigEngine;
use na_admin::engine::generation::SchemaProvider;
use na_admin::engine::prompts::PromptRegistry;
use na_admin::state::AppState;
use na_bus::{AmqpPublisher, EventPublisher};
use na_clients::{AuthClient, GameplayClient, GeneratorClient, ServiceTokenCell, TokenLifecycleManager};
use na_domain::config::{Config, ConfigSeverity, StoreDriver};
use na_store::{connect_pool, ConfigStore, MemoryStore, PgStore, PromptStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Default to serve when no subcommand is given.
        None | Some(Command::Serve) => {
            init_tracing();
            let (config, _config_path) = na_admin::cli::load_config()?;
            run_server(Arc::new(config)).await
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = na_admin::cli::load_config()?;
            let valid = na_admin::cli::config::validate(&config, &config_path);
            if !valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = na_admin::cli::load_config()?;
            na_admin::cli::config::show(&config);
            Ok(())
        }
        Some(Command::Version) => {
            println!("novel-admin {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Initialize structured JSON tracing (only for the `serve` command).
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,na_admin=debug")),
        )
        .json()
        .init();
}

/// Read a required secret from the environment.
fn required_secret(env_var: &str) -> anyhow::Result<String> {
    match std::env::var(env_var) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => anyhow::bail!("required secret env var {env_var} is not set"),
    }
}

/// Start the admin server with the given configuration.
async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("novel-admin starting");

    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Secrets (read once, never stored in config) ──────────────────
    let static_secret = required_secret(&config.service_token.secret_env)?;
    let flash_secret = Arc::new(required_secret(&config.session.flash_secret_env)?.into_bytes());

    // ── Inter-service credential + outbound clients ──────────────────
    let token_cell = ServiceTokenCell::empty();
    let auth = Arc::new(
        AuthClient::new(
            &config.auth,
            token_cell.clone(),
            static_secret,
            config.service_token.service_name.clone(),
        )
        .context("building auth client")?,
    );
    let gameplay = Arc::new(
        GameplayClient::new(&config.gameplay, token_cell.clone(), auth.clone())
            .context("building gameplay client")?,
    );
    let generator = Arc::new(
        GeneratorClient::new(&config.generator, token_cell.clone(), auth.clone())
            .context("building generator client")?,
    );
    tracing::info!(
        auth = %config.auth.base_url,
        gameplay = %config.gameplay.base_url,
        generator = %config.generator.base_url,
        "outbound clients ready"
    );

    // ── Credential lifecycle task ────────────────────────────────────
    let shutdown = CancellationToken::new();
    let lifecycle = TokenLifecycleManager::new(auth.clone(), config.service_token.clone());
    let lifecycle_task = lifecycle.spawn(shutdown.clone());
    tracing::info!(
        renew_interval_secs = config.service_token.renew_interval().as_secs(),
        "credential lifecycle task started"
    );

    // ── Backing store ────────────────────────────────────────────────
    let (config_store, prompt_store): (Arc<dyn ConfigStore>, Arc<dyn PromptStore>) =
        match config.store.driver {
            StoreDriver::Postgres => {
                let pool = connect_pool(&config.store)
                    .await
                    .context("connecting to the store")?;
                let store = Arc::new(PgStore::new(pool));
                tracing::info!("postgres store ready");
                (store.clone(), store)
            }
            StoreDriver::Memory => {
                let store = Arc::new(MemoryStore::new());
                tracing::warn!("memory store in use; data will not survive a restart");
                (store.clone(), store)
            }
        };

    // ── Bus publisher ────────────────────────────────────────────────
    let bus: Arc<dyn EventPublisher> = Arc::new(AmqpPublisher::connect(config.bus.clone()).await);

    // ── Engines ──────────────────────────────────────────────────────
    let dyncfg = Arc::new(DynamicConfigEngine::new(config_store, bus.clone()));
    let prompts = Arc::new(PromptRegistry::new(prompt_store, bus.clone()));
    let schemas = Arc::new(SchemaProvider::new(dyncfg.clone()));
    tracing::info!("engines ready");

    // ── App state ────────────────────────────────────────────────────
    let state = AppState {
        config: config.clone(),
        flash_secret,
        auth,
        gameplay,
        generator,
        dyncfg,
        prompts,
        schemas,
        bus: bus.clone(),
    };

    // ── CORS layer (config-aware) ────────────────────────────────────
    let cors_layer = build_cors_layer(&config.server.cors);

    // ── Concurrency limit (backpressure protection) ──────────────────
    let max_concurrent = std::env::var("NOVEL_ADMIN_MAX_CONCURRENT_REQUESTS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(256);
    tracing::info!(max_concurrent, "concurrency limit set");

    // ── Rate-limit layer (per-IP token bucket via governor) ──────────
    let governor_layer = config.server.rate_limit.as_ref().map(|rl| {
        use tower_governor::governor::GovernorConfigBuilder;
        use tower_governor::GovernorLayer;

        let gov_config = GovernorConfigBuilder::default()
            .per_second(rl.requests_per_second)
            .burst_size(rl.burst_size)
            .finish()
            .expect("rate_limit: requests_per_second and burst_size must be > 0");

        tracing::info!(
            requests_per_second = rl.requests_per_second,
            burst_size = rl.burst_size,
            "per-IP rate limiting enabled"
        );

        GovernorLayer {
            config: std::sync::Arc::new(gov_config),
        }
    });
    if governor_layer.is_none() {
        tracing::info!("per-IP rate limiting disabled (no [server.rate_limit] in config)");
    }

    // ── Router ───────────────────────────────────────────────────────
    let router = api::router(state.clone())
        .layer(cors_layer)
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_concurrent));
    let app = if let Some(gov) = governor_layer {
        router.layer(gov).with_state(state)
    } else {
        router.with_state(state)
    };

    // ── Bind ─────────────────────────────────────────────────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;

    tracing::info!(addr = %addr, "novel-admin listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await
        .context("axum server error")?;

    // ── Teardown: stop renewals, drain the bus ───────────────────────
    shutdown.cancel();
    let _ = lifecycle_task.await;
    bus.close().await;
    tracing::info!("novel-admin stopped");

    Ok(())
}

/// Build a [`CorsLayer`] from the configured allowed origins.
///
/// Origins may contain a trailing `*` wildcard for the port segment
/// (e.g. `http://localhost:*`). These are expanded into a predicate that
/// matches any port on that host. A literal `"*"` allows all origins
/// (not recommended for production).
fn build_cors_layer(cors: &na_domain::config::CorsConfig) -> CorsLayer {
    use axum::http::header;

    // Special case: if the only entry is "*", use fully permissive CORS.
    // Note: allow_credentials is incompatible with wildcard origins.
    if cors.allowed_origins.len() == 1 && cors.allowed_origins[0] == "*" {
        tracing::warn!("CORS configured with wildcard \"*\" — all origins allowed");
        return CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    }

    // Partition into exact origins and wildcard-port patterns.
    let mut exact: Vec<HeaderValue> = Vec::new();
    let mut wildcard_prefixes: Vec<String> = Vec::new();

    for origin in &cors.allowed_origins {
        if origin.ends_with(":*") {
            // e.g. "http://localhost:*" -> prefix "http://localhost:"
            let prefix = origin.trim_end_matches('*').to_owned();
            wildcard_prefixes.push(prefix);
        } else if let Ok(hv) = origin.parse::<HeaderValue>() {
            exact.push(hv);
        } else {
            tracing::warn!(origin = %origin, "invalid CORS origin, skipping");
        }
    }

    let allow_origin = if wildcard_prefixes.is_empty() {
        AllowOrigin::list(exact)
    } else {
        AllowOrigin::predicate(move |origin, _| {
            let origin_str = origin.to_str().unwrap_or("");
            // Check exact matches first.
            if exact.iter().any(|e| e.as_bytes() == origin.as_bytes()) {
                return true;
            }
            // Check wildcard-port patterns -- validate remainder is digits only
            // to prevent prefix-based bypass (e.g. "http://localhost:3000.evil.com").
            wildcard_prefixes.iter().any(|prefix| {
                origin_str
                    .strip_prefix(prefix.as_str())
                    .map(|port| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
                    .unwrap_or(false)
            })
        })
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
