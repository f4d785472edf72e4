pub mod dashboard;
pub mod dynconfig;
pub mod generate;
pub mod login;
pub mod prompts;
pub mod push;
pub mod stories;
pub mod users;

use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;

use na_domain::error::Error;

use crate::session::flash::{set_flash, FlashKind};
use crate::session::middleware::require_operator;
use crate::state::AppState;

/// Build the full router.
///
/// Routes split into **public** (login, health) and **protected**
/// (everything under `/admin`, gated by the session middleware).
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/healthz", get(health))
        .route("/login", post(login::login))
        .route("/logout", post(login::logout));

    let protected = Router::new()
        // Dashboard
        .route("/admin/dashboard", get(dashboard::overview))
        .route("/admin/flash", get(dashboard::read_flash))
        // Users (auth collaborator)
        .route("/admin/users", get(users::list_users))
        .route("/admin/users/:id/ban", post(users::ban_user))
        .route("/admin/users/:id/ban", delete(users::unban_user))
        .route("/admin/users/:id", put(users::update_user))
        .route("/admin/users/:id/password", put(users::update_password))
        // Drafts / stories / scenes / progress (gameplay collaborator)
        .route("/admin/users/:id/drafts", get(stories::list_drafts))
        .route("/admin/users/:id/stories", get(stories::list_stories))
        .route("/admin/users/:id/progress", get(stories::list_progress))
        .route("/admin/drafts/:id", get(stories::get_draft))
        .route("/admin/drafts/:id", put(stories::update_draft))
        .route("/admin/stories/:id", get(stories::get_story))
        .route("/admin/stories/:id", put(stories::update_story))
        .route("/admin/stories/:id/scenes/:scene_id", get(stories::get_scene))
        .route("/admin/stories/:id/scenes/:scene_id", put(stories::update_scene))
        .route("/admin/stories/:id/scenes/:scene_id", delete(stories::delete_scene))
        .route("/admin/progress/:id", put(stories::update_progress))
        .route("/admin/progress/:id", delete(stories::delete_progress))
        // Prompt registry
        .route("/admin/prompts", get(prompts::list_keys))
        .route("/admin/prompts/keys", post(prompts::create_key))
        .route("/admin/prompts/:key", get(prompts::get_by_key))
        .route("/admin/prompts/:key", post(prompts::upsert))
        .route("/admin/prompts/:key", delete(prompts::delete_key))
        .route("/admin/prompts/:key/:lang", delete(prompts::delete_language))
        // Dynamic configuration
        .route("/admin/config", get(dynconfig::list))
        .route("/admin/config", post(dynconfig::create))
        .route("/admin/config/:key", get(dynconfig::get))
        .route("/admin/config/:key", put(dynconfig::update))
        // Generation (schema preview + prompt testing)
        .route("/admin/generate/schemas/:kind", get(generate::schema))
        .route("/admin/generate/test", post(generate::test_text))
        .route("/admin/generate/test/stream", post(generate::test_stream))
        // Push notifications
        .route("/admin/push/:user_id", post(push::push_to_user))
        .layer(middleware::from_fn_with_state(state, require_operator));

    public.merge(protected)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error mapping
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Wrapper turning domain errors into JSON error responses for the read
/// endpoints. Mutations use [`flash_redirect`] instead.
pub struct ApiError(pub Error);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

/// Status-code family for a domain error.
pub fn status_for(e: &Error) -> StatusCode {
    match e {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::Forbidden(_) => StatusCode::FORBIDDEN,
        Error::Unauthorized(_) | Error::TokenExpired => StatusCode::UNAUTHORIZED,
        Error::AlreadyExists(_) | Error::Conflict(_) => StatusCode::CONFLICT,
        Error::Transient(_) | Error::Dependency(_) => StatusCode::BAD_GATEWAY,
        Error::Corrupted(_) | Error::Config(_) | Error::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "handler failed");
        }
        (
            status,
            Json(serde_json::json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Flash + redirect helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Conclude a mutation: flash a message and redirect to the resource's
/// view page.
pub fn flash_redirect(
    state: &AppState,
    jar: CookieJar,
    kind: FlashKind,
    message: impl Into<String>,
    to: &str,
) -> Response {
    let jar = set_flash(
        jar,
        &state.flash_secret,
        kind,
        message,
        state.config.session.secure_cookies,
    );
    (jar, Redirect::to(to)).into_response()
}

/// Conclude a mutation that may have failed. Success and failure both
/// flash and redirect; only the message differs.
pub fn mutation_outcome(
    state: &AppState,
    jar: CookieJar,
    result: na_domain::error::Result<()>,
    success_msg: &str,
    to: &str,
) -> Response {
    match result {
        Ok(()) => flash_redirect(state, jar, FlashKind::Success, success_msg, to),
        Err(e) => {
            if status_for(&e).is_server_error() {
                tracing::error!(error = %e, "mutation failed");
            }
            flash_redirect(state, jar, FlashKind::Error, e.to_string(), to)
        }
    }
}
