//! Dashboard aggregates and the flash readout consumed by the UI shell.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;

use crate::api::ApiResult;
use crate::session::flash::take_flash;
use crate::state::AppState;

/// Headline numbers: registered users and stories with active players.
pub async fn overview(State(state): State<AppState>) -> ApiResult<Response> {
    let (users, active_stories) = tokio::join!(
        state.auth.users_count(),
        state.gameplay.active_story_count(),
    );
    Ok(Json(serde_json::json!({
        "users": users?,
        "active_stories": active_stories?,
    }))
    .into_response())
}

/// Read-and-clear the flash cookie. A tampered or absent cookie reads as
/// no flash; either way it is gone afterwards.
pub async fn read_flash(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (jar, flash) = take_flash(jar, &state.flash_secret);
    (jar, Json(serde_json::json!({ "flash": flash }))).into_response()
}
