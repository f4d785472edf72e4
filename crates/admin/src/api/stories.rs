//! Draft / story / scene / player-progress administration, proxied to the
//! gameplay collaborator with the operator's token attached.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde_json::Value;
use uuid::Uuid;

use crate::api::{mutation_outcome, ApiResult};
use crate::session::middleware::OperatorAccess;
use crate::state::AppState;

// ── listings ─────────────────────────────────────────────────────────

pub async fn list_drafts(
    State(state): State<AppState>,
    OperatorAccess(token): OperatorAccess,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Response> {
    let drafts = state.gameplay.list_user_drafts(&token, user_id).await?;
    Ok(Json(serde_json::json!({ "drafts": drafts })).into_response())
}

pub async fn list_stories(
    State(state): State<AppState>,
    OperatorAccess(token): OperatorAccess,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Response> {
    let stories = state.gameplay.list_user_stories(&token, user_id).await?;
    Ok(Json(serde_json::json!({ "stories": stories })).into_response())
}

pub async fn list_progress(
    State(state): State<AppState>,
    OperatorAccess(token): OperatorAccess,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Response> {
    let progress = state.gameplay.list_progress(&token, user_id).await?;
    Ok(Json(serde_json::json!({ "progress": progress })).into_response())
}

// ── drafts ───────────────────────────────────────────────────────────

pub async fn get_draft(
    State(state): State<AppState>,
    OperatorAccess(token): OperatorAccess,
    Path(draft_id): Path<Uuid>,
) -> ApiResult<Response> {
    let draft = state.gameplay.get_draft(&token, draft_id).await?;
    Ok(Json(draft).into_response())
}

pub async fn update_draft(
    State(state): State<AppState>,
    OperatorAccess(token): OperatorAccess,
    jar: CookieJar,
    Path(draft_id): Path<Uuid>,
    Json(draft): Json<Value>,
) -> Response {
    let result = state.gameplay.update_draft(&token, draft_id, &draft).await;
    mutation_outcome(
        &state,
        jar,
        result,
        "Draft updated.",
        &format!("/admin/drafts/{draft_id}"),
    )
}

// ── stories ──────────────────────────────────────────────────────────

pub async fn get_story(
    State(state): State<AppState>,
    OperatorAccess(token): OperatorAccess,
    Path(story_id): Path<Uuid>,
) -> ApiResult<Response> {
    let story = state.gameplay.get_story(&token, story_id).await?;
    Ok(Json(story).into_response())
}

pub async fn update_story(
    State(state): State<AppState>,
    OperatorAccess(token): OperatorAccess,
    jar: CookieJar,
    Path(story_id): Path<Uuid>,
    Json(story): Json<Value>,
) -> Response {
    let result = state.gameplay.update_story(&token, story_id, &story).await;
    mutation_outcome(
        &state,
        jar,
        result,
        "Story updated.",
        &format!("/admin/stories/{story_id}"),
    )
}

// ── scenes ───────────────────────────────────────────────────────────

pub async fn get_scene(
    State(state): State<AppState>,
    OperatorAccess(token): OperatorAccess,
    Path((story_id, scene_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Response> {
    let scene = state.gameplay.get_scene(&token, story_id, scene_id).await?;
    Ok(Json(scene).into_response())
}

pub async fn update_scene(
    State(state): State<AppState>,
    OperatorAccess(token): OperatorAccess,
    jar: CookieJar,
    Path((story_id, scene_id)): Path<(Uuid, Uuid)>,
    Json(scene): Json<Value>,
) -> Response {
    let result = state
        .gameplay
        .update_scene(&token, story_id, scene_id, &scene)
        .await;
    mutation_outcome(
        &state,
        jar,
        result,
        "Scene updated.",
        &format!("/admin/stories/{story_id}"),
    )
}

pub async fn delete_scene(
    State(state): State<AppState>,
    OperatorAccess(token): OperatorAccess,
    jar: CookieJar,
    Path((story_id, scene_id)): Path<(Uuid, Uuid)>,
) -> Response {
    let result = state.gameplay.delete_scene(&token, story_id, scene_id).await;
    mutation_outcome(
        &state,
        jar,
        result,
        "Scene deleted.",
        &format!("/admin/stories/{story_id}"),
    )
}

// ── player progress ──────────────────────────────────────────────────

pub async fn update_progress(
    State(state): State<AppState>,
    OperatorAccess(token): OperatorAccess,
    jar: CookieJar,
    Path(progress_id): Path<Uuid>,
    Json(progress): Json<Value>,
) -> Response {
    let result = state
        .gameplay
        .update_progress(&token, progress_id, &progress)
        .await;
    mutation_outcome(&state, jar, result, "Progress updated.", "/admin/dashboard")
}

pub async fn delete_progress(
    State(state): State<AppState>,
    OperatorAccess(token): OperatorAccess,
    jar: CookieJar,
    Path(progress_id): Path<Uuid>,
) -> Response {
    let result = state.gameplay.delete_progress(&token, progress_id).await;
    mutation_outcome(&state, jar, result, "Progress deleted.", "/admin/dashboard")
}
