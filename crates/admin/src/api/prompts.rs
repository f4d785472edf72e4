//! Prompt registry surface.
//!
//! - `GET    /admin/prompts`            — all keys (JSON)
//! - `POST   /admin/prompts/keys`       — seed a new key
//! - `GET    /admin/prompts/:key`       — language → prompt map (JSON)
//! - `POST   /admin/prompts/:key`       — upsert one translation
//! - `DELETE /admin/prompts/:key`       — drop a key and all translations
//! - `DELETE /admin/prompts/:key/:lang` — drop one translation

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::api::{mutation_outcome, ApiResult};
use crate::state::AppState;

pub async fn list_keys(State(state): State<AppState>) -> ApiResult<Response> {
    let keys = state.prompts.list_keys().await?;
    Ok(Json(serde_json::json!({ "keys": keys })).into_response())
}

pub async fn get_by_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Response> {
    let prompts = state.prompts.get_by_key(&key).await?;
    Ok(Json(serde_json::json!({ "key": key, "prompts": prompts })).into_response())
}

#[derive(Debug, Deserialize)]
pub struct CreateKeyForm {
    pub key: String,
}

pub async fn create_key(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CreateKeyForm>,
) -> Response {
    let result = state.prompts.create_key(&form.key).await.map(|_| ());
    mutation_outcome(&state, jar, result, "Prompt key created.", "/admin/prompts")
}

#[derive(Debug, Deserialize)]
pub struct UpsertForm {
    pub language: String,
    pub content: String,
}

pub async fn upsert(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(key): Path<String>,
    Form(form): Form<UpsertForm>,
) -> Response {
    let result = state
        .prompts
        .upsert(&key, &form.language, &form.content)
        .await
        .map(|_| ());
    mutation_outcome(
        &state,
        jar,
        result,
        "Prompt saved.",
        &format!("/admin/prompts/{key}"),
    )
}

pub async fn delete_key(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(key): Path<String>,
) -> Response {
    let result = state.prompts.delete_by_key(&key).await;
    mutation_outcome(&state, jar, result, "Prompt key deleted.", "/admin/prompts")
}

pub async fn delete_language(
    State(state): State<AppState>,
    jar: CookieJar,
    Path((key, lang)): Path<(String, String)>,
) -> Response {
    let result = state.prompts.delete_by_key_and_lang(&key, &lang).await;
    mutation_outcome(
        &state,
        jar,
        result,
        "Prompt translation deleted.",
        &format!("/admin/prompts/{key}"),
    )
}
