//! Dynamic-configuration surface.
//!
//! - `GET  /admin/config`      — all entries (JSON)
//! - `POST /admin/config`      — create a key
//! - `GET  /admin/config/:key` — one entry (JSON)
//! - `PUT  /admin/config/:key` — overwrite a key

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::api::{mutation_outcome, ApiResult};
use crate::state::AppState;

pub async fn list(State(state): State<AppState>) -> ApiResult<Response> {
    let entries = state.dyncfg.get_all().await?;
    Ok(Json(serde_json::json!({ "entries": entries })).into_response())
}

pub async fn get(State(state): State<AppState>, Path(key): Path<String>) -> ApiResult<Response> {
    let entry = state.dyncfg.get(&key).await?;
    Ok(Json(entry).into_response())
}

#[derive(Debug, Deserialize)]
pub struct CreateForm {
    pub key: String,
    pub value: String,
}

pub async fn create(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CreateForm>,
) -> Response {
    let result = state.dyncfg.create(&form.key, &form.value).await.map(|_| ());
    mutation_outcome(&state, jar, result, "Config entry created.", "/admin/config")
}

#[derive(Debug, Deserialize)]
pub struct UpdateForm {
    pub value: String,
}

pub async fn update(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(key): Path<String>,
    Form(form): Form<UpdateForm>,
) -> Response {
    let result = state.dyncfg.update(&key, &form.value).await.map(|_| ());
    mutation_outcome(&state, jar, result, "Config entry updated.", "/admin/config")
}
