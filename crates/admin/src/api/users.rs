//! User administration, proxied to the auth collaborator.
//!
//! - `GET    /admin/users`              — paged listing (JSON)
//! - `POST   /admin/users/:id/ban`      — ban
//! - `DELETE /admin/users/:id/ban`      — unban
//! - `PUT    /admin/users/:id`          — update attributes
//! - `PUT    /admin/users/:id/password` — set a new password

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use na_domain::error::Error;
use na_domain::user::UserUpdate;

use crate::api::{mutation_outcome, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub after: Option<String>,
}

fn default_limit() -> u32 {
    50
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Response> {
    let page = state
        .auth
        .list_users(query.limit.min(200), query.after.as_deref())
        .await?;
    Ok(Json(serde_json::json!({
        "users": page.users,
        "next_after": page.next_after,
    }))
    .into_response())
}

pub async fn ban_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<Uuid>,
) -> Response {
    let result = state.auth.ban_user(user_id).await;
    mutation_outcome(&state, jar, result, "User banned.", "/admin/users")
}

pub async fn unban_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<Uuid>,
) -> Response {
    let result = state.auth.unban_user(user_id).await;
    mutation_outcome(&state, jar, result, "User unbanned.", "/admin/users")
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserForm {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Comma-separated role tags; empty leaves roles untouched.
    #[serde(default)]
    pub roles: Option<String>,
}

pub async fn update_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<Uuid>,
    Form(form): Form<UpdateUserForm>,
) -> Response {
    let update = UserUpdate {
        display_name: form.display_name.filter(|s| !s.is_empty()),
        email: form.email.filter(|s| !s.is_empty()),
        roles: form.roles.filter(|s| !s.is_empty()).map(|s| {
            s.split(',')
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect()
        }),
    };
    let result = state.auth.update_user(user_id, &update).await.map(|_| ());
    mutation_outcome(&state, jar, result, "User updated.", "/admin/users")
}

#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    pub new_password: String,
}

pub async fn update_password(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<Uuid>,
    Form(form): Form<PasswordForm>,
) -> Response {
    let result = if form.new_password.len() < 8 {
        Err(Error::InvalidInput(
            "password must be at least 8 characters".into(),
        ))
    } else {
        state
            .auth
            .update_password(user_id, &form.new_password)
            .await
    };
    mutation_outcome(&state, jar, result, "Password updated.", "/admin/users")
}
