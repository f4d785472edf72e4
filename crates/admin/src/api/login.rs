//! Operator login / logout.
//!
//! `POST /login` exchanges credentials at the auth service, verifies the
//! operator actually holds the `admin` role, and plants both session
//! cookies. The login page itself is rendered elsewhere; failures flash
//! and bounce back to `/login`.

use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::api::flash_redirect;
use crate::session::flash::FlashKind;
use crate::session::middleware::{clear_session_cookies, session_cookies};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let pair = match state.auth.login(&form.username, &form.password).await {
        Ok(pair) => pair,
        Err(e) => {
            tracing::info!(username = %form.username, error = %e, "operator login rejected");
            return flash_redirect(&state, jar, FlashKind::Error, "Invalid credentials.", "/login");
        }
    };

    let claims = match state.auth.validate_token(&pair.access_token).await {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!(error = %e, "freshly issued access token failed validation");
            return flash_redirect(&state, jar, FlashKind::Error, "Login failed.", "/login");
        }
    };
    if !claims.is_admin() {
        tracing::warn!(username = %claims.username, "non-admin login attempt");
        return flash_redirect(
            &state,
            jar,
            FlashKind::Error,
            "This account has no operator access.",
            "/login?reason=access_denied",
        );
    }

    tracing::info!(username = %claims.username, "operator logged in");
    let jar = session_cookies(jar, &state.config.session, &pair);
    (jar, Redirect::to("/admin/dashboard")).into_response()
}

pub async fn logout(State(_state): State<AppState>, jar: CookieJar) -> Response {
    let jar = clear_session_cookies(jar);
    (jar, Redirect::to("/login")).into_response()
}
