//! Operator session middleware: the two-cookie validate / silent-refresh
//! flow in front of every protected route.
//!
//! Flow per request:
//! 1. No access cookie → clear both cookies, redirect `session_required`.
//! 2. Validate the access token against the auth service.
//! 3. Expired → read the refresh cookie; absent → `session_expired`;
//!    present → refresh; failure → `refresh_failed`; success → set both
//!    cookies with new lifetimes and continue with the fresh claims.
//! 4. Any other validation failure → `invalid_token`.
//! 5. Claims without the `admin` role → `access_denied`.
//! 6. Inject [`Operator`] and [`OperatorToken`] into request extensions.
//!
//! Two concurrent requests holding the same expired access token may both
//! refresh; the auth service tolerates a refresh token reused within a
//! brief window, so no local serialization is done on this hot path.

use axum::body::Body;
use axum::extract::State;
use axum::http::request::Parts;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use na_domain::config::SessionConfig;
use na_domain::error::Error;
use na_domain::user::{Claims, Operator, TokenPair};

use crate::state::AppState;

/// Short-lived access cookie.
pub const ACCESS_COOKIE: &str = "admin_session";

/// Long-lived refresh cookie.
pub const REFRESH_COOKIE: &str = "admin_refresh_session";

/// The operator's raw access token, re-sent to collaborators that need
/// operator scope (`X-Admin-Authorization`).
#[derive(Debug, Clone)]
pub struct OperatorToken(pub String);

pub async fn require_operator(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let session = &state.config.session;

    let Some(access) = jar.get(ACCESS_COOKIE).map(|c| c.value().to_string()) else {
        return clear_and_redirect(jar, session, "session_required");
    };

    let (claims, fresh_pair): (Claims, Option<TokenPair>) =
        match state.auth.validate_token(&access).await {
            Ok(claims) => (claims, None),
            Err(Error::TokenExpired) => {
                let Some(refresh) = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()) else {
                    return clear_and_redirect(jar, session, "session_expired");
                };
                match silent_refresh(&state, &refresh).await {
                    Some((claims, pair)) => (claims, Some(pair)),
                    None => return clear_and_redirect(jar, session, "refresh_failed"),
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "access token validation failed");
                return clear_and_redirect(jar, session, "invalid_token");
            }
        };

    if !claims.is_admin() {
        tracing::warn!(user = %claims.username, "operator without admin role rejected");
        return clear_and_redirect(jar, session, "access_denied");
    }

    let access_token = fresh_pair
        .as_ref()
        .map(|p| p.access_token.clone())
        .unwrap_or(access);
    req.extensions_mut().insert(Operator::from(claims));
    req.extensions_mut().insert(OperatorToken(access_token));

    let response = next.run(req).await;

    // A silent refresh carries its new cookies on whatever response the
    // handler produced.
    match fresh_pair {
        Some(pair) => (session_cookies(jar, session, &pair), response).into_response(),
        None => response,
    }
}

/// Trade the refresh token for a new pair and validate the fresh access
/// token to obtain claims. Any failure collapses to `None`; the caller
/// clears the session.
async fn silent_refresh(state: &AppState, refresh: &str) -> Option<(Claims, TokenPair)> {
    let pair = match state.auth.refresh_token(refresh).await {
        Ok(pair) => pair,
        Err(e) => {
            tracing::debug!(error = %e, "session refresh failed");
            return None;
        }
    };
    match state.auth.validate_token(&pair.access_token).await {
        Ok(claims) => Some((claims, pair)),
        Err(e) => {
            tracing::warn!(error = %e, "freshly refreshed access token failed validation");
            None
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cookie helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Both session cookies with full lifetimes.
pub fn session_cookies(jar: CookieJar, cfg: &SessionConfig, pair: &TokenPair) -> CookieJar {
    let access = Cookie::build((ACCESS_COOKIE, pair.access_token.clone()))
        .path("/")
        .http_only(true)
        .secure(cfg.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(cfg.access_ttl().as_secs() as i64))
        .build();
    let refresh = Cookie::build((REFRESH_COOKIE, pair.refresh_token.clone()))
        .path("/")
        .http_only(true)
        .secure(cfg.secure_cookies)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(cfg.refresh_ttl().as_secs() as i64))
        .build();
    jar.add(access).add(refresh)
}

/// Drop both session cookies.
pub fn clear_session_cookies(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build((ACCESS_COOKIE, "")).path("/").build())
        .remove(Cookie::build((REFRESH_COOKIE, "")).path("/").build())
}

fn clear_and_redirect(jar: CookieJar, _cfg: &SessionConfig, reason: &str) -> Response {
    let jar = clear_session_cookies(jar);
    (jar, Redirect::to(&format!("/login?reason={reason}"))).into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Extractors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Pull the injected [`Operator`] out of request extensions. Handlers opt
/// in by adding `operator: OperatorContext` to their parameter list.
pub struct OperatorContext(pub Operator);

#[async_trait::async_trait]
impl axum::extract::FromRequestParts<AppState> for OperatorContext {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Operator>()
            .cloned()
            .map(OperatorContext)
            // Only reachable when a route skipped the session middleware.
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Pull the operator's access token for collaborator calls that need
/// operator scope.
pub struct OperatorAccess(pub String);

#[async_trait::async_trait]
impl axum::extract::FromRequestParts<AppState> for OperatorAccess {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<OperatorToken>()
            .map(|t| OperatorAccess(t.0.clone()))
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}
