//! Request plumbing shared by every outbound client: header decoration,
//! the 401 → reissue-and-resend wrapper, and response-to-error mapping.

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use na_domain::error::{Error, Result};

use crate::auth::AuthClient;
use crate::token::ServiceTokenCell;
use crate::types::{ErrorEnvelope, CODE_TOKEN_EXPIRED};

/// Header carrying the shared inter-service credential.
pub const SERVICE_TOKEN_HEADER: &str = "X-Internal-Service-Token";

/// Header carrying the human operator's access token, where a call acts
/// on the operator's behalf.
pub const OPERATOR_AUTH_HEADER: &str = "X-Admin-Authorization";

/// Attach the standard headers. The credential is copied out of the cell
/// under a read lock that is released before the send.
pub(crate) fn decorate(
    rb: RequestBuilder,
    token: &ServiceTokenCell,
    operator: Option<&str>,
) -> RequestBuilder {
    let credential = token.get();
    let mut rb = rb.header(SERVICE_TOKEN_HEADER, credential.as_ref());
    if let Some(op) = operator {
        rb = rb.header(OPERATOR_AUTH_HEADER, format!("Bearer {op}"));
    }
    rb
}

/// Execute a request with the single-reissue policy.
///
/// 1. Send with the current credential (plus operator header if given).
/// 2. On 401/403: drop the response, ask the auth client for a fresh
///    credential (that call bypasses this wrapper), store it atomically,
///    rebuild the request with fresh headers and send exactly once more.
/// 3. Return the second response regardless of its status.
///
/// `build` must produce an identical request each time it is called; it
/// runs at most twice.
pub(crate) async fn send_with_refresh<F>(
    token: &ServiceTokenCell,
    auth: &AuthClient,
    operator: Option<&str>,
    build: F,
) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let first = decorate(build(), token, operator)
        .send()
        .await
        .map_err(from_reqwest)?;

    if first.status() != StatusCode::UNAUTHORIZED && first.status() != StatusCode::FORBIDDEN {
        return Ok(first);
    }
    // Close the rejected response before reissuing.
    drop(first);

    auth.reissue_service_token().await?;

    decorate(build(), token, operator)
        .send()
        .await
        .map_err(from_reqwest)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response handling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Read a JSON body, mapping non-2xx statuses to the error taxonomy first.
pub(crate) async fn expect_json<T: DeserializeOwned>(endpoint: &str, resp: Response) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await.map_err(from_reqwest)?;
    if !status.is_success() {
        return Err(error_from_response(endpoint, status, &body));
    }
    serde_json::from_str(&body)
        .map_err(|e| Error::Dependency(format!("{endpoint}: unparseable reply: {e}")))
}

/// Check the status of a reply whose body we do not care about.
pub(crate) async fn expect_ok(endpoint: &str, resp: Response) -> Result<()> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    Err(error_from_response(endpoint, status, &body))
}

/// Map a non-2xx collaborator reply onto the error taxonomy. The auth
/// error envelope (`{code, message}`) refines 401s: code 40103 means the
/// presented token expired rather than being invalid.
pub(crate) fn error_from_response(endpoint: &str, status: StatusCode, body: &str) -> Error {
    let envelope: Option<ErrorEnvelope> = serde_json::from_str(body).ok();
    let message = envelope
        .as_ref()
        .filter(|e| !e.message.is_empty())
        .map(|e| e.message.clone())
        .unwrap_or_else(|| format!("{endpoint} returned {status}"));

    match status {
        StatusCode::UNAUTHORIZED => {
            if envelope.map(|e| e.code) == Some(CODE_TOKEN_EXPIRED) {
                Error::TokenExpired
            } else {
                Error::Unauthorized(message)
            }
        }
        StatusCode::FORBIDDEN => Error::Forbidden(message),
        StatusCode::NOT_FOUND => Error::NotFound(message),
        StatusCode::BAD_REQUEST => Error::InvalidInput(message),
        StatusCode::CONFLICT => Error::Conflict(message),
        s if s.is_server_error() => Error::Dependency(message),
        _ => Error::Internal(message),
    }
}

/// Convert a `reqwest::Error` into a domain error: timeouts and connection
/// failures are transient, everything else is a dependency fault.
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() || e.is_connect() {
        Error::Transient(e.to_string())
    } else {
        Error::Dependency(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_code_maps_to_token_expired() {
        let err = error_from_response(
            "POST /validate",
            StatusCode::UNAUTHORIZED,
            r#"{"code":40103,"message":"token expired"}"#,
        );
        assert!(matches!(err, Error::TokenExpired), "{err}");
    }

    #[test]
    fn plain_401_maps_to_unauthorized() {
        let err = error_from_response(
            "POST /validate",
            StatusCode::UNAUTHORIZED,
            r#"{"code":40101,"message":"bad token"}"#,
        );
        assert!(matches!(err, Error::Unauthorized(_)), "{err}");
    }

    #[test]
    fn status_family_mapping() {
        let cases = [
            (StatusCode::NOT_FOUND, "not found"),
            (StatusCode::BAD_REQUEST, "invalid input"),
            (StatusCode::FORBIDDEN, "forbidden"),
            (StatusCode::CONFLICT, "conflict"),
            (StatusCode::BAD_GATEWAY, "dependency"),
        ];
        for (status, family) in cases {
            let err = error_from_response("GET /x", status, "{}");
            assert!(err.to_string().starts_with(family), "{status} -> {err}");
        }
    }
}
