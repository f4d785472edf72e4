//! Fabric behavior against a stub collaborator: the 401 → reissue →
//! resend policy, header placement, and error mapping.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::json;

use na_clients::transport::{OPERATOR_AUTH_HEADER, SERVICE_TOKEN_HEADER};
use na_clients::{AuthClient, GameplayClient, ServiceTokenCell};
use na_domain::config::CollaboratorConfig;
use na_domain::error::Error;

#[derive(Default)]
struct StubState {
    generate_calls: AtomicUsize,
    gameplay_calls: AtomicUsize,
    validate_calls: AtomicUsize,
    /// Service-token header seen on each gameplay call, in order.
    gameplay_tokens: Mutex<Vec<String>>,
    gameplay_operators: Mutex<Vec<Option<String>>>,
    /// When true, the stub refuses to mint credentials.
    refuse_generate: std::sync::atomic::AtomicBool,
}

async fn generate(State(state): State<Arc<StubState>>) -> impl IntoResponse {
    state.generate_calls.fetch_add(1, Ordering::SeqCst);
    if state.refuse_generate.load(Ordering::SeqCst) {
        return (
            axum::http::StatusCode::UNAUTHORIZED,
            Json(json!({"code": 40102, "message": "bad static secret"})),
        );
    }
    (
        axum::http::StatusCode::OK,
        Json(json!({"inter_service_token": "X"})),
    )
}

async fn active_count(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let call = state.gameplay_calls.fetch_add(1, Ordering::SeqCst);
    let token = headers
        .get(SERVICE_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    state.gameplay_tokens.lock().push(token.clone());
    state.gameplay_operators.lock().push(
        headers
            .get(OPERATOR_AUTH_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
    );

    if call == 0 {
        // First call: pretend the presented credential is stale.
        return (
            axum::http::StatusCode::UNAUTHORIZED,
            Json(json!({"code": 40103, "message": "token expired"})),
        );
    }
    assert_eq!(token, "X", "second call must carry the fresh credential");
    (axum::http::StatusCode::OK, Json(json!({"count": 7})))
}

async fn validate(State(state): State<Arc<StubState>>) -> impl IntoResponse {
    state.validate_calls.fetch_add(1, Ordering::SeqCst);
    (
        axum::http::StatusCode::UNAUTHORIZED,
        Json(json!({"code": 40103, "message": "token expired"})),
    )
}

async fn drafts(State(state): State<Arc<StubState>>, headers: HeaderMap) -> impl IntoResponse {
    state.gameplay_operators.lock().push(
        headers
            .get(OPERATOR_AUTH_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
    );
    (
        axum::http::StatusCode::OK,
        Json(json!({"drafts": [{"id": "d1"}]})),
    )
}

/// Bind the stub on an ephemeral port and return its base URL.
async fn spawn_stub(state: Arc<StubState>) -> String {
    let app = Router::new()
        .route("/internal/auth/token/generate", post(generate))
        .route("/internal/auth/token/validate", post(validate))
        .route("/internal/admin/stories/active/count", get(active_count))
        .route("/internal/admin/users/:id/drafts", get(drafts))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn collaborator(base_url: &str) -> CollaboratorConfig {
    CollaboratorConfig {
        base_url: base_url.to_string(),
        timeout_ms: 2000,
    }
}

fn clients(base_url: &str) -> (Arc<ServiceTokenCell>, Arc<AuthClient>, GameplayClient) {
    let cell = ServiceTokenCell::empty();
    cell.set("stale");
    let auth = Arc::new(
        AuthClient::new(
            &collaborator(base_url),
            cell.clone(),
            "static-secret".into(),
            "admin-panel".into(),
        )
        .unwrap(),
    );
    let gameplay = GameplayClient::new(&collaborator(base_url), cell.clone(), auth.clone()).unwrap();
    (cell, auth, gameplay)
}

#[tokio::test]
async fn unauthorized_triggers_one_reissue_and_resend() {
    let state = Arc::new(StubState::default());
    let base = spawn_stub(state.clone()).await;
    let (cell, _auth, gameplay) = clients(&base);

    let count = gameplay.active_story_count().await.unwrap();

    assert_eq!(count, 7);
    assert_eq!(state.gameplay_calls.load(Ordering::SeqCst), 2);
    assert_eq!(state.generate_calls.load(Ordering::SeqCst), 1);
    let tokens = state.gameplay_tokens.lock();
    assert_eq!(tokens.as_slice(), ["stale", "X"]);
    assert_eq!(cell.get().as_ref(), "X");
}

#[tokio::test]
async fn operator_header_is_bearer_prefixed() {
    let state = Arc::new(StubState::default());
    let base = spawn_stub(state.clone()).await;
    let (_cell, _auth, gameplay) = clients(&base);

    let user_id = uuid::Uuid::new_v4();
    let drafts = gameplay.list_user_drafts("op-access", user_id).await.unwrap();
    assert_eq!(drafts.len(), 1);

    let operators = state.gameplay_operators.lock();
    assert_eq!(operators.as_slice(), [Some("Bearer op-access".to_string())]);
}

#[tokio::test]
async fn refused_issuance_surfaces_as_dependency() {
    let state = Arc::new(StubState::default());
    state.refuse_generate.store(true, Ordering::SeqCst);
    let base = spawn_stub(state.clone()).await;
    let (_cell, _auth, gameplay) = clients(&base);

    let err = gameplay.active_story_count().await.unwrap_err();
    assert!(matches!(err, Error::Dependency(_)), "{err}");
    // The failed first call happened; the resend never did.
    assert_eq!(state.gameplay_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn expired_operator_token_maps_to_token_expired() {
    let state = Arc::new(StubState::default());
    let base = spawn_stub(state.clone()).await;
    let (_cell, auth, _gameplay) = clients(&base);

    let err = auth.validate_token("dead-access").await.unwrap_err();
    assert!(matches!(err, Error::TokenExpired), "{err}");
    // First 401 triggers the single reissue + resend; the second 401 is
    // returned to the caller as TokenExpired.
    assert_eq!(state.validate_calls.load(Ordering::SeqCst), 2);
    assert_eq!(state.generate_calls.load(Ordering::SeqCst), 1);
}
