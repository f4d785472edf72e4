//! End-to-end operator-session behavior against a stub auth collaborator:
//! silent refresh, redirect reasons, login, and the mutation flash flow.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use uuid::Uuid;

use na_admin::api;
use na_admin::engine::dynconfig::DynamicConfigEngine;
use na_admin::engine::generation::SchemaProvider;
use na_admin::engine::prompts::PromptRegistry;
use na_admin::state::AppState;
use na_bus::{topics, EventPublisher, RecordingPublisher};
use na_clients::{AuthClient, GameplayClient, GeneratorClient, ServiceTokenCell};
use na_domain::config::Config;
use na_store::MemoryStore;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Stub auth service
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
struct AuthStub {
    refresh_calls: AtomicUsize,
    operator_id: Uuid,
}

fn claims(stub: &AuthStub, roles: &[&str]) -> Value {
    json!({
        "user_id": stub.operator_id,
        "username": "op",
        "roles": roles,
    })
}

async fn validate(State(stub): State<Arc<AuthStub>>, Json(body): Json<Value>) -> impl IntoResponse {
    match body["access_token"].as_str().unwrap_or("") {
        "valid-access" | "new-access" => {
            (axum::http::StatusCode::OK, Json(claims(&stub, &["admin", "user"])))
        }
        "user-access" => (axum::http::StatusCode::OK, Json(claims(&stub, &["user"]))),
        "expired-access" => (
            axum::http::StatusCode::UNAUTHORIZED,
            Json(json!({"code": 40103, "message": "token expired"})),
        ),
        _ => (
            axum::http::StatusCode::UNAUTHORIZED,
            Json(json!({"code": 40101, "message": "invalid token"})),
        ),
    }
}

async fn refresh(State(stub): State<Arc<AuthStub>>, Json(body): Json<Value>) -> impl IntoResponse {
    stub.refresh_calls.fetch_add(1, Ordering::SeqCst);
    if body["refresh_token"] == "good-refresh" {
        (
            axum::http::StatusCode::OK,
            Json(json!({"access_token": "new-access", "refresh_token": "new-refresh"})),
        )
    } else {
        (
            axum::http::StatusCode::UNAUTHORIZED,
            Json(json!({"code": 40104, "message": "refresh token invalid"})),
        )
    }
}

async fn login(Json(body): Json<Value>) -> impl IntoResponse {
    if body["username"] == "op" && body["password"] == "hunter2!" {
        (
            axum::http::StatusCode::OK,
            Json(json!({"access_token": "valid-access", "refresh_token": "good-refresh"})),
        )
    } else {
        (
            axum::http::StatusCode::UNAUTHORIZED,
            Json(json!({"code": 40100, "message": "bad credentials"})),
        )
    }
}

async fn generate() -> impl IntoResponse {
    Json(json!({"inter_service_token": "svc-token"}))
}

async fn users_count() -> impl IntoResponse {
    Json(json!({"count": 12}))
}

async fn active_count() -> impl IntoResponse {
    Json(json!({"count": 4}))
}

async fn spawn_auth_stub(stub: Arc<AuthStub>) -> String {
    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/internal/auth/token/generate", post(generate))
        .route("/internal/auth/token/validate", post(validate))
        .route("/internal/auth/token/refresh", post(refresh))
        .route("/internal/auth/users/count", get(users_count))
        .route("/internal/admin/stories/active/count", get(active_count))
        .with_state(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Admin app under test
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct TestApp {
    base: String,
    stub: Arc<AuthStub>,
    bus: Arc<RecordingPublisher>,
    http: reqwest::Client,
}

async fn spawn_admin() -> TestApp {
    let stub = Arc::new(AuthStub {
        operator_id: Uuid::new_v4(),
        ..AuthStub::default()
    });
    let collab_url = spawn_auth_stub(stub.clone()).await;

    let mut config = Config::default();
    config.auth.base_url = collab_url.clone();
    config.gameplay.base_url = collab_url.clone();
    config.generator.base_url = collab_url;
    config.session.secure_cookies = false;

    let config = Arc::new(config);
    let cell = ServiceTokenCell::empty();
    cell.set("svc-token");
    let auth = Arc::new(
        AuthClient::new(&config.auth, cell.clone(), "static".into(), "admin-panel".into()).unwrap(),
    );
    let gameplay =
        Arc::new(GameplayClient::new(&config.gameplay, cell.clone(), auth.clone()).unwrap());
    let generator =
        Arc::new(GeneratorClient::new(&config.generator, cell.clone(), auth.clone()).unwrap());

    let store = Arc::new(MemoryStore::new());
    let bus = Arc::new(RecordingPublisher::new());
    let bus_dyn: Arc<dyn EventPublisher> = bus.clone();
    let dyncfg = Arc::new(DynamicConfigEngine::new(store.clone(), bus_dyn.clone()));
    let prompts = Arc::new(PromptRegistry::new(store, bus_dyn.clone()));
    let schemas = Arc::new(SchemaProvider::new(dyncfg.clone()));

    let state = AppState {
        config,
        flash_secret: Arc::new(b"flash-secret".to_vec()),
        auth,
        gameplay,
        generator,
        dyncfg,
        prompts,
        schemas,
        bus: bus_dyn,
    };

    let app = api::router(state.clone()).with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        base: format!("http://{addr}"),
        stub,
        bus,
        http: reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap(),
    }
}

fn location(resp: &reqwest::Response) -> String {
    resp.headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

fn set_cookies(resp: &reqwest::Response) -> Vec<String> {
    resp.headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(String::from)
        .collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn missing_session_redirects_to_login() {
    let app = spawn_admin().await;
    let resp = app
        .http
        .get(format!("{}/admin/config", app.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/login?reason=session_required");
}

#[tokio::test]
async fn valid_session_passes_through() {
    let app = spawn_admin().await;
    let resp = app
        .http
        .get(format!("{}/admin/dashboard", app.base))
        .header("cookie", "admin_session=valid-access")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["users"], 12);
    assert_eq!(body["active_stories"], 4);
}

#[tokio::test]
async fn silent_refresh_sets_new_cookies_and_runs_handler() {
    let app = spawn_admin().await;
    let resp = app
        .http
        .get(format!("{}/admin/flash", app.base))
        .header(
            "cookie",
            "admin_session=expired-access; admin_refresh_session=good-refresh",
        )
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(app.stub.refresh_calls.load(Ordering::SeqCst), 1);

    let cookies = set_cookies(&resp);
    assert_eq!(cookies.len(), 2, "expected exactly two Set-Cookie headers: {cookies:?}");
    assert!(cookies.iter().any(|c| c.starts_with("admin_session=new-access")));
    assert!(cookies
        .iter()
        .any(|c| c.starts_with("admin_refresh_session=new-refresh")));

    // The downstream handler ran exactly once and produced its body.
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["flash"], Value::Null);
}

#[tokio::test]
async fn expired_session_without_refresh_cookie_bounces() {
    let app = spawn_admin().await;
    let resp = app
        .http
        .get(format!("{}/admin/flash", app.base))
        .header("cookie", "admin_session=expired-access")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/login?reason=session_expired");
}

#[tokio::test]
async fn failed_refresh_bounces() {
    let app = spawn_admin().await;
    let resp = app
        .http
        .get(format!("{}/admin/flash", app.base))
        .header(
            "cookie",
            "admin_session=expired-access; admin_refresh_session=stolen",
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/login?reason=refresh_failed");
}

#[tokio::test]
async fn invalid_token_bounces() {
    let app = spawn_admin().await;
    let resp = app
        .http
        .get(format!("{}/admin/flash", app.base))
        .header("cookie", "admin_session=forged")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/login?reason=invalid_token");
}

#[tokio::test]
async fn non_admin_operator_is_denied() {
    let app = spawn_admin().await;
    let resp = app
        .http
        .get(format!("{}/admin/flash", app.base))
        .header("cookie", "admin_session=user-access")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/login?reason=access_denied");
}

#[tokio::test]
async fn login_plants_both_cookies() {
    let app = spawn_admin().await;
    let resp = app
        .http
        .post(format!("{}/login", app.base))
        .form(&[("username", "op"), ("password", "hunter2!")])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/admin/dashboard");

    let cookies = set_cookies(&resp);
    let access = cookies
        .iter()
        .find(|c| c.starts_with("admin_session="))
        .expect("access cookie");
    let refresh = cookies
        .iter()
        .find(|c| c.starts_with("admin_refresh_session="))
        .expect("refresh cookie");
    assert!(access.contains("HttpOnly"));
    assert!(access.contains("SameSite=Lax"));
    assert!(refresh.contains("SameSite=Strict"));
}

#[tokio::test]
async fn bad_login_flashes_and_bounces() {
    let app = spawn_admin().await;
    let resp = app
        .http
        .post(format!("{}/login", app.base))
        .form(&[("username", "op"), ("password", "wrong")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/login");
    assert!(set_cookies(&resp).iter().any(|c| c.starts_with("flash_msg=")));
}

#[tokio::test]
async fn config_mutation_publishes_and_flashes() {
    let app = spawn_admin().await;
    let resp = app
        .http
        .post(format!("{}/admin/config", app.base))
        .header("cookie", "admin_session=valid-access")
        .form(&[("key", "generation.npc_count"), ("value", "5")])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/admin/config");
    assert!(set_cookies(&resp).iter().any(|c| c.starts_with("flash_msg=")));

    let events = app.bus.on_topic(topics::CONFIG_CREATED);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["key"], "generation.npc_count");

    // The change is visible to reads and to the schema generator.
    let body: Value = app
        .http
        .get(format!("{}/admin/config", app.base))
        .header("cookie", "admin_session=valid-access")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["entries"][0]["value"], "5");

    let schema: Value = app
        .http
        .get(format!("{}/admin/generate/schemas/novel_setup", app.base))
        .header("cookie", "admin_session=valid-access")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(schema["schema"]["properties"]["chars"]["minItems"], 5);
    assert_eq!(schema["schema"]["properties"]["chars"]["maxItems"], 5);
}
