//! Streaming generation against a stub SSE endpoint.

use std::sync::Arc;

use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use futures_util::StreamExt;
use serde_json::json;

use na_clients::types::{GenerateParams, GenerateRequest};
use na_clients::{AuthClient, GeneratorClient, ServiceTokenCell};
use na_domain::config::CollaboratorConfig;

async fn stream_endpoint() -> impl IntoResponse {
    let body = concat!(
        "event: delta\ndata: {\"text\":\"Once\"}\n\n",
        "data: {\"text\":\" upon\"}\n\n",
        "data: {\"text\":\" a time\"}\n\n",
        "data: [DONE]\n\n",
    );
    ([("content-type", "text/event-stream")], body)
}

async fn text_endpoint() -> impl IntoResponse {
    Json(json!({"text": "Once upon a time"}))
}

async fn spawn_stub() -> String {
    let app = Router::new()
        .route("/generate/stream", post(stream_endpoint))
        .route("/generate/text", post(text_endpoint));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn generator(base_url: &str) -> GeneratorClient {
    let cfg = CollaboratorConfig {
        base_url: base_url.to_string(),
        timeout_ms: 2000,
    };
    let cell = ServiceTokenCell::empty();
    cell.set("tok");
    let auth = Arc::new(
        AuthClient::new(&cfg, cell.clone(), "secret".into(), "admin-panel".into()).unwrap(),
    );
    GeneratorClient::new(&cfg, cell, auth).unwrap()
}

fn request() -> GenerateRequest {
    GenerateRequest {
        system_prompt: "You are a narrator.".into(),
        user_prompt: "Begin the story.".into(),
        params: GenerateParams {
            temperature: Some(0.8),
            max_tokens: Some(256),
            top_p: None,
        },
    }
}

#[tokio::test]
async fn stream_yields_deltas_until_done() {
    let base = spawn_stub().await;
    let client = generator(&base);

    let mut stream = client.generate_stream(&request()).await.unwrap();
    let mut collected = String::new();
    while let Some(delta) = stream.next().await {
        collected.push_str(&delta.unwrap());
    }
    assert_eq!(collected, "Once upon a time");
}

#[tokio::test]
async fn one_shot_text() {
    let base = spawn_stub().await;
    let client = generator(&base);
    let text = client.generate_text(&request()).await.unwrap();
    assert_eq!(text, "Once upon a time");
}
