//! Generation tooling for operators: schema preview and prompt testing
//! against the story-generator collaborator.

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::StreamExt;
use serde::Deserialize;

use na_clients::types::{GenerateParams, GenerateRequest};
use na_domain::error::Error;
use na_story_codec::PromptKind;

use crate::api::{ApiError, ApiResult};
use crate::state::AppState;

/// Preview the schema that would be sent to the generator right now.
/// Reads dynamic configuration on every call.
pub async fn schema(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> ApiResult<Response> {
    let kind = PromptKind::parse(&kind)
        .ok_or_else(|| Error::NotFound(format!("unknown prompt type \"{kind}\"")))?;
    let (schema, name) = state.schemas.schema(kind).await;
    Ok(Json(serde_json::json!({ "name": name, "schema": schema })).into_response())
}

#[derive(Debug, Deserialize)]
pub struct TestForm {
    pub system_prompt: String,
    pub user_prompt: String,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl TestForm {
    fn into_request(self) -> GenerateRequest {
        GenerateRequest {
            system_prompt: self.system_prompt,
            user_prompt: self.user_prompt,
            params: GenerateParams {
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                top_p: None,
            },
        }
    }
}

/// One-shot prompt test.
pub async fn test_text(
    State(state): State<AppState>,
    Json(form): Json<TestForm>,
) -> ApiResult<Response> {
    let text = state.generator.generate_text(&form.into_request()).await?;
    Ok(Json(serde_json::json!({ "text": text })).into_response())
}

/// Streaming prompt test, proxied to the browser as SSE.
pub async fn test_stream(
    State(state): State<AppState>,
    Json(form): Json<TestForm>,
) -> Result<impl IntoResponse, ApiError> {
    let stream = state.generator.generate_stream(&form.into_request()).await?;

    let events = stream.map(|delta| -> Result<Event, Infallible> {
        Ok(match delta {
            Ok(text) => Event::default().data(text),
            Err(e) => Event::default().event("error").data(e.to_string()),
        })
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
