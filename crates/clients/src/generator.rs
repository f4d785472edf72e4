//! Client for the story-generator collaborator.
//!
//! `POST /generate/text` returns a single JSON `{text}`; `POST
//! /generate/stream` returns a long-lived SSE body whose `data:` payloads
//! are `{text}` deltas, terminated by a `[DONE]` sentinel.

use std::sync::Arc;

use reqwest::Client;

use na_domain::config::CollaboratorConfig;
use na_domain::error::{Error, Result};
use na_domain::stream::BoxStream;

use crate::auth::AuthClient;
use crate::token::ServiceTokenCell;
use crate::transport::{error_from_response, expect_json, from_reqwest, send_with_refresh};
use crate::types::{GenerateRequest, GenerateTextResponse};

#[derive(Clone)]
pub struct GeneratorClient {
    http: Client,
    base_url: String,
    token: Arc<ServiceTokenCell>,
    auth: Arc<AuthClient>,
}

impl GeneratorClient {
    pub fn new(
        cfg: &CollaboratorConfig,
        token: Arc<ServiceTokenCell>,
        auth: Arc<AuthClient>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(cfg.timeout())
            .build()
            .map_err(|e| Error::Internal(format!("building generator http client: {e}")))?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            token,
            auth,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// One-shot generation.
    pub async fn generate_text(&self, req: &GenerateRequest) -> Result<String> {
        let url = self.url("/generate/text");
        let resp =
            send_with_refresh(&self.token, &self.auth, None, || self.http.post(&url).json(req))
                .await?;
        let body: GenerateTextResponse = expect_json("POST /generate/text", resp).await?;
        Ok(body.text)
    }

    /// Streaming generation. The returned stream yields text deltas; it
    /// ends cleanly on the `[DONE]` sentinel or when the body closes.
    pub async fn generate_stream(
        &self,
        req: &GenerateRequest,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let url = self.url("/generate/stream");
        let resp =
            send_with_refresh(&self.token, &self.auth, None, || self.http.post(&url).json(req))
                .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(error_from_response("POST /generate/stream", status, &body));
        }

        let stream = async_stream::stream! {
            let mut response = resp;
            let mut buffer = String::new();

            loop {
                match response.chunk().await {
                    Ok(Some(bytes)) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));
                        for data in drain_data_lines(&mut buffer) {
                            if data == "[DONE]" {
                                return;
                            }
                            yield parse_delta(&data);
                        }
                    }
                    Ok(None) => {
                        // Body closed -- flush any trailing partial event.
                        if !buffer.trim().is_empty() {
                            buffer.push_str("\n\n");
                            for data in drain_data_lines(&mut buffer) {
                                if data == "[DONE]" {
                                    return;
                                }
                                yield parse_delta(&data);
                            }
                        }
                        return;
                    }
                    Err(e) => {
                        yield Err(from_reqwest(e));
                        return;
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }
}

fn parse_delta(data: &str) -> Result<String> {
    let body: GenerateTextResponse = serde_json::from_str(data)
        .map_err(|e| Error::Dependency(format!("unparseable stream event: {e}: {data}")))?;
    Ok(body.text)
}

/// Extract complete `data:` payloads from an SSE buffer.
///
/// Events are delimited by `\n\n`; only `data:` lines matter. The buffer
/// is drained in place, leaving any trailing partial event for the next
/// call.
fn drain_data_lines(buffer: &mut String) -> Vec<String> {
    let mut data_lines = Vec::new();

    while let Some(pos) = buffer.find("\n\n") {
        let block: String = buffer.drain(..pos).collect();
        buffer.drain(..2); // remove the \n\n delimiter

        for line in block.lines() {
            let line = line.trim();
            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim();
                if !data.is_empty() {
                    data_lines.push(data.to_string());
                }
            }
        }
    }

    data_lines
}
