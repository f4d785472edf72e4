//! Client for the gameplay collaborator's `/internal/*` admin surface.
//!
//! Draft, story, scene and progress payloads are owned by the gameplay
//! service; they travel through here as raw JSON. Operator-scoped calls
//! carry the operator's access token alongside the service credential.

use std::sync::Arc;

use reqwest::Client;
use serde_json::Value;
use uuid::Uuid;

use na_domain::config::CollaboratorConfig;
use na_domain::error::{Error, Result};

use crate::auth::AuthClient;
use crate::token::ServiceTokenCell;
use crate::transport::{expect_json, expect_ok, send_with_refresh};
use crate::types::{CountResponse, DraftsResponse, ProgressResponse, StoriesResponse};

#[derive(Clone)]
pub struct GameplayClient {
    http: Client,
    base_url: String,
    token: Arc<ServiceTokenCell>,
    auth: Arc<AuthClient>,
}

impl GameplayClient {
    pub fn new(
        cfg: &CollaboratorConfig,
        token: Arc<ServiceTokenCell>,
        auth: Arc<AuthClient>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(cfg.timeout())
            .build()
            .map_err(|e| Error::Internal(format!("building gameplay http client: {e}")))?;
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

    // ── drafts ───────────────────────────────────────────────────────

    pub async fn list_user_drafts(&self, operator: &str, user_id: Uuid) -> Result<Vec<Value>> {
        let url = self.url(&format!("/internal/admin/users/{user_id}/drafts"));
        let resp =
            send_with_refresh(&self.token, &self.auth, Some(operator), || self.http.get(&url))
                .await?;
        let body: DraftsResponse = expect_json("GET /internal/admin/users/:id/drafts", resp).await?;
        Ok(body.drafts)
    }

    pub async fn get_draft(&self, operator: &str, draft_id: Uuid) -> Result<Value> {
        let url = self.url(&format!("/internal/admin/drafts/{draft_id}"));
        let resp =
            send_with_refresh(&self.token, &self.auth, Some(operator), || self.http.get(&url))
                .await?;
        expect_json("GET /internal/admin/drafts/:id", resp).await
    }

    pub async fn update_draft(&self, operator: &str, draft_id: Uuid, draft: &Value) -> Result<()> {
        let url = self.url(&format!("/internal/admin/drafts/{draft_id}"));
        let resp = send_with_refresh(&self.token, &self.auth, Some(operator), || {
            self.http.put(&url).json(draft)
        })
        .await?;
        expect_ok("PUT /internal/admin/drafts/:id", resp).await
    }

    // ── stories ──────────────────────────────────────────────────────

    pub async fn list_user_stories(&self, operator: &str, user_id: Uuid) -> Result<Vec<Value>> {
        let url = self.url(&format!("/internal/admin/users/{user_id}/stories"));
        let resp =
            send_with_refresh(&self.token, &self.auth, Some(operator), || self.http.get(&url))
                .await?;
        let body: StoriesResponse =
            expect_json("GET /internal/admin/users/:id/stories", resp).await?;
        Ok(body.stories)
    }

    pub async fn get_story(&self, operator: &str, story_id: Uuid) -> Result<Value> {
        let url = self.url(&format!("/internal/admin/stories/{story_id}"));
        let resp =
            send_with_refresh(&self.token, &self.auth, Some(operator), || self.http.get(&url))
                .await?;
        expect_json("GET /internal/admin/stories/:id", resp).await
    }

    pub async fn update_story(&self, operator: &str, story_id: Uuid, story: &Value) -> Result<()> {
        let url = self.url(&format!("/internal/admin/stories/{story_id}"));
        let resp = send_with_refresh(&self.token, &self.auth, Some(operator), || {
            self.http.put(&url).json(story)
        })
        .await?;
        expect_ok("PUT /internal/admin/stories/:id", resp).await
    }

    /// Stories with at least one active player, for the dashboard.
    pub async fn active_story_count(&self) -> Result<u64> {
        let url = self.url("/internal/admin/stories/active/count");
        let resp = send_with_refresh(&self.token, &self.auth, None, || self.http.get(&url)).await?;
        let body: CountResponse =
            expect_json("GET /internal/admin/stories/active/count", resp).await?;
        Ok(body.count)
    }

    // ── scenes ───────────────────────────────────────────────────────

    pub async fn get_scene(&self, operator: &str, story_id: Uuid, scene_id: Uuid) -> Result<Value> {
        let url = self.url(&format!("/internal/admin/stories/{story_id}/scenes/{scene_id}"));
        let resp =
            send_with_refresh(&self.token, &self.auth, Some(operator), || self.http.get(&url))
                .await?;
        expect_json("GET /internal/admin/stories/:id/scenes/:sid", resp).await
    }

    pub async fn update_scene(
        &self,
        operator: &str,
        story_id: Uuid,
        scene_id: Uuid,
        scene: &Value,
    ) -> Result<()> {
        let url = self.url(&format!("/internal/admin/stories/{story_id}/scenes/{scene_id}"));
        let resp = send_with_refresh(&self.token, &self.auth, Some(operator), || {
            self.http.put(&url).json(scene)
        })
        .await?;
        expect_ok("PUT /internal/admin/stories/:id/scenes/:sid", resp).await
    }

    /// Idempotent: deleting a scene that is already gone succeeds.
    pub async fn delete_scene(&self, operator: &str, story_id: Uuid, scene_id: Uuid) -> Result<()> {
        let url = self.url(&format!("/internal/admin/stories/{story_id}/scenes/{scene_id}"));
        let resp = send_with_refresh(&self.token, &self.auth, Some(operator), || {
            self.http.delete(&url)
        })
        .await?;
        match expect_ok("DELETE /internal/admin/stories/:id/scenes/:sid", resp).await {
            Err(Error::NotFound(_)) => Ok(()),
            other => other,
        }
    }

    // ── player progress ──────────────────────────────────────────────

    pub async fn list_progress(&self, operator: &str, user_id: Uuid) -> Result<Vec<Value>> {
        let url = self.url(&format!("/internal/admin/users/{user_id}/progress"));
        let resp =
            send_with_refresh(&self.token, &self.auth, Some(operator), || self.http.get(&url))
                .await?;
        let body: ProgressResponse =
            expect_json("GET /internal/admin/users/:id/progress", resp).await?;
        Ok(body.progress)
    }

    pub async fn update_progress(
        &self,
        operator: &str,
        progress_id: Uuid,
        progress: &Value,
    ) -> Result<()> {
        let url = self.url(&format!("/internal/admin/progress/{progress_id}"));
        let resp = send_with_refresh(&self.token, &self.auth, Some(operator), || {
            self.http.put(&url).json(progress)
        })
        .await?;
        expect_ok("PUT /internal/admin/progress/:id", resp).await
    }

    /// Idempotent: deleting progress that is already gone succeeds.
    pub async fn delete_progress(&self, operator: &str, progress_id: Uuid) -> Result<()> {
        let url = self.url(&format!("/internal/admin/progress/{progress_id}"));
        let resp = send_with_refresh(&self.token, &self.auth, Some(operator), || {
            self.http.delete(&url)
        })
        .await?;
        match expect_ok("DELETE /internal/admin/progress/:id", resp).await {
            Err(Error::NotFound(_)) => Ok(()),
            other => other,
        }
    }
}
