//! Client for the auth collaborator.
//!
//! This client is special: it both consumes auth endpoints like the other
//! clients *and* mints the shared inter-service credential everybody else
//! depends on. The minting call ([`AuthClient::reissue_service_token`])
//! deliberately bypasses the 401-retry wrapper: it is the call the
//! wrapper falls back to, and routing it through the wrapper would recurse
//! without bound.

use std::sync::Arc;

use reqwest::Client;
use uuid::Uuid;

use na_domain::config::CollaboratorConfig;
use na_domain::error::{Error, Result};
use na_domain::user::{Claims, TokenPair, User, UserUpdate};

use crate::token::ServiceTokenCell;
use crate::transport::{
    expect_json, expect_ok, from_reqwest, send_with_refresh, SERVICE_TOKEN_HEADER,
};
use crate::types::{
    GenerateServiceTokenRequest, LoginRequest, RefreshTokenRequest, ServiceTokenResponse,
    UpdatePasswordRequest, UsersCountResponse, UsersPage, ValidateTokenRequest,
};

#[derive(Clone)]
pub struct AuthClient {
    http: Client,
    base_url: String,
    token: Arc<ServiceTokenCell>,
    /// Static bootstrap secret presented when minting a credential.
    static_secret: String,
    /// Name under which this service authenticates.
    service_name: String,
}

impl AuthClient {
    pub fn new(
        cfg: &CollaboratorConfig,
        token: Arc<ServiceTokenCell>,
        static_secret: String,
        service_name: String,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(cfg.timeout())
            .build()
            .map_err(|e| Error::Internal(format!("building auth http client: {e}")))?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            token,
            static_secret,
            service_name,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ── credential minting (bypasses the retry wrapper) ──────────────

    /// Mint a fresh inter-service credential and store it in the shared
    /// cell. A 401/403 here means the static secret itself was refused,
    /// a fatal issuance failure rather than something to retry.
    pub async fn reissue_service_token(&self) -> Result<()> {
        let url = self.url("/internal/auth/token/generate");
        let req = GenerateServiceTokenRequest {
            service_name: &self.service_name,
        };
        let resp = self
            .http
            .post(&url)
            .header(SERVICE_TOKEN_HEADER, &self.static_secret)
            .json(&req)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::Dependency(format!(
                "credential issuance refused ({status}); check the static inter-service secret"
            )));
        }
        let body: ServiceTokenResponse =
            expect_json("POST /internal/auth/token/generate", resp).await?;
        self.token.set(&body.inter_service_token);
        Ok(())
    }

    // ── operator tokens ──────────────────────────────────────────────

    /// Exchange operator credentials for a token pair.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair> {
        let url = self.url("/auth/login");
        let req = LoginRequest { username, password };
        let resp = send_with_refresh(&self.token, self, None, || self.http.post(&url).json(&req))
            .await?;
        expect_json("POST /auth/login", resp).await
    }

    /// Trade a refresh token for a fresh pair. Used by the session
    /// middleware on access-token expiry.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair> {
        let url = self.url("/internal/auth/token/refresh");
        let req = RefreshTokenRequest { refresh_token };
        let resp = send_with_refresh(&self.token, self, None, || self.http.post(&url).json(&req))
            .await?;
        expect_json("POST /internal/auth/token/refresh", resp).await
    }

    /// Validate an operator access token and return its claims.
    /// Expired tokens surface as [`Error::TokenExpired`].
    pub async fn validate_token(&self, access_token: &str) -> Result<Claims> {
        let url = self.url("/internal/auth/token/validate");
        let req = ValidateTokenRequest { access_token };
        let resp = send_with_refresh(&self.token, self, None, || self.http.post(&url).json(&req))
            .await?;
        expect_json("POST /internal/auth/token/validate", resp).await
    }

    // ── user administration ──────────────────────────────────────────

    pub async fn users_count(&self) -> Result<u64> {
        let url = self.url("/internal/auth/users/count");
        let resp = send_with_refresh(&self.token, self, None, || self.http.get(&url)).await?;
        let body: UsersCountResponse = expect_json("GET /internal/auth/users/count", resp).await?;
        Ok(body.count)
    }

    /// Cursor-paged user listing.
    pub async fn list_users(&self, limit: u32, after: Option<&str>) -> Result<UsersPage> {
        let url = self.url("/internal/auth/users");
        let resp = send_with_refresh(&self.token, self, None, || {
            let mut rb = self.http.get(&url).query(&[("limit", limit.to_string())]);
            if let Some(after) = after {
                rb = rb.query(&[("after", after)]);
            }
            rb
        })
        .await?;
        expect_json("GET /internal/auth/users", resp).await
    }

    pub async fn ban_user(&self, user_id: Uuid) -> Result<()> {
        let url = self.url(&format!("/internal/auth/users/{user_id}/ban"));
        let resp = send_with_refresh(&self.token, self, None, || self.http.post(&url)).await?;
        expect_ok("POST /internal/auth/users/:id/ban", resp).await
    }

    pub async fn unban_user(&self, user_id: Uuid) -> Result<()> {
        let url = self.url(&format!("/internal/auth/users/{user_id}/ban"));
        let resp = send_with_refresh(&self.token, self, None, || self.http.delete(&url)).await?;
        expect_ok("DELETE /internal/auth/users/:id/ban", resp).await
    }

    pub async fn update_user(&self, user_id: Uuid, update: &UserUpdate) -> Result<User> {
        let url = self.url(&format!("/internal/auth/users/{user_id}"));
        let resp = send_with_refresh(&self.token, self, None, || self.http.put(&url).json(update))
            .await?;
        expect_json("PUT /internal/auth/users/:id", resp).await
    }

    pub async fn update_password(&self, user_id: Uuid, new_password: &str) -> Result<()> {
        let url = self.url(&format!("/internal/auth/users/{user_id}/password"));
        let req = UpdatePasswordRequest { new_password };
        let resp = send_with_refresh(&self.token, self, None, || self.http.put(&url).json(&req))
            .await?;
        expect_ok("PUT /internal/auth/users/:id/password", resp).await
    }
}
