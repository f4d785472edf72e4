//! Wire types exchanged with the collaborator services.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use na_domain::user::User;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Auth service
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Error envelope every auth endpoint uses: `{code, message}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Auth error code distinguishing "token expired" from "token invalid".
pub const CODE_TOKEN_EXPIRED: i64 = 40103;

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct GenerateServiceTokenRequest<'a> {
    pub service_name: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ServiceTokenResponse {
    pub inter_service_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshTokenRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ValidateTokenRequest<'a> {
    pub access_token: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct UsersCountResponse {
    pub count: u64,
}

/// One page of users; `next_after` is the cursor for the following page.
#[derive(Debug, Deserialize)]
pub struct UsersPage {
    pub users: Vec<User>,
    #[serde(default)]
    pub next_after: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdatePasswordRequest<'a> {
    pub new_password: &'a str,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Gameplay service
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

// Drafts, stories, scenes and progress records are owned by the gameplay
// service; the admin panel passes their JSON through untouched.

#[derive(Debug, Deserialize)]
pub struct DraftsResponse {
    pub drafts: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct StoriesResponse {
    pub stories: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ProgressResponse {
    pub progress: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Story generator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    #[serde(default)]
    pub params: GenerateParams,
}

#[derive(Debug, Deserialize)]
pub struct GenerateTextResponse {
    pub text: String,
}
