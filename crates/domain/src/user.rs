//! Users, roles, and token material as asserted by the auth collaborator.
//!
//! The admin panel only ever holds transient copies of these; the auth
//! service owns the lifecycle and is the sole authority on role membership.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role tags. The set is closed; unknown tags are carried verbatim but
/// never grant anything.
pub mod roles {
    pub const ADMIN: &str = "admin";
    pub const USER: &str = "user";
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub banned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mutable user attributes, sent back to the auth service on update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

/// Operator token pair: short-lived access + long-lived refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Claims extracted from a validated access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == roles::ADMIN)
    }
}

/// The authenticated operator attached to every request that passed the
/// session middleware.
#[derive(Debug, Clone)]
pub struct Operator {
    pub user_id: Uuid,
    pub username: String,
    pub roles: Vec<String>,
}

impl From<Claims> for Operator {
    fn from(c: Claims) -> Self {
        Self {
            user_id: c.user_id,
            username: c.username,
            roles: c.roles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_role_detection() {
        let mut claims = Claims {
            user_id: Uuid::new_v4(),
            username: "op".into(),
            roles: vec![roles::USER.into()],
        };
        assert!(!claims.is_admin());
        claims.roles.push(roles::ADMIN.into());
        assert!(claims.is_admin());
    }
}
