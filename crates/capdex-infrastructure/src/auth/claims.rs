//! JWT claims structure
//!
//! Self-contained bearer tokens: signed, carrying the caller id, roles,
//! scopes and expiry.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id as a decimal string)
    pub sub: String,
    /// Roles held by the subject
    #[serde(default)]
    pub roles: Vec<String>,
    /// Scopes granted to the token
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Issued at (unix seconds)
    pub iat: u64,
    /// Expiration (unix seconds)
    pub exp: u64,
    /// Issuer
    pub iss: String,
}

impl Claims {
    /// Create claims for a user, expiring after `expiration_secs`
    pub fn new(
        user_id: i64,
        roles: Vec<String>,
        scopes: Vec<String>,
        issuer: String,
        expiration_secs: u64,
    ) -> Self {
        let now = Utc::now().timestamp().max(0) as u64;
        Self {
            sub: user_id.to_string(),
            roles,
            scopes,
            iat: now,
            exp: now + expiration_secs,
            iss: issuer,
        }
    }

    /// Check whether the token has expired
    pub fn is_expired(&self) -> bool {
        self.exp < Utc::now().timestamp().max(0) as u64
    }
}
