//! Caller identities
//!
//! A caller is either a user authenticated by bearer token or an API key
//! (optionally tied to a user). The gate resolves both into a
//! [`CallerIdentity`] attached to the request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stable integer identifier of a user
pub type UserId = i64;

/// A registered user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Stable integer id
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Roles held by the user
    #[serde(default)]
    pub roles: Vec<String>,
    /// Open attribute map evaluated by policy predicates
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    /// Deactivated users are rejected at the gate
    pub active: bool,
}

/// An API key credential
///
/// The secret itself is never stored; only its SHA-256 hex digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    /// Stable integer id
    pub id: i64,
    /// Admin-facing label
    pub name: String,
    /// User the key acts as, when tied to one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// SHA-256 hex digest of the key secret
    pub key_hash: String,
    /// Scopes granted to this key
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Per-key admission quota override (requests per minute)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit_per_minute: Option<u32>,
    /// Expiry; expired keys are rejected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Revoked keys are rejected
    pub active: bool,
}

impl ApiKey {
    /// True when the key has expired relative to `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Resolved caller identity attached to an admitted request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// User id when the caller maps to a registered user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// API key id when the caller authenticated with a key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_id: Option<i64>,
    /// Roles held by the caller
    #[serde(default)]
    pub roles: Vec<String>,
    /// Open attribute map evaluated by policy predicates
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    /// Scopes granted to the caller
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Per-caller admission quota override (requests per minute)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit_per_minute: Option<u32>,
}

impl CallerIdentity {
    /// A caller with a resolved user or key is "non-anonymous"
    pub fn has_identity(&self) -> bool {
        self.user_id.is_some() || self.api_key_id.is_some()
    }

    /// True when the caller holds the given scope
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// True when the caller holds the given role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Stable key for rate-limit bucketing
    pub fn bucket_key(&self) -> String {
        match (self.api_key_id, self.user_id) {
            (Some(key), _) => format!("key:{key}"),
            (None, Some(user)) => format!("user:{user}"),
            (None, None) => "anonymous".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn api_key_expiry() {
        let now = Utc::now();
        let key = ApiKey {
            id: 1,
            name: "ci".into(),
            user_id: None,
            key_hash: "ab".repeat(32),
            scopes: vec![],
            rate_limit_per_minute: None,
            expires_at: Some(now - Duration::seconds(1)),
            active: true,
        };
        assert!(key.is_expired(now));
    }

    #[test]
    fn bucket_key_prefers_api_key() {
        let caller = CallerIdentity {
            user_id: Some(9),
            api_key_id: Some(4),
            roles: vec![],
            attributes: HashMap::new(),
            scopes: vec![],
            rate_limit_per_minute: None,
        };
        assert_eq!(caller.bucket_key(), "key:4");
    }

    #[test]
    fn scope_and_role_lookup() {
        let caller = CallerIdentity {
            user_id: Some(1),
            api_key_id: None,
            roles: vec!["analyst".into()],
            attributes: HashMap::new(),
            scopes: vec!["include_deprecated".into()],
            rate_limit_per_minute: None,
        };
        assert!(caller.has_scope("include_deprecated"));
        assert!(caller.has_role("analyst"));
        assert!(!caller.has_role("admin"));
    }
}
