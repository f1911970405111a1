//! Credential resolution
//!
//! Accepts exactly one of a bearer token or an API key and resolves it into
//! a [`CallerIdentity`] from the registry snapshot. Deactivated identities
//! and expired credentials are rejected here, before the pipeline runs.

use capdex_domain::entities::CallerIdentity;
use capdex_domain::error::{Error, Result};
use capdex_domain::ports::RegistryReader;
use chrono::Utc;
use jsonwebtoken::{decode, DecodingKey, Validation};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use super::claims::Claims;
use super::rate_limit::{RateLimitDecision, RateLimiter};

/// Gate configuration
#[derive(Debug, Clone)]
pub struct AuthGateConfig {
    /// HS256 signing secret for bearer tokens
    pub jwt_secret: String,
    /// Expected token issuer
    pub jwt_issuer: String,
}

/// The auth & rate-limit gate
pub struct AuthGate {
    registry: Arc<dyn RegistryReader>,
    limiter: RateLimiter,
    config: AuthGateConfig,
}

impl AuthGate {
    /// Wire the gate over the registry projection
    pub fn new(
        registry: Arc<dyn RegistryReader>,
        limiter: RateLimiter,
        config: AuthGateConfig,
    ) -> Self {
        Self {
            registry,
            limiter,
            config,
        }
    }

    /// Resolve exactly one credential into a caller identity.
    pub fn authenticate(
        &self,
        bearer_token: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<CallerIdentity> {
        match (bearer_token, api_key) {
            (Some(token), None) => self.authenticate_bearer(token),
            (None, Some(key)) => self.authenticate_api_key(key),
            (Some(_), Some(_)) => Err(Error::unauthenticated(
                "provide either a bearer token or an API key, not both",
            )),
            (None, None) => Err(Error::unauthenticated(
                "missing credentials: provide Authorization: Bearer or X-API-Key",
            )),
        }
    }

    /// Admit one request for an authenticated caller.
    pub fn admit(&self, caller: &CallerIdentity) -> Result<RateLimitDecision> {
        self.limiter
            .admit(&caller.bucket_key(), caller.rate_limit_per_minute)
    }

    /// Drop idle rate-limit buckets; called from a maintenance timer
    pub fn cleanup_rate_buckets(&self) {
        self.limiter.cleanup();
    }

    fn authenticate_bearer(&self, token: &str) -> Result<CallerIdentity> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.jwt_issuer]);
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| Error::unauthenticated(format!("invalid bearer token: {e}")))?;
        let claims = data.claims;

        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| Error::unauthenticated("bearer token subject is not a user id"))?;

        let snapshot = self.registry.snapshot();
        match snapshot.users.get(&user_id) {
            Some(user) => {
                if !user.active {
                    return Err(Error::unauthenticated("user is deactivated"));
                }
                Ok(CallerIdentity {
                    user_id: Some(user.id),
                    api_key_id: None,
                    roles: user.roles.clone(),
                    attributes: user.attributes.clone(),
                    scopes: claims.scopes,
                    rate_limit_per_minute: None,
                })
            }
            // Tokens may outlive the projection; fall back to the claims
            None => Ok(CallerIdentity {
                user_id: Some(user_id),
                api_key_id: None,
                roles: claims.roles,
                attributes: Default::default(),
                scopes: claims.scopes,
                rate_limit_per_minute: None,
            }),
        }
    }

    fn authenticate_api_key(&self, key: &str) -> Result<CallerIdentity> {
        let key_hash = hex::encode(Sha256::digest(key.as_bytes()));
        let snapshot = self.registry.snapshot();
        let record = snapshot
            .api_key_by_hash(&key_hash)
            .ok_or_else(|| Error::unauthenticated("unknown API key"))?;

        if !record.active {
            return Err(Error::unauthenticated("API key is revoked"));
        }
        if record.is_expired(Utc::now()) {
            return Err(Error::unauthenticated("API key has expired"));
        }

        let (roles, attributes) = match record.user_id.and_then(|id| snapshot.users.get(&id)) {
            Some(user) if !user.active => {
                return Err(Error::unauthenticated("user behind API key is deactivated"));
            }
            Some(user) => (user.roles.clone(), user.attributes.clone()),
            None => (Vec::new(), Default::default()),
        };

        Ok(CallerIdentity {
            user_id: record.user_id,
            api_key_id: Some(record.id),
            roles,
            attributes,
            scopes: record.scopes.clone(),
            rate_limit_per_minute: record.rate_limit_per_minute,
        })
    }
}

/// Hash an API key secret the way the registry stores it
pub fn hash_api_key(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::rate_limit::RateLimiterConfig;
    use crate::registry::RegistryStore;
    use capdex_domain::entities::{ApiKey, User};
    use capdex_providers::events::RegistryEventBus;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn gate_with_registry() -> (AuthGate, Arc<RegistryStore>) {
        let registry = Arc::new(RegistryStore::new(RegistryEventBus::new()));
        registry.upsert_user(User {
            id: 7,
            name: "dev".into(),
            roles: vec!["developer".into()],
            attributes: Default::default(),
            active: true,
        });
        registry.upsert_api_key(ApiKey {
            id: 1,
            name: "ci".into(),
            user_id: Some(7),
            key_hash: hash_api_key("sk-live-1"),
            scopes: vec!["include_deprecated".into()],
            rate_limit_per_minute: Some(5),
            expires_at: None,
            active: true,
        });
        let gate = AuthGate::new(
            registry.clone(),
            RateLimiter::new(RateLimiterConfig::default()),
            AuthGateConfig {
                jwt_secret: SECRET.into(),
                jwt_issuer: "capdex".into(),
            },
        );
        (gate, registry)
    }

    fn token_for(user_id: i64) -> String {
        let claims = Claims::new(user_id, vec![], vec![], "capdex".into(), 3600);
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn bearer_token_resolves_registry_user() {
        let (gate, _registry) = gate_with_registry();
        let caller = gate.authenticate(Some(&token_for(7)), None).unwrap();
        assert_eq!(caller.user_id, Some(7));
        assert_eq!(caller.roles, vec!["developer".to_string()]);
    }

    #[test]
    fn api_key_resolves_with_scopes_and_override() {
        let (gate, _registry) = gate_with_registry();
        let caller = gate.authenticate(None, Some("sk-live-1")).unwrap();
        assert_eq!(caller.api_key_id, Some(1));
        assert_eq!(caller.user_id, Some(7));
        assert!(caller.has_scope("include_deprecated"));
        assert_eq!(caller.rate_limit_per_minute, Some(5));
    }

    #[test]
    fn both_credentials_are_rejected() {
        let (gate, _registry) = gate_with_registry();
        let err = gate
            .authenticate(Some(&token_for(7)), Some("sk-live-1"))
            .unwrap_err();
        assert!(matches!(err, Error::Unauthenticated { .. }));
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let (gate, _registry) = gate_with_registry();
        assert!(gate.authenticate(None, None).is_err());
    }

    #[test]
    fn unknown_api_key_is_rejected() {
        let (gate, _registry) = gate_with_registry();
        assert!(gate.authenticate(None, Some("sk-wrong")).is_err());
    }

    #[test]
    fn deactivated_user_is_rejected() {
        let (gate, registry) = gate_with_registry();
        registry.upsert_user(User {
            id: 7,
            name: "dev".into(),
            roles: vec![],
            attributes: Default::default(),
            active: false,
        });
        assert!(gate.authenticate(Some(&token_for(7)), None).is_err());
        assert!(gate.authenticate(None, Some("sk-live-1")).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        let (gate, _registry) = gate_with_registry();
        assert!(gate.authenticate(Some("not-a-jwt"), None).is_err());
    }
}
