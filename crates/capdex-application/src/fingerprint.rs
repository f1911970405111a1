//! Caller fingerprinting
//!
//! The response cache keys on a stable digest of the parts of a caller that
//! can change search results: the role set, the scope set, and only the
//! attributes referenced by at least one loaded policy. Hashing the full
//! attribute map would make every caller a distinct cache key.

use capdex_domain::entities::CallerIdentity;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// Compute the user-context fingerprint for response-cache keys.
///
/// Scopes are included because `include_deprecated` changes the visible
/// result set; two callers with equal roles, scopes and policy-relevant
/// attributes share cache entries.
pub fn user_context_fingerprint(
    caller: &CallerIdentity,
    policy_attribute_keys: &BTreeSet<String>,
) -> String {
    let mut hasher = Sha256::new();

    let mut roles: Vec<&str> = caller.roles.iter().map(String::as_str).collect();
    roles.sort_unstable();
    for role in roles {
        hasher.update(b"r:");
        hasher.update(role.as_bytes());
        hasher.update([0u8]);
    }

    let mut scopes: Vec<&str> = caller.scopes.iter().map(String::as_str).collect();
    scopes.sort_unstable();
    for scope in scopes {
        hasher.update(b"s:");
        hasher.update(scope.as_bytes());
        hasher.update([0u8]);
    }

    hasher.update(if caller.has_identity() { b"i:1" } else { b"i:0" });

    // BTreeSet iteration is already sorted
    for key in policy_attribute_keys {
        if let Some(value) = caller.attributes.get(key) {
            hasher.update(b"a:");
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.to_string().as_bytes());
            hasher.update([0u8]);
        }
    }

    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}
