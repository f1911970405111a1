//! Policy filter
//!
//! Pure function deciding whether a caller may discover a service.
//! Evaluation order: visibility gate, then attached policies (all must
//! pass), then the deprecation gate. Runs entirely over in-memory bundles,
//! no per-candidate I/O.

use capdex_domain::constants::SCOPE_INCLUDE_DEPRECATED;
use capdex_domain::entities::service::{ServiceStatus, Visibility};
use capdex_domain::entities::{CallerIdentity, PolicyPredicate};
use capdex_domain::value_objects::ServiceBundle;

/// Decide whether `caller` may see `bundle` in search results.
///
/// Pure: equal inputs always yield the same decision.
pub fn allow(caller: &CallerIdentity, bundle: &ServiceBundle) -> bool {
    let service = &bundle.service;

    // Inactive services are never discoverable, whatever the caller holds
    if service.status == ServiceStatus::Inactive {
        return false;
    }

    match service.visibility {
        Visibility::Public => {}
        Visibility::OrgWide | Visibility::Internal => {
            if !caller.has_identity() {
                return false;
            }
        }
        Visibility::Restricted => {
            if !caller.has_identity() {
                return false;
            }
            if bundle.policies.is_empty() {
                // Restricted with no predicates admits nobody; a
                // misconfigured service should fail closed.
                return false;
            }
        }
    }

    for policy in &bundle.policies {
        for predicate in &policy.predicates {
            if !predicate_passes(caller, predicate) {
                return false;
            }
        }
    }

    if service.status == ServiceStatus::Deprecated && !caller.has_scope(SCOPE_INCLUDE_DEPRECATED) {
        return false;
    }

    true
}

fn predicate_passes(caller: &CallerIdentity, predicate: &PolicyPredicate) -> bool {
    match predicate {
        PolicyPredicate::RoleBased { required_roles } => {
            required_roles.iter().all(|role| caller.has_role(role))
        }
        PolicyPredicate::AttributeBased { constraints } => constraints
            .iter()
            .all(|(key, constraint)| constraint.matches(caller.attributes.get(key))),
    }
}
