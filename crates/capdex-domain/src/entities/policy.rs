//! Access policies
//!
//! Policies are sets of predicates attached to services. Caller attributes
//! are an open map, so attribute predicates are evaluated by a small
//! interpreter instead of generating one type per attribute schema.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stable integer identifier of a policy
pub type PolicyId = i64;

/// How an attribute constraint matches a caller attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op", content = "value")]
pub enum AttributeMatch {
    /// Attribute equals the given scalar
    Equals(serde_json::Value),
    /// Attribute equals one of the given values
    In(Vec<serde_json::Value>),
    /// Attribute is a list containing the given value
    Contains(serde_json::Value),
    /// Attribute is a list containing every given value
    All(Vec<serde_json::Value>),
    /// Attribute is a list containing at least one of the given values
    Any(Vec<serde_json::Value>),
}

impl AttributeMatch {
    /// Evaluate this constraint against an attribute value (None = absent)
    pub fn matches(&self, actual: Option<&serde_json::Value>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        match self {
            Self::Equals(expected) => scalar_or_member_eq(actual, expected),
            Self::In(candidates) => candidates.iter().any(|c| actual == c),
            Self::Contains(needle) => as_list(actual).is_some_and(|l| l.contains(needle)),
            Self::All(needles) => {
                as_list(actual).is_some_and(|l| needles.iter().all(|n| l.contains(n)))
            }
            Self::Any(needles) => {
                as_list(actual).is_some_and(|l| needles.iter().any(|n| l.contains(n)))
            }
        }
    }
}

/// Scalars compare directly; list attributes satisfy an equals constraint
/// when they contain the expected value (list-contains semantics).
fn scalar_or_member_eq(actual: &serde_json::Value, expected: &serde_json::Value) -> bool {
    if actual == expected {
        return true;
    }
    as_list(actual).is_some_and(|l| l.contains(expected))
}

fn as_list(value: &serde_json::Value) -> Option<&Vec<serde_json::Value>> {
    value.as_array()
}

/// A single policy predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum PolicyPredicate {
    /// Caller's role set must contain every required role
    RoleBased {
        /// Roles the caller must hold
        required_roles: Vec<String>,
    },
    /// Every attribute constraint must match the caller's attributes
    AttributeBased {
        /// Attribute key -> constraint
        constraints: HashMap<String, AttributeMatch>,
    },
}

/// A named set of predicates attached to zero-or-more services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessPolicy {
    /// Stable integer id
    pub id: PolicyId,
    /// Policy name for admin display
    pub name: String,
    /// Predicates; all must pass for the policy to pass
    pub predicates: Vec<PolicyPredicate>,
}

impl AccessPolicy {
    /// Attribute keys this policy references, used for the caller fingerprint
    pub fn referenced_attribute_keys(&self) -> impl Iterator<Item = &str> {
        self.predicates.iter().flat_map(|p| match p {
            PolicyPredicate::RoleBased { .. } => Vec::new().into_iter(),
            PolicyPredicate::AttributeBased { constraints } => constraints
                .keys()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .into_iter(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn equals_matches_scalars_and_list_members() {
        let m = AttributeMatch::Equals(json!("finance"));
        assert!(m.matches(Some(&json!("finance"))));
        assert!(m.matches(Some(&json!(["hr", "finance"]))));
        assert!(!m.matches(Some(&json!("hr"))));
        assert!(!m.matches(None));
    }

    #[test]
    fn in_and_contains() {
        let m = AttributeMatch::In(vec![json!("us"), json!("eu")]);
        assert!(m.matches(Some(&json!("eu"))));
        assert!(!m.matches(Some(&json!("apac"))));

        let c = AttributeMatch::Contains(json!("payments"));
        assert!(c.matches(Some(&json!(["payments", "refunds"]))));
        assert!(!c.matches(Some(&json!("payments"))));
    }

    #[test]
    fn all_and_any_over_list_attributes() {
        let all = AttributeMatch::All(vec![json!("a"), json!("b")]);
        assert!(all.matches(Some(&json!(["a", "b", "c"]))));
        assert!(!all.matches(Some(&json!(["a", "c"]))));

        let any = AttributeMatch::Any(vec![json!("x"), json!("b")]);
        assert!(any.matches(Some(&json!(["a", "b"]))));
        assert!(!any.matches(Some(&json!(["a", "c"]))));
    }

    #[test]
    fn referenced_attribute_keys_skip_role_predicates() {
        let policy = AccessPolicy {
            id: 1,
            name: "finance-only".into(),
            predicates: vec![
                PolicyPredicate::RoleBased {
                    required_roles: vec!["analyst".into()],
                },
                PolicyPredicate::AttributeBased {
                    constraints: HashMap::from([(
                        "department".to_string(),
                        AttributeMatch::Equals(json!("finance")),
                    )]),
                },
            ],
        };
        let keys: Vec<&str> = policy.referenced_attribute_keys().collect();
        assert_eq!(keys, vec!["department"]);
    }
}
