//! Component health aggregation

use serde::{Deserialize, Serialize};

/// Readiness of one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name (`api`, `registry`, `services_index`, ...)
    pub name: String,
    /// Whether the component is ready
    pub healthy: bool,
}

/// The `/health` report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// `ok` when every component is healthy, else `degraded`
    pub status: String,
    /// Per-component readiness
    pub components: Vec<ComponentHealth>,
}

impl HealthReport {
    /// Aggregate component states into a report
    pub fn from_components(components: Vec<(&str, bool)>) -> Self {
        let all_healthy = components.iter().all(|(_, healthy)| *healthy);
        Self {
            status: if all_healthy { "ok" } else { "degraded" }.to_string(),
            components: components
                .into_iter()
                .map(|(name, healthy)| ComponentHealth {
                    name: name.to_string(),
                    healthy,
                })
                .collect(),
        }
    }
}
