//! Feedback ranking
//!
//! Converts the append-only selection log into bounded per-target boost
//! factors. The hot path only ever reads a precomputed [`BoostMap`] swapped
//! in atomically; recomputation runs on a timer or on demand and never
//! scans the log per request.

use arc_swap::ArcSwap;
use capdex_domain::entities::feedback::{
    SearchQueryRecord, TargetKind, UserSelectionRecord,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Boost computation parameters
#[derive(Debug, Clone)]
pub struct BoostConfig {
    /// Clamp applied to every boost factor (min, max)
    pub bounds: (f64, f64),
    /// Time-decay buckets as (max age, weight), youngest first
    pub decay_buckets: Vec<(Duration, f64)>,
    /// Weight of events older than every bucket
    pub older_weight: f64,
    /// Empirical click probability per rank (rank 1 first); ranks past the
    /// end of the table use `1/log2(rank+1)`
    pub position_bias: Vec<f64>,
    /// How far back the log is read
    pub window: Duration,
    /// Targets with fewer weighted impressions get no boost
    pub min_impressions: f64,
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            bounds: (
                capdex_domain::constants::DEFAULT_BOOST_MIN,
                capdex_domain::constants::DEFAULT_BOOST_MAX,
            ),
            decay_buckets: vec![
                (Duration::from_secs(24 * 3600), 1.0),
                (Duration::from_secs(7 * 24 * 3600), 0.7),
                (Duration::from_secs(30 * 24 * 3600), 0.3),
            ],
            older_weight: 0.1,
            position_bias: Vec::new(),
            window: Duration::from_secs(30 * 24 * 3600),
            min_impressions: 1.0,
        }
    }
}

impl BoostConfig {
    fn decay(&self, age: ChronoDuration) -> f64 {
        let age = age.to_std().unwrap_or(Duration::ZERO);
        for (max_age, weight) in &self.decay_buckets {
            if age <= *max_age {
                return *weight;
            }
        }
        self.older_weight
    }

    /// Empirical click probability at a 1-based rank position
    fn position_probability(&self, position: usize) -> f64 {
        if position == 0 {
            return 1.0;
        }
        if let Some(p) = self.position_bias.get(position - 1) {
            return p.max(f64::EPSILON);
        }
        1.0 / ((position as f64) + 1.0).log2()
    }
}

/// Immutable per-target boost factors
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BoostMap {
    boosts: HashMap<(TargetKind, i64), f64>,
}

impl BoostMap {
    /// Boost factor for a target; unknown targets boost by zero
    pub fn get(&self, kind: TargetKind, id: i64) -> f64 {
        self.boosts.get(&(kind, id)).copied().unwrap_or(0.0)
    }

    /// Number of targets carrying a non-default boost
    pub fn len(&self) -> usize {
        self.boosts.len()
    }

    /// True when no target carries a boost
    pub fn is_empty(&self) -> bool {
        self.boosts.is_empty()
    }
}

/// Compute boost factors from a window of the feedback log.
///
/// A returned tool position is an impression for both the tool and its
/// owning service, and a selection credits both; click-through rate per
/// target is decay-weighted clicks (position-bias corrected; dissatisfied
/// selections count half) over decay-weighted impressions. The boost is the
/// target's CTR deviation from the mean CTR, clamped to the configured
/// bounds.
pub fn compute_boosts(
    searches: &[SearchQueryRecord],
    selections: &[UserSelectionRecord],
    now: DateTime<Utc>,
    config: &BoostConfig,
) -> BoostMap {
    let mut impressions: HashMap<(TargetKind, i64), f64> = HashMap::new();
    for search in searches {
        let weight = config.decay(now - search.timestamp);
        for returned in &search.returned {
            for target in returned.boost_targets() {
                *impressions.entry(target).or_insert(0.0) += weight;
            }
        }
    }

    let mut clicks: HashMap<(TargetKind, i64), f64> = HashMap::new();
    for selection in selections {
        let decay = config.decay(now - selection.timestamp);
        let satisfaction = match selection.satisfied {
            Some(false) => 0.5,
            _ => 1.0,
        };
        let corrected = decay * satisfaction / config.position_probability(selection.position);
        for target in selection.target.boost_targets() {
            *clicks.entry(target).or_insert(0.0) += corrected;
        }
    }

    let mut ctr: HashMap<(TargetKind, i64), f64> = HashMap::new();
    for (target, seen) in &impressions {
        if *seen < config.min_impressions {
            continue;
        }
        let clicked = clicks.get(target).copied().unwrap_or(0.0);
        ctr.insert(*target, clicked / seen);
    }

    if ctr.is_empty() {
        return BoostMap::default();
    }
    let mean: f64 = ctr.values().sum::<f64>() / ctr.len() as f64;

    let (min_bound, max_bound) = config.bounds;
    let boosts = ctr
        .into_iter()
        .map(|(target, rate)| (target, (rate - mean).clamp(min_bound, max_bound)))
        .collect();
    BoostMap { boosts }
}

/// Atomically swapped handle the pipeline reads boosts through
#[derive(Default)]
pub struct BoostHandle {
    map: ArcSwap<BoostMap>,
}

impl BoostHandle {
    /// Create a handle holding an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Current boost for a target
    pub fn boost(&self, kind: TargetKind, id: i64) -> f64 {
        self.map.load().get(kind, id)
    }

    /// Swap in a freshly computed map
    pub fn store(&self, map: BoostMap) {
        self.map.store(Arc::new(map));
    }

    /// Number of boosted targets in the current map
    pub fn len(&self) -> usize {
        self.map.load().len()
    }

    /// True when the current map is empty
    pub fn is_empty(&self) -> bool {
        self.map.load().is_empty()
    }
}

/// Recompute boosts from the store and swap them into the handle.
///
/// Called by the refresh timer and by on-demand refresh paths.
pub async fn refresh_boosts(
    store: &dyn capdex_domain::ports::FeedbackStore,
    handle: &BoostHandle,
    config: &BoostConfig,
) -> capdex_domain::error::Result<()> {
    let now = Utc::now();
    let since = now - ChronoDuration::from_std(config.window).unwrap_or(ChronoDuration::days(30));
    let searches = store.searches_since(since).await?;
    let selections = store.selections_since(since).await?;
    handle.store(compute_boosts(&searches, &selections, now, config));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use capdex_domain::entities::feedback::ReturnedTarget;

    fn search(ids: &[i64], age_hours: i64, now: DateTime<Utc>) -> SearchQueryRecord {
        SearchQueryRecord {
            search_id: format!("s-{age_hours}"),
            query: "q".into(),
            normalized_query_hash: "h".into(),
            caller: "user:1".into(),
            mode: "tools_only".into(),
            verbosity: "full".into(),
            returned: ids.iter().map(|id| ReturnedTarget::service(*id)).collect(),
            response_time_ms: 5,
            timestamp: now - ChronoDuration::hours(age_hours),
        }
    }

    fn selection(
        id: i64,
        position: usize,
        age_hours: i64,
        now: DateTime<Utc>,
    ) -> UserSelectionRecord {
        UserSelectionRecord {
            search_id: "s".into(),
            position,
            target: ReturnedTarget::service(id),
            selected_id: id,
            caller: "user:1".into(),
            satisfied: None,
            timestamp: now - ChronoDuration::hours(age_hours),
        }
    }

    #[test]
    fn selected_targets_get_positive_boost() {
        let now = Utc::now();
        let searches = vec![search(&[1, 2, 3], 1, now)];
        let selections = vec![selection(1, 1, 1, now)];
        let map = compute_boosts(&searches, &selections, now, &BoostConfig::default());

        assert!(map.get(TargetKind::Service, 1) > 0.0);
        assert!(map.get(TargetKind::Service, 2) < 0.0);
    }

    #[test]
    fn tool_selection_credits_service_and_tool() {
        let now = Utc::now();
        let mut record = search(&[], 1, now);
        record.returned = vec![ReturnedTarget::tool(3, 10), ReturnedTarget::tool(4, 11)];
        let selection = UserSelectionRecord {
            search_id: record.search_id.clone(),
            position: 1,
            target: ReturnedTarget::tool(3, 10),
            selected_id: 3,
            caller: "user:1".into(),
            satisfied: None,
            timestamp: now,
        };
        let map = compute_boosts(&[record], &[selection], now, &BoostConfig::default());
        assert!(map.get(TargetKind::Service, 3) > 0.0);
        assert!(map.get(TargetKind::Tool, 10) > 0.0);
        assert!(map.get(TargetKind::Tool, 11) < 0.0);
    }

    #[test]
    fn boosts_respect_bounds() {
        let now = Utc::now();
        let searches = vec![search(&[1, 2], 1, now)];
        let selections: Vec<_> = (0..50).map(|_| selection(1, 5, 1, now)).collect();
        let config = BoostConfig::default();
        let map = compute_boosts(&searches, &selections, now, &config);

        assert!(map.get(TargetKind::Service, 1) <= config.bounds.1 + 1e-12);
        assert!(map.get(TargetKind::Service, 2) >= config.bounds.0 - 1e-12);
    }

    #[test]
    fn older_selections_weigh_less() {
        let now = Utc::now();
        let config = BoostConfig::default();

        let fresh = compute_boosts(
            &[search(&[1, 2], 1, now), search(&[1, 2], 1, now)],
            &[selection(1, 1, 1, now)],
            now,
            &config,
        );
        let stale = compute_boosts(
            &[search(&[1, 2], 1, now), search(&[1, 2], 1, now)],
            &[selection(1, 1, 20 * 24, now)],
            now,
            &config,
        );
        assert!(
            fresh.get(TargetKind::Service, 1) > stale.get(TargetKind::Service, 1),
            "a day-old click should outweigh a twenty-day-old one"
        );
    }

    #[test]
    fn deep_position_clicks_are_corrected_upward() {
        let now = Utc::now();
        // Lots of impressions so the CTR stays below the clamp
        let searches: Vec<_> = (0..20).map(|_| search(&[1, 2], 1, now)).collect();
        let config = BoostConfig::default();

        let top = compute_boosts(&searches, &[selection(1, 1, 1, now)], now, &config);
        let deep = compute_boosts(&searches, &[selection(1, 9, 1, now)], now, &config);
        assert!(
            deep.get(TargetKind::Service, 1) > top.get(TargetKind::Service, 1),
            "a click at rank 9 is stronger evidence than a click at rank 1"
        );
    }

    #[test]
    fn dissatisfied_selections_count_half() {
        let now = Utc::now();
        let searches: Vec<_> = (0..20).map(|_| search(&[1, 2], 1, now)).collect();
        let config = BoostConfig::default();

        let happy = compute_boosts(&searches, &[selection(1, 1, 1, now)], now, &config);
        let mut unhappy_selection = selection(1, 1, 1, now);
        unhappy_selection.satisfied = Some(false);
        let unhappy = compute_boosts(&searches, &[unhappy_selection], now, &config);
        assert!(happy.get(TargetKind::Service, 1) > unhappy.get(TargetKind::Service, 1));
    }

    #[test]
    fn empty_log_yields_empty_map() {
        let map = compute_boosts(&[], &[], Utc::now(), &BoostConfig::default());
        assert!(map.is_empty());
        assert_eq!(map.get(TargetKind::Tool, 42), 0.0);
    }

    #[test]
    fn handle_swaps_atomically() {
        let handle = BoostHandle::new();
        assert_eq!(handle.boost(TargetKind::Service, 1), 0.0);

        let now = Utc::now();
        let map = compute_boosts(
            &[search(&[1, 2], 1, now)],
            &[selection(1, 1, 1, now)],
            now,
            &BoostConfig::default(),
        );
        handle.store(map);
        assert!(handle.boost(TargetKind::Service, 1) > 0.0);
    }
}
