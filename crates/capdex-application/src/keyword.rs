//! Keyword fallback scan
//!
//! When a vector index is unavailable the pipeline degrades to a bounded
//! substring scan over names, descriptions and capability names, scoring by
//! token overlap. Results carry `search_backend: keyword` so callers can
//! detect the substitution.

use capdex_domain::entities::feedback::TargetKind;
use capdex_domain::normalize::{normalize_text, tokenize};
use capdex_domain::value_objects::{ScoredHit, ServiceBundle, ToolBundle};
use std::collections::HashSet;

/// Score a candidate text against query tokens by token overlap.
///
/// Overlap is |query ∩ candidate| / |query|, nudged by a substring bonus so
/// exact name hits rank above incidental token matches. Result is in [0, 1].
fn overlap_score(query_tokens: &HashSet<String>, normalized_query: &str, candidate: &str) -> f64 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let normalized = normalize_text(candidate);
    let candidate_tokens: HashSet<String> = tokenize(&normalized).into_iter().collect();
    let overlap = query_tokens.intersection(&candidate_tokens).count() as f64;
    let base = overlap / query_tokens.len() as f64;
    let bonus = if !normalized_query.is_empty() && normalized.contains(normalized_query) {
        0.25
    } else {
        0.0
    };
    (base * 0.75 + bonus).min(1.0)
}

/// Scan service bundles, best-overlap first, bounded by `scan_limit`.
pub fn scan_services(
    bundles: &[ServiceBundle],
    query: &str,
    scan_limit: usize,
) -> Vec<ScoredHit> {
    let normalized_query = normalize_text(query);
    let query_tokens: HashSet<String> = tokenize(&normalized_query).into_iter().collect();

    let mut hits: Vec<ScoredHit> = bundles
        .iter()
        .take(scan_limit)
        .map(|bundle| {
            let mut text = format!(
                "{} {}",
                bundle.service.name, bundle.service.description
            );
            for capability in &bundle.service.capabilities {
                text.push(' ');
                text.push_str(&capability.name);
            }
            ScoredHit {
                id: bundle.service.id,
                kind: TargetKind::Service,
                similarity: overlap_score(&query_tokens, &normalized_query, &text),
            }
        })
        .filter(|hit| hit.similarity > 0.0)
        .collect();
    sort_hits(&mut hits);
    hits
}

/// Scan tool bundles, best-overlap first, bounded by `scan_limit`.
pub fn scan_tools(bundles: &[ToolBundle], query: &str, scan_limit: usize) -> Vec<ScoredHit> {
    let normalized_query = normalize_text(query);
    let query_tokens: HashSet<String> = tokenize(&normalized_query).into_iter().collect();

    let mut hits: Vec<ScoredHit> = bundles
        .iter()
        .take(scan_limit)
        .map(|bundle| {
            let text = format!(
                "{} {} {}",
                bundle.tool.name, bundle.tool.description, bundle.service.service.name
            );
            ScoredHit {
                id: bundle.tool.id,
                kind: TargetKind::Tool,
                similarity: overlap_score(&query_tokens, &normalized_query, &text),
            }
        })
        .filter(|hit| hit.similarity > 0.0)
        .collect();
    sort_hits(&mut hits);
    hits
}

fn sort_hits(hits: &mut [ScoredHit]) {
    hits.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });
}
