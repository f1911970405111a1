//! The search pipeline
//!
//! Orchestrates embedding, index search, enrichment, policy filtering,
//! feedback boosting and response shaping for one request. The
//! [`SearchService`] aggregate owns every collaborator by `Arc`, so tests
//! spin up fully isolated instances.
//!
//! Degraded paths: a dead primary embedder fails the request with a
//! transient error (back-ends are bound at startup, never swapped
//! mid-flight); an unavailable index drops to the bounded keyword scan; a
//! broken cache tier behaves as a miss; an empty boost map means
//! `final == semantic`.

use capdex_domain::entities::feedback::{ReturnedTarget, SearchQueryRecord, TargetKind};
use capdex_domain::entities::service::Capability;
use capdex_domain::entities::{CallerIdentity, Tool};
use capdex_domain::error::{Error, Result};
use capdex_domain::normalize::normalize_text;
use capdex_domain::ports::{
    EmbeddingBackend, EmbeddingProvider, FeedbackStore, RegistryReader, VectorIndexProvider,
};
use capdex_domain::value_objects::{Embedding, RegistrySnapshot, SearchMode, ServiceBundle};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::caches::{EmbeddingCache, ResponseCache};
use crate::document::service_document;
use crate::feedback::BoostHandle;
use crate::fingerprint::user_context_fingerprint;
use crate::keyword;
use crate::policy;
use crate::request::SearchRequest;
use crate::response::{
    shape_integration, shape_service, shape_tool, SearchMetadata, SearchResponse, SearchResult,
    SimilarServicesResponse,
};
use crate::status::{RuntimeStatus, SearchStatusReport};

/// Pipeline tuning knobs
#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Multiplier applied to `limit` when querying an index
    pub over_fetch_factor: usize,
    /// Upper bound on candidates examined by the keyword fallback
    pub keyword_scan_limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            over_fetch_factor: capdex_domain::constants::DEFAULT_OVER_FETCH_FACTOR,
            keyword_scan_limit: capdex_domain::constants::DEFAULT_KEYWORD_SCAN_LIMIT,
        }
    }
}

/// Everything the pipeline needs, wired by the bootstrap
pub struct SearchServiceParts {
    /// The embedding back-end bound at startup
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// Index over service documents
    pub services_index: Arc<dyn VectorIndexProvider>,
    /// Index over tool documents
    pub tools_index: Arc<dyn VectorIndexProvider>,
    /// Derived index over frequently co-invoked sequences
    pub workflows_index: Arc<dyn VectorIndexProvider>,
    /// Registry projection
    pub registry: Arc<dyn RegistryReader>,
    /// Embedding cache tier
    pub embedding_cache: Arc<EmbeddingCache>,
    /// Response cache tiers, shared with the invalidation controller
    pub response_cache: Arc<ResponseCache>,
    /// Swap-in feedback boost map
    pub boosts: Arc<BoostHandle>,
    /// Append-only feedback log
    pub feedback: Arc<dyn FeedbackStore>,
    /// Rebuild status shared with the controller
    pub status: Arc<RuntimeStatus>,
    /// Tuning knobs
    pub settings: SearchSettings,
}

/// The search service aggregate
pub struct SearchService {
    embedder: Arc<dyn EmbeddingProvider>,
    services_index: Arc<dyn VectorIndexProvider>,
    tools_index: Arc<dyn VectorIndexProvider>,
    workflows_index: Arc<dyn VectorIndexProvider>,
    registry: Arc<dyn RegistryReader>,
    embedding_cache: Arc<EmbeddingCache>,
    response_cache: Arc<ResponseCache>,
    boosts: Arc<BoostHandle>,
    feedback: Arc<dyn FeedbackStore>,
    status: Arc<RuntimeStatus>,
    settings: SearchSettings,
}

/// Digest of the request options that change the result set, so
/// differently-shaped requests never share a response-cache entry
fn request_options_digest(request: &SearchRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request.limit.to_le_bytes());
    hasher.update(request.min_score.to_le_bytes());
    hasher.update([u8::from(request.include_orchestration)]);
    for domain in &request.domains {
        hasher.update(b"d:");
        hasher.update(domain.as_bytes());
    }
    for capability in &request.capabilities {
        hasher.update(b"c:");
        hasher.update(capability.as_bytes());
    }
    for excluded in &request.exclude_services {
        hasher.update(b"x:");
        hasher.update(excluded.to_le_bytes());
    }
    if let Some(version) = &request.min_version {
        hasher.update(b"v:");
        hasher.update(version.as_bytes());
    }
    hex::encode(&hasher.finalize()[..8])
}

/// A candidate after index search and enrichment, before filtering
struct Candidate {
    similarity: f64,
    bundle: ServiceBundle,
    tool: Option<Tool>,
    matched_capability: Option<Capability>,
}

impl Candidate {
    /// Id used for stable tie-breaking and feedback targeting
    fn primary_id(&self) -> i64 {
        self.tool.as_ref().map_or(self.bundle.service.id, |t| t.id)
    }
}

impl SearchService {
    /// Assemble the aggregate from its wired parts
    pub fn new(parts: SearchServiceParts) -> Self {
        Self {
            embedder: parts.embedder,
            services_index: parts.services_index,
            tools_index: parts.tools_index,
            workflows_index: parts.workflows_index,
            registry: parts.registry,
            embedding_cache: parts.embedding_cache,
            response_cache: parts.response_cache,
            boosts: parts.boosts,
            feedback: parts.feedback,
            status: parts.status,
            settings: parts.settings,
        }
    }

    /// The embedding back-end this process bound at startup
    pub fn embedding_backend(&self) -> EmbeddingBackend {
        self.embedder.backend()
    }

    /// Execute one search request for an admitted caller.
    pub async fn search(
        &self,
        caller: &CallerIdentity,
        request: &SearchRequest,
    ) -> Result<SearchResponse> {
        let started = Instant::now();
        request.validate()?;

        let snapshot = self.registry.snapshot();
        let normalized = normalize_text(&request.query);
        let fingerprint = user_context_fingerprint(caller, &snapshot.policy_attribute_keys());
        let cache_key = self.response_cache.key(
            &normalized,
            request.mode,
            request.verbosity,
            &fingerprint,
            &request_options_digest(request),
        );

        if let Some(cached) = self.response_cache.get(&cache_key).await {
            if let Ok(mut response) = serde_json::from_str::<SearchResponse>(&cached) {
                let elapsed = started.elapsed().as_millis() as u64;
                response.metadata.search_id = Uuid::new_v4().to_string();
                response.metadata.cache_hit = true;
                response.metadata.processing_time_ms = elapsed;
                self.log_search(&response, request, &normalized, caller, elapsed)
                    .await;
                return Ok(response);
            }
        }

        let query_vector = self.query_vector(&normalized).await?;
        let k = request.limit.saturating_mul(self.settings.over_fetch_factor).max(1);

        let (candidates, search_backend, fallback_from) = self
            .collect_candidates(&snapshot, request, &normalized, &query_vector, k)
            .await?;

        let ranked = self.filter_and_rank(caller, request, candidates);

        let results: Vec<SearchResult> = ranked
            .into_iter()
            .enumerate()
            .map(|(i, (candidate, semantic, boost, final_score))| {
                self.shape_result(candidate, semantic, boost, final_score, i + 1, request)
            })
            .collect();

        let elapsed = started.elapsed().as_millis() as u64;
        let response = SearchResponse {
            query: request.query.clone(),
            search_mode: request.mode.as_str().to_string(),
            total_results: results.len(),
            results,
            metadata: SearchMetadata {
                search_id: Uuid::new_v4().to_string(),
                processing_time_ms: elapsed,
                cache_hit: false,
                embedding_backend: self.embedder.backend().as_str().to_string(),
                search_backend: search_backend.to_string(),
                fallback_from,
            },
        };

        self.log_search(&response, request, &normalized, caller, elapsed)
            .await;
        if let Ok(serialized) = serde_json::to_string(&response) {
            self.response_cache.put(&cache_key, &serialized).await;
        }
        Ok(response)
    }

    /// Record a user selection against a prior search.
    pub async fn record_selection(
        &self,
        caller: &CallerIdentity,
        search_id: &str,
        position: usize,
        selected_id: i64,
        satisfied: Option<bool>,
    ) -> Result<()> {
        self.feedback
            .log_selection(
                search_id,
                position,
                selected_id,
                &caller.bucket_key(),
                satisfied,
            )
            .await?;
        Ok(())
    }

    /// Services whose embeddings are closest to the given service's.
    pub async fn similar_services(
        &self,
        caller: &CallerIdentity,
        service_id: i64,
        limit: usize,
    ) -> Result<SimilarServicesResponse> {
        let snapshot = self.registry.snapshot();
        let anchor = snapshot
            .service_bundle(service_id)
            .ok_or_else(|| Error::not_found(format!("service {service_id}")))?;

        let vector = match self.services_index.vector_of(service_id).await? {
            Some(v) => v,
            None => {
                let document = service_document(&anchor);
                self.embed_guarded(&document).await?.vector
            }
        };

        let hits = self.services_index.search(&vector, limit + 1).await?;
        let mut results = Vec::new();
        let mut rank = 0usize;
        for (id, similarity) in hits {
            if id == service_id || results.len() >= limit {
                continue;
            }
            let Some(bundle) = snapshot.service_bundle(id) else {
                continue;
            };
            if !bundle.service.is_indexable() {
                continue;
            }
            if !policy::allow(caller, &bundle) {
                continue;
            }
            rank += 1;
            let candidate = Candidate {
                similarity,
                bundle,
                tool: None,
                matched_capability: None,
            };
            results.push(self.shape_result(
                candidate,
                similarity,
                0.0,
                similarity,
                rank,
                &SearchRequest::with_query("similar"),
            ));
        }

        Ok(SimilarServicesResponse {
            service_id,
            total_results: results.len(),
            results,
        })
    }

    /// The `/search/status` report.
    pub async fn status_report(&self) -> SearchStatusReport {
        SearchStatusReport {
            services_index_size: self.services_index.len().await,
            tools_index_size: self.tools_index.len().await,
            workflows_index_size: self.workflows_index.len().await,
            embedding_backend: self.embedder.backend().as_str().to_string(),
            embedding_model: self.embedder.model_id().to_string(),
            last_rebuild_at: self.status.last_rebuild(),
            index_stale: self.status.is_stale(),
            last_rebuild_error: self.status.last_rebuild_error(),
            embedding_cache: self.embedding_cache.counters.snapshot(),
            response_cache: self.response_cache.counters.snapshot(),
        }
    }

    /// Per-component readiness for `/health`.
    pub async fn component_health(&self) -> Vec<(&'static str, bool)> {
        let registry_ok = !self.registry.snapshot().services.is_empty()
            || self.services_index.len().await == 0;
        vec![
            ("registry", registry_ok),
            ("services_index", !self.status.is_stale()),
            ("tools_index", !self.status.is_stale()),
            ("cache", true),
        ]
    }

    // ------------------------------------------------------------------
    // internals
    // ------------------------------------------------------------------

    async fn query_vector(&self, normalized: &str) -> Result<Vec<f32>> {
        if let Some(vector) = self.embedding_cache.get(normalized).await {
            return Ok(vector);
        }
        let embedding = self.embed_guarded(normalized).await?;
        self.embedding_cache.put(normalized, &embedding.vector).await;
        Ok(embedding.vector)
    }

    /// Embed with the bound back-end. A mid-flight primary failure is a
    /// transient dependency error; the process never swaps back-ends.
    async fn embed_guarded(&self, text: &str) -> Result<Embedding> {
        self.embedder
            .embed(text)
            .await
            .map_err(|e| self.guard_embed_error(e))
    }

    async fn embed_batch_guarded(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        self.embedder
            .embed_batch(texts)
            .await
            .map_err(|e| self.guard_embed_error(e))
    }

    fn guard_embed_error(&self, e: Error) -> Error {
        if self.embedder.backend() == EmbeddingBackend::Primary {
            warn!(error = %e, "primary embedding backend failed mid-flight");
            Error::dependency_unavailable(format!("embedding backend failed: {e}"))
        } else {
            e
        }
    }

    async fn collect_candidates(
        &self,
        snapshot: &RegistrySnapshot,
        request: &SearchRequest,
        normalized: &str,
        query_vector: &[f32],
        k: usize,
    ) -> Result<(Vec<Candidate>, &'static str, Option<String>)> {
        match request.mode {
            SearchMode::ToolsOnly => {
                let (candidates, backend) = self
                    .tool_candidates(snapshot, normalized, query_vector, k)
                    .await?;
                Ok((candidates, backend, None))
            }
            SearchMode::AgentsAndTools => {
                let (mut tools, tools_backend) = self
                    .tool_candidates(snapshot, normalized, query_vector, k)
                    .await?;
                let (services, services_backend) = self
                    .service_candidates(snapshot, normalized, query_vector, k)
                    .await?;
                tools.extend(services);
                let backend = if tools_backend == "keyword" || services_backend == "keyword" {
                    "keyword"
                } else {
                    "vector"
                };
                Ok((tools, backend, None))
            }
            SearchMode::Workflows => {
                if self.workflows_index.len().await == 0 {
                    // The derived co-invocation index is not populated yet;
                    // answer like tools_only and say so.
                    let (candidates, backend) = self
                        .tool_candidates(snapshot, normalized, query_vector, k)
                        .await?;
                    return Ok((candidates, backend, Some("workflows".to_string())));
                }
                let hits = self.workflows_index.search(query_vector, k).await?;
                let candidates = self.enrich_tool_hits(snapshot, hits);
                Ok((candidates, "vector", None))
            }
            SearchMode::Capabilities => {
                let candidates = self
                    .capability_candidates(snapshot, normalized, query_vector, k)
                    .await?;
                Ok((candidates, "vector", None))
            }
        }
    }

    async fn tool_candidates(
        &self,
        snapshot: &RegistrySnapshot,
        normalized: &str,
        query_vector: &[f32],
        k: usize,
    ) -> Result<(Vec<Candidate>, &'static str)> {
        match self.tools_index.search(query_vector, k).await {
            Ok(hits) => {
                if hits.is_empty() && self.tools_index.len().await == 0 {
                    let bundles = snapshot.indexable_tool_bundles();
                    if !bundles.is_empty() {
                        debug!("tools index empty with populated registry, using keyword scan");
                        return Ok((
                            self.keyword_tool_candidates(snapshot, normalized, k),
                            "keyword",
                        ));
                    }
                }
                Ok((self.enrich_tool_hits(snapshot, hits), "vector"))
            }
            Err(e) => {
                warn!(error = %e, "tools index unavailable, using keyword scan");
                Ok((
                    self.keyword_tool_candidates(snapshot, normalized, k),
                    "keyword",
                ))
            }
        }
    }

    fn keyword_tool_candidates(
        &self,
        snapshot: &RegistrySnapshot,
        normalized: &str,
        k: usize,
    ) -> Vec<Candidate> {
        let bundles = snapshot.indexable_tool_bundles();
        let hits = keyword::scan_tools(&bundles, normalized, self.settings.keyword_scan_limit);
        hits.into_iter()
            .take(k)
            .filter_map(|hit| {
                let bundle = snapshot.tool_bundle(hit.id)?;
                Some(Candidate {
                    similarity: hit.similarity,
                    tool: Some(bundle.tool),
                    bundle: bundle.service,
                    matched_capability: None,
                })
            })
            .collect()
    }

    fn enrich_tool_hits(
        &self,
        snapshot: &RegistrySnapshot,
        hits: Vec<(i64, f64)>,
    ) -> Vec<Candidate> {
        hits.into_iter()
            .filter_map(|(id, similarity)| {
                // The index may briefly lead or lag the registry; unknown or
                // no-longer-active ids are dropped here.
                let bundle = snapshot.tool_bundle(id)?;
                if !bundle.tool.is_active || !bundle.service.service.is_indexable() {
                    return None;
                }
                Some(Candidate {
                    similarity,
                    tool: Some(bundle.tool),
                    bundle: bundle.service,
                    matched_capability: None,
                })
            })
            .collect()
    }

    async fn service_candidates(
        &self,
        snapshot: &RegistrySnapshot,
        normalized: &str,
        query_vector: &[f32],
        k: usize,
    ) -> Result<(Vec<Candidate>, &'static str)> {
        match self.services_index.search(query_vector, k).await {
            Ok(hits) => {
                if hits.is_empty() && self.services_index.len().await == 0 {
                    let bundles = snapshot.indexable_service_bundles();
                    if !bundles.is_empty() {
                        debug!("services index empty with populated registry, using keyword scan");
                        return Ok((
                            self.keyword_service_candidates(snapshot, normalized, k),
                            "keyword",
                        ));
                    }
                }
                Ok((self.enrich_service_hits(snapshot, hits), "vector"))
            }
            Err(e) => {
                warn!(error = %e, "services index unavailable, using keyword scan");
                Ok((
                    self.keyword_service_candidates(snapshot, normalized, k),
                    "keyword",
                ))
            }
        }
    }

    fn keyword_service_candidates(
        &self,
        snapshot: &RegistrySnapshot,
        normalized: &str,
        k: usize,
    ) -> Vec<Candidate> {
        let bundles = snapshot.indexable_service_bundles();
        let hits = keyword::scan_services(&bundles, normalized, self.settings.keyword_scan_limit);
        hits.into_iter()
            .take(k)
            .filter_map(|hit| {
                let bundle = snapshot.service_bundle(hit.id)?;
                Some(Candidate {
                    similarity: hit.similarity,
                    bundle,
                    tool: None,
                    matched_capability: None,
                })
            })
            .collect()
    }

    fn enrich_service_hits(
        &self,
        snapshot: &RegistrySnapshot,
        hits: Vec<(i64, f64)>,
    ) -> Vec<Candidate> {
        hits.into_iter()
            .filter_map(|(id, similarity)| {
                let bundle = snapshot.service_bundle(id)?;
                if !bundle.service.is_indexable() {
                    return None;
                }
                Some(Candidate {
                    similarity,
                    bundle,
                    tool: None,
                    matched_capability: None,
                })
            })
            .collect()
    }

    /// Capabilities mode: service hits expand to their capability entries,
    /// each scored individually against the query; a service's score is its
    /// best capability's score.
    async fn capability_candidates(
        &self,
        snapshot: &RegistrySnapshot,
        normalized: &str,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<Candidate>> {
        let (service_candidates, _) = self
            .service_candidates(snapshot, normalized, query_vector, k)
            .await?;

        // Batch-embed every capability description across the hit services
        let mut texts: Vec<String> = Vec::new();
        let mut spans: Vec<(usize, usize)> = Vec::new();
        for candidate in &service_candidates {
            let start = texts.len();
            for capability in &candidate.bundle.service.capabilities {
                texts.push(normalize_text(&format!(
                    "{}: {}",
                    capability.name, capability.description
                )));
            }
            spans.push((start, texts.len()));
        }

        let capability_vectors = if texts.is_empty() {
            Vec::new()
        } else {
            self.embed_batch_guarded(&texts).await?
        };

        let mut out = Vec::with_capacity(service_candidates.len());
        for (candidate, (start, end)) in service_candidates.into_iter().zip(spans) {
            let mut best: Option<(f64, Capability)> = None;
            for (offset, capability) in candidate.bundle.service.capabilities.iter().enumerate() {
                let Some(embedding) = capability_vectors.get(start + offset) else {
                    continue;
                };
                let score = Embedding::unit_similarity(query_vector, &embedding.vector);
                if best.as_ref().is_none_or(|(b, _)| score > *b) {
                    best = Some((score, capability.clone()));
                }
            }
            if start == end {
                // No capabilities: the service scores on its own document
                out.push(candidate);
            } else if let Some((score, capability)) = best {
                out.push(Candidate {
                    similarity: score,
                    matched_capability: Some(capability),
                    ..candidate
                });
            }
        }
        Ok(out)
    }

    /// Request filters, policy filter, boost, min_score, sort, truncate.
    fn filter_and_rank(
        &self,
        caller: &CallerIdentity,
        request: &SearchRequest,
        candidates: Vec<Candidate>,
    ) -> Vec<(Candidate, f64, f64, f64)> {
        let mut scored: Vec<(Candidate, f64, f64, f64)> = candidates
            .into_iter()
            .filter(|c| self.request_filters_pass(request, c))
            .filter(|c| policy::allow(caller, &c.bundle))
            .map(|c| {
                let semantic = c.similarity;
                let boost = match &c.tool {
                    Some(tool) => self.boosts.boost(TargetKind::Tool, tool.id),
                    None => self.boosts.boost(TargetKind::Service, c.bundle.service.id),
                };
                let final_score = semantic * (1.0 + boost);
                (c, semantic, boost, final_score)
            })
            .filter(|(_, _, _, final_score)| *final_score >= request.min_score)
            .collect();

        scored.sort_by(|a, b| {
            b.3.partial_cmp(&a.3)
                .unwrap_or(Ordering::Equal)
                .then(b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal))
                .then(a.0.primary_id().cmp(&b.0.primary_id()))
        });
        scored.truncate(request.limit);
        scored
    }

    fn request_filters_pass(&self, request: &SearchRequest, candidate: &Candidate) -> bool {
        let service = &candidate.bundle.service;
        if request.exclude_services.contains(&service.id) {
            return false;
        }
        if !request.domains.is_empty()
            && !service.domains.iter().any(|d| request.domains.contains(d))
        {
            return false;
        }
        if !request.capabilities.is_empty() {
            let matches = service.capabilities.iter().any(|c| {
                request
                    .capabilities
                    .iter()
                    .any(|want| c.name.contains(want.as_str()))
            });
            if !matches {
                return false;
            }
        }
        if let Some(min_version) = &request.min_version {
            if !service.version_at_least(min_version) {
                return false;
            }
        }
        true
    }

    fn shape_result(
        &self,
        candidate: Candidate,
        semantic: f64,
        boost: f64,
        final_score: f64,
        rank: usize,
        request: &SearchRequest,
    ) -> SearchResult {
        let verbosity = request.verbosity;
        let (integration_details, agent_protocol) = if request.include_orchestration {
            (
                candidate
                    .bundle
                    .integration
                    .as_ref()
                    .map(|i| shape_integration(i, verbosity)),
                candidate.bundle.agent_protocol.clone(),
            )
        } else {
            (None, None)
        };

        SearchResult {
            service: shape_service(&candidate.bundle, verbosity),
            recommended_tool: candidate.tool.as_ref().map(|t| shape_tool(t, verbosity)),
            matched_capability: candidate.matched_capability,
            score: final_score,
            semantic_score: semantic,
            feedback_boost: boost,
            rank,
            distance: 1.0 - final_score,
            integration_details,
            agent_protocol,
        }
    }

    /// Write the search-query record. Failures are logged and swallowed:
    /// feedback is best-effort from the request's perspective.
    async fn log_search(
        &self,
        response: &SearchResponse,
        request: &SearchRequest,
        normalized: &str,
        caller: &CallerIdentity,
        elapsed_ms: u64,
    ) {
        let returned = response
            .results
            .iter()
            .map(|r| match &r.recommended_tool {
                Some(tool) => ReturnedTarget::tool(r.service.id, tool.id),
                None => ReturnedTarget::service(r.service.id),
            })
            .collect();

        let record = SearchQueryRecord {
            search_id: response.metadata.search_id.clone(),
            query: request.query.clone(),
            normalized_query_hash: hex::encode(Sha256::digest(normalized.as_bytes())),
            caller: caller.bucket_key(),
            mode: request.mode.as_str().to_string(),
            verbosity: request.verbosity.as_str().to_string(),
            returned,
            response_time_ms: elapsed_ms,
            timestamp: Utc::now(),
        };
        if let Err(e) = self.feedback.log_search(record).await {
            warn!(error = %e, "failed to write search-query record");
        }
    }
}
