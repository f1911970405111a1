//! Runtime wiring
//!
//! Builds the `SearchService` aggregate and its collaborators from
//! configuration. Everything lives on the aggregate and is passed by
//! reference, never as a process-wide singleton, so tests can spin up
//! fully isolated runtimes.
//!
//! Embedding back-end binding happens exactly once, here: if the primary
//! model cannot be initialized the event is logged and the fallback is
//! bound for the lifetime of the process.

use capdex_application::caches::{EmbeddingCache, ResponseCache};
use capdex_application::feedback::{refresh_boosts, BoostConfig, BoostHandle};
use capdex_application::invalidation::{InvalidationController, InvalidationSettings};
use capdex_application::pipeline::{SearchService, SearchServiceParts, SearchSettings};
use capdex_application::status::RuntimeStatus;
use capdex_domain::error::Result;
use capdex_domain::ports::{
    CacheProvider, EmbeddingProvider, FeedbackStore, RegistryReader, SnapshotStore,
};
use capdex_providers::cache::MokaCacheProvider;
use capdex_providers::embedding::TermFrequencyEmbedder;
use capdex_providers::vector_index::InMemoryVectorIndex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::audit::AuditWriter;
use crate::auth::{AuthGate, AuthGateConfig, RateLimiter, RateLimiterConfig};
use crate::config::AppConfig;
use crate::feedback::InMemoryFeedbackStore;
use crate::registry::RegistryStore;
use crate::snapshot::FsSnapshotStore;

/// The wired runtime
pub struct Runtime {
    /// The search pipeline aggregate
    pub search: Arc<SearchService>,
    /// The auth & rate-limit gate
    pub gate: Arc<AuthGate>,
    /// The registry store feeding the pipeline and the gate
    pub registry: Arc<RegistryStore>,
    /// The invalidation & rebuild controller
    pub controller: Arc<InvalidationController>,
    /// Fire-and-forget audit writer
    pub audit: AuditWriter,
    /// Request deadline applied by the server
    pub request_timeout: Duration,
    /// The configuration the runtime was built from
    pub config: AppConfig,
}

/// Build a runtime over an existing registry store.
///
/// Performs the cold-start index recovery: persisted snapshots are loaded
/// when present and compatible, otherwise a full rebuild streams the
/// registry through the embedder. A failed initial rebuild leaves the
/// process serving (keyword fallback) with `index_stale` set.
pub async fn build_runtime(config: AppConfig, registry: Arc<RegistryStore>) -> Result<Runtime> {
    let embedder = bind_embedder(&config, registry.as_ref())?;
    info!(
        backend = embedder.backend().as_str(),
        model = embedder.model_id(),
        dimensions = embedder.dimensions(),
        "embedding backend bound"
    );

    let dimension = embedder.dimensions();
    let services_index = Arc::new(InMemoryVectorIndex::new(dimension));
    let tools_index = Arc::new(InMemoryVectorIndex::new(dimension));
    let workflows_index = Arc::new(InMemoryVectorIndex::new(dimension));

    let embedding_cache = Arc::new(EmbeddingCache::new(
        in_process_cache(&config, config.cache.embedding_ttl_seconds),
        Duration::from_secs(config.cache.embedding_ttl_seconds),
    ));
    let response_cache = Arc::new(ResponseCache::new(
        in_process_cache(&config, config.cache.response_ttl_seconds),
        shared_response_tier(&config).await,
        Duration::from_secs(config.cache.response_ttl_seconds),
    ));

    let snapshots: Option<Arc<dyn SnapshotStore>> = config
        .index
        .dir
        .as_ref()
        .map(|dir| Arc::new(FsSnapshotStore::new(dir)) as Arc<dyn SnapshotStore>);

    let status = Arc::new(RuntimeStatus::new());
    let controller = Arc::new(InvalidationController::new(
        registry.clone() as Arc<dyn RegistryReader>,
        embedder.clone(),
        services_index.clone(),
        tools_index.clone(),
        response_cache.clone(),
        snapshots,
        status.clone(),
        InvalidationSettings {
            rebuild_batch_size: config.index.rebuild_batch_size,
        },
    ));

    match controller.restore_from_snapshots().await {
        Ok(true) => info!("indexes restored from persisted snapshots"),
        Ok(false) => {
            info!("no usable snapshots, rebuilding indexes from the registry");
            if let Err(e) = controller.rebuild_all().await {
                error!(error = %e, "initial index rebuild failed, serving degraded");
            }
        }
        Err(e) => {
            warn!(error = %e, "snapshot restore failed, rebuilding from the registry");
            if let Err(e) = controller.rebuild_all().await {
                error!(error = %e, "initial index rebuild failed, serving degraded");
            }
        }
    }

    tokio::spawn(controller.clone().run(registry.bus().subscribe()));

    let feedback: Arc<dyn FeedbackStore> =
        Arc::new(InMemoryFeedbackStore::new(config.feedback.log_capacity));
    let boosts = Arc::new(BoostHandle::new());
    spawn_boost_refresh(&config, feedback.clone(), boosts.clone());

    let search = Arc::new(SearchService::new(SearchServiceParts {
        embedder,
        services_index,
        tools_index,
        workflows_index,
        registry: registry.clone() as Arc<dyn RegistryReader>,
        embedding_cache,
        response_cache,
        boosts,
        feedback,
        status,
        settings: SearchSettings {
            over_fetch_factor: config.limits.over_fetch_factor,
            keyword_scan_limit: config.limits.keyword_scan_limit,
        },
    }));

    let gate = Arc::new(AuthGate::new(
        registry.clone() as Arc<dyn RegistryReader>,
        RateLimiter::new(RateLimiterConfig {
            default_per_minute: config.limits.rate_limit_default_per_minute,
            burst: config.limits.rate_limit_burst,
        }),
        AuthGateConfig {
            jwt_secret: config.auth.jwt_secret.clone(),
            jwt_issuer: config.auth.jwt_issuer.clone(),
        },
    ));

    let maintenance_gate = gate.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            maintenance_gate.cleanup_rate_buckets();
        }
    });

    Ok(Runtime {
        search,
        gate,
        registry,
        controller,
        audit: AuditWriter::spawn(4_096),
        request_timeout: Duration::from_millis(config.limits.request_timeout_ms),
        config,
    })
}

/// Bind the embedding back-end for the lifetime of the process.
fn bind_embedder(
    config: &AppConfig,
    registry: &RegistryStore,
) -> Result<Arc<dyn EmbeddingProvider>> {
    #[cfg(feature = "embedding-fastembed")]
    if !config.embedding.model.eq_ignore_ascii_case("fallback") {
        match capdex_providers::embedding::FastEmbedProvider::new() {
            Ok(provider) => {
                if provider.dimensions() != config.embedding.dimension {
                    return Err(capdex_domain::error::Error::config(format!(
                        "embedding.dimension {} does not match model dimension {}",
                        config.embedding.dimension,
                        provider.dimensions()
                    )));
                }
                return Ok(Arc::new(provider));
            }
            Err(e) => {
                error!(error = %e, "primary embedding model failed to initialize, \
                       binding term-frequency fallback");
            }
        }
    }

    Ok(Arc::new(fit_fallback(config, registry)))
}

/// Fit the deterministic fallback on the current registry corpus.
fn fit_fallback(config: &AppConfig, registry: &RegistryStore) -> TermFrequencyEmbedder {
    use capdex_application::document::{service_document, tool_document};
    use capdex_domain::ports::RegistryReader as _;

    let snapshot = registry.snapshot();
    let mut corpus: Vec<String> = snapshot
        .indexable_service_bundles()
        .iter()
        .map(service_document)
        .collect();
    corpus.extend(
        snapshot
            .indexable_tool_bundles()
            .iter()
            .map(|b| tool_document(&b.tool, &b.service.service.name)),
    );

    TermFrequencyEmbedder::fit(
        &corpus,
        config.embedding.dimension,
        config.embedding.fallback_seed,
    )
}

fn in_process_cache(config: &AppConfig, ttl_seconds: u64) -> Arc<dyn CacheProvider> {
    Arc::new(MokaCacheProvider::with_config(
        config.cache.max_entries,
        Duration::from_secs(ttl_seconds),
    ))
}

async fn shared_response_tier(config: &AppConfig) -> Option<Arc<dyn CacheProvider>> {
    let Some(url) = &config.cache.redis_url else {
        return None;
    };
    #[cfg(feature = "cache-redis")]
    {
        match capdex_providers::cache::RedisCacheProvider::connect(
            url,
            "capdex",
            Duration::from_secs(config.cache.response_ttl_seconds),
        )
        .await
        {
            Ok(provider) => return Some(Arc::new(provider)),
            Err(e) => {
                warn!(error = %e, "shared response cache unavailable, continuing without it");
                return None;
            }
        }
    }
    #[cfg(not(feature = "cache-redis"))]
    {
        warn!(url = %url, "cache.redis_url set but the cache-redis feature is disabled");
        None
    }
}

fn spawn_boost_refresh(
    config: &AppConfig,
    feedback: Arc<dyn FeedbackStore>,
    boosts: Arc<BoostHandle>,
) {
    let boost_config = BoostConfig {
        bounds: (config.feedback.boost_min, config.feedback.boost_max),
        position_bias: config.feedback.position_bias.clone(),
        window: Duration::from_secs(u64::from(config.feedback.window_days) * 24 * 3600),
        ..BoostConfig::default()
    };
    let period = Duration::from_secs(config.feedback.refresh_seconds.max(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so startup stays quiet
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = refresh_boosts(feedback.as_ref(), &boosts, &boost_config).await {
                warn!(error = %e, "boost refresh failed");
            }
        }
    });
}
