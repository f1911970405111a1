//! Invalidation & rebuild controller
//!
//! Consumes registry mutation events and keeps derived state honest:
//! re-embeds changed text, applies index deltas, bulk-invalidates the
//! response cache and runs full rebuilds with an atomic staging swap.
//!
//! At most one write or rebuild is in flight per controller (the rebuild
//! mutex); events arriving during a rebuild queue up in the broadcast
//! channel and are applied to the new index once it is live. A lagged
//! receiver means deltas were lost, so the controller falls back to a full
//! rebuild rather than trusting a partial view.

use capdex_domain::error::{Error, Result};
use capdex_domain::events::RegistryEvent;
use capdex_domain::ports::{
    EmbeddingProvider, RegistryReader, SnapshotStore, VectorIndexProvider,
};
use capdex_domain::value_objects::{IndexSnapshot, RegistrySnapshot};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::caches::ResponseCache;
use crate::document::{service_document, tool_document};
use crate::status::RuntimeStatus;

/// Logical index names used for persisted snapshots
pub const SERVICES_INDEX: &str = "services";
/// Logical index names used for persisted snapshots
pub const TOOLS_INDEX: &str = "tools";

/// Controller tuning knobs
#[derive(Debug, Clone)]
pub struct InvalidationSettings {
    /// Documents per embedding batch during a rebuild
    pub rebuild_batch_size: usize,
}

impl Default for InvalidationSettings {
    fn default() -> Self {
        Self {
            rebuild_batch_size: capdex_domain::constants::DEFAULT_REBUILD_BATCH_SIZE,
        }
    }
}

/// The invalidation & rebuild controller
pub struct InvalidationController {
    registry: Arc<dyn RegistryReader>,
    embedder: Arc<dyn EmbeddingProvider>,
    services_index: Arc<dyn VectorIndexProvider>,
    tools_index: Arc<dyn VectorIndexProvider>,
    response_cache: Arc<ResponseCache>,
    snapshots: Option<Arc<dyn SnapshotStore>>,
    status: Arc<RuntimeStatus>,
    rebuild_lock: Mutex<()>,
    settings: InvalidationSettings,
}

impl InvalidationController {
    /// Wire a controller over the shared runtime pieces
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<dyn RegistryReader>,
        embedder: Arc<dyn EmbeddingProvider>,
        services_index: Arc<dyn VectorIndexProvider>,
        tools_index: Arc<dyn VectorIndexProvider>,
        response_cache: Arc<ResponseCache>,
        snapshots: Option<Arc<dyn SnapshotStore>>,
        status: Arc<RuntimeStatus>,
        settings: InvalidationSettings,
    ) -> Self {
        Self {
            registry,
            embedder,
            services_index,
            tools_index,
            response_cache,
            snapshots,
            status,
            rebuild_lock: Mutex::new(()),
            settings,
        }
    }

    /// Drain events until the bus closes.
    pub async fn run(self: Arc<Self>, mut receiver: broadcast::Receiver<RegistryEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = self.handle_event(event).await {
                        warn!(?event, error = %e, "failed to apply registry event");
                        self.status.record_rebuild_failure(e.to_string());
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "event bus lagged, scheduling full rebuild");
                    if let Err(e) = self.rebuild_all().await {
                        warn!(error = %e, "recovery rebuild failed");
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// Apply one registry mutation to the derived state.
    pub async fn handle_event(&self, event: RegistryEvent) -> Result<()> {
        let _guard = self.rebuild_lock.lock().await;
        let snapshot = self.registry.snapshot();

        match event {
            RegistryEvent::ServiceCreated(id) | RegistryEvent::ServiceUpdated(id) => {
                self.apply_service_change(&snapshot, id).await?;
            }
            RegistryEvent::ServiceDeleted(id) => {
                // Cascade tool removals arrive as their own events
                self.services_index.remove(id).await?;
            }
            RegistryEvent::ToolCreated(id) | RegistryEvent::ToolUpdated(id) => {
                self.apply_tool_change(&snapshot, id).await?;
            }
            RegistryEvent::ToolDeleted(id) => {
                self.tools_index.remove(id).await?;
            }
            RegistryEvent::PolicyChanged(_) => {
                // Indexes are unaffected; cached responses are not
            }
        }

        self.response_cache.invalidate_all();
        Ok(())
    }

    async fn apply_service_change(&self, snapshot: &RegistrySnapshot, id: i64) -> Result<()> {
        match snapshot.service_bundle(id) {
            Some(bundle) if bundle.service.is_indexable() => {
                let document = service_document(&bundle);
                let embedding = self.embedder.embed(&document).await?;
                self.services_index.update(id, embedding.vector).await?;

                // Tool documents carry the service name, so they move with it
                for tool in &bundle.tools {
                    let doc = tool_document(tool, &bundle.service.name);
                    let embedding = self.embedder.embed(&doc).await?;
                    self.tools_index.update(tool.id, embedding.vector).await?;
                }
            }
            Some(bundle) => {
                self.services_index.remove(id).await?;
                for tool in &bundle.tools {
                    self.tools_index.remove(tool.id).await?;
                }
            }
            None => {
                self.services_index.remove(id).await?;
            }
        }
        Ok(())
    }

    async fn apply_tool_change(&self, snapshot: &RegistrySnapshot, id: i64) -> Result<()> {
        match snapshot.tool_bundle(id) {
            Some(bundle) if bundle.tool.is_active && bundle.service.service.is_indexable() => {
                let doc = tool_document(&bundle.tool, &bundle.service.service.name);
                let embedding = self.embedder.embed(&doc).await?;
                self.tools_index.update(id, embedding.vector).await?;
            }
            _ => {
                self.tools_index.remove(id).await?;
            }
        }
        Ok(())
    }

    /// Stream the registry through the embedder and atomically replace both
    /// indexes, persisting snapshots on success.
    pub async fn rebuild_all(&self) -> Result<()> {
        let _guard = self.rebuild_lock.lock().await;
        let snapshot = self.registry.snapshot();

        let result = self.rebuild_indexes(&snapshot).await;
        match result {
            Ok((services, tools)) => {
                info!(
                    services = services.meta.vector_count,
                    tools = tools.meta.vector_count,
                    "index rebuild complete"
                );
                if let Some(store) = &self.snapshots {
                    if let Err(e) = store.save(SERVICES_INDEX, &services).await {
                        warn!(error = %e, "failed to persist services snapshot");
                    }
                    if let Err(e) = store.save(TOOLS_INDEX, &tools).await {
                        warn!(error = %e, "failed to persist tools snapshot");
                    }
                }
                self.status.record_rebuild_success(Utc::now());
                self.response_cache.invalidate_all();
                Ok(())
            }
            Err(e) => {
                self.status.record_rebuild_failure(e.to_string());
                Err(e)
            }
        }
    }

    async fn rebuild_indexes(
        &self,
        snapshot: &RegistrySnapshot,
    ) -> Result<(IndexSnapshot, IndexSnapshot)> {
        let model = self.embedder.model_id().to_string();
        let dimension = self.embedder.dimensions();

        let service_bundles = snapshot.indexable_service_bundles();
        let service_ids: Vec<i64> = service_bundles.iter().map(|b| b.service.id).collect();
        let service_docs: Vec<String> = service_bundles.iter().map(service_document).collect();
        let service_vectors = self.embed_all(&service_docs).await?;
        let services_snapshot = IndexSnapshot::assemble(
            &model,
            dimension,
            service_ids,
            service_vectors,
            Utc::now(),
        );

        let tool_bundles = snapshot.indexable_tool_bundles();
        let tool_ids: Vec<i64> = tool_bundles.iter().map(|b| b.tool.id).collect();
        let tool_docs: Vec<String> = tool_bundles
            .iter()
            .map(|b| tool_document(&b.tool, &b.service.service.name))
            .collect();
        let tool_vectors = self.embed_all(&tool_docs).await?;
        let tools_snapshot =
            IndexSnapshot::assemble(&model, dimension, tool_ids, tool_vectors, Utc::now());

        // Staged data swaps in atomically; readers see old or new, never
        // partial.
        self.services_index
            .import_snapshot(services_snapshot.clone())
            .await?;
        self.tools_index
            .import_snapshot(tools_snapshot.clone())
            .await?;
        Ok((services_snapshot, tools_snapshot))
    }

    async fn embed_all(&self, documents: &[String]) -> Result<Vec<f32>> {
        let dimension = self.embedder.dimensions();
        let mut out = Vec::with_capacity(documents.len() * dimension);
        for chunk in documents.chunks(self.settings.rebuild_batch_size.max(1)) {
            let embeddings = self.embedder.embed_batch(chunk).await?;
            if embeddings.len() != chunk.len() {
                return Err(Error::embedding(
                    "embedding batch returned wrong number of vectors",
                ));
            }
            for embedding in embeddings {
                out.extend_from_slice(&embedding.vector);
            }
        }
        Ok(out)
    }

    /// Load both indexes from persisted snapshots; `Ok(false)` means at
    /// least one snapshot was missing or unusable and a rebuild is needed.
    pub async fn restore_from_snapshots(&self) -> Result<bool> {
        let Some(store) = &self.snapshots else {
            return Ok(false);
        };
        let model = self.embedder.model_id().to_string();
        let dimension = self.embedder.dimensions();

        let services = match store.load(SERVICES_INDEX, &model, dimension).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return Ok(false),
            Err(e) => {
                warn!(error = %e, "services snapshot rejected");
                return Ok(false);
            }
        };
        let tools = match store.load(TOOLS_INDEX, &model, dimension).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return Ok(false),
            Err(e) => {
                warn!(error = %e, "tools snapshot rejected");
                return Ok(false);
            }
        };

        self.services_index.import_snapshot(services).await?;
        self.tools_index.import_snapshot(tools).await?;
        self.status.record_rebuild_success(Utc::now());
        Ok(true)
    }
}
