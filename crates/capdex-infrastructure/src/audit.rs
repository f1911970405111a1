//! Buffered audit writer
//!
//! Audit and usage records are fire-and-forget from the request's
//! perspective: `push` never blocks and survives request cancellation. The
//! queue is bounded; overflow drops the oldest record and increments a
//! counter that shows up in logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tracing::info;

/// One api-request record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Request correlation id
    pub request_id: String,
    /// Caller bucket key, or "anonymous"
    pub caller: String,
    /// Endpoint path
    pub endpoint: String,
    /// Admission outcome (admitted, rejected_auth, rejected_rate_limit, ...)
    pub outcome: String,
    /// HTTP status returned
    pub status: u16,
    /// When the request was handled
    pub timestamp: DateTime<Utc>,
}

struct Shared {
    queue: Mutex<VecDeque<AuditRecord>>,
    notify: Notify,
    dropped: AtomicU64,
    capacity: usize,
}

/// Handle for pushing audit records; cheap to clone
#[derive(Clone)]
pub struct AuditWriter {
    shared: Arc<Shared>,
}

impl AuditWriter {
    /// Create a writer and spawn its drain task
    pub fn spawn(capacity: usize) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
            capacity: capacity.max(1),
        });

        let drain = shared.clone();
        tokio::spawn(async move {
            loop {
                let batch: Vec<AuditRecord> = {
                    let Ok(mut queue) = drain.queue.lock() else {
                        break;
                    };
                    queue.drain(..).collect()
                };
                for record in batch {
                    // The audit sink is the structured log; a shipping
                    // deployment points a collector at this target.
                    info!(
                        target: "capdex::audit",
                        request_id = %record.request_id,
                        caller = %record.caller,
                        endpoint = %record.endpoint,
                        outcome = %record.outcome,
                        status = record.status,
                        "api_request"
                    );
                }
                drain.notify.notified().await;
            }
        });

        Self { shared }
    }

    /// Enqueue a record without blocking; overflow drops the oldest
    pub fn push(&self, record: AuditRecord) {
        if let Ok(mut queue) = self.shared.queue.lock() {
            if queue.len() >= self.shared.capacity {
                queue.pop_front();
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            }
            queue.push_back(record);
        }
        self.shared.notify.notify_one();
    }

    /// Records dropped to overflow since startup
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Records currently queued (test hook)
    pub fn queued(&self) -> usize {
        self.shared.queue.lock().map(|q| q.len()).unwrap_or(0)
    }
}

impl AuditRecord {
    /// Convenience constructor stamped with the current time
    pub fn new(
        request_id: impl Into<String>,
        caller: impl Into<String>,
        endpoint: impl Into<String>,
        outcome: impl Into<String>,
        status: u16,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            caller: caller.into(),
            endpoint: endpoint.into(),
            outcome: outcome.into(),
            status,
            timestamp: Utc::now(),
        }
    }
}
