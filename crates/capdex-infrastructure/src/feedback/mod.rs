//! In-memory feedback store
//!
//! Append-only, capacity-bounded log of searches and selections. Selection
//! writes are validated against the recorded search: unknown ids,
//! out-of-range positions and mismatched targets are rejected, which is
//! what keeps the feedback signal honest.

use async_trait::async_trait;
use capdex_domain::entities::feedback::{SearchQueryRecord, UserSelectionRecord};
use capdex_domain::error::{Error, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::RwLock;

/// In-memory append-only feedback store
pub struct InMemoryFeedbackStore {
    searches: RwLock<VecDeque<SearchQueryRecord>>,
    by_id: DashMap<String, SearchQueryRecord>,
    selections: RwLock<Vec<UserSelectionRecord>>,
    capacity: usize,
}

impl InMemoryFeedbackStore {
    /// Create a store retaining at most `capacity` search records
    pub fn new(capacity: usize) -> Self {
        Self {
            searches: RwLock::new(VecDeque::new()),
            by_id: DashMap::new(),
            selections: RwLock::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }
}

impl Default for InMemoryFeedbackStore {
    fn default() -> Self {
        Self::new(100_000)
    }
}

#[async_trait]
impl capdex_domain::ports::FeedbackStore for InMemoryFeedbackStore {
    async fn log_search(&self, record: SearchQueryRecord) -> Result<()> {
        if self.by_id.contains_key(&record.search_id) {
            return Err(Error::validation(format!(
                "duplicate search id '{}'",
                record.search_id
            )));
        }
        let mut searches = self
            .searches
            .write()
            .map_err(|_| Error::internal("feedback store lock poisoned"))?;
        if searches.len() >= self.capacity {
            if let Some(evicted) = searches.pop_front() {
                self.by_id.remove(&evicted.search_id);
            }
        }
        self.by_id.insert(record.search_id.clone(), record.clone());
        searches.push_back(record);
        Ok(())
    }

    async fn log_selection(
        &self,
        search_id: &str,
        position: usize,
        selected_id: i64,
        caller: &str,
        satisfied: Option<bool>,
    ) -> Result<UserSelectionRecord> {
        let search = self
            .by_id
            .get(search_id)
            .ok_or_else(|| Error::validation(format!("unknown search id '{search_id}'")))?;

        if position == 0 || position > search.returned.len() {
            return Err(Error::validation(format!(
                "position {position} is out of range for search '{search_id}' \
                 with {} results",
                search.returned.len()
            )));
        }
        let target = search.returned[position - 1];
        if !target.matches(selected_id) {
            return Err(Error::validation(format!(
                "id {selected_id} was not returned at position {position}"
            )));
        }

        let record = UserSelectionRecord {
            search_id: search_id.to_string(),
            position,
            target,
            selected_id,
            caller: caller.to_string(),
            satisfied,
            timestamp: Utc::now(),
        };
        drop(search);

        self.selections
            .write()
            .map_err(|_| Error::internal("feedback store lock poisoned"))?
            .push(record.clone());
        Ok(record)
    }

    async fn searches_since(&self, since: DateTime<Utc>) -> Result<Vec<SearchQueryRecord>> {
        Ok(self
            .searches
            .read()
            .map_err(|_| Error::internal("feedback store lock poisoned"))?
            .iter()
            .filter(|r| r.timestamp >= since)
            .cloned()
            .collect())
    }

    async fn selections_since(&self, since: DateTime<Utc>) -> Result<Vec<UserSelectionRecord>> {
        Ok(self
            .selections
            .read()
            .map_err(|_| Error::internal("feedback store lock poisoned"))?
            .iter()
            .filter(|r| r.timestamp >= since)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capdex_domain::entities::feedback::ReturnedTarget;
    use capdex_domain::ports::FeedbackStore;
    use chrono::Duration;

    fn search_record(id: &str) -> SearchQueryRecord {
        SearchQueryRecord {
            search_id: id.to_string(),
            query: "q".into(),
            normalized_query_hash: "h".into(),
            caller: "user:1".into(),
            mode: "tools_only".into(),
            verbosity: "full".into(),
            returned: vec![ReturnedTarget::tool(3, 10), ReturnedTarget::service(4)],
            response_time_ms: 3,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn selection_must_match_recorded_position() {
        let store = InMemoryFeedbackStore::default();
        store.log_search(search_record("s1")).await.unwrap();

        // Tool id and owning service id both match at position 1
        assert!(store
            .log_selection("s1", 1, 10, "user:1", None)
            .await
            .is_ok());
        assert!(store
            .log_selection("s1", 1, 3, "user:1", None)
            .await
            .is_ok());

        // Wrong id, wrong position, unknown search
        assert!(store
            .log_selection("s1", 1, 4, "user:1", None)
            .await
            .is_err());
        assert!(store
            .log_selection("s1", 3, 10, "user:1", None)
            .await
            .is_err());
        assert!(store
            .log_selection("s1", 0, 10, "user:1", None)
            .await
            .is_err());
        assert!(store
            .log_selection("nope", 1, 10, "user:1", None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn duplicate_search_ids_are_rejected() {
        let store = InMemoryFeedbackStore::default();
        store.log_search(search_record("s1")).await.unwrap();
        assert!(store.log_search(search_record("s1")).await.is_err());
    }

    #[tokio::test]
    async fn capacity_evicts_oldest() {
        let store = InMemoryFeedbackStore::new(2);
        store.log_search(search_record("s1")).await.unwrap();
        store.log_search(search_record("s2")).await.unwrap();
        store.log_search(search_record("s3")).await.unwrap();

        assert!(store
            .log_selection("s1", 1, 10, "user:1", None)
            .await
            .is_err());
        assert!(store
            .log_selection("s3", 1, 10, "user:1", None)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn window_queries_filter_by_time() {
        let store = InMemoryFeedbackStore::default();
        store.log_search(search_record("s1")).await.unwrap();

        let recent = store
            .searches_since(Utc::now() - Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);

        let future = store
            .searches_since(Utc::now() + Duration::minutes(1))
            .await
            .unwrap();
        assert!(future.is_empty());
    }
}
