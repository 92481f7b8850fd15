use std::sync::Arc;
use std::time::Duration;
use futures::{Stream, TryStreamExt};
use shared::{models::{OptionId, OptionRecord, VoteRequest}, validation::validate_vote_request};
use tracing::debug;
use crate::error::ApiError;
use crate::store::{scan_all, with_timeout, StoreError, TallyStore, UnknownOptionPolicy};

/// Casts votes: one validated id in, one store-side increment out.
#[derive(Clone)]
pub struct VoteRecorder {
    store: Arc<dyn TallyStore>,
    policy: UnknownOptionPolicy,
    timeout: Duration,
}

impl VoteRecorder {
    pub fn new(store: Arc<dyn TallyStore>, policy: UnknownOptionPolicy, timeout: Duration) -> Self {
        Self { store, policy, timeout }
    }

    /// Validation failures return before the store is touched. Store failures
    /// are reported as-is; nothing is retried.
    pub async fn record(&self, request: &VoteRequest) -> Result<OptionId, ApiError> {
        let id = validate_vote_request(request)?;
        self.record_id(&id).await?;
        Ok(id)
    }

    pub async fn record_id(&self, id: &OptionId) -> Result<(), StoreError> {
        debug!(option = %id, store = self.store.name(), "incrementing tally");
        with_timeout(self.timeout, self.store.increment(id, self.policy)).await
    }
}

/// Lists every option with its tally, following store pagination to the end.
#[derive(Clone)]
pub struct OptionLister {
    store: Arc<dyn TallyStore>,
    timeout: Duration,
}

impl OptionLister {
    pub fn new(store: Arc<dyn TallyStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// A fresh pass over the table. Calling this again restarts from the first page.
    pub fn records(&self) -> impl Stream<Item = Result<OptionRecord, StoreError>> + Send {
        scan_all(Arc::clone(&self.store), self.timeout)
    }

    /// All pages concatenated, or the first error. Never a partial result.
    pub async fn list(&self) -> Result<Vec<OptionRecord>, StoreError> {
        self.records().try_collect().await
    }
}
