use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Mutex, MutexGuard};
use shared::models::{OptionId, OptionRecord};
use tracing::debug;
use super::{Page, PageToken, StoreError, TallyStore, UnknownOptionPolicy};

pub const DEFAULT_PAGE_SIZE: usize = 100;

/// In-process tally table. Increments happen under the lock, so they are as
/// atomic as a store-side `ADD`.
#[derive(Debug)]
pub struct MemoryStore {
    tallies: Mutex<BTreeMap<String, u64>>,
    page_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            tallies: Mutex::new(BTreeMap::new()),
            page_size: page_size.max(1),
        }
    }

    /// Seeds each id with a zero tally. Existing tallies are left alone.
    pub fn seed<I, S>(&self, ids: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tallies = self.lock()?;
        for id in ids {
            tallies.entry(id.into()).or_insert(0);
        }
        Ok(())
    }

    pub fn set_tally(&self, id: impl Into<String>, votes: u64) -> Result<(), StoreError> {
        self.lock()?.insert(id.into(), votes);
        Ok(())
    }

    pub fn tally(&self, id: &str) -> Option<u64> {
        self.lock().ok()?.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|tallies| tallies.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, u64>>, StoreError> {
        self.tallies
            .lock()
            .map_err(|_| StoreError::Unavailable("tally lock poisoned".into()))
    }
}

#[rocket::async_trait]
impl TallyStore for MemoryStore {
    async fn increment(&self, id: &OptionId, policy: UnknownOptionPolicy) -> Result<(), StoreError> {
        let mut tallies = self.lock()?;
        match (tallies.get_mut(id.as_str()), policy) {
            (Some(votes), _) => *votes = votes.saturating_add(1),
            (None, UnknownOptionPolicy::Create) => {
                tallies.insert(id.to_string(), 1);
            }
            (None, UnknownOptionPolicy::Reject) => {
                return Err(StoreError::UnknownOption(id.to_string()));
            }
        }
        Ok(())
    }

    async fn scan_page(&self, start: Option<PageToken>) -> Result<Page, StoreError> {
        let tallies = self.lock()?;
        let lower = match &start {
            Some(PageToken(last)) => Bound::Excluded(last.as_str()),
            None => Bound::Unbounded,
        };

        let mut records: Vec<OptionRecord> = tallies
            .range::<str, _>((lower, Bound::Unbounded))
            .take(self.page_size + 1)
            .map(|(id, votes)| OptionRecord::new(id.clone(), *votes))
            .collect();

        let next = if records.len() > self.page_size {
            records.truncate(self.page_size);
            records.last().map(|record| PageToken(record.id.clone()))
        } else {
            None
        };

        debug!(count = records.len(), more = next.is_some(), "scanned memory page");
        Ok(Page { records, next })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
