//! The tally store seam.
//!
//! Every backend exposes exactly two primitives: an atomic increment of a single
//! counter and a paged scan. Nothing above this module ever reads a tally and
//! writes it back.

pub mod dynamodb;
pub mod memory;
pub mod postgres;

use futures::stream::{self, Stream, TryStreamExt};
use serde::{Deserialize, Serialize};
use shared::models::{OptionId, OptionRecord};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use crate::config::{Backend, Config, ConfigError};

pub use dynamodb::DynamoStore;
pub use memory::MemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("option {0} does not exist")]
    UnknownOption(String),
    #[error("store request throttled: {0}")]
    Throttled(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// What to do with a vote for an id that has no record yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownOptionPolicy {
    /// Upsert a record with a tally of one.
    #[default]
    Create,
    /// Fail with [`StoreError::UnknownOption`] and leave the table untouched.
    Reject,
}

/// Opaque continuation point of a scan: the last option id already returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageToken(pub String);

#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<OptionRecord>,
    pub next: Option<PageToken>,
}

#[rocket::async_trait]
pub trait TallyStore: Send + Sync {
    /// Adds one to the tally of `id` in a single store-side operation.
    async fn increment(&self, id: &OptionId, policy: UnknownOptionPolicy) -> Result<(), StoreError>;

    /// Returns one page of records starting after `start`.
    async fn scan_page(&self, start: Option<PageToken>) -> Result<Page, StoreError>;

    fn name(&self) -> &'static str;
}

pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| StoreError::Timeout(limit))?
}

enum ScanState {
    Start,
    Next(PageToken),
    Done,
}

/// Lazily walks every page of the store. Each page is fetched only when the
/// previous one has been drained, and each fetch is bounded by `limit`. The
/// stream ends after the first error.
pub fn scan_all(
    store: Arc<dyn TallyStore>,
    limit: Duration,
) -> impl Stream<Item = Result<OptionRecord, StoreError>> + Send {
    stream::try_unfold(ScanState::Start, move |state| {
        let store = Arc::clone(&store);
        async move {
            let start = match state {
                ScanState::Start => None,
                ScanState::Next(token) => Some(token),
                ScanState::Done => return Ok(None),
            };
            let page = with_timeout(limit, store.scan_page(start)).await?;
            let next = match page.next {
                Some(token) => ScanState::Next(token),
                None => ScanState::Done,
            };
            let records = stream::iter(page.records.into_iter().map(Ok::<_, StoreError>));
            Ok::<_, StoreError>(Some((records, next)))
        }
    })
    .try_flatten()
}

/// Connects the backend selected by `config`. Called once at start; the handle
/// is then shared by every handler.
pub async fn open(config: &Config) -> Result<Arc<dyn TallyStore>, StoreError> {
    let startup = |e: ConfigError| StoreError::Unavailable(e.to_string());
    let store: Arc<dyn TallyStore> = match config.backend {
        Backend::Dynamodb => {
            let table = config.require_table_name().map_err(startup)?;
            let client = dynamodb::create_client(config.aws_region.clone(), config.endpoint_url.clone()).await;
            Arc::new(DynamoStore::new(client, table, &config.key_attribute).with_page_size(config.page_size))
        }
        Backend::Postgres => {
            let table = config.require_table_name().map_err(startup)?;
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| startup(ConfigError::MissingDatabaseUrl))?;
            let store = PostgresStore::connect(url, config.max_connections, config.store_timeout(), table).await?;
            Arc::new(store.with_page_size(config.page_size))
        }
        Backend::Memory => {
            let store = MemoryStore::with_page_size(config.page_size.unwrap_or(memory::DEFAULT_PAGE_SIZE));
            store.seed(config.seed_options.iter().cloned())?;
            Arc::new(store)
        }
    };
    info!(backend = store.name(), "tally store ready");
    Ok(store)
}
