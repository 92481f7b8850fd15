//! Postgres tally table: `id TEXT PRIMARY KEY, votes BIGINT NOT NULL DEFAULT 0`.
//! The table is provisioned and seeded out of band.

use std::time::Duration;
use shared::models::{OptionId, OptionRecord};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use tracing::debug;
use super::{Page, PageToken, StoreError, TallyStore, UnknownOptionPolicy};
use super::memory::DEFAULT_PAGE_SIZE;

const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Table names are spliced into SQL text, so only plain identifiers are accepted.
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else { return false };
    name.len() <= MAX_IDENTIFIER_LENGTH
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
    table_name: String,
    page_size: i64,
}

impl PostgresStore {
    pub fn new(pool: PgPool, table_name: impl Into<String>) -> Result<Self, StoreError> {
        let table_name = table_name.into();
        if !is_plain_identifier(&table_name) {
            return Err(StoreError::Unavailable(format!("invalid table name {table_name:?}")));
        }
        Ok(Self {
            pool,
            table_name,
            page_size: DEFAULT_PAGE_SIZE as i64,
        })
    }

    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
        table_name: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .map_err(classify)?;
        Self::new(pool, table_name)
    }

    pub fn with_page_size(mut self, page_size: Option<usize>) -> Self {
        if let Some(size) = page_size {
            self.page_size = i64::try_from(size.max(1)).unwrap_or(i64::MAX - 1);
        }
        self
    }
}

#[rocket::async_trait]
impl TallyStore for PostgresStore {
    async fn increment(&self, id: &OptionId, policy: UnknownOptionPolicy) -> Result<(), StoreError> {
        let table = &self.table_name;
        let sql = match policy {
            UnknownOptionPolicy::Create => format!(
                "INSERT INTO {table} (id, votes) VALUES ($1, 1)
                 ON CONFLICT (id) DO UPDATE SET votes = {table}.votes + 1"
            ),
            UnknownOptionPolicy::Reject => format!("UPDATE {table} SET votes = votes + 1 WHERE id = $1"),
        };
        let result = sqlx::query(&sql)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::UnknownOption(id.to_string()));
        }
        debug!(table = %table, option = %id, "incremented tally");
        Ok(())
    }

    async fn scan_page(&self, start: Option<PageToken>) -> Result<Page, StoreError> {
        let table = &self.table_name;
        let sql = format!(
            "SELECT id, votes FROM {table}
             WHERE $1::text IS NULL OR id > $1
             ORDER BY id LIMIT $2"
        );
        let rows = sqlx::query(&sql)
            .bind(start.map(|PageToken(last)| last))
            .bind(self.page_size + 1)
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id").map_err(classify)?;
            let votes: Option<i64> = row.try_get("votes").map_err(classify)?;
            let votes = u64::try_from(votes.unwrap_or(0))
                .map_err(|_| StoreError::Malformed(format!("negative tally for {id}")))?;
            records.push(OptionRecord::new(id, votes));
        }

        let next = if records.len() as i64 > self.page_size {
            records.truncate(self.page_size as usize);
            records.last().map(|record| PageToken(record.id.clone()))
        } else {
            None
        };

        debug!(table = %table, count = records.len(), more = next.is_some(), "scanned page");
        Ok(Page { records, next })
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            Some("42501") => return StoreError::PermissionDenied(db.message().to_owned()),
            Some("53300") | Some("53400") => return StoreError::Throttled(db.message().to_owned()),
            _ => {}
        }
    }
    StoreError::Unavailable(err.to_string())
}
