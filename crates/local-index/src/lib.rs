//! Persistent normalized listing store.
//!
//! Backed by Postgres via the `database` crate's per-table accessors. The
//! index is a first-class "source" in the dispatch set with kind=local and
//! no rate limit or breaker — see `dispatch::LocalIndexAdapter` for the
//! `SourceAdapter` wrapper around this type.

use {
    chrono::{DateTime, Utc},
    listing_core::{FilterSet, Listing},
    sqlx::PgPool,
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct LocalIndex {
    pool: PgPool,
}

/// A page of results from the local index, mirroring the shape the
/// Aggregator Orchestrator needs at step 4 of `Search`.
pub struct IndexPage {
    pub listings: Vec<Listing>,
    pub total: i64,
}

impl LocalIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upserts a listing by `(source, source_listing_id)`. Idempotent:
    /// repeated upserts of an unchanged listing leave the row unchanged
    /// apart from `updated_at`/`last_seen_at`.
    pub async fn upsert(&self, listing: Listing) -> Result<(), IndexError> {
        let row: database::listings::ListingRow = listing.into();
        let mut conn = self.pool.acquire().await?;
        database::listings::upsert(&mut conn, &row).await?;
        Ok(())
    }

    pub async fn get(&self, source: &str, source_listing_id: &str) -> Result<Option<Listing>, IndexError> {
        let mut conn = self.pool.acquire().await?;
        let row = database::listings::read(&mut conn, source, source_listing_id).await?;
        Ok(row.map(Into::into))
    }

    /// Reads by the stable synthetic id (`Listing::id`), used when the Local
    /// Index itself acts as a dispatch-set adapter (kind=local).
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Listing>, IndexError> {
        let mut conn = self.pool.acquire().await?;
        let row = database::listings::read_by_id(&mut conn, id).await?;
        Ok(row.map(Into::into))
    }

    /// Runs the conjunctive filtered query, returning a
    /// page plus the total active-listing count (used to decide whether
    /// live dispatch is needed at step 5 of `Search`). `free_text` is the
    /// pre-processor's residual query, matched against title/description.
    pub async fn query(
        &self,
        filters: &FilterSet,
        free_text: Option<&str>,
        page: i64,
        per_page: i64,
    ) -> Result<IndexPage, IndexError> {
        let mut conn = self.pool.acquire().await?;
        let rows = database::listings::query_filtered(&mut conn, filters, free_text, page, per_page).await?;
        let total = database::listings::count_active(&mut conn).await?;
        Ok(IndexPage {
            listings: rows.into_iter().map(Into::into).collect(),
            total,
        })
    }

    pub async fn count_active(&self) -> Result<i64, IndexError> {
        let mut conn = self.pool.acquire().await?;
        Ok(database::listings::count_active(&mut conn).await?)
    }

    pub async fn mark_inactive(&self, source: &str, source_listing_id: &str) -> Result<(), IndexError> {
        let mut conn = self.pool.acquire().await?;
        database::listings::mark_inactive(&mut conn, source, source_listing_id).await?;
        Ok(())
    }

    /// Deactivates listings unseen since `retention` has elapsed, for
    /// `cleanup_expired_data`.
    pub async fn mark_stale_inactive(&self, older_than: DateTime<Utc>) -> Result<u64, IndexError> {
        let mut conn = self.pool.acquire().await?;
        Ok(database::listings::mark_stale_inactive(&mut conn, older_than).await?)
    }

    /// Active listings whose `last_seen_at` predates `older_than`, the
    /// Freshness Manager's refresh-candidate feed.
    pub async fn iterate_stale(&self, older_than: DateTime<Utc>, limit: i64) -> Result<Vec<Listing>, IndexError> {
        let mut conn = self.pool.acquire().await?;
        let rows = database::listings::iterate_stale(&mut conn, older_than, limit).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Per-tier counts of active listings by freshness, the source data for
    /// `generate_freshness_report`.
    pub async fn freshness_counts(&self, now: DateTime<Utc>) -> Result<database::listings::FreshnessCountsRow, IndexError> {
        let mut conn = self.pool.acquire().await?;
        Ok(database::listings::freshness_counts(&mut conn, now).await?)
    }
}
