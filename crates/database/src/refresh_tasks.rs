use {
    chrono::{DateTime, Utc},
    sqlx::PgConnection,
};

/// One row in the `refresh_tasks` table.
/// Invariant enforced by the Background Refresh Scheduler, not the schema:
/// `retry_count <= max_retries`, dropped once exceeded.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct RefreshTaskRow {
    pub id: i64,
    pub listing_id: String,
    pub source: String,
    pub scheduled_at: DateTime<Utc>,
    pub retry_count: i32,
    pub priority_score: f64,
    pub claimed_at: Option<DateTime<Utc>>,
}

pub async fn enqueue(
    ex: &mut PgConnection,
    listing_id: &str,
    source: &str,
    scheduled_at: DateTime<Utc>,
    priority_score: f64,
) -> Result<i64, sqlx::Error> {
    const QUERY: &str = r#"
INSERT INTO refresh_tasks (listing_id, source, scheduled_at, retry_count, priority_score)
VALUES ($1, $2, $3, 0, $4)
RETURNING id
    "#;
    sqlx::query_scalar(QUERY)
        .bind(listing_id)
        .bind(source)
        .bind(scheduled_at)
        .bind(priority_score)
        .fetch_one(ex)
        .await
}

/// Claims up to `limit` due tasks ordered by descending priority, for a
/// worker with a bounded concurrency limit (default ≤ 8).
/// Claiming stamps `claimed_at` so a crashed worker's tasks can be reclaimed
/// after a timeout by the caller.
pub async fn claim_due(
    ex: &mut PgConnection,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<RefreshTaskRow>, sqlx::Error> {
    const QUERY: &str = r#"
UPDATE refresh_tasks
SET claimed_at = $1
WHERE id IN (
    SELECT id FROM refresh_tasks
    WHERE scheduled_at <= $1 AND claimed_at IS NULL
    ORDER BY priority_score DESC, scheduled_at ASC
    LIMIT $2
    FOR UPDATE SKIP LOCKED
)
RETURNING *
    "#;
    sqlx::query_as(QUERY).bind(now).bind(limit).fetch_all(ex).await
}

/// Task completed successfully (adapter refreshed the listing); the task
/// row is consumed.
pub async fn complete(ex: &mut PgConnection, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM refresh_tasks WHERE id = $1")
        .bind(id)
        .execute(ex)
        .await?;
    Ok(())
}

/// Transient failure: re-enqueue with an incremented retry_count, dropping
/// the task once `max_retries` is exceeded.
pub async fn reschedule_or_drop(
    ex: &mut PgConnection,
    id: i64,
    next_attempt: DateTime<Utc>,
    max_retries: i32,
) -> Result<bool, sqlx::Error> {
    const QUERY: &str = r#"
UPDATE refresh_tasks
SET retry_count = retry_count + 1, scheduled_at = $2, claimed_at = NULL
WHERE id = $1 AND retry_count < $3
RETURNING id
    "#;
    let rescheduled: Option<i64> = sqlx::query_scalar(QUERY)
        .bind(id)
        .bind(next_attempt)
        .bind(max_retries)
        .fetch_optional(&mut *ex)
        .await?;
    if rescheduled.is_none() {
        sqlx::query("DELETE FROM refresh_tasks WHERE id = $1")
            .bind(id)
            .execute(ex)
            .await?;
        return Ok(false);
    }
    Ok(true)
}
