use {
    chrono::{DateTime, Utc},
    listing_core::FilterSet,
    sqlx::{types::Json, PgConnection},
};

/// One row in the `saved_searches` table, grounded on `SavedSearch` from the
/// original `findmycar` schema (query + filters a user wants re-run on a
/// schedule, with optional notification).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SavedSearchRow {
    pub id: i64,
    pub owner_token: String,
    pub name: String,
    pub query: String,
    pub filters: Json<FilterSet>,
    pub notification_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub last_run_at: Option<DateTime<Utc>>,
}

pub async fn insert(
    ex: &mut PgConnection,
    owner_token: &str,
    name: &str,
    query: &str,
    filters: &FilterSet,
    notification_enabled: bool,
) -> Result<i64, sqlx::Error> {
    const QUERY: &str = r#"
INSERT INTO saved_searches (owner_token, name, query, filters, notification_enabled, created_at)
VALUES ($1, $2, $3, $4, $5, now())
RETURNING id
    "#;
    sqlx::query_scalar(QUERY)
        .bind(owner_token)
        .bind(name)
        .bind(query)
        .bind(Json(filters))
        .bind(notification_enabled)
        .fetch_one(ex)
        .await
}

pub async fn list_for_owner(
    ex: &mut PgConnection,
    owner_token: &str,
) -> Result<Vec<SavedSearchRow>, sqlx::Error> {
    const QUERY: &str = "SELECT * FROM saved_searches WHERE owner_token = $1 ORDER BY created_at DESC";
    sqlx::query_as(QUERY).bind(owner_token).fetch_all(ex).await
}

/// Saved searches with notifications enabled that haven't been re-run
/// since `since`, candidates for the next notification sweep.
pub async fn due_for_notification(
    ex: &mut PgConnection,
    since: DateTime<Utc>,
) -> Result<Vec<SavedSearchRow>, sqlx::Error> {
    const QUERY: &str = r#"
SELECT * FROM saved_searches
WHERE notification_enabled = true
  AND (last_run_at IS NULL OR last_run_at < $1)
    "#;
    sqlx::query_as(QUERY).bind(since).fetch_all(ex).await
}

pub async fn mark_run(ex: &mut PgConnection, id: i64, at: DateTime<Utc>) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE saved_searches SET last_run_at = $2 WHERE id = $1")
        .bind(id)
        .bind(at)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn delete(ex: &mut PgConnection, id: i64, owner_token: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM saved_searches WHERE id = $1 AND owner_token = $2")
        .bind(id)
        .bind(owner_token)
        .execute(ex)
        .await?;
    Ok(result.rows_affected() > 0)
}
