//! Raw `sqlx` accessors for the listing search service's Postgres tables.
//!
//! Design:
//!
//! Functions that execute multiple statements as one unit take
//! `&mut PgTransaction` to make the all-or-nothing boundary explicit.
//! Functions that execute a single statement take `&mut PgConnection`. The
//! parameter is conventionally named `ex` for "executor", the `sqlx` trait
//! whose methods run the query. Callers decide whether a function
//! participates in a larger transaction or runs standalone; `PgTransaction`
//! derefs to `PgConnection`, but callers must call `commit` themselves.

pub mod listings;
pub mod refresh_tasks;
pub mod saved_searches;

use sqlx::Executor;

pub type PgTransaction<'a> = sqlx::Transaction<'a, sqlx::Postgres>;

/// The names of all tables this service owns.
pub const ALL_TABLES: &[&str] = &["listings", "refresh_tasks", "saved_searches"];

/// Deletes all data in the database. Only used by tests.
#[allow(non_snake_case)]
pub async fn clear_DANGER_(ex: &mut PgTransaction<'_>) -> sqlx::Result<()> {
    for table in ALL_TABLES {
        ex.execute(format!("TRUNCATE {table};").as_str()).await?;
    }
    Ok(())
}

/// Like above but more ergonomic for tests that hold a pool rather than an
/// open transaction.
#[allow(non_snake_case)]
pub async fn clear_DANGER(pool: &sqlx::PgPool) -> sqlx::Result<()> {
    let mut transaction = pool.begin().await?;
    clear_DANGER_(&mut transaction).await?;
    transaction.commit().await
}

pub fn is_duplicate_record_error(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use {super::*, sqlx::Connection};

    #[tokio::test]
    #[ignore]
    async fn postgres_clear() {
        let mut con = sqlx::PgConnection::connect("postgresql://").await.unwrap();
        let mut con = con.begin().await.unwrap();
        clear_DANGER_(&mut con).await.unwrap();
    }
}
