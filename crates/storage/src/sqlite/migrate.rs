use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use super::SqliteInitError;

/// Applies pending schema versions in order, each inside its own transaction.
///
/// Version 1 creates sessions, their item lists, and attempt slots.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS test_sessions (
                    id INTEGER PRIMARY KEY,
                    tester_name TEXT NOT NULL,
                    tester_email TEXT NOT NULL,
                    language TEXT NOT NULL,
                    stage TEXT NOT NULL
                        CHECK (stage IN ('awaiting_items', 'in_progress', 'complete')),
                    item_index INTEGER CHECK (item_index >= 0),
                    attempt_number INTEGER CHECK (attempt_number BETWEEN 1 AND 5),
                    created_at TEXT NOT NULL,
                    completed_at TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS test_items (
                    session_id INTEGER NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    keyword TEXT NOT NULL,
                    PRIMARY KEY (session_id, position),
                    UNIQUE (session_id, keyword),
                    FOREIGN KEY (session_id) REFERENCES test_sessions(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS attempts (
                    session_id INTEGER NOT NULL,
                    item TEXT NOT NULL,
                    attempt_number INTEGER NOT NULL CHECK (attempt_number BETWEEN 1 AND 5),
                    transcript TEXT NOT NULL,
                    matched INTEGER NOT NULL CHECK (matched IN (0, 1)),
                    recorded_at TEXT NOT NULL,
                    PRIMARY KEY (session_id, item, attempt_number),
                    FOREIGN KEY (session_id, item)
                        REFERENCES test_items(session_id, keyword) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_test_sessions_created
                    ON test_sessions (created_at, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_attempts_session_recorded
                    ON attempts (session_id, recorded_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(version = 1, "applied schema migration");
    }

    Ok(())
}
