use qa_core::model::{Attempt, SessionId};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_attempt_row};
use crate::repository::{AttemptRepository, StorageError};

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn upsert_attempt(
        &self,
        session_id: SessionId,
        attempt: &Attempt,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO attempts (
                session_id, item, attempt_number, transcript, matched, recorded_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(session_id, item, attempt_number) DO UPDATE SET
                transcript = excluded.transcript,
                matched = excluded.matched,
                recorded_at = excluded.recorded_at
            ",
        )
        .bind(id_i64("session_id", session_id.value())?)
        .bind(attempt.item.clone())
        .bind(i64::from(attempt.number.value()))
        .bind(attempt.transcript.clone())
        .bind(i64::from(attempt.matched))
        .bind(attempt.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_foreign_key_violation() => StorageError::NotFound,
            _ => conn(e),
        })?;

        Ok(())
    }

    async fn list_attempts(&self, session_id: SessionId) -> Result<Vec<Attempt>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT a.item, a.attempt_number, a.transcript, a.matched, a.recorded_at
            FROM attempts a
            JOIN test_items i ON i.session_id = a.session_id AND i.keyword = a.item
            WHERE a.session_id = ?1
            ORDER BY i.position ASC, a.attempt_number ASC
            ",
        )
        .bind(id_i64("session_id", session_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_attempt_row).collect()
    }
}
