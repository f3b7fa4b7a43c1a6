use qa_core::model::{SessionDraft, SessionId, TestSession};
use sqlx::Row;
use tracing::debug;

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_session_row, ser, session_id_from_i64, state_to_columns};
use crate::repository::{SessionRepository, StorageError};

impl SqliteRepository {
    async fn item_keywords(&self, session_id: i64) -> Result<Vec<String>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT keyword FROM test_items
            WHERE session_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("keyword").map_err(ser))
            .collect()
    }
}

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn create_session(&self, draft: &SessionDraft) -> Result<TestSession, StorageError> {
        let (stage, item_index, attempt_number) =
            state_to_columns(qa_core::workflow::WorkflowState::START)?;

        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query(
            r"
            INSERT INTO test_sessions (
                tester_name, tester_email, language, stage, item_index, attempt_number,
                created_at, completed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL)
            ",
        )
        .bind(draft.tester.name().to_owned())
        .bind(draft.tester.email().to_owned())
        .bind(draft.language.name())
        .bind(stage)
        .bind(item_index)
        .bind(attempt_number)
        .bind(draft.created_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;
        let session_id = res.last_insert_rowid();

        for item in draft.items.iter() {
            let position = i64::try_from(item.position())
                .map_err(|_| StorageError::Serialization("position overflow".into()))?;
            sqlx::query(
                r"
                INSERT INTO test_items (session_id, position, keyword)
                VALUES (?1, ?2, ?3)
                ",
            )
            .bind(session_id)
            .bind(position)
            .bind(item.keyword().to_owned())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        debug!(session_id, items = draft.items.len(), "session created");

        Ok(draft.clone().into_session(session_id_from_i64(session_id)?))
    }

    async fn get_session(&self, id: SessionId) -> Result<TestSession, StorageError> {
        let session_id = id_i64("session_id", id.value())?;
        let row = sqlx::query(
            r"
            SELECT id, tester_name, tester_email, language, stage, item_index, attempt_number,
                created_at, completed_at
            FROM test_sessions WHERE id = ?1
            ",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        let keywords = self.item_keywords(session_id).await?;
        map_session_row(&row, keywords)
    }

    async fn save_progress(&self, session: &TestSession) -> Result<(), StorageError> {
        let (stage, item_index, attempt_number) = state_to_columns(session.state())?;
        let res = sqlx::query(
            r"
            UPDATE test_sessions
            SET stage = ?2, item_index = ?3, attempt_number = ?4, completed_at = ?5
            WHERE id = ?1
            ",
        )
        .bind(id_i64("session_id", session.id().value())?)
        .bind(stage)
        .bind(item_index)
        .bind(attempt_number)
        .bind(session.completed_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn list_sessions(&self, limit: u32) -> Result<Vec<TestSession>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, tester_name, tester_email, language, stage, item_index, attempt_number,
                created_at, completed_at
            FROM test_sessions
            ORDER BY created_at DESC, id DESC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            let session_id: i64 = row.try_get("id").map_err(ser)?;
            let keywords = self.item_keywords(session_id).await?;
            sessions.push(map_session_row(&row, keywords)?);
        }
        Ok(sessions)
    }
}
