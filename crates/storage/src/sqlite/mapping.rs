use qa_core::model::{
    Attempt, AttemptNumber, ItemList, Language, SessionId, TestSession, Tester,
};
use qa_core::workflow::WorkflowState;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn session_id_from_i64(v: i64) -> Result<SessionId, StorageError> {
    u64::try_from(v)
        .map(SessionId::new)
        .map_err(|_| StorageError::Serialization("session_id sign overflow".into()))
}

pub(crate) fn attempt_number_from_i64(v: i64) -> Result<AttemptNumber, StorageError> {
    let raw = u8::try_from(v)
        .map_err(|_| StorageError::Serialization(format!("invalid attempt_number: {v}")))?;
    AttemptNumber::new(raw).map_err(ser)
}

/// Column triple `(stage, item_index, attempt_number)` for a workflow state.
pub(crate) fn state_to_columns(
    state: WorkflowState,
) -> Result<(&'static str, Option<i64>, Option<i64>), StorageError> {
    let cursor = match state.cursor() {
        Some((item_index, attempt)) => {
            let index = i64::try_from(item_index)
                .map_err(|_| StorageError::Serialization("item_index overflow".into()))?;
            (Some(index), Some(i64::from(attempt.value())))
        }
        None => (None, None),
    };
    Ok((state.stage(), cursor.0, cursor.1))
}

pub(crate) fn state_from_columns(
    stage: &str,
    item_index: Option<i64>,
    attempt_number: Option<i64>,
) -> Result<WorkflowState, StorageError> {
    match (stage, item_index, attempt_number) {
        ("awaiting_items", _, _) => Ok(WorkflowState::AwaitingItems),
        ("complete", _, _) => Ok(WorkflowState::Complete),
        ("in_progress", Some(index), Some(number)) => Ok(WorkflowState::InProgress {
            item_index: usize::try_from(index)
                .map_err(|_| StorageError::Serialization(format!("invalid item_index: {index}")))?,
            attempt: attempt_number_from_i64(number)?,
        }),
        ("in_progress", _, _) => Err(StorageError::Serialization(
            "in_progress session without a cursor".into(),
        )),
        (other, _, _) => Err(StorageError::Serialization(format!("invalid stage: {other}"))),
    }
}

/// Build a session from its `test_sessions` row and its keywords in position order.
pub(crate) fn map_session_row(
    row: &SqliteRow,
    keywords: Vec<String>,
) -> Result<TestSession, StorageError> {
    let tester = Tester::new(
        row.try_get::<String, _>("tester_name").map_err(ser)?,
        row.try_get::<String, _>("tester_email").map_err(ser)?,
    )
    .map_err(ser)?;
    let language: Language = row
        .try_get::<String, _>("language")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let items = ItemList::from_keywords(keywords).map_err(ser)?;
    let stage: String = row.try_get("stage").map_err(ser)?;
    let state = state_from_columns(
        &stage,
        row.try_get("item_index").map_err(ser)?,
        row.try_get("attempt_number").map_err(ser)?,
    )?;

    TestSession::from_persisted(
        session_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        tester,
        language,
        items,
        state,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<Attempt, StorageError> {
    Ok(Attempt::from_persisted(
        row.try_get("item").map_err(ser)?,
        attempt_number_from_i64(row.try_get::<i64, _>("attempt_number").map_err(ser)?)?,
        row.try_get("transcript").map_err(ser)?,
        row.try_get::<i64, _>("matched").map_err(ser)? != 0,
        row.try_get("recorded_at").map_err(ser)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_columns_round_trip() {
        let states = [
            WorkflowState::AwaitingItems,
            WorkflowState::InProgress {
                item_index: 3,
                attempt: AttemptNumber::new(4).unwrap(),
            },
            WorkflowState::Complete,
        ];
        for state in states {
            let (stage, index, number) = state_to_columns(state).unwrap();
            assert_eq!(state_from_columns(stage, index, number).unwrap(), state);
        }
    }

    #[test]
    fn rejects_corrupt_state_columns() {
        assert!(state_from_columns("in_progress", Some(0), None).is_err());
        assert!(state_from_columns("in_progress", Some(0), Some(6)).is_err());
        assert!(state_from_columns("paused", None, None).is_err());
    }
}
