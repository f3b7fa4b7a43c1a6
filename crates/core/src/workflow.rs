//! Test-run state machine.
//!
//! A run moves `AwaitingItems → InProgress(item, attempt) → Complete`. Each item
//! gets up to `MAX_ATTEMPTS` attempts; the tester may end the run at any point.
//! The machine only computes positions; recording attempts is the caller's job.

use serde::Serialize;
use thiserror::Error;

use crate::model::AttemptNumber;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WorkflowError {
    #[error("no usable items in the supplied list")]
    EmptyItemList,
    #[error("workflow has not started")]
    NotStarted,
    #[error("workflow already started")]
    AlreadyStarted,
    #[error("workflow already complete")]
    Completed,
    #[error("item {item_index} attempt {attempt:?} is out of range")]
    OutOfRange {
        item_index: usize,
        attempt: Option<AttemptNumber>,
        redirect: WorkflowState,
    },
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum WorkflowState {
    AwaitingItems,
    InProgress {
        item_index: usize,
        attempt: AttemptNumber,
    },
    Complete,
}

impl WorkflowState {
    pub const START: WorkflowState = WorkflowState::InProgress {
        item_index: 0,
        attempt: AttemptNumber::FIRST,
    };

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, WorkflowState::Complete)
    }

    /// Current `(item_index, attempt)` while in progress.
    #[must_use]
    pub fn cursor(&self) -> Option<(usize, AttemptNumber)> {
        match *self {
            WorkflowState::InProgress {
                item_index,
                attempt,
            } => Some((item_index, attempt)),
            _ => None,
        }
    }

    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            WorkflowState::AwaitingItems => "awaiting_items",
            WorkflowState::InProgress { .. } => "in_progress",
            WorkflowState::Complete => "complete",
        }
    }
}

/// How a submitted slot relates to the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// The slot the tester is expected to fill next; recording it advances.
    Current,
    /// An already-passed slot; recording it overwrites without advancing.
    Passed,
}

//
// ─── MACHINE ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    item_count: usize,
    state: WorkflowState,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new()
    }
}

impl Workflow {
    #[must_use]
    pub fn new() -> Self {
        Self {
            item_count: 0,
            state: WorkflowState::AwaitingItems,
        }
    }

    /// Rebuild a machine from persisted progress.
    ///
    /// A cursor past the end of the list is normalized to `Complete`.
    #[must_use]
    pub fn resume(item_count: usize, state: WorkflowState) -> Self {
        let state = match state {
            WorkflowState::InProgress { item_index, .. } if item_index >= item_count => {
                WorkflowState::Complete
            }
            other => other,
        };
        Self { item_count, state }
    }

    #[must_use]
    pub fn state(&self) -> WorkflowState {
        self.state
    }

    #[must_use]
    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Supply the item list and move to the first attempt of the first item.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::EmptyItemList` for zero items and
    /// `WorkflowError::AlreadyStarted` if items were supplied before.
    pub fn start(&mut self, item_count: usize) -> Result<WorkflowState, WorkflowError> {
        if self.state != WorkflowState::AwaitingItems {
            return Err(WorkflowError::AlreadyStarted);
        }
        if item_count == 0 {
            return Err(WorkflowError::EmptyItemList);
        }
        self.item_count = item_count;
        self.state = WorkflowState::START;
        Ok(self.state)
    }

    /// Move past the current attempt, whether it was recorded or skipped.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::NotStarted` or `WorkflowError::Completed`.
    pub fn advance(&mut self) -> Result<WorkflowState, WorkflowError> {
        let (item_index, attempt) = match self.state {
            WorkflowState::AwaitingItems => return Err(WorkflowError::NotStarted),
            WorkflowState::Complete => return Err(WorkflowError::Completed),
            WorkflowState::InProgress {
                item_index,
                attempt,
            } => (item_index, attempt),
        };

        self.state = next_slot(self.item_count, item_index, attempt);
        Ok(self.state)
    }

    /// End the run early. Idempotent once complete.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::NotStarted` if no items were ever supplied.
    pub fn end(&mut self) -> Result<WorkflowState, WorkflowError> {
        if self.state == WorkflowState::AwaitingItems {
            return Err(WorkflowError::NotStarted);
        }
        self.state = WorkflowState::Complete;
        Ok(self.state)
    }

    /// Validate a submission target against the cursor.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::OutOfRange` for slots beyond the cursor or the
    /// list, `WorkflowError::Completed` once complete.
    pub fn check_slot(
        &self,
        item_index: usize,
        attempt: AttemptNumber,
    ) -> Result<SlotKind, WorkflowError> {
        let (cur_item, cur_attempt) = match self.state {
            WorkflowState::AwaitingItems => return Err(WorkflowError::NotStarted),
            WorkflowState::Complete => return Err(WorkflowError::Completed),
            WorkflowState::InProgress {
                item_index,
                attempt,
            } => (item_index, attempt),
        };

        if item_index >= self.item_count {
            return Err(self.out_of_range(item_index, Some(attempt)));
        }
        match (item_index, attempt).cmp(&(cur_item, cur_attempt)) {
            std::cmp::Ordering::Equal => Ok(SlotKind::Current),
            std::cmp::Ordering::Less => Ok(SlotKind::Passed),
            std::cmp::Ordering::Greater => Err(self.out_of_range(item_index, Some(attempt))),
        }
    }

    /// Resolve a navigation request for an item page.
    ///
    /// Items up to and including the current one can be shown; anything else
    /// redirects to the state the tester should be in.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::OutOfRange` carrying the redirect target.
    pub fn locate(&self, item_index: usize) -> Result<WorkflowState, WorkflowError> {
        match self.state {
            WorkflowState::AwaitingItems => Err(WorkflowError::NotStarted),
            WorkflowState::InProgress {
                item_index: current,
                ..
            } if item_index <= current => Ok(self.state),
            _ => Err(self.out_of_range(item_index, None)),
        }
    }

    /// Move the cursor forward past any recorded slot that lies ahead of it.
    ///
    /// Never moves backwards and never leaves `Complete`.
    pub fn reconcile<I>(&mut self, recorded: I) -> WorkflowState
    where
        I: IntoIterator<Item = (usize, AttemptNumber)>,
    {
        let Some(cursor) = self.state.cursor() else {
            return self.state;
        };
        let furthest = recorded
            .into_iter()
            .filter(|(item_index, _)| *item_index < self.item_count)
            .max();
        if let Some((item_index, attempt)) = furthest {
            if (item_index, attempt) >= cursor {
                self.state = next_slot(self.item_count, item_index, attempt);
            }
        }
        self.state
    }

    fn out_of_range(&self, item_index: usize, attempt: Option<AttemptNumber>) -> WorkflowError {
        let redirect = if item_index >= self.item_count {
            WorkflowState::Complete
        } else {
            self.state
        };
        WorkflowError::OutOfRange {
            item_index,
            attempt,
            redirect,
        }
    }
}

fn next_slot(item_count: usize, item_index: usize, attempt: AttemptNumber) -> WorkflowState {
    if let Some(next) = attempt.next() {
        return WorkflowState::InProgress {
            item_index,
            attempt: next,
        };
    }
    if item_index + 1 < item_count {
        WorkflowState::InProgress {
            item_index: item_index + 1,
            attempt: AttemptNumber::FIRST,
        }
    } else {
        WorkflowState::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(item_index: usize, attempt: u8) -> WorkflowState {
        WorkflowState::InProgress {
            item_index,
            attempt: AttemptNumber::new(attempt).unwrap(),
        }
    }

    #[test]
    fn start_requires_items() {
        let mut wf = Workflow::new();
        assert_eq!(wf.start(0), Err(WorkflowError::EmptyItemList));
        assert_eq!(wf.state(), WorkflowState::AwaitingItems);
        assert_eq!(wf.start(2), Ok(at(0, 1)));
        assert_eq!(wf.start(2), Err(WorkflowError::AlreadyStarted));
    }

    #[test]
    fn walks_every_slot_then_completes() {
        let mut wf = Workflow::new();
        wf.start(2).unwrap();
        for attempt in 2..=5 {
            assert_eq!(wf.advance().unwrap(), at(0, attempt));
        }
        assert_eq!(wf.advance().unwrap(), at(1, 1));
        for _ in 2..=5 {
            wf.advance().unwrap();
        }
        assert_eq!(wf.state(), at(1, 5));
        assert_eq!(wf.advance().unwrap(), WorkflowState::Complete);
        assert_eq!(wf.advance(), Err(WorkflowError::Completed));
    }

    #[test]
    fn early_exit_is_always_permitted() {
        let mut wf = Workflow::new();
        assert_eq!(wf.end(), Err(WorkflowError::NotStarted));
        wf.start(3).unwrap();
        wf.advance().unwrap();
        assert_eq!(wf.end().unwrap(), WorkflowState::Complete);
        assert_eq!(wf.end().unwrap(), WorkflowState::Complete);
    }

    #[test]
    fn slot_checks_against_cursor() {
        let wf = Workflow::resume(2, at(0, 3));
        let two = AttemptNumber::new(2).unwrap();
        let three = AttemptNumber::new(3).unwrap();
        let four = AttemptNumber::new(4).unwrap();

        assert_eq!(wf.check_slot(0, three), Ok(SlotKind::Current));
        assert_eq!(wf.check_slot(0, two), Ok(SlotKind::Passed));
        assert_eq!(
            wf.check_slot(0, four),
            Err(WorkflowError::OutOfRange {
                item_index: 0,
                attempt: Some(four),
                redirect: at(0, 3),
            })
        );
        assert!(matches!(
            wf.check_slot(7, two),
            Err(WorkflowError::OutOfRange {
                redirect: WorkflowState::Complete,
                ..
            })
        ));
    }

    #[test]
    fn locate_redirects_when_items_exhausted() {
        let wf = Workflow::resume(2, at(1, 2));
        assert_eq!(wf.locate(0), Ok(at(1, 2)));
        assert_eq!(wf.locate(1), Ok(at(1, 2)));
        assert!(matches!(
            wf.locate(2),
            Err(WorkflowError::OutOfRange {
                redirect: WorkflowState::Complete,
                ..
            })
        ));

        let done = Workflow::resume(2, WorkflowState::Complete);
        assert!(matches!(
            done.locate(0),
            Err(WorkflowError::OutOfRange {
                redirect: WorkflowState::Complete,
                ..
            })
        ));
    }

    #[test]
    fn resume_normalizes_cursor_past_end() {
        let wf = Workflow::resume(1, at(3, 1));
        assert_eq!(wf.state(), WorkflowState::Complete);
    }

    #[test]
    fn reconcile_moves_forward_only() {
        let mut wf = Workflow::resume(2, at(0, 2));
        let recorded = [(0, AttemptNumber::FIRST), (0, AttemptNumber::new(4).unwrap())];
        assert_eq!(wf.reconcile(recorded), at(0, 5));

        let stale = [(0, AttemptNumber::FIRST)];
        assert_eq!(wf.reconcile(stale), at(0, 5));

        let last = [(1, AttemptNumber::LAST)];
        assert_eq!(wf.reconcile(last), WorkflowState::Complete);
    }
}
