use qa_core::model::{AttemptNumber, TestSession};
use qa_core::workflow::WorkflowState;

/// Where a run stands and what the tester should record next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub session: TestSession,
    pub next: Option<NextSlot>,
    pub total_items: usize,
    /// Items the cursor has moved past; all of them once complete.
    pub items_done: usize,
}

/// The item and attempt to present next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextSlot {
    pub item_index: usize,
    pub keyword: String,
    pub attempt: AttemptNumber,
}

impl SessionProgress {
    #[must_use]
    pub fn of(session: TestSession) -> Self {
        let total_items = session.items().len();
        let next = match session.state() {
            WorkflowState::InProgress {
                item_index,
                attempt,
            } => session.items().get(item_index).map(|item| NextSlot {
                item_index,
                keyword: item.keyword().to_owned(),
                attempt,
            }),
            _ => None,
        };
        let items_done = match (session.state(), &next) {
            (WorkflowState::Complete, _) => total_items,
            (_, Some(slot)) => slot.item_index,
            _ => 0,
        };
        Self {
            session,
            next,
            total_items,
            items_done,
        }
    }

    #[must_use]
    pub fn state(&self) -> WorkflowState {
        self.session.state()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.session.is_complete()
    }
}
