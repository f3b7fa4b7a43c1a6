mod attempt;
mod ids;
mod item;
mod language;
mod result;
mod session;
mod tester;

pub use ids::{ParseIdError, SessionId};

pub use attempt::{Attempt, AttemptError, AttemptNumber, MAX_ATTEMPTS};
pub use item::{ItemError, ItemList, TestItem};
pub use language::{Language, LanguageError};
pub use result::{ItemResult, QualityBucket, RatioConvention, RatioConventionError};
pub use session::{SessionDraft, SessionStateError, TestSession};
pub use tester::{Tester, TesterError};
