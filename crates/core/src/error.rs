use thiserror::Error;

use crate::model::{AttemptError, ItemError, LanguageError, TesterError};
use crate::workflow::WorkflowError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Item(#[from] ItemError),
    #[error(transparent)]
    Language(#[from] LanguageError),
    #[error(transparent)]
    Tester(#[from] TesterError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::{AttemptNumber, Language, Tester};

    fn parse_request(language: &str, email: &str, attempt: u8) -> Result<(), Error> {
        let _language: Language = language.parse()?;
        let _tester = Tester::new("QA", email)?;
        let _attempt = AttemptNumber::new(attempt)?;
        Ok(())
    }

    #[test]
    fn model_errors_convert_with_question_mark() {
        assert!(parse_request("hindi", "qa@example.com", 1).is_ok());
        assert!(matches!(
            parse_request("latin", "qa@example.com", 1),
            Err(Error::Language(_))
        ));
        assert!(matches!(
            parse_request("hindi", "qa", 1),
            Err(Error::Tester(_))
        ));
        assert!(matches!(
            parse_request("hindi", "qa@example.com", 0),
            Err(Error::Attempt(_))
        ));
    }
}
