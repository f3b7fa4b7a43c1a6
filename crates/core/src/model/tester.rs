use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TesterError {
    #[error("tester name is required")]
    MissingName,
    #[error("invalid tester email: {0}")]
    InvalidEmail(String),
}

/// Identity of the person running a test session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tester {
    name: String,
    email: String,
}

impl Tester {
    /// # Errors
    ///
    /// Returns `TesterError` if the name is blank or the email is malformed.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Result<Self, TesterError> {
        let name = name.into().trim().to_string();
        let email = email.into().trim().to_string();
        if name.is_empty() {
            return Err(TesterError::MissingName);
        }
        match email.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {}
            _ => return Err(TesterError::InvalidEmail(email)),
        }
        Ok(Self { name, email })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Lowercased domain part of the email.
    #[must_use]
    pub fn email_domain(&self) -> String {
        self.email
            .rsplit_once('@')
            .map(|(_, domain)| domain.to_lowercase())
            .unwrap_or_default()
    }
}
