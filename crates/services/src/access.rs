use qa_core::model::Tester;

/// Email-domain allow list; empty means everyone may run tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    allowed_domains: Vec<String>,
}

impl AccessPolicy {
    #[must_use]
    pub fn allow_all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_domains = domains
            .into_iter()
            .map(|d| d.as_ref().trim().trim_start_matches('@').to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { allowed_domains }
    }

    #[must_use]
    pub fn allowed_domains(&self) -> &[String] {
        &self.allowed_domains
    }

    #[must_use]
    pub fn permits(&self, tester: &Tester) -> bool {
        if self.allowed_domains.is_empty() {
            return true;
        }
        let domain = tester.email_domain();
        self.allowed_domains.iter().any(|allowed| *allowed == domain)
    }
}
