use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LanguageError {
    #[error("unsupported language: {0}")]
    Unsupported(String),
}

/// Languages a test run can be recorded in.
///
/// Each language maps to the BCP-47 code the transcription collaborator expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Hindi,
    Malayalam,
    Gujarati,
    Odia,
    English,
    Punjabi,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::Hindi,
        Language::Malayalam,
        Language::Gujarati,
        Language::Odia,
        Language::English,
        Language::Punjabi,
    ];

    /// Lowercase name used in URLs, storage and exports.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Language::Hindi => "hindi",
            Language::Malayalam => "malayalam",
            Language::Gujarati => "gujarati",
            Language::Odia => "odia",
            Language::English => "english",
            Language::Punjabi => "punjabi",
        }
    }

    #[must_use]
    pub fn bcp47_code(self) -> &'static str {
        match self {
            Language::Hindi => "hi-IN",
            Language::Malayalam => "ml-IN",
            Language::Gujarati => "gu-IN",
            Language::Odia => "or-IN",
            Language::English => "en-IN",
            Language::Punjabi => "pa-IN",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = LanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Language::ALL
            .into_iter()
            .find(|lang| lang.name() == wanted)
            .ok_or_else(|| LanguageError::Unsupported(s.trim().to_string()))
    }
}
