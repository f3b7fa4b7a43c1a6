//! Item lists from uploaded CSV files or the built-in fallbacks.

use rand::rng;
use rand::seq::SliceRandom;

use qa_core::model::{ItemList, Language};

use crate::error::ItemSourceError;

static HINDI_DEFAULTS: [&str; 18] = [
    "पेठा",
    "बैंगन",
    "ब्रसेल्स स्प्राउट",
    "ब्रोकली",
    "चुकंदर",
    "करेला",
    "पत्ता गोभी",
    "फूल गोभी",
    "गाजर",
    "चीनी मेलो",
    "गवार फली",
    "अजवाइन",
    "गिल्की",
    "गांठ गोभी",
    "कुंदरू",
    "खीरा",
    "लौकी",
    "भिंडी",
];

static ENGLISH_DEFAULTS: [&str; 18] = [
    "Ash Gourd",
    "Brinjal",
    "Brussels Sprout",
    "Broccoli",
    "Beetroot",
    "Bitter Gourd",
    "Cabbage",
    "Cauliflower",
    "Carrot",
    "Chinese Mellow",
    "Cluster Bean",
    "Celery",
    "Gilky",
    "Kohlrabi",
    "Ivy Gourd",
    "Cucumber",
    "Bottle Gourd",
    "Okra",
];

/// Built-in list for languages that ship one.
#[must_use]
pub fn default_keywords(language: Language) -> Option<&'static [&'static str]> {
    match language {
        Language::Hindi => Some(HINDI_DEFAULTS.as_slice()),
        Language::English => Some(ENGLISH_DEFAULTS.as_slice()),
        _ => None,
    }
}

/// First column of every record, trimmed, blanks skipped. No header row.
///
/// # Errors
///
/// Returns `ItemSourceError::Csv` when the bytes are not readable as CSV.
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<String>, ItemSourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let mut keywords = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(first) = record.get(0) {
            let first = first.trim_start_matches('\u{feff}').trim();
            if !first.is_empty() {
                keywords.push(first.to_owned());
            }
        }
    }
    Ok(keywords)
}

/// Builds the item list for a new run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemSource {
    shuffle: bool,
}

impl ItemSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable shuffling the item order before the run starts.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Use the uploaded file when present, the language's fallback list otherwise.
    ///
    /// # Errors
    ///
    /// Returns `ItemSourceError::EmptyItemList` when nothing usable remains,
    /// including languages without a fallback list.
    pub fn build(
        &self,
        language: Language,
        upload: Option<&[u8]>,
    ) -> Result<ItemList, ItemSourceError> {
        let mut keywords = match upload {
            Some(bytes) => parse_csv(bytes)?,
            None => default_keywords(language)
                .ok_or(ItemSourceError::EmptyItemList)?
                .iter()
                .map(|k| (*k).to_owned())
                .collect(),
        };

        if self.shuffle {
            keywords.shuffle(&mut rng());
        }
        Ok(ItemList::from_keywords(keywords)?)
    }
}
