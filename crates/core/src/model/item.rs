use std::collections::HashSet;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ItemError {
    #[error("no usable items in the supplied list")]
    EmptyItemList,
}

/// A keyword the tester must pronounce, with its position in the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestItem {
    position: usize,
    keyword: String,
}

impl TestItem {
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn keyword(&self) -> &str {
        &self.keyword
    }
}

/// Ordered, non-empty list of items for one session.
///
/// Keywords are trimmed, blank entries are dropped and repeated keywords keep
/// only their first occurrence. Attempts are addressed by keyword, so keywords
/// are unique within a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemList {
    items: Vec<TestItem>,
}

impl ItemList {
    /// Build a list from raw keywords in order.
    ///
    /// # Errors
    ///
    /// Returns `ItemError::EmptyItemList` if nothing usable remains after trimming.
    pub fn from_keywords<I, S>(keywords: I) -> Result<Self, ItemError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for raw in keywords {
            let keyword = raw.as_ref().trim();
            if keyword.is_empty() || !seen.insert(keyword.to_string()) {
                continue;
            }
            items.push(TestItem {
                position: items.len(),
                keyword: keyword.to_string(),
            });
        }

        if items.is_empty() {
            return Err(ItemError::EmptyItemList);
        }
        Ok(Self { items })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false for a constructed list; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&TestItem> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestItem> {
        self.items.iter()
    }

    #[must_use]
    pub fn keywords(&self) -> Vec<&str> {
        self.items.iter().map(TestItem::keyword).collect()
    }

    #[must_use]
    pub fn position_of(&self, keyword: &str) -> Option<usize> {
        self.items
            .iter()
            .find(|item| item.keyword == keyword)
            .map(TestItem::position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_skips_blank_entries() {
        let list = ItemList::from_keywords(["  गेहूं ", "", "   ", "चावल"]).unwrap();
        assert_eq!(list.keywords(), vec!["गेहूं", "चावल"]);
        assert_eq!(list.get(1).unwrap().position(), 1);
    }

    #[test]
    fn all_blank_is_an_empty_list() {
        let err = ItemList::from_keywords(["", " \t "]).unwrap_err();
        assert_eq!(err, ItemError::EmptyItemList);
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let list = ItemList::from_keywords(["Okra", "Carrot", " Okra"]).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.position_of("Carrot"), Some(1));
        assert_eq!(list.position_of("Celery"), None);
    }
}
