//! Text-keyed record set.

use std::collections::HashSet;

use crate::models::Record;

/// Records in admission order.
///
/// Newly extracted posts are unique by text: two posts with the same text on
/// different dates are the same record, and the first one admitted is kept.
/// Seeded records are kept as they were, duplicates included.
#[derive(Debug, Default)]
pub struct DedupStore {
    seen: HashSet<String>,
    records: Vec<Record>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every record of a prior archive and mark its text as seen.
    /// Returns how many records were loaded.
    pub fn seed(&mut self, records: impl IntoIterator<Item = Record>) -> usize {
        let before = self.records.len();
        for record in records {
            self.seen.insert(record.text.clone());
            self.records.push(record);
        }
        self.records.len() - before
    }

    /// Insert unless a record with the same text is already present.
    pub fn admit(&mut self, record: Record) -> bool {
        if self.seen.contains(&record.text) {
            return false;
        }
        self.seen.insert(record.text.clone());
        self.records.push(record);
        true
    }

    pub fn contains(&self, text: &str) -> bool {
        self.seen.contains(text)
    }

    pub fn all(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(day: u32, text: &str) -> Record {
        Record::new(NaiveDate::from_ymd_opt(2024, 3, day).unwrap(), text)
    }

    #[test]
    fn test_admit_is_idempotent() {
        let mut store = DedupStore::new();
        assert!(store.admit(record(1, "banjir lagi")));
        assert!(!store.admit(record(1, "banjir lagi")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_identity_is_text_only() {
        let mut store = DedupStore::new();
        store.admit(record(1, "same words"));
        assert!(!store.admit(record(9, "same words")));
        assert_eq!(store.all()[0].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn test_seed_then_admit_keeps_order() {
        let mut store = DedupStore::new();
        let seeded = store.seed(vec![record(1, "a"), record(2, "b"), record(3, "a")]);
        assert_eq!(seeded, 3);

        assert!(!store.admit(record(5, "b")));
        assert!(store.admit(record(5, "c")));

        let texts: Vec<_> = store.into_records().into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["a", "b", "a", "c"]);
    }

    #[test]
    fn test_seed_keeps_prior_records_with_shared_text() {
        let prior = vec![
            Record::new(NaiveDate::from_ymd_opt(2022, 6, 1).unwrap(), "same"),
            Record::new(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), "same"),
        ];
        let mut store = DedupStore::new();
        assert_eq!(store.seed(prior.clone()), 2);

        for record in prior.clone() {
            assert!(!store.admit(record));
        }
        assert_eq!(store.all(), prior.as_slice());
    }

    #[test]
    fn test_empty_store() {
        let store = DedupStore::new();
        assert!(store.is_empty());
        assert!(!store.contains("anything"));
    }
}
