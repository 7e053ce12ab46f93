//! In-memory store backed by a fixed record list.

use std::collections::HashMap;

use crate::store::{PersonRecord, PersonStore};

/// The built-in collection served by default.
pub fn significant_people() -> Vec<PersonRecord> {
    vec![
        PersonRecord::new("1", "Fyodor", "Dostoevsky", "Arts"),
        PersonRecord::new("2", "Leo", "Tolstoy", "Arts"),
        PersonRecord::new("3", "Jesus", "Christ", "Religion"),
        PersonRecord::new("4", "Isaac", "Newton", "Science"),
        PersonRecord::new("5", "Plato", "", "Philosophy"),
    ]
}

/// Immutable store with an id index built at construction.
#[derive(Debug, Clone)]
pub struct StaticStore {
    records: Vec<PersonRecord>,
    index: HashMap<String, usize>,
}

impl StaticStore {
    /// Build a store from a record list. On duplicate ids the first
    /// occurrence wins for lookups; listing keeps every record.
    pub fn new(records: Vec<PersonRecord>) -> Self {
        let mut index = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            index.entry(record.id.clone()).or_insert(position);
        }
        Self { records, index }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for StaticStore {
    fn default() -> Self {
        Self::new(significant_people())
    }
}

impl PersonStore for StaticStore {
    fn list_all(&self) -> &[PersonRecord] {
        &self.records
    }

    fn get_by_id(&self, id: &str) -> Option<&PersonRecord> {
        self.index.get(id).map(|&position| &self.records[position])
    }
}
