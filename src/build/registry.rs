use std::collections::HashMap;

use crate::ir::{CategoryEntry, CategoryId, IdCounter};

/// Maps label strings to category IDs in first-seen order.
///
/// Owned by a single build; labels are case-sensitive and never removed.
#[derive(Debug, Default)]
pub struct CategoryRegistry {
    ids: HashMap<String, CategoryId>,
    entries: Vec<CategoryEntry>,
    counter: IdCounter,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ID for `label`, allocating the next one if it is new.
    pub fn resolve(&mut self, label: &str) -> CategoryId {
        if let Some(&id) = self.ids.get(label) {
            return id;
        }
        let id: CategoryId = self.counter.next_id();
        self.ids.insert(label.to_string(), id);
        self.entries.push(CategoryEntry::new(id, label));
        id
    }

    /// Categories in ID order.
    pub fn categories(&self) -> &[CategoryEntry] {
        &self.entries
    }

    pub fn into_categories(self) -> Vec<CategoryEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
