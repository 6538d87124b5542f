use std::collections::HashMap;

use uuid::Uuid;

/// Correlates an outbound host request with the response that will arrive
/// later. Entries whose response never comes are kept until removed.
#[derive(Debug)]
pub struct PendingRequestRegistry<V> {
    entries: HashMap<String, V>,
}

impl<V> Default for PendingRequestRegistry<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V> PendingRequestRegistry<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh id that no outstanding entry uses. Does not reserve it.
    pub fn create(&self) -> String {
        loop {
            let id = Uuid::new_v4().simple().to_string();
            if !self.entries.contains_key(&id) {
                return id;
            }
        }
    }

    pub fn set(&mut self, id: impl Into<String>, value: V) {
        self.entries.insert(id.into(), value);
    }

    pub fn has(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&V> {
        self.entries.get(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<V> {
        self.entries.remove(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/pending_tests.rs"]
mod tests;
