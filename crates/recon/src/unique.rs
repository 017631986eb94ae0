use std::collections::HashSet;

use crate::model::Key;

/// Seen-set for first-occurrence scans.
///
/// Owned by one uniqueness pass: create it, thread it across the sources in
/// the caller's declared order, drop it. Empty keys are never inserted and
/// never flagged.
#[derive(Debug, Default)]
pub struct SeenKeys {
    seen: HashSet<String>,
}

impl SeenKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag each key that has not been seen before, in one left-to-right
    /// pass. Marks the flagged keys as seen for subsequent calls.
    pub fn mark(&mut self, keys: &[Key]) -> Vec<bool> {
        keys.iter()
            .map(|key| match key.as_value() {
                None => false,
                Some(s) => self.seen.insert(s.to_string()),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// First-occurrence flags over a single source's keys.
pub fn first_occurrence_flags(keys: &[Key]) -> Vec<bool> {
    SeenKeys::new().mark(keys)
}
