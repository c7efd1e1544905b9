//! Sliding co-occurrence window over extraction batches.

use std::collections::{BTreeMap, VecDeque};

use topicflow_types::TopicId;

/// Tracks the topic ids of the most recent batches.
///
/// With `window == 1` only topics of the same batch co-occur. With a wider
/// window, each new topic also co-occurs with every topic of the previous
/// `window - 1` batches.
#[derive(Debug, Clone)]
pub struct CoOccurrenceWindow {
    window: usize,
    recent: VecDeque<Vec<TopicId>>,
}

impl CoOccurrenceWindow {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            recent: VecDeque::new(),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Register a batch's topic ids and return, for each of them, the ids it
    /// co-occurs with (self excluded, no duplicates, sorted).
    pub fn observe(&mut self, batch: &[TopicId]) -> BTreeMap<TopicId, Vec<TopicId>> {
        let mut links: BTreeMap<TopicId, Vec<TopicId>> = BTreeMap::new();

        for id in batch {
            let entry = links.entry(id.clone()).or_default();
            let candidates = batch.iter().chain(self.recent.iter().flatten());
            for other in candidates {
                if other != id && !entry.contains(other) {
                    entry.push(other.clone());
                }
            }
            entry.sort();
        }

        if self.window > 1 {
            let mut unique: Vec<TopicId> = Vec::new();
            for id in batch {
                if !unique.contains(id) {
                    unique.push(id.clone());
                }
            }
            self.recent.push_back(unique);
            while self.recent.len() > self.window - 1 {
                self.recent.pop_front();
            }
        }

        links
    }

    /// Forget every previous batch.
    pub fn clear(&mut self) {
        self.recent.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<TopicId> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_same_batch_window() {
        let mut window = CoOccurrenceWindow::new(1);
        let links = window.observe(&ids(&["a", "b", "c"]));
        assert_eq!(links["a"], ids(&["b", "c"]));
        assert_eq!(links["c"], ids(&["a", "b"]));

        let links = window.observe(&ids(&["d"]));
        assert!(links["d"].is_empty());
    }

    #[test]
    fn test_wider_window_links_previous_batches() {
        let mut window = CoOccurrenceWindow::new(2);
        window.observe(&ids(&["a", "b"]));
        let links = window.observe(&ids(&["c"]));
        assert_eq!(links["c"], ids(&["a", "b"]));

        // "a"/"b" fell out of the window
        let links = window.observe(&ids(&["d"]));
        assert_eq!(links["d"], ids(&["c"]));
    }

    #[test]
    fn test_repeated_id_not_self_linked() {
        let mut window = CoOccurrenceWindow::new(3);
        window.observe(&ids(&["a"]));
        let links = window.observe(&ids(&["a", "b"]));
        assert_eq!(links["a"], ids(&["b"]));
        assert_eq!(links["b"], ids(&["a"]));
    }

    #[test]
    fn test_zero_window_behaves_as_one() {
        let window = CoOccurrenceWindow::new(0);
        assert_eq!(window.window(), 1);
    }
}
