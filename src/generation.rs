use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::Mutex;

/// Monotonic request generations per key.
///
/// A caller takes a generation before issuing a request and checks it is
/// still the latest before committing the response. Anything older has been
/// superseded and must be dropped.
#[derive(Debug)]
pub struct GenerationTracker<K> {
    latest: Arc<Mutex<HashMap<K, u64>>>,
}

impl<K> Clone for GenerationTracker<K> {
    fn clone(&self) -> Self {
        Self {
            latest: Arc::clone(&self.latest),
        }
    }
}

impl<K> Default for GenerationTracker<K> {
    fn default() -> Self {
        Self {
            latest: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K: Eq + Hash + Clone> GenerationTracker<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new generation for `key`, superseding every earlier one.
    pub async fn begin(&self, key: &K) -> u64 {
        let mut latest = self.latest.lock().await;
        let next = latest.get(key).copied().unwrap_or(0) + 1;
        latest.insert(key.clone(), next);
        next
    }

    pub async fn is_latest(&self, key: &K, generation: u64) -> bool {
        self.latest.lock().await.get(key).copied() == Some(generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_newer_generation_supersedes_older() {
        let tracker = GenerationTracker::new();
        let first = tracker.begin(&"forecast").await;
        let second = tracker.begin(&"forecast").await;

        assert!(second > first);
        assert!(!tracker.is_latest(&"forecast", first).await);
        assert!(tracker.is_latest(&"forecast", second).await);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let tracker = GenerationTracker::new();
        let forecast = tracker.begin(&"forecast").await;
        let alerts = tracker.begin(&"alerts").await;
        tracker.begin(&"alerts").await;

        assert!(tracker.is_latest(&"forecast", forecast).await);
        assert!(!tracker.is_latest(&"alerts", alerts).await);
        assert!(tracker.is_latest(&"alerts", 2).await);
        assert!(!tracker.is_latest(&"current", 1).await);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let tracker = GenerationTracker::new();
        let clone = tracker.clone();
        let g = tracker.begin(&1u8).await;
        clone.begin(&1u8).await;
        assert!(!tracker.is_latest(&1u8, g).await);
    }
}
