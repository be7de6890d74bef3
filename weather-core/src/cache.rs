use serde_json::Value;
use std::{collections::HashMap, time::Duration};
use tokio::time::Instant;

use crate::zip::ZipCode;

#[derive(Debug, Clone)]
struct CacheEntry {
    response: Value,
    inserted_at: Instant,
}

/// Raw provider responses keyed by ZIP code.
///
/// Entries are valid while `now - inserted_at < ttl`. Expired entries are
/// dropped when their key is next looked up; there is no background sweep.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: HashMap<ZipCode, CacheEntry>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: HashMap::new() }
    }

    pub fn get(&mut self, zip: &ZipCode) -> Option<&Value> {
        let expired = match self.entries.get(zip) {
            None => return None,
            Some(entry) => entry.inserted_at.elapsed() >= self.ttl,
        };

        if expired {
            log::debug!("Cache entry for {zip} expired");
            self.entries.remove(zip);
            return None;
        }

        self.entries.get(zip).map(|entry| &entry.response)
    }

    pub fn insert(&mut self, zip: ZipCode, response: Value) {
        self.entries.insert(zip, CacheEntry { response, inserted_at: Instant::now() });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, including expired ones not yet looked up.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries still within the TTL.
    pub fn live_len(&self) -> usize {
        self.entries.values().filter(|entry| entry.inserted_at.elapsed() < self.ttl).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn zip(s: &str) -> ZipCode {
        ZipCode::try_from(s).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn entry_is_served_until_ttl() {
        let mut cache = ResponseCache::new(Duration::from_secs(300));
        cache.insert(zip("10001"), json!({"current": {}}));

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get(&zip("10001")).is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get(&zip("10001")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_evicted_on_lookup_only() {
        let mut cache = ResponseCache::new(Duration::from_secs(5));
        cache.insert(zip("10001"), json!(1));
        cache.insert(zip("94107"), json!(2));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.live_len(), 0);

        assert!(cache.get(&zip("10001")).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn live_len_skips_expired_entries() {
        let mut cache = ResponseCache::new(Duration::from_secs(60));
        cache.insert(zip("10001"), json!(1));
        tokio::time::advance(Duration::from_secs(45)).await;
        cache.insert(zip("94107"), json!(2));
        assert_eq!(cache.live_len(), 2);

        tokio::time::advance(Duration::from_secs(15)).await;
        assert_eq!(cache.live_len(), 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn clear_empties_the_cache() {
        let mut cache = ResponseCache::new(Duration::from_secs(5));
        cache.insert(zip("10001"), json!(1));
        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.get(&zip("10001")).is_none());
    }
}
