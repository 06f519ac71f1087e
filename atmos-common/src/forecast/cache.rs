//! Short-lived forecast result cache
//!
//! Keys include the epoch of the newest observation, so a newer observation
//! naturally misses. Any other history change goes through
//! [`ForecastCache::invalidate`], which also bumps the location's generation
//! so a fit that started before the change is never stored.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use super::{ForecastPoint, Frequency};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub location_id: i64,
    pub periods: u32,
    pub frequency: Frequency,
    /// Epoch milliseconds of the newest observation at fit time
    pub latest_ms: i64,
}

#[derive(Debug)]
struct CacheEntry {
    points: Arc<Vec<ForecastPoint>>,
    inserted_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    /// Bumped on every invalidation of a location
    generations: HashMap<i64, u64>,
}

impl CacheState {
    fn generation(&self, location_id: i64) -> u64 {
        self.generations.get(&location_id).copied().unwrap_or(0)
    }
}

/// TTL + capacity bounded map of fitted forecasts
#[derive(Debug)]
pub struct ForecastCache {
    state: RwLock<CacheState>,
    ttl: Duration,
    capacity: usize,
}

impl ForecastCache {
    /// A zero `capacity` or `ttl` disables caching
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            ttl,
            capacity,
        }
    }

    fn enabled(&self) -> bool {
        self.capacity > 0 && !self.ttl.is_zero()
    }

    /// Current generation of a location, read before its history is fetched
    pub async fn generation(&self, location_id: i64) -> u64 {
        self.state.read().await.generation(location_id)
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Arc<Vec<ForecastPoint>>> {
        if !self.enabled() {
            return None;
        }
        let state = self.state.read().await;
        state
            .entries
            .get(key)
            .filter(|entry| entry.inserted_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.points))
    }

    /// Store a fit made from history read at `generation`
    ///
    /// Returns `false` and stores nothing when the location was invalidated
    /// since then.
    pub async fn insert(
        &self,
        key: CacheKey,
        generation: u64,
        points: Arc<Vec<ForecastPoint>>,
    ) -> bool {
        if !self.enabled() {
            return false;
        }
        let mut state = self.state.write().await;
        if state.generation(key.location_id) != generation {
            debug!(location_id = key.location_id, "Discarding forecast fitted from stale history");
            return false;
        }

        let ttl = self.ttl;
        let entries = &mut state.entries;
        entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);

        while entries.len() >= self.capacity && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(k, _)| *k);
            match oldest {
                Some(oldest) => {
                    entries.remove(&oldest);
                }
                None => break,
            }
        }

        entries.insert(
            key,
            CacheEntry {
                points,
                inserted_at: Instant::now(),
            },
        );
        true
    }

    /// Drop every entry for a location and start a new generation
    pub async fn invalidate(&self, location_id: i64) {
        let mut state = self.state.write().await;
        *state.generations.entry(location_id).or_insert(0) += 1;

        let before = state.entries.len();
        state.entries.retain(|key, _| key.location_id != location_id);
        let removed = before - state.entries.len();
        if removed > 0 {
            debug!(location_id, removed, "Invalidated cached forecasts");
        }
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(location_id: i64, latest_ms: i64) -> CacheKey {
        CacheKey {
            location_id,
            periods: 24,
            frequency: Frequency::Hourly,
            latest_ms,
        }
    }

    fn points() -> Arc<Vec<ForecastPoint>> {
        Arc::new(Vec::new())
    }

    #[tokio::test]
    async fn test_hit_and_miss() {
        let cache = ForecastCache::new(Duration::from_secs(60), 8);
        assert!(cache.insert(key(1, 100), 0, points()).await);

        assert!(cache.get(&key(1, 100)).await.is_some());
        // Newer observation => different key
        assert!(cache.get(&key(1, 200)).await.is_none());
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let cache = ForecastCache::new(Duration::from_secs(60), 2);
        cache.insert(key(1, 1), 0, points()).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.insert(key(2, 1), 0, points()).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.insert(key(3, 1), 0, points()).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get(&key(1, 1)).await.is_none());
        assert!(cache.get(&key(3, 1)).await.is_some());
    }

    #[tokio::test]
    async fn test_expired_entries_are_not_returned() {
        let cache = ForecastCache::new(Duration::from_millis(10), 8);
        cache.insert(key(1, 1), 0, points()).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cache.get(&key(1, 1)).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_is_per_location() {
        let cache = ForecastCache::new(Duration::from_secs(60), 8);
        cache.insert(key(1, 1), 0, points()).await;
        cache.insert(key(1, 2), 0, points()).await;
        cache.insert(key(2, 1), 0, points()).await;

        cache.invalidate(1).await;

        assert_eq!(cache.len().await, 1);
        assert!(cache.get(&key(2, 1)).await.is_some());
        assert_eq!(cache.generation(1).await, 1);
        assert_eq!(cache.generation(2).await, 0);
    }

    #[tokio::test]
    async fn test_insert_after_invalidate_is_discarded() {
        let cache = ForecastCache::new(Duration::from_secs(60), 8);
        let started_at = cache.generation(5).await;

        // History changed while the fit was running
        cache.invalidate(5).await;

        assert!(!cache.insert(key(5, 1), started_at, points()).await);
        assert!(cache.get(&key(5, 1)).await.is_none());

        let current = cache.generation(5).await;
        assert!(cache.insert(key(5, 1), current, points()).await);
        assert!(cache.get(&key(5, 1)).await.is_some());
    }

    #[tokio::test]
    async fn test_zero_capacity_disables() {
        let cache = ForecastCache::new(Duration::from_secs(60), 0);
        cache.insert(key(1, 1), 0, points()).await;
        assert!(cache.is_empty().await);
    }
}
