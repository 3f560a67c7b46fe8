//! In-memory response cache keyed by `(student, message)`.
//!
//! Volatile: entries live for the lifetime of the process. With no capacity
//! the cache is unbounded and never evicts; with a capacity the oldest
//! inserted entry is dropped first. Concurrent first writes for the same key
//! are last-writer-wins, which is fine because a given input always
//! regenerates the same answer.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::sanitize::CacheKey;
use super::types::Classification;
use crate::llm::GenerationMetadata;

/// A previously computed answer.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    /// Final response text (disclaimer already applied).
    pub response: String,
    /// Generator metadata from the first computation.
    pub metadata: Option<GenerationMetadata>,
    /// Flags computed from the sanitized text on the original miss.
    pub flags: Classification,
    pub created_at: DateTime<Utc>,
    /// Number of cache hits served from this entry.
    pub hit_count: u32,
}

impl CachedResponse {
    /// Time since the entry was stored.
    pub fn age(&self) -> Duration {
        Utc::now() - self.created_at
    }
}

#[derive(Default)]
struct CacheStore {
    entries: HashMap<CacheKey, CachedResponse>,
    /// Insertion order, used only when a capacity is set.
    order: VecDeque<CacheKey>,
}

/// Response cache shared by all requests.
pub struct ResponseCache {
    store: RwLock<CacheStore>,
    capacity: Option<usize>,
}

impl ResponseCache {
    /// Unbounded cache; memory growth is the caller's responsibility.
    pub fn unbounded() -> Self {
        Self {
            store: RwLock::new(CacheStore::default()),
            capacity: None,
        }
    }

    /// Cache holding at most `capacity` entries (clamped to at least 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            store: RwLock::new(CacheStore::default()),
            capacity: Some(capacity.max(1)),
        }
    }

    /// Build from an optional capacity setting.
    pub fn new(capacity: Option<usize>) -> Self {
        match capacity {
            Some(n) => Self::with_capacity(n),
            None => Self::unbounded(),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Look up an entry, bumping its hit counter.
    pub async fn get(&self, key: &CacheKey) -> Option<CachedResponse> {
        let mut store = self.store.write().await;
        let entry = store.entries.get_mut(key)?;
        entry.hit_count = entry.hit_count.saturating_add(1);
        debug!(
            student_id = %key.student_id(),
            hits = entry.hit_count,
            age_secs = entry.age().num_seconds(),
            "Response cache hit"
        );
        Some(entry.clone())
    }

    /// Store an entry unconditionally, replacing any previous value.
    pub async fn insert(
        &self,
        key: CacheKey,
        response: String,
        metadata: Option<GenerationMetadata>,
        flags: Classification,
    ) {
        let entry = CachedResponse {
            response,
            metadata,
            flags,
            created_at: Utc::now(),
            hit_count: 0,
        };

        let mut store = self.store.write().await;
        if store.entries.insert(key.clone(), entry).is_some() {
            // Raced with another writer for the same key; order is unchanged.
            return;
        }

        if let Some(capacity) = self.capacity {
            store.order.push_back(key);
            while store.entries.len() > capacity {
                let Some(oldest) = store.order.pop_front() else {
                    break;
                };
                if let Some(evicted) = store.entries.remove(&oldest) {
                    debug!(
                        student_id = %oldest.student_id(),
                        age_secs = evicted.age().num_seconds(),
                        hits = evicted.hit_count,
                        "Evicted oldest cache entry"
                    );
                }
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        let mut store = self.store.write().await;
        store.entries.clear();
        store.order.clear();
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::sanitize::make_cache_key;
    use crate::pipeline::types::Priority;

    fn routine() -> Classification {
        Classification {
            relevant: true,
            crisis: false,
            appointment_intent: false,
            urgency: Priority::Routine,
        }
    }

    #[tokio::test]
    async fn miss_then_hit() {
        let cache = ResponseCache::unbounded();
        let key = make_cache_key("s1", "Hello");
        assert!(cache.get(&key).await.is_none());

        cache.insert(key.clone(), "hi there".into(), None, routine()).await;
        let hit = cache.get(&make_cache_key("s1", "HELLO")).await.unwrap();
        assert_eq!(hit.response, "hi there");
        assert_eq!(hit.hit_count, 1);

        let again = cache.get(&key).await.unwrap();
        assert_eq!(again.hit_count, 2);
    }

    #[tokio::test]
    async fn different_students_do_not_share_entries() {
        let cache = ResponseCache::unbounded();
        cache
            .insert(make_cache_key("s1", "hello"), "a".into(), None, routine())
            .await;
        assert!(cache.get(&make_cache_key("s2", "hello")).await.is_none());
    }

    #[tokio::test]
    async fn insert_overwrites_existing_key() {
        let cache = ResponseCache::with_capacity(2);
        let key = make_cache_key("s1", "x");
        cache.insert(key.clone(), "first".into(), None, routine()).await;
        cache.insert(key.clone(), "second".into(), None, routine()).await;
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get(&key).await.unwrap().response, "second");
    }

    #[tokio::test]
    async fn bounded_cache_evicts_oldest() {
        let cache = ResponseCache::with_capacity(2);
        for msg in ["one", "two", "three"] {
            cache
                .insert(make_cache_key("s", msg), msg.into(), None, routine())
                .await;
        }
        assert_eq!(cache.len().await, 2);
        assert!(cache.get(&make_cache_key("s", "one")).await.is_none());
        assert!(cache.get(&make_cache_key("s", "two")).await.is_some());
        assert!(cache.get(&make_cache_key("s", "three")).await.is_some());
    }

    #[tokio::test]
    async fn zero_capacity_is_clamped() {
        let cache = ResponseCache::new(Some(0));
        assert_eq!(cache.capacity(), Some(1));
        cache.insert(make_cache_key("s", "a"), "a".into(), None, routine()).await;
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn unbounded_cache_never_evicts() {
        let cache = ResponseCache::default();
        for i in 0..100 {
            cache
                .insert(make_cache_key("s", &i.to_string()), "x".into(), None, routine())
                .await;
        }
        assert_eq!(cache.len().await, 100);
        assert!(cache.capacity().is_none());
    }

    #[tokio::test]
    async fn clear_empties_cache() {
        let cache = ResponseCache::unbounded();
        cache.insert(make_cache_key("s", "a"), "a".into(), None, routine()).await;
        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn entries_keep_flags_and_report_age() {
        let cache = ResponseCache::unbounded();
        let before = Utc::now();
        let flags = Classification {
            appointment_intent: true,
            urgency: Priority::High,
            ..routine()
        };
        cache
            .insert(make_cache_key("s", "chest pain"), "see a nurse".into(), None, flags)
            .await;

        let hit = cache.get(&make_cache_key("s", "Chest Pain")).await.unwrap();
        assert_eq!(hit.flags, flags);
        assert!(hit.created_at >= before);
        assert!(hit.created_at <= Utc::now());
        let age = hit.age();
        assert!(age >= Duration::zero());
        assert!(age.num_seconds() < 5);
    }
}
