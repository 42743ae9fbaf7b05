//! In-memory page cache with two-tier time-based expiry.
//!
//! An entry younger than `refresh_after` is simply fresh. Between
//! `refresh_after` and `expires` it is still served, but flagged stale so the
//! caller can schedule a background refresh. At `expires` it is evicted on
//! the next lookup and treated as a miss. Nothing is persisted.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::types::Page;

/// Expiry thresholds for cached pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Age at which an entry is evicted and treated as a miss.
    pub expires: Duration,
    /// Age at which an entry, while still served, wants a background refresh.
    pub refresh_after: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            expires: Duration::from_secs(600),
            refresh_after: Duration::from_secs(60),
        }
    }
}

struct CacheEntry {
    page: Page,
    added_at: Instant,
}

/// Outcome of a freshness-checking lookup.
#[derive(Debug)]
pub enum CacheLookup<'a> {
    /// No usable entry; the caller has to fetch.
    Miss,
    /// A usable entry.
    Hit {
        /// The cached page.
        page: &'a Page,
        /// True when the entry crossed the soft threshold and a background
        /// refresh should be scheduled.
        stale: bool,
    },
}

/// One entry per page number, last write wins.
pub struct PageCache {
    entries: HashMap<u16, CacheEntry>,
    policy: CachePolicy,
}

impl PageCache {
    /// Create an empty cache with the given expiry policy.
    #[must_use]
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            entries: HashMap::new(),
            policy,
        }
    }

    /// Store a freshly fetched page, replacing any previous entry.
    pub fn insert(&mut self, page: Page) {
        self.entries.insert(
            page.number,
            CacheEntry {
                page,
                added_at: Instant::now(),
            },
        );
    }

    /// Plain access without freshness side effects.
    ///
    /// Used where expiry must not kick in mid-operation, e.g. sub-page
    /// cycling on the page currently displayed.
    #[must_use]
    pub fn get(&self, number: u16) -> Option<&Page> {
        self.entries.get(&number).map(|entry| &entry.page)
    }

    /// Freshness-checking lookup. Evicts a hard-expired entry (so a second
    /// lookup also misses) and flags a soft-expired one as stale.
    pub fn lookup(&mut self, number: u16) -> CacheLookup<'_> {
        let now = Instant::now();

        if let Some(entry) = self.entries.get(&number) {
            if now.duration_since(entry.added_at) >= self.policy.expires {
                self.entries.remove(&number);
            }
        }

        match self.entries.get(&number) {
            None => CacheLookup::Miss,
            Some(entry) => CacheLookup::Hit {
                page: &entry.page,
                stale: now.duration_since(entry.added_at) >= self.policy.refresh_after,
            },
        }
    }

    /// Number of cached pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Location, Subpage};

    fn sample_page(number: u16) -> Page {
        Page {
            number,
            subpages: vec![Subpage {
                location: Location::new(number, 0),
                lines: vec![format!("page {number}")],
                timestamp: None,
            }],
        }
    }

    fn policy_ms(expires: u64, refresh_after: u64) -> CachePolicy {
        CachePolicy {
            expires: Duration::from_millis(expires),
            refresh_after: Duration::from_millis(refresh_after),
        }
    }

    #[test]
    fn fresh_entry_hits_without_stale_flag() {
        let mut cache = PageCache::new(CachePolicy::default());
        cache.insert(sample_page(100));

        match cache.lookup(100) {
            CacheLookup::Hit { page, stale } => {
                assert_eq!(page.number, 100);
                assert!(!stale);
            },
            CacheLookup::Miss => panic!("expected hit"),
        }
    }

    #[test]
    fn missing_entry_is_a_miss() {
        let mut cache = PageCache::new(CachePolicy::default());
        assert!(matches!(cache.lookup(100), CacheLookup::Miss));
    }

    #[test]
    fn hard_expired_entry_is_evicted_and_stays_missing() {
        let mut cache = PageCache::new(policy_ms(20, 10));
        cache.insert(sample_page(100));
        std::thread::sleep(Duration::from_millis(30));

        assert!(matches!(cache.lookup(100), CacheLookup::Miss));
        // Idempotent: the eviction happened, a second check also misses.
        assert!(matches!(cache.lookup(100), CacheLookup::Miss));
        assert!(cache.is_empty());
    }

    #[test]
    fn soft_expired_entry_hits_with_stale_flag() {
        let mut cache = PageCache::new(policy_ms(10_000, 10));
        cache.insert(sample_page(100));
        std::thread::sleep(Duration::from_millis(30));

        match cache.lookup(100) {
            CacheLookup::Hit { stale, .. } => assert!(stale),
            CacheLookup::Miss => panic!("expected hit"),
        }
    }

    #[test]
    fn insert_replaces_previous_entry() {
        let mut cache = PageCache::new(policy_ms(20, 10));
        cache.insert(sample_page(100));
        std::thread::sleep(Duration::from_millis(15));
        cache.insert(sample_page(100));
        std::thread::sleep(Duration::from_millis(10));

        // Total age of the first insert would be past expiry; the rewrite
        // reset the clock.
        assert!(matches!(cache.lookup(100), CacheLookup::Hit { .. }));
    }

    #[test]
    fn get_does_not_evict() {
        let mut cache = PageCache::new(policy_ms(20, 10));
        cache.insert(sample_page(100));
        std::thread::sleep(Duration::from_millis(30));

        assert!(cache.get(100).is_some());
        assert_eq!(cache.len(), 1);
    }
}
