//! Navigation frequency statistics.
//!
//! The engine reports every committed navigation as a `(source, destination)`
//! page pair; this module records those pairs and answers "where do I usually
//! go from page N" queries for the shortcuts row. Persisted as JSON under the
//! data directory with a debounced save, so rapid navigation does not write
//! the file on every keypress.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::debounce::Debouncer;
use crate::error::Result;

/// Delay between the last recorded hit and the background save.
const SAVE_DELAY: Duration = Duration::from_secs(60);

/// Destinations visited fewer times than this are not suggested.
const MIN_HIT_COUNT: usize = 3;

/// Hits older than this are ignored when ranking destinations.
const RECENT_WINDOW_DAYS: i64 = 7;

/// Sink for committed navigations. Fire-and-forget: implementations must not
/// block and have no way to report errors back to the engine.
pub trait HitRecorder: Send + Sync {
    /// Record a navigation from `source` to `destination`.
    fn record(&self, source: u16, destination: u16);
}

/// One recorded navigation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageHit {
    /// Page navigated away from.
    pub source: u16,
    /// Page navigated to.
    pub destination: u16,
    /// When the navigation happened.
    pub occurred: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StatsFile {
    hits: Vec<PageHit>,
}

struct Shared {
    path: Option<PathBuf>,
    enabled: bool,
    hits_by_page: Mutex<HashMap<u16, Vec<PageHit>>>,
    changed: AtomicBool,
    saver: Debouncer,
}

/// JSON-persisted [`HitRecorder`] with recency-weighted lookups.
#[derive(Clone)]
pub struct NavigationStats {
    shared: Arc<Shared>,
}

impl NavigationStats {
    /// Open statistics backed by `path`, loading any existing file.
    ///
    /// A missing file starts empty; an unreadable one is logged and
    /// discarded rather than failing startup.
    #[must_use]
    pub fn open(path: PathBuf, enabled: bool) -> Self {
        let hits_by_page = if enabled {
            load_hits(&path)
        } else {
            HashMap::new()
        };

        Self {
            shared: Arc::new(Shared {
                path: Some(path),
                enabled,
                hits_by_page: Mutex::new(hits_by_page),
                changed: AtomicBool::new(false),
                saver: Debouncer::new(),
            }),
        }
    }

    /// A recorder that ignores everything and never touches the filesystem.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            shared: Arc::new(Shared {
                path: None,
                enabled: false,
                hits_by_page: Mutex::new(HashMap::new()),
                changed: AtomicBool::new(false),
                saver: Debouncer::new(),
            }),
        }
    }

    /// Pages most visited from `source`, best first.
    ///
    /// Only destinations hit at least three times within the last week
    /// qualify; `ignore` removes pages already shown elsewhere (e.g. pinned
    /// favorites).
    #[must_use]
    pub fn top_hits(&self, source: u16, count: usize, ignore: &[u16]) -> Vec<u16> {
        if !self.shared.enabled || count == 0 {
            return Vec::new();
        }

        let cutoff = Utc::now() - chrono::Duration::days(RECENT_WINDOW_DAYS);
        let hits = self
            .shared
            .hits_by_page
            .lock()
            .expect("stats lock poisoned");
        let Some(from_source) = hits.get(&source) else {
            return Vec::new();
        };

        let mut counts: HashMap<u16, usize> = HashMap::new();
        for hit in from_source {
            if hit.occurred >= cutoff && !ignore.contains(&hit.destination) {
                *counts.entry(hit.destination).or_default() += 1;
            }
        }

        let mut ranked: Vec<(u16, usize)> = counts
            .into_iter()
            .filter(|(_, n)| *n >= MIN_HIT_COUNT)
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.into_iter().take(count).map(|(page, _)| page).collect()
    }

    /// Write pending changes to disk immediately.
    ///
    /// Meant for shutdown; the debounced save covers the steady state.
    pub fn flush(&self) -> Result<()> {
        self.shared.saver.stop();
        if self.shared.changed.load(Ordering::SeqCst) {
            self.shared.save()?;
        }
        Ok(())
    }

    fn record_hit(&self, source: u16, destination: u16, occurred: DateTime<Utc>) {
        if !self.shared.enabled {
            return;
        }

        {
            let mut hits = self
                .shared
                .hits_by_page
                .lock()
                .expect("stats lock poisoned");
            hits.entry(source).or_default().push(PageHit {
                source,
                destination,
                occurred,
            });
        }
        self.shared.changed.store(true, Ordering::SeqCst);

        let shared = Arc::clone(&self.shared);
        self.shared.saver.start(SAVE_DELAY, move || {
            if let Err(e) = shared.save() {
                warn!("error saving navigation statistics: {e}");
            }
        });
    }
}

impl HitRecorder for NavigationStats {
    fn record(&self, source: u16, destination: u16) {
        self.record_hit(source, destination, Utc::now());
    }
}

impl Shared {
    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let hits: Vec<PageHit> = {
            let by_page = self.hits_by_page.lock().expect("stats lock poisoned");
            by_page.values().flatten().cloned().collect()
        };
        debug!("save {} hits", hits.len());

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(&StatsFile { hits })?;
        fs::write(path, json)?;
        self.changed.store(false, Ordering::SeqCst);
        Ok(())
    }
}

fn load_hits(path: &std::path::Path) -> HashMap<u16, Vec<PageHit>> {
    if !path.exists() {
        return HashMap::new();
    }

    let data = fs::read_to_string(path)
        .map_err(crate::error::Error::from)
        .and_then(|raw| serde_json::from_str::<StatsFile>(&raw).map_err(Into::into));

    match data {
        Ok(file) => {
            debug!("got {} history entries", file.hits.len());
            let mut by_page: HashMap<u16, Vec<PageHit>> = HashMap::new();
            for hit in file.hits {
                by_page.entry(hit.source).or_default().push(hit);
            }
            by_page
        },
        Err(e) => {
            warn!("error loading navigation statistics: {e}");
            HashMap::new()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats_in(dir: &tempfile::TempDir) -> NavigationStats {
        NavigationStats::open(dir.path().join("history.json"), true)
    }

    #[tokio::test]
    async fn top_hits_requires_min_count() {
        let dir = tempfile::tempdir().expect("tempdir");
        let stats = stats_in(&dir);

        stats.record(100, 201);
        stats.record(100, 201);
        assert!(stats.top_hits(100, 4, &[]).is_empty());

        stats.record(100, 201);
        assert_eq!(stats.top_hits(100, 4, &[]), vec![201]);
    }

    #[tokio::test]
    async fn top_hits_ranks_by_frequency() {
        let dir = tempfile::tempdir().expect("tempdir");
        let stats = stats_in(&dir);

        for _ in 0..3 {
            stats.record(100, 201);
        }
        for _ in 0..5 {
            stats.record(100, 350);
        }

        assert_eq!(stats.top_hits(100, 4, &[]), vec![350, 201]);
        assert_eq!(stats.top_hits(100, 1, &[]), vec![350]);
    }

    #[tokio::test]
    async fn top_hits_honors_the_ignore_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let stats = stats_in(&dir);

        for _ in 0..3 {
            stats.record(100, 201);
        }
        assert!(stats.top_hits(100, 4, &[201]).is_empty());
    }

    #[tokio::test]
    async fn old_hits_are_not_suggested() {
        let dir = tempfile::tempdir().expect("tempdir");
        let stats = stats_in(&dir);

        let stale = Utc::now() - chrono::Duration::days(RECENT_WINDOW_DAYS + 1);
        for _ in 0..5 {
            stats.record_hit(100, 201, stale);
        }
        assert!(stats.top_hits(100, 4, &[]).is_empty());
    }

    #[tokio::test]
    async fn flush_persists_and_reload_restores() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.json");

        let stats = NavigationStats::open(path.clone(), true);
        for _ in 0..3 {
            stats.record(100, 202);
        }
        stats.flush().expect("flush");

        let reloaded = NavigationStats::open(path, true);
        assert_eq!(reloaded.top_hits(100, 4, &[]), vec![202]);
    }

    #[tokio::test]
    async fn disabled_stats_record_nothing() {
        let stats = NavigationStats::disabled();
        stats.record(100, 201);
        stats.record(100, 201);
        stats.record(100, 201);
        assert!(stats.top_hits(100, 4, &[]).is_empty());
        stats.flush().expect("flush is a no-op");
    }

    #[tokio::test]
    async fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.json");
        fs::write(&path, "not json").expect("write");

        let stats = NavigationStats::open(path, true);
        assert!(stats.top_hits(100, 4, &[]).is_empty());
    }
}
