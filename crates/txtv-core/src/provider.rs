//! The page navigation engine.
//!
//! All navigation intents funnel into a single queue drained by one
//! background consumer task, so there is never more than one fetch in flight
//! and intents are honored strictly in submission order. The facade methods
//! ([`PageProvider`]) never block the caller: they either answer straight
//! from the cache or hand the intent to the consumer.
//!
//! Superseding works on job ids instead of interrupting work: every job gets
//! a monotonically increasing id at enqueue, and an explicit jump raises the
//! `ignore_below` watermark to its own id. Queued jobs under the watermark
//! are skipped before their fetch is issued; an in-flight fetch under the
//! watermark completes normally but its result is reported as
//! [`PageEvent::Ignored`] rather than delivered.
//!
//! Cache and history share one mutex. The lock is only ever held for map and
//! stack operations; fetches and event sends happen outside it.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::cache::{CacheLookup, CachePolicy, PageCache};
use crate::config::Config;
use crate::debounce::Debouncer;
use crate::error::{Error, ErrorKind, Result};
use crate::fetch::{PageFetcher, RemotePage};
use crate::history::{HistoryCommit, PageHistory};
use crate::stats::HitRecorder;
use crate::types::{Direction, Location, Page, PageEvent, PageRequest, Subpage};

/// How long a fetch may run before the UI is told to show a loading state.
const LOADING_DELAY: Duration = Duration::from_millis(250);

/// Cap on queued relative moves; presses beyond this are dropped.
const RELATIVE_BACKLOG_MAX: usize = 16;

/// Engine knobs, normally taken from [`Config`].
#[derive(Debug, Clone, Copy)]
pub struct ProviderSettings {
    /// Cache expiry thresholds.
    pub cache: CachePolicy,
    /// Page reported as current before anything has been visited.
    pub start_page: u16,
    /// Delay before the background refresh of a stale cache hit.
    pub auto_refresh_delay: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            cache: CachePolicy::default(),
            start_page: 100,
            auto_refresh_delay: Duration::from_secs(2),
        }
    }
}

impl From<&Config> for ProviderSettings {
    fn from(config: &Config) -> Self {
        Self {
            cache: config.cache_policy(),
            start_page: config.start_page,
            auto_refresh_delay: config.auto_refresh_delay(),
        }
    }
}

struct Job {
    id: u64,
    kind: JobKind,
}

#[derive(Debug, Clone, Copy)]
enum JobKind {
    Absolute { location: Location, refresh: bool },
    Relative(Direction),
}

struct NavState {
    cache: PageCache,
    history: PageHistory,
}

struct EngineInner {
    weak: Weak<EngineInner>,
    state: Mutex<NavState>,
    events: UnboundedSender<PageEvent>,
    fetcher: Arc<dyn PageFetcher>,
    recorder: Option<Arc<dyn HitRecorder>>,
    jobs: Mutex<Option<UnboundedSender<Job>>>,
    job_source: Mutex<Option<UnboundedReceiver<Job>>>,
    next_job_id: AtomicU64,
    ignore_below: AtomicU64,
    last_settled: AtomicU64,
    worker_started: AtomicBool,
    relative_backlog: AtomicUsize,
    pending_absolute: Mutex<Option<PendingAbsolute>>,
    refresh_timer: Debouncer,
    auto_refresh_delay: Duration,
}

#[derive(Debug, Clone, Copy)]
struct PendingAbsolute {
    location: Location,
    refresh: bool,
    job_id: u64,
}

/// Public surface of the navigation engine.
///
/// Construct with [`PageProvider::new`]; the returned receiver is the single
/// event stream, meant to be drained by whatever task owns the UI. All
/// methods are non-blocking and may be called from any task or thread, but
/// the provider must live inside a tokio runtime (the consumer and timers
/// are spawned tasks).
pub struct PageProvider {
    inner: Arc<EngineInner>,
}

impl PageProvider {
    /// Create an engine with the given settings and collaborators.
    ///
    /// `recorder` receives a fire-and-forget `(source, destination)` pair for
    /// every committed navigation.
    #[must_use]
    pub fn new(
        settings: ProviderSettings,
        fetcher: Arc<dyn PageFetcher>,
        recorder: Option<Arc<dyn HitRecorder>>,
    ) -> (Self, UnboundedReceiver<PageEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();

        let inner = Arc::new_cyclic(|weak| EngineInner {
            weak: weak.clone(),
            state: Mutex::new(NavState {
                cache: PageCache::new(settings.cache),
                history: PageHistory::new(settings.start_page),
            }),
            events: events_tx,
            fetcher,
            recorder,
            jobs: Mutex::new(Some(jobs_tx)),
            job_source: Mutex::new(Some(jobs_rx)),
            next_job_id: AtomicU64::new(0),
            ignore_below: AtomicU64::new(0),
            last_settled: AtomicU64::new(0),
            worker_started: AtomicBool::new(false),
            relative_backlog: AtomicUsize::new(0),
            pending_absolute: Mutex::new(None),
            refresh_timer: Debouncer::new(),
            auto_refresh_delay: settings.auto_refresh_delay,
        });

        (Self { inner }, events_rx)
    }

    /// The location currently on screen (top of history).
    #[must_use]
    pub fn current_location(&self) -> Location {
        self.inner.state().history.current()
    }

    /// Cached sub-page for the current location, when present.
    #[must_use]
    pub fn current_subpage(&self) -> Option<Subpage> {
        let state = self.inner.state();
        let current = state.history.current();
        state
            .cache
            .get(current.page)
            .and_then(|page| page.subpage(current.sub))
            .cloned()
    }

    /// Jump to a location. Served from the cache when fresh enough,
    /// otherwise queued for fetching.
    pub fn set(&self, location: Location) {
        if !self.inner.try_cached(location) {
            self.inner.enqueue(JobKind::Absolute {
                location,
                refresh: false,
            });
        }
    }

    /// Jump to a page at sub-page 0.
    pub fn set_page(&self, page: u16) {
        self.set(Location::new(page, 0));
    }

    /// Reload the current location from the server, bypassing the cache.
    /// Does not disturb history.
    pub fn refresh(&self) {
        let current = self.inner.state().history.current();
        self.inner.enqueue(JobKind::Absolute {
            location: current,
            refresh: true,
        });
    }

    /// Navigate to the previously visited page. No-op when there is nothing
    /// to go back to.
    pub fn back(&self) {
        let revealed = self.inner.state().history.back();
        if let Some(location) = revealed {
            self.set(location);
        }
    }

    /// Jump to the page visited before the current one, remembering the
    /// current one so the jump can be taken back with the same key.
    pub fn toggle_previous(&self) {
        let revealed = self.inner.state().history.toggle_previous();
        if let Some(location) = revealed {
            self.set(location);
        }
    }

    /// Queue a move to the next existing page.
    pub fn next_page(&self) {
        self.inner.enqueue(JobKind::Relative(Direction::Next));
    }

    /// Queue a move to the previous existing page.
    pub fn prev_page(&self) {
        self.inner.enqueue(JobKind::Relative(Direction::Prev));
    }

    /// Show the next sub-page of the current page, wrapping around. Cache
    /// only; never touches the network.
    pub fn next_subpage(&self) {
        self.cycle_subpage(Direction::Next);
    }

    /// Show the previous sub-page of the current page, wrapping around.
    /// Cache only; never touches the network.
    pub fn prev_subpage(&self) {
        self.cycle_subpage(Direction::Prev);
    }

    /// Shut the engine down: cancel timers, disable the queue and let the
    /// consumer exit. Queued work is discarded without fetching.
    pub fn stop(&self) {
        debug!("stopping navigation engine");
        self.inner.refresh_timer.stop();
        self.inner.ignore_below.store(u64::MAX, Ordering::SeqCst);
        self.inner.jobs.lock().expect("job lock poisoned").take();
    }

    fn cycle_subpage(&self, direction: Direction) {
        let (subpage, next) = {
            let mut state = self.inner.state();
            let current = state.history.current();

            let picked = state.cache.get(current.page).and_then(|page| {
                let count = page.subpages.len();
                if count == 0 {
                    return None;
                }
                let count = i64::try_from(count).ok()?;
                let sub = i64::try_from(current.sub).ok()?;
                let next = (sub + i64::from(direction.delta())).rem_euclid(count);
                let next = usize::try_from(next).ok()?;
                page.subpage(next).map(|sub| (sub.clone(), next))
            });

            let Some((subpage, next)) = picked else {
                return;
            };
            state.history.replace_top_sub(next);
            (subpage, next)
        };

        debug!("subpage {next} of {}", subpage.location.page);
        self.inner.emit(PageEvent::Loaded {
            subpage,
            cached: true,
            no_change: false,
        });
    }
}

impl Drop for PageProvider {
    fn drop(&mut self) {
        self.stop();
    }
}

impl EngineInner {
    fn state(&self) -> MutexGuard<'_, NavState> {
        self.state.lock().expect("state lock poisoned")
    }

    fn emit(&self, event: PageEvent) {
        if self.events.send(event).is_err() {
            debug!("event listener gone");
        }
    }

    /// Record a visited location, reporting committed page-to-page moves to
    /// the statistics collaborator.
    fn commit_history(&self, location: Location) {
        let commit = self.state().history.add(location);
        if let HistoryCommit::Pushed {
            source: Some(source),
        } = commit
        {
            if let Some(recorder) = &self.recorder {
                recorder.record(source, location.page);
            }
        }
    }

    /// Try to serve `location` from the cache. On a hit the event is emitted
    /// immediately and, when the entry is stale, a delayed background
    /// refresh is scheduled. Returns false on a miss.
    fn try_cached(&self, location: Location) -> bool {
        let (subpage, stale) = {
            let mut state = self.state();
            match state.cache.lookup(location.page) {
                CacheLookup::Miss => return false,
                CacheLookup::Hit { page, stale } => match page.subpage(location.sub) {
                    None => return false,
                    Some(subpage) => (subpage.clone(), stale),
                },
            }
        };

        debug!("cached {}", location.page);
        self.commit_history(subpage.location);
        self.emit(PageEvent::Loaded {
            subpage,
            cached: true,
            no_change: false,
        });

        if stale {
            self.schedule_stale_refresh(location.page);
        }
        true
    }

    /// Arrange a refresh of `page` after the configured delay, unless the
    /// user has moved on by then. Restarting the timer on every stale hit
    /// means rapid paging refreshes only the page the user settles on.
    fn schedule_stale_refresh(&self, page: u16) {
        let weak = self.weak.clone();
        self.refresh_timer.start(self.auto_refresh_delay, move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let current = inner.state().history.current();
            if current.page == page {
                debug!("background refresh of stale page {page}");
                inner.enqueue(JobKind::Absolute {
                    location: current,
                    refresh: true,
                });
            }
        });
    }

    fn enqueue(&self, kind: JobKind) {
        let id = self.next_job_id.fetch_add(1, Ordering::SeqCst) + 1;

        match kind {
            JobKind::Absolute { location, refresh } => {
                let mut pending = self
                    .pending_absolute
                    .lock()
                    .expect("pending lock poisoned");
                if let Some(current) = *pending {
                    if current.location == location && current.refresh == refresh {
                        debug!("duplicate jump to {location} coalesced");
                        return;
                    }
                }
                *pending = Some(PendingAbsolute {
                    location,
                    refresh,
                    job_id: id,
                });
                drop(pending);

                // An explicit jump supersedes everything queued or in flight.
                self.ignore_below.store(id, Ordering::SeqCst);
            },
            JobKind::Relative(_) => {
                if self.relative_backlog.load(Ordering::SeqCst) >= RELATIVE_BACKLOG_MAX {
                    debug!("relative backlog full, move dropped");
                    return;
                }
                self.relative_backlog.fetch_add(1, Ordering::SeqCst);
            },
        }

        let sender = self.jobs.lock().expect("job lock poisoned");
        match sender.as_ref() {
            Some(tx) => {
                if tx.send(Job { id, kind }).is_ok() {
                    drop(sender);
                    self.ensure_worker();
                }
            },
            None => debug!("engine stopped, job dropped"),
        }
    }

    fn ensure_worker(&self) {
        if self.worker_started.swap(true, Ordering::SeqCst) {
            return;
        }
        let source = self
            .job_source
            .lock()
            .expect("job source lock poisoned")
            .take();
        if let (Some(jobs), Some(inner)) = (source, self.weak.upgrade()) {
            tokio::spawn(consume(inner, jobs));
        }
    }

    async fn process_absolute(&self, id: u64, location: Location, refresh: bool) {
        let request = PageRequest::absolute(location, refresh);
        self.arm_loading(id, request);
        let outcome = self.fetcher.fetch(location.page, None).await;
        self.finish(id, request, outcome);
    }

    async fn process_relative(&self, id: u64, direction: Direction) {
        let relative_to = self.state().history.current();
        debug!("relative to {relative_to} move {}", direction.delta());
        let target = relative_to.move_to(direction);

        if self.try_cached(target) {
            self.settle(id);
            return;
        }

        let request = PageRequest::relative(target, direction);
        self.arm_loading(id, request);

        let mut outcome = self.fetcher.fetch(relative_to.page, Some(direction)).await;
        if matches!(outcome, Err(Error::NotFound { .. })) {
            // Relative requests fail when the current page itself does not
            // exist (e.g. the user typed an invalid number and then pressed
            // next). One retry against the numeric neighbor recovers that;
            // a second gap is surfaced as a failure.
            outcome = self.fetcher.fetch(target.page, None).await;
        }
        self.finish(id, request, outcome);
    }

    fn finish(&self, id: u64, request: PageRequest, outcome: Result<RemotePage>) {
        self.settle(id);

        if id < self.ignore_below.load(Ordering::SeqCst) {
            debug!("response for {} superseded", request.location);
            self.emit(PageEvent::Ignored(request));
            return;
        }

        match outcome {
            Ok(remote) => self.deliver(request, Page::from(remote)),
            Err(err) => {
                warn!("failed to load {}: {err}", request.location);
                // Record the attempt so back() leads away from the broken page.
                self.commit_history(request.location);
                self.emit(PageEvent::Failed {
                    request,
                    kind: err.kind(),
                    status: err.status(),
                });
            },
        }
    }

    fn deliver(&self, request: PageRequest, page: Page) {
        let (subpage, no_change) = {
            let mut state = self.state();

            let index = if page.subpage(request.location.sub).is_some() {
                request.location.sub
            } else {
                0
            };

            // Change detection compares the displayed sub-page against the
            // copy being replaced; it only matters for refreshes.
            let no_change = request.refresh
                && matches!(
                    (
                        state
                            .cache
                            .get(page.number)
                            .and_then(|previous| previous.subpage(index))
                            .and_then(|subpage| subpage.timestamp),
                        page.subpage(index).and_then(|subpage| subpage.timestamp),
                    ),
                    (Some(previous), Some(new)) if previous == new
                );

            let subpage = page.subpage(index).cloned();
            state.cache.insert(page);
            (subpage, no_change)
        };

        match subpage {
            None => {
                // A well-formed response with nothing to show is treated as
                // a missing page.
                self.emit(PageEvent::Failed {
                    request,
                    kind: ErrorKind::NotFound,
                    status: None,
                });
            },
            Some(subpage) => {
                if !request.refresh {
                    self.commit_history(subpage.location);
                }
                self.emit(PageEvent::Loaded {
                    subpage,
                    cached: false,
                    no_change,
                });
            },
        }
    }

    /// Deliver a delayed `Loading` event unless the request settles first.
    fn arm_loading(&self, id: u64, request: PageRequest) {
        let weak = self.weak.clone();
        tokio::spawn(async move {
            tokio::time::sleep(LOADING_DELAY).await;
            if let Some(inner) = weak.upgrade() {
                // Jobs settle in id order, so anything not yet settled is
                // still in flight.
                if inner.last_settled.load(Ordering::SeqCst) < id {
                    inner.emit(PageEvent::Loading(request));
                }
            }
        });
    }

    fn settle(&self, id: u64) {
        self.last_settled.fetch_max(id, Ordering::SeqCst);
        let mut pending = self
            .pending_absolute
            .lock()
            .expect("pending lock poisoned");
        if matches!(*pending, Some(current) if current.job_id == id) {
            *pending = None;
        }
    }
}

async fn consume(inner: Arc<EngineInner>, mut jobs: UnboundedReceiver<Job>) {
    debug!("consumer started");

    while let Some(job) = jobs.recv().await {
        let superseded = job.id < inner.ignore_below.load(Ordering::SeqCst);
        match job.kind {
            JobKind::Relative(direction) => {
                inner.relative_backlog.fetch_sub(1, Ordering::SeqCst);
                if superseded {
                    // Cleared from the queue before its fetch was issued;
                    // dropped without any event.
                    inner.settle(job.id);
                    continue;
                }
                inner.process_relative(job.id, direction).await;
            },
            JobKind::Absolute { location, refresh } => {
                if superseded {
                    inner.settle(job.id);
                    continue;
                }
                inner.process_absolute(job.id, location, refresh).await;
            },
        }
    }

    debug!("consumer stopped");
}
