//! # txtv-core
//!
//! Core functionality for txtv - a client for remote teletext services.
//!
//! This crate provides the page navigation and caching engine: it fetches
//! numbered pages (each with sub-pages), supports absolute jumps, relative
//! next/previous moves, sub-page cycling and back-navigation, and keeps an
//! in-memory cache with time-based expiry so navigation feels instantaneous
//! while staying eventually consistent with the server.
//!
//! ## Architecture
//!
//! - **Types**: locations, pages, sub-pages and the event stream
//! - **Cache**: per-page entries with a soft (refresh) and hard (evict)
//!   expiry threshold
//! - **History**: stack of visited locations backing `back()` and the
//!   previous-page toggle
//! - **Provider**: the facade plus a single consumer task that serializes
//!   all fetches and discards superseded results by request id
//! - **Fetch**: the HTTP collaborator, injected as a trait so tests can
//!   script responses
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use txtv_core::{Config, HttpFetcher, PageEvent, PageProvider, Result};
//!
//! # async fn run() -> Result<()> {
//! let config = Config::load()?;
//! let fetcher = Arc::new(HttpFetcher::new(
//!     &config.base_url,
//!     &config.app_id,
//!     &config.app_key,
//! )?);
//!
//! let (provider, mut events) = PageProvider::new((&config).into(), fetcher, None);
//! provider.set_page(config.start_page);
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         PageEvent::Loaded { subpage, .. } => println!("{}", subpage.location),
//!         PageEvent::Failed { request, .. } => eprintln!("failed: {}", request.location),
//!         PageEvent::Loading(_) | PageEvent::Ignored(_) => {},
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! The facade never blocks its caller: operations either answer from the
//! cache or enqueue a job for the consumer task. Jobs are processed strictly
//! first-in first-out with at most one fetch in flight, and an explicit jump
//! supersedes any queued or in-flight work. The provider must live inside a
//! tokio runtime.

/// In-memory page cache with two-tier expiry
pub mod cache;
/// Configuration loading
pub mod config;
/// Restartable one-shot timer used for refresh staging
pub mod debounce;
/// Error types and result alias
pub mod error;
/// Per-page favorite shortcuts
pub mod favorites;
/// HTTP fetching of remote pages
pub mod fetch;
/// Navigation history stack
pub mod history;
/// The navigation engine and its facade
pub mod provider;
/// Navigation frequency statistics
pub mod stats;
/// Core data types
pub mod types;

// Re-export commonly used types
pub use cache::{CacheLookup, CachePolicy, PageCache};
pub use config::Config;
pub use debounce::Debouncer;
pub use error::{Error, ErrorKind, Result};
pub use favorites::Favorites;
pub use fetch::{HttpFetcher, PageFetcher, RemotePage};
pub use history::{HistoryCommit, PageHistory};
pub use provider::{PageProvider, ProviderSettings};
pub use stats::{HitRecorder, NavigationStats, PageHit};
pub use types::{
    Direction, Location, PAGE_MAX, PAGE_MIN, Page, PageEvent, PageRequest, Subpage,
};
