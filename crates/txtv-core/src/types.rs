//! Core data types: locations, pages, events.

use chrono::{DateTime, Utc};

use crate::error::ErrorKind;

/// Lowest valid teletext page number.
pub const PAGE_MIN: u16 = 100;
/// Highest valid teletext page number.
pub const PAGE_MAX: u16 = 899;

/// Relative navigation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Towards higher page numbers.
    Next,
    /// Towards lower page numbers.
    Prev,
}

impl Direction {
    /// Page number delta for this direction.
    #[must_use]
    pub const fn delta(self) -> i32 {
        match self {
            Self::Next => 1,
            Self::Prev => -1,
        }
    }
}

/// A position within the service: page number plus sub-page index.
///
/// Sub-page indices are zero-based positions into [`Page::subpages`], not the
/// sub-page numbers reported by the server (those are not guaranteed to be
/// contiguous or to start at 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    /// Page number, normally within [`PAGE_MIN`]..=[`PAGE_MAX`].
    pub page: u16,
    /// Zero-based sub-page index.
    pub sub: usize,
}

impl Location {
    /// Create a location.
    #[must_use]
    pub const fn new(page: u16, sub: usize) -> Self {
        Self { page, sub }
    }

    /// The numerically adjacent page in `direction`, at sub-page 0.
    #[must_use]
    pub fn move_to(self, direction: Direction) -> Self {
        let page = i32::from(self.page) + direction.delta();
        Self {
            page: u16::try_from(page).unwrap_or(self.page),
            sub: 0,
        }
    }

    /// Same page with a different sub-page index.
    #[must_use]
    pub const fn with_sub(self, sub: usize) -> Self {
        Self {
            page: self.page,
            sub,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.page, self.sub)
    }
}

/// One sub-page of content as displayed to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subpage {
    /// Where this sub-page lives.
    pub location: Location,
    /// Raw content lines. Opaque to the engine; the front-end decides how to
    /// present them.
    pub lines: Vec<String>,
    /// Server-side timestamp, when reported. Only used for change detection
    /// on refresh; otherwise opaque.
    pub timestamp: Option<DateTime<Utc>>,
}

/// A fetched page with all of its sub-pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Page number.
    pub number: u16,
    /// Sub-pages in display order; the vec index is the sub-page index.
    pub subpages: Vec<Subpage>,
}

impl Page {
    /// Sub-page at `index`, or `None` when out of range.
    #[must_use]
    pub fn subpage(&self, index: usize) -> Option<&Subpage> {
        self.subpages.get(index)
    }
}

/// What the engine is (or was) loading, as reported in events.
///
/// Distinct from the queued job: by the time an event is emitted the target
/// location and direction have been resolved, so the front-end can tell
/// "loading the next page" apart from "loading page 150".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Resolved target location.
    pub location: Location,
    /// Direction for relative navigation, `None` for absolute jumps.
    pub direction: Option<Direction>,
    /// Whether this request bypassed the cache to re-check the server.
    pub refresh: bool,
}

impl PageRequest {
    /// Request for an absolute jump to `location`.
    #[must_use]
    pub const fn absolute(location: Location, refresh: bool) -> Self {
        Self {
            location,
            direction: None,
            refresh,
        }
    }

    /// Request for a relative move towards `location`.
    #[must_use]
    pub const fn relative(location: Location, direction: Direction) -> Self {
        Self {
            location,
            direction: Some(direction),
            refresh: false,
        }
    }
}

/// Everything the front-end ever hears from the engine.
///
/// Every navigation intent terminates in exactly one of `Loaded`, `Failed`
/// or `Ignored`; `Loading` may precede the terminal event when the fetch is
/// slow enough to be worth signalling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// A fetch has been in flight long enough that the UI should show a
    /// loading state.
    Loading(PageRequest),
    /// A sub-page is ready for display.
    Loaded {
        /// The sub-page to display.
        subpage: Subpage,
        /// True when served from the cache without a network round-trip.
        cached: bool,
        /// True when a refresh found the server content unchanged; the
        /// front-end should skip repainting.
        no_change: bool,
    },
    /// A navigation intent failed; carries enough context for a message.
    Failed {
        /// The request that failed.
        request: PageRequest,
        /// Failure classification.
        kind: ErrorKind,
        /// HTTP status, when the failure came from the server.
        status: Option<u16>,
    },
    /// A response arrived for a request that had been superseded; kept for
    /// bookkeeping (e.g. auto-reload timers), not for display.
    Ignored(PageRequest),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_to_steps_one_page_and_resets_sub() {
        let loc = Location::new(200, 3);
        assert_eq!(loc.move_to(Direction::Next), Location::new(201, 0));
        assert_eq!(loc.move_to(Direction::Prev), Location::new(199, 0));
    }

    #[test]
    fn with_sub_keeps_page() {
        let loc = Location::new(100, 0).with_sub(2);
        assert_eq!(loc, Location::new(100, 2));
    }

    #[test]
    fn subpage_lookup_is_bounds_checked() {
        let page = Page {
            number: 100,
            subpages: vec![Subpage {
                location: Location::new(100, 0),
                lines: vec!["hello".to_string()],
                timestamp: None,
            }],
        };

        assert!(page.subpage(0).is_some());
        assert!(page.subpage(1).is_none());
    }

    #[test]
    fn location_display_uses_dot_notation() {
        assert_eq!(Location::new(100, 2).to_string(), "100.2");
    }
}
