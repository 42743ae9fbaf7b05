//! Navigation history stack.
//!
//! Top of the stack is the current location. Consecutive entries never share
//! a page number: navigating to a different sub-page of the current page
//! rewrites the top entry instead of pushing, so `back()` steps over pages,
//! not sub-page flips.

use crate::types::Location;

/// What [`PageHistory::add`] did with a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryCommit {
    /// A new entry was pushed; `source` is the page navigated away from,
    /// when there was one.
    Pushed {
        /// Page the user came from.
        source: Option<u16>,
    },
    /// The top entry was rewritten (same page, new sub index).
    Updated,
}

/// Stack of visited locations.
pub struct PageHistory {
    stack: Vec<Location>,
    home: Location,
}

impl PageHistory {
    /// Create an empty history whose implicit current location is
    /// `{start_page, 0}`.
    #[must_use]
    pub const fn new(start_page: u16) -> Self {
        Self {
            stack: Vec::new(),
            home: Location::new(start_page, 0),
        }
    }

    /// The current location; the start page when nothing has been visited.
    #[must_use]
    pub fn current(&self) -> Location {
        self.stack.last().copied().unwrap_or(self.home)
    }

    /// Record a visited location.
    ///
    /// Pushes only when the stack is empty or the top entry is for a
    /// different page; a same-page add rewrites the top so the sub index
    /// stays current.
    pub fn add(&mut self, location: Location) -> HistoryCommit {
        if let Some(top) = self.stack.last_mut() {
            if top.page == location.page {
                *top = location;
                return HistoryCommit::Updated;
            }
        }

        let source = self.stack.last().map(|previous| previous.page);
        self.stack.push(location);
        HistoryCommit::Pushed { source }
    }

    /// Pop the current location, revealing the previous one.
    ///
    /// No-op (returns `None`) when one entry or less remains; the bottom
    /// entry always stays.
    pub fn back(&mut self) -> Option<Location> {
        if self.stack.len() > 1 {
            self.stack.pop();
            Some(self.current())
        } else {
            None
        }
    }

    /// Swap the top two entries, returning the location that surfaced.
    ///
    /// Together with the page-equality check in [`add`](Self::add), applying
    /// this twice puts the stack back in its prior order.
    pub fn toggle_previous(&mut self) -> Option<Location> {
        if self.stack.len() > 1 {
            let current = self.stack.pop()?;
            let previous = self.stack.pop()?;
            self.stack.push(current);
            Some(previous)
        } else {
            None
        }
    }

    /// Rewrite the top entry with a new sub-page index.
    ///
    /// Used when cycling sub-pages so that a later `back()` does not land on
    /// a stale sub index.
    pub fn replace_top_sub(&mut self, sub: usize) {
        match self.stack.last_mut() {
            Some(top) => *top = top.with_sub(sub),
            None => self.stack.push(self.home.with_sub(sub)),
        }
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// True when nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_reports_start_page() {
        let history = PageHistory::new(100);
        assert_eq!(history.current(), Location::new(100, 0));
    }

    #[test]
    fn add_pushes_distinct_pages() {
        let mut history = PageHistory::new(100);
        assert_eq!(
            history.add(Location::new(100, 0)),
            HistoryCommit::Pushed { source: None }
        );
        assert_eq!(
            history.add(Location::new(201, 0)),
            HistoryCommit::Pushed { source: Some(100) }
        );
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn add_never_duplicates_consecutive_pages() {
        let mut history = PageHistory::new(100);
        history.add(Location::new(100, 0));
        assert_eq!(history.add(Location::new(100, 2)), HistoryCommit::Updated);

        assert_eq!(history.len(), 1);
        // The sub index still moved.
        assert_eq!(history.current(), Location::new(100, 2));
    }

    #[test]
    fn back_is_a_noop_with_a_single_entry() {
        let mut history = PageHistory::new(100);
        history.add(Location::new(100, 0));
        assert_eq!(history.back(), None);
        assert_eq!(history.current(), Location::new(100, 0));
    }

    #[test]
    fn back_reveals_the_previous_page() {
        let mut history = PageHistory::new(100);
        history.add(Location::new(100, 0));
        history.add(Location::new(202, 1));
        assert_eq!(history.back(), Some(Location::new(100, 0)));
    }

    #[test]
    fn toggle_previous_twice_restores_order() {
        let mut history = PageHistory::new(100);
        history.add(Location::new(100, 0));
        history.add(Location::new(202, 0));

        let first = history.toggle_previous().expect("two entries");
        assert_eq!(first, Location::new(100, 0));
        // The facade re-adds what toggle revealed; mimic that.
        history.add(first);

        let second = history.toggle_previous().expect("two entries");
        assert_eq!(second, Location::new(202, 0));
        history.add(second);

        assert_eq!(history.current(), Location::new(202, 0));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn toggle_previous_requires_two_entries() {
        let mut history = PageHistory::new(100);
        history.add(Location::new(100, 0));
        assert_eq!(history.toggle_previous(), None);
    }

    #[test]
    fn replace_top_sub_rewrites_in_place() {
        let mut history = PageHistory::new(100);
        history.add(Location::new(300, 0));
        history.replace_top_sub(2);
        assert_eq!(history.current(), Location::new(300, 2));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn replace_top_sub_on_empty_history_records_home() {
        let mut history = PageHistory::new(100);
        history.replace_top_sub(1);
        assert_eq!(history.current(), Location::new(100, 1));
    }
}
