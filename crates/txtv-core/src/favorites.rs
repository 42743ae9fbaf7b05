//! Per-page favorite shortcuts.
//!
//! A plain text file maps pages to the shortcut pages shown while viewing
//! them. Each line is `<page>: <list>`, `<start>-<end>: <list>` or
//! `*: <list>`, where the list is comma-separated page numbers. An invalid or
//! empty list entry marks a gap, so favorites can be pinned to specific
//! shortcut slots:
//!
//! ```text
//! *: 100,200,300,400
//! 100-199: 101,102,,120
//! 235: 236
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::types::{PAGE_MAX, PAGE_MIN};

static LINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\*|[1-8]\d{2}|[1-8]\d{2}-[1-8]\d{2})\s*:\s*([\d,]+)\s*$")
        .expect("favorites pattern is valid")
});

/// Favorite pages keyed by the page they are shown on.
///
/// A `None` slot is a gap left by an invalid or empty entry in the file.
#[derive(Debug, Default)]
pub struct Favorites {
    by_page: HashMap<u16, Vec<Option<u16>>>,
}

impl Favorites {
    /// Load favorites from `path`. A missing file yields an empty set; an
    /// unreadable one is logged and skipped.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) => {
                warn!("error loading favorites from {}: {e}", path.display());
                Self::default()
            },
        }
    }

    /// Parse favorites from file content. Unrecognized lines are ignored.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut by_page: HashMap<u16, Vec<Option<u16>>> = HashMap::new();

        for line in content.lines() {
            let Some(captures) = LINE_PATTERN.captures(line) else {
                continue;
            };

            let range = match &captures[1] {
                "*" => PAGE_MIN..=PAGE_MAX,
                pages => match pages.split_once('-') {
                    Some((start, end)) => {
                        let (Ok(start), Ok(end)) = (start.parse(), end.parse()) else {
                            continue;
                        };
                        start..=end
                    },
                    None => match pages.parse::<u16>() {
                        Ok(page) => page..=page,
                        Err(_) => continue,
                    },
                },
            };

            let slots: Vec<Option<u16>> = captures[2]
                .split(',')
                .map(|entry| {
                    entry
                        .trim()
                        .parse::<u16>()
                        .ok()
                        .filter(|page| (PAGE_MIN..=PAGE_MAX).contains(page))
                })
                .collect();

            for page in range {
                by_page.insert(page, slots.clone());
            }
        }

        Self { by_page }
    }

    /// Shortcut slots for `page`, when any are configured.
    #[must_use]
    pub fn favorites_for(&self, page: u16) -> Option<&[Option<u16>]> {
        self.by_page.get(&page).map(Vec::as_slice)
    }

    /// True when no favorites are configured at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_page.is_empty()
    }
}
