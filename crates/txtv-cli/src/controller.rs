//! Interactive session: wires the engine to stdin input and terminal output.
//!
//! Two tasks cooperate: the renderer drains the engine's event stream and
//! owns the idle auto-reload timer, while the input loop turns typed
//! characters into facade calls. The shortcut slots shown under a page are
//! shared between them so the selection keys can resolve what is on screen.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};
use txtv_core::{
    Config, Debouncer, Favorites, HitRecorder, HttpFetcher, NavigationStats, PageEvent,
    PageProvider,
};

use crate::cli::Cli;
use crate::digits::DigitBuffer;
use crate::output;

type Slots = [Option<u16>; 4];

/// Run the interactive session until the user quits.
pub async fn run(cli: &Cli, config: Config) -> Result<()> {
    let fetcher = Arc::new(HttpFetcher::new(
        &config.base_url,
        &config.app_id,
        &config.app_key,
    )?);

    let stats = match (config.stats_enabled, config.stats_path()) {
        (true, Some(path)) => NavigationStats::open(path, true),
        _ => NavigationStats::disabled(),
    };
    let favorites = config
        .favorites_path()
        .map(|path| Favorites::load(&path))
        .unwrap_or_default();

    let recorder: Arc<dyn HitRecorder> = Arc::new(stats.clone());
    let (provider, events) = PageProvider::new((&config).into(), fetcher, Some(recorder));
    let provider = Arc::new(provider);

    let slots = Arc::new(Mutex::new(Slots::default()));
    let renderer = tokio::spawn(render_events(
        events,
        Arc::clone(&provider),
        stats.clone(),
        favorites,
        Arc::clone(&slots),
        config.auto_refresh_interval(),
    ));

    provider.set_page(cli.page.unwrap_or(config.start_page));

    input_loop(&provider, &slots).await?;

    provider.stop();
    if let Err(e) = stats.flush() {
        warn!("could not save navigation statistics: {e}");
    }
    renderer.abort();
    Ok(())
}

async fn render_events(
    mut events: UnboundedReceiver<PageEvent>,
    provider: Arc<PageProvider>,
    stats: NavigationStats,
    favorites: Favorites,
    slots: Arc<Mutex<Slots>>,
    reload_interval: Duration,
) {
    let reloader = Debouncer::new();

    while let Some(event) = events.recv().await {
        match &event {
            PageEvent::Loaded {
                subpage, no_change, ..
            } => {
                if *no_change {
                    debug!("{} unchanged, not repainting", subpage.location);
                } else {
                    let current = shortcut_slots(subpage.location.page, &favorites, &stats);
                    *slots.lock().expect("slots lock poisoned") = current;
                    output::render_subpage(subpage, &current);
                }
            },
            PageEvent::Loading(request) => output::render_loading(request),
            PageEvent::Failed {
                request,
                kind,
                status,
            } => output::render_failure(request, *kind, *status),
            PageEvent::Ignored(request) => debug!("superseded response for {}", request.location),
        }

        // Any activity, including ignored responses, pushes the idle reload
        // further out; an undisturbed minute reloads the visible page.
        let provider = Arc::clone(&provider);
        reloader.start(reload_interval, move || provider.refresh());
    }
}

async fn input_loop(provider: &Arc<PageProvider>, slots: &Arc<Mutex<Slots>>) -> Result<()> {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut digits = DigitBuffer::new();

    while let Some(line) = lines.next_line().await? {
        for key in line.trim().chars() {
            // A zero on an empty buffer is the previous-page toggle, any
            // other digit feeds the page number entry.
            if key.is_ascii_digit() && !(key == '0' && digits.is_empty()) {
                if let Some(page) = digits.push(key) {
                    provider.set_page(page);
                }
                continue;
            }

            digits.end_input();
            match key {
                '0' => provider.toggle_previous(),
                'n' => provider.next_page(),
                'p' => provider.prev_page(),
                '.' => provider.next_subpage(),
                ',' => provider.prev_subpage(),
                'b' => provider.back(),
                'r' => provider.refresh(),
                'q' => return Ok(()),
                key if output::SHORTCUT_KEYS.contains(&key) => {
                    if let Some(page) = shortcut_for(key, slots) {
                        provider.set_page(page);
                    }
                },
                '?' => print_help(),
                _ => {},
            }
        }

        // End of line abandons a partial page number.
        digits.end_input();
    }

    Ok(())
}

fn shortcut_for(key: char, slots: &Arc<Mutex<Slots>>) -> Option<u16> {
    let index = output::SHORTCUT_KEYS.iter().position(|&k| k == key)?;
    slots.lock().expect("slots lock poisoned")[index]
}

/// Build the four shortcut slots for a page: pinned favorites keep their
/// positions (gaps included), then the most visited destinations fill what
/// is left.
fn shortcut_slots(page: u16, favorites: &Favorites, stats: &NavigationStats) -> Slots {
    let mut slots = Slots::default();

    if let Some(configured) = favorites.favorites_for(page) {
        for (slot, value) in slots.iter_mut().zip(configured.iter()) {
            *slot = *value;
        }
    }

    let taken: Vec<u16> = slots.iter().flatten().copied().collect();
    let open = slots.iter().filter(|slot| slot.is_none()).count();
    for hit in stats.top_hits(page, open, &taken) {
        if let Some(slot) = slots.iter_mut().find(|slot| slot.is_none()) {
            *slot = Some(hit);
        }
    }

    slots
}

fn print_help() {
    println!("digits  jump to page        n/p  next/previous page");
    println!(".  next sub-page            ,    previous sub-page");
    println!("b  back                     0    toggle previous page");
    println!("r  reload                   R/G/Y/B  follow shortcut");
    println!("q  quit");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn favorites_keep_their_slot_positions() {
        let favorites = Favorites::parse("100: 101,,103\n");
        let stats = NavigationStats::disabled();

        let slots = shortcut_slots(100, &favorites, &stats);
        assert_eq!(slots, [Some(101), None, Some(103), None]);
    }

    #[tokio::test]
    async fn top_hits_fill_the_gaps() {
        let dir = tempfile::tempdir().expect("tempdir");
        let favorites = Favorites::parse("100: 101\n");
        let stats = NavigationStats::open(dir.path().join("history.json"), true);
        for _ in 0..3 {
            stats.record(100, 350);
        }

        let slots = shortcut_slots(100, &favorites, &stats);
        assert_eq!(slots, [Some(101), Some(350), None, None]);
    }

    #[tokio::test]
    async fn pinned_favorites_are_not_suggested_again() {
        let dir = tempfile::tempdir().expect("tempdir");
        let favorites = Favorites::parse("100: 350\n");
        let stats = NavigationStats::open(dir.path().join("history.json"), true);
        for _ in 0..3 {
            stats.record(100, 350);
        }

        let slots = shortcut_slots(100, &favorites, &stats);
        assert_eq!(slots, [Some(350), None, None, None]);
    }
}
