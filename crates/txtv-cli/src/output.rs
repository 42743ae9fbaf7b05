//! Terminal rendering of page events.
//!
//! Page content is printed verbatim - teletext lines carry their own layout.
//! Failure messages mirror what the engine reports: a direction-flavored
//! message for relative moves, a page-flavored one for jumps.

use colored::Colorize;
use is_terminal::IsTerminal;
use txtv_core::{Direction, ErrorKind, PageRequest, Subpage};

/// Shortcut key labels, in slot order.
pub const SHORTCUT_KEYS: [char; 4] = ['R', 'G', 'Y', 'B'];

/// Print a sub-page with its shortcut row.
pub fn render_subpage(subpage: &Subpage, shortcuts: &[Option<u16>]) {
    clear_screen();
    for line in &subpage.lines {
        println!("{line}");
    }

    let row = shortcut_row(shortcuts);
    if !row.is_empty() {
        println!();
        println!("{row}");
    }
}

/// Print the delayed loading notice.
pub fn render_loading(request: &PageRequest) {
    println!("Loading page {}...", request.location.page);
}

/// Print a failure message.
pub fn render_failure(request: &PageRequest, kind: ErrorKind, status: Option<u16>) {
    println!("{}", failure_message(request, kind, status));
}

/// Compose the user-facing message for a failed request.
#[must_use]
pub fn failure_message(request: &PageRequest, kind: ErrorKind, status: Option<u16>) -> String {
    let status = status.map_or_else(|| "?".to_string(), |code| code.to_string());

    match request.direction {
        Some(Direction::Next) => format!("Error loading next page ({status})"),
        Some(Direction::Prev) => format!("Error loading previous page ({status})"),
        None => match kind {
            ErrorKind::NotFound => format!("Page {} not found", request.location.page),
            ErrorKind::Other => {
                format!("Error loading page {} ({status})", request.location.page)
            },
        },
    }
}

/// Render the colored shortcut slots, skipping gaps.
#[must_use]
pub fn shortcut_row(slots: &[Option<u16>]) -> String {
    let parts: Vec<String> = slots
        .iter()
        .enumerate()
        .filter_map(|(index, slot)| {
            let page = (*slot)?;
            let label = format!("{}:{page}", SHORTCUT_KEYS.get(index)?);
            let painted = match index {
                0 => label.red(),
                1 => label.green(),
                2 => label.yellow(),
                _ => label.blue(),
            };
            Some(painted.to_string())
        })
        .collect();
    parts.join("  ")
}

fn clear_screen() {
    if std::io::stdout().is_terminal() {
        print!("\x1b[2J\x1b[H");
    }
}
