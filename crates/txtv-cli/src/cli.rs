//! Argument parsing for the `txtv` binary.

use std::path::PathBuf;

use clap::Parser;

/// Terminal client for teletext services.
///
/// Starts an interactive session: type a page number to jump to it, `n`/`p`
/// to move to the next or previous page, `.`/`,` to cycle sub-pages, `b` to
/// go back, `0` to toggle between the two most recent pages, `r` to reload
/// and `q` to quit. Capital `R`/`G`/`Y`/`B` follow the shortcut slots shown
/// under each page.
#[derive(Parser, Debug)]
#[command(name = "txtv")]
#[command(version)]
#[command(about = "txtv - terminal client for teletext services", long_about = None)]
pub struct Cli {
    /// Page to open at startup (overrides the configured start page)
    #[arg(value_name = "PAGE")]
    pub page: Option<u16>,

    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE", env = "TXTV_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Show debug output
    #[arg(long)]
    pub debug: bool,
}
