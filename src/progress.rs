//! Progress bars for the search and crawl phases.
//!
//! Bars draw to stderr and stay hidden when stderr is not a terminal.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str = "{msg:>10} [{bar:40.cyan/blue}] {pos}/{len} ({elapsed})";
const SPINNER_TEMPLATE: &str = "{spinner} {msg} ({elapsed})";

/// Bar over a known number of items.
pub fn bar(len: usize, message: &'static str) -> ProgressBar {
    let style = ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    ProgressBar::new(len as u64).with_style(style).with_message(message)
}

/// Spinner for work of unknown length.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let style = ProgressStyle::with_template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let spinner = ProgressBar::new_spinner().with_style(style).with_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}
