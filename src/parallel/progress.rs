//! Progress bar over the files of a batch

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::debug;

const TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({per_sec}, {eta}) {msg}";

/// Thread-safe progress display; a hidden bar when disabled
#[derive(Clone)]
pub struct BatchProgress {
    bar: ProgressBar,
}

impl BatchProgress {
    /// Create a bar for `total` files, drawn on stderr when `visible`
    pub fn new(total: u64, visible: bool) -> Self {
        if !visible {
            return Self::hidden();
        }

        let bar = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
        match ProgressStyle::default_bar().template(TEMPLATE) {
            Ok(style) => bar.set_style(style.progress_chars("#>-")),
            Err(e) => debug!("Falling back to default progress style: {}", e),
        }

        Self { bar }
    }

    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Count one file as finished, whatever its outcome
    pub fn file_done(&self, name: &str) {
        self.bar.set_message(name.to_string());
        self.bar.inc(1);
    }

    /// Run `f` with the bar cleared, so log lines do not tear it
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.bar.suspend(f)
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("done");
    }
}
