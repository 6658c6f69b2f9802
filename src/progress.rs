//! # Progress Tracking Module
//!
//! Progress bar `indicatif` per i batch di ottimizzazione e geotag.
//!
//! ## Responsabilità:
//! - Barra di progresso per batch (nascosta con output JSON o progress disabilitato)
//! - Spinner per operazioni indeterminate (geocoding, packaging)
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:04] [========================>---------------] 6/10 (60%) optimize photo_web.jpg
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::debug;

/// Manages progress reporting for a batch
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a progress manager; a hidden bar draws nothing
    pub fn new(total: u64, visible: bool) -> Self {
        if !visible {
            return Self { bar: ProgressBar::hidden() };
        }

        let bar = ProgressBar::new(total);
        match ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            Ok(style) => bar.set_style(style.progress_chars("=>-")),
            Err(e) => debug!("Falling back to default progress style: {}", e),
        }
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(message: &str, visible: bool) -> ProgressBar {
        if !visible {
            return ProgressBar::hidden();
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));

        spinner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_bar_still_counts() {
        let progress = ProgressManager::new(3, false);
        progress.update("a.jpg");
        progress.update("b.jpg");
        assert_eq!(progress.position(), 2);
        progress.finish("done");
    }
}
