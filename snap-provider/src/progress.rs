use indicatif::{ProgressBar, ProgressStyle};

/// Receives progress observations while an action is polled.
///
/// Purely informational: nothing in the job's decisions depends on what a
/// sink does with the values.
pub trait ProgressSink {
    /// Reports the latest completion percentage (0..=100).
    fn set_progress(&self, percent: u8);
    /// Marks the tracked action as finished.
    fn finish(&self, message: &str);
}

/// A sink that discards everything, for quiet runs and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn set_progress(&self, _percent: u8) {}
    fn finish(&self, _message: &str) {}
}

/// Terminal progress bar for snapshot creation.
pub struct ActionProgressBar {
    bar: ProgressBar,
}

impl ActionProgressBar {
    pub fn new(label: &str) -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        bar.set_message(label.to_string());
        Self { bar }
    }
}

impl ProgressSink for ActionProgressBar {
    fn set_progress(&self, percent: u8) {
        // Providers occasionally report a lower value after a higher one.
        let next = u64::from(percent).max(self.bar.position());
        self.bar.set_position(next);
    }

    fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}
