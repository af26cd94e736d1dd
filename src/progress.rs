use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

/// Receives analysis progress on every status poll
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, frames_complete: u64, frames_total: u64);
}

impl<F> ProgressObserver for F
where
    F: Fn(u64, u64) + Send + Sync,
{
    fn on_progress(&self, frames_complete: u64, frames_total: u64) {
        self(frames_complete, frames_total)
    }
}

/// Percentage shown for a poll tick, clamped to `[0, 100]`
pub fn percent(frames_complete: u64, frames_total: u64) -> u64 {
    if frames_total == 0 {
        return 0;
    }
    (frames_complete.saturating_mul(100) / frames_total).min(100)
}

/// Progress tracker for videoredact operations
pub struct ProgressTracker {
    multi: Arc<MultiProgress>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            multi: Arc::new(MultiProgress::new()),
        }
    }

    /// Percentage bar for the remote analysis
    pub fn create_percent_bar(&self, message: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new(100));
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}% {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        pb.set_message(message.to_string());
        pb
    }

    /// Indeterminate spinner for unknown-duration operations
    pub fn create_spinner(&self, message: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// [`ProgressObserver`] backed by an indicatif bar
pub struct AnalysisProgressBar {
    bar: ProgressBar,
}

impl AnalysisProgressBar {
    pub fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

impl ProgressObserver for AnalysisProgressBar {
    fn on_progress(&self, frames_complete: u64, frames_total: u64) {
        self.bar.set_position(percent(frames_complete, frames_total));
    }
}

/// Wrapper for operations with optional progress display
pub struct ProgressOperation {
    pub tracker: ProgressTracker,
    pub enabled: bool,
}

impl ProgressOperation {
    pub fn new(enabled: bool) -> Self {
        Self {
            tracker: ProgressTracker::new(),
            enabled,
        }
    }

    /// Observer for the analysis wait, or `None` when display is off
    pub fn analysis_observer(&self, message: &str) -> Option<AnalysisProgressBar> {
        if self.enabled {
            Some(AnalysisProgressBar::new(self.tracker.create_percent_bar(message)))
        } else {
            None
        }
    }

    /// Run an async operation under a spinner if enabled
    pub async fn with_spinner<Fut, T, E>(&self, message: &str, operation: Fut) -> Result<T, E>
    where
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        if !self.enabled {
            return operation.await;
        }

        let pb = self.tracker.create_spinner(message);
        let result = operation.await;
        match result {
            Ok(_) => pb.finish_with_message(format!("✓ {}", message)),
            Err(_) => pb.abandon_with_message(format!("✗ {}", message)),
        }
        result
    }
}
