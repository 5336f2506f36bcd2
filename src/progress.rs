//! Terminal progress display for the CLI
//!
//! Page-level progress is shown with an `indicatif` bar; step messages and
//! summaries are printed according to the selected [`OutputMode`].

use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};

use crate::pipeline::{CleanOutput, PageOutcome, ProgressCallback};

/// Progress bar template
const BAR_TEMPLATE: &str = "  {spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} pages {msg}";

/// Output verbosity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Errors only
    Quiet,
    /// Progress bar and summary
    #[default]
    Normal,
    /// Step messages as well
    Verbose,
    /// Debug messages as well
    VeryVerbose,
}

impl OutputMode {
    /// Create OutputMode from CLI flags
    pub fn from_flags(quiet: bool, verbosity: u8) -> Self {
        if quiet {
            return OutputMode::Quiet;
        }
        match verbosity {
            0 => OutputMode::Normal,
            1 => OutputMode::Verbose,
            _ => OutputMode::VeryVerbose,
        }
    }

    /// Check if output should be shown at this mode
    pub fn should_show(&self, required: OutputMode) -> bool {
        use OutputMode::*;
        match (self, required) {
            (Quiet, _) => false,
            (Normal, Quiet | Normal) => true,
            (Verbose, Quiet | Normal | Verbose) => true,
            (VeryVerbose, _) => true,
            _ => false,
        }
    }
}

/// [`ProgressCallback`] that drives a terminal progress bar
pub struct CliProgress {
    mode: OutputMode,
    bar: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            bar: Mutex::new(None),
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    fn with_bar(&self, f: impl FnOnce(&mut Option<ProgressBar>)) {
        if let Ok(mut bar) = self.bar.lock() {
            f(&mut bar);
        }
    }

    fn new_bar(total: usize) -> ProgressBar {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar
    }

    /// Print the per-document result summary
    pub fn print_summary(&self, output: &CleanOutput) {
        if !self.mode.should_show(OutputMode::Normal) {
            return;
        }
        let failed = output.failed_pages();
        println!("Pages:      {}", output.page_count());
        println!("Redactions: {}", output.redactions());
        println!("Failed:     {}", failed.len());

        if self.mode.should_show(OutputMode::Verbose) {
            for outcome in &output.pages {
                match outcome {
                    PageOutcome::Cleaned(report) => println!(
                        "  page {}: {} redactions, {} masks",
                        report.page_index + 1,
                        report.redactions,
                        report.masks_drawn
                    ),
                    PageOutcome::Failed { page, reason } => {
                        println!("  page {}: FAILED ({reason})", page + 1)
                    }
                }
            }
        } else if !failed.is_empty() {
            let pages: Vec<String> = failed.iter().map(|p| (p + 1).to_string()).collect();
            println!("  failed pages: {}", pages.join(", "));
        }
    }
}

impl ProgressCallback for CliProgress {
    fn on_step_start(&self, step: &str) {
        if self.mode.should_show(OutputMode::Verbose) {
            println!("  {step}");
        }
    }

    fn on_step_progress(&self, current: usize, total: usize) {
        if !self.mode.should_show(OutputMode::Normal) {
            return;
        }
        self.with_bar(|bar| {
            let bar = bar.get_or_insert_with(|| Self::new_bar(total));
            bar.set_position(current as u64);
        });
    }

    fn on_step_complete(&self, step: &str, message: &str) {
        self.with_bar(|bar| {
            if let Some(bar) = bar.take() {
                bar.finish_and_clear();
            }
        });
        if self.mode.should_show(OutputMode::Verbose) {
            println!("    {step}: {message}");
        }
    }

    fn on_debug(&self, message: &str) {
        if self.mode.should_show(OutputMode::VeryVerbose) {
            println!("    [DEBUG] {message}");
        }
    }
}
