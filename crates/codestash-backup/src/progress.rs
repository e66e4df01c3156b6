//! Terminal progress rendering for backup and bundle runs.
//!
//! Bridges the engine's `(current, total, label)` progress callback to
//! `indicatif` bars.

use crate::logger::ProgressCallback;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

/// Progress reporter over the phases of one run.
#[derive(Debug, Clone)]
pub struct PhaseProgress {
    multi: Arc<MultiProgress>,
    bar: ProgressBar,
}

impl PhaseProgress {
    /// Creates a phase bar; a hidden reporter draws nothing.
    pub fn new(hidden: bool) -> Self {
        Self::with_unit(hidden, "phases")
    }

    /// Creates a bar counting `unit` instead of phases.
    pub fn with_unit(hidden: bool, unit: &str) -> Self {
        let multi = Arc::new(MultiProgress::new());
        if hidden {
            multi.set_draw_target(ProgressDrawTarget::hidden());
        }
        let bar = multi.add(ProgressBar::new(0));
        let template = format!("{{msg:<28}} [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {}", unit);
        if let Ok(style) = ProgressStyle::default_bar().template(&template) {
            bar.set_style(style.progress_chars("#>-"));
        }
        Self { multi, bar }
    }

    /// Callback to hand to the engine.
    pub fn callback(&self) -> ProgressCallback {
        let bar = self.bar.clone();
        Arc::new(move |current: usize, total: usize, label: &str| {
            bar.set_length(total as u64);
            bar.set_position(current as u64);
            bar.set_message(label.to_string());
        })
    }

    /// Print a line above the bar without tearing it.
    pub fn println(&self, message: &str) {
        let _ = self.multi.println(message);
    }

    /// Current position and length, mainly for tests.
    pub fn position(&self) -> (u64, u64) {
        (self.bar.position(), self.bar.length().unwrap_or(0))
    }

    pub fn finish(&self, message: &str) {
        if let Some(len) = self.bar.length() {
            self.bar.set_position(len);
        }
        self.bar.finish_with_message(message.to_string());
    }

    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

/// Simple spinner for short indeterminate work such as resolving time.
pub struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    /// Creates and starts a new spinner.
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            bar.set_style(style);
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    pub fn finish_with_message(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}
