//! Per-run logging handle.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Level, Span};

/// Receives every engine message as `[TAG] message`.
pub type LogCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Receives `(current, total, label)` as work advances.
pub type ProgressCallback = Arc<dyn Fn(usize, usize, &str) + Send + Sync>;

/// Emits tagged engine messages to `tracing` and an optional callback.
///
/// Events are recorded inside a `backup` span carrying the project and
/// profile ids. Shared read-only by everything a run touches.
#[derive(Clone)]
pub struct RunLogger {
    span: Span,
    callback: Option<LogCallback>,
}

impl RunLogger {
    pub fn new(project_id: &str, profile_id: &str, callback: Option<LogCallback>) -> Self {
        Self {
            span: info_span!("backup", project = %project_id, profile = %profile_id),
            callback,
        }
    }

    /// Logger for a standalone bundling run over `source`.
    pub fn for_bundle(source: &str, callback: Option<LogCallback>) -> Self {
        Self {
            span: info_span!("bundle", source = %source),
            callback,
        }
    }

    /// Logger with no callback and no identifying span fields.
    pub fn silent() -> Self {
        Self {
            span: Span::none(),
            callback: None,
        }
    }

    pub fn log(&self, level: Level, tag: &str, message: &str) {
        let text = format!("[{}] {}", tag, message);
        let _entered = self.span.enter();
        match level {
            Level::ERROR => error!("{}", text),
            Level::WARN => warn!("{}", text),
            Level::INFO => info!("{}", text),
            _ => debug!("{}", text),
        }
        if let Some(callback) = &self.callback {
            callback(&text);
        }
    }

    pub fn info(&self, tag: &str, message: &str) {
        self.log(Level::INFO, tag, message);
    }

    pub fn warn(&self, tag: &str, message: &str) {
        self.log(Level::WARN, tag, message);
    }

    pub fn error(&self, tag: &str, message: &str) {
        self.log(Level::ERROR, tag, message);
    }

    pub fn debug(&self, tag: &str, message: &str) {
        self.log(Level::DEBUG, tag, message);
    }
}

impl fmt::Debug for RunLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLogger")
            .field("span", &self.span)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}
