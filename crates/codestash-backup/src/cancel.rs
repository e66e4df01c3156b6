//! Cooperative cancellation.

use crate::error::{BackupError, Result};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type ExternalCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// Shared cancellation flag polled at phase boundaries and once per file.
///
/// Clones share the same flag. An optional external check lets a caller
/// that owns its own cancel state participate without forwarding it.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    external: Option<ExternalCheck>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a caller-provided cancellation check.
    pub fn with_check<F>(mut self, check: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.external = Some(Arc::new(check));
        self
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.external.as_ref().is_some_and(|check| check())
    }

    /// Checkpoint: fails with [`BackupError::Cancelled`] once cancellation is requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(BackupError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.flag.load(Ordering::SeqCst))
            .field("external", &self.external.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());

        clone.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.check(), Err(BackupError::Cancelled));
    }

    #[test]
    fn test_external_check() {
        let outside = Arc::new(AtomicBool::new(false));
        let watched = outside.clone();
        let token = CancelToken::new().with_check(move || watched.load(Ordering::SeqCst));

        assert!(!token.is_cancelled());
        outside.store(true, Ordering::SeqCst);
        assert!(token.is_cancelled());
    }
}
