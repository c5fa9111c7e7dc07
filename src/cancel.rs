//! Cooperative run cancellation.
//!
//! A [`CancelToken`] is cloned into the aggregator and every traversal, and
//! polled at the top of each step (before a listing page, between cards,
//! before a detail fetch). Cancellation arrives two ways: in-process via
//! [`CancelToken::cancel`], or out-of-process via a sentinel file the
//! desktop launcher drops next to the binary. Observing the sentinel
//! consumes it, so a stale marker never kills the next run.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const STOP_SENTINEL: &str = "STOP_SIGNAL.txt";

#[derive(Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    sentinel: Option<PathBuf>,
}

impl CancelToken {
    /// Token that only responds to in-process [`cancel`](Self::cancel).
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            sentinel: None,
        }
    }

    /// Token that additionally watches `path` for an external stop marker.
    pub fn with_sentinel(path: PathBuf) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            sentinel: Some(path),
        }
    }

    /// Sentinel in the current working directory, the launcher's contract.
    pub fn with_default_sentinel() -> Self {
        Self::with_sentinel(PathBuf::from(STOP_SENTINEL))
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether the run should stop. Consumes the sentinel file on first
    /// sight; once cancelled, a token stays cancelled.
    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::SeqCst) {
            return true;
        }
        if let Some(path) = &self.sentinel {
            if path.exists() {
                let _ = std::fs::remove_file(path);
                self.flag.store(true, Ordering::SeqCst);
                return true;
            }
        }
        false
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_process_cancel_is_sticky() {
        let token = CancelToken::new();
        let peer = token.clone();
        assert!(!token.is_cancelled());
        peer.cancel();
        assert!(token.is_cancelled());
        assert!(token.is_cancelled());
    }

    #[test]
    fn sentinel_file_cancels_and_is_consumed() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join(STOP_SENTINEL);
        let token = CancelToken::with_sentinel(marker.clone());

        assert!(!token.is_cancelled());
        std::fs::write(&marker, "stop").unwrap();
        assert!(token.is_cancelled());
        assert!(!marker.exists());

        // Sticky even though the marker is gone.
        assert!(token.is_cancelled());
    }

    #[test]
    fn fresh_token_ignores_missing_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancelToken::with_sentinel(dir.path().join(STOP_SENTINEL));
        assert!(!token.is_cancelled());
    }
}
