// src/cancel.rs

use crate::error::{Result, StrataError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Number of records a stage processes between two cancellation checks.
pub const CHECK_INTERVAL: usize = 100;

/// Shared flag used for cooperative cancellation of a pipeline run.
///
/// Clones observe the same flag. Once cancelled a token stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Returns `Aborted` if the token has been cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(StrataError::Aborted)
        } else {
            Ok(())
        }
    }

    /// Checks the flag only on every `CHECK_INTERVAL`-th iteration.
    pub fn check_every(&self, iteration: usize) -> Result<()> {
        if iteration % CHECK_INTERVAL == 0 {
            self.check()
        } else {
            Ok(())
        }
    }
}
