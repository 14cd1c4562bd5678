//! Progress, message and cancellation channel between the engine and its host.

use log::{debug, error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub trait Feedback {
    fn push_info(&mut self, message: &str);
    fn push_debug(&mut self, message: &str);
    fn report_error(&mut self, message: &str);
    /// Overall progress in percent, 0 to 100
    fn set_progress(&mut self, percent: f64);
    /// Polled once per band boundary
    fn is_canceled(&self) -> bool;
}

/// Shared cancellation flag, safe to flip from a signal handler
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Forwards engine messages to the `log` facade
#[derive(Debug, Default)]
pub struct LogFeedback {
    cancel: CancelToken,
}

impl LogFeedback {
    pub fn new(cancel: CancelToken) -> Self {
        Self { cancel }
    }
}

impl Feedback for LogFeedback {
    fn push_info(&mut self, message: &str) {
        info!("{}", message);
    }

    fn push_debug(&mut self, message: &str) {
        debug!("{}", message);
    }

    fn report_error(&mut self, message: &str) {
        error!("{}", message);
    }

    fn set_progress(&mut self, percent: f64) {
        info!("Progress: {:.0}%", percent);
    }

    fn is_canceled(&self) -> bool {
        self.cancel.is_canceled()
    }
}
