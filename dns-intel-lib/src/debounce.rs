//! Debounced execution for as-you-type validation.

use crate::types::ValidationResult;
use crate::validate::{validate_domain, VALIDATION_DEBOUNCE_MS};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Runs a task after a quiet period, dropping tasks superseded in the meantime.
///
/// Each [`schedule`](Debouncer::schedule) aborts the previously pending task,
/// so only the most recently scheduled one can run. Must be used from within
/// a tokio runtime.
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Schedule `task` to run once the quiet period has passed.
    pub fn schedule<F>(&mut self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();

        let quiet = self.quiet;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            task();
        }));
    }

    /// Drop the pending task, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// True while a scheduled task has neither run nor been cancelled.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(VALIDATION_DEBOUNCE_MS))
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Validates input only after typing pauses.
///
/// Results are published on a watch channel; subscribers see the outcome
/// for the latest input once it has settled.
#[derive(Debug)]
pub struct DebouncedValidator {
    debouncer: Debouncer,
    results: watch::Sender<ValidationResult>,
}

impl DebouncedValidator {
    pub fn new(quiet: Duration) -> Self {
        let (results, _) = watch::channel(validate_domain(""));
        Self {
            debouncer: Debouncer::new(quiet),
            results,
        }
    }

    /// Receive validation outcomes as they settle.
    pub fn subscribe(&self) -> watch::Receiver<ValidationResult> {
        self.results.subscribe()
    }

    /// Feed the current input text.
    ///
    /// Clearing the input resets the outcome immediately, without waiting.
    pub fn input(&mut self, text: &str) {
        if text.trim().is_empty() {
            self.debouncer.cancel();
            self.results.send_replace(validate_domain(""));
            return;
        }

        let text = text.to_string();
        let results = self.results.clone();
        self.debouncer.schedule(move || {
            let outcome = validate_domain(&text);
            tracing::debug!(input = %text, valid = outcome.valid, "validated input");
            results.send_replace(outcome);
        });
    }
}

impl Default for DebouncedValidator {
    fn default() -> Self {
        Self::new(Duration::from_millis(VALIDATION_DEBOUNCE_MS))
    }
}
