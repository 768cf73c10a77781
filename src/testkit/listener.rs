//! Recording exception listener.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::ConnectionError;
use crate::port::connection::ExceptionListener;

/// Delivery log shared between several listeners to assert ordering.
pub type SharedLog = Arc<Mutex<Vec<&'static str>>>;

/// Listener that keeps every error it receives.
#[derive(Default)]
pub struct RecordingListener {
    name: &'static str,
    log: Option<SharedLog>,
    errors: Mutex<Vec<ConnectionError>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// A listener that also appends `name` to `log` on every delivery.
    pub fn named(name: &'static str, log: SharedLog) -> Self {
        Self {
            name,
            log: Some(log),
            errors: Mutex::new(Vec::new()),
        }
    }

    pub fn shared_log() -> SharedLog {
        Arc::new(Mutex::new(Vec::new()))
    }

    pub fn count(&self) -> usize {
        self.errors.lock().len()
    }

    pub fn errors(&self) -> Vec<ConnectionError> {
        self.errors.lock().clone()
    }

    pub fn last_error(&self) -> Option<ConnectionError> {
        self.errors.lock().last().cloned()
    }
}

impl ExceptionListener for RecordingListener {
    fn on_exception(&self, error: &ConnectionError) {
        self.errors.lock().push(error.clone());
        if let Some(log) = &self.log {
            log.lock().push(self.name);
        }
    }
}

/// Pointer identity of two listeners, ignoring trait object metadata.
pub fn same_listener<T: ?Sized, U: ?Sized>(a: &Arc<T>, b: &Arc<U>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}
