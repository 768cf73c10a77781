//! Composite exception listener.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::warn;

use crate::error::ConnectionError;
use crate::port::connection::ExceptionListener;

/// Ordered fan-out of exception listeners.
///
/// Members are notified in insertion order. A member that panics is logged
/// and skipped; the remaining members still receive the error.
#[derive(Default, Clone)]
pub struct ExceptionListenerChain {
    listeners: Vec<Arc<dyn ExceptionListener>>,
}

impl ExceptionListenerChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener to the end of the chain.
    #[must_use]
    pub fn with(mut self, listener: Arc<dyn ExceptionListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn listeners(&self) -> &[Arc<dyn ExceptionListener>] {
        &self.listeners
    }

    /// Deliver `error` to every member in order.
    pub fn notify(&self, error: &ConnectionError) {
        for (index, listener) in self.listeners.iter().enumerate() {
            let delivered = catch_unwind(AssertUnwindSafe(|| listener.on_exception(error)));
            if delivered.is_err() {
                warn!(index, error = %error, "Exception listener panicked, continuing chain");
            }
        }
    }
}

impl ExceptionListener for ExceptionListenerChain {
    fn on_exception(&self, error: &ConnectionError) {
        self.notify(error);
    }
}

impl fmt::Debug for ExceptionListenerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionListenerChain")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::listener::RecordingListener;

    struct PanickingListener;

    impl ExceptionListener for PanickingListener {
        fn on_exception(&self, _error: &ConnectionError) {
            panic!("listener blew up");
        }
    }

    #[test]
    fn test_empty_chain_is_noop() {
        let chain = ExceptionListenerChain::new();
        assert!(chain.is_empty());
        chain.notify(&ConnectionError::new("boom"));
    }

    #[test]
    fn test_delivers_in_insertion_order() {
        let log = RecordingListener::shared_log();
        let first = Arc::new(RecordingListener::named("first", log.clone()));
        let second = Arc::new(RecordingListener::named("second", log.clone()));

        let chain = ExceptionListenerChain::new()
            .with(first.clone())
            .with(second.clone());
        chain.notify(&ConnectionError::new("lost"));

        assert_eq!(first.count(), 1);
        assert_eq!(second.count(), 1);
        assert_eq!(*log.lock(), vec!["first", "second"]);
    }

    #[test]
    fn test_panicking_member_does_not_stop_delivery() {
        let after = Arc::new(RecordingListener::new());
        let chain = ExceptionListenerChain::new()
            .with(Arc::new(PanickingListener))
            .with(after.clone());

        chain.on_exception(&ConnectionError::new("lost"));

        assert_eq!(after.count(), 1);
        assert_eq!(after.last_error().unwrap().message(), "lost");
    }
}
