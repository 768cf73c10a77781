//! Lazy reconnection on asynchronous failure.
//!
//! The observer never reconnects by itself. It only evicts the failed
//! physical connection so that the next acquisition creates a fresh one.

use std::sync::{Arc, Weak};

use tracing::debug;

use crate::error::ConnectionError;
use crate::port::connection::ExceptionListener;

use super::registry::ConnectionRegistry;
use super::state::Slot;

/// Internal listener attached to every physical connection when
/// `reconnect_on_exception` is enabled. Always the last member of the chain.
pub(super) struct ReconnectObserver {
    registry: Weak<ConnectionRegistry>,
    slot: Weak<Slot>,
}

impl ReconnectObserver {
    pub(super) fn new(registry: &Arc<ConnectionRegistry>, slot: &Arc<Slot>) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            slot: Arc::downgrade(slot),
        }
    }
}

impl ExceptionListener for ReconnectObserver {
    fn on_exception(&self, error: &ConnectionError) {
        match (self.registry.upgrade(), self.slot.upgrade()) {
            (Some(registry), Some(slot)) => registry.invalidate(&slot, error),
            _ => debug!(error = %error, "Failure reported for a dropped pool, ignoring"),
        }
    }
}
