//! Logical connection handle.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::error::{Error, Result};
use crate::port::connection::ExceptionListener;

use super::registry::ConnectionRegistry;
use super::state::Slot;

/// A caller-owned view of a shared physical connection.
///
/// Each handle keeps its own started flag and contributes at most one to the
/// physical connection's start count. Closing a handle releases that
/// contribution but never closes the physical connection; that only happens
/// on [`PoolConnectionFactory::shutdown`](super::PoolConnectionFactory::shutdown)
/// or [`reset`](super::PoolConnectionFactory::reset).
///
/// Dropping an open handle closes it.
pub struct PooledConnection {
    registry: Arc<ConnectionRegistry>,
    slot: Arc<Slot>,
    client_id: Option<String>,
    exception_listener: Option<Arc<dyn ExceptionListener>>,
    started: bool,
    closed: bool,
}

impl PooledConnection {
    pub(super) fn new(
        registry: Arc<ConnectionRegistry>,
        slot: Arc<Slot>,
        client_id: Option<String>,
        exception_listener: Option<Arc<dyn ExceptionListener>>,
    ) -> Self {
        Self {
            registry,
            slot,
            client_id,
            exception_listener,
            started: false,
            closed: false,
        }
    }

    /// Identifier of the physical connection behind this handle.
    pub fn id(&self) -> u64 {
        self.slot.id()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether the physical connection behind this handle has been closed or
    /// discarded after a failure.
    pub fn is_abandoned(&self) -> bool {
        self.slot.is_closed()
    }

    /// Start this handle. Starting an already started handle does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalState`] on a closed handle, or the transport's
    /// error if the physical connection fails to start.
    pub fn start(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.started {
            return Ok(());
        }
        self.registry.record_start(&self.slot)?;
        self.started = true;
        Ok(())
    }

    /// Stop this handle. Stopping a handle that is not started does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalState`] on a closed handle, or the transport's
    /// error if the physical connection fails to stop.
    pub fn stop(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.release()
    }

    /// Stop if started, then mark the handle unusable. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns the transport's error if the implied stop fails; the handle
    /// then stays open.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.release()?;
        self.closed = true;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        if !self.started {
            return Ok(());
        }
        self.registry.record_stop(&self.slot)?;
        self.started = false;
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::illegal_state("connection handle is closed"));
        }
        Ok(())
    }

    /// The listener configured on the factory, if any.
    ///
    /// This is the exact object the user supplied, even when the physical
    /// connection has a reconnection chain installed.
    pub fn exception_listener(&self) -> Result<Option<Arc<dyn ExceptionListener>>> {
        self.ensure_open()?;
        Ok(self.exception_listener.clone())
    }

    /// Only accepted when `listener` is the one already configured, since the
    /// physical connection is shared.
    pub fn set_exception_listener(
        &mut self,
        listener: Option<Arc<dyn ExceptionListener>>,
    ) -> Result<()> {
        self.ensure_open()?;
        let same = match (&listener, &self.exception_listener) {
            (None, None) => true,
            (Some(new), Some(current)) => {
                Arc::as_ptr(new) as *const () == Arc::as_ptr(current) as *const ()
            }
            _ => false,
        };
        if !same {
            return Err(Error::illegal_state(
                "exception listener of a shared connection must be configured on the factory",
            ));
        }
        Ok(())
    }

    pub fn client_id(&self) -> Result<Option<&str>> {
        self.ensure_open()?;
        Ok(self.client_id.as_deref())
    }

    /// Only accepted when `client_id` matches the factory's client ID.
    pub fn set_client_id(&mut self, client_id: &str) -> Result<()> {
        self.ensure_open()?;
        if self.client_id.as_deref() != Some(client_id) {
            return Err(Error::illegal_state(
                "client ID of a shared connection must be configured on the factory",
            ));
        }
        Ok(())
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(connection_id = self.slot.id(), error = %e, "Failed to close dropped handle");
        }
    }
}

impl fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("id", &self.slot.id())
            .field("started", &self.started)
            .field("closed", &self.closed)
            .field("abandoned", &self.slot.is_closed())
            .finish()
    }
}
