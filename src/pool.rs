//! Pooled connection factory.
//!
//! Multiplexes many logical [`PooledConnection`] handles onto a small set of
//! physical connections.
//!
//! # Architecture
//!
//! - **Registry**: owns the physical connections and a start reference count
//!   per connection. The real `start()` is issued when the first handle
//!   starts and the real `stop()` when the last started handle stops or
//!   closes. Nothing else touches the transport.
//! - **Handles**: single-owner proxies with their own started flag. Closing a
//!   handle never closes the physical connection.
//! - **Exception listeners**: the user listener and, with
//!   `reconnect_on_exception`, an internal observer are chained onto every
//!   physical connection, user listener first.
//! - **Reconnection** is lazy: an asynchronous failure only evicts the
//!   connection, and the next [`create_connection`](PoolConnectionFactory::create_connection)
//!   obtains a fresh one. Handles bound to the failed connection are
//!   abandoned and their start/stop calls become no-ops.
//!
//! [`shutdown`](PoolConnectionFactory::shutdown) closes every physical
//! connection exactly once, whatever handles remain open.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::pool::PoolConfig;
use crate::error::{ConfigError, Result};
use crate::port::connection::ExceptionListener;

mod handle;
mod listener;
mod reconnect;
mod registry;
mod state;

pub use handle::PooledConnection;
pub use listener::ExceptionListenerChain;
pub use registry::ConnectionSource;
pub use state::PoolStats;

use registry::{ConnectionRegistry, Settings};

/// Entry point for obtaining pooled connection handles.
///
/// Configure it with the setters before the first
/// [`create_connection`](Self::create_connection); changes only affect
/// physical connections created afterwards.
pub struct PoolConnectionFactory {
    registry: Arc<ConnectionRegistry>,
}

impl PoolConnectionFactory {
    /// Create a factory with default settings: no client ID, no listener,
    /// no reconnection and a single physical connection.
    pub fn new(source: ConnectionSource) -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new(source, Settings::default())),
        }
    }

    /// Create a factory from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    #[must_use = "returns Result that must be checked"]
    pub fn with_config(source: ConnectionSource, config: &PoolConfig) -> Result<Self> {
        config.validate()?;
        let settings = Settings {
            client_id: config.client_id.clone(),
            reconnect_on_exception: config.reconnect_on_exception,
            pool_size: config.pool_size,
            ..Settings::default()
        };
        Ok(Self {
            registry: Arc::new(ConnectionRegistry::new(source, settings)),
        })
    }

    pub fn set_client_id(&mut self, client_id: impl Into<String>) {
        let client_id = client_id.into();
        self.registry
            .update_settings(|s| s.client_id = Some(client_id));
    }

    pub fn set_exception_listener(&mut self, listener: Arc<dyn ExceptionListener>) {
        self.registry
            .update_settings(|s| s.exception_listener = Some(listener));
    }

    /// Discard a physical connection when its transport reports an
    /// asynchronous failure, so the next handle gets a fresh one.
    pub fn set_reconnect_on_exception(&mut self, reconnect: bool) {
        self.registry
            .update_settings(|s| s.reconnect_on_exception = reconnect);
    }

    /// Maximum number of physical connections shared by handles.
    ///
    /// # Errors
    ///
    /// Returns an error if `pool_size` is zero.
    pub fn set_pool_size(&mut self, pool_size: usize) -> Result<()> {
        if pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pool_size",
                reason: "must be > 0".to_string(),
            }
            .into());
        }
        self.registry.update_settings(|s| s.pool_size = pool_size);
        Ok(())
    }

    pub fn client_id(&self) -> Option<String> {
        self.registry.settings().client_id
    }

    pub fn exception_listener(&self) -> Option<Arc<dyn ExceptionListener>> {
        self.registry.settings().exception_listener
    }

    pub fn reconnect_on_exception(&self) -> bool {
        self.registry.settings().reconnect_on_exception
    }

    /// Obtain a new logical handle bound to a pooled physical connection.
    ///
    /// # Errors
    ///
    /// - [`Error::Shutdown`](crate::error::Error::Shutdown) after [`shutdown`](Self::shutdown)
    /// - [`Error::Exhausted`](crate::error::Error::Exhausted) when a fixed source has no
    ///   live connection left
    /// - [`Error::Connection`](crate::error::Error::Connection) if creating or preparing
    ///   a physical connection fails
    pub fn create_connection(&self) -> Result<PooledConnection> {
        let slot = self.registry.acquire()?;
        let settings = self.registry.settings();
        debug!(connection_id = slot.id(), "Created pooled connection handle");
        Ok(PooledConnection::new(
            self.registry.clone(),
            slot,
            settings.client_id,
            settings.exception_listener,
        ))
    }

    /// Close every current physical connection and keep serving handles
    /// from fresh ones.
    ///
    /// # Errors
    ///
    /// Returns the first close failure, or
    /// [`Error::Shutdown`](crate::error::Error::Shutdown) after shutdown.
    pub fn reset(&self) -> Result<()> {
        self.registry.reset()
    }

    /// Close every physical connection exactly once. Idempotent; the factory
    /// cannot be used afterwards.
    ///
    /// # Errors
    ///
    /// Returns the first close failure. All connections are still closed.
    pub fn shutdown(&self) -> Result<()> {
        self.registry.force_close_all()
    }

    pub fn is_shut_down(&self) -> bool {
        self.registry.is_shut_down()
    }

    /// Runtime statistics for observability.
    pub fn stats(&self) -> PoolStats {
        self.registry.stats()
    }
}

impl Drop for PoolConnectionFactory {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "Failed to shut down connection pool on drop");
        }
    }
}

impl fmt::Debug for PoolConnectionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let settings = self.registry.settings();
        f.debug_struct("PoolConnectionFactory")
            .field("client_id", &settings.client_id)
            .field("has_exception_listener", &settings.exception_listener.is_some())
            .field("reconnect_on_exception", &settings.reconnect_on_exception)
            .field("pool_size", &settings.pool_size)
            .field("stats", &self.stats())
            .finish()
    }
}
