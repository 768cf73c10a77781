//! Transport port for messaging connections.
//!
//! These traits are the integration points for a concrete messaging client.
//! The pool only ever talks to the transport through them.

use std::sync::Arc;

use crate::error::ConnectionError;

/// Observer for failures the transport detects asynchronously.
///
/// Invoked from whatever thread the transport uses for notifications, so
/// implementations must be cheap and must not call back into a blocking
/// operation on the same connection.
pub trait ExceptionListener: Send + Sync {
    fn on_exception(&self, error: &ConnectionError);
}

impl<F> ExceptionListener for F
where
    F: Fn(&ConnectionError) + Send + Sync,
{
    fn on_exception(&self, error: &ConnectionError) {
        self(error);
    }
}

/// A physical messaging connection.
///
/// Implementations are expected to be internally synchronized; the pool calls
/// these methods from many threads but never concurrently with itself for
/// the start/stop/close transitions of a single connection.
pub trait Connection: Send + Sync {
    /// Start (or restart) delivery of incoming messages.
    fn start(&self) -> Result<(), ConnectionError>;

    /// Temporarily pause delivery of incoming messages.
    fn stop(&self) -> Result<(), ConnectionError>;

    /// Release the connection and all of its resources.
    fn close(&self) -> Result<(), ConnectionError>;

    fn set_client_id(&self, client_id: &str) -> Result<(), ConnectionError>;

    /// Install the listener the transport notifies on asynchronous failures.
    fn set_exception_listener(
        &self,
        listener: Option<Arc<dyn ExceptionListener>>,
    ) -> Result<(), ConnectionError>;

    fn exception_listener(&self) -> Option<Arc<dyn ExceptionListener>>;
}

/// Creates new physical connections on demand.
pub trait ConnectionFactory: Send + Sync {
    fn create_connection(&self) -> Result<Arc<dyn Connection>, ConnectionError>;
}

impl<F> ConnectionFactory for F
where
    F: Fn() -> Result<Arc<dyn Connection>, ConnectionError> + Send + Sync,
{
    fn create_connection(&self) -> Result<Arc<dyn Connection>, ConnectionError> {
        self()
    }
}
