//! Mock transport implementations for testing.
//!
//! - [`MockConnection`]: Records every call, supports scripted failures and
//!   can fire its installed exception listener on demand.
//! - [`MockConnectionFactory`]: Hands out fresh mocks (or always the same
//!   one) and keeps every connection it created for inspection.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::ConnectionError;
use crate::pool::ConnectionSource;
use crate::port::connection::{Connection, ConnectionFactory, ExceptionListener};

/// A transport call recorded by [`MockConnection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Start,
    Stop,
    Close,
    SetClientId,
    SetExceptionListener,
    GetExceptionListener,
}

#[derive(Default)]
struct Failures {
    start: VecDeque<ConnectionError>,
    stop: VecDeque<ConnectionError>,
    close: VecDeque<ConnectionError>,
    set_client_id: VecDeque<ConnectionError>,
    report_during_start: VecDeque<ConnectionError>,
}

/// A mock connection that records calls in order.
#[derive(Default)]
pub struct MockConnection {
    calls: Mutex<Vec<Call>>,
    client_ids: Mutex<Vec<String>>,
    listener: Mutex<Option<Arc<dyn ExceptionListener>>>,
    failures: Mutex<Failures>,
}

impl MockConnection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A fixed source over the given mocks, in order.
    pub fn source(connections: &[Arc<MockConnection>]) -> ConnectionSource {
        ConnectionSource::Fixed(
            connections
                .iter()
                .map(|c| c.clone() as Arc<dyn Connection>)
                .collect(),
        )
    }

    pub fn fail_next_start(&self, error: ConnectionError) {
        self.failures.lock().start.push_back(error);
    }

    pub fn fail_next_stop(&self, error: ConnectionError) {
        self.failures.lock().stop.push_back(error);
    }

    pub fn fail_next_close(&self, error: ConnectionError) {
        self.failures.lock().close.push_back(error);
    }

    pub fn fail_next_set_client_id(&self, error: ConnectionError) {
        self.failures.lock().set_client_id.push_back(error);
    }

    /// Make the next `start()` report `error` to the installed listener
    /// before returning, the way a transport that notices a dead socket
    /// while starting does.
    pub fn fail_during_next_start(&self, error: ConnectionError) {
        self.failures.lock().report_during_start.push_back(error);
    }

    /// Simulate the transport detecting a failure asynchronously.
    ///
    /// Returns `false` if no listener is installed.
    pub fn fail(&self, error: ConnectionError) -> bool {
        // Clone out of the lock so the listener may call back into the mock.
        let listener = self.listener.lock().clone();
        match listener {
            Some(listener) => {
                listener.on_exception(&error);
                true
            }
            None => false,
        }
    }

    /// The listener currently installed, without recording a call.
    pub fn installed_listener(&self) -> Option<Arc<dyn ExceptionListener>> {
        self.listener.lock().clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls.lock().iter().filter(|c| **c == call).count()
    }

    pub fn start_count(&self) -> usize {
        self.count(Call::Start)
    }

    pub fn stop_count(&self) -> usize {
        self.count(Call::Stop)
    }

    pub fn close_count(&self) -> usize {
        self.count(Call::Close)
    }

    pub fn client_ids(&self) -> Vec<String> {
        self.client_ids.lock().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn scripted(
        &self,
        call: Call,
        pick: impl FnOnce(&mut Failures) -> &mut VecDeque<ConnectionError>,
    ) -> Result<(), ConnectionError> {
        self.record(call);
        let mut failures = self.failures.lock();
        match pick(&mut failures).pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Connection for MockConnection {
    fn start(&self) -> Result<(), ConnectionError> {
        let result = self.scripted(Call::Start, |f| &mut f.start);
        let reported = self.failures.lock().report_during_start.pop_front();
        if let Some(error) = reported {
            self.fail(error);
        }
        result
    }

    fn stop(&self) -> Result<(), ConnectionError> {
        self.scripted(Call::Stop, |f| &mut f.stop)
    }

    fn close(&self) -> Result<(), ConnectionError> {
        self.scripted(Call::Close, |f| &mut f.close)
    }

    fn set_client_id(&self, client_id: &str) -> Result<(), ConnectionError> {
        self.scripted(Call::SetClientId, |f| &mut f.set_client_id)?;
        self.client_ids.lock().push(client_id.to_string());
        Ok(())
    }

    fn set_exception_listener(
        &self,
        listener: Option<Arc<dyn ExceptionListener>>,
    ) -> Result<(), ConnectionError> {
        self.record(Call::SetExceptionListener);
        *self.listener.lock() = listener;
        Ok(())
    }

    fn exception_listener(&self) -> Option<Arc<dyn ExceptionListener>> {
        self.record(Call::GetExceptionListener);
        self.listener.lock().clone()
    }
}

/// A mock factory recording every connection it creates.
#[derive(Default)]
pub struct MockConnectionFactory {
    reuse: Option<Arc<MockConnection>>,
    created: Mutex<Vec<Arc<MockConnection>>>,
    failures: Mutex<VecDeque<ConnectionError>>,
}

impl MockConnectionFactory {
    /// A factory creating a fresh [`MockConnection`] per call.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A factory returning `connection` on every call.
    pub fn returning(connection: Arc<MockConnection>) -> Arc<Self> {
        Arc::new(Self {
            reuse: Some(connection),
            ..Self::default()
        })
    }

    pub fn source(self: &Arc<Self>) -> ConnectionSource {
        ConnectionSource::Factory(self.clone())
    }

    pub fn fail_next_create(&self, error: ConnectionError) {
        self.failures.lock().push_back(error);
    }

    /// Every connection handed out so far, in creation order.
    pub fn created(&self) -> Vec<Arc<MockConnection>> {
        self.created.lock().clone()
    }

    pub fn create_count(&self) -> usize {
        self.created.lock().len()
    }
}

impl ConnectionFactory for MockConnectionFactory {
    fn create_connection(&self) -> Result<Arc<dyn Connection>, ConnectionError> {
        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }
        let connection = self.reuse.clone().unwrap_or_else(MockConnection::new);
        self.created.lock().push(connection.clone());
        Ok(connection)
    }
}
