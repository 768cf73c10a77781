//! Physical connection registry.
//!
//! Owns the set of real connections, their start reference counts and
//! liveness flags, and is the only place that calls `start`, `stop` and
//! `close` on the transport.

use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ConnectionError, Error, Result};
use crate::port::connection::{Connection, ConnectionFactory, ExceptionListener};

use super::listener::ExceptionListenerChain;
use super::reconnect::ReconnectObserver;
use super::state::{PoolStats, SharedCounters, Slot};

/// Where physical connections come from.
#[derive(Clone)]
pub enum ConnectionSource {
    /// Pre-built connections, handed out first-in first-out as capacity is needed.
    Fixed(Vec<Arc<dyn Connection>>),
    /// A factory invoked lazily whenever a new physical connection is needed.
    Factory(Arc<dyn ConnectionFactory>),
}

impl ConnectionSource {
    pub fn single(connection: Arc<dyn Connection>) -> Self {
        Self::Fixed(vec![connection])
    }

    pub fn factory(factory: impl ConnectionFactory + 'static) -> Self {
        Self::Factory(Arc::new(factory))
    }
}

enum Source {
    Fixed(VecDeque<Arc<dyn Connection>>),
    Factory(Arc<dyn ConnectionFactory>),
}

/// What the source offers for the next physical connection.
enum Next {
    Ready(Arc<dyn Connection>),
    Create(Arc<dyn ConnectionFactory>),
    Drained,
}

impl Source {
    /// Pops a fixed connection or hands out the factory to call outside the
    /// pool lock.
    fn next_connection(&mut self) -> Next {
        match self {
            Self::Fixed(queue) => queue.pop_front().map_or(Next::Drained, Next::Ready),
            Self::Factory(factory) => Next::Create(factory.clone()),
        }
    }
}

impl From<ConnectionSource> for Source {
    fn from(source: ConnectionSource) -> Self {
        match source {
            ConnectionSource::Fixed(connections) => Self::Fixed(connections.into()),
            ConnectionSource::Factory(factory) => Self::Factory(factory),
        }
    }
}

/// Settings applied to every physical connection the registry creates.
#[derive(Clone)]
pub(crate) struct Settings {
    pub(crate) client_id: Option<String>,
    pub(crate) exception_listener: Option<Arc<dyn ExceptionListener>>,
    pub(crate) reconnect_on_exception: bool,
    pub(crate) pool_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client_id: None,
            exception_listener: None,
            reconnect_on_exception: false,
            pool_size: 1,
        }
    }
}

struct PoolState {
    source: Source,
    settings: Settings,
    slots: Vec<Arc<Slot>>,
    cursor: usize,
    next_id: u64,
    shut_down: bool,
}

impl PoolState {
    fn ensure_running(&self) -> Result<()> {
        if self.shut_down {
            return Err(Error::Shutdown);
        }
        Ok(())
    }

    /// Drop connections retired since the last look.
    fn prune(&mut self) {
        self.slots.retain(|slot| !slot.is_closed());
    }

    fn is_full(&self) -> bool {
        self.slots.len() >= self.settings.pool_size
    }

    fn next_shared(&mut self) -> Option<Arc<Slot>> {
        if self.slots.is_empty() {
            return None;
        }
        let index = self.cursor % self.slots.len();
        self.cursor = self.cursor.wrapping_add(1);
        Some(self.slots[index].clone())
    }
}

pub(crate) struct ConnectionRegistry {
    state: Mutex<PoolState>,
    /// Serializes connection creation so concurrent callers cannot overfill
    /// the pool. Transport I/O for a new connection happens under this lock
    /// only.
    creating: Mutex<()>,
    counters: SharedCounters,
}

impl ConnectionRegistry {
    pub(crate) fn new(source: ConnectionSource, settings: Settings) -> Self {
        Self {
            state: Mutex::new(PoolState {
                source: source.into(),
                settings,
                slots: Vec::new(),
                cursor: 0,
                next_id: 0,
                shut_down: false,
            }),
            creating: Mutex::new(()),
            counters: SharedCounters::new(),
        }
    }

    pub(crate) fn settings(&self) -> Settings {
        self.state.lock().settings.clone()
    }

    /// Change the settings used for physical connections created from now on.
    pub(crate) fn update_settings(&self, update: impl FnOnce(&mut Settings)) {
        update(&mut self.state.lock().settings);
    }

    /// Hand out a physical connection, creating one while below `pool_size`.
    ///
    /// Once the pool is full, live connections are shared round-robin.
    pub(crate) fn acquire(self: &Arc<Self>) -> Result<Arc<Slot>> {
        if let Some(slot) = self.share_if_full()? {
            return Ok(slot);
        }

        let _creating = self.creating.lock();
        // Another creator may have filled the pool while this one waited.
        if let Some(slot) = self.share_if_full()? {
            return Ok(slot);
        }
        let next = self.state.lock().source.next_connection();

        let connection = match next {
            Next::Ready(connection) => connection,
            Next::Create(factory) => factory.create_connection()?,
            Next::Drained => {
                let mut state = self.state.lock();
                state.ensure_running()?;
                state.prune();
                return state.next_shared().ok_or(Error::Exhausted);
            }
        };
        self.register(connection)
    }

    fn share_if_full(&self) -> Result<Option<Arc<Slot>>> {
        let mut state = self.state.lock();
        state.ensure_running()?;
        state.prune();
        if state.is_full() {
            return Ok(state.next_shared());
        }
        Ok(None)
    }

    /// Prepare a new connection outside the pool lock, then add it to the pool.
    fn register(self: &Arc<Self>, connection: Arc<dyn Connection>) -> Result<Arc<Slot>> {
        let (id, settings) = {
            let mut state = self.state.lock();
            state.next_id += 1;
            (state.next_id, state.settings.clone())
        };
        let slot = Arc::new(Slot::new(id, connection));

        if let Err(e) = self.prepare(&settings, &slot) {
            warn!(connection_id = id, error = %e, "Failed to prepare connection");
            if let Err(close_err) = slot.connection().close() {
                debug!(connection_id = id, error = %close_err, "Close after failed prepare");
            }
            return Err(e.into());
        }

        let mut state = self.state.lock();
        if state.shut_down {
            drop(state);
            debug!(connection_id = id, "Pool shut down while connecting");
            let mut transport = slot.lock_transport();
            if slot.mark_closed(&mut transport) {
                if let Err(e) = slot.connection().close() {
                    debug!(connection_id = id, error = %e, "Close after shutdown");
                }
            }
            return Err(Error::Shutdown);
        }

        self.counters.created.fetch_add(1, Ordering::Relaxed);
        state.slots.push(slot.clone());
        info!(
            connection_id = id,
            pooled = state.slots.len(),
            "Registered physical connection"
        );
        Ok(slot)
    }

    /// Apply the client ID and install the exception listener.
    ///
    /// Without reconnection the user listener is installed as is, so the
    /// transport reports the very same object back. With reconnection a
    /// chain of the user listener followed by the observer is installed.
    fn prepare(
        self: &Arc<Self>,
        settings: &Settings,
        slot: &Arc<Slot>,
    ) -> std::result::Result<(), ConnectionError> {
        let connection = slot.connection();
        if let Some(client_id) = &settings.client_id {
            connection.set_client_id(client_id)?;
        }

        let listener: Option<Arc<dyn ExceptionListener>> =
            match (settings.reconnect_on_exception, &settings.exception_listener) {
                (false, None) => None,
                (false, Some(user)) => Some(user.clone()),
                (true, user) => {
                    let mut chain = ExceptionListenerChain::new();
                    if let Some(user) = user {
                        chain = chain.with(user.clone());
                    }
                    chain = chain.with(Arc::new(ReconnectObserver::new(self, slot)));
                    Some(Arc::new(chain) as Arc<dyn ExceptionListener>)
                }
            };

        if let Some(listener) = listener {
            connection.set_exception_listener(Some(listener))?;
        }
        Ok(())
    }

    /// Count one more started handle, issuing the real `start()` on 0→1.
    ///
    /// A failed start leaves the count untouched. Calls against a closed
    /// connection are ignored.
    pub(crate) fn record_start(&self, slot: &Slot) -> Result<()> {
        let transport = slot.lock_transport();
        if *transport {
            debug!(connection_id = slot.id(), "Ignoring start on abandoned connection");
            return Ok(());
        }
        let count = slot.start_count();
        if count == 0 {
            slot.connection().start()?;
            debug!(connection_id = slot.id(), "Started physical connection");
        }
        slot.set_start_count(&transport, count + 1);
        Ok(())
    }

    /// Count one fewer started handle, issuing the real `stop()` on 1→0.
    pub(crate) fn record_stop(&self, slot: &Slot) -> Result<()> {
        let transport = slot.lock_transport();
        if *transport {
            debug!(connection_id = slot.id(), "Ignoring stop on abandoned connection");
            return Ok(());
        }
        match slot.start_count() {
            0 => {}
            1 => {
                slot.connection().stop()?;
                debug!(connection_id = slot.id(), "Stopped physical connection");
                slot.set_start_count(&transport, 0);
            }
            count => {
                debug!(
                    connection_id = slot.id(),
                    remaining = count - 1,
                    "Still started by other handles"
                );
                slot.set_start_count(&transport, count - 1);
            }
        }
        Ok(())
    }

    /// Discard a connection whose transport has failed.
    ///
    /// Takes no lock: the failure may be reported from inside a transport
    /// call made under the slot or pool lock. No real close is issued, and the
    /// slot leaves the pool on the next acquisition. Handles still bound to it
    /// keep running against frozen counts.
    pub(crate) fn invalidate(&self, slot: &Slot, error: &ConnectionError) {
        if !slot.mark_failed() {
            return;
        }
        self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
        warn!(
            connection_id = slot.id(),
            error = %error,
            "Physical connection failed, next acquire will reconnect"
        );
    }

    /// Close every registered connection and refuse further acquisitions.
    ///
    /// Idempotent. Every connection is attempted even if some fail; the
    /// first failure is returned.
    pub(crate) fn force_close_all(&self) -> Result<()> {
        let slots = {
            let mut state = self.state.lock();
            if state.shut_down {
                return Ok(());
            }
            state.shut_down = true;
            std::mem::take(&mut state.slots)
        };
        info!(connections = slots.len(), "Shutting down connection pool");
        self.close_slots(slots)
    }

    /// Close and evict every current connection; the pool stays usable.
    pub(crate) fn reset(&self) -> Result<()> {
        let slots = {
            let mut state = self.state.lock();
            state.ensure_running()?;
            std::mem::take(&mut state.slots)
        };
        info!(connections = slots.len(), "Resetting connection pool");
        self.close_slots(slots)
    }

    fn close_slots(&self, slots: Vec<Arc<Slot>>) -> Result<()> {
        let mut first_error = None;
        for slot in slots {
            if let Err(e) = self.close_slot(&slot) {
                warn!(connection_id = slot.id(), error = %e, "Failed to close physical connection");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    fn close_slot(&self, slot: &Slot) -> std::result::Result<(), ConnectionError> {
        let mut transport = slot.lock_transport();
        if !slot.mark_closed(&mut transport) {
            return Ok(());
        }
        self.counters.closed.fetch_add(1, Ordering::Relaxed);
        info!(connection_id = slot.id(), "Closing physical connection");
        slot.connection().close()
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        self.state.lock().shut_down
    }

    pub(crate) fn stats(&self) -> PoolStats {
        let slots: Vec<Arc<Slot>> = {
            let state = self.state.lock();
            state.slots.iter().filter(|s| !s.is_closed()).cloned().collect()
        };
        PoolStats {
            active_connections: slots.len(),
            started_connections: slots.iter().filter(|s| s.start_count() > 0).count(),
            connections_created: self.counters.created.load(Ordering::Relaxed),
            connections_closed: self.counters.closed.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
        }
    }
}
