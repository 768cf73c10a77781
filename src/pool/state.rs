//! Shared pool bookkeeping types.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::port::connection::Connection;

/// Shared counters updated atomically by the registry.
///
/// Provides observability metrics for the connection pool.
pub(super) struct SharedCounters {
    /// Physical connections registered since the pool was created.
    pub(super) created: AtomicU64,
    /// Real `close()` calls issued by shutdown or reset.
    pub(super) closed: AtomicU64,
    /// Connections discarded after an asynchronous failure.
    pub(super) invalidations: AtomicU64,
}

impl SharedCounters {
    pub(super) fn new() -> Self {
        Self {
            created: AtomicU64::new(0),
            closed: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }
}

/// Runtime statistics for a connection pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Physical connections currently available for reuse.
    pub active_connections: usize,
    /// Active physical connections with at least one started handle.
    pub started_connections: usize,
    /// Total physical connections registered.
    pub connections_created: u64,
    /// Total real `close()` calls issued by the pool.
    pub connections_closed: u64,
    /// Total physical connections discarded after an asynchronous failure.
    pub invalidations: u64,
}

/// One physical connection owned by the registry.
///
/// Real start/stop/close calls are made while holding `transport`, whose
/// value is the closed flag those calls are gated on. It only changes under
/// that lock, so no call is issued once it is set.
///
/// `retired` decides between close and invalidation: whichever moves it off
/// `LIVE` first wins. Invalidation takes no lock, since a transport may report
/// a failure from inside a call made under `transport`. The next lock holder
/// folds it into the closed flag.
///
/// `start_count` is only written under `transport` but can be read without it.
pub(crate) struct Slot {
    id: u64,
    connection: Arc<dyn Connection>,
    transport: Mutex<bool>,
    start_count: AtomicU32,
    retired: AtomicU8,
}

const LIVE: u8 = 0;
const CLOSED: u8 = 1;
const FAILED: u8 = 2;

impl Slot {
    pub(super) fn new(id: u64, connection: Arc<dyn Connection>) -> Self {
        Self {
            id,
            connection,
            transport: Mutex::new(false),
            start_count: AtomicU32::new(0),
            retired: AtomicU8::new(LIVE),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Whether the connection was closed or reported as failed.
    pub(crate) fn is_closed(&self) -> bool {
        self.retired.load(Ordering::Acquire) != LIVE
    }

    pub(crate) fn start_count(&self) -> u32 {
        self.start_count.load(Ordering::Acquire)
    }

    pub(super) fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    /// Take the lock serializing real transport calls.
    ///
    /// The guard holds the closed flag, already updated with any failure
    /// reported since the last holder.
    pub(super) fn lock_transport(&self) -> MutexGuard<'_, bool> {
        let mut closed = self.transport.lock();
        if self.is_closed() {
            *closed = true;
        }
        closed
    }

    /// Set the start count. Callers must hold the transport lock.
    pub(super) fn set_start_count(&self, _guard: &MutexGuard<'_, bool>, count: u32) {
        self.start_count.store(count, Ordering::Release);
    }

    /// Claim the connection for a real close. Callers must hold the transport
    /// lock and issue the close if this returns `true`.
    pub(super) fn mark_closed(&self, guard: &mut MutexGuard<'_, bool>) -> bool {
        let won = self
            .retired
            .compare_exchange(LIVE, CLOSED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        **guard = true;
        won
    }

    /// Record an asynchronous failure, returning `true` if this call retired
    /// the connection.
    pub(super) fn mark_failed(&self) -> bool {
        self.retired
            .compare_exchange(LIVE, FAILED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
