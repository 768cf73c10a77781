//! Integration tests for the pooled connection factory.
//!
//! These tests drive the public API with recording mock connections and
//! verify the exact sequence of calls each physical connection receives.

use std::sync::Arc;

use connpool::error::{ConnectionError, Error};
use connpool::pool::{ConnectionSource, PoolConnectionFactory};
use connpool::port::{Connection, ExceptionListener};
use connpool::testkit::connection::{Call, MockConnection, MockConnectionFactory};
use connpool::testkit::listener::{same_listener, RecordingListener};

// ---------------------------------------------------------------------------
// Test 1: Fixed connection shared by sequential handles
// ---------------------------------------------------------------------------

#[test]
fn fixed_connection_is_started_per_cycle_and_closed_once() {
    let con = MockConnection::new();
    let pool = PoolConnectionFactory::new(ConnectionSource::single(con.clone()));

    for _ in 0..2 {
        let mut handle = pool.create_connection().unwrap();
        handle.start().unwrap();
        handle.stop().unwrap();
        handle.close().unwrap();
    }
    pool.shutdown().unwrap();

    assert_eq!(con.start_count(), 2);
    assert_eq!(con.stop_count(), 2);
    assert_eq!(con.close_count(), 1);
    assert_eq!(con.calls().len(), 5);
}

// ---------------------------------------------------------------------------
// Test 2: Factory-backed connection with client ID
// ---------------------------------------------------------------------------

#[test]
fn factory_connection_gets_client_id_once() {
    let con = MockConnection::new();
    let cf = MockConnectionFactory::returning(con.clone());
    let mut pool = PoolConnectionFactory::new(ConnectionSource::Factory(cf.clone()));
    pool.set_client_id("myId");

    let mut con1 = pool.create_connection().unwrap();
    let mut con2 = pool.create_connection().unwrap();
    con1.start().unwrap();
    con2.start().unwrap();
    con1.close().unwrap();
    con2.close().unwrap();
    pool.shutdown().unwrap();

    assert_eq!(
        con.calls(),
        vec![Call::SetClientId, Call::Start, Call::Stop, Call::Close]
    );
    assert_eq!(con.client_ids(), vec!["myId".to_string()]);
}

// ---------------------------------------------------------------------------
// Test 3: User exception listener is handed to the transport unchanged
// ---------------------------------------------------------------------------

#[test]
fn exception_listener_is_exposed_unchanged() {
    let con = MockConnection::new();
    let cf = MockConnectionFactory::returning(con.clone());
    let listener = Arc::new(RecordingListener::new());
    let mut pool = PoolConnectionFactory::new(cf.source());
    pool.set_exception_listener(listener.clone());

    let mut con1 = pool.create_connection().unwrap();
    let exposed = con1.exception_listener().unwrap().expect("listener exposed");
    assert!(same_listener(&exposed, &listener));
    con1.start().unwrap();
    con1.stop().unwrap();
    con1.close().unwrap();
    let mut con2 = pool.create_connection().unwrap();
    con2.start().unwrap();
    con2.stop().unwrap();
    con2.close().unwrap();
    pool.shutdown().unwrap();

    let reported = con.exception_listener().expect("listener installed");
    assert!(same_listener(&reported, &listener));
    assert_eq!(con.count(Call::SetExceptionListener), 1);
    assert_eq!(con.start_count(), 2);
    assert_eq!(con.stop_count(), 2);
    assert_eq!(con.close_count(), 1);
}

// ---------------------------------------------------------------------------
// Test 4: Reconnection after an asynchronous failure
// ---------------------------------------------------------------------------

#[test]
fn reconnect_on_exception_uses_fresh_connection() {
    let cf = MockConnectionFactory::new();
    let mut pool = PoolConnectionFactory::new(cf.source());
    pool.set_reconnect_on_exception(true);

    let mut con1 = pool.create_connection().unwrap();
    assert!(con1.exception_listener().unwrap().is_none());
    con1.start().unwrap();

    let failed = cf.created()[0].clone();
    let listener = failed.exception_listener().expect("reconnect listener installed");
    listener.on_exception(&ConnectionError::new(""));

    let mut con2 = pool.create_connection().unwrap();
    con2.start().unwrap();
    pool.shutdown().unwrap();

    let created = cf.created();
    assert_eq!(created.len(), 2);
    let starts: usize = created.iter().map(|c| c.start_count()).sum();
    assert_eq!(starts, 2);
    assert_eq!(failed.close_count(), 0);
    assert_eq!(created[1].close_count(), 1);
}

// ---------------------------------------------------------------------------
// Test 5: Reconnection keeps notifying the user listener
// ---------------------------------------------------------------------------

#[test]
fn reconnect_on_exception_still_notifies_user_listener() {
    let cf = MockConnectionFactory::new();
    let log = RecordingListener::shared_log();
    let listener = Arc::new(RecordingListener::named("user", log.clone()));
    let mut pool = PoolConnectionFactory::new(cf.source());
    pool.set_exception_listener(listener.clone());
    pool.set_reconnect_on_exception(true);

    let mut con1 = pool.create_connection().unwrap();
    let exposed = con1.exception_listener().unwrap().expect("listener exposed");
    assert!(same_listener(&exposed, &listener));
    con1.start().unwrap();

    let before = pool.stats().invalidations;
    cf.created()[0].fail(ConnectionError::new("").with_code("1"));
    let after = pool.stats().invalidations;

    let mut con2 = pool.create_connection().unwrap();
    con2.start().unwrap();
    pool.shutdown().unwrap();

    assert_eq!((before, after), (0, 1));
    assert_eq!(*log.lock(), vec!["user"]);
    assert_eq!(listener.count(), 1);
    assert_eq!(listener.errors()[0].code(), Some("1"));
    assert_eq!(cf.created().len(), 2);
    assert_eq!(cf.created()[1].close_count(), 1);
}

// ---------------------------------------------------------------------------
// Test 6: Plain closures as connection factory and listener
// ---------------------------------------------------------------------------

#[test]
fn closures_work_as_factory_and_listener() {
    let con = MockConnection::new();
    let shared = con.clone();
    let source = ConnectionSource::factory(move || {
        Ok::<_, ConnectionError>(shared.clone() as Arc<dyn Connection>)
    });

    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = seen.clone();
    let mut pool = PoolConnectionFactory::new(source);
    pool.set_exception_listener(Arc::new(move |e: &ConnectionError| {
        sink.lock().push(e.message().to_string());
    }));

    let mut handle = pool.create_connection().unwrap();
    handle.start().unwrap();
    con.fail(ConnectionError::new("network reset"));
    handle.close().unwrap();

    assert_eq!(*seen.lock(), vec!["network reset".to_string()]);
    assert!(matches!(handle.start(), Err(Error::IllegalState(_))));
}
