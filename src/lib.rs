//! Connpool - pooled messaging connections with lazy fault recovery.
//!
//! This crate puts a pooling layer in front of a stateful messaging
//! connection so that many logical users can share a few physical
//! connections while each physical connection is started, stopped and
//! closed exactly when it should be.
//!
//! # Modules
//!
//! - [`pool`] - [`PoolConnectionFactory`](pool::PoolConnectionFactory) and the
//!   [`PooledConnection`](pool::PooledConnection) handles it hands out
//! - [`port`] - Traits a messaging client implements to be pooled
//! - [`config`] - Configuration loading from TOML files
//! - [`error`] - Error types for the crate
//!
//! # Features
//!
//! - `testkit` - Expose recording mocks for integration tests
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use connpool::error::ConnectionError;
//! use connpool::pool::{ConnectionSource, PoolConnectionFactory};
//! use connpool::port::Connection;
//!
//! fn connect() -> Result<Arc<dyn Connection>, ConnectionError> {
//!     unimplemented!("create a transport connection")
//! }
//!
//! fn main() -> connpool::error::Result<()> {
//!     let mut pool = PoolConnectionFactory::new(ConnectionSource::factory(connect));
//!     pool.set_client_id("orders");
//!     pool.set_reconnect_on_exception(true);
//!
//!     let mut connection = pool.create_connection()?;
//!     connection.start()?;
//!     connection.close()?;
//!
//!     pool.shutdown()
//! }
//! ```

pub mod config;
pub mod error;
pub mod pool;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
