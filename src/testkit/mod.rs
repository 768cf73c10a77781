//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`connection`]: Recording [`Connection`](crate::port::connection::Connection)
//!   and [`ConnectionFactory`](crate::port::connection::ConnectionFactory) mocks.
//! - [`listener`]: Recording exception listener.
//! - [`config`]: Canonical test configurations.

pub mod config;
pub mod connection;
pub mod listener;
