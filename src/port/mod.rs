//! Trait definitions for the transport the pool sits in front of.
//!
//! Ports are the extension points a concrete messaging client implements to
//! be pooled. The pool never depends on anything beyond these traits.
//!
//! # Available Ports
//!
//! - [`Connection`] - A physical messaging connection
//! - [`ConnectionFactory`] - Creates physical connections on demand
//! - [`ExceptionListener`] - Observer for asynchronous transport failures

pub mod connection;

pub use connection::{Connection, ConnectionFactory, ExceptionListener};
