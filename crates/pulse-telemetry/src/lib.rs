//! Logging setup shared by pulse binaries.
//!
//! Library crates only emit `tracing` events; binaries call into
//! [`logging`] once at startup to install a subscriber.

pub mod logging;
