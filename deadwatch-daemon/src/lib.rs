//! Deadwatch daemon internals.
//!
//! This crate is primarily a binary; the library target exposes the
//! internal modules for integration testing.

pub mod cli;
pub mod health;
pub mod logging;
pub mod metrics_server;
pub mod orchestrator;
pub mod sink;
pub mod source;
pub mod store;
