//! HTTP layer for the game collection catalog.
//!
//! The binary in `main.rs` wires configuration, the catalog and the router;
//! the modules are public so integration tests can build the same router
//! in-process.

pub mod api;
pub mod metrics;
pub mod state;
