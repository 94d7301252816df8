//! `labkib` library crate.
//!
//! The binary (`labkib`) is a thin wrapper around this library so that:
//!
//! - lab logic is testable without spawning a server
//! - the HTTP layer and the CLI share one pipeline
//! - code stays easy to navigate as more labs are added

pub mod app;
pub mod bridge;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod server;
