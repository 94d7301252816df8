//! Input/output helpers.
//!
//! - trial table and form field decoding (`ingest`)
//! - request-scoped artifact directories (`store`)

pub mod ingest;
pub mod store;

pub use ingest::*;
pub use store::*;
