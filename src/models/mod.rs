//! Closed-form lab models.
//!
//! Models are implemented as small, pure functions so that fitting and
//! rendering code can stay generic.

pub mod model;

pub use model::*;
