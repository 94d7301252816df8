//! Chart artifacts.

pub mod chart;

pub use chart::*;
