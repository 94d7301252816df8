//! Ground-truth generation for the simulations.

pub mod ground_truth;

pub use ground_truth::*;
