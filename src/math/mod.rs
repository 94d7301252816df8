//! Mathematical utilities: least squares and numeric helpers.

pub mod numeric;
pub mod ols;

pub use numeric::*;
pub use ols::*;
