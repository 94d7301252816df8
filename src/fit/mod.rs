//! Fitting and scoring of submitted trial tables.
//!
//! Responsibilities:
//!
//! - OLS line recovery for identification (`linear`)
//! - closed-form vertex check for feedback (`vertex`)
//! - damped response evaluation for PID (`response`)
//! - winner selection for control (`selection`)

pub mod linear;
pub mod response;
pub mod selection;
pub mod vertex;

pub use linear::*;
pub use response::*;
pub use selection::*;
pub use vertex::*;
