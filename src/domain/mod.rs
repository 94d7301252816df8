//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the enumerated lab kinds (`SystemKind`, `SubKind`) and their profiles
//! - per-session ground truth (`GroundTruth`)
//! - parsed trial tables and fit outputs
//! - stored artifacts (`Artifact`)

pub mod profile;
pub mod types;

pub use profile::*;
pub use types::*;
