//! # eb-core
//!
//! Error type and run configuration shared by the evboot crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{DEFAULT_EMAX, DEFAULT_EMIN, EnergyWindow, RunConfig};
