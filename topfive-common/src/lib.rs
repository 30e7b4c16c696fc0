//! Shared library for the topfive services
//!
//! Holds the chart domain model, date arithmetic, the playlist event
//! protocol, configuration loading, and the common error type.

pub mod chart;
pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
