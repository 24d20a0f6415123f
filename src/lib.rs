//! Flood Control - Sliding-Window Admission Gate
//!
//! This crate implements an in-process flood control gate. Each check is
//! tagged with a user identifier and admitted only while that identifier has
//! made no more than a configured number of checks within a trailing window.

pub mod config;
pub mod context;
pub mod error;
pub mod gate;

pub use config::{FloodControlConfig, GateConfig};
pub use context::CheckContext;
pub use error::{FloodControlError, Result};
pub use gate::{FloodControl, RateGate};
