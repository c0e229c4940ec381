//! Configuration module for RingCopy
//!
//! Provides CLI arguments, buffer geometry and runtime settings.

mod settings;

pub use settings::*;
