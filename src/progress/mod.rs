//! Progress reporting module
//!
//! Lock-free counters shared by the copy threads, and the observer that
//! turns them into a live status line.

mod counters;
mod observer;

pub use counters::*;
pub use observer::*;
