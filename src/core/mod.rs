//! Core copy engine module
//!
//! The slot ring, the reader and writer that pass slots through it, and the
//! engine that runs them together.

mod copier;
mod reader;
mod ring;
mod writer;

pub use copier::*;
pub use reader::*;
pub use ring::{RingBuffer, Slot};
pub use writer::*;
