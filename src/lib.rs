//! # RingCopy - Block-Level Copy Through a Threaded Ring Buffer
//!
//! RingCopy copies one file or block device to another, much like `dd`, but
//! overlaps reads and writes: a reader thread fills a fixed ring of blocks
//! while a writer thread drains it. A third thread shows live progress and
//! how often each side had to wait for the other.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ringcopy::core::simple_copy;
//! use std::path::Path;
//!
//! let report = simple_copy(Path::new("disk.img"), Path::new("/dev/sdb")).unwrap();
//! println!("Copied {} bytes in {} blocks", report.bytes_written, report.blocks);
//! ```
//!
//! ## Streams and Policies
//!
//! ```no_run
//! use ringcopy::config::{CopyConfig, WriteErrorPolicy};
//! use ringcopy::core::{BlockCopier, StatusDisplay};
//! use std::io::Cursor;
//!
//! let config = CopyConfig {
//!     block_size: 64 * 1024,
//!     num_blocks: 16,
//!     write_error_policy: WriteErrorPolicy::Abort,
//!     ..Default::default()
//! };
//!
//! let data = vec![0u8; 1 << 20];
//! let mut out = Vec::new();
//! let report = BlockCopier::new(config)
//!     .with_status(StatusDisplay::Terminal)
//!     .copy(Cursor::new(&data), &mut out, data.len() as u64)
//!     .unwrap();
//!
//! assert!(report.is_success());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod error;
pub mod progress;

// Re-export commonly used types
pub use config::{CopyConfig, WriteErrorPolicy};
pub use core::{BlockCopier, CopyReport, StatusDisplay};
pub use error::{Result, RingCopyError};
pub use progress::{ProgressCounters, ProgressSnapshot};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use ringcopy::prelude::*;
    //! ```

    pub use crate::config::{CopyConfig, WriteErrorPolicy};
    pub use crate::core::{simple_copy, BlockCopier, CopyReport, StatusDisplay};
    pub use crate::error::{Result, RingCopyError};
    pub use crate::progress::{StatusObserver, StatusSink, TerminalStatus};
}
