//! Shared progress counters
//!
//! Written by the reader and writer threads, sampled by the status observer
//! without any locking. Every counter only grows.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Progress counters shared between the data path and the observer
#[derive(Debug, Default)]
pub struct ProgressCounters {
    /// Bytes pulled from the source
    bytes_read: AtomicU64,
    /// Bytes accepted by the destination
    bytes_written: AtomicU64,
    /// Times the reader found the ring full
    reader_waits: AtomicU64,
    /// Times the writer found the ring empty
    writer_waits: AtomicU64,
}

impl ProgressCounters {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Add to the bytes read counter
    pub fn add_read(&self, bytes: u64) {
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Add to the bytes written counter
    pub fn add_written(&self, bytes: u64) {
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record that the reader is about to block
    pub fn reader_waited(&self) {
        self.reader_waits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record that the writer is about to block
    pub fn writer_waited(&self) {
        self.writer_waits.fetch_add(1, Ordering::Relaxed);
    }

    /// Bytes read so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    /// Bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Sample all counters. Fields are read independently, so a snapshot
    /// taken mid-copy may mix values from slightly different instants.
    pub fn snapshot(&self, total_bytes: u64) -> ProgressSnapshot {
        ProgressSnapshot {
            total_bytes,
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            reader_waits: self.reader_waits.load(Ordering::Relaxed),
            writer_waits: self.writer_waits.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    /// Known source length
    pub total_bytes: u64,
    /// Bytes read
    pub bytes_read: u64,
    /// Bytes written
    pub bytes_written: u64,
    /// Reader waits
    pub reader_waits: u64,
    /// Writer waits
    pub writer_waits: u64,
}

impl ProgressSnapshot {
    /// Read completion in whole percent
    pub fn read_percent(&self) -> u64 {
        percent(self.bytes_read, self.total_bytes)
    }

    /// Write completion in whole percent
    pub fn write_percent(&self) -> u64 {
        percent(self.bytes_written, self.total_bytes)
    }

    /// Render the status line shown on the terminal
    pub fn status_line(&self) -> String {
        format!(
            "Read {:3}%, Wrote {:3}%, Waits (read/write): ({}/{})",
            self.read_percent(),
            self.write_percent(),
            self.reader_waits,
            self.writer_waits
        )
    }
}

/// An empty source counts as fully copied
fn percent(done: u64, total: u64) -> u64 {
    if total == 0 {
        return 100;
    }
    ((u128::from(done) * 100 / u128::from(total)) as u64).min(100)
}
