//! Consumer side of the ring

use crate::config::WriteErrorPolicy;
use crate::core::ring::{CancelOnPanic, RingBuffer};
use crate::error::{Result, RingCopyError};
use crate::progress::ProgressCounters;
use serde::Serialize;
use std::io::{ErrorKind, Write};

/// A block the destination did not fully accept
#[derive(Debug, Clone, Serialize)]
pub struct WriteFault {
    /// Stream offset of the block
    pub offset: u64,
    /// Bytes the block held
    pub expected: usize,
    /// Bytes the destination accepted
    pub written: usize,
    /// Error message
    pub message: String,
}

impl WriteFault {
    fn from_error(err: &RingCopyError, offset: u64, expected: usize, written: usize) -> Self {
        Self {
            offset,
            expected,
            written,
            message: err.to_string(),
        }
    }
}

/// What the writer did before it stopped
#[derive(Debug, Default)]
pub struct WriterSummary {
    /// Data slots drained (the end slot is not counted)
    pub blocks_written: u64,
    /// Bytes accepted by the destination
    pub bytes_written: u64,
    /// Faults recorded under [`WriteErrorPolicy::Continue`]
    pub faults: Vec<WriteFault>,
}

/// Drains successive slots to the destination until the end slot arrives
pub struct WriterTask<'a, W> {
    ring: &'a RingBuffer,
    counters: &'a ProgressCounters,
    destination: W,
    policy: WriteErrorPolicy,
}

impl<'a, W: Write> WriterTask<'a, W> {
    /// Create a writer into `destination`
    pub fn new(
        ring: &'a RingBuffer,
        counters: &'a ProgressCounters,
        destination: W,
        policy: WriteErrorPolicy,
    ) -> Self {
        Self {
            ring,
            counters,
            destination,
            policy,
        }
    }

    /// Run until the end slot is written.
    ///
    /// Under [`WriteErrorPolicy::Abort`] the first fault cancels the ring and
    /// is returned as the error.
    pub fn run(mut self) -> Result<WriterSummary> {
        let _guard = CancelOnPanic(self.ring);
        let mut summary = WriterSummary::default();
        let mut offset = 0u64;

        loop {
            let slot = self.ring.acquire_for_consume()?;
            let expected = slot.occupied();

            let (written, failure) = write_block(&mut self.destination, slot.as_bytes(), offset);
            let failure = match failure {
                None if slot.is_end() => self
                    .destination
                    .flush()
                    .err()
                    .map(|source| RingCopyError::WriteFailed { offset, source }),
                other => other,
            };

            self.counters.add_written(written as u64);
            summary.bytes_written += written as u64;

            if let Some(err) = failure {
                match err {
                    RingCopyError::ShortWrite { .. } => tracing::warn!("{}", err),
                    _ => tracing::error!("{}", err),
                }
                if self.policy == WriteErrorPolicy::Abort {
                    self.ring.cancel();
                    return Err(err);
                }
                summary
                    .faults
                    .push(WriteFault::from_error(&err, offset, expected, written));
            }

            if slot.is_end() {
                tracing::debug!(
                    blocks = summary.blocks_written,
                    bytes = summary.bytes_written,
                    faults = summary.faults.len(),
                    "end of stream written"
                );
                return Ok(summary);
            }

            summary.blocks_written += 1;
            offset += expected as u64;
            self.ring.release(slot)?;
        }
    }
}

/// Write one block, continuing after partial writes.
///
/// Returns the bytes accepted and the failure that stopped the block early.
fn write_block<W: Write>(
    destination: &mut W,
    bytes: &[u8],
    offset: u64,
) -> (usize, Option<RingCopyError>) {
    let mut written = 0;
    while written < bytes.len() {
        match destination.write(&bytes[written..]) {
            Ok(0) => {
                let err = RingCopyError::ShortWrite {
                    offset,
                    expected: bytes.len(),
                    written,
                };
                return (written, Some(err));
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(source) => {
                let err = RingCopyError::WriteFailed {
                    offset: offset + written as u64,
                    source,
                };
                return (written, Some(err));
            }
        }
    }
    (written, None)
}
