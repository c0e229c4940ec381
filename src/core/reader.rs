//! Producer side of the ring

use crate::core::ring::{CancelOnPanic, RingBuffer};
use crate::error::{Result, RingCopyError};
use crate::progress::ProgressCounters;
use serde::Serialize;
use std::io::{ErrorKind, Read};

/// A source read that ended the stream early
#[derive(Debug, Clone, Serialize)]
pub struct ReadFault {
    /// Source offset of the failed read
    pub offset: u64,
    /// Error message
    pub message: String,
}

/// What the reader did before it stopped
#[derive(Debug, Default)]
pub struct ReaderSummary {
    /// Slots published with data (the end slot is not counted)
    pub blocks_read: u64,
    /// Bytes pulled from the source
    pub bytes_read: u64,
    /// Set when the stream was cut short by a read error
    pub fault: Option<ReadFault>,
}

/// Fills successive slots from the source until end of stream or a read error.
///
/// Both terminal paths publish an end-marked slot, so the writer always gets
/// to see where the stream stops and can drain what came before it.
pub struct ReaderTask<'a, R> {
    ring: &'a RingBuffer,
    counters: &'a ProgressCounters,
    source: R,
}

impl<'a, R: Read> ReaderTask<'a, R> {
    /// Create a reader over `source`
    pub fn new(ring: &'a RingBuffer, counters: &'a ProgressCounters, source: R) -> Self {
        Self {
            ring,
            counters,
            source,
        }
    }

    /// Run until the source is exhausted.
    ///
    /// Returns `Err` only if the ring was cancelled; a read error is recorded
    /// in the summary.
    pub fn run(mut self) -> Result<ReaderSummary> {
        let _guard = CancelOnPanic(self.ring);
        let mut summary = ReaderSummary::default();

        loop {
            let mut slot = self.ring.acquire_for_produce()?;

            match read_retrying(&mut self.source, slot.buffer_mut()) {
                Ok(0) => {
                    self.ring.publish(slot, 0, true)?;
                    tracing::debug!(
                        blocks = summary.blocks_read,
                        bytes = summary.bytes_read,
                        "source exhausted"
                    );
                    return Ok(summary);
                }
                Ok(n) => {
                    self.ring.publish(slot, n, false)?;
                    self.counters.add_read(n as u64);
                    summary.blocks_read += 1;
                    summary.bytes_read += n as u64;
                }
                Err(e) => {
                    self.ring.publish(slot, 0, true)?;
                    let err = RingCopyError::ReadFailed {
                        offset: summary.bytes_read,
                        source: e,
                    };
                    tracing::error!("{}", err);
                    summary.fault = Some(ReadFault {
                        offset: summary.bytes_read,
                        message: err.to_string(),
                    });
                    return Ok(summary);
                }
            }
        }
    }
}

fn read_retrying<R: Read>(source: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    loop {
        match source.read(buf) {
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;

    /// Yields `good` bytes, then fails every read
    struct FailingSource {
        good: usize,
        served: usize,
    }

    impl Read for FailingSource {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.served >= self.good {
                return Err(std::io::Error::new(ErrorKind::Other, "device unreadable"));
            }
            let n = buf.len().min(self.good - self.served);
            buf[..n].fill(0x5A);
            self.served += n;
            Ok(n)
        }
    }

    fn drain(ring: &RingBuffer) -> Vec<(usize, bool)> {
        let mut seen = Vec::new();
        loop {
            let slot = ring.acquire_for_consume().unwrap();
            seen.push((slot.occupied(), slot.is_end()));
            if slot.is_end() {
                return seen;
            }
            ring.release(slot).unwrap();
        }
    }

    #[test]
    fn test_reader_publishes_end_slot() {
        let counters = Arc::new(ProgressCounters::new());
        let ring = RingBuffer::new(8, 4, Arc::clone(&counters)).unwrap();

        let summary = ReaderTask::new(&ring, &counters, Cursor::new(vec![1u8; 10]))
            .run()
            .unwrap();

        assert_eq!(summary.blocks_read, 3);
        assert_eq!(summary.bytes_read, 10);
        assert!(summary.fault.is_none());
        assert_eq!(counters.bytes_read(), 10);
        assert_eq!(drain(&ring), vec![(4, false), (4, false), (2, false), (0, true)]);
    }

    #[test]
    fn test_empty_source_yields_single_end_slot() {
        let counters = Arc::new(ProgressCounters::new());
        let ring = RingBuffer::new(2, 4, Arc::clone(&counters)).unwrap();

        let summary = ReaderTask::new(&ring, &counters, Cursor::new(Vec::new()))
            .run()
            .unwrap();

        assert_eq!(summary.blocks_read, 0);
        assert_eq!(drain(&ring), vec![(0, true)]);
    }

    #[test]
    fn test_read_error_still_publishes_end() {
        let counters = Arc::new(ProgressCounters::new());
        let ring = RingBuffer::new(4, 4, Arc::clone(&counters)).unwrap();
        let source = FailingSource { good: 6, served: 0 };

        let summary = ReaderTask::new(&ring, &counters, source).run().unwrap();

        let fault = summary.fault.unwrap();
        assert_eq!(fault.offset, 6);
        assert!(fault.message.contains("device unreadable"));
        assert_eq!(drain(&ring), vec![(4, false), (2, false), (0, true)]);
    }

    #[test]
    fn test_interrupted_reads_are_retried() {
        struct Flaky {
            interrupted: bool,
            inner: Cursor<Vec<u8>>,
        }
        impl Read for Flaky {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if !self.interrupted {
                    self.interrupted = true;
                    return Err(std::io::Error::from(ErrorKind::Interrupted));
                }
                self.inner.read(buf)
            }
        }

        let counters = Arc::new(ProgressCounters::new());
        let ring = RingBuffer::new(4, 8, Arc::clone(&counters)).unwrap();
        let source = Flaky {
            interrupted: false,
            inner: Cursor::new(vec![7u8; 5]),
        };

        let summary = ReaderTask::new(&ring, &counters, source).run().unwrap();
        assert!(summary.fault.is_none());
        assert_eq!(summary.bytes_read, 5);
    }
}
