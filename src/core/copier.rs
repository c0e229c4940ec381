//! Main copy engine
//!
//! Allocates the ring, runs the reader, writer and status observer on their
//! own threads, and turns what they report into a [`CopyReport`].

use crate::config::CopyConfig;
use crate::core::{ReadFault, ReaderTask, RingBuffer, WriteFault, WriterTask};
use crate::error::{IoResultExt, Result, RingCopyError};
use crate::progress::{ProgressCounters, StatusObserver, StatusSink, TerminalStatus};
use crossbeam::channel::bounded;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Permission bits for a newly created destination
#[cfg(unix)]
const DESTINATION_MODE: u32 = 0o644;

/// Copy operation result
#[derive(Debug, Clone, Serialize)]
pub struct CopyReport {
    /// Source length known before the copy
    pub total_bytes: u64,
    /// Bytes pulled from the source
    pub bytes_read: u64,
    /// Bytes accepted by the destination
    pub bytes_written: u64,
    /// Data blocks moved through the ring (the end marker is not counted)
    pub blocks: u64,
    /// Times the reader found the ring full
    pub reader_waits: u64,
    /// Times the writer found the ring empty
    pub writer_waits: u64,
    /// Wall-clock duration
    pub duration: Duration,
    /// Read error that cut the stream short
    pub read_fault: Option<ReadFault>,
    /// Write errors and short writes
    pub write_faults: Vec<WriteFault>,
}

impl CopyReport {
    /// Check if the copy was completely successful
    pub fn is_success(&self) -> bool {
        self.read_fault.is_none() && self.write_faults.is_empty()
    }

    /// Average throughput in bytes/second
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.bytes_written as f64 / secs
        } else {
            0.0
        }
    }

    /// Render as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Print summary to console
    pub fn print_summary(&self) {
        println!("Completed in {:.2} seconds", self.duration.as_secs_f64());
        println!("Read:        {}", humansize::format_size(self.bytes_read, humansize::BINARY));
        println!("Wrote:       {}", humansize::format_size(self.bytes_written, humansize::BINARY));
        println!("Blocks:      {}", self.blocks);
        println!("Waits (r/w): {}/{}", self.reader_waits, self.writer_waits);
        println!("Throughput:  {}/s", humansize::format_size(self.throughput() as u64, humansize::BINARY));

        if let Some(fault) = &self.read_fault {
            println!("\nRead stopped at offset {}: {}", fault.offset, fault.message);
        }
        if !self.write_faults.is_empty() {
            println!("\nWrite faults: {}", self.write_faults.len());
            for fault in &self.write_faults {
                println!(
                    "  offset {} ({} of {} bytes) - {}",
                    fault.offset, fault.written, fault.expected, fault.message
                );
            }
        }
    }
}

/// Where the status line goes while copying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusDisplay {
    /// No observer thread
    #[default]
    Off,
    /// Live line on stdout
    Terminal,
}

/// Main copy engine
pub struct BlockCopier {
    /// Configuration
    config: CopyConfig,
    /// Status line mode
    status: StatusDisplay,
}

impl BlockCopier {
    /// Create a new copy engine
    pub fn new(config: CopyConfig) -> Self {
        Self {
            config,
            status: StatusDisplay::Off,
        }
    }

    /// Set status line mode
    pub fn with_status(mut self, status: StatusDisplay) -> Self {
        self.status = status;
        self
    }

    /// Get configuration
    pub fn config(&self) -> &CopyConfig {
        &self.config
    }

    /// Copy the configured source file or device to the destination
    pub fn execute(&self) -> Result<CopyReport> {
        self.config.validate().map_err(RingCopyError::InvalidConfig)?;

        let source_path = &self.config.source;
        let mut source = File::open(source_path).with_path(source_path)?;
        let total_bytes = source_length(&mut source, source_path)?;
        let destination = open_destination(&self.config.destination, self.config.truncate)?;

        tracing::info!(
            source = %source_path.display(),
            destination = %self.config.destination.display(),
            total_bytes,
            "starting copy"
        );

        self.copy(source, destination, total_bytes)
    }

    /// Copy `source` into `destination` through the ring.
    ///
    /// `total_bytes` is only used for progress percentages.
    pub fn copy<R, W>(&self, source: R, destination: W, total_bytes: u64) -> Result<CopyReport>
    where
        R: Read + Send,
        W: Write + Send,
    {
        self.config.validate().map_err(RingCopyError::InvalidConfig)?;
        let start_time = Instant::now();

        let counters = Arc::new(ProgressCounters::new());
        let ring = RingBuffer::new(
            self.config.num_blocks,
            self.config.block_size,
            Arc::clone(&counters),
        )?;

        let observer = self.status_sink().map(|sink| {
            StatusObserver::new(
                Arc::clone(&counters),
                total_bytes,
                sink,
                self.config.status_interval(),
            )
        });
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let policy = self.config.write_error_policy;

        let ring = &ring;
        let shared: &ProgressCounters = &counters;

        let (reader_result, writer_result) = thread::scope(|s| {
            let status = observer.map(|observer| s.spawn(move || observer.run(&stop_rx)));
            let reader = s.spawn(move || ReaderTask::new(ring, shared, source).run());
            let writer = s.spawn(move || WriterTask::new(ring, shared, destination, policy).run());

            let reader_result = reader
                .join()
                .unwrap_or(Err(RingCopyError::TaskPanicked("reader")));
            let writer_result = writer
                .join()
                .unwrap_or(Err(RingCopyError::TaskPanicked("writer")));

            drop(stop_tx);
            if let Some(Err(_)) = status.map(|handle| handle.join()) {
                tracing::warn!("status observer panicked");
            }

            (reader_result, writer_result)
        });

        let (reader, writer) = match (reader_result, writer_result) {
            (Ok(reader), Ok(writer)) => (reader, writer),
            (Err(e), Err(RingCopyError::Cancelled)) | (Err(RingCopyError::Cancelled), Err(e)) => {
                return Err(e)
            }
            (Err(e), _) | (_, Err(e)) => return Err(e),
        };

        let snapshot = counters.snapshot(total_bytes);
        let report = CopyReport {
            total_bytes,
            bytes_read: reader.bytes_read,
            bytes_written: writer.bytes_written,
            blocks: writer.blocks_written,
            reader_waits: snapshot.reader_waits,
            writer_waits: snapshot.writer_waits,
            duration: start_time.elapsed(),
            read_fault: reader.fault,
            write_faults: writer.faults,
        };

        tracing::debug!(
            blocks = report.blocks,
            bytes = report.bytes_written,
            success = report.is_success(),
            "copy finished"
        );

        Ok(report)
    }

    fn status_sink(&self) -> Option<Box<dyn StatusSink>> {
        match self.status {
            StatusDisplay::Off => None,
            StatusDisplay::Terminal => Some(Box::new(TerminalStatus::new())),
        }
    }
}

/// Length of a file or block device.
///
/// Block devices report a zero metadata length, so fall back to seeking.
fn source_length(file: &mut File, path: &Path) -> Result<u64> {
    let len = file.metadata().with_path(path)?.len();
    if len > 0 {
        return Ok(len);
    }
    let end = file.seek(SeekFrom::End(0)).with_path(path)?;
    file.seek(SeekFrom::Start(0)).with_path(path)?;
    Ok(end)
}

fn open_destination(path: &Path, truncate: bool) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(truncate);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(DESTINATION_MODE);
    }

    options.open(path).with_path(path)
}

/// Copy a file with default settings
pub fn simple_copy(source: &Path, dest: &Path) -> Result<CopyReport> {
    let config = CopyConfig {
        source: source.to_path_buf(),
        destination: dest.to_path_buf(),
        ..Default::default()
    };

    BlockCopier::new(config).execute()
}
