//! Configuration settings for RingCopy
//!
//! Defines the CLI arguments, the runtime copy configuration and its
//! defaults.

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default bytes per slot (1 MiB)
pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;

/// Default number of slots in the ring
pub const DEFAULT_NUM_BLOCKS: usize = 10;

/// Default status refresh period in milliseconds
pub const DEFAULT_STATUS_INTERVAL_MS: u64 = 125;

/// RingCopy - block-level copy through a threaded ring buffer
#[derive(Parser, Debug, Clone)]
#[command(name = "ringcopy")]
#[command(author = "RingCopy Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Block-level copy with overlapped reads and writes, like dd with a better status")]
#[command(long_about = r#"
RingCopy performs a block-level copy from one file (or device) to another.

A reader thread fills a ring of fixed-size blocks while a writer thread
drains it, so reads and writes overlap. A status line shows read/write
progress and how often each side had to wait for the other.

total buffer size in bytes = block_size * num_blocks

Examples:
  ringcopy disk.img /dev/sdb                 # 10 x 1M buffer
  ringcopy -s 4M -b 32 disk.img /dev/sdb     # 128M buffer
  ringcopy --truncate a.bin b.bin            # plain file copy
"#)]
pub struct CliArgs {
    /// Input file or device
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file or device (created if absent)
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Size of each block (e.g., 4096, 64K, 1M)
    #[arg(short = 's', long, default_value = "1M", value_name = "SIZE")]
    pub block_size: String,

    /// Number of blocks in the buffer
    #[arg(short = 'b', long = "blocks", default_value_t = DEFAULT_NUM_BLOCKS, value_name = "NUM")]
    pub num_blocks: usize,

    /// Status refresh period in milliseconds
    #[arg(long, default_value_t = DEFAULT_STATUS_INTERVAL_MS, value_name = "MS")]
    pub interval_ms: u64,

    /// Truncate the output before writing
    #[arg(long)]
    pub truncate: bool,

    /// Stop the copy on the first write error or short write
    #[arg(long)]
    pub abort_on_write_error: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress the status line and banner)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Output format for the final report
    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

/// Output format for reports
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
}

/// What the writer does when the destination rejects a block
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WriteErrorPolicy {
    /// Record the fault and move on to the next block
    #[default]
    Continue,
    /// Cancel the copy and return the error
    Abort,
}

/// Runtime configuration derived from CLI args
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyConfig {
    /// Source path
    pub source: PathBuf,
    /// Destination path
    pub destination: PathBuf,
    /// Bytes per slot
    pub block_size: usize,
    /// Slot count
    pub num_blocks: usize,
    /// Status refresh period in milliseconds
    pub status_interval_ms: u64,
    /// Truncate the destination on open
    pub truncate: bool,
    /// Reaction to write errors and short writes
    pub write_error_policy: WriteErrorPolicy,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            destination: PathBuf::new(),
            block_size: DEFAULT_BLOCK_SIZE,
            num_blocks: DEFAULT_NUM_BLOCKS,
            status_interval_ms: DEFAULT_STATUS_INTERVAL_MS,
            truncate: false,
            write_error_policy: WriteErrorPolicy::Continue,
        }
    }
}

/// Parse human-readable size string to bytes
pub fn parse_size(size: &str) -> Result<u64, String> {
    let size = size.trim().to_uppercase();

    if size.is_empty() {
        return Err("Empty size string".to_string());
    }

    let (num_str, multiplier) = if size.ends_with("GB") || size.ends_with('G') {
        let num = size.trim_end_matches(|c| c == 'G' || c == 'B');
        (num, 1024u64 * 1024 * 1024)
    } else if size.ends_with("MB") || size.ends_with('M') {
        let num = size.trim_end_matches(|c| c == 'M' || c == 'B');
        (num, 1024u64 * 1024)
    } else if size.ends_with("KB") || size.ends_with('K') {
        let num = size.trim_end_matches(|c| c == 'K' || c == 'B');
        (num, 1024u64)
    } else if size.ends_with('B') {
        (size.trim_end_matches('B'), 1u64)
    } else {
        // Assume bytes if no suffix
        (size.as_str(), 1u64)
    };

    let num: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number: {}", num_str))?;

    if !num.is_finite() || num < 0.0 {
        return Err(format!("Invalid size: {}", size));
    }

    Ok((num * multiplier as f64) as u64)
}

impl CopyConfig {
    /// Create config from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self, String> {
        let block_size = parse_size(&args.block_size)
            .map_err(|e| format!("Invalid block size: {}", e))?;
        let block_size =
            usize::try_from(block_size).map_err(|_| format!("Block size too large: {}", block_size))?;

        let config = Self {
            source: args.input.clone(),
            destination: args.output.clone(),
            block_size,
            num_blocks: args.num_blocks,
            status_interval_ms: args.interval_ms,
            truncate: args.truncate,
            write_error_policy: if args.abort_on_write_error {
                WriteErrorPolicy::Abort
            } else {
                WriteErrorPolicy::Continue
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Check the buffer geometry and timing parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.block_size == 0 {
            return Err("Block size must be at least 1 byte".to_string());
        }
        if self.num_blocks == 0 {
            return Err("Number of blocks must be at least 1".to_string());
        }
        if self.status_interval_ms == 0 {
            return Err("Status interval must be at least 1 ms".to_string());
        }
        self.total_buffer_size()?;
        Ok(())
    }

    /// Total ring size in bytes (block_size * num_blocks)
    pub fn total_buffer_size(&self) -> Result<usize, String> {
        self.block_size.checked_mul(self.num_blocks).ok_or_else(|| {
            format!(
                "Buffer size overflows: {} blocks of {} bytes",
                self.num_blocks, self.block_size
            )
        })
    }

    /// Status refresh period
    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }
}
