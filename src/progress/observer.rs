//! Periodic status line
//!
//! The observer runs on its own thread and only ever reads the shared
//! counters, so it cannot slow down the reader or writer. It stops when its
//! stop channel is closed, always between two renders, then draws one last
//! line with the final counts.

use crate::progress::ProgressCounters;
use crossbeam::channel::{select, tick, Receiver};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Destination for rendered status lines
pub trait StatusSink: Send {
    /// Replace the current status line with `line`
    fn render(&mut self, line: &str);

    /// Leave the last line on screen
    fn finish(&mut self) {}
}

/// Status line on stdout, overwritten in place
pub struct TerminalStatus {
    bar: ProgressBar,
}

impl TerminalStatus {
    /// Create a status line drawn on stdout
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stdout())
    }

    /// Create a status line that draws nothing
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(None, target);
        bar.set_style(
            ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        Self { bar }
    }
}

impl Default for TerminalStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSink for TerminalStatus {
    fn render(&mut self, line: &str) {
        self.bar.set_message(line.to_string());
    }

    fn finish(&mut self) {
        self.bar.abandon();
    }
}

/// Samples the counters on every tick and renders the status line
pub struct StatusObserver {
    counters: Arc<ProgressCounters>,
    total_bytes: u64,
    sink: Box<dyn StatusSink>,
    ticker: Receiver<Instant>,
}

impl StatusObserver {
    /// Create an observer ticking every `interval`
    pub fn new(
        counters: Arc<ProgressCounters>,
        total_bytes: u64,
        sink: Box<dyn StatusSink>,
        interval: Duration,
    ) -> Self {
        Self {
            counters,
            total_bytes,
            sink,
            ticker: tick(interval),
        }
    }

    /// Drive the observer from another tick source
    pub fn with_ticker(mut self, ticker: Receiver<Instant>) -> Self {
        self.ticker = ticker;
        self
    }

    /// Render until `stop` is closed or the ticker ends.
    ///
    /// Returns the number of lines rendered, the final one included.
    pub fn run(mut self, stop: &Receiver<()>) -> u64 {
        let ticker = self.ticker.clone();
        let mut rendered = 0;

        loop {
            select! {
                recv(ticker) -> tick => {
                    if tick.is_err() {
                        break;
                    }
                    self.render();
                    rendered += 1;
                }
                recv(stop) -> _ => break,
            }
        }

        self.render();
        self.sink.finish();
        rendered + 1
    }

    fn render(&mut self) {
        let line = self.counters.snapshot(self.total_bytes).status_line();
        self.sink.render(&line);
    }
}
