//! Fixed-capacity ring of reusable slots
//!
//! Slots are allocated once and then move between two bounded queues: the
//! free list (owned by the producer side) and the filled queue (owned by the
//! consumer side). Whoever holds a [`Slot`] value owns its bytes, so the
//! producer can never overwrite a block the consumer has not released yet.
//!
//! ```text
//!            acquire_for_produce            publish
//!   free ─────────────────────────▶ reader ─────────▶ filled
//!    ▲                                                  │
//!    │           release                                │ acquire_for_consume
//!    └─────────────────────────── writer ◀──────────────┘
//! ```
//!
//! Both queues are FIFO and start with slots `0..capacity` on the free list,
//! so each side visits slot indices in increasing order modulo capacity.

use crate::error::{Result, RingCopyError};
use crate::progress::ProgressCounters;
use crossbeam::channel::{bounded, select, Receiver, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One block of the ring plus its metadata
#[derive(Debug)]
pub struct Slot {
    index: usize,
    data: Box<[u8]>,
    occupied: usize,
    is_end: bool,
}

impl Slot {
    /// Position of this slot in the ring
    pub fn index(&self) -> usize {
        self.index
    }

    /// Bytes holding valid data
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    /// True on the last slot of the stream
    pub fn is_end(&self) -> bool {
        self.is_end
    }

    /// The valid bytes of a published slot
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.occupied]
    }

    /// The whole block, for the producer to fill
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Bounded single-producer/single-consumer ring of slots
pub struct RingBuffer {
    capacity: usize,
    block_size: usize,
    free_tx: Sender<Slot>,
    free_rx: Receiver<Slot>,
    filled_tx: Sender<Slot>,
    filled_rx: Receiver<Slot>,
    /// Slots published and not yet released
    available: AtomicUsize,
    /// Dropping the sender disconnects `cancel_rx`, waking every waiter
    cancel_tx: Mutex<Option<Sender<()>>>,
    cancel_rx: Receiver<()>,
    cancelled: AtomicBool,
    counters: Arc<ProgressCounters>,
}

impl RingBuffer {
    /// Allocate `capacity` slots of `block_size` bytes each
    pub fn new(capacity: usize, block_size: usize, counters: Arc<ProgressCounters>) -> Result<Self> {
        if capacity == 0 {
            return Err(RingCopyError::config("ring capacity must be at least 1"));
        }
        if block_size == 0 {
            return Err(RingCopyError::config("block size must be at least 1"));
        }
        let total = capacity
            .checked_mul(block_size)
            .ok_or_else(|| RingCopyError::config("ring size overflows usize"))?;

        let (free_tx, free_rx) = bounded(capacity);
        let (filled_tx, filled_rx) = bounded(capacity);
        let (cancel_tx, cancel_rx) = bounded(0);

        for index in 0..capacity {
            let mut data = Vec::new();
            data.try_reserve_exact(block_size)
                .map_err(|_| RingCopyError::AllocationFailed { bytes: total })?;
            data.resize(block_size, 0);

            let slot = Slot {
                index,
                data: data.into_boxed_slice(),
                occupied: 0,
                is_end: false,
            };
            free_tx.send(slot).map_err(|_| RingCopyError::Cancelled)?;
        }

        tracing::debug!(capacity, block_size, total, "ring buffer allocated");

        Ok(Self {
            capacity,
            block_size,
            free_tx,
            free_rx,
            filled_tx,
            filled_rx,
            available: AtomicUsize::new(0),
            cancel_tx: Mutex::new(Some(cancel_tx)),
            cancel_rx,
            cancelled: AtomicBool::new(false),
            counters,
        })
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes per slot
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Slots produced but not yet consumed
    pub fn available(&self) -> usize {
        self.available.load(Ordering::Acquire)
    }

    /// Take the next free slot, blocking while every slot is in use
    pub fn acquire_for_produce(&self) -> Result<Slot> {
        if self.is_cancelled() {
            return Err(RingCopyError::Cancelled);
        }
        let mut slot = match self.free_rx.try_recv() {
            Ok(slot) => slot,
            Err(TryRecvError::Empty) => {
                self.counters.reader_waited();
                tracing::trace!("ring full, reader waiting");
                self.wait(&self.free_rx)?
            }
            Err(TryRecvError::Disconnected) => return Err(RingCopyError::Cancelled),
        };
        slot.occupied = 0;
        slot.is_end = false;
        Ok(slot)
    }

    /// Hand a filled slot to the consumer
    pub fn publish(&self, mut slot: Slot, occupied: usize, is_end: bool) -> Result<()> {
        debug_assert!(occupied <= slot.data.len());
        slot.occupied = occupied.min(slot.data.len());
        slot.is_end = is_end;

        tracing::trace!(index = slot.index, occupied, is_end, "slot published");
        self.available.fetch_add(1, Ordering::AcqRel);
        self.filled_tx.send(slot).map_err(|_| RingCopyError::Cancelled)
    }

    /// Take the next filled slot, blocking while none is available
    pub fn acquire_for_consume(&self) -> Result<Slot> {
        if self.is_cancelled() {
            return Err(RingCopyError::Cancelled);
        }
        match self.filled_rx.try_recv() {
            Ok(slot) => Ok(slot),
            Err(TryRecvError::Empty) => {
                self.counters.writer_waited();
                tracing::trace!("ring empty, writer waiting");
                self.wait(&self.filled_rx)
            }
            Err(TryRecvError::Disconnected) => Err(RingCopyError::Cancelled),
        }
    }

    /// Return a consumed slot to the producer.
    ///
    /// The end slot is never returned: nothing more will be produced.
    pub fn release(&self, slot: Slot) -> Result<()> {
        if slot.is_end {
            return Ok(());
        }
        tracing::trace!(index = slot.index, "slot released");
        self.available.fetch_sub(1, Ordering::AcqRel);
        self.free_tx.send(slot).map_err(|_| RingCopyError::Cancelled)
    }

    /// Wake every blocked waiter with [`RingCopyError::Cancelled`]
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!("ring buffer cancelled");
        if let Ok(mut guard) = self.cancel_tx.lock() {
            guard.take();
        }
    }

    /// Check if the ring was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn wait(&self, queue: &Receiver<Slot>) -> Result<Slot> {
        select! {
            recv(queue) -> slot => slot.map_err(|_| RingCopyError::Cancelled),
            recv(self.cancel_rx) -> _ => Err(RingCopyError::Cancelled),
        }
    }
}

/// Cancels the ring if the owning thread unwinds, so its peer cannot block
/// forever on a slot that will never arrive
pub(crate) struct CancelOnPanic<'a>(pub(crate) &'a RingBuffer);

impl Drop for CancelOnPanic<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn ring(capacity: usize, block_size: usize) -> RingBuffer {
        RingBuffer::new(capacity, block_size, Arc::new(ProgressCounters::new())).unwrap()
    }

    #[test]
    fn test_rejects_zero_geometry() {
        let counters = Arc::new(ProgressCounters::new());
        assert!(RingBuffer::new(0, 16, Arc::clone(&counters)).is_err());
        assert!(RingBuffer::new(4, 0, counters).is_err());
    }

    #[test]
    fn test_slot_indices_cycle_in_order() {
        let ring = ring(3, 8);
        let mut produced = Vec::new();
        let mut consumed = Vec::new();

        for round in 0..7 {
            let mut slot = ring.acquire_for_produce().unwrap();
            produced.push(slot.index());
            slot.buffer_mut()[0] = round as u8;
            ring.publish(slot, 1, false).unwrap();
            assert_eq!(ring.available(), 1);

            let slot = ring.acquire_for_consume().unwrap();
            consumed.push(slot.index());
            assert_eq!(slot.as_bytes(), &[round as u8]);
            ring.release(slot).unwrap();
            assert_eq!(ring.available(), 0);
        }

        assert_eq!(produced, vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(produced, consumed);
    }

    #[test]
    fn test_end_slot_is_not_released() {
        let ring = ring(2, 4);
        let slot = ring.acquire_for_produce().unwrap();
        ring.publish(slot, 0, true).unwrap();

        let slot = ring.acquire_for_consume().unwrap();
        assert!(slot.is_end());
        assert_eq!(slot.occupied(), 0);
        ring.release(slot).unwrap();

        assert_eq!(ring.available(), 1);
    }

    #[test]
    fn test_full_ring_counts_reader_wait() {
        let counters = Arc::new(ProgressCounters::new());
        let ring = RingBuffer::new(1, 4, Arc::clone(&counters)).unwrap();

        let slot = ring.acquire_for_produce().unwrap();
        ring.publish(slot, 4, false).unwrap();
        assert_eq!(ring.available(), ring.capacity());

        thread::scope(|s| {
            let producer = s.spawn(|| ring.acquire_for_produce().map(|slot| slot.index()));

            while counters.snapshot(0).reader_waits == 0 {
                thread::sleep(Duration::from_millis(1));
            }
            let slot = ring.acquire_for_consume().unwrap();
            ring.release(slot).unwrap();

            assert_eq!(producer.join().unwrap().unwrap(), 0);
        });

        assert_eq!(counters.snapshot(0).reader_waits, 1);
    }

    #[test]
    fn test_empty_ring_counts_writer_wait() {
        let counters = Arc::new(ProgressCounters::new());
        let ring = RingBuffer::new(2, 4, Arc::clone(&counters)).unwrap();

        thread::scope(|s| {
            let consumer = s.spawn(|| ring.acquire_for_consume().map(|slot| slot.occupied()));

            while counters.snapshot(0).writer_waits == 0 {
                thread::sleep(Duration::from_millis(1));
            }
            let slot = ring.acquire_for_produce().unwrap();
            ring.publish(slot, 3, false).unwrap();

            assert_eq!(consumer.join().unwrap().unwrap(), 3);
        });
    }

    #[test]
    fn test_cancel_wakes_blocked_consumer() {
        let ring = ring(2, 4);

        thread::scope(|s| {
            let consumer = s.spawn(|| ring.acquire_for_consume());
            thread::sleep(Duration::from_millis(20));
            ring.cancel();

            assert!(matches!(consumer.join().unwrap(), Err(RingCopyError::Cancelled)));
        });

        assert!(ring.is_cancelled());
        assert!(matches!(ring.acquire_for_consume(), Err(RingCopyError::Cancelled)));
    }

    #[test]
    fn test_cancel_wakes_blocked_producer() {
        let ring = ring(1, 4);
        let slot = ring.acquire_for_produce().unwrap();
        ring.publish(slot, 1, false).unwrap();

        thread::scope(|s| {
            let producer = s.spawn(|| ring.acquire_for_produce());
            thread::sleep(Duration::from_millis(20));
            ring.cancel();

            assert!(matches!(producer.join().unwrap(), Err(RingCopyError::Cancelled)));
        });
    }

    #[test]
    fn test_available_stays_within_capacity() {
        let ring = ring(3, 1);
        let done = AtomicBool::new(false);

        thread::scope(|s| {
            s.spawn(|| {
                for i in 0..2000u32 {
                    let mut slot = ring.acquire_for_produce().unwrap();
                    slot.buffer_mut()[0] = i as u8;
                    ring.publish(slot, 1, i == 1999).unwrap();
                }
            });
            s.spawn(|| {
                let mut expected = 0u32;
                loop {
                    let slot = ring.acquire_for_consume().unwrap();
                    assert_eq!(slot.as_bytes()[0], expected as u8);
                    expected += 1;
                    if slot.is_end() {
                        break;
                    }
                    ring.release(slot).unwrap();
                }
                done.store(true, Ordering::Release);
            });
            s.spawn(|| {
                while !done.load(Ordering::Acquire) {
                    assert!(ring.available() <= ring.capacity());
                }
            });
        });
    }
}
