//! Min-heap of events ordered by `(time, seq)`.
//!
//! `seq` is the insertion order allocated by the scheduler, so events at
//! the same time leave the queue FIFO. Event `priority` plays no part in
//! queue order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rotor_core::{Event, SimTime};

/// Heap entry. Ordering is reversed so that the std max-heap pops the
/// smallest `(time, seq)` first.
#[derive(Debug)]
struct Entry(Event);

impl Entry {
    fn key(&self) -> (SimTime, u64) {
        (self.0.time, self.0.seq)
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

/// Priority queue of scheduled events.
///
/// All operations are `O(log n)` except [`take_all`](Self::take_all)
/// and [`retain`](Self::retain), which are `O(n log n)` and `O(n)`.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Entry>,
}

impl EventQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one event.
    pub fn offer(&mut self, event: Event) {
        self.heap.push(Entry(event));
    }

    /// Insert many events. Equivalent to calling [`offer`](Self::offer)
    /// for each in turn.
    pub fn offer_all(&mut self, events: impl IntoIterator<Item = Event>) {
        self.heap.extend(events.into_iter().map(Entry));
    }

    /// The earliest event, without removing it.
    pub fn peek(&self) -> Option<&Event> {
        self.heap.peek().map(|e| &e.0)
    }

    /// Time of the earliest event.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.peek().map(|e| e.time)
    }

    /// Remove and return the earliest event.
    pub fn poll(&mut self) -> Option<Event> {
        self.heap.pop().map(|e| e.0)
    }

    /// Remove and return the earliest event, for callers that have
    /// already checked the queue is non-empty.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty.
    pub fn take(&mut self) -> Event {
        self.poll()
            .expect("EventQueue::take called on an empty queue")
    }

    /// Drain the queue, returning every event sorted by `(time, seq)`.
    pub fn take_all(&mut self) -> Vec<Event> {
        let heap = std::mem::take(&mut self.heap);
        // into_sorted_vec is ascending by Ord, which is reversed here.
        heap.into_sorted_vec().into_iter().rev().map(|e| e.0).collect()
    }

    /// Keep only events matching `keep`. Returns how many were removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&Event) -> bool) -> usize {
        let before = self.heap.len();
        self.heap.retain(|e| keep(&e.0));
        before - self.heap.len()
    }

    /// Remove every event.
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }
}
