//! The [`Scheduler`]: id and insertion-order allocation over an
//! [`EventQueue`], plus a past-time guard.

use std::error::Error;
use std::fmt;

use rotor_core::{Event, EventId, EventKind, EventPayload, PendingEvent, SimTime};

use crate::queue::EventQueue;

/// Scheduling was refused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    /// The requested time is before the scheduler's clock.
    InPast {
        /// Requested fire time.
        requested: SimTime,
        /// The scheduler's current time.
        now: SimTime,
        /// Event type that was being scheduled.
        kind: EventKind,
    },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InPast {
                requested,
                now,
                kind,
            } => write!(f, "cannot schedule {kind} at {requested}: clock is at {now}"),
        }
    }
}

impl Error for ScheduleError {}

/// Owns the event queue of one run.
///
/// Every scheduled event gets a fresh [`EventId`] and the next insertion
/// sequence number. Both counters survive [`clear`](Self::clear), so ids
/// stay unique for the scheduler's whole lifetime.
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: EventQueue,
    now: SimTime,
    next_id: u64,
    next_seq: u64,
}

impl Scheduler {
    /// An empty scheduler at t=0.
    pub fn new() -> Self {
        Self::default()
    }

    /// The scheduler's clock: the time of the last processed event.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Move the clock forward. Never moves it backward.
    pub fn advance_to(&mut self, time: SimTime) {
        if time > self.now {
            self.now = time;
        }
    }

    /// Reset the clock to zero. Used when a run (re)seeds the queue.
    pub fn rewind(&mut self) {
        self.now = SimTime::ZERO;
    }

    fn allocate(&mut self, time: SimTime, kind: EventKind, payload: EventPayload) -> Event {
        let id = EventId(self.next_id);
        let seq = self.next_seq;
        self.next_id += 1;
        self.next_seq += 1;
        Event {
            id,
            time,
            priority: kind.priority(),
            seq,
            kind,
            payload,
        }
    }

    /// Schedule an event at `time`.
    pub fn schedule(
        &mut self,
        time: SimTime,
        kind: EventKind,
        payload: EventPayload,
    ) -> Result<EventId, ScheduleError> {
        if time < self.now {
            return Err(ScheduleError::InPast {
                requested: time,
                now: self.now,
                kind,
            });
        }
        let event = self.allocate(time, kind, payload);
        let id = event.id;
        tracing::trace!(event = %kind, id = id.0, at = time.0, "scheduled");
        self.queue.offer(event);
        Ok(id)
    }

    /// Schedule a batch of handler-emitted events, in the given order.
    ///
    /// All-or-nothing: if any event lies in the past, none is enqueued.
    pub fn schedule_all(&mut self, pending: Vec<PendingEvent>) -> Result<Vec<EventId>, ScheduleError> {
        if let Some(bad) = pending.iter().find(|p| p.time < self.now) {
            return Err(ScheduleError::InPast {
                requested: bad.time,
                now: self.now,
                kind: bad.kind,
            });
        }
        let events: Vec<Event> = pending
            .into_iter()
            .map(|p| self.allocate(p.time, p.kind, p.payload))
            .collect();
        let ids = events.iter().map(|e| e.id).collect();
        self.queue.offer_all(events);
        Ok(ids)
    }

    /// Return a dequeued event to the queue unchanged. It keeps its id
    /// and insertion order, so the queue is exactly as it was before the
    /// event was taken.
    pub fn push_back(&mut self, event: Event) {
        self.queue.offer(event);
    }

    /// Remove the event with this id. Returns whether it was queued.
    pub fn cancel(&mut self, id: EventId) -> bool {
        self.queue.retain(|e| e.id != id) > 0
    }

    /// Remove every event matching `pred`. Survivors keep their order.
    pub fn cancel_where(&mut self, mut pred: impl FnMut(&Event) -> bool) -> usize {
        self.queue.retain(|e| !pred(e))
    }

    /// The earliest event.
    pub fn peek(&self) -> Option<&Event> {
        self.queue.peek()
    }

    /// Time of the earliest event.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.queue.peek_time()
    }

    /// Dequeue the earliest event.
    pub fn poll(&mut self) -> Option<Event> {
        self.queue.poll()
    }

    /// Drain every event in `(time, seq)` order.
    pub fn take_all(&mut self) -> Vec<Event> {
        self.queue.take_all()
    }

    /// Drop every queued event.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
