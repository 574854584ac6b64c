//! Event processing: the inner loop of a run.
//!
//! [`SimDriver`] owns one run's state, scheduler, handler registry and
//! services. [`process_event`](SimDriver::process_event) runs every
//! matching handler for one event in dispatch order, then merges the
//! events they emitted back into the scheduler. [`run`](SimDriver::run),
//! [`step`](SimDriver::step) and [`as_stream`](SimDriver::as_stream) are
//! three ways of pulling events through it.
//!
//! # Snapshots
//!
//! After each event the new state is compared to the state as it was
//! before the first handler ran. Only a real difference is published to
//! [`SnapshotHub`] subscribers, so no-op events never produce duplicate
//! snapshots. Subscribers receive `Arc`s; the driver never mutates a
//! state it has published.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use rotor_core::{Emitter, Event, SimState, SimTime, Snapshot, StateCell};
use rotor_sched::Scheduler;

use crate::context::{CastOutcome, HandlerContext, Services};
use crate::error::{HandlerError, SimError};
use crate::registry::HandlerRegistry;

// Compile-time assertion: a driver can be moved to a worker thread.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<SimDriver>();
    }
};

// ── SnapshotHub ─────────────────────────────────────────────────

/// Fan-out of published snapshots to any number of subscribers.
///
/// Channels are unbounded, so publishing never blocks the run. A
/// subscriber that drops its receiver is forgotten on the next publish.
#[derive(Debug, Default)]
pub struct SnapshotHub {
    senders: Vec<Sender<Snapshot>>,
}

impl SnapshotHub {
    /// A hub with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber. It sees every snapshot published from now on.
    pub fn subscribe(&mut self) -> Receiver<Snapshot> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.senders.push(tx);
        rx
    }

    /// Send `snapshot` to every live subscriber. Returns how many
    /// received it.
    pub fn publish(&mut self, snapshot: &Snapshot) -> usize {
        self.senders
            .retain(|tx| tx.send(Arc::clone(snapshot)).is_ok());
        self.senders.len()
    }

    /// Number of subscribers still connected as of the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.senders.len()
    }
}

// ── ProcessedEvent ──────────────────────────────────────────────

/// Result of processing one event.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessedEvent {
    /// The event.
    pub event: Event,
    /// Whether a handler reported an interruption.
    pub outcome: CastOutcome,
    /// Whether the handlers changed the state (and a snapshot was
    /// published).
    pub state_changed: bool,
}

// ── SimDriver ───────────────────────────────────────────────────

/// Owner of one run's moving parts.
#[derive(Debug)]
pub struct SimDriver {
    state: StateCell,
    scheduler: Scheduler,
    registry: HandlerRegistry,
    services: Services,
    hub: SnapshotHub,
}

impl SimDriver {
    /// A driver over `state` with an empty scheduler and registry.
    pub fn new(state: SimState, services: Services) -> Self {
        Self {
            state: StateCell::new(state),
            scheduler: Scheduler::new(),
            registry: HandlerRegistry::new(),
            services,
            hub: SnapshotHub::new(),
        }
    }

    /// Process one dequeued event.
    ///
    /// Handlers run sequentially in [`HandlerRegistry::get_handlers`]
    /// order. The first failure aborts the remaining handlers and is
    /// returned as [`SimError::Handler`]; events emitted before the
    /// failure are discarded.
    pub fn process_event(&mut self, event: Event) -> Result<ProcessedEvent, SimError> {
        let now = self.scheduler.now();
        if event.time < now {
            return Err(SimError::TimeRegression {
                event_time: event.time,
                now,
            });
        }
        self.scheduler.advance_to(event.time);
        if self.state.current().current_time < event.time {
            self.state.update(|s| s.current_time = event.time);
        }

        let baseline = self.state.snapshot();
        let handlers = self.registry.get_handlers(&event);
        let mut emitter = Emitter::new(event.time);
        let mut outcome = CastOutcome::Completed;

        for handler in &handlers {
            tracing::trace!(handler = %handler.id, event = %event.kind, at = event.time.0, "dispatch");
            self.services.metrics.handler_invocations += 1;
            let mut ctx = HandlerContext::new(
                &mut self.state,
                &mut emitter,
                &mut self.services,
                &mut outcome,
            );
            handler
                .call(&event, &mut ctx)
                .map_err(|cause| HandlerError {
                    handler_id: handler.id.clone(),
                    event_tag: event.tag(),
                    cause,
                })?;
        }

        self.scheduler.schedule_all(emitter.drain())?;
        self.services.metrics.events_processed += 1;

        let current = self.state.snapshot();
        let state_changed = !Arc::ptr_eq(&baseline, &current) && *baseline != *current;
        drop(baseline);
        if state_changed {
            self.publish_snapshot(&current);
        }

        Ok(ProcessedEvent {
            event,
            outcome,
            state_changed,
        })
    }

    /// Process events up to and including `end`.
    ///
    /// The first event past `end` is returned to the queue with its id
    /// and insertion order intact, so a later call continues exactly
    /// where this one stopped. Returns the number of events processed.
    pub fn run(&mut self, end: SimTime) -> Result<u64, SimError> {
        let mut processed = 0;
        while let Some(event) = self.scheduler.poll() {
            if event.time > end {
                self.scheduler.push_back(event);
                break;
            }
            self.process_event(event)?;
            processed += 1;
        }
        Ok(processed)
    }

    /// Process exactly one event, or return `None` if the queue is empty.
    pub fn step(&mut self) -> Result<Option<ProcessedEvent>, SimError> {
        match self.scheduler.poll() {
            Some(event) => self.process_event(event).map(Some),
            None => Ok(None),
        }
    }

    /// Lazily process events up to `end`, yielding each one after it has
    /// been processed. The stream ends at the horizon, on an empty queue,
    /// or after yielding an error.
    pub fn as_stream(&mut self, end: SimTime) -> EventStream<'_> {
        EventStream {
            driver: self,
            end,
            done: false,
        }
    }

    /// Publish the current state unconditionally.
    pub fn publish_current(&mut self) {
        let snapshot = self.state.snapshot();
        self.publish_snapshot(&snapshot);
    }

    fn publish_snapshot(&mut self, snapshot: &Snapshot) {
        self.hub.publish(snapshot);
        self.services.metrics.snapshots_published += 1;
    }

    /// Subscribe to published snapshots.
    pub fn subscribe(&mut self) -> Receiver<Snapshot> {
        self.hub.subscribe()
    }

    /// The current state.
    pub fn state(&self) -> &SimState {
        self.state.current()
    }

    /// Share the current state.
    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }

    /// Mutable access to the state cell.
    pub fn state_mut(&mut self) -> &mut StateCell {
        &mut self.state
    }

    /// The scheduler.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Mutable access to the scheduler.
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// The handler registry.
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Mutable access to the handler registry.
    pub fn registry_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.registry
    }

    /// Run wiring.
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Mutable access to the run wiring.
    pub fn services_mut(&mut self) -> &mut Services {
        &mut self.services
    }
}

// ── EventStream ─────────────────────────────────────────────────

/// Iterator returned by [`SimDriver::as_stream`].
///
/// Fused: once it has returned `None` (or an error) it stays exhausted.
#[derive(Debug)]
pub struct EventStream<'d> {
    driver: &'d mut SimDriver,
    end: SimTime,
    done: bool,
}

impl Iterator for EventStream<'_> {
    type Item = Result<Event, SimError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let Some(event) = self.driver.scheduler.poll() else {
            self.done = true;
            return None;
        };
        if event.time > self.end {
            self.driver.scheduler.push_back(event);
            self.done = true;
            return None;
        }
        match self.driver.process_event(event) {
            Ok(processed) => Some(Ok(processed.event)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for EventStream<'_> {}
