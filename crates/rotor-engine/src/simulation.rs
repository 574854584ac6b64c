//! The top-level run loop.
//!
//! [`Simulation`] wraps a [`SimDriver`] with the kernel handlers
//! installed and drives one complete run of a rotation program over a
//! bounded horizon.
//!
//! # Lifecycle
//!
//! `Idle → Seeded → Running → Completed`. `Completed` is terminal: a
//! simulation runs once, successfully or not. Build a new instance for
//! the next run; [`BatchRunner`](crate::batched::BatchRunner) does this
//! for every iteration.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use rotor_core::{EventKind, EventPayload, MetadataProvider, SimState, SimTime, Snapshot};

use crate::config::SimConfig;
use crate::context::Services;
use crate::driver::SimDriver;
use crate::error::SimError;
use crate::handlers::register_kernel_handlers;
use crate::metrics::RunMetrics;
use crate::periodic;
use crate::registry::HandlerRegistry;
use crate::rotation::Rotation;

/// Where a [`Simulation`] is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimPhase {
    /// Constructed, not yet run.
    Idle,
    /// Bootstrap events scheduled.
    Seeded,
    /// Inside the run loop.
    Running,
    /// Finished. Terminal.
    Completed,
}

/// What a run produced.
#[derive(Clone, Debug)]
pub struct RunResult {
    /// State when the loop stopped.
    pub final_state: Snapshot,
    /// Events processed by the loop.
    pub events_processed: u64,
    /// Counters for the run.
    pub metrics: RunMetrics,
}

/// One isolated run: its own state, scheduler and handler registry.
#[derive(Debug)]
pub struct Simulation {
    driver: SimDriver,
    phase: SimPhase,
}

impl Simulation {
    /// Validate `config` and wire a simulation over `state` with the
    /// kernel handlers registered.
    pub fn new(
        state: SimState,
        metadata: Arc<dyn MetadataProvider>,
        config: SimConfig,
    ) -> Result<Self, SimError> {
        config.validate()?;
        let mut driver = SimDriver::new(state, Services::new(metadata, config));
        register_kernel_handlers(driver.registry_mut());
        Ok(Self {
            driver,
            phase: SimPhase::Idle,
        })
    }

    /// Register extra handlers before running.
    pub fn registry_mut(&mut self) -> &mut HandlerRegistry {
        self.driver.registry_mut()
    }

    /// Subscribe to state snapshots. Subscribe before [`run`](Self::run)
    /// to receive the initial snapshot.
    pub fn subscribe(&mut self) -> Receiver<Snapshot> {
        self.driver.subscribe()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SimPhase {
        self.phase
    }

    /// The current state.
    pub fn state(&self) -> &SimState {
        self.driver.state()
    }

    /// The underlying driver.
    pub fn driver(&self) -> &SimDriver {
        &self.driver
    }

    /// Run `rotation` for the player unit until `max_duration`, an empty
    /// queue, or the iteration cap.
    ///
    /// An event exactly at `max_duration` is processed; the first later
    /// one is left unprocessed. Hitting the iteration cap is logged and
    /// reported in [`RunMetrics::iteration_cap_hit`], not returned as an
    /// error. Any handler failure aborts the run.
    pub fn run(
        &mut self,
        rotation: Arc<dyn Rotation>,
        max_duration: SimTime,
    ) -> Result<RunResult, SimError> {
        if self.phase == SimPhase::Completed {
            return Err(SimError::AlreadyCompleted);
        }
        let result = self.seed(rotation, max_duration).and_then(|()| {
            self.phase = SimPhase::Running;
            self.run_loop(max_duration)
        });
        self.phase = SimPhase::Completed;
        let events_processed = result?;

        let metrics = self.driver.services().metrics.clone();
        tracing::info!(
            events = events_processed,
            snapshots = metrics.snapshots_published,
            casts = metrics.casts,
            end = %self.driver.state().current_time,
            "run complete"
        );
        Ok(RunResult {
            final_state: self.driver.snapshot(),
            events_processed,
            metrics,
        })
    }

    fn seed(&mut self, rotation: Arc<dyn Rotation>, max_duration: SimTime) -> Result<(), SimError> {
        let player = self
            .driver
            .state()
            .player()
            .map(|u| u.id.clone())
            .ok_or(SimError::NoPlayer)?;

        self.driver.publish_current();

        let services = self.driver.services_mut();
        services.rotation = Some(rotation);
        services.player = Some(player.clone());
        let chains = services.config.periodic.clone();

        let scheduler = self.driver.scheduler_mut();
        scheduler.clear();
        scheduler.rewind();
        scheduler.schedule(SimTime::ZERO, EventKind::AplEvaluate, EventPayload::None)?;
        periodic::start(scheduler, &player, &chains, max_duration)?;

        self.phase = SimPhase::Seeded;
        Ok(())
    }

    fn run_loop(&mut self, max_duration: SimTime) -> Result<u64, SimError> {
        let cap = self.driver.services().config.max_iterations;
        let mut processed = 0;

        while !self.driver.scheduler().is_empty() && self.driver.state().iteration_count < cap {
            let Some(event) = self.driver.scheduler_mut().poll() else {
                break;
            };
            if event.time > max_duration {
                self.driver.scheduler_mut().push_back(event);
                break;
            }
            self.driver.process_event(event)?;
            self.driver
                .state_mut()
                .update(|s| s.iteration_count += 1);
            processed += 1;
        }

        if self.driver.state().iteration_count >= cap && !self.driver.scheduler().is_empty() {
            tracing::warn!(
                cap,
                at = %self.driver.state().current_time,
                pending = self.driver.scheduler().len(),
                "iteration cap reached; stopping run"
            );
            self.driver.services_mut().metrics.iteration_cap_hit = true;
        }
        Ok(processed)
    }
}
