//! Monte-Carlo style batch execution.
//!
//! [`BatchRunner`] runs many isolated [`Simulation`]s from one set of
//! shared wiring. Each iteration gets a fresh state built for the unit
//! id `player-<sim_id>`, a fresh scheduler and handler registry, and an
//! RNG seeded with `config.seed + sim_id`. The only thing iterations
//! share is read-only: metadata, the rotation, and the profile cache.

use std::fmt;
use std::sync::Arc;

use rotor_core::{state_hash, BundleId, MetadataProvider, SimState, SimTime, UnitId};

use crate::config::{ConfigError, SimConfig};
use crate::error::{ProfileError, SimError};
use crate::profile::ProfileComposer;
use crate::registry::HandlerRegistry;
use crate::rotation::Rotation;
use crate::simulation::{RunResult, Simulation};

/// Builds an iteration's initial state for the given player unit id.
pub type StateFactory = Arc<dyn Fn(&UnitId) -> SimState + Send + Sync>;

/// Registers extra handlers on each iteration's registry.
pub type HandlerInstaller = Arc<dyn Fn(&mut HandlerRegistry) + Send + Sync>;

// ── BatchError ──────────────────────────────────────────────────

/// Errors from batch execution.
#[derive(Clone, Debug, PartialEq)]
pub enum BatchError {
    /// An iteration's run failed.
    Run {
        /// Iteration that failed (0-based).
        iteration: u64,
        /// The underlying error.
        error: SimError,
    },
    /// An iteration's profile could not be composed or applied.
    Profile {
        /// Iteration that failed (0-based).
        iteration: u64,
        /// The underlying error.
        error: ProfileError,
    },
    /// The shared configuration is invalid.
    Config(ConfigError),
    /// A caller-supplied argument is invalid.
    InvalidArgument {
        /// What was wrong.
        reason: String,
    },
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Run { iteration, error } => write!(f, "iteration {iteration}: {error}"),
            Self::Profile { iteration, error } => {
                write!(f, "iteration {iteration}: profile: {error}")
            }
            Self::Config(e) => write!(f, "config error: {e}"),
            Self::InvalidArgument { reason } => write!(f, "invalid argument: {reason}"),
        }
    }
}

impl std::error::Error for BatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Run { error, .. } => Some(error),
            Self::Profile { error, .. } => Some(error),
            Self::Config(e) => Some(e),
            Self::InvalidArgument { .. } => None,
        }
    }
}

// ── Reports ─────────────────────────────────────────────────────

/// Outcome of one iteration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IterationSummary {
    /// Iteration index.
    pub sim_id: u64,
    /// Events processed.
    pub events_processed: u64,
    /// Damage done by the player unit.
    pub damage_done: u64,
    /// [`state_hash`] of the final state.
    pub final_hash: u64,
}

/// Outcome of a whole batch.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchReport {
    /// Per-iteration summaries in iteration order.
    pub iterations: Vec<IterationSummary>,
    /// Mean player damage.
    pub mean_damage: f64,
    /// Lowest player damage.
    pub min_damage: u64,
    /// Highest player damage.
    pub max_damage: u64,
}

impl BatchReport {
    fn from_iterations(iterations: Vec<IterationSummary>) -> Self {
        let total: u64 = iterations.iter().map(|i| i.damage_done).sum();
        let min_damage = iterations.iter().map(|i| i.damage_done).min().unwrap_or(0);
        let max_damage = iterations.iter().map(|i| i.damage_done).max().unwrap_or(0);
        let mean_damage = if iterations.is_empty() {
            0.0
        } else {
            total as f64 / iterations.len() as f64
        };
        Self {
            iterations,
            mean_damage,
            min_damage,
            max_damage,
        }
    }
}

// ── BatchRunner ─────────────────────────────────────────────────

/// Runs isolated iterations from shared wiring.
pub struct BatchRunner {
    metadata: Arc<dyn MetadataProvider>,
    rotation: Arc<dyn Rotation>,
    factory: StateFactory,
    config: SimConfig,
    max_duration: SimTime,
    profile: Option<(Arc<ProfileComposer>, Vec<BundleId>)>,
    installer: Option<HandlerInstaller>,
}

impl BatchRunner {
    /// Wire a runner.
    ///
    /// `factory` must place a player unit with the id it is given.
    pub fn new<F>(
        metadata: Arc<dyn MetadataProvider>,
        rotation: Arc<dyn Rotation>,
        factory: F,
        config: SimConfig,
        max_duration: SimTime,
    ) -> Result<Self, BatchError>
    where
        F: Fn(&UnitId) -> SimState + Send + Sync + 'static,
    {
        config.validate().map_err(BatchError::Config)?;
        Ok(Self {
            metadata,
            rotation,
            factory: Arc::new(factory),
            config,
            max_duration,
            profile: None,
            installer: None,
        })
    }

    /// Apply the profile composed from `bundles` to every iteration's
    /// player unit.
    pub fn with_profile(mut self, composer: Arc<ProfileComposer>, bundles: Vec<BundleId>) -> Self {
        self.profile = Some((composer, bundles));
        self
    }

    /// Register extra handlers on every iteration.
    pub fn with_installer<F>(mut self, installer: F) -> Self
    where
        F: Fn(&mut HandlerRegistry) + Send + Sync + 'static,
    {
        self.installer = Some(Arc::new(installer));
        self
    }

    /// The unit id used for iteration `sim_id`.
    pub fn unit_id(sim_id: u64) -> UnitId {
        UnitId::new(format!("player-{sim_id}"))
    }

    /// Run iteration `sim_id` and return its full result.
    pub fn run_one(&self, sim_id: u64) -> Result<RunResult, BatchError> {
        let unit_id = Self::unit_id(sim_id);
        let mut state = (self.factory)(&unit_id);

        if let Some((composer, bundles)) = &self.profile {
            let profile = composer.compose(bundles).map_err(|error| BatchError::Profile {
                iteration: sim_id,
                error,
            })?;
            if let Some(unit) = state.units.get_mut(&unit_id) {
                profile
                    .apply_to(unit, self.metadata.as_ref())
                    .map_err(|error| BatchError::Profile {
                        iteration: sim_id,
                        error,
                    })?;
            }
        }

        let config = self.config.clone().with_seed(self.config.seed.wrapping_add(sim_id));
        let run_err = |error: SimError| BatchError::Run {
            iteration: sim_id,
            error,
        };
        let mut sim = Simulation::new(state, Arc::clone(&self.metadata), config).map_err(run_err)?;
        if let Some(install) = &self.installer {
            install(sim.registry_mut());
        }
        sim.run(Arc::clone(&self.rotation), self.max_duration)
            .map_err(run_err)
    }

    /// Run `iterations` iterations in order. The first failure stops the
    /// batch.
    pub fn run(&self, iterations: u64) -> Result<BatchReport, BatchError> {
        if iterations == 0 {
            return Err(BatchError::InvalidArgument {
                reason: "a batch needs at least one iteration".into(),
            });
        }

        let mut summaries = Vec::with_capacity(iterations as usize);
        for sim_id in 0..iterations {
            let result = self.run_one(sim_id)?;
            let damage_done = result
                .final_state
                .units
                .get(&Self::unit_id(sim_id))
                .map(|u| u.damage_done)
                .unwrap_or(0);
            summaries.push(IterationSummary {
                sim_id,
                events_processed: result.events_processed,
                damage_done,
                final_hash: state_hash(&result.final_state),
            });
        }

        let report = BatchReport::from_iterations(summaries);
        tracing::info!(
            iterations,
            mean_damage = report.mean_damage,
            min_damage = report.min_damage,
            max_damage = report.max_damage,
            "batch complete"
        );
        Ok(report)
    }
}

impl fmt::Debug for BatchRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchRunner")
            .field("config", &self.config)
            .field("max_duration", &self.max_duration)
            .field(
                "profile",
                &self.profile.as_ref().map(|(_, bundles)| bundles),
            )
            .field("has_installer", &self.installer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::rotation_fn;
    use rotor_core::{StaticMetadata, Unit};

    fn runner(config: SimConfig) -> Result<BatchRunner, BatchError> {
        BatchRunner::new(
            Arc::new(StaticMetadata::new()),
            Arc::new(rotation_fn(|_| Ok(()))),
            |id: &UnitId| SimState::with_units([Unit::builder(id.clone(), "P").player().build()]),
            config,
            SimTime(300),
        )
    }

    #[test]
    fn zero_iterations_is_invalid() {
        let err = runner(SimConfig::default()).unwrap().run(0).unwrap_err();
        assert!(matches!(err, BatchError::InvalidArgument { .. }));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SimConfig {
            crit_multiplier: 0.5,
            ..SimConfig::default()
        };
        assert!(matches!(runner(config), Err(BatchError::Config(_))));
    }

    #[test]
    fn iterations_use_distinct_unit_ids() {
        let r = runner(SimConfig::default()).unwrap();
        let a = r.run_one(0).unwrap();
        let b = r.run_one(1).unwrap();
        assert!(a.final_state.units.contains_key(&UnitId::new("player-0")));
        assert!(b.final_state.units.contains_key(&UnitId::new("player-1")));
        assert_eq!(a.events_processed, b.events_processed);
    }

    #[test]
    fn report_aggregates_damage() {
        let report = BatchReport::from_iterations(vec![
            IterationSummary { sim_id: 0, events_processed: 1, damage_done: 10, final_hash: 0 },
            IterationSummary { sim_id: 1, events_processed: 1, damage_done: 30, final_hash: 0 },
        ]);
        assert_eq!(report.min_damage, 10);
        assert_eq!(report.max_damage, 30);
        assert!((report.mean_damage - 20.0).abs() < f64::EPSILON);
    }
}
