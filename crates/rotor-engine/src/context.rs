//! What a handler can touch while processing one event.

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rotor_core::{Emitter, MetadataProvider, SimState, SimTime, StateCell, UnitId};

use crate::config::SimConfig;
use crate::metrics::RunMetrics;
use crate::projectile::ProjectileService;
use crate::rotation::Rotation;

/// How the processing of one event ended.
///
/// `Interrupted` is recorded when a successful cast displaced the
/// rotation evaluation in flight. It is never an error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CastOutcome {
    /// Every handler ran to completion.
    #[default]
    Completed,
    /// A handler reported an interruption.
    Interrupted,
}

/// Per-run wiring shared by every handler.
pub struct Services {
    /// Static spell/aura lookups.
    pub metadata: Arc<dyn MetadataProvider>,
    /// Run configuration.
    pub config: SimConfig,
    /// Seeded RNG. The only source of randomness in a run.
    pub rng: ChaCha8Rng,
    /// Rotation program evaluated on `apl_evaluate`.
    pub rotation: Option<Arc<dyn Rotation>>,
    /// Unit the rotation acts for.
    pub player: Option<UnitId>,
    /// Projectile id allocation and resolution.
    pub projectiles: ProjectileService,
    /// Counters.
    pub metrics: RunMetrics,
}

impl Services {
    /// Fresh services with the RNG seeded from `config.seed`.
    pub fn new(metadata: Arc<dyn MetadataProvider>, config: SimConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            metadata,
            config,
            rng,
            rotation: None,
            player: None,
            projectiles: ProjectileService::new(),
            metrics: RunMetrics::default(),
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("config", &self.config)
            .field("has_rotation", &self.rotation.is_some())
            .field("player", &self.player)
            .field("metrics", &self.metrics)
            .finish()
    }
}

/// Mutable view handed to each handler.
///
/// The fields are disjoint borrows, so a handler can hold the state,
/// the emitter and a service at the same time.
pub struct HandlerContext<'a> {
    /// The run's state.
    pub state: &'a mut StateCell,
    /// Output buffer for new events.
    pub emitter: &'a mut Emitter,
    /// Run wiring.
    pub services: &'a mut Services,
    outcome: &'a mut CastOutcome,
}

impl<'a> HandlerContext<'a> {
    pub(crate) fn new(
        state: &'a mut StateCell,
        emitter: &'a mut Emitter,
        services: &'a mut Services,
        outcome: &'a mut CastOutcome,
    ) -> Self {
        Self {
            state,
            emitter,
            services,
            outcome,
        }
    }

    /// Time of the event being processed.
    pub fn now(&self) -> SimTime {
        self.emitter.now()
    }

    /// The current state.
    pub fn current(&self) -> &SimState {
        self.state.current()
    }

    /// Record that this event's work was interrupted by a new cast.
    pub fn interrupt(&mut self) {
        *self.outcome = CastOutcome::Interrupted;
    }

    /// The outcome so far.
    pub fn outcome(&self) -> CastOutcome {
        *self.outcome
    }
}
