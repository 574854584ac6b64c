//! Rotor: a deterministic discrete-event kernel for combat-rotation simulation.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Rotor sub-crates. For most users, adding `rotor` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use rotor::prelude::*;
//!
//! let strike = Arc::new(SpellInfo::new(SpellId(1), "Strike").with_damage(50));
//! let metadata = Arc::new(StaticMetadata::new().with_spell((*strike).clone()));
//!
//! let player = Unit::builder("hero", "Hero").player().spell(strike).build();
//! let dummy = Unit::builder("dummy", "Training Dummy").health(10_000).build();
//! let state = SimState::with_units([player, dummy]);
//!
//! // Cast Strike whenever the global cooldown allows it.
//! let rotation = Arc::new(rotation_fn(|api| {
//!     let me = api.player();
//!     if api.can_cast(&me, SpellId(1)) {
//!         api.cast(&me, SpellId(1), None)?;
//!     }
//!     Ok(())
//! }));
//!
//! let mut sim = Simulation::new(state, metadata, SimConfig::default()).unwrap();
//! let result = sim.run(rotation, SimTime(3000)).unwrap();
//!
//! // Casts land at 0ms, 1500ms and 3000ms.
//! let hero = &result.final_state.units[&UnitId::new("hero")];
//! assert_eq!(hero.damage_done, 150);
//! assert_eq!(sim.phase(), SimPhase::Completed);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `rotor-core` | Ids, virtual time, entity model, events, state, modifiers |
//! | [`sched`] | `rotor-sched` | Event queue and scheduler |
//! | [`engine`] | `rotor-engine` | Driver, handler registry, services, simulation and batches |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and ids (`rotor-core`).
///
/// Contains the virtual clock ([`types::SimTime`]), the entity model,
/// events and the [`types::Emitter`] buffer, the copy-on-write
/// [`types::StateCell`], and the [`types::Modifier`] trait.
pub use rotor_core as types;

/// Event queue and scheduler (`rotor-sched`).
///
/// [`sched::Scheduler`] orders events by `(time, insertion order)` and
/// refuses events scheduled in the past.
pub use rotor_sched as sched;

/// Simulation engine (`rotor-engine`).
///
/// [`engine::Simulation`] for a single run, [`engine::SimDriver`] for
/// event-by-event control, [`engine::BatchRunner`] for many isolated
/// runs sharing one profile.
pub use rotor_engine as engine;

/// Common imports for typical Rotor usage.
///
/// ```rust
/// use rotor::prelude::*;
/// ```
///
/// This imports the entity model, events, the modifier trait, the
/// simulation entry points and the rotation API.
pub mod prelude {
    // Ids and time
    pub use rotor_core::{BundleId, SimTime, SpellId, TalentId, UnitId};

    // Entity model and metadata
    pub use rotor_core::{
        Aura, AuraInfo, MetadataProvider, SimState, Snapshot, Spell, SpellInfo, StatBlock,
        StaticMetadata, Unit,
    };

    // Events and modifiers
    pub use rotor_core::{Event, EventKind, EventPayload, Hook, HookContext, Modifier};

    // Errors
    pub use rotor_core::{CastError, ModifierError};
    pub use rotor_engine::{BatchError, HandlerFailure, ProfileError, SimError};

    // Engine
    pub use rotor_engine::{
        rotation_fn, BatchRunner, HandlerContext, HandlerOptions, HandlerRegistry, PeriodicConfig,
        ProfileBundle, ProfileComposer, Rotation, RotationApi, RunMetrics, RunResult, SimConfig,
        SimDriver, SimPhase, Simulation,
    };
}
