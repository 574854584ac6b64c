//! Core types and traits for the Rotor combat-rotation simulation kernel.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the Rotor workspace:
//! typed ids and the virtual clock, the entity model, events, the
//! copy-on-write state cell, the modifier trait, the metadata boundary,
//! and error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod event;
pub mod hash;
pub mod id;
pub mod metadata;
pub mod model;
pub mod modifier;
pub mod state;

pub use error::{CastError, LookupError, ModifierError};
pub use event::{Emitter, Event, EventKind, EventPayload, PendingEvent};
pub use hash::state_hash;
pub use id::{BundleId, EventId, ProjectileId, SimTime, SpellId, TalentId, UnitId};
pub use metadata::{MetadataProvider, StaticMetadata};
pub use model::{
    ActiveCast, Aura, AuraInfo, Pool, Position, Projectile, Spell, SpellInfo, StatBlock, Unit,
    UnitBuilder, DEFAULT_GCD,
};
pub use modifier::{Hook, HookContext, Modifier, ModifierList};
pub use state::{SimState, Snapshot, StateCell};
