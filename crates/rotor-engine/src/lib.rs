//! Simulation engine for the Rotor combat-rotation kernel.
//!
//! Wires the handler registry, spell lifecycle dispatch, the cast
//! pipeline and the projectile, periodic and profile services into a
//! [`SimDriver`], and drives complete runs through [`Simulation`] and
//! batches of isolated runs through [`BatchRunner`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod batched;
pub mod cast;
pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod metrics;
pub mod periodic;
pub mod profile;
pub mod projectile;
pub mod registry;
pub mod rotation;
pub mod simulation;

pub use batched::{BatchError, BatchReport, BatchRunner, IterationSummary};
pub use cast::CastReceipt;
pub use config::{AutoAction, ConfigError, PeriodicConfig, SimConfig};
pub use context::{CastOutcome, HandlerContext, Services};
pub use driver::{EventStream, ProcessedEvent, SimDriver, SnapshotHub};
pub use error::{HandlerError, HandlerFailure, HookError, ProfileError, SimError};
pub use handlers::register_kernel_handlers;
pub use metrics::RunMetrics;
pub use profile::{BundleRegistry, ComposedProfile, ProfileBundle, ProfileComposer, SpellOverride};
pub use projectile::ProjectileService;
pub use registry::{priority, EventFilter, HandlerOptions, HandlerRegistry, Subscription};
pub use rotation::{rotation_fn, Rotation, RotationApi};
pub use simulation::{RunResult, SimPhase, Simulation};
