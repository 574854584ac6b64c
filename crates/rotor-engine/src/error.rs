//! Engine error types.
//!
//! [`HandlerError`] is the fail-fast wrapper around anything that goes
//! wrong inside a registered handler; [`SimError`] is what a run returns.
//! [`HookError`] is deliberately not convertible into either: reactive
//! hook failures are logged at the call site and never abort a run.

use std::error::Error;
use std::fmt;

use rotor_core::{BundleId, CastError, Hook, LookupError, ModifierError, SimTime};
use rotor_sched::ScheduleError;
use smallvec::SmallVec;

use crate::config::ConfigError;

// ── HookError ───────────────────────────────────────────────────

/// One or more modifiers failed during a fan-out hook dispatch.
///
/// Every hook in the dispatch still ran; this collects the failures.
#[derive(Clone, Debug, PartialEq)]
pub struct HookError {
    /// The hook point.
    pub hook: Hook,
    /// Name of the spell being dispatched.
    pub spell: String,
    /// `(modifier name, failure)` in dispatch order.
    pub failures: SmallVec<[(String, ModifierError); 1]>,
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hook for '{}' failed in {} modifier(s)",
            self.hook,
            self.spell,
            self.failures.len()
        )?;
        for (name, err) in &self.failures {
            write!(f, "; {name}: {}", err.reason)?;
        }
        Ok(())
    }
}

impl Error for HookError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.failures.first().map(|(_, e)| e as &(dyn Error + 'static))
    }
}

// ── ProfileError ────────────────────────────────────────────────

/// Profile composition or application failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProfileError {
    /// A requested bundle id is not registered.
    BundleNotFound(BundleId),
    /// A profile aura could not be resolved through the metadata provider.
    Lookup(LookupError),
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BundleNotFound(id) => write!(f, "profile bundle '{id}' not found"),
            Self::Lookup(e) => write!(f, "profile lookup: {e}"),
        }
    }
}

impl Error for ProfileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Lookup(e) => Some(e),
            Self::BundleNotFound(_) => None,
        }
    }
}

impl From<LookupError> for ProfileError {
    fn from(e: LookupError) -> Self {
        Self::Lookup(e)
    }
}

// ── HandlerFailure / HandlerError ───────────────────────────────

/// What went wrong inside a handler.
#[derive(Clone, Debug, PartialEq)]
pub enum HandlerFailure {
    /// The rotation program failed with something other than an
    /// interruption.
    Rotation(CastError),
    /// A metadata or state lookup failed.
    Lookup(LookupError),
    /// A caller-defined handler failed.
    Custom(String),
}

impl HandlerFailure {
    /// A free-form failure from a user handler.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rotation(e) => write!(f, "rotation: {e}"),
            Self::Lookup(e) => write!(f, "lookup: {e}"),
            Self::Custom(msg) => f.write_str(msg),
        }
    }
}

impl Error for HandlerFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Rotation(e) => Some(e),
            Self::Lookup(e) => Some(e),
            Self::Custom(_) => None,
        }
    }
}

impl From<CastError> for HandlerFailure {
    fn from(e: CastError) -> Self {
        Self::Rotation(e)
    }
}

impl From<LookupError> for HandlerFailure {
    fn from(e: LookupError) -> Self {
        Self::Lookup(e)
    }
}

/// Fatal failure of one handler while processing one event.
#[derive(Clone, Debug, PartialEq)]
pub struct HandlerError {
    /// Registry id of the failing handler.
    pub handler_id: String,
    /// Event tag, e.g. `spell_cast_complete@1500ms`.
    pub event_tag: String,
    /// The underlying failure.
    pub cause: HandlerFailure,
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "handler '{}' failed on {}: {}",
            self.handler_id, self.event_tag, self.cause
        )
    }
}

impl Error for HandlerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.cause)
    }
}

// ── SimError ────────────────────────────────────────────────────

/// Why a run (or a single driver step) failed.
#[derive(Clone, Debug, PartialEq)]
pub enum SimError {
    /// A handler failed; the run was aborted.
    Handler(HandlerError),
    /// A handler emitted an event before the current time.
    Schedule(ScheduleError),
    /// An event older than the clock reached the driver.
    TimeRegression {
        /// The event's time.
        event_time: SimTime,
        /// The clock.
        now: SimTime,
    },
    /// `run` was called on a simulation that already ran.
    AlreadyCompleted,
    /// The state has no player unit to drive the rotation.
    NoPlayer,
    /// Configuration rejected at construction.
    Config(ConfigError),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handler(e) => write!(f, "{e}"),
            Self::Schedule(e) => write!(f, "schedule: {e}"),
            Self::TimeRegression { event_time, now } => {
                write!(f, "event at {event_time} is behind the clock at {now}")
            }
            Self::AlreadyCompleted => write!(f, "simulation already completed"),
            Self::NoPlayer => write!(f, "no player unit in initial state"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl Error for SimError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Handler(e) => Some(e),
            Self::Schedule(e) => Some(e),
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HandlerError> for SimError {
    fn from(e: HandlerError) -> Self {
        Self::Handler(e)
    }
}

impl From<ScheduleError> for SimError {
    fn from(e: ScheduleError) -> Self {
        Self::Schedule(e)
    }
}

impl From<ConfigError> for SimError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn handler_error_display_names_handler_and_event() {
        let err = HandlerError {
            handler_id: "kernel.spell_damage".into(),
            event_tag: "spell_damage@3000ms".into(),
            cause: HandlerFailure::custom("boom"),
        };
        assert_eq!(
            err.to_string(),
            "handler 'kernel.spell_damage' failed on spell_damage@3000ms: boom"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn hook_error_lists_every_failure() {
        let err = HookError {
            hook: Hook::OnHit,
            spell: "Fireball".into(),
            failures: smallvec![
                ("a".to_string(), ModifierError::new("x")),
                ("b".to_string(), ModifierError::new("y")),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("2 modifier(s)"));
        assert!(msg.contains("a: x"));
        assert!(msg.contains("b: y"));
    }

    #[test]
    fn sim_error_from_handler_error() {
        let inner = HandlerError {
            handler_id: "h".into(),
            event_tag: "custom:1@0ms".into(),
            cause: HandlerFailure::custom("bad"),
        };
        let err: SimError = inner.clone().into();
        assert_eq!(err, SimError::Handler(inner));
    }
}
