//! Error types shared across the Rotor kernel.
//!
//! Organized by failure tier: lookups (NotFound), cast validation
//! (domain-rule violations that rotations are expected to guard
//! against), and modifier hook failures.

use std::error::Error;
use std::fmt;

use crate::id::{SimTime, SpellId, UnitId};

/// A typed NotFound from a lookup against state or metadata.
///
/// Recoverable by the immediate caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupError {
    /// No spell metadata (or no spell on the unit) for this id.
    SpellNotFound(SpellId),
    /// No aura metadata for this id.
    AuraNotFound(SpellId),
    /// The unit is not present in the current state.
    UnitNotFound(UnitId),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpellNotFound(id) => write!(f, "spell {id} not found"),
            Self::AuraNotFound(id) => write!(f, "aura {id} not found"),
            Self::UnitNotFound(id) => write!(f, "unit '{id}' not found"),
        }
    }
}

impl Error for LookupError {}

/// A single modifier hook failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModifierError {
    /// Human-readable description of the failure.
    pub reason: String,
}

impl ModifierError {
    /// Construct from any message.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ModifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "modifier failed: {}", self.reason)
    }
}

impl Error for ModifierError {}

/// Why a cast request was refused.
///
/// Everything except [`CastError::Interrupted`] and
/// [`CastError::Modifier`] is ordinary control flow: rotations are
/// expected to guard with `can_cast` first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CastError {
    /// The caster is not present in the current state.
    UnitNotFound(UnitId),
    /// The caster does not know this spell.
    SpellNotFound {
        /// The caster.
        unit: UnitId,
        /// The requested spell.
        spell: SpellId,
    },
    /// The spell's cooldown has not expired yet.
    SpellOnCooldown {
        /// The requested spell.
        spell: SpellId,
        /// Time left until the cooldown expires.
        remaining: SimTime,
    },
    /// A charge-based spell has no charges left.
    NoChargesAvailable {
        /// The requested spell.
        spell: SpellId,
    },
    /// The global cooldown is still running.
    GcdActive {
        /// When the global cooldown ends.
        ready_at: SimTime,
    },
    /// The caster is in the middle of a cast-time spell.
    AlreadyCasting {
        /// The spell being cast.
        casting: SpellId,
        /// When the in-flight cast completes.
        completes_at: SimTime,
    },
    /// The caster's power pool cannot pay the spell's cost.
    InsufficientPower {
        /// The requested spell.
        spell: SpellId,
        /// Power the spell costs.
        cost: u64,
        /// Power the caster has.
        available: u64,
    },
    /// A `before_cast` modifier failed while transforming the spell.
    Modifier {
        /// Name of the failing modifier.
        modifier: String,
        /// The underlying failure.
        reason: ModifierError,
    },
    /// The current rotation evaluation was displaced by a successful
    /// cast (or a wait). Not an error: the driver treats it as success.
    Interrupted,
}

impl CastError {
    /// Whether this is the interruption signal rather than a refusal.
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

impl fmt::Display for CastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnitNotFound(unit) => write!(f, "unit '{unit}' not found"),
            Self::SpellNotFound { unit, spell } => {
                write!(f, "unit '{unit}' does not know spell {spell}")
            }
            Self::SpellOnCooldown { spell, remaining } => {
                write!(f, "spell {spell} on cooldown for {remaining}")
            }
            Self::NoChargesAvailable { spell } => {
                write!(f, "spell {spell} has no charges available")
            }
            Self::GcdActive { ready_at } => write!(f, "global cooldown active until {ready_at}"),
            Self::AlreadyCasting {
                casting,
                completes_at,
            } => write!(f, "already casting spell {casting} until {completes_at}"),
            Self::InsufficientPower {
                spell,
                cost,
                available,
            } => write!(f, "spell {spell} costs {cost} power, {available} available"),
            Self::Modifier { modifier, reason } => {
                write!(f, "before_cast modifier '{modifier}' failed: {reason}")
            }
            Self::Interrupted => write!(f, "rotation evaluation interrupted"),
        }
    }
}

impl Error for CastError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Modifier { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cast_error_display_mentions_spell() {
        let err = CastError::SpellOnCooldown {
            spell: SpellId(7),
            remaining: SimTime(1500),
        };
        assert_eq!(err.to_string(), "spell 7 on cooldown for 1500ms");
    }

    #[test]
    fn only_interrupted_is_interruption() {
        assert!(CastError::Interrupted.is_interruption());
        assert!(!CastError::GcdActive {
            ready_at: SimTime(10)
        }
        .is_interruption());
    }

    #[test]
    fn modifier_cast_error_exposes_source() {
        let err = CastError::Modifier {
            modifier: "haste".into(),
            reason: ModifierError::new("boom"),
        };
        assert!(err.source().is_some());
    }
}
