//! Strongly-typed identifiers and the [`SimTime`] virtual clock value.
//!
//! Every identifier is a newtype so that a spell id can never be passed
//! where a unit id is expected. Equality and hashing delegate to the
//! wrapped value.

use std::fmt;
use std::ops::{Add, Sub};

/// A point on (or a span of) the virtual clock, in milliseconds.
///
/// Virtual time is scoped to one run and never moves backward. It has
/// no relationship to wall-clock time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimTime(pub u64);

impl SimTime {
    /// The start of every run.
    pub const ZERO: SimTime = SimTime(0);
    /// Sentinel for "never" (permanent auras, unbounded horizons).
    pub const MAX: SimTime = SimTime(u64::MAX);

    /// Construct from whole milliseconds.
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Construct from whole seconds.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    /// The value in milliseconds.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Whether this is the zero span.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Addition that clamps at [`SimTime::MAX`] instead of overflowing.
    pub const fn saturating_add(self, rhs: SimTime) -> SimTime {
        SimTime(self.0.saturating_add(rhs.0))
    }

    /// Subtraction that clamps at zero.
    pub const fn saturating_sub(self, rhs: SimTime) -> SimTime {
        SimTime(self.0.saturating_sub(rhs.0))
    }
}

impl Add for SimTime {
    type Output = SimTime;

    fn add(self, rhs: SimTime) -> SimTime {
        self.saturating_add(rhs)
    }
}

impl Sub for SimTime {
    type Output = SimTime;

    fn sub(self, rhs: SimTime) -> SimTime {
        self.saturating_sub(rhs)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == SimTime::MAX {
            write!(f, "never")
        } else {
            write!(f, "{}ms", self.0)
        }
    }
}

impl From<u64> for SimTime {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identifies a unit (player, pet, or enemy) within one run.
///
/// Batch runs mint per-iteration ids of the form `player-<simId>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub String);

impl UnitId {
    /// Construct from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitId {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

impl From<String> for UnitId {
    fn from(v: String) -> Self {
        Self(v)
    }
}

/// Identifies a spell. Auras are keyed by the spell id that defines them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpellId(pub u32);

impl fmt::Display for SpellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SpellId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies an in-flight projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectileId(pub u64);

impl fmt::Display for ProjectileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ProjectileId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identifies a scheduled event. Allocated sequentially per scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EventId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identifies a talent contributed by a profile bundle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TalentId(pub u32);

impl fmt::Display for TalentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TalentId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a profile bundle in the static bundle registry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BundleId(pub String);

impl BundleId {
    /// Construct from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BundleId {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_time_arithmetic_saturates() {
        assert_eq!(SimTime::MAX + SimTime(1), SimTime::MAX);
        assert_eq!(SimTime(5) - SimTime(10), SimTime::ZERO);
        assert_eq!(SimTime::from_secs(2), SimTime(2000));
    }

    #[test]
    fn sim_time_display() {
        assert_eq!(SimTime(1500).to_string(), "1500ms");
        assert_eq!(SimTime::MAX.to_string(), "never");
    }

    #[test]
    fn unit_id_equality_delegates_to_string() {
        assert_eq!(UnitId::new("player-1"), UnitId::from("player-1"));
        assert_ne!(UnitId::new("player-1"), UnitId::new("player-2"));
    }
}
