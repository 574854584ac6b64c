//! Run configuration, validation, and error types.
//!
//! [`SimConfig`] is the input for constructing a
//! [`Simulation`](crate::simulation::Simulation).
//! [`validate()`](SimConfig::validate) checks structural invariants
//! before anything is wired up.

use std::error::Error;
use std::fmt;

use rotor_core::{SimTime, SpellId};

/// Default runaway-loop cap.
pub const DEFAULT_MAX_ITERATIONS: u64 = 100_000;

// ── PeriodicConfig ──────────────────────────────────────────────

/// An automatic action cast on a fixed interval through the normal
/// cast path.
#[derive(Clone, Debug, PartialEq)]
pub struct AutoAction {
    /// Spell to cast.
    pub spell: SpellId,
    /// Interval between casts. Must be non-zero.
    pub interval: SimTime,
}

/// Configuration for the periodic trigger chains.
#[derive(Clone, Debug, PartialEq)]
pub struct PeriodicConfig {
    /// Power regeneration interval. `None` disables the chain. Default: 2000ms.
    pub power_interval: Option<SimTime>,
    /// Power restored per tick. Default: 10.
    pub power_amount: u64,
    /// Optional auto-action chain. Default: none.
    pub auto_action: Option<AutoAction>,
}

impl Default for PeriodicConfig {
    fn default() -> Self {
        Self {
            power_interval: Some(SimTime(2000)),
            power_amount: 10,
            auto_action: None,
        }
    }
}

// ── ConfigError ─────────────────────────────────────────────────

/// Errors detected during [`SimConfig::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// `max_iterations` is zero.
    ZeroIterationCap,
    /// A named interval is zero (would re-trigger forever at one instant).
    ZeroInterval {
        /// Which interval.
        name: &'static str,
    },
    /// `crit_multiplier` is NaN, infinite, or below 1.
    InvalidCritMultiplier {
        /// The invalid value.
        value: f64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroIterationCap => write!(f, "max_iterations must be at least 1"),
            Self::ZeroInterval { name } => write!(f, "{name} must be non-zero"),
            Self::InvalidCritMultiplier { value } => {
                write!(f, "crit_multiplier must be finite and >= 1.0, got {value}")
            }
        }
    }
}

impl Error for ConfigError {}

// ── SimConfig ───────────────────────────────────────────────────

/// Complete configuration for one run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimConfig {
    /// RNG seed for critical-strike rolls.
    pub seed: u64,
    /// Safety cap on processed events. Default: 100000.
    pub max_iterations: u64,
    /// Delay before re-evaluating a rotation that neither cast nor
    /// waited. Default: 100ms.
    pub apl_idle_interval: SimTime,
    /// Damage multiplier for critical strikes. Default: 2.0.
    pub crit_multiplier: f64,
    /// Periodic trigger chains.
    pub periodic: PeriodicConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            apl_idle_interval: SimTime(100),
            crit_multiplier: 2.0,
            periodic: PeriodicConfig::default(),
        }
    }
}

impl SimConfig {
    /// Same configuration with a different seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroIterationCap);
        }
        if self.apl_idle_interval.is_zero() {
            return Err(ConfigError::ZeroInterval {
                name: "apl_idle_interval",
            });
        }
        if !self.crit_multiplier.is_finite() || self.crit_multiplier < 1.0 {
            return Err(ConfigError::InvalidCritMultiplier {
                value: self.crit_multiplier,
            });
        }
        if self.periodic.power_interval == Some(SimTime::ZERO) {
            return Err(ConfigError::ZeroInterval {
                name: "periodic.power_interval",
            });
        }
        if let Some(auto) = &self.periodic.auto_action {
            if auto.interval.is_zero() {
                return Err(ConfigError::ZeroInterval {
                    name: "periodic.auto_action.interval",
                });
            }
        }
        Ok(())
    }
}
