//! Simulation state and the copy-on-write [`StateCell`] that owns it.
//!
//! A [`Snapshot`] is an `Arc<SimState>`. Once a snapshot has been handed
//! out, the cell never mutates it: [`StateCell::update`] goes through
//! `Arc::make_mut`, which clones the state first whenever anyone else
//! still holds the previous value.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::LookupError;
use crate::id::{ProjectileId, SimTime, UnitId};
use crate::model::{Projectile, Unit};

/// A published, immutable view of the state.
pub type Snapshot = Arc<SimState>;

/// Complete state of one run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimState {
    /// Virtual clock.
    pub current_time: SimTime,
    /// Events processed by the top-level run loop so far.
    pub iteration_count: u64,
    /// Units in insertion order.
    pub units: IndexMap<UnitId, Unit>,
    /// Projectiles in flight, in launch order.
    pub projectiles: IndexMap<ProjectileId, Projectile>,
}

impl SimState {
    /// Empty state at t=0.
    pub fn new() -> Self {
        Self::default()
    }

    /// State at t=0 holding the given units. A later unit with a
    /// duplicate id replaces the earlier one.
    pub fn with_units(units: impl IntoIterator<Item = Unit>) -> Self {
        let mut state = Self::new();
        for unit in units {
            state.insert_unit(unit);
        }
        state
    }

    /// Insert or replace a unit.
    pub fn insert_unit(&mut self, unit: Unit) {
        self.units.insert(unit.id.clone(), unit);
    }

    /// Look up a unit.
    pub fn unit(&self, id: &UnitId) -> Result<&Unit, LookupError> {
        self.units
            .get(id)
            .ok_or_else(|| LookupError::UnitNotFound(id.clone()))
    }

    /// Look up a unit mutably.
    pub fn unit_mut(&mut self, id: &UnitId) -> Result<&mut Unit, LookupError> {
        self.units
            .get_mut(id)
            .ok_or_else(|| LookupError::UnitNotFound(id.clone()))
    }

    /// The first player unit, if any.
    pub fn player(&self) -> Option<&Unit> {
        self.units.values().find(|u| u.is_player)
    }

    /// The first non-player unit, used as the default cast target.
    pub fn first_enemy(&self) -> Option<&Unit> {
        self.units.values().find(|u| !u.is_player)
    }
}

/// Owner of the current state. Single-threaded per run.
#[derive(Debug, Default)]
pub struct StateCell {
    current: Snapshot,
}

impl StateCell {
    /// Wrap an initial state.
    pub fn new(state: SimState) -> Self {
        Self {
            current: Arc::new(state),
        }
    }

    /// Borrow the current state.
    pub fn current(&self) -> &SimState {
        &self.current
    }

    /// Share the current state. Later updates will not affect it.
    pub fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.current)
    }

    /// Mutate the state, cloning it first if a snapshot is outstanding.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut SimState) -> R) -> R {
        f(Arc::make_mut(&mut self.current))
    }

    /// Mutate one unit. Fails without touching the state if the unit is
    /// absent.
    pub fn update_unit<R>(
        &mut self,
        id: &UnitId,
        f: impl FnOnce(&mut Unit) -> R,
    ) -> Result<R, LookupError> {
        if !self.current.units.contains_key(id) {
            return Err(LookupError::UnitNotFound(id.clone()));
        }
        self.update(|s| s.unit_mut(id).map(f))
    }

    /// Replace the whole state.
    pub fn replace(&mut self, state: SimState) {
        self.current = Arc::new(state);
    }

    /// Take the state out, cloning only if a snapshot is still shared.
    pub fn into_inner(self) -> SimState {
        Arc::try_unwrap(self.current).unwrap_or_else(|shared| (*shared).clone())
    }
}
