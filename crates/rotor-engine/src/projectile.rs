//! Deferred damage for travel-time spells.
//!
//! [`ProjectileService::launch`] records a projectile and schedules one
//! `projectile_impact` event. [`ProjectileService::resolve`] applies the
//! damage when that event fires. The caster is never blocked: the cast
//! completes at launch and only the damage is deferred.

use std::sync::Arc;

use rotor_core::{
    Emitter, EventKind, EventPayload, HookContext, Projectile, ProjectileId, SimTime, Spell,
    StateCell, UnitId,
};
use smallvec::SmallVec;

use crate::error::HookError;
use crate::lifecycle;

/// Result of a projectile landing.
#[derive(Debug)]
pub struct Impact {
    /// The projectile that landed.
    pub projectile: Projectile,
    /// Damage actually removed from the target's health.
    pub applied: u64,
    /// `on_hit` and `on_damage` failures, already logged.
    pub hook_errors: SmallVec<[HookError; 2]>,
}

/// A projectile about to be put in flight.
#[derive(Clone, Debug)]
pub struct Launch {
    /// Launching unit.
    pub caster: UnitId,
    /// Unit to hit.
    pub target: UnitId,
    /// The spell as cast.
    pub spell: Arc<Spell>,
    /// Damage applied on impact.
    pub damage: u64,
    /// Whether the hit was rolled critical.
    pub critical: bool,
    /// Time until impact.
    pub travel: SimTime,
}

/// Allocates projectile ids for one run.
#[derive(Debug, Default)]
pub struct ProjectileService {
    next_id: u64,
}

impl ProjectileService {
    /// Ids start at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a projectile in flight and schedule its impact at
    /// `now + travel`.
    pub fn launch(&mut self, state: &mut StateCell, emitter: &mut Emitter, launch: Launch) -> ProjectileId {
        let id = ProjectileId(self.next_id);
        self.next_id += 1;

        let now = emitter.now();
        let impact_at = now.saturating_add(launch.travel);
        let spell_id = launch.spell.id();
        state.update(|s| {
            s.projectiles.insert(
                id,
                Projectile {
                    id,
                    caster: launch.caster,
                    target: launch.target,
                    spell: launch.spell,
                    damage: launch.damage,
                    critical: launch.critical,
                    launched_at: now,
                    impact_at,
                },
            );
        });
        emitter.emit_at(
            impact_at,
            EventKind::ProjectileImpact,
            EventPayload::Projectile { id, spell: spell_id },
        );
        tracing::trace!(projectile = id.0, impact_at = impact_at.0, "launched");
        id
    }

    /// Land projectile `id`.
    ///
    /// A projectile that is no longer in flight is skipped silently and
    /// `None` is returned. Otherwise damage is applied to the target and
    /// credited to the caster, `on_hit` then `on_damage` hooks run (failures
    /// are logged, not returned as errors), and the projectile is removed.
    pub fn resolve(
        &self,
        state: &mut StateCell,
        emitter: &mut Emitter,
        id: ProjectileId,
    ) -> Option<Impact> {
        let projectile = state.current().projectiles.get(&id)?.clone();

        let applied = state.update(|s| {
            let applied = s
                .units
                .get_mut(&projectile.target)
                .map(|t| t.health.drain(projectile.damage))
                .unwrap_or(0);
            if let Some(caster) = s.units.get_mut(&projectile.caster) {
                caster.damage_done += applied;
            }
            applied
        });

        let hook_errors: SmallVec<[HookError; 2]> = {
            let mut ctx = HookContext {
                spell: &projectile.spell,
                caster: &projectile.caster,
                target: Some(&projectile.target),
                amount: Some(applied),
                critical: projectile.critical,
                state: state.current(),
                emitter: &mut *emitter,
            };
            let hit = lifecycle::execute_on_hit(&mut ctx);
            let damage = lifecycle::execute_on_damage(&mut ctx);
            [hit, damage].into_iter().filter_map(Result::err).collect()
        };
        for err in &hook_errors {
            tracing::warn!(projectile = id.0, error = %err, "impact hook failed");
        }

        state.update(|s| {
            s.projectiles.shift_remove(&id);
        });
        Some(Impact {
            projectile,
            applied,
            hook_errors,
        })
    }
}
