//! Cast validation and the immediate effects of a successful cast.
//!
//! Rotations and the periodic auto-action both go through
//! [`request_cast`]; there is no other way to start a cast.

use std::sync::Arc;

use rotor_core::{
    ActiveCast, CastError, Emitter, EventKind, EventPayload, SimState, SimTime, Spell, SpellId,
    StateCell, Unit, UnitId,
};

use crate::lifecycle;

/// What a successful cast did.
#[derive(Clone, Debug, PartialEq)]
pub struct CastReceipt {
    /// The spell as cast, after `before_cast` modifiers.
    pub spell: Arc<Spell>,
    /// Resolved target.
    pub target: Option<UnitId>,
    /// Whether the cast triggered the global cooldown.
    pub consumed_gcd: bool,
    /// When the cast completes (equal to the cast time for instants).
    pub completes_at: SimTime,
    /// When the caster's global cooldown ends.
    pub gcd_ready_at: SimTime,
}

impl CastReceipt {
    /// Earliest time the caster can act again.
    pub fn next_action_at(&self) -> SimTime {
        self.completes_at.max(self.gcd_ready_at)
    }
}

/// Check whether `unit` may cast `spell` at `now`.
///
/// Order of checks: in-flight cast, readiness (cooldown or charges),
/// global cooldown, power.
pub fn validate(unit: &Unit, spell: &Spell, now: SimTime) -> Result<(), CastError> {
    if let Some(active) = &unit.casting {
        if active.completes_at > now {
            return Err(CastError::AlreadyCasting {
                casting: active.spell,
                completes_at: active.completes_at,
            });
        }
    }
    if !spell.is_ready(now) {
        if spell.charges == 0 {
            return Err(CastError::NoChargesAvailable { spell: spell.id() });
        }
        return Err(CastError::SpellOnCooldown {
            spell: spell.id(),
            remaining: spell.cooldown_expiry.saturating_sub(now),
        });
    }
    if spell.info.is_on_gcd() && now < unit.gcd_ready_at {
        return Err(CastError::GcdActive {
            ready_at: unit.gcd_ready_at,
        });
    }
    if spell.info.power_cost > unit.power.current {
        return Err(CastError::InsufficientPower {
            spell: spell.id(),
            cost: spell.info.power_cost,
            available: unit.power.current,
        });
    }
    Ok(())
}

fn lookup<'s>(state: &'s SimState, unit: &UnitId, spell: SpellId) -> Result<(&'s Unit, &'s Spell), CastError> {
    let caster = state
        .units
        .get(unit)
        .ok_or_else(|| CastError::UnitNotFound(unit.clone()))?;
    let known = caster.spell(spell).ok_or_else(|| CastError::SpellNotFound {
        unit: unit.clone(),
        spell,
    })?;
    Ok((caster, known))
}

/// Whether `unit` could cast `spell` right now.
///
/// Validates the unmodified spell; no modifier hooks run and nothing is
/// mutated.
pub fn can_cast(state: &SimState, unit: &UnitId, spell: SpellId) -> bool {
    match lookup(state, unit, spell) {
        Ok((caster, known)) => validate(caster, known, state.current_time).is_ok(),
        Err(_) => false,
    }
}

/// Cast `spell` as `unit`.
///
/// Runs `before_cast`, validates the modified spell, applies every
/// immediate effect in one state update, and emits the lifecycle
/// events. With no explicit target the first non-player unit is used.
pub fn request_cast(
    state: &mut StateCell,
    emitter: &mut Emitter,
    unit: &UnitId,
    spell: SpellId,
    target: Option<UnitId>,
) -> Result<CastReceipt, CastError> {
    let now = state.current().current_time;
    let (caster, known) = lookup(state.current(), unit, spell)?;

    let modified = lifecycle::execute_before_cast(Arc::new(known.clone()), unit, state.current())?;
    validate(caster, &modified, now)?;

    let target = target.or_else(|| state.current().first_enemy().map(|u| u.id.clone()));
    let info = Arc::clone(&modified.info);
    let consumed_gcd = info.is_on_gcd();
    let completes_at = now.saturating_add(info.cast_time);
    let cooldown_expiry = (!info.cooldown.is_zero()).then(|| now.saturating_add(info.cooldown));

    let (gcd_ready_at, recharge_at) = state
        .update_unit(unit, |u| {
            let mut recharge_at = None;
            if let Some(s) = u.spells.get_mut(&spell) {
                if info.uses_charges() {
                    if s.is_full() {
                        recharge_at = Some(now.saturating_add(info.charge_recovery));
                    }
                    s.charges = s.charges.saturating_sub(1);
                }
                if let Some(expiry) = cooldown_expiry {
                    s.cooldown_expiry = expiry;
                }
            }
            if consumed_gcd {
                u.gcd_ready_at = now.saturating_add(info.gcd);
            }
            u.power.drain(info.power_cost);
            if !info.cast_time.is_zero() {
                u.casting = Some(ActiveCast {
                    spell,
                    target: target.clone(),
                    started_at: now,
                    completes_at,
                });
            }
            (u.gcd_ready_at, recharge_at)
        })
        .map_err(|_| CastError::UnitNotFound(unit.clone()))?;

    let payload = EventPayload::Cast {
        caster: unit.clone(),
        target: target.clone(),
        spell: Arc::clone(&modified),
    };
    emitter.emit_at(now, EventKind::SpellCastStart, payload.clone());
    emitter.emit_at(completes_at, EventKind::SpellCastComplete, payload);
    if let Some(expiry) = cooldown_expiry {
        emitter.emit_at(
            expiry,
            EventKind::SpellCooldownReady,
            EventPayload::SpellRef {
                unit: unit.clone(),
                spell,
            },
        );
    }
    if let Some(at) = recharge_at {
        emitter.emit_at(
            at,
            EventKind::SpellChargeReady,
            EventPayload::SpellRef {
                unit: unit.clone(),
                spell,
            },
        );
    }

    tracing::debug!(
        unit = %unit,
        spell = %info.name,
        at = now.0,
        completes_at = completes_at.0,
        "cast"
    );

    Ok(CastReceipt {
        spell: modified,
        target,
        consumed_gcd,
        completes_at,
        gcd_ready_at,
    })
}
