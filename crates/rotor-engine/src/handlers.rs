//! Kernel handlers: the built-in reactions that make a run move.
//!
//! All are registered in the core-state band ([`priority::CORE_STATE`])
//! under `kernel.*` ids, so callers can slot validation handlers before
//! them and reactive or telemetry handlers after them.
//! `spell_cast_start` and `spell_cooldown_ready` are markers with no
//! kernel handler.

use std::sync::Arc;

use rand::Rng;
use rotor_core::{
    Aura, Event, EventKind, EventPayload, HookContext, SimTime, Spell, SpellId, UnitId,
};

use crate::context::HandlerContext;
use crate::error::{HandlerFailure, HookError};
use crate::lifecycle;
use crate::periodic;
use crate::projectile::Launch;
use crate::registry::{priority, HandlerOptions, HandlerRegistry};
use crate::rotation::RotationApi;

/// Install every kernel handler into `registry`.
pub fn register_kernel_handlers(registry: &mut HandlerRegistry) {
    let opts = |id: &str| HandlerOptions::new().id(id).priority(priority::CORE_STATE);

    let _ = registry.on(EventKind::AplEvaluate, on_apl_evaluate, opts("kernel.apl_evaluate"));
    let _ = registry.on(
        EventKind::SpellCastComplete,
        on_cast_complete,
        opts("kernel.spell_cast_complete"),
    );
    let _ = registry.on(EventKind::SpellDamage, on_spell_damage, opts("kernel.spell_damage"));
    let _ = registry.on(
        EventKind::ProjectileImpact,
        on_projectile_impact,
        opts("kernel.projectile_impact"),
    );
    let _ = registry.on(
        EventKind::SpellChargeReady,
        on_charge_ready,
        opts("kernel.spell_charge_ready"),
    );
    let _ = registry.on(EventKind::AuraExpire, on_aura_expire, opts("kernel.aura_expire"));
    let _ = registry.on(
        EventKind::PeriodicPower,
        on_periodic_power,
        opts("kernel.periodic_power"),
    );
    let _ = registry.on(
        EventKind::PeriodicSpell,
        on_periodic_spell,
        opts("kernel.periodic_spell"),
    );
}

fn record_hook_failure(ctx: &mut HandlerContext<'_>, err: HookError) {
    tracing::warn!(error = %err, "modifier hook failed");
    ctx.services.metrics.hook_failures += err.failures.len() as u64;
}

// ── apl_evaluate ────────────────────────────────────────────────

fn on_apl_evaluate(_event: &Event, ctx: &mut HandlerContext<'_>) -> Result<(), HandlerFailure> {
    let (Some(rotation), Some(player)) = (
        ctx.services.rotation.clone(),
        ctx.services.player.clone(),
    ) else {
        return Ok(());
    };
    let idle = ctx.services.config.apl_idle_interval;

    let mut api = RotationApi::new(player, ctx.state, ctx.emitter, &mut ctx.services.metrics);
    let result = rotation.evaluate(&mut api);
    let evaluation = api.finish(idle);

    match result {
        Ok(()) | Err(rotor_core::CastError::Interrupted) => {}
        Err(e) => return Err(HandlerFailure::Rotation(e)),
    }
    if evaluation.interrupted {
        ctx.interrupt();
    }
    Ok(())
}

// ── spell_cast_complete ─────────────────────────────────────────

fn on_cast_complete(event: &Event, ctx: &mut HandlerContext<'_>) -> Result<(), HandlerFailure> {
    let EventPayload::Cast {
        caster,
        target,
        spell,
    } = &event.payload
    else {
        return Ok(());
    };
    let now = ctx.now();

    let still_casting = ctx
        .current()
        .units
        .get(caster)
        .and_then(|u| u.casting.as_ref())
        .is_some_and(|c| c.spell == spell.id());
    if still_casting {
        ctx.state.update_unit(caster, |u| u.casting = None)?;
    }

    let on_cast = {
        let mut hook = HookContext {
            spell,
            caster,
            target: target.as_ref(),
            amount: None,
            critical: false,
            state: ctx.state.current(),
            emitter: &mut *ctx.emitter,
        };
        lifecycle::execute_on_cast(&mut hook)
    };
    if let Err(err) = on_cast {
        record_hook_failure(ctx, err);
    }

    if let Some(aura_id) = spell.info.applies_aura {
        apply_aura(ctx, caster, aura_id, now)?;
    }

    let Some(target) = target else {
        return Ok(());
    };
    if spell.info.base_damage == 0 {
        return Ok(());
    }
    let (amount, critical) = roll_damage(ctx, caster, spell);

    if spell.info.travel_time.is_zero() {
        ctx.emitter.emit(
            EventKind::SpellDamage,
            EventPayload::Damage {
                caster: caster.clone(),
                target: target.clone(),
                spell: Arc::clone(spell),
                amount,
                critical,
            },
        );
    } else {
        ctx.services.projectiles.launch(
            ctx.state,
            ctx.emitter,
            Launch {
                caster: caster.clone(),
                target: target.clone(),
                spell: Arc::clone(spell),
                damage: amount,
                critical,
                travel: spell.info.travel_time,
            },
        );
        ctx.services.metrics.projectiles_launched += 1;
    }
    Ok(())
}

fn roll_damage(ctx: &mut HandlerContext<'_>, caster: &UnitId, spell: &Spell) -> (u64, bool) {
    let crit_chance = ctx
        .current()
        .units
        .get(caster)
        .map(|u| u.stats.crit_chance)
        .unwrap_or(0.0);
    let roll: f64 = ctx.services.rng.gen();
    let critical = roll < crit_chance;
    let base = spell.info.base_damage;
    let amount = if critical {
        (base as f64 * ctx.services.config.crit_multiplier).round() as u64
    } else {
        base
    };
    (amount, critical)
}

fn apply_aura(
    ctx: &mut HandlerContext<'_>,
    unit: &UnitId,
    aura_id: SpellId,
    now: SimTime,
) -> Result<(), HandlerFailure> {
    let info = ctx.services.metadata.aura_info(aura_id)?;
    let expires_at = ctx.state.update_unit(unit, |u| {
        let aura = u
            .auras
            .entry(aura_id)
            .and_modify(|a| {
                a.expires_at = now.saturating_add(info.duration);
                a.stacks = (a.stacks + 1).min(info.max_stacks);
                a.info = Arc::clone(&info);
            })
            .or_insert_with(|| Aura::applied(Arc::clone(&info), unit.clone(), now));
        aura.expires_at
    })?;

    if expires_at != SimTime::MAX {
        ctx.emitter.emit_at(
            expires_at,
            EventKind::AuraExpire,
            EventPayload::Aura {
                unit: unit.clone(),
                aura: aura_id,
                expires_at,
            },
        );
    }
    Ok(())
}

// ── spell_damage / projectile_impact ────────────────────────────

fn on_spell_damage(event: &Event, ctx: &mut HandlerContext<'_>) -> Result<(), HandlerFailure> {
    let EventPayload::Damage {
        caster,
        target,
        spell,
        amount,
        critical,
    } = &event.payload
    else {
        return Ok(());
    };
    if !ctx.current().units.contains_key(target) {
        tracing::debug!(target = %target, "damage target gone");
        return Ok(());
    }

    let applied = ctx.state.update(|s| {
        let applied = s
            .units
            .get_mut(target)
            .map(|t| t.health.drain(*amount))
            .unwrap_or(0);
        if let Some(c) = s.units.get_mut(caster) {
            c.damage_done += applied;
        }
        applied
    });

    let results = {
        let mut hook = HookContext {
            spell,
            caster,
            target: Some(target),
            amount: Some(applied),
            critical: *critical,
            state: ctx.state.current(),
            emitter: &mut *ctx.emitter,
        };
        let hit = lifecycle::execute_on_hit(&mut hook);
        let damage = lifecycle::execute_on_damage(&mut hook);
        [hit, damage]
    };
    for err in results.into_iter().filter_map(Result::err) {
        record_hook_failure(ctx, err);
    }
    Ok(())
}

fn on_projectile_impact(event: &Event, ctx: &mut HandlerContext<'_>) -> Result<(), HandlerFailure> {
    let EventPayload::Projectile { id, .. } = &event.payload else {
        return Ok(());
    };
    if let Some(impact) = ctx.services.projectiles.resolve(ctx.state, ctx.emitter, *id) {
        ctx.services.metrics.projectiles_resolved += 1;
        for err in &impact.hook_errors {
            ctx.services.metrics.hook_failures += err.failures.len() as u64;
        }
    }
    Ok(())
}

// ── charges / auras ─────────────────────────────────────────────

fn on_charge_ready(event: &Event, ctx: &mut HandlerContext<'_>) -> Result<(), HandlerFailure> {
    let EventPayload::SpellRef { unit, spell } = &event.payload else {
        return Ok(());
    };
    let next = ctx.state.update_unit(unit, |u| {
        let s = u.spells.get_mut(spell)?;
        if !s.is_full() {
            s.charges += 1;
        }
        (!s.is_full()).then_some(s.info.charge_recovery)
    })?;
    if let Some(recovery) = next {
        ctx.emitter
            .emit_in(recovery, EventKind::SpellChargeReady, event.payload.clone());
    }
    Ok(())
}

fn on_aura_expire(event: &Event, ctx: &mut HandlerContext<'_>) -> Result<(), HandlerFailure> {
    let EventPayload::Aura { unit, aura, .. } = &event.payload else {
        return Ok(());
    };
    let now = ctx.now();
    let expired = ctx
        .current()
        .units
        .get(unit)
        .and_then(|u| u.auras.get(aura))
        .is_some_and(|a| a.expires_at <= now);
    if expired {
        ctx.state.update_unit(unit, |u| {
            u.auras.shift_remove(aura);
        })?;
        tracing::trace!(unit = %unit, aura = %aura, "aura expired");
    }
    Ok(())
}

// ── periodic chains ─────────────────────────────────────────────

fn on_periodic_power(event: &Event, ctx: &mut HandlerContext<'_>) -> Result<(), HandlerFailure> {
    let EventPayload::Periodic { unit, .. } = &event.payload else {
        return Ok(());
    };
    let amount = ctx.services.config.periodic.power_amount;
    periodic::regenerate(ctx.state, unit, amount);
    periodic::reschedule(ctx.emitter, event.kind, &event.payload);
    Ok(())
}

fn on_periodic_spell(event: &Event, ctx: &mut HandlerContext<'_>) -> Result<(), HandlerFailure> {
    let EventPayload::Periodic {
        unit,
        spell: Some(spell),
        ..
    } = &event.payload
    else {
        return Ok(());
    };
    match periodic::auto_cast(ctx.state, ctx.emitter, unit, *spell) {
        Ok(()) => ctx.services.metrics.casts += 1,
        Err(e) => {
            ctx.services.metrics.rejected_casts += 1;
            tracing::debug!(unit = %unit, spell = %spell, reason = %e, "auto-action skipped");
        }
    }
    periodic::reschedule(ctx.emitter, event.kind, &event.payload);
    Ok(())
}
