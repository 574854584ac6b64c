//! Self-rescheduling periodic chains.
//!
//! Each chain is a single pending event whose handler does its work and
//! then schedules the next link at `now + interval`, unless that would
//! land past the chain's horizon. This is the mechanism for every
//! "every N ms until done" behavior.

use rotor_core::{CastError, Emitter, EventKind, EventPayload, SimTime, SpellId, StateCell, UnitId};
use rotor_sched::{ScheduleError, Scheduler};

use crate::cast;
use crate::config::PeriodicConfig;

/// Seed the first link of every configured chain for `unit`.
///
/// A chain whose first tick would already exceed `max_duration` is not
/// started. Returns the number of chains started.
pub fn start(
    scheduler: &mut Scheduler,
    unit: &UnitId,
    config: &PeriodicConfig,
    max_duration: SimTime,
) -> Result<usize, ScheduleError> {
    let now = scheduler.now();
    let mut started = 0;

    if let Some(interval) = config.power_interval {
        let first = now.saturating_add(interval);
        if first <= max_duration {
            scheduler.schedule(
                first,
                EventKind::PeriodicPower,
                EventPayload::Periodic {
                    unit: unit.clone(),
                    interval,
                    horizon: max_duration,
                    spell: None,
                },
            )?;
            started += 1;
        }
    }

    if let Some(auto) = &config.auto_action {
        let first = now.saturating_add(auto.interval);
        if first <= max_duration {
            scheduler.schedule(
                first,
                EventKind::PeriodicSpell,
                EventPayload::Periodic {
                    unit: unit.clone(),
                    interval: auto.interval,
                    horizon: max_duration,
                    spell: Some(auto.spell),
                },
            )?;
            started += 1;
        }
    }

    Ok(started)
}

/// Schedule the next link of the chain carried by `payload`, if it fits
/// before the horizon. Returns the next fire time.
pub fn reschedule(emitter: &mut Emitter, kind: EventKind, payload: &EventPayload) -> Option<SimTime> {
    let EventPayload::Periodic {
        interval, horizon, ..
    } = payload
    else {
        return None;
    };
    let next = emitter.now().saturating_add(*interval);
    if next > *horizon {
        tracing::trace!(chain = %kind, next = next.0, "periodic chain ended");
        return None;
    }
    emitter.emit_at(next, kind, payload.clone());
    Some(next)
}

/// Restore `amount` power to `unit`. Returns the amount gained; zero if
/// the unit is gone or already full.
pub fn regenerate(state: &mut StateCell, unit: &UnitId, amount: u64) -> u64 {
    let room = match state.current().units.get(unit) {
        Some(u) => u.power.max.saturating_sub(u.power.current),
        None => return 0,
    };
    if room == 0 || amount == 0 {
        return 0;
    }
    state
        .update_unit(unit, |u| u.power.restore(amount))
        .unwrap_or(0)
}

/// Cast the auto-action spell through the normal cast path. The
/// rotation is not interrupted and no evaluation is scheduled.
pub fn auto_cast(
    state: &mut StateCell,
    emitter: &mut Emitter,
    unit: &UnitId,
    spell: SpellId,
) -> Result<(), CastError> {
    cast::request_cast(state, emitter, unit, spell, None).map(|_| ())
}
