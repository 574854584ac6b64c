//! Events, their payloads, and the per-event [`Emitter`] buffer.
//!
//! Events are plain data. All behavior attached to an event lives in
//! the handler registry; an event never carries a closure.
//!
//! Two orderings apply to events and must not be confused:
//! - queue order is `(time, seq)`, where `seq` is the insertion order
//!   allocated by the scheduler;
//! - `priority` (with the kind and spell specificity) orders the
//!   handlers run for one dequeued event.

use std::fmt;
use std::sync::Arc;

use crate::id::{EventId, ProjectileId, SimTime, SpellId, UnitId};
use crate::model::Spell;

/// Event type tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// Evaluate the rotation program. Reserved highest priority.
    AplEvaluate,
    /// A cast began.
    SpellCastStart,
    /// A cast finished and takes effect.
    SpellCastComplete,
    /// A spell came off cooldown.
    SpellCooldownReady,
    /// A charge spell regained one charge.
    SpellChargeReady,
    /// An aura reached its expiry time.
    AuraExpire,
    /// Periodic resource regeneration tick.
    PeriodicPower,
    /// Periodic automatic action tick.
    PeriodicSpell,
    /// A projectile reached its target.
    ProjectileImpact,
    /// Damage lands on a target.
    SpellDamage,
    /// Caller-defined event type.
    Custom(u16),
}

impl EventKind {
    /// Dispatch priority stamped on new events of this kind. Lower is
    /// more urgent; `AplEvaluate` is always 0.
    pub fn priority(self) -> u32 {
        match self {
            Self::AplEvaluate => 0,
            Self::SpellCastStart | Self::SpellCastComplete => 10,
            Self::SpellDamage | Self::ProjectileImpact => 20,
            Self::AuraExpire => 30,
            Self::SpellCooldownReady | Self::SpellChargeReady => 40,
            Self::PeriodicPower | Self::PeriodicSpell => 50,
            Self::Custom(_) => 100,
        }
    }

    /// Stable snake_case name.
    pub fn name(self) -> &'static str {
        match self {
            Self::AplEvaluate => "apl_evaluate",
            Self::SpellCastStart => "spell_cast_start",
            Self::SpellCastComplete => "spell_cast_complete",
            Self::SpellCooldownReady => "spell_cooldown_ready",
            Self::SpellChargeReady => "spell_charge_ready",
            Self::AuraExpire => "aura_expire",
            Self::PeriodicPower => "periodic_power",
            Self::PeriodicSpell => "periodic_spell",
            Self::ProjectileImpact => "projectile_impact",
            Self::SpellDamage => "spell_damage",
            Self::Custom(_) => "custom",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(n) => write!(f, "custom:{n}"),
            other => f.write_str(other.name()),
        }
    }
}

/// Data carried by an event.
#[derive(Clone, Debug, PartialEq)]
pub enum EventPayload {
    /// No data.
    None,
    /// A cast (start or complete). `spell` is the post-`before_cast` spell.
    Cast {
        /// Casting unit.
        caster: UnitId,
        /// Resolved target.
        target: Option<UnitId>,
        /// The spell as cast.
        spell: Arc<Spell>,
    },
    /// Reference to a spell on a unit (cooldown/charge readiness).
    SpellRef {
        /// Owning unit.
        unit: UnitId,
        /// The spell.
        spell: SpellId,
    },
    /// Aura expiry check.
    Aura {
        /// Unit holding the aura.
        unit: UnitId,
        /// Aura id.
        aura: SpellId,
        /// The expiry this event was scheduled for.
        expires_at: SimTime,
    },
    /// Projectile impact.
    Projectile {
        /// Projectile id.
        id: ProjectileId,
        /// Spell that launched it.
        spell: SpellId,
    },
    /// Damage landing.
    Damage {
        /// Damage source.
        caster: UnitId,
        /// Damage recipient.
        target: UnitId,
        /// The spell as cast.
        spell: Arc<Spell>,
        /// Amount after crit.
        amount: u64,
        /// Whether the hit was critical.
        critical: bool,
    },
    /// A self-rescheduling periodic chain tick.
    Periodic {
        /// Unit the chain acts for.
        unit: UnitId,
        /// Interval between ticks.
        interval: SimTime,
        /// Last time a tick may be scheduled at.
        horizon: SimTime,
        /// Spell cast by an auto-action chain.
        spell: Option<SpellId>,
    },
    /// Caller-defined data.
    Custom {
        /// Free-form value.
        value: u64,
    },
}

impl EventPayload {
    /// The spell this payload refers to, if any. Used for spell-scoped
    /// handler lookup.
    pub fn spell_id(&self) -> Option<SpellId> {
        match self {
            Self::Cast { spell, .. } | Self::Damage { spell, .. } => Some(spell.id()),
            Self::SpellRef { spell, .. } | Self::Projectile { spell, .. } => Some(*spell),
            Self::Aura { aura, .. } => Some(*aura),
            Self::Periodic { spell, .. } => *spell,
            Self::None | Self::Custom { .. } => None,
        }
    }
}

/// A scheduled event.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Unique id within one scheduler.
    pub id: EventId,
    /// When the event fires.
    pub time: SimTime,
    /// Handler dispatch priority (informational for the queue).
    pub priority: u32,
    /// Insertion order; the queue's tie-break on equal `time`.
    pub seq: u64,
    /// Event type.
    pub kind: EventKind,
    /// Event data.
    pub payload: EventPayload,
}

impl Event {
    /// The spell this event refers to, if any.
    pub fn spell_id(&self) -> Option<SpellId> {
        self.payload.spell_id()
    }

    /// Tag used in error reports, e.g. `spell_cast_complete@1500ms`.
    pub fn tag(&self) -> String {
        format!("{}@{}", self.kind, self.time)
    }
}

/// An event requested by a handler but not yet given an id or
/// insertion order.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingEvent {
    /// Requested fire time.
    pub time: SimTime,
    /// Event type.
    pub kind: EventKind,
    /// Event data.
    pub payload: EventPayload,
}

/// Per-event output buffer. Handlers push new events here; the driver
/// merges them into the scheduler once every handler has finished.
#[derive(Debug, Default)]
pub struct Emitter {
    now: SimTime,
    pending: Vec<PendingEvent>,
}

impl Emitter {
    /// An empty buffer for an event processed at `now`.
    pub fn new(now: SimTime) -> Self {
        Self {
            now,
            pending: Vec::new(),
        }
    }

    /// The time of the event being processed.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Emit at the current time.
    pub fn emit(&mut self, kind: EventKind, payload: EventPayload) {
        self.emit_at(self.now, kind, payload);
    }

    /// Emit `delay` after the current time.
    pub fn emit_in(&mut self, delay: SimTime, kind: EventKind, payload: EventPayload) {
        self.emit_at(self.now.saturating_add(delay), kind, payload);
    }

    /// Emit at an absolute time. Times before `now` are rejected when
    /// the buffer is flushed.
    pub fn emit_at(&mut self, time: SimTime, kind: EventKind, payload: EventPayload) {
        self.pending.push(PendingEvent {
            time,
            kind,
            payload,
        });
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Buffered events so far, in emission order.
    pub fn pending(&self) -> &[PendingEvent] {
        &self.pending
    }

    /// Take every buffered event, stably sorted by time.
    pub fn drain(&mut self) -> Vec<PendingEvent> {
        let mut out = std::mem::take(&mut self.pending);
        out.sort_by_key(|e| e.time);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apl_evaluate_is_highest_priority() {
        let kinds = [
            EventKind::SpellCastStart,
            EventKind::SpellCastComplete,
            EventKind::SpellCooldownReady,
            EventKind::SpellChargeReady,
            EventKind::AuraExpire,
            EventKind::PeriodicPower,
            EventKind::PeriodicSpell,
            EventKind::ProjectileImpact,
            EventKind::SpellDamage,
            EventKind::Custom(3),
        ];
        for kind in kinds {
            assert!(EventKind::AplEvaluate.priority() < kind.priority(), "{kind}");
        }
    }

    #[test]
    fn emitter_drain_is_stable_by_time() {
        let mut em = Emitter::new(SimTime(100));
        em.emit_in(SimTime(50), EventKind::Custom(1), EventPayload::None);
        em.emit(EventKind::Custom(2), EventPayload::None);
        em.emit_at(SimTime(150), EventKind::Custom(3), EventPayload::None);
        em.emit(EventKind::Custom(4), EventPayload::None);

        let kinds: Vec<_> = em.drain().into_iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::Custom(2),
                EventKind::Custom(4),
                EventKind::Custom(1),
                EventKind::Custom(3),
            ]
        );
        assert!(em.is_empty());
    }

    #[test]
    fn payload_spell_ids() {
        let r = EventPayload::SpellRef {
            unit: UnitId::new("p"),
            spell: SpellId(4),
        };
        assert_eq!(r.spell_id(), Some(SpellId(4)));
        assert_eq!(EventPayload::None.spell_id(), None);
        assert_eq!(EventKind::Custom(7).to_string(), "custom:7");
    }
}
