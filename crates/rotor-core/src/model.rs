//! Entity model: units, spells, auras, projectiles and their static info.
//!
//! Static data (`SpellInfo`, `AuraInfo`) is shared behind `Arc` and never
//! mutated during a run. Runtime instances (`Spell`, `Aura`) carry the
//! small amount of per-run mutable bookkeeping alongside it.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::id::{BundleId, ProjectileId, SimTime, SpellId, TalentId, UnitId};
use crate::modifier::ModifierList;

/// Default global cooldown applied by [`SpellInfo::new`].
pub const DEFAULT_GCD: SimTime = SimTime(1500);

// ── Pools and stats ─────────────────────────────────────────────

/// A bounded resource pool (health, power).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Pool {
    /// Current amount, always `<= max`.
    pub current: u64,
    /// Upper bound.
    pub max: u64,
}

impl Pool {
    /// A full pool of the given size.
    pub fn full(max: u64) -> Self {
        Self { current: max, max }
    }

    /// Remove up to `amount`, returning how much was actually removed.
    pub fn drain(&mut self, amount: u64) -> u64 {
        let applied = amount.min(self.current);
        self.current -= applied;
        applied
    }

    /// Add up to `amount` without exceeding `max`, returning the gain.
    pub fn restore(&mut self, amount: u64) -> u64 {
        let room = self.max.saturating_sub(self.current);
        let applied = amount.min(room);
        self.current += applied;
        applied
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.current == 0
    }
}

/// Planar position of a unit.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

/// Static combat stats of a unit.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StatBlock {
    /// Physical power rating. Informational; damage comes from
    /// `SpellInfo::base_damage` and modifiers.
    pub attack_power: u64,
    /// Magical power rating. Informational, like `attack_power`.
    pub spell_power: u64,
    /// Probability in `[0, 1]` that a hit is critical.
    pub crit_chance: f64,
    /// Fractional haste (0.1 = 10% faster casts). Informational.
    pub haste: f64,
}

// ── Spells ──────────────────────────────────────────────────────

/// Read-only spell metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct SpellInfo {
    /// Spell id.
    pub id: SpellId,
    /// Display name, also used to tag traces.
    pub name: String,
    /// Cooldown after a cast. Zero for no cooldown.
    pub cooldown: SimTime,
    /// Global cooldown triggered by the cast. Zero means off-GCD.
    pub gcd: SimTime,
    /// Cast time. Zero for instant casts.
    pub cast_time: SimTime,
    /// Maximum charges; 1 for ordinary spells.
    pub max_charges: u32,
    /// Time to restore one charge.
    pub charge_recovery: SimTime,
    /// Power consumed on cast.
    pub power_cost: u64,
    /// Damage dealt on landing, before crit.
    pub base_damage: u64,
    /// Travel time for projectile spells. Zero lands immediately.
    pub travel_time: SimTime,
    /// Aura applied to the caster on cast completion.
    pub applies_aura: Option<SpellId>,
    /// Modifiers attached to the spell itself.
    pub modifiers: ModifierList,
}

impl SpellInfo {
    /// A 1-charge spell with the default GCD and no cooldown or damage.
    pub fn new(id: SpellId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            cooldown: SimTime::ZERO,
            gcd: DEFAULT_GCD,
            cast_time: SimTime::ZERO,
            max_charges: 1,
            charge_recovery: SimTime::ZERO,
            power_cost: 0,
            base_damage: 0,
            travel_time: SimTime::ZERO,
            applies_aura: None,
            modifiers: ModifierList::new(),
        }
    }

    /// Set the cooldown.
    pub fn with_cooldown(mut self, cooldown: SimTime) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Set the global cooldown.
    pub fn with_gcd(mut self, gcd: SimTime) -> Self {
        self.gcd = gcd;
        self
    }

    /// Set the cast time.
    pub fn with_cast_time(mut self, cast_time: SimTime) -> Self {
        self.cast_time = cast_time;
        self
    }

    /// Make this a charge spell. A value of 0 is treated as 1.
    pub fn with_charges(mut self, max_charges: u32, recovery: SimTime) -> Self {
        self.max_charges = max_charges.max(1);
        self.charge_recovery = recovery;
        self
    }

    /// Set the power cost.
    pub fn with_power_cost(mut self, cost: u64) -> Self {
        self.power_cost = cost;
        self
    }

    /// Set the base damage.
    pub fn with_damage(mut self, damage: u64) -> Self {
        self.base_damage = damage;
        self
    }

    /// Set the projectile travel time.
    pub fn with_travel_time(mut self, travel: SimTime) -> Self {
        self.travel_time = travel;
        self
    }

    /// Apply an aura to the caster on completion.
    pub fn with_aura(mut self, aura: SpellId) -> Self {
        self.applies_aura = Some(aura);
        self
    }

    /// Attach a modifier.
    pub fn with_modifier(mut self, modifier: Arc<dyn crate::Modifier>) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Whether the spell triggers the global cooldown.
    pub fn is_on_gcd(&self) -> bool {
        !self.gcd.is_zero()
    }

    /// Whether the spell uses the charge system.
    pub fn uses_charges(&self) -> bool {
        self.max_charges > 1
    }
}

/// A spell known by a unit: static info plus runtime bookkeeping.
#[derive(Clone, Debug, PartialEq)]
pub struct Spell {
    /// Static metadata.
    pub info: Arc<SpellInfo>,
    /// Charges currently available.
    pub charges: u32,
    /// Earliest time the spell is off cooldown.
    pub cooldown_expiry: SimTime,
}

impl Spell {
    /// A fresh instance with full charges and no cooldown.
    pub fn new(info: Arc<SpellInfo>) -> Self {
        let charges = info.max_charges.max(1);
        Self {
            info,
            charges,
            cooldown_expiry: SimTime::ZERO,
        }
    }

    /// The spell id.
    pub fn id(&self) -> SpellId {
        self.info.id
    }

    /// Charges available and cooldown expired.
    pub fn is_ready(&self, now: SimTime) -> bool {
        self.charges > 0 && now >= self.cooldown_expiry
    }

    /// Whether every charge is available.
    pub fn is_full(&self) -> bool {
        self.charges >= self.info.max_charges.max(1)
    }

    /// Same runtime bookkeeping over different static info.
    pub fn with_info(&self, info: Arc<SpellInfo>) -> Spell {
        Spell {
            info,
            charges: self.charges,
            cooldown_expiry: self.cooldown_expiry,
        }
    }
}

// ── Auras ───────────────────────────────────────────────────────

/// Read-only aura metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct AuraInfo {
    /// Aura id (the id of the spell that defines it).
    pub id: SpellId,
    /// Display name.
    pub name: String,
    /// Duration after application; [`SimTime::MAX`] for permanent.
    pub duration: SimTime,
    /// Stack cap, at least 1.
    pub max_stacks: u32,
    /// Modifiers the aura contributes to its holder's spells.
    pub modifiers: ModifierList,
}

impl AuraInfo {
    /// A single-stack aura.
    pub fn new(id: SpellId, name: impl Into<String>, duration: SimTime) -> Self {
        Self {
            id,
            name: name.into(),
            duration,
            max_stacks: 1,
            modifiers: ModifierList::new(),
        }
    }

    /// Set the stack cap.
    pub fn with_max_stacks(mut self, max_stacks: u32) -> Self {
        self.max_stacks = max_stacks.max(1);
        self
    }

    /// Attach a modifier.
    pub fn with_modifier(mut self, modifier: Arc<dyn crate::Modifier>) -> Self {
        self.modifiers.push(modifier);
        self
    }
}

/// An aura present on a unit.
#[derive(Clone, Debug, PartialEq)]
pub struct Aura {
    /// Static metadata.
    pub info: Arc<AuraInfo>,
    /// The unit that applied it.
    pub caster: UnitId,
    /// When the aura falls off.
    pub expires_at: SimTime,
    /// Current stack count.
    pub stacks: u32,
}

impl Aura {
    /// A one-stack aura applied at `now`.
    pub fn applied(info: Arc<AuraInfo>, caster: UnitId, now: SimTime) -> Self {
        let expires_at = now.saturating_add(info.duration);
        Self {
            info,
            caster,
            expires_at,
            stacks: 1,
        }
    }

    /// A permanent one-stack aura.
    pub fn permanent(info: Arc<AuraInfo>, caster: UnitId) -> Self {
        Self {
            info,
            caster,
            expires_at: SimTime::MAX,
            stacks: 1,
        }
    }

    /// Whether the aura currently contributes its modifiers.
    pub fn is_active(&self, now: SimTime) -> bool {
        self.stacks > 0 && now < self.expires_at
    }
}

// ── Projectiles ─────────────────────────────────────────────────

/// A travel-time effect in flight.
#[derive(Clone, Debug, PartialEq)]
pub struct Projectile {
    /// Projectile id.
    pub id: ProjectileId,
    /// Launching unit.
    pub caster: UnitId,
    /// Unit the projectile will hit.
    pub target: UnitId,
    /// The spell as it was when cast (post-`before_cast`).
    pub spell: Arc<Spell>,
    /// Damage applied on impact.
    pub damage: u64,
    /// Whether the hit was rolled critical at launch.
    pub critical: bool,
    /// Launch time.
    pub launched_at: SimTime,
    /// Scheduled impact time.
    pub impact_at: SimTime,
}

// ── Units ───────────────────────────────────────────────────────

/// An in-flight cast-time cast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveCast {
    /// Spell being cast.
    pub spell: SpellId,
    /// Target of the cast.
    pub target: Option<UnitId>,
    /// When the cast started.
    pub started_at: SimTime,
    /// When the cast completes.
    pub completes_at: SimTime,
}

impl ActiveCast {
    /// Cast time left at `now`.
    pub fn remaining(&self, now: SimTime) -> SimTime {
        self.completes_at.saturating_sub(now)
    }
}

/// A player, pet or enemy.
#[derive(Clone, Debug, PartialEq)]
pub struct Unit {
    /// Unit id.
    pub id: UnitId,
    /// Display name.
    pub name: String,
    /// Whether this is the player-controlled unit.
    pub is_player: bool,
    /// Health pool.
    pub health: Pool,
    /// Power pool (mana, energy, ...).
    pub power: Pool,
    /// Position.
    pub position: Position,
    /// Static stats.
    pub stats: StatBlock,
    /// In-flight cast, if any.
    pub casting: Option<ActiveCast>,
    /// When the global cooldown ends.
    pub gcd_ready_at: SimTime,
    /// Known spells in learn order.
    pub spells: IndexMap<SpellId, Spell>,
    /// Auras in application order.
    pub auras: IndexMap<SpellId, Aura>,
    /// Talents contributed by profile bundles.
    pub talents: Vec<TalentId>,
    /// Profile bundles applied to the unit.
    pub profile_bundles: Vec<BundleId>,
    /// Total damage this unit has dealt.
    pub damage_done: u64,
}

impl Unit {
    /// Start building a unit.
    pub fn builder(id: impl Into<UnitId>, name: impl Into<String>) -> UnitBuilder {
        UnitBuilder::new(id.into(), name.into())
    }

    /// Whether the unit is mid-cast.
    pub fn is_casting(&self) -> bool {
        self.casting.is_some()
    }

    /// Whether health is above zero.
    pub fn is_alive(&self) -> bool {
        !self.health.is_empty()
    }

    /// Look up a known spell.
    pub fn spell(&self, id: SpellId) -> Option<&Spell> {
        self.spells.get(&id)
    }

    /// Auras contributing modifiers at `now`, in application order.
    pub fn active_auras(&self, now: SimTime) -> impl Iterator<Item = &Aura> {
        self.auras.values().filter(move |a| a.is_active(now))
    }
}

/// Builder for [`Unit`]. Defaults: non-player, 100 health, 100 power.
#[derive(Debug)]
pub struct UnitBuilder {
    unit: Unit,
}

impl UnitBuilder {
    fn new(id: UnitId, name: String) -> Self {
        Self {
            unit: Unit {
                id,
                name,
                is_player: false,
                health: Pool::full(100),
                power: Pool::full(100),
                position: Position::default(),
                stats: StatBlock::default(),
                casting: None,
                gcd_ready_at: SimTime::ZERO,
                spells: IndexMap::new(),
                auras: IndexMap::new(),
                talents: Vec::new(),
                profile_bundles: Vec::new(),
                damage_done: 0,
            },
        }
    }

    /// Mark as the player unit.
    pub fn player(mut self) -> Self {
        self.unit.is_player = true;
        self
    }

    /// Full health pool of this size.
    pub fn health(mut self, max: u64) -> Self {
        self.unit.health = Pool::full(max);
        self
    }

    /// Full power pool of this size.
    pub fn power(mut self, max: u64) -> Self {
        self.unit.power = Pool::full(max);
        self
    }

    /// Power pool with an explicit current value.
    pub fn power_pool(mut self, pool: Pool) -> Self {
        self.unit.power = pool;
        self
    }

    /// Position.
    pub fn position(mut self, x: f64, y: f64) -> Self {
        self.unit.position = Position { x, y };
        self
    }

    /// Stat block.
    pub fn stats(mut self, stats: StatBlock) -> Self {
        self.unit.stats = stats;
        self
    }

    /// Learn a spell.
    pub fn spell(mut self, info: Arc<SpellInfo>) -> Self {
        self.unit.spells.insert(info.id, Spell::new(info));
        self
    }

    /// Start with an aura.
    pub fn aura(mut self, aura: Aura) -> Self {
        self.unit.auras.insert(aura.info.id, aura);
        self
    }

    /// Finish.
    pub fn build(self) -> Unit {
        self.unit
    }
}
