//! Test utilities and fixtures for Rotor development.
//!
//! Provides a standard spell/aura table ([`spellbook`]), unit and state
//! builders, and mock [`Modifier`](rotor_core::Modifier) implementations
//! for exercising the lifecycle hooks.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::Arc;

use rotor_core::{
    AuraInfo, SimState, SimTime, SpellId, SpellInfo, StaticMetadata, Unit, UnitId,
};

/// Spell and aura ids used by [`spellbook`].
pub mod ids {
    use rotor_core::SpellId;

    /// 6s cooldown, on the GCD, 100 damage.
    pub const BURST: SpellId = SpellId(1);
    /// No cooldown, on the GCD, 40 damage.
    pub const FILLER: SpellId = SpellId(2);
    /// 2s cast, 150 damage.
    pub const NUKE: SpellId = SpellId(3);
    /// 800ms travel time, 60 damage.
    pub const ARROW: SpellId = SpellId(4);
    /// Off-GCD, 2 charges recovering over 5s.
    pub const DASH: SpellId = SpellId(5);
    /// Costs 30 power, 80 damage.
    pub const DRAIN: SpellId = SpellId(6);
    /// Applies [`FOCUS`] to the caster.
    pub const EMPOWER: SpellId = SpellId(7);
    /// Aura: 4s, up to 3 stacks.
    pub const FOCUS: SpellId = SpellId(100);
}

/// The standard spell and aura table.
pub fn spellbook() -> StaticMetadata {
    StaticMetadata::new()
        .with_spell(
            SpellInfo::new(ids::BURST, "Burst")
                .with_cooldown(SimTime(6000))
                .with_damage(100),
        )
        .with_spell(SpellInfo::new(ids::FILLER, "Filler").with_damage(40))
        .with_spell(
            SpellInfo::new(ids::NUKE, "Nuke")
                .with_cast_time(SimTime(2000))
                .with_damage(150),
        )
        .with_spell(
            SpellInfo::new(ids::ARROW, "Arrow")
                .with_travel_time(SimTime(800))
                .with_damage(60),
        )
        .with_spell(
            SpellInfo::new(ids::DASH, "Dash")
                .with_gcd(SimTime::ZERO)
                .with_charges(2, SimTime(5000)),
        )
        .with_spell(
            SpellInfo::new(ids::DRAIN, "Drain")
                .with_power_cost(30)
                .with_damage(80),
        )
        .with_spell(SpellInfo::new(ids::EMPOWER, "Empower").with_aura(ids::FOCUS))
        .with_aura(AuraInfo::new(ids::FOCUS, "Focus", SimTime(4000)).with_max_stacks(3))
}

/// Arc-wrapped [`spellbook`].
pub fn shared_spellbook() -> Arc<StaticMetadata> {
    Arc::new(spellbook())
}

/// A player unit that knows `spells`, looked up in [`spellbook`].
///
/// # Panics
///
/// Panics if a spell id is not in the spellbook.
pub fn player(id: impl Into<UnitId>, spells: &[SpellId]) -> Unit {
    let book = spellbook();
    spells
        .iter()
        .fold(Unit::builder(id, "Player").player(), |b, spell| {
            let info = rotor_core::MetadataProvider::spell_info(&book, *spell)
                .unwrap_or_else(|e| panic!("fixture spell missing: {e}"));
            b.spell(info)
        })
        .build()
}

/// A training dummy with a large health pool.
pub fn dummy() -> Unit {
    Unit::builder("dummy", "Training Dummy")
        .health(1_000_000)
        .build()
}

/// State with `player("p", spells)` and [`dummy`].
pub fn duel(spells: &[SpellId]) -> SimState {
    SimState::with_units([player("p", spells), dummy()])
}
