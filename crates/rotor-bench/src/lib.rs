//! Benchmark scenarios for the Rotor simulation kernel.
//!
//! Provides a pre-built reference encounter for benchmarks and examples:
//!
//! - [`reference_metadata`]: a six-spell caster kit with one buff aura
//! - [`reference_state`]: that kit on a player, facing a training dummy
//! - [`reference_rotation`]: a fixed-priority rotation over the kit
//! - [`reference_config`]: power regen plus a 2.5s auto-attack
//! - [`reference_composer`]: three stackable profile bundles

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use rotor_core::{
    AuraInfo, MetadataProvider, SimState, SimTime, SpellId, SpellInfo, StatBlock, StaticMetadata,
    Unit, UnitId,
};
use rotor_engine::{
    rotation_fn, AutoAction, BundleRegistry, PeriodicConfig, ProfileBundle, ProfileComposer,
    Rotation, SimConfig, SpellOverride,
};

/// Spell ids in the reference kit.
pub mod spells {
    use rotor_core::SpellId;

    /// Big cooldown nuke.
    pub const COMBUST: SpellId = SpellId(10);
    /// Power-costing hit.
    pub const SEAR: SpellId = SpellId(11);
    /// Travel-time projectile.
    pub const BOLT: SpellId = SpellId(12);
    /// Charge-based instant.
    pub const FLICKER: SpellId = SpellId(13);
    /// Cast-time filler.
    pub const SCORCH: SpellId = SpellId(14);
    /// Auto-attack.
    pub const WAND: SpellId = SpellId(15);
    /// Self-buff applying [`KINDLE`].
    pub const IGNITE: SpellId = SpellId(16);
    /// Stacking buff aura.
    pub const KINDLE: SpellId = SpellId(200);
}

/// Metadata for the reference kit.
pub fn reference_metadata() -> StaticMetadata {
    StaticMetadata::new()
        .with_spell(
            SpellInfo::new(spells::COMBUST, "Combust")
                .with_cooldown(SimTime(30_000))
                .with_damage(900),
        )
        .with_spell(
            SpellInfo::new(spells::SEAR, "Sear")
                .with_power_cost(25)
                .with_cooldown(SimTime(6000))
                .with_damage(220),
        )
        .with_spell(
            SpellInfo::new(spells::BOLT, "Bolt")
                .with_travel_time(SimTime(600))
                .with_cooldown(SimTime(4500))
                .with_damage(160),
        )
        .with_spell(
            SpellInfo::new(spells::FLICKER, "Flicker")
                .with_gcd(SimTime::ZERO)
                .with_charges(2, SimTime(12_000))
                .with_damage(40),
        )
        .with_spell(
            SpellInfo::new(spells::SCORCH, "Scorch")
                .with_cast_time(SimTime(1500))
                .with_damage(120),
        )
        .with_spell(
            SpellInfo::new(spells::WAND, "Wand")
                .with_gcd(SimTime::ZERO)
                .with_damage(25),
        )
        .with_spell(
            SpellInfo::new(spells::IGNITE, "Ignite")
                .with_cooldown(SimTime(20_000))
                .with_aura(spells::KINDLE),
        )
        .with_aura(AuraInfo::new(spells::KINDLE, "Kindle", SimTime(10_000)).with_max_stacks(5))
}

/// A player knowing the whole kit, plus a dummy that will not die.
pub fn reference_state(player: &UnitId) -> SimState {
    let metadata = reference_metadata();
    let kit = [
        spells::COMBUST,
        spells::SEAR,
        spells::BOLT,
        spells::FLICKER,
        spells::SCORCH,
        spells::WAND,
        spells::IGNITE,
    ];
    let builder = kit
        .iter()
        .filter_map(|id| metadata.spell_info(*id).ok())
        .fold(Unit::builder(player.clone(), "Pyromancer").player(), |b, info| b.spell(info));
    let p = builder
        .power(100)
        .stats(StatBlock {
            crit_chance: 0.25,
            ..StatBlock::default()
        })
        .build();
    let dummy = Unit::builder("dummy", "Training Dummy")
        .health(u64::MAX / 2)
        .build();
    SimState::with_units([p, dummy])
}

/// Fixed priority: Ignite, Combust, Flicker, Sear, Bolt, then Scorch.
pub fn reference_rotation() -> Arc<dyn Rotation> {
    const PRIORITY: [SpellId; 6] = [
        spells::IGNITE,
        spells::COMBUST,
        spells::FLICKER,
        spells::SEAR,
        spells::BOLT,
        spells::SCORCH,
    ];
    Arc::new(rotation_fn(|api| {
        let me = api.player();
        if let Some(spell) = PRIORITY.iter().copied().find(|s| api.can_cast(&me, *s)) {
            api.cast(&me, spell, None)?;
        }
        Ok(())
    }))
}

/// Seeded config with power regen and the wand on a 2.5s timer.
pub fn reference_config(seed: u64) -> SimConfig {
    SimConfig {
        periodic: PeriodicConfig {
            auto_action: Some(AutoAction {
                spell: spells::WAND,
                interval: SimTime(2500),
            }),
            ..PeriodicConfig::default()
        },
        ..SimConfig::default()
    }
    .with_seed(seed)
}

/// Ids of the bundles in [`reference_composer`].
pub fn reference_bundles() -> Vec<rotor_core::BundleId> {
    ["quickening", "kindled", "sharp-sear"]
        .into_iter()
        .map(rotor_core::BundleId::new)
        .collect()
}

/// A composer over three bundles: a shorter Combust, a permanent
/// Kindle, and a cheaper Sear.
pub fn reference_composer() -> ProfileComposer {
    let quickening = ProfileBundle::new("quickening").with_override(
        spells::COMBUST,
        SpellOverride {
            cooldown: Some(SimTime(20_000)),
            ..SpellOverride::default()
        },
    );
    let kindled = ProfileBundle::new("kindled").with_aura(spells::KINDLE);
    let sharp_sear = ProfileBundle::new("sharp-sear").with_override(
        spells::SEAR,
        SpellOverride {
            power_cost: Some(10),
            base_damage: Some(260),
            ..SpellOverride::default()
        },
    );
    ProfileComposer::new(
        BundleRegistry::new()
            .with(quickening)
            .with(kindled)
            .with(sharp_sear),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_state_has_full_kit() {
        let state = reference_state(&UnitId::new("p"));
        let p = state.player().unwrap();
        assert_eq!(p.spells.len(), 7);
        assert_eq!(p.power.current, 100);
        assert!(state.first_enemy().is_some());
    }

    #[test]
    fn reference_config_is_valid() {
        assert!(reference_config(7).validate().is_ok());
    }

    #[test]
    fn reference_bundles_all_resolve() {
        let composer = reference_composer();
        assert!(composer.compose(&reference_bundles()).is_ok());
    }
}
