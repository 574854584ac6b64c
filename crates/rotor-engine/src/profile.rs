//! Profile bundles and the composition cache.
//!
//! A [`ProfileBundle`] is a named, static collection of talents, auras,
//! spell overrides and modifier builders for one build feature.
//! [`ProfileComposer::compose`] merges a set of bundles into a
//! [`ComposedProfile`] and caches it under the canonical signature of
//! the set, so `[a, b]` and `[b, a]` share one entry.
//!
//! The cache lives as long as the composer, not a run: bundle content is
//! immutable, so one composer can be shared by every run in a batch.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use indexmap::IndexMap;
use rotor_core::{
    Aura, BundleId, MetadataProvider, Modifier, ModifierList, SimTime, SpellId, SpellInfo,
    TalentId, Unit,
};

use crate::error::ProfileError;

/// Builds a fresh modifier instance for a composed profile.
pub type ModifierBuilder = Arc<dyn Fn() -> Arc<dyn Modifier> + Send + Sync>;

// ── SpellOverride ───────────────────────────────────────────────

/// Partial replacement of a spell's static data. `None` keeps the
/// original value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpellOverride {
    /// Replacement cooldown.
    pub cooldown: Option<SimTime>,
    /// Replacement global cooldown.
    pub gcd: Option<SimTime>,
    /// Replacement cast time.
    pub cast_time: Option<SimTime>,
    /// Replacement power cost.
    pub power_cost: Option<u64>,
    /// Replacement base damage.
    pub base_damage: Option<u64>,
    /// Replacement `(max_charges, recovery)`.
    pub charges: Option<(u32, SimTime)>,
}

impl SpellOverride {
    /// Apply to `info`, returning the overridden copy.
    pub fn apply(&self, info: &SpellInfo) -> SpellInfo {
        let mut out = info.clone();
        if let Some(v) = self.cooldown {
            out.cooldown = v;
        }
        if let Some(v) = self.gcd {
            out.gcd = v;
        }
        if let Some(v) = self.cast_time {
            out.cast_time = v;
        }
        if let Some(v) = self.power_cost {
            out.power_cost = v;
        }
        if let Some(v) = self.base_damage {
            out.base_damage = v;
        }
        if let Some((max, recovery)) = self.charges {
            out = out.with_charges(max, recovery);
        }
        out
    }

    /// Merge `later` on top of `self`: any field `later` sets wins.
    fn merged_with(&self, later: &SpellOverride) -> SpellOverride {
        SpellOverride {
            cooldown: later.cooldown.or(self.cooldown),
            gcd: later.gcd.or(self.gcd),
            cast_time: later.cast_time.or(self.cast_time),
            power_cost: later.power_cost.or(self.power_cost),
            base_damage: later.base_damage.or(self.base_damage),
            charges: later.charges.or(self.charges),
        }
    }
}

// ── ProfileBundle ───────────────────────────────────────────────

/// One named build feature.
#[derive(Clone)]
pub struct ProfileBundle {
    /// Bundle id.
    pub id: BundleId,
    /// Auras installed permanently on the unit.
    pub auras: Vec<SpellId>,
    /// Talents recorded on the unit.
    pub talents: Vec<TalentId>,
    /// Per-spell overrides.
    pub spell_overrides: IndexMap<SpellId, SpellOverride>,
    /// `(name, builder)` pairs. Names deduplicate across bundles.
    pub modifiers: Vec<(String, ModifierBuilder)>,
}

impl ProfileBundle {
    /// An empty bundle.
    pub fn new(id: impl Into<BundleId>) -> Self {
        Self {
            id: id.into(),
            auras: Vec::new(),
            talents: Vec::new(),
            spell_overrides: IndexMap::new(),
            modifiers: Vec::new(),
        }
    }

    /// Add a permanent aura.
    pub fn with_aura(mut self, aura: SpellId) -> Self {
        self.auras.push(aura);
        self
    }

    /// Add a talent.
    pub fn with_talent(mut self, talent: TalentId) -> Self {
        self.talents.push(talent);
        self
    }

    /// Override a spell. A second override for the same spell replaces
    /// the first.
    pub fn with_override(mut self, spell: SpellId, ov: SpellOverride) -> Self {
        self.spell_overrides.insert(spell, ov);
        self
    }

    /// Add a modifier builder.
    pub fn with_modifier<F>(mut self, name: impl Into<String>, build: F) -> Self
    where
        F: Fn() -> Arc<dyn Modifier> + Send + Sync + 'static,
    {
        self.modifiers.push((name.into(), Arc::new(build)));
        self
    }
}

impl fmt::Debug for ProfileBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileBundle")
            .field("id", &self.id)
            .field("auras", &self.auras)
            .field("talents", &self.talents)
            .field("spell_overrides", &self.spell_overrides)
            .field(
                "modifiers",
                &self.modifiers.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Static table of bundles.
#[derive(Clone, Debug, Default)]
pub struct BundleRegistry {
    bundles: IndexMap<BundleId, ProfileBundle>,
}

impl BundleRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a bundle.
    pub fn insert(&mut self, bundle: ProfileBundle) {
        self.bundles.insert(bundle.id.clone(), bundle);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, bundle: ProfileBundle) -> Self {
        self.insert(bundle);
        self
    }

    /// Look up a bundle.
    pub fn get(&self, id: &BundleId) -> Option<&ProfileBundle> {
        self.bundles.get(id)
    }

    /// Number of bundles.
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}

// ── ComposedProfile ─────────────────────────────────────────────

/// The merged result of a bundle set.
#[derive(Clone, Debug)]
pub struct ComposedProfile {
    /// Canonical signature: sorted, deduplicated ids joined by `,`.
    pub signature: String,
    /// Bundle ids in canonical order.
    pub bundle_ids: Vec<BundleId>,
    /// Built modifiers, first occurrence of each name wins.
    pub modifiers: ModifierList,
    /// Auras, first occurrence wins.
    pub auras: Vec<SpellId>,
    /// Talents, first occurrence wins.
    pub talents: Vec<TalentId>,
    /// Overrides, later bundles win per field.
    pub spell_overrides: IndexMap<SpellId, SpellOverride>,
}

impl ComposedProfile {
    /// Apply this profile to `unit`.
    ///
    /// Every aura is resolved before anything is changed, so a missing
    /// aura leaves the unit untouched. Overrides are applied to spells
    /// the unit knows; profile modifiers are appended to every spell.
    /// Raising a spell's max charges grants the extra charges at once.
    pub fn apply_to(
        &self,
        unit: &mut Unit,
        metadata: &dyn MetadataProvider,
    ) -> Result<(), ProfileError> {
        let auras = self
            .auras
            .iter()
            .map(|id| metadata.aura_info(*id))
            .collect::<Result<Vec<_>, _>>()?;

        for spell in unit.spells.values_mut() {
            let ov = self.spell_overrides.get(&spell.id());
            if ov.is_none() && self.modifiers.is_empty() {
                continue;
            }
            let mut info = match ov {
                Some(ov) => ov.apply(&spell.info),
                None => (*spell.info).clone(),
            };
            info.modifiers.extend_from(&self.modifiers);
            let old_max = spell.info.max_charges.max(1);
            *spell = spell.with_info(Arc::new(info));
            let new_max = spell.info.max_charges.max(1);
            // Added charges start available; removed ones are clamped.
            spell.charges = if new_max > old_max {
                spell.charges.saturating_add(new_max - old_max).min(new_max)
            } else {
                spell.charges.min(new_max)
            };
        }

        for info in auras {
            let id = info.id;
            unit.auras
                .insert(id, Aura::permanent(info, unit.id.clone()));
        }
        for talent in &self.talents {
            if !unit.talents.contains(talent) {
                unit.talents.push(*talent);
            }
        }
        for id in &self.bundle_ids {
            if !unit.profile_bundles.contains(id) {
                unit.profile_bundles.push(id.clone());
            }
        }
        Ok(())
    }
}

// ── ProfileComposer ─────────────────────────────────────────────

/// Resolves and caches [`ComposedProfile`]s.
///
/// Safe to share across threads; the cache is guarded by a mutex and is
/// only written after a successful resolution.
pub struct ProfileComposer {
    registry: BundleRegistry,
    cache: Mutex<IndexMap<String, Arc<ComposedProfile>>>,
    resolutions: AtomicU64,
}

impl ProfileComposer {
    /// A composer over `registry` with an empty cache.
    pub fn new(registry: BundleRegistry) -> Self {
        Self {
            registry,
            cache: Mutex::new(IndexMap::new()),
            resolutions: AtomicU64::new(0),
        }
    }

    /// Canonical signature of an id set.
    pub fn signature(ids: &[BundleId]) -> String {
        let mut sorted: Vec<&str> = ids.iter().map(BundleId::as_str).collect();
        sorted.sort_unstable();
        sorted.dedup();
        sorted.join(",")
    }

    /// Compose `ids`, returning the cached profile when the same set was
    /// composed before.
    ///
    /// A missing id fails the whole call with
    /// [`ProfileError::BundleNotFound`] and caches nothing.
    pub fn compose(&self, ids: &[BundleId]) -> Result<Arc<ComposedProfile>, ProfileError> {
        let signature = Self::signature(ids);
        if let Some(hit) = self.lock().get(&signature) {
            tracing::trace!(signature = %signature, "profile cache hit");
            return Ok(Arc::clone(hit));
        }

        let mut canonical: Vec<BundleId> = ids.to_vec();
        canonical.sort_unstable_by(|a, b| a.as_str().cmp(b.as_str()));
        canonical.dedup();

        let bundles = canonical
            .iter()
            .map(|id| {
                self.registry
                    .get(id)
                    .ok_or_else(|| ProfileError::BundleNotFound(id.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let profile = Arc::new(merge(signature.clone(), canonical, &bundles));
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(signature = %signature, bundles = bundles.len(), "profile composed");

        let mut cache = self.lock();
        let entry = cache.entry(signature).or_insert(profile);
        Ok(Arc::clone(entry))
    }

    /// Number of cache misses that resolved successfully.
    pub fn resolutions(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }

    /// Number of cached profiles.
    pub fn cached(&self) -> usize {
        self.lock().len()
    }

    /// The bundle table.
    pub fn registry(&self) -> &BundleRegistry {
        &self.registry
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, IndexMap<String, Arc<ComposedProfile>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ProfileComposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileComposer")
            .field("bundles", &self.registry.len())
            .field("cached", &self.cached())
            .field("resolutions", &self.resolutions())
            .finish()
    }
}

fn merge(signature: String, bundle_ids: Vec<BundleId>, bundles: &[&ProfileBundle]) -> ComposedProfile {
    let mut modifiers = ModifierList::new();
    let mut seen_modifiers: Vec<&str> = Vec::new();
    let mut auras = Vec::new();
    let mut talents = Vec::new();
    let mut spell_overrides: IndexMap<SpellId, SpellOverride> = IndexMap::new();

    for bundle in bundles {
        for (name, build) in &bundle.modifiers {
            if !seen_modifiers.contains(&name.as_str()) {
                seen_modifiers.push(name);
                modifiers.push(build());
            }
        }
        for aura in &bundle.auras {
            if !auras.contains(aura) {
                auras.push(*aura);
            }
        }
        for talent in &bundle.talents {
            if !talents.contains(talent) {
                talents.push(*talent);
            }
        }
        for (spell, ov) in &bundle.spell_overrides {
            let merged = match spell_overrides.get(spell) {
                Some(earlier) => earlier.merged_with(ov),
                None => ov.clone(),
            };
            spell_overrides.insert(*spell, merged);
        }
    }

    ComposedProfile {
        signature,
        bundle_ids,
        modifiers,
        auras,
        talents,
        spell_overrides,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotor_core::{AuraInfo, StaticMetadata};

    struct Tag(&'static str);

    impl Modifier for Tag {
        fn name(&self) -> &str {
            self.0
        }
    }

    fn registry() -> BundleRegistry {
        BundleRegistry::new()
            .with(
                ProfileBundle::new("a")
                    .with_aura(SpellId(100))
                    .with_talent(TalentId(1))
                    .with_override(
                        SpellId(1),
                        SpellOverride {
                            cooldown: Some(SimTime(4000)),
                            ..Default::default()
                        },
                    )
                    .with_modifier("shared", || Arc::new(Tag("shared")))
                    .with_modifier("only-a", || Arc::new(Tag("only-a"))),
            )
            .with(
                ProfileBundle::new("b")
                    .with_aura(SpellId(100))
                    .with_talent(TalentId(2))
                    .with_override(
                        SpellId(1),
                        SpellOverride {
                            cooldown: Some(SimTime(3000)),
                            base_damage: Some(50),
                            ..Default::default()
                        },
                    )
                    .with_modifier("shared", || Arc::new(Tag("shared"))),
            )
    }

    fn ids(raw: &[&str]) -> Vec<BundleId> {
        raw.iter().map(|s| BundleId::new(*s)).collect()
    }

    #[test]
    fn order_independent_signature_and_content() {
        let composer = ProfileComposer::new(registry());
        let ab = composer.compose(&ids(&["a", "b"])).unwrap();
        let ba = composer.compose(&ids(&["b", "a"])).unwrap();

        assert_eq!(ab.signature, "a,b");
        assert!(Arc::ptr_eq(&ab, &ba));
        assert_eq!(composer.resolutions(), 1);

        assert_eq!(ab.modifiers.names(), vec!["shared", "only-a"]);
        assert_eq!(ab.auras, vec![SpellId(100)]);
        assert_eq!(ab.talents, vec![TalentId(1), TalentId(2)]);
        let ov = &ab.spell_overrides[&SpellId(1)];
        assert_eq!(ov.cooldown, Some(SimTime(3000)));
        assert_eq!(ov.base_damage, Some(50));
    }

    #[test]
    fn duplicates_collapse_into_one_signature() {
        let composer = ProfileComposer::new(registry());
        let p = composer.compose(&ids(&["b", "a", "b"])).unwrap();
        assert_eq!(p.signature, "a,b");
        assert_eq!(p.bundle_ids, ids(&["a", "b"]));
    }

    #[test]
    fn missing_bundle_fails_without_poisoning_cache() {
        let composer = ProfileComposer::new(registry());
        let err = composer.compose(&ids(&["a", "nope"])).unwrap_err();
        assert_eq!(err, ProfileError::BundleNotFound(BundleId::new("nope")));
        assert_eq!(composer.cached(), 0);
        assert_eq!(composer.resolutions(), 0);

        let ok = composer.compose(&ids(&["a"])).unwrap();
        assert_eq!(ok.signature, "a");
        assert_eq!(composer.cached(), 1);
    }

    #[test]
    fn apply_installs_auras_overrides_and_modifiers() {
        let composer = ProfileComposer::new(registry());
        let profile = composer.compose(&ids(&["a", "b"])).unwrap();
        let metadata = StaticMetadata::new()
            .with_aura(AuraInfo::new(SpellId(100), "Focus", SimTime::MAX));
        let mut unit = Unit::builder("p", "P")
            .player()
            .spell(Arc::new(SpellInfo::new(SpellId(1), "Strike").with_cooldown(SimTime(6000))))
            .build();

        profile.apply_to(&mut unit, &metadata).unwrap();

        let strike = &unit.spells[&SpellId(1)];
        assert_eq!(strike.info.cooldown, SimTime(3000));
        assert_eq!(strike.info.base_damage, 50);
        assert_eq!(strike.info.modifiers.names(), vec!["shared", "only-a"]);
        assert_eq!(unit.auras[&SpellId(100)].expires_at, SimTime::MAX);
        assert_eq!(unit.talents, vec![TalentId(1), TalentId(2)]);
        assert_eq!(unit.profile_bundles, ids(&["a", "b"]));
    }

    #[test]
    fn raising_max_charges_keeps_spell_full() {
        let bundle = ProfileBundle::new("charged").with_override(
            SpellId(1),
            SpellOverride {
                charges: Some((2, SimTime(1000))),
                ..Default::default()
            },
        );
        let composer = ProfileComposer::new(BundleRegistry::new().with(bundle));
        let profile = composer.compose(&ids(&["charged"])).unwrap();
        let mut unit = Unit::builder("p", "P")
            .spell(Arc::new(SpellInfo::new(SpellId(1), "Strike")))
            .build();

        profile.apply_to(&mut unit, &StaticMetadata::new()).unwrap();

        let strike = &unit.spells[&SpellId(1)];
        assert_eq!(strike.info.max_charges, 2);
        assert_eq!(strike.charges, 2);
        assert!(strike.is_full());
    }

    #[test]
    fn lowering_max_charges_clamps() {
        let bundle = ProfileBundle::new("single").with_override(
            SpellId(1),
            SpellOverride {
                charges: Some((1, SimTime(1000))),
                ..Default::default()
            },
        );
        let composer = ProfileComposer::new(BundleRegistry::new().with(bundle));
        let profile = composer.compose(&ids(&["single"])).unwrap();
        let info = SpellInfo::new(SpellId(1), "Strike").with_charges(3, SimTime(1000));
        let mut unit = Unit::builder("p", "P").spell(Arc::new(info)).build();

        profile.apply_to(&mut unit, &StaticMetadata::new()).unwrap();
        assert_eq!(unit.spells[&SpellId(1)].charges, 1);
    }

    #[test]
    fn apply_with_unknown_aura_leaves_unit_untouched() {
        let composer = ProfileComposer::new(registry());
        let profile = composer.compose(&ids(&["a"])).unwrap();
        let mut unit = Unit::builder("p", "P")
            .spell(Arc::new(SpellInfo::new(SpellId(1), "Strike")))
            .build();
        let before = unit.clone();

        let err = profile.apply_to(&mut unit, &StaticMetadata::new()).unwrap_err();
        assert!(matches!(err, ProfileError::Lookup(_)));
        assert_eq!(unit, before);
    }
}
