//! Spell lifecycle dispatch: running modifier hooks for a spell.
//!
//! The modifiers for a dispatch are the spell's own modifiers followed
//! by those of every active aura on the caster, collected fresh on each
//! call. An aura gained or lost mid-run changes the very next dispatch.

use std::sync::Arc;

use rotor_core::{CastError, Hook, HookContext, ModifierList, SimState, Spell, UnitId};
use smallvec::SmallVec;
use tracing::trace_span;

use crate::error::HookError;

/// The spell's modifiers plus those of the caster's active auras.
///
/// An unknown caster contributes no aura modifiers.
pub fn get_modifiers(spell: &Spell, caster: &UnitId, state: &SimState) -> ModifierList {
    let mut list = spell.info.modifiers.clone();
    if let Some(unit) = state.units.get(caster) {
        for aura in unit.active_auras(state.current_time) {
            list.extend_from(&aura.info.modifiers);
        }
    }
    list
}

/// Fold every `before_cast` hook over `spell`, left to right.
///
/// With no modifiers the input `Arc` is returned untouched. The first
/// failing modifier aborts the fold.
pub fn execute_before_cast(
    spell: Arc<Spell>,
    caster: &UnitId,
    state: &SimState,
) -> Result<Arc<Spell>, CastError> {
    let modifiers = get_modifiers(&spell, caster, state);
    if modifiers.is_empty() {
        return Ok(spell);
    }

    let spell_name = spell.info.name.clone();
    let folded = modifiers.iter().try_fold(spell, |acc, modifier| {
        let _span = trace_span!(
            "hook",
            hook = Hook::BeforeCast.as_str(),
            spell = %spell_name,
            modifier = modifier.name(),
        )
        .entered();
        modifier
            .before_cast(acc, caster)
            .map_err(|reason| CastError::Modifier {
                modifier: modifier.name().to_string(),
                reason,
            })
    });
    folded
}

fn fan_out(hook: Hook, ctx: &mut HookContext<'_>) -> Result<(), HookError> {
    let modifiers = get_modifiers(ctx.spell, ctx.caster, ctx.state);
    let mut failures = SmallVec::new();

    for modifier in &modifiers {
        let _span = trace_span!(
            "hook",
            hook = hook.as_str(),
            spell = %ctx.spell.info.name,
            modifier = modifier.name(),
        )
        .entered();
        let result = match hook {
            Hook::OnCast => modifier.on_cast(ctx),
            Hook::OnHit => modifier.on_hit(ctx),
            Hook::OnDamage => modifier.on_damage(ctx),
            Hook::BeforeCast => Ok(()),
        };
        if let Err(e) = result {
            failures.push((modifier.name().to_string(), e));
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(HookError {
            hook,
            spell: ctx.spell.info.name.clone(),
            failures,
        })
    }
}

/// Run every `on_cast` hook. All hooks run even if some fail.
pub fn execute_on_cast(ctx: &mut HookContext<'_>) -> Result<(), HookError> {
    fan_out(Hook::OnCast, ctx)
}

/// Run every `on_hit` hook. All hooks run even if some fail.
pub fn execute_on_hit(ctx: &mut HookContext<'_>) -> Result<(), HookError> {
    fan_out(Hook::OnHit, ctx)
}

/// Run every `on_damage` hook. All hooks run even if some fail.
pub fn execute_on_damage(ctx: &mut HookContext<'_>) -> Result<(), HookError> {
    fan_out(Hook::OnDamage, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotor_core::{
        Aura, AuraInfo, Emitter, EventKind, EventPayload, Modifier, ModifierError, SimTime,
        SpellId, SpellInfo, Unit,
    };

    /// Appends its tag to the spell name so fold order is observable.
    struct Tag(&'static str);

    impl Modifier for Tag {
        fn name(&self) -> &str {
            self.0
        }

        fn before_cast(&self, spell: Arc<Spell>, _: &UnitId) -> Result<Arc<Spell>, ModifierError> {
            let mut info = (*spell.info).clone();
            info.name = format!("{}({})", self.0, info.name);
            Ok(Arc::new(spell.with_info(Arc::new(info))))
        }

        fn on_hit(&self, ctx: &mut HookContext<'_>) -> Result<(), ModifierError> {
            ctx.emitter.emit(EventKind::Custom(1), EventPayload::None);
            Ok(())
        }
    }

    struct Broken;

    impl Modifier for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn before_cast(&self, _: Arc<Spell>, _: &UnitId) -> Result<Arc<Spell>, ModifierError> {
            Err(ModifierError::new("nope"))
        }

        fn on_hit(&self, _: &mut HookContext<'_>) -> Result<(), ModifierError> {
            Err(ModifierError::new("proc failed"))
        }
    }

    fn player() -> UnitId {
        UnitId::new("p")
    }

    fn state_with_aura(aura: Option<Aura>) -> SimState {
        let mut b = Unit::builder("p", "Player").player();
        if let Some(a) = aura {
            b = b.aura(a);
        }
        SimState::with_units([b.build()])
    }

    #[test]
    fn zero_modifiers_returns_identical_reference() {
        let spell = Arc::new(Spell::new(Arc::new(SpellInfo::new(SpellId(1), "Bolt"))));
        let out = execute_before_cast(Arc::clone(&spell), &player(), &state_with_aura(None)).unwrap();
        assert!(Arc::ptr_eq(&spell, &out));
    }

    #[test]
    fn before_cast_folds_left_to_right() {
        let info = SpellInfo::new(SpellId(1), "Bolt")
            .with_modifier(Arc::new(Tag("A")))
            .with_modifier(Arc::new(Tag("B")));
        let spell = Arc::new(Spell::new(Arc::new(info)));
        let out = execute_before_cast(spell, &player(), &state_with_aura(None)).unwrap();
        assert_eq!(out.info.name, "B(A(Bolt))");
    }

    #[test]
    fn before_cast_failure_is_cast_error() {
        let info = SpellInfo::new(SpellId(1), "Bolt").with_modifier(Arc::new(Broken));
        let spell = Arc::new(Spell::new(Arc::new(info)));
        let err = execute_before_cast(spell, &player(), &state_with_aura(None)).unwrap_err();
        assert!(matches!(err, CastError::Modifier { ref modifier, .. } if modifier == "broken"));
    }

    #[test]
    fn active_aura_contributes_modifiers_expired_does_not() {
        let aura_info = Arc::new(
            AuraInfo::new(SpellId(50), "Empower", SimTime(1000)).with_modifier(Arc::new(Tag("E"))),
        );
        let spell = Spell::new(Arc::new(SpellInfo::new(SpellId(1), "Bolt")));

        let mut state = state_with_aura(Some(Aura::applied(aura_info, player(), SimTime::ZERO)));
        assert_eq!(get_modifiers(&spell, &player(), &state).names(), vec!["E"]);

        state.current_time = SimTime(1000);
        assert!(get_modifiers(&spell, &player(), &state).is_empty());
    }

    #[test]
    fn fan_out_runs_every_hook_and_collects_failures() {
        let info = SpellInfo::new(SpellId(1), "Bolt")
            .with_modifier(Arc::new(Broken))
            .with_modifier(Arc::new(Tag("A")));
        let spell = Spell::new(Arc::new(info));
        let state = state_with_aura(None);
        let caster = player();
        let mut emitter = Emitter::new(SimTime::ZERO);

        let mut ctx = HookContext {
            spell: &spell,
            caster: &caster,
            target: None,
            amount: Some(10),
            critical: false,
            state: &state,
            emitter: &mut emitter,
        };
        let err = execute_on_hit(&mut ctx).unwrap_err();
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].0, "broken");
        // The healthy modifier still ran.
        assert_eq!(emitter.len(), 1);
    }

    #[test]
    fn missing_hooks_are_noops() {
        let info = SpellInfo::new(SpellId(1), "Bolt").with_modifier(Arc::new(Tag("A")));
        let spell = Spell::new(Arc::new(info));
        let state = state_with_aura(None);
        let caster = player();
        let mut emitter = Emitter::new(SimTime::ZERO);
        let mut ctx = HookContext {
            spell: &spell,
            caster: &caster,
            target: None,
            amount: None,
            critical: false,
            state: &state,
            emitter: &mut emitter,
        };
        assert!(execute_on_cast(&mut ctx).is_ok());
        assert!(execute_on_damage(&mut ctx).is_ok());
        assert!(emitter.is_empty());
    }
}
