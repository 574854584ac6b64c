//! Mock modifiers.
//!
//! - [`RecordingModifier`] counts every hook invocation.
//! - [`FailingModifier`] fails one chosen hook.
//! - [`InstantCast`] strips a spell's cast time in `before_cast`.
//! - [`DamageBonus`] adds flat damage in `before_cast`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rotor_core::{Hook, HookContext, Modifier, ModifierError, SimTime, Spell, UnitId};

/// Counts invocations per hook. Shares its counters across clones of
/// the `Arc`.
#[derive(Default)]
pub struct RecordingModifier {
    pub name: String,
    before_cast: AtomicUsize,
    on_cast: AtomicUsize,
    on_hit: AtomicUsize,
    on_damage: AtomicUsize,
    damage_seen: AtomicUsize,
}

impl RecordingModifier {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            ..Default::default()
        })
    }

    pub fn calls(&self, hook: Hook) -> usize {
        let counter = match hook {
            Hook::BeforeCast => &self.before_cast,
            Hook::OnCast => &self.on_cast,
            Hook::OnHit => &self.on_hit,
            Hook::OnDamage => &self.on_damage,
        };
        counter.load(Ordering::SeqCst)
    }

    /// Sum of every `amount` seen by `on_damage`.
    pub fn damage_seen(&self) -> usize {
        self.damage_seen.load(Ordering::SeqCst)
    }
}

impl Modifier for RecordingModifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn before_cast(&self, spell: Arc<Spell>, _caster: &UnitId) -> Result<Arc<Spell>, ModifierError> {
        self.before_cast.fetch_add(1, Ordering::SeqCst);
        Ok(spell)
    }

    fn on_cast(&self, _ctx: &mut HookContext<'_>) -> Result<(), ModifierError> {
        self.on_cast.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_hit(&self, _ctx: &mut HookContext<'_>) -> Result<(), ModifierError> {
        self.on_hit.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_damage(&self, ctx: &mut HookContext<'_>) -> Result<(), ModifierError> {
        self.on_damage.fetch_add(1, Ordering::SeqCst);
        let amount = ctx.amount.unwrap_or(0);
        self.damage_seen.fetch_add(amount as usize, Ordering::SeqCst);
        Ok(())
    }
}

/// Fails every invocation of one hook.
pub struct FailingModifier {
    pub hook: Hook,
}

impl FailingModifier {
    pub fn on(hook: Hook) -> Arc<Self> {
        Arc::new(Self { hook })
    }

    fn check(&self, hook: Hook) -> Result<(), ModifierError> {
        if hook == self.hook {
            Err(ModifierError::new(format!("{} always fails", hook.as_str())))
        } else {
            Ok(())
        }
    }
}

impl Modifier for FailingModifier {
    fn name(&self) -> &str {
        "failing"
    }

    fn before_cast(&self, spell: Arc<Spell>, _caster: &UnitId) -> Result<Arc<Spell>, ModifierError> {
        self.check(Hook::BeforeCast).map(|()| spell)
    }

    fn on_cast(&self, _ctx: &mut HookContext<'_>) -> Result<(), ModifierError> {
        self.check(Hook::OnCast)
    }

    fn on_hit(&self, _ctx: &mut HookContext<'_>) -> Result<(), ModifierError> {
        self.check(Hook::OnHit)
    }

    fn on_damage(&self, _ctx: &mut HookContext<'_>) -> Result<(), ModifierError> {
        self.check(Hook::OnDamage)
    }
}

/// Makes every spell it touches instant.
pub struct InstantCast;

impl Modifier for InstantCast {
    fn name(&self) -> &str {
        "instant-cast"
    }

    fn before_cast(&self, spell: Arc<Spell>, _caster: &UnitId) -> Result<Arc<Spell>, ModifierError> {
        if spell.info.cast_time.is_zero() {
            return Ok(spell);
        }
        let mut info = (*spell.info).clone();
        info.cast_time = SimTime::ZERO;
        Ok(Arc::new(spell.with_info(Arc::new(info))))
    }
}

/// Adds flat base damage.
pub struct DamageBonus(pub u64);

impl Modifier for DamageBonus {
    fn name(&self) -> &str {
        "damage-bonus"
    }

    fn before_cast(&self, spell: Arc<Spell>, _caster: &UnitId) -> Result<Arc<Spell>, ModifierError> {
        let mut info = (*spell.info).clone();
        info.base_damage += self.0;
        Ok(Arc::new(spell.with_info(Arc::new(info))))
    }
}
