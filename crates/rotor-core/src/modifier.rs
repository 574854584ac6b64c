//! The [`Modifier`] trait and the [`ModifierList`] carried by spells and auras.
//!
//! A modifier is a named bundle of optional hooks. `before_cast` is a
//! transformation (folded left to right over a spell); `on_cast`,
//! `on_hit` and `on_damage` are pure reactions that may only emit
//! follow-up events. Every hook has a no-op default, so a modifier
//! implements exactly the hooks it cares about.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::ModifierError;
use crate::event::Emitter;
use crate::id::{SimTime, UnitId};
use crate::model::Spell;
use crate::state::SimState;

/// The four lifecycle hook points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hook {
    /// Transformation run before validation of a cast.
    BeforeCast,
    /// Reaction when a cast completes.
    OnCast,
    /// Reaction when a spell lands on its target.
    OnHit,
    /// Reaction after damage has been applied.
    OnDamage,
}

impl Hook {
    /// Stable name used in trace output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BeforeCast => "before_cast",
            Self::OnCast => "on_cast",
            Self::OnHit => "on_hit",
            Self::OnDamage => "on_damage",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a reactive hook can see, plus the event buffer it may
/// emit follow-up events into.
pub struct HookContext<'a> {
    /// The spell that triggered the hook (post-`before_cast`).
    pub spell: &'a Spell,
    /// The casting unit.
    pub caster: &'a UnitId,
    /// The resolved target, if any.
    pub target: Option<&'a UnitId>,
    /// Damage amount for `on_hit`/`on_damage`; `None` for `on_cast`.
    pub amount: Option<u64>,
    /// Whether the damage was a critical strike.
    pub critical: bool,
    /// Read-only view of the state at the time of dispatch.
    pub state: &'a SimState,
    /// Output buffer for follow-up events.
    pub emitter: &'a mut Emitter,
}

impl HookContext<'_> {
    /// Current virtual time.
    pub fn now(&self) -> SimTime {
        self.state.current_time
    }
}

/// A named bundle of optional lifecycle hooks attached to a spell or aura.
///
/// # Contract
///
/// - `before_cast` returns the (possibly replaced) spell. Returning the
///   input `Arc` unchanged is the no-op.
/// - Reactive hooks must not assume any ordering relative to other
///   modifiers' hooks for the same dispatch.
/// - `&self`: modifiers are shared between runs; any bookkeeping must
///   use interior mutability.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use rotor_core::{Modifier, ModifierError, Spell, SimTime, UnitId};
///
/// struct Instant;
///
/// impl Modifier for Instant {
///     fn name(&self) -> &str { "instant" }
///
///     fn before_cast(&self, spell: Arc<Spell>, _caster: &UnitId) -> Result<Arc<Spell>, ModifierError> {
///         let mut info = (*spell.info).clone();
///         info.cast_time = SimTime::ZERO;
///         Ok(Arc::new(spell.with_info(Arc::new(info))))
///     }
/// }
///
/// assert_eq!(Instant.name(), "instant");
/// ```
pub trait Modifier: Send + Sync + 'static {
    /// Human-readable name for tracing and deduplication.
    fn name(&self) -> &str;

    /// Transform a spell before it is validated and cast.
    fn before_cast(&self, spell: Arc<Spell>, caster: &UnitId) -> Result<Arc<Spell>, ModifierError> {
        let _ = caster;
        Ok(spell)
    }

    /// React to a completed cast.
    fn on_cast(&self, ctx: &mut HookContext<'_>) -> Result<(), ModifierError> {
        let _ = ctx;
        Ok(())
    }

    /// React to the spell landing on its target.
    fn on_hit(&self, ctx: &mut HookContext<'_>) -> Result<(), ModifierError> {
        let _ = ctx;
        Ok(())
    }

    /// React to damage having been applied.
    fn on_damage(&self, ctx: &mut HookContext<'_>) -> Result<(), ModifierError> {
        let _ = ctx;
        Ok(())
    }
}

/// Ordered list of shared modifiers.
///
/// Equality is identity-based: two lists are equal when they hold the
/// same modifier instances in the same order. This keeps structural
/// comparison of state snapshots cheap and well-defined.
#[derive(Clone, Default)]
pub struct ModifierList(SmallVec<[Arc<dyn Modifier>; 2]>);

impl ModifierList {
    /// An empty list.
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    /// Append a modifier.
    pub fn push(&mut self, modifier: Arc<dyn Modifier>) {
        self.0.push(modifier);
    }

    /// Append every modifier from `other`, preserving order.
    pub fn extend_from(&mut self, other: &ModifierList) {
        self.0.extend(other.0.iter().cloned());
    }

    /// Number of modifiers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list holds no modifiers.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Modifier>> {
        self.0.iter()
    }

    /// Whether a modifier with this name is present.
    pub fn contains_name(&self, name: &str) -> bool {
        self.0.iter().any(|m| m.name() == name)
    }

    /// Names in order.
    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|m| m.name()).collect()
    }
}

impl PartialEq for ModifierList {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| Arc::ptr_eq(a, b))
    }
}

impl fmt::Debug for ModifierList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter().map(|m| m.name())).finish()
    }
}

impl FromIterator<Arc<dyn Modifier>> for ModifierList {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Modifier>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ModifierList {
    type Item = &'a Arc<dyn Modifier>;
    type IntoIter = std::slice::Iter<'a, Arc<dyn Modifier>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Modifier for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn equality_is_by_identity() {
        let a: Arc<dyn Modifier> = Arc::new(Named("a"));
        let a_twin: Arc<dyn Modifier> = Arc::new(Named("a"));

        let one: ModifierList = [a.clone()].into_iter().collect();
        let same: ModifierList = [a].into_iter().collect();
        let twin: ModifierList = [a_twin].into_iter().collect();

        assert_eq!(one, same);
        assert_ne!(one, twin);
    }

    #[test]
    fn debug_lists_names() {
        let list: ModifierList = [
            Arc::new(Named("x")) as Arc<dyn Modifier>,
            Arc::new(Named("y")),
        ]
        .into_iter()
        .collect();
        assert_eq!(format!("{list:?}"), r#"["x", "y"]"#);
        assert!(list.contains_name("y"));
        assert_eq!(list.names(), vec!["x", "y"]);
    }
}
