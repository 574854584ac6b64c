//! The handler registry: who reacts to which events, in what order.
//!
//! # Dispatch order
//!
//! For a dequeued event, [`HandlerRegistry::get_handlers`] returns:
//!
//! 1. every handler scoped to the event's kind *and* spell, sorted by
//!    priority ascending, then
//! 2. every handler scoped to the event's kind only, sorted the same way.
//!
//! Specificity always outranks numeric priority: a spell-scoped handler
//! at priority 500 runs before a general handler at priority 0. Within a
//! group, equal priorities run in registration order.
//!
//! # Priority bands
//!
//! | Range   | Band                               |
//! |---------|------------------------------------|
//! | 0–19    | pre-processing and validation      |
//! | 20–49   | core state mutation                |
//! | 50–99   | reactive effects and procs         |
//! | 100+    | telemetry and post-processing      |

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use rotor_core::{Event, EventKind, SpellId};

use crate::context::HandlerContext;
use crate::error::HandlerFailure;

/// Named priorities, one per band.
pub mod priority {
    /// Pre-processing and validation.
    pub const VALIDATION: u32 = 10;
    /// Core state mutation. Kernel handlers live here.
    pub const CORE_STATE: u32 = 30;
    /// Reactive effects and procs.
    pub const REACTIVE: u32 = 75;
    /// Telemetry and post-processing.
    pub const TELEMETRY: u32 = 100;
    /// Priority used when none is given.
    pub const DEFAULT: u32 = TELEMETRY;
}

/// The band a numeric priority falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PriorityBand {
    /// 0–19.
    PreProcessing,
    /// 20–49.
    CoreState,
    /// 50–99.
    Reactive,
    /// 100 and above.
    Telemetry,
}

impl PriorityBand {
    /// Classify a priority.
    pub fn of(priority: u32) -> Self {
        match priority {
            0..=19 => Self::PreProcessing,
            20..=49 => Self::CoreState,
            50..=99 => Self::Reactive,
            _ => Self::Telemetry,
        }
    }
}

/// Signature of a handler.
pub type HandlerFn =
    dyn Fn(&Event, &mut HandlerContext<'_>) -> Result<(), HandlerFailure> + Send + Sync;

/// Which events a handler reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EventFilter {
    /// Event kind.
    pub kind: EventKind,
    /// Optional spell scope.
    pub spell: Option<SpellId>,
}

impl EventFilter {
    /// Every event of this kind.
    pub fn kind(kind: EventKind) -> Self {
        Self { kind, spell: None }
    }

    /// Events of this kind about this spell.
    pub fn spell(kind: EventKind, spell: SpellId) -> Self {
        Self {
            kind,
            spell: Some(spell),
        }
    }
}

impl From<EventKind> for EventFilter {
    fn from(kind: EventKind) -> Self {
        Self::kind(kind)
    }
}

/// Registration options.
#[derive(Clone, Debug)]
pub struct HandlerOptions {
    /// Explicit id. Registering an id that already exists replaces the
    /// earlier handler. Generated when absent.
    pub id: Option<String>,
    /// Dispatch priority within the handler's group. Default: 100.
    pub priority: u32,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            id: None,
            priority: priority::DEFAULT,
        }
    }
}

impl HandlerOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the id.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the priority.
    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }
}

/// A handler as stored in the registry.
#[derive(Clone)]
pub struct RegisteredHandler {
    /// Registry id.
    pub id: String,
    /// Filter it was registered with.
    pub filter: EventFilter,
    /// Dispatch priority.
    pub priority: u32,
    seq: u64,
    func: Arc<HandlerFn>,
}

impl RegisteredHandler {
    /// Invoke the handler.
    pub fn call(&self, event: &Event, ctx: &mut HandlerContext<'_>) -> Result<(), HandlerFailure> {
        (self.func)(event, ctx)
    }

    fn sort_key(&self) -> (u32, u64) {
        (self.priority, self.seq)
    }
}

impl fmt::Debug for RegisteredHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredHandler")
            .field("id", &self.id)
            .field("filter", &self.filter)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Handle returned by [`HandlerRegistry::on`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use = "dropping a Subscription does not unsubscribe; keep it or call unsubscribe"]
pub struct Subscription {
    id: String,
}

impl Subscription {
    /// The handler's registry id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Remove the handler. Returns whether it was still registered.
    pub fn unsubscribe(self, registry: &mut HandlerRegistry) -> bool {
        registry.unsubscribe(&self.id)
    }
}

/// Subscription table for one run.
#[derive(Default)]
pub struct HandlerRegistry {
    by_kind: IndexMap<EventKind, Vec<RegisteredHandler>>,
    next_seq: u64,
}

impl HandlerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler.
    pub fn on<F>(
        &mut self,
        filter: impl Into<EventFilter>,
        handler: F,
        options: HandlerOptions,
    ) -> Subscription
    where
        F: Fn(&Event, &mut HandlerContext<'_>) -> Result<(), HandlerFailure> + Send + Sync + 'static,
    {
        let filter = filter.into();
        let seq = self.next_seq;
        self.next_seq += 1;
        let id = options
            .id
            .unwrap_or_else(|| format!("{}#{seq}", filter.kind));

        self.unsubscribe(&id);
        self.by_kind
            .entry(filter.kind)
            .or_default()
            .push(RegisteredHandler {
                id: id.clone(),
                filter,
                priority: options.priority,
                seq,
                func: Arc::new(handler),
            });
        Subscription { id }
    }

    /// Register a handler scoped to one spell.
    pub fn on_spell<F>(
        &mut self,
        kind: EventKind,
        spell: SpellId,
        handler: F,
        options: HandlerOptions,
    ) -> Subscription
    where
        F: Fn(&Event, &mut HandlerContext<'_>) -> Result<(), HandlerFailure> + Send + Sync + 'static,
    {
        self.on(EventFilter::spell(kind, spell), handler, options)
    }

    /// Handlers for `event` in dispatch order: spell-specific first,
    /// then general, each group by `(priority, registration order)`.
    pub fn get_handlers(&self, event: &Event) -> Vec<RegisteredHandler> {
        let Some(all) = self.by_kind.get(&event.kind) else {
            return Vec::new();
        };
        let spell = event.spell_id();

        let mut specific: Vec<RegisteredHandler> = all
            .iter()
            .filter(|h| h.filter.spell.is_some() && h.filter.spell == spell)
            .cloned()
            .collect();
        let mut general: Vec<RegisteredHandler> = all
            .iter()
            .filter(|h| h.filter.spell.is_none())
            .cloned()
            .collect();

        specific.sort_by_key(RegisteredHandler::sort_key);
        general.sort_by_key(RegisteredHandler::sort_key);
        specific.extend(general);
        specific
    }

    /// Remove a handler by id. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: &str) -> bool {
        for handlers in self.by_kind.values_mut() {
            if let Some(pos) = handlers.iter().position(|h| h.id == id) {
                handlers.remove(pos);
                return true;
            }
        }
        false
    }

    /// Remove every handler for one kind.
    pub fn clear(&mut self, kind: EventKind) {
        self.by_kind.shift_remove(&kind);
    }

    /// Remove every handler.
    pub fn clear_all(&mut self) {
        self.by_kind.clear();
    }

    /// Whether a handler with this id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.by_kind.values().flatten().any(|h| h.id == id)
    }

    /// Total number of registered handlers.
    pub fn len(&self) -> usize {
        self.by_kind.values().map(Vec::len).sum()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotor_core::{EventId, EventPayload, SimTime, UnitId};

    fn noop(_: &Event, _: &mut HandlerContext<'_>) -> Result<(), HandlerFailure> {
        Ok(())
    }

    fn cooldown_event(spell: u32) -> Event {
        Event {
            id: EventId(0),
            time: SimTime(0),
            priority: EventKind::SpellCooldownReady.priority(),
            seq: 0,
            kind: EventKind::SpellCooldownReady,
            payload: EventPayload::SpellRef {
                unit: UnitId::new("p"),
                spell: SpellId(spell),
            },
        }
    }

    fn ids(handlers: &[RegisteredHandler]) -> Vec<&str> {
        handlers.iter().map(|h| h.id.as_str()).collect()
    }

    #[test]
    fn specific_beats_priority_across_groups() {
        let mut reg = HandlerRegistry::new();
        let _ = reg.on(
            EventKind::SpellCooldownReady,
            noop,
            HandlerOptions::new().id("general").priority(10),
        );
        let _ = reg.on_spell(
            EventKind::SpellCooldownReady,
            SpellId(7),
            noop,
            HandlerOptions::new().id("specific").priority(50),
        );

        let handlers = reg.get_handlers(&cooldown_event(7));
        assert_eq!(ids(&handlers), vec!["specific", "general"]);
    }

    #[test]
    fn other_spells_handlers_are_excluded() {
        let mut reg = HandlerRegistry::new();
        let _ = reg.on_spell(
            EventKind::SpellCooldownReady,
            SpellId(1),
            noop,
            HandlerOptions::new().id("one"),
        );
        let _ = reg.on(
            EventKind::SpellCooldownReady,
            noop,
            HandlerOptions::new().id("any"),
        );
        assert_eq!(ids(&reg.get_handlers(&cooldown_event(2))), vec!["any"]);
    }

    #[test]
    fn equal_priority_keeps_registration_order() {
        let mut reg = HandlerRegistry::new();
        for name in ["a", "b", "c"] {
            let _ = reg.on(
                EventKind::SpellCooldownReady,
                noop,
                HandlerOptions::new().id(name).priority(30),
            );
        }
        let _ = reg.on(
            EventKind::SpellCooldownReady,
            noop,
            HandlerOptions::new().id("first").priority(5),
        );
        assert_eq!(
            ids(&reg.get_handlers(&cooldown_event(1))),
            vec!["first", "a", "b", "c"]
        );
    }

    #[test]
    fn duplicate_id_replaces() {
        let mut reg = HandlerRegistry::new();
        let _ = reg.on(
            EventKind::SpellCooldownReady,
            noop,
            HandlerOptions::new().id("x").priority(1),
        );
        let _ = reg.on(
            EventKind::SpellCooldownReady,
            noop,
            HandlerOptions::new().id("x").priority(99),
        );
        let handlers = reg.get_handlers(&cooldown_event(1));
        assert_eq!(handlers.len(), 1);
        assert_eq!(handlers[0].priority, 99);
    }

    #[test]
    fn unsubscribe_and_clear() {
        let mut reg = HandlerRegistry::new();
        let sub = reg.on(EventKind::SpellCooldownReady, noop, HandlerOptions::new());
        let _ = reg.on(EventKind::AuraExpire, noop, HandlerOptions::new().id("aura"));
        let _ = reg.on(EventKind::AuraExpire, noop, HandlerOptions::new());
        assert_eq!(reg.len(), 3);

        assert!(sub.clone().unsubscribe(&mut reg));
        assert!(!sub.unsubscribe(&mut reg));
        assert_eq!(reg.len(), 2);

        reg.clear(EventKind::AuraExpire);
        assert!(reg.is_empty());

        let _ = reg.on(EventKind::AuraExpire, noop, HandlerOptions::new());
        reg.clear_all();
        assert!(reg.is_empty());
    }

    #[test]
    fn generated_ids_are_unique() {
        let mut reg = HandlerRegistry::new();
        let a = reg.on(EventKind::AuraExpire, noop, HandlerOptions::new());
        let b = reg.on(EventKind::AuraExpire, noop, HandlerOptions::new());
        assert_ne!(a.id(), b.id());
        assert!(reg.contains(a.id()));
    }

    #[test]
    fn priority_bands() {
        assert_eq!(PriorityBand::of(priority::VALIDATION), PriorityBand::PreProcessing);
        assert_eq!(PriorityBand::of(priority::CORE_STATE), PriorityBand::CoreState);
        assert_eq!(PriorityBand::of(priority::REACTIVE), PriorityBand::Reactive);
        assert_eq!(PriorityBand::of(priority::TELEMETRY), PriorityBand::Telemetry);
        assert_eq!(PriorityBand::of(20), PriorityBand::CoreState);
        assert_eq!(PriorityBand::of(50), PriorityBand::Reactive);
    }
}
