//! The rotation program boundary.
//!
//! A rotation is evaluated once per `apl_evaluate` event. Through
//! [`RotationApi`] it may query readiness, cast, or wait. The first
//! successful cast (or wait) ends the evaluation: the next
//! `apl_evaluate` is scheduled and every later call in the same
//! evaluation returns [`CastError::Interrupted`].

use rotor_core::{CastError, Emitter, EventKind, EventPayload, SimState, SimTime, SpellId, StateCell, UnitId};

use crate::cast::{self, CastReceipt};
use crate::metrics::RunMetrics;

/// A rotation program.
///
/// Return `Ok(())` or propagate [`CastError::Interrupted`] to end the
/// evaluation normally. Any other error aborts the run.
pub trait Rotation: Send + Sync {
    /// Decide what to do at the current time.
    fn evaluate(&self, api: &mut RotationApi<'_>) -> Result<(), CastError>;
}

/// A [`Rotation`] backed by a closure. Build with [`rotation_fn`].
pub struct FnRotation<F>(F);

impl<F> Rotation for FnRotation<F>
where
    F: Fn(&mut RotationApi<'_>) -> Result<(), CastError> + Send + Sync,
{
    fn evaluate(&self, api: &mut RotationApi<'_>) -> Result<(), CastError> {
        (self.0)(api)
    }
}

/// Wrap a closure as a [`Rotation`].
///
/// # Examples
///
/// ```
/// use rotor_core::SpellId;
/// use rotor_engine::rotation::rotation_fn;
///
/// let priority_list = rotation_fn(|api| {
///     let me = api.player();
///     for spell in [SpellId(1), SpellId(2)] {
///         if api.can_cast(&me, spell) {
///             api.cast(&me, spell, None)?;
///         }
///     }
///     Ok(())
/// });
/// # let _ = priority_list;
/// ```
pub fn rotation_fn<F>(f: F) -> FnRotation<F>
where
    F: Fn(&mut RotationApi<'_>) -> Result<(), CastError> + Send + Sync,
{
    FnRotation(f)
}

/// How an evaluation ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Evaluation {
    /// When the next `apl_evaluate` fires.
    pub next_at: SimTime,
    /// Whether a cast or wait ended the evaluation.
    pub interrupted: bool,
}

/// The minimal API a rotation program sees.
pub struct RotationApi<'a> {
    player: UnitId,
    state: &'a mut StateCell,
    emitter: &'a mut Emitter,
    metrics: &'a mut RunMetrics,
    next_at: Option<SimTime>,
}

impl<'a> RotationApi<'a> {
    pub(crate) fn new(
        player: UnitId,
        state: &'a mut StateCell,
        emitter: &'a mut Emitter,
        metrics: &'a mut RunMetrics,
    ) -> Self {
        Self {
            player,
            state,
            emitter,
            metrics,
            next_at: None,
        }
    }

    /// The unit this rotation drives.
    pub fn player(&self) -> UnitId {
        self.player.clone()
    }

    /// Current virtual time.
    pub fn now(&self) -> SimTime {
        self.state.current().current_time
    }

    /// Read-only view of the state.
    pub fn state(&self) -> &SimState {
        self.state.current()
    }

    /// Whether the evaluation has already been ended by a cast or wait.
    pub fn is_interrupted(&self) -> bool {
        self.next_at.is_some()
    }

    /// Whether `unit` could cast `spell` now. Runs no modifier hooks.
    pub fn can_cast(&self, unit: &UnitId, spell: SpellId) -> bool {
        !self.is_interrupted() && cast::can_cast(self.state.current(), unit, spell)
    }

    /// Cast `spell` as `unit`, at `target` or the default target.
    ///
    /// On success the next evaluation is scheduled at
    /// `max(cast complete, gcd ready)` and this evaluation ends.
    pub fn cast(
        &mut self,
        unit: &UnitId,
        spell: SpellId,
        target: Option<&UnitId>,
    ) -> Result<CastReceipt, CastError> {
        if self.is_interrupted() {
            return Err(CastError::Interrupted);
        }
        match cast::request_cast(self.state, self.emitter, unit, spell, target.cloned()) {
            Ok(receipt) => {
                self.metrics.casts += 1;
                self.next_at = Some(receipt.next_action_at());
                Ok(receipt)
            }
            Err(e) => {
                self.metrics.rejected_casts += 1;
                tracing::debug!(unit = %unit, spell = %spell, reason = %e, "cast rejected");
                Err(e)
            }
        }
    }

    /// Yield for `delay` of virtual time. Ends this evaluation; the next
    /// one fires at `now + delay`.
    pub fn wait(&mut self, delay: SimTime) -> Result<(), CastError> {
        if self.is_interrupted() {
            return Err(CastError::Interrupted);
        }
        self.next_at = Some(self.now().saturating_add(delay));
        Ok(())
    }

    /// Schedule the next evaluation and report how this one ended.
    pub(crate) fn finish(self, idle_interval: SimTime) -> Evaluation {
        let now = self.now();
        let (next_at, interrupted) = match self.next_at {
            Some(at) => (at, true),
            None => (now.saturating_add(idle_interval), false),
        };
        self.emitter
            .emit_at(next_at, EventKind::AplEvaluate, EventPayload::None);
        Evaluation {
            next_at,
            interrupted,
        }
    }
}
