//! Per-run counters.
//!
//! [`RunMetrics`] is accumulated by the driver and the kernel handlers
//! and returned with every [`RunResult`](crate::simulation::RunResult).

/// Counters collected during a single run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunMetrics {
    /// Events fully processed.
    pub events_processed: u64,
    /// Individual handler invocations across all events.
    pub handler_invocations: u64,
    /// Snapshots published to subscribers (including the initial one).
    pub snapshots_published: u64,
    /// Successful casts.
    pub casts: u64,
    /// Cast requests refused by validation.
    pub rejected_casts: u64,
    /// Projectiles launched.
    pub projectiles_launched: u64,
    /// Projectiles that reached their target.
    pub projectiles_resolved: u64,
    /// Reactive modifier hooks that failed and were logged.
    pub hook_failures: u64,
    /// Whether the run stopped on the iteration cap.
    pub iteration_cap_hit: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = RunMetrics::default();
        assert_eq!(m.events_processed, 0);
        assert_eq!(m.handler_invocations, 0);
        assert_eq!(m.snapshots_published, 0);
        assert_eq!(m.casts, 0);
        assert_eq!(m.rejected_casts, 0);
        assert_eq!(m.projectiles_launched, 0);
        assert_eq!(m.projectiles_resolved, 0);
        assert_eq!(m.hook_failures, 0);
        assert!(!m.iteration_cap_hit);
    }
}
