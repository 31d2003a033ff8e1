//! In-memory counters for pipeline activity, independent of whatever
//! backend [`metrics_exporter_prometheus`] is wired up to in `main.rs`.
//!
//! Mirrors the domain-specific-metrics-type approach used elsewhere in this
//! codebase's lineage: a small collector owns the counts, and the service's
//! entry point is responsible for exposing them to an actual exporter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Thread-safe counters for events observed and reports filed.
#[derive(Debug, Default)]
pub struct GuardMetrics {
    events_seen: AtomicU64,
    events_by_kind: Mutex<HashMap<&'static str, u64>>,
    reports_filed: AtomicU64,
    reports_by_kind: Mutex<HashMap<&'static str, u64>>,
    handler_errors: AtomicU64,
}

impl GuardMetrics {
    /// Builds an empty set of counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that an event of `kind` was routed to a handler.
    pub fn record_event(&self, kind: &'static str) {
        self.events_seen.fetch_add(1, Ordering::Relaxed);
        *self.events_by_kind.lock().entry(kind).or_insert(0) += 1;
    }

    /// Record that a fraud-report transaction of `kind` was submitted.
    pub fn record_report(&self, kind: &'static str) {
        self.reports_filed.fetch_add(1, Ordering::Relaxed);
        *self.reports_by_kind.lock().entry(kind).or_insert(0) += 1;
    }

    /// Record that a handler returned an error (swallowed, not propagated).
    pub fn record_handler_error(&self) {
        self.handler_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Total events routed since startup.
    #[must_use]
    pub fn total_events(&self) -> u64 {
        self.events_seen.load(Ordering::Relaxed)
    }

    /// Total report transactions filed since startup.
    #[must_use]
    pub fn total_reports(&self) -> u64 {
        self.reports_filed.load(Ordering::Relaxed)
    }

    /// Total handler errors observed since startup.
    #[must_use]
    pub fn total_handler_errors(&self) -> u64 {
        self.handler_errors.load(Ordering::Relaxed)
    }

    /// Snapshot of per-kind event counts.
    #[must_use]
    pub fn events_by_kind(&self) -> HashMap<&'static str, u64> {
        self.events_by_kind.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_events_and_reports_independently() {
        let metrics = GuardMetrics::new();
        metrics.record_event("snapshot_accepted");
        metrics.record_event("snapshot_accepted");
        metrics.record_report("state_report");
        assert_eq!(metrics.total_events(), 2);
        assert_eq!(metrics.total_reports(), 1);
        assert_eq!(metrics.events_by_kind()["snapshot_accepted"], 2);
    }

    #[test]
    fn handler_errors_are_counted_separately_from_events() {
        let metrics = GuardMetrics::new();
        metrics.record_event("receipt_accepted");
        metrics.record_handler_error();
        assert_eq!(metrics.total_events(), 1);
        assert_eq!(metrics.total_handler_errors(), 1);
    }
}
