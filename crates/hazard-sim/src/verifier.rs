//! Post-run checks.
//!
//! Only the frequency count has a guaranteed invariant, and only that one is
//! escalated to an error. Fill drift and stale scratch reads are the behaviour
//! being demonstrated; they come back as plain data.

use std::collections::BTreeMap;

use hazard_core::{HarnessError, Violation};
use serde::Serialize;
use tracing::{info, warn};

use crate::report::TaskObservation;

/// Outcome of a passed sum check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SumReport {
    pub expected: u64,
    pub actual: u64,
    pub keys: usize,
}

/// How far the fill race landed from its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DriftReport {
    pub target: usize,
    pub observed: usize,
    /// `observed - target`; positive means overshoot.
    pub drift: i64,
}

impl DriftReport {
    pub fn overshoot(&self) -> bool {
        self.drift > 0
    }

    pub fn reached_target(&self) -> bool {
        self.drift >= 0
    }
}

/// Whether a task started with another task's scratch value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeakReport {
    pub leaked: bool,
    /// What the second task read before writing its own value.
    pub stale_value: Option<u64>,
    /// The user whose value was read, when it leaked.
    pub leaked_from: Option<u64>,
    pub same_unit: bool,
}

/// Fail unless the counters add up to exactly `expected`.
pub fn verify_sum(
    mapping: &BTreeMap<String, u64>,
    expected: u64,
) -> Result<SumReport, HarnessError> {
    let actual: u64 = mapping.values().sum();
    if actual != expected {
        let violation = Violation::new(
            "sum-equals-loop-count",
            format!(
                "expected {} increments across {} keys, counted {}",
                expected,
                mapping.len(),
                actual
            ),
        );
        warn!(expected, actual, "frequency sum mismatch");
        return Err(HarnessError::InvariantViolated(violation));
    }
    Ok(SumReport {
        expected,
        actual,
        keys: mapping.len(),
    })
}

/// Flag a counter map that ever built more handles than it has keys.
pub fn verify_unique_handles(counters_created: u64, keys: usize) -> Option<Violation> {
    if counters_created > keys as u64 {
        Some(Violation::new(
            "one-counter-per-key",
            format!(
                "{} counter handles constructed for {} keys",
                counters_created, keys
            ),
        ))
    } else {
        None
    }
}

/// Record the fill race's final size. Never fails.
pub fn observe_drift(observed: usize, target: usize) -> DriftReport {
    let drift = signed(observed).saturating_sub(signed(target));
    info!(observed, target, drift, "finished size");
    DriftReport {
        target,
        observed,
        drift,
    }
}

fn signed(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Compare the second task's first read against what the first task left.
pub fn observe_leak(first: &TaskObservation, second: &TaskObservation) -> LeakReport {
    let stale_value = second.before;
    let leaked = stale_value.is_some() && stale_value == first.after;
    let report = LeakReport {
        leaked,
        stale_value,
        leaked_from: leaked.then_some(first.user_id),
        same_unit: first.unit == second.unit,
    };
    if report.leaked {
        info!(
            user_id = second.user_id,
            stale = ?report.stale_value,
            "task started with a previous task's scratch value"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use hazard_core::UnitId;

    fn mapping(values: &[u64]) -> BTreeMap<String, u64> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("item{}", i), *v))
            .collect()
    }

    fn observation(user_id: u64, before: Option<u64>, after: Option<u64>) -> TaskObservation {
        TaskObservation {
            user_id,
            unit: UnitId(0),
            thread: "hazard-unit-0".to_string(),
            before,
            after,
        }
    }

    #[test]
    fn test_verify_sum_exact() {
        let report = verify_sum(&mapping(&[3, 4, 5]), 12).unwrap();
        assert_eq!(report.actual, 12);
        assert_eq!(report.keys, 3);
    }

    #[test]
    fn test_verify_sum_empty_zero() {
        let report = verify_sum(&BTreeMap::new(), 0).unwrap();
        assert_eq!(report.keys, 0);
    }

    #[test]
    fn test_verify_sum_mismatch_is_invariant_error() {
        let err = verify_sum(&mapping(&[3, 4]), 8).unwrap_err();
        assert!(err.is_invariant());
        let v = err.violation().unwrap();
        assert_eq!(v.invariant, "sum-equals-loop-count");
        assert!(v.details.contains("counted 7"));
    }

    #[test]
    fn test_unique_handles() {
        assert!(verify_unique_handles(10, 10).is_none());
        assert!(verify_unique_handles(0, 0).is_none());
        let v = verify_unique_handles(11, 10).unwrap();
        assert_eq!(v.invariant, "one-counter-per-key");
    }

    #[test]
    fn test_drift_is_data() {
        let over = observe_drift(1900, 1000);
        assert_eq!(over.drift, 900);
        assert!(over.overshoot());
        assert!(over.reached_target());

        let exact = observe_drift(1000, 1000);
        assert!(!exact.overshoot());
        assert!(exact.reached_target());

        let under = observe_drift(950, 1000);
        assert_eq!(under.drift, -50);
        assert!(!under.reached_target());
    }

    #[test]
    fn test_drift_saturates_on_huge_sizes() {
        assert_eq!(observe_drift(usize::MAX, 0).drift, i64::MAX);
        assert_eq!(observe_drift(0, usize::MAX).drift, -i64::MAX);
    }

    #[test]
    fn test_leak_detected() {
        let first = observation(1, None, Some(1));
        let second = observation(2, Some(1), Some(2));
        let leak = observe_leak(&first, &second);
        assert!(leak.leaked);
        assert_eq!(leak.stale_value, Some(1));
        assert_eq!(leak.leaked_from, Some(1));
        assert!(leak.same_unit);
    }

    #[test]
    fn test_no_leak_when_cleared() {
        let first = observation(1, None, Some(1));
        let second = observation(2, None, Some(2));
        let leak = observe_leak(&first, &second);
        assert!(!leak.leaked);
        assert_eq!(leak.leaked_from, None);
    }
}
