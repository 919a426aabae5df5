//! Drift detection against a configurable spike-ratio policy (spec §4.9 step 4).

use gov_core::MetricsEnvelope;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DriftPolicy {
    pub rollback_latency_spike_ratio: f64,
    pub rollback_cost_spike_ratio: f64,
    pub rollback_error_spike_ratio: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DriftReport {
    pub drift_score: f64,
    pub reasons: Vec<String>,
}

impl DriftReport {
    pub fn exceeded(&self) -> bool {
        !self.reasons.is_empty()
    }
}

/// Each metric is checked independently against its own spike ratio; any
/// one breach is enough to flag drift (§4.9: "reasons derived from
/// configurable policy parameters").
pub fn compute_drift(baseline: &MetricsEnvelope, observed: &MetricsEnvelope, policy: &DriftPolicy) -> DriftReport {
    let mut reasons = Vec::new();
    let mut worst = 0.0_f64;

    check(
        observed.latency_p50_ms,
        baseline.latency_p50_ms,
        policy.rollback_latency_spike_ratio,
        "rollback_latency_spike",
        &mut reasons,
        &mut worst,
    );
    check(
        observed.cost_units,
        baseline.cost_units,
        policy.rollback_cost_spike_ratio,
        "rollback_cost_spike",
        &mut reasons,
        &mut worst,
    );
    check(
        observed.error_rate,
        baseline.error_rate,
        policy.rollback_error_spike_ratio,
        "rollback_error_spike",
        &mut reasons,
        &mut worst,
    );

    DriftReport { drift_score: worst, reasons }
}

fn check(observed: f64, baseline: f64, threshold: f64, reason: &str, reasons: &mut Vec<String>, worst: &mut f64) {
    let ratio = safe_ratio(observed, baseline);
    if ratio >= threshold {
        reasons.push(reason.to_string());
        *worst = worst.max(ratio);
    }
}

fn safe_ratio(observed: f64, baseline: f64) -> f64 {
    if baseline.abs() < f64::EPSILON {
        if observed.abs() < f64::EPSILON {
            1.0
        } else {
            f64::INFINITY
        }
    } else {
        observed / baseline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> DriftPolicy {
        DriftPolicy {
            rollback_latency_spike_ratio: 2.0,
            rollback_cost_spike_ratio: 2.0,
            rollback_error_spike_ratio: 2.0,
        }
    }

    #[test]
    fn latency_spike_is_flagged() {
        let baseline = MetricsEnvelope { latency_p50_ms: 100.0, ..Default::default() };
        let observed = MetricsEnvelope { latency_p50_ms: 250.0, ..Default::default() };
        let report = compute_drift(&baseline, &observed, &policy());
        assert!(report.exceeded());
        assert!(report.reasons.contains(&"rollback_latency_spike".to_string()));
    }

    #[test]
    fn within_policy_is_clean() {
        let baseline =
            MetricsEnvelope { latency_p50_ms: 100.0, cost_units: 10.0, error_rate: 0.01, ..Default::default() };
        let observed =
            MetricsEnvelope { latency_p50_ms: 110.0, cost_units: 11.0, error_rate: 0.011, ..Default::default() };
        let report = compute_drift(&baseline, &observed, &policy());
        assert!(!report.exceeded());
    }
}
