//! The metrics snapshot shape every component above the leaf layer reads:
//! the optimizer scores against it, the canary engine diffs against it for
//! drift, the orchestrator carries it between cycle states (spec §3
//! `MetricsEnvelope`).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricsEnvelope {
    pub latency_p50_ms: f64,
    pub latency_p95_ms: f64,
    pub cost_units: f64,
    pub throughput: f64,
    pub error_rate: f64,
    pub drift_score: Option<f64>,
    pub entropy_proxy: Option<f64>,
}

impl MetricsEnvelope {
    /// Elementwise delta against a baseline, in the direction "observed
    /// minus baseline" — positive means the metric got worse for
    /// latency/cost/error, better for throughput. Callers multiply by
    /// `ObjectiveWeights` signs accordingly.
    pub fn delta(&self, baseline: &MetricsEnvelope) -> MetricsDelta {
        MetricsDelta {
            delta_latency: self.latency_p95_ms - baseline.latency_p95_ms,
            delta_cost: self.cost_units - baseline.cost_units,
            delta_error: self.error_rate - baseline.error_rate,
            delta_throughput: self.throughput - baseline.throughput,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct MetricsDelta {
    pub delta_latency: f64,
    pub delta_cost: f64,
    pub delta_error: f64,
    pub delta_throughput: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_observed_minus_baseline() {
        let baseline = MetricsEnvelope { latency_p95_ms: 100.0, ..Default::default() };
        let observed = MetricsEnvelope { latency_p95_ms: 90.0, ..Default::default() };
        assert_eq!(observed.delta(&baseline).delta_latency, -10.0);
    }
}
