//! A single proposed knob change and the metric deltas it's predicted (from
//! measured effects) to produce.

use gov_core::value::KnobValue;
use gov_core::{KnobName, ModuleId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ImpactVector {
    pub delta_latency: f64,
    pub delta_cost: f64,
    pub delta_error: f64,
    pub delta_throughput: f64,
}

#[derive(Clone, Copy, Debug)]
pub struct ObjectiveWeights {
    pub w_latency: f64,
    pub w_cost: f64,
    pub w_error: f64,
    pub w_throughput: f64,
}

impl ObjectiveWeights {
    /// `score = -(w_latency*Δlatency + w_cost*Δcost + w_error*Δerror) + w_throughput*Δthroughput`.
    /// Higher is better: minimizing cost/latency/error regrets, maximizing throughput gain.
    pub fn score(&self, impact: &ImpactVector) -> f64 {
        -(self.w_latency * impact.delta_latency
            + self.w_cost * impact.delta_cost
            + self.w_error * impact.delta_error)
            + self.w_throughput * impact.delta_throughput
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Candidate {
    pub node_id: ModuleId,
    pub knob: KnobName,
    pub proposed_value: KnobValue,
    pub impact: ImpactVector,
    pub reason_tags: Vec<String>,
    pub score: f64,
    pub n_samples: u64,
    pub stderr: f64,
}
