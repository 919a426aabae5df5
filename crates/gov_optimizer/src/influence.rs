//! The promotion influence report: a descriptive, shadow-only summary of
//! how promotion bias behaved this cycle (spec §4.10).
//!
//! Architectural barrier: this type is never accepted as an input anywhere
//! in `gov_optimizer::portfolio::optimize` or any other optimizer entry
//! point — there is no constructor path from a report back into a
//! candidate, registry snapshot, or effects record. The only consumer is
//! the ledger (`promotion_influence_reported`); feeding it back into
//! `optimize` on a later cycle would require a new parameter that does not
//! exist on that function's signature.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct PromotionLift {
    pub mean_promoted: f64,
    pub mean_unpromoted: f64,
    pub delta: f64,
    pub n_promoted: u64,
    pub n_unpromoted: u64,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct InfluenceReport {
    pub candidates_total: u64,
    pub promotion_biased: u64,
    pub selected_with_promotion: u64,
    pub dormant_promotions: u64,
    pub rollback_rate_promoted: f64,
    pub rollback_rate_unpromoted: f64,
    pub promotion_lift: PromotionLift,
}

/// Inputs are plain counters gathered by the orchestrator from this
/// cycle's candidate set, selection, and a recent ledger window — never
/// from `optimize`'s own return value fed forward.
pub struct InfluenceInputs {
    pub candidates_total: u64,
    pub promotion_biased: u64,
    pub selected_with_promotion: u64,
    pub dormant_promotions: u64,
    pub rollbacks_promoted: u64,
    pub applies_promoted: u64,
    pub rollbacks_unpromoted: u64,
    pub applies_unpromoted: u64,
    pub promoted_samples: Vec<f64>,
    pub unpromoted_samples: Vec<f64>,
}

pub fn compute_influence_report(inputs: &InfluenceInputs) -> InfluenceReport {
    let rate = |rollbacks: u64, applies: u64| {
        let total = rollbacks + applies;
        if total == 0 { 0.0 } else { rollbacks as f64 / total as f64 }
    };

    let mean = |samples: &[f64]| {
        if samples.is_empty() { 0.0 } else { samples.iter().sum::<f64>() / samples.len() as f64 }
    };

    let mean_promoted = mean(&inputs.promoted_samples);
    let mean_unpromoted = mean(&inputs.unpromoted_samples);

    InfluenceReport {
        candidates_total: inputs.candidates_total,
        promotion_biased: inputs.promotion_biased,
        selected_with_promotion: inputs.selected_with_promotion,
        dormant_promotions: inputs.dormant_promotions,
        rollback_rate_promoted: rate(inputs.rollbacks_promoted, inputs.applies_promoted),
        rollback_rate_unpromoted: rate(inputs.rollbacks_unpromoted, inputs.applies_unpromoted),
        promotion_lift: PromotionLift {
            mean_promoted,
            mean_unpromoted,
            delta: mean_promoted - mean_unpromoted,
            n_promoted: inputs.promoted_samples.len() as u64,
            n_unpromoted: inputs.unpromoted_samples.len() as u64,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lift_delta_is_descriptive_not_causal() {
        let inputs = InfluenceInputs {
            candidates_total: 10,
            promotion_biased: 2,
            selected_with_promotion: 3,
            dormant_promotions: 1,
            rollbacks_promoted: 1,
            applies_promoted: 9,
            rollbacks_unpromoted: 2,
            applies_unpromoted: 8,
            promoted_samples: vec![-10.0, -12.0],
            unpromoted_samples: vec![-5.0],
        };
        let report = compute_influence_report(&inputs);
        assert!((report.promotion_lift.delta - (-11.0 - -5.0)).abs() < 1e-9);
        assert!(report.rollback_rate_promoted < report.rollback_rate_unpromoted);
    }
}
