//! The six-rule proposal validator (spec §4.7). Collects every violation
//! rather than bailing on the first, so the Canary Engine's validate-all
//! step (§4.9 step 1) can reject a whole bundle with a complete diagnostic.

use gov_core::value::KnobValue;
use gov_core::{CycleId, GovResult, KnobName, ModuleId};
use gov_capability::CapabilitySet;
use gov_stats::{StabilizationPolicy, StabilizationStore};
use gov_topology::EvidenceBundle;
use serde::{Deserialize, Serialize};

use crate::envelope::TuningEnvelope;
use crate::ir::{TuningIr, TuningMode};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: String,
    pub detail: String,
    pub knob: Option<KnobName>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }

    fn push(&mut self, code: &str, detail: String, knob: Option<KnobName>) {
        self.issues.push(ValidationIssue { code: code.into(), detail, knob });
    }
}

/// Resolves a (module, knob) to its promotion-declared value, if any.
/// Implemented by `gov_optimizer::PromotionPolicy` — kept as a trait here
/// so this crate doesn't depend upward on the optimizer layer.
pub trait PromotionLookup {
    fn promoted_value(&self, module: &ModuleId, knob: &KnobName) -> Option<KnobValue>;
}

/// `promotion_policy` may be omitted (e.g. a dry-run shadow check); every
/// rule except the promoted-value cross-check still applies.
pub fn validate(
    ir: &TuningIr,
    envelope: &TuningEnvelope,
    caps: &CapabilitySet,
    stabilization: &StabilizationStore,
    current_cycle: CycleId,
    promotion_policy: Option<&dyn PromotionLookup>,
    resolved_evidence_bundle: Option<&EvidenceBundle>,
) -> GovResult<ValidationReport> {
    let mut report = ValidationReport::default();

    for (knob, value) in &ir.assignments {
        let Some(spec) = envelope.spec(knob) else {
            report.push("unknown_knob", format!("{knob} not declared in envelope"), Some(knob.clone()));
            continue;
        };

        if let Err(e) = spec.bounds.contains(value) {
            report.push("bounds_violation", e.to_string(), Some(knob.clone()));
        }

        if !spec.hot_apply && ir.mode != TuningMode::ShadowTune {
            report.push(
                "hot_apply_required",
                format!("{knob} is not hot_apply and mode is not shadow_tune"),
                Some(knob.clone()),
            );
        }

        if !capability_set_contains(caps, &spec.capability_required) {
            report.push(
                "capability_missing",
                format!("{knob} requires capability {}", spec.capability_required),
                Some(knob.clone()),
            );
        }

        if ir.mode == TuningMode::AppliedTune {
            let policy = StabilizationPolicy { stabilization_cycles: spec.stabilization_cycles };
            if !stabilization.is_eligible(&ir.target, knob, current_cycle, &policy) {
                report.push(
                    "stabilization_blocked",
                    format!("{knob} is still stabilizing"),
                    Some(knob.clone()),
                );
            }
        }

        if ir.mode == TuningMode::PromotedTune {
            if let Some(policy) = promotion_policy {
                if let Some(promoted) = policy.promoted_value(&ir.target, knob) {
                    if &promoted != value {
                        report.push(
                            "promoted_value_mismatch",
                            format!("{knob} assigned value does not match promoted value"),
                            Some(knob.clone()),
                        );
                    }
                }
            }
        }
    }

    if ir.mode == TuningMode::PromotedTune {
        match (&ir.provenance.evidence_bundle_hash, resolved_evidence_bundle) {
            (None, _) => report.push(
                "evidence_missing",
                "promoted_tune requires an evidence_bundle_hash".into(),
                None,
            ),
            (Some(_), None) => report.push(
                "evidence_missing",
                "evidence_bundle_hash did not resolve to a loaded bundle".into(),
                None,
            ),
            (Some(_), Some(bundle)) => {
                let covers_any = ir
                    .assignments
                    .keys()
                    .any(|knob| bundle.covers(&ir.target, knob));
                if !covers_any {
                    report.push(
                        "evidence_missing",
                        "evidence bundle does not cover any assigned knob for this module".into(),
                        None,
                    );
                }
            }
        }
    }

    let recomputed = ir.recompute_ir_hash()?;
    if recomputed.as_hex() != ir.provenance.ir_hash.as_hex() {
        report.push(
            "ir_hash_mismatch",
            format!("expected {} got {}", ir.provenance.ir_hash.as_hex(), recomputed.as_hex()),
            None,
        );
    }

    Ok(report)
}

fn capability_set_contains(caps: &CapabilitySet, required: &gov_core::CapToken) -> bool {
    caps.contains(required)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gov_core::value::Bounds;
    use std::collections::BTreeMap;

    fn envelope_with_batch() -> TuningEnvelope {
        let mut knobs = BTreeMap::new();
        knobs.insert(
            "batch".parse().unwrap(),
            crate::envelope::KnobSpec {
                bounds: Bounds::Int { min: 1, max: 8 },
                hot_apply: true,
                stabilization_cycles: 3,
                capability_required: "exec".parse().unwrap(),
            },
        );
        TuningEnvelope { knobs }
    }

    fn base_ir(mode: TuningMode, value: i64) -> TuningIr {
        let mut ir = TuningIr {
            target: "m1".parse().unwrap(),
            assignments: BTreeMap::from([("batch".parse().unwrap(), KnobValue::Int(value))]),
            mode,
            provenance: crate::ir::Provenance {
                ir_hash: gov_core::Hash32::from_trusted_hex("0".repeat(64)),
                source_cycle_id: CycleId(1),
                reason_tags: vec![],
                evidence_bundle_hash: None,
            },
        };
        ir.provenance.ir_hash = ir.recompute_ir_hash().unwrap();
        ir
    }

    #[test]
    fn missing_capability_is_reported() {
        let ir = base_ir(TuningMode::ShadowTune, 4);
        let envelope = envelope_with_batch();
        let caps = CapabilitySet::new();
        let stabilization = StabilizationStore::new();
        let report =
            validate(&ir, &envelope, &caps, &stabilization, CycleId(1), None, None).unwrap();
        assert!(report.issues.iter().any(|i| i.code == "capability_missing"));
    }

    #[test]
    fn bounds_violation_is_reported() {
        let ir = base_ir(TuningMode::ShadowTune, 99);
        let envelope = envelope_with_batch();
        let mut caps = CapabilitySet::new();
        caps.grant("exec");
        let stabilization = StabilizationStore::new();
        let report =
            validate(&ir, &envelope, &caps, &stabilization, CycleId(1), None, None).unwrap();
        assert!(report.issues.iter().any(|i| i.code == "bounds_violation"));
    }

    #[test]
    fn clean_shadow_tune_passes() {
        let ir = base_ir(TuningMode::ShadowTune, 4);
        let envelope = envelope_with_batch();
        let mut caps = CapabilitySet::new();
        caps.grant("exec");
        let stabilization = StabilizationStore::new();
        let report =
            validate(&ir, &envelope, &caps, &stabilization, CycleId(1), None, None).unwrap();
        assert!(report.is_ok());
    }

    #[test]
    fn promoted_tune_without_evidence_hash_is_rejected() {
        let ir = base_ir(TuningMode::PromotedTune, 4);
        let envelope = envelope_with_batch();
        let mut caps = CapabilitySet::new();
        caps.grant("exec");
        let stabilization = StabilizationStore::new();
        let report =
            validate(&ir, &envelope, &caps, &stabilization, CycleId(1), None, None).unwrap();
        assert!(report.issues.iter().any(|i| i.code == "evidence_missing"));
    }
}
