//! The tuning proposal itself: a content-addressed, typed bundle of knob
//! assignments for one module (spec §3 `TuningIR`).

use std::collections::BTreeMap;

use gov_core::value::KnobValue;
use gov_core::{CycleId, GovResult, Hash32, KnobName, ModuleId};
use gov_io::canon::hash_canonical;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TuningMode {
    ShadowTune,
    AppliedTune,
    PromotedTune,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Provenance {
    pub ir_hash: Hash32,
    pub source_cycle_id: CycleId,
    #[serde(default)]
    pub reason_tags: Vec<String>,
    pub evidence_bundle_hash: Option<Hash32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TuningIr {
    pub target: ModuleId,
    pub assignments: BTreeMap<KnobName, KnobValue>,
    pub mode: TuningMode,
    pub provenance: Provenance,
}

#[derive(Serialize)]
struct IrForHash<'a> {
    target: &'a ModuleId,
    assignments: &'a BTreeMap<KnobName, KnobValue>,
    mode: TuningMode,
}

impl TuningIr {
    /// `ir_hash = hash(canonical(TuningIR with provenance blanked))`.
    pub fn recompute_ir_hash(&self) -> GovResult<Hash32> {
        let for_hash = IrForHash { target: &self.target, assignments: &self.assignments, mode: self.mode };
        hash_canonical(&for_hash).map_err(Into::into)
    }

    /// `mode == promoted_tune ⇒ evidence_bundle_hash.is_some()`.
    pub fn satisfies_promotion_evidence_invariant(&self) -> bool {
        self.mode != TuningMode::PromotedTune || self.provenance.evidence_bundle_hash.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ir_hash_is_stable_across_provenance_changes() {
        let mut ir = TuningIr {
            target: "m1".parse().unwrap(),
            assignments: BTreeMap::from([("batch".parse().unwrap(), KnobValue::Int(4))]),
            mode: TuningMode::AppliedTune,
            provenance: Provenance {
                ir_hash: Hash32::from_trusted_hex("0".repeat(64)),
                source_cycle_id: CycleId(1),
                reason_tags: vec![],
                evidence_bundle_hash: None,
            },
        };
        let h1 = ir.recompute_ir_hash().unwrap();
        ir.provenance.source_cycle_id = CycleId(99);
        ir.provenance.reason_tags.push("extra".into());
        let h2 = ir.recompute_ir_hash().unwrap();
        assert_eq!(h1.as_hex(), h2.as_hex());
    }

    #[test]
    fn promoted_tune_requires_evidence_bundle_hash() {
        let ir = TuningIr {
            target: "m1".parse().unwrap(),
            assignments: BTreeMap::new(),
            mode: TuningMode::PromotedTune,
            provenance: Provenance {
                ir_hash: Hash32::from_trusted_hex("0".repeat(64)),
                source_cycle_id: CycleId(1),
                reason_tags: vec![],
                evidence_bundle_hash: None,
            },
        };
        assert!(!ir.satisfies_promotion_evidence_invariant());
    }
}
