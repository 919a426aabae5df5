//! Evidence bundles: the artifact a `promoted_tune` TuningIR must reference
//! (spec §4.7 rule 5) and that a shadow→forecast bridge must resolve at
//! `plan_execution_dag` time (spec §4.3). Not named as a type in `spec.md`
//! itself — made concrete here because both call sites need it.

use std::path::Path;

use gov_core::{GovError, GovResult, Hash32, KnobName, ModuleId};
use gov_io::canon::hash_canonical;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvidenceClaim {
    pub module: ModuleId,
    pub knob: KnobName,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvidenceBundle {
    pub sources: Vec<String>,
    pub claims: Vec<EvidenceClaim>,
    pub bridges: Vec<String>,
    pub calibration_refs: Vec<String>,
}

impl EvidenceBundle {
    /// `true` iff this bundle's claims cover `(module, knob)` and it
    /// carries at least one calibration reference — the exact condition
    /// `gov_tuning`'s validator checks for `promoted_tune` (spec §4.7.5).
    pub fn covers(&self, module: &ModuleId, knob: &KnobName) -> bool {
        !self.calibration_refs.is_empty()
            && self.claims.iter().any(|c| &c.module == module && &c.knob == knob)
    }

    pub fn content_hash(&self) -> GovResult<Hash32> {
        hash_canonical(self).map_err(Into::into)
    }
}

/// Load a bundle from disk and verify it against an expected content hash
/// (the value a `RuneLink.required_evidence_ports` entry or a TuningIR's
/// `evidence_bundle_hash` names).
pub fn load_and_verify(path: &Path, expected_hash: &Hash32) -> GovResult<EvidenceBundle> {
    let bytes = std::fs::read(path).map_err(|e| GovError::EvidenceMissing(e.to_string()))?;
    let bundle: EvidenceBundle = serde_json::from_slice(&bytes)
        .map_err(|e| GovError::ValidationError { subkind: "bundle_parse".into(), detail: e.to_string() })?;
    let actual = bundle.content_hash()?;
    if actual.as_hex() != expected_hash.as_hex() {
        return Err(GovError::EvidenceHashMismatch {
            expected: expected_hash.as_hex().to_string(),
            actual: actual.as_hex().to_string(),
        });
    }
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_requires_claim_and_calibration() {
        let bundle = EvidenceBundle {
            sources: vec![],
            claims: vec![EvidenceClaim { module: "m1".parse().unwrap(), knob: "k1".parse().unwrap() }],
            bridges: vec![],
            calibration_refs: vec!["cal1".into()],
        };
        assert!(bundle.covers(&"m1".parse().unwrap(), &"k1".parse().unwrap()));
        assert!(!bundle.covers(&"m2".parse().unwrap(), &"k1".parse().unwrap()));
    }

    #[test]
    fn covers_fails_without_calibration_refs() {
        let bundle = EvidenceBundle {
            sources: vec![],
            claims: vec![EvidenceClaim { module: "m1".parse().unwrap(), knob: "k1".parse().unwrap() }],
            bridges: vec![],
            calibration_refs: vec![],
        };
        assert!(!bundle.covers(&"m1".parse().unwrap(), &"k1".parse().unwrap()));
    }
}
