//! Commit the result of a canary window that showed no drift (spec §4.9 step 5).

use std::collections::BTreeMap;

use gov_core::value::KnobValue;
use gov_core::{CycleId, GovError, GovResult, Hash32, KnobName, MetricsEnvelope, ModuleId};
use gov_ledger::{EntryType, LedgerWriter};
use gov_optimizer::PortfolioTuningIr;
use gov_stats::{EffectKey, EffectsStore, StabilizationStore};
use serde::Serialize;

#[derive(Serialize)]
struct AppliedPayload<'a> {
    target: &'a ModuleId,
    assignments: &'a BTreeMap<KnobName, KnobValue>,
    ir_hash: &'a Hash32,
}

/// Ledger `tuning_ir_applied` per item, a `StabilizationStore` bump, and a
/// Welford `effect_recorded` sample per knob: the observed delta against
/// the pre-apply baseline, in the same scalar dimension the Portfolio
/// Optimizer reads back as a candidate's `mean` (§4.8 step 1).
pub fn commit(
    portfolio: &PortfolioTuningIr,
    baseline_metrics: &MetricsEnvelope,
    observed_metrics: &MetricsEnvelope,
    baseline_signature: &Hash32,
    current_cycle: CycleId,
    stabilization: &mut StabilizationStore,
    effects: &mut EffectsStore,
    ledger: &mut LedgerWriter,
    ts: i64,
) -> GovResult<()> {
    let delta = observed_metrics.delta(baseline_metrics);
    tracing::debug!(portfolio_hash = %portfolio.portfolio_hash, delta_latency = delta.delta_latency, "committing canary cycle");

    for item in &portfolio.items {
        let payload =
            AppliedPayload { target: &item.target, assignments: &item.assignments, ir_hash: &item.provenance.ir_hash };
        ledger.append(EntryType::TuningIrApplied, to_value(&payload)?, ts)?;

        for (knob, value) in &item.assignments {
            stabilization.record_change(&item.target, knob, current_cycle);
            let key = EffectKey::new(item.target.clone(), knob.clone(), value.clone(), baseline_signature.clone());
            effects.record(&key, delta.delta_latency);

            let effect_payload = serde_json::json!({
                "target": item.target.as_str(),
                "knob": knob.as_str(),
                "observed": delta.delta_latency,
            });
            ledger.append(EntryType::EffectRecorded, effect_payload, ts)?;
        }
    }

    Ok(())
}

fn to_value<T: Serialize>(v: &T) -> GovResult<serde_json::Value> {
    serde_json::to_value(v).map_err(|e| GovError::SerializationFail(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gov_ledger::LedgerHandle;
    use gov_optimizer::portfolio::{PortfolioCounts, PortfolioNotes};
    use gov_tuning::ir::{Provenance, TuningIr, TuningMode};
    use tempfile::tempdir;

    #[test]
    fn commit_bumps_stabilization_and_records_effect() {
        let dir = tempdir().unwrap();
        let ledger_path = dir.path().join("ledger.jsonl");
        let mut ledger = match LedgerWriter::open(&ledger_path).unwrap() {
            LedgerHandle::Writable(w) => w,
            _ => unreachable!(),
        };

        let module: ModuleId = "m1".parse().unwrap();
        let knob: KnobName = "batch".parse().unwrap();
        let mut ir = TuningIr {
            target: module.clone(),
            assignments: BTreeMap::from([(knob.clone(), KnobValue::Int(4))]),
            mode: TuningMode::AppliedTune,
            provenance: Provenance {
                ir_hash: Hash32::from_trusted_hex("0".repeat(64)),
                source_cycle_id: CycleId(1),
                reason_tags: vec![],
                evidence_bundle_hash: None,
            },
        };
        ir.provenance.ir_hash = ir.recompute_ir_hash().unwrap();
        let portfolio = PortfolioTuningIr {
            schema_version: "1".into(),
            portfolio_hash: Hash32::from_trusted_hex("a".repeat(64)),
            source_cycle_id: CycleId(1),
            policy: "greedy_budget_v1".into(),
            items: vec![ir],
            notes: PortfolioNotes {
                optimizer_version: "v0.6".into(),
                counts: PortfolioCounts { candidates_total: 1, selected: 1, promotion_biased: 0, promoted_default_applied: 0 },
            },
        };

        let baseline = MetricsEnvelope { latency_p95_ms: 100.0, ..Default::default() };
        let observed = MetricsEnvelope { latency_p95_ms: 88.0, ..Default::default() };
        let baseline_signature = Hash32::from_trusted_hex("b".repeat(64));

        let mut stabilization = StabilizationStore::new();
        let mut effects = EffectsStore::new();

        commit(
            &portfolio,
            &baseline,
            &observed,
            &baseline_signature,
            CycleId(2),
            &mut stabilization,
            &mut effects,
            &mut ledger,
            1000,
        )
        .unwrap();

        assert!(stabilization.get(&module, &knob).is_some());
        let key = EffectKey::new(module, knob, KnobValue::Int(4), baseline_signature);
        assert_eq!(effects.get(&key).n, 1);
        assert!((effects.mean(&key) - (-12.0)).abs() < 1e-9);

        let reader = gov_ledger::LedgerReader::new(&ledger_path);
        assert_eq!(reader.entries_of_type("tuning_ir_applied").unwrap().len(), 1);
        assert_eq!(reader.entries_of_type("effect_recorded").unwrap().len(), 1);
    }
}
