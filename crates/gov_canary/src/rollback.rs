//! Rollback: restore the pre-apply snapshot and record why (spec §4.9 step 4).

use gov_core::{CycleId, GovError, GovResult, Hash32, KnobName, ModuleId};
use gov_ledger::{EntryType, LedgerWriter};
use gov_optimizer::PortfolioTuningIr;
use serde::Serialize;

use crate::apply::ApplySnapshot;
use crate::sink::KnobSink;

#[derive(Serialize)]
struct RolledBackItem<'a> {
    target: &'a ModuleId,
    knobs: Vec<&'a KnobName>,
}

#[derive(Serialize)]
struct RolledBackPayload<'a> {
    portfolio_hash: &'a Hash32,
    cycle_id: CycleId,
    reasons: &'a [String],
    items: Vec<RolledBackItem<'a>>,
}

#[derive(Serialize)]
struct RollbackAttributedPayload<'a> {
    target: &'a ModuleId,
    knob: &'a KnobName,
    promoted: bool,
}

/// Restores every snapshot entry in reverse order, then appends one
/// `tuning_ir_rolled_back` entry for the whole bundle plus a
/// `rollback_attributed` entry per knob — the latter is what the Promotion
/// Influence Reporter's `rollback_rate_promoted`/`rollback_rate_unpromoted`
/// split reads back from a ledger window (spec §4.10).
pub fn rollback(
    portfolio: &PortfolioTuningIr,
    snapshot: &ApplySnapshot,
    reasons: &[String],
    current_cycle: CycleId,
    sink: &mut dyn KnobSink,
    ledger: &mut LedgerWriter,
    ts: i64,
) -> GovResult<()> {
    for entry in snapshot.0.iter().rev() {
        match &entry.prior {
            Some(v) => sink.write(&entry.module, &entry.knob, v)?,
            None => sink.clear(&entry.module, &entry.knob)?,
        }
    }

    let items: Vec<RolledBackItem> = portfolio
        .items
        .iter()
        .map(|item| RolledBackItem { target: &item.target, knobs: item.assignments.keys().collect() })
        .collect();
    tracing::warn!(portfolio_hash = %portfolio.portfolio_hash, reasons = ?reasons, "tuning ir rolled back");
    let payload =
        RolledBackPayload { portfolio_hash: &portfolio.portfolio_hash, cycle_id: current_cycle, reasons, items };
    ledger.append(EntryType::TuningIrRolledBack, to_value(&payload)?, ts)?;

    for item in &portfolio.items {
        let promoted = item.provenance.reason_tags.iter().any(|t| t == "promotion_biased");
        for knob in item.assignments.keys() {
            let attributed = RollbackAttributedPayload { target: &item.target, knob, promoted };
            ledger.append(EntryType::RollbackAttributed, to_value(&attributed)?, ts)?;
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
    use crate::apply::SnapshotEntry;
    use crate::sink::InMemoryKnobSink;
    use gov_core::value::KnobValue;
    use gov_ledger::LedgerHandle;
    use gov_optimizer::portfolio::{PortfolioCounts, PortfolioNotes};
    use gov_tuning::ir::{Provenance, TuningIr, TuningMode};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[test]
    fn rollback_restores_prior_value_and_records_attribution() {
        let dir = tempdir().unwrap();
        let ledger_path = dir.path().join("ledger.jsonl");
        let mut ledger = match LedgerWriter::open(&ledger_path).unwrap() {
            LedgerHandle::Writable(w) => w,
            _ => unreachable!(),
        };

        let mut sink = InMemoryKnobSink::new();
        let module: ModuleId = "m1".parse().unwrap();
        let knob: KnobName = "batch".parse().unwrap();
        sink.write(&module, &knob, &KnobValue::Int(4)).unwrap();

        let snapshot = ApplySnapshot(vec![SnapshotEntry {
            module: module.clone(),
            knob: knob.clone(),
            prior: Some(KnobValue::Int(2)),
        }]);

        let mut ir = TuningIr {
            target: module.clone(),
            assignments: BTreeMap::from([(knob.clone(), KnobValue::Int(4))]),
            mode: TuningMode::AppliedTune,
            provenance: Provenance {
                ir_hash: Hash32::from_trusted_hex("0".repeat(64)),
                source_cycle_id: CycleId(1),
                reason_tags: vec!["promotion_biased".into()],
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
                counts: PortfolioCounts { candidates_total: 1, selected: 1, promotion_biased: 1, promoted_default_applied: 0 },
            },
        };

        rollback(
            &portfolio,
            &snapshot,
            &["rollback_latency_spike".to_string()],
            CycleId(2),
            &mut sink,
            &mut ledger,
            1000,
        )
        .unwrap();

        assert_eq!(sink.read(&module, &knob), Some(KnobValue::Int(2)));

        let reader = gov_ledger::LedgerReader::new(&ledger_path);
        assert_eq!(reader.entries_of_type("tuning_ir_rolled_back").unwrap().len(), 1);
        let attributed = reader.entries_of_type("rollback_attributed").unwrap();
        assert_eq!(attributed.len(), 1);
        assert_eq!(attributed[0].payload["promoted"], true);
    }
}
