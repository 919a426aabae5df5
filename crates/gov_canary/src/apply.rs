//! Validate-all, then atomic apply with snapshot/rewind (spec §4.9 steps 1-2).

use std::collections::BTreeMap;

use gov_capability::CapabilitySet;
use gov_core::value::KnobValue;
use gov_core::{CycleId, GovError, GovResult, Hash32, KnobName, ModuleId};
use gov_ledger::{EntryType, LedgerWriter};
use gov_optimizer::PortfolioTuningIr;
use gov_stats::StabilizationStore;
use gov_topology::EvidenceBundle;
use gov_tuning::validate::{validate, PromotionLookup, ValidationIssue};
use gov_tuning::{TuningEnvelope, TuningMode};
use serde::Serialize;

use crate::sink::KnobSink;

/// Per-module inputs the validator and the write step need.
pub struct ModuleContext<'a> {
    pub envelope: &'a TuningEnvelope,
    pub capabilities: &'a CapabilitySet,
}

#[derive(Clone, Debug)]
pub struct SnapshotEntry {
    pub module: ModuleId,
    pub knob: KnobName,
    pub prior: Option<KnobValue>,
}

/// Prior knob values in the same `(module, knob)` order the writes
/// happened in, so rollback can walk it in reverse (spec §5).
#[derive(Clone, Debug, Default)]
pub struct ApplySnapshot(pub Vec<SnapshotEntry>);

pub enum ApplyOutcome {
    Applied { snapshot: ApplySnapshot },
    Rejected { issues: Vec<ValidationIssue> },
}

#[derive(Serialize)]
struct RejectedPayload<'a> {
    portfolio_hash: &'a Hash32,
    issues: &'a [ValidationIssue],
}

/// Validate every item first. If any item fails any rule, the whole bundle
/// is rejected — one `tuning_ir_rejected` entry, no knob touched. Otherwise
/// every `applied_tune`/`promoted_tune` item's assignments are written in
/// stable `(module, knob)` order; a write failure partway through rewinds
/// everything already written from the snapshot before the error is
/// returned. `shadow_tune` items are validated above like any other item
/// but never reach the sink — a shadow tune previews a portfolio with no
/// side effect.
///
/// Emitting `tuning_ir_applied` is deliberately NOT done here: spec step 5
/// only commits it once the canary window shows no drift (`commit::commit`).
pub fn validate_and_apply(
    portfolio: &PortfolioTuningIr,
    modules: &BTreeMap<ModuleId, ModuleContext>,
    stabilization: &StabilizationStore,
    promotion: Option<&dyn PromotionLookup>,
    evidence_bundles: &BTreeMap<Hash32, EvidenceBundle>,
    current_cycle: CycleId,
    sink: &mut dyn KnobSink,
    ledger: &mut LedgerWriter,
    ts: i64,
) -> GovResult<ApplyOutcome> {
    let mut all_issues = Vec::new();

    for item in &portfolio.items {
        let Some(ctx) = modules.get(&item.target) else {
            all_issues.push(ValidationIssue {
                code: "unknown_module".into(),
                detail: format!("{} is not in the registry", item.target),
                knob: None,
            });
            continue;
        };
        let bundle = item
            .provenance
            .evidence_bundle_hash
            .as_ref()
            .and_then(|h| evidence_bundles.get(h));
        let report = validate(
            item,
            ctx.envelope,
            ctx.capabilities,
            stabilization,
            current_cycle,
            promotion,
            bundle,
        )?;
        all_issues.extend(report.issues);
    }

    if !all_issues.is_empty() {
        tracing::warn!(portfolio_hash = %portfolio.portfolio_hash, issues = all_issues.len(), "tuning ir bundle rejected");
        let payload = RejectedPayload { portfolio_hash: &portfolio.portfolio_hash, issues: &all_issues };
        ledger.append(EntryType::TuningIrRejected, to_value(&payload)?, ts)?;
        return Ok(ApplyOutcome::Rejected { issues: all_issues });
    }

    let mut ordered: Vec<(ModuleId, KnobName, KnobValue)> = Vec::new();
    for item in &portfolio.items {
        if item.mode == TuningMode::ShadowTune {
            continue;
        }
        for (knob, value) in &item.assignments {
            ordered.push((item.target.clone(), knob.clone(), value.clone()));
        }
    }
    ordered.sort_by(|a, b| (a.0.as_str(), a.1.as_str()).cmp(&(b.0.as_str(), b.1.as_str())));

    let mut snapshot = ApplySnapshot::default();
    for (module, knob, value) in &ordered {
        let prior = sink.read(module, knob);
        match sink.write(module, knob, value) {
            Ok(()) => snapshot.0.push(SnapshotEntry { module: module.clone(), knob: knob.clone(), prior }),
            Err(e) => {
                rewind(&snapshot, sink);
                return Err(e);
            }
        }
    }

    tracing::debug!(portfolio_hash = %portfolio.portfolio_hash, writes = snapshot.0.len(), "tuning ir bundle applied");
    Ok(ApplyOutcome::Applied { snapshot })
}

/// Best-effort restore of every already-written entry, in reverse order.
/// This runs mid-failure; a partial rewind is strictly better than leaving
/// every already-applied write in place.
fn rewind(snapshot: &ApplySnapshot, sink: &mut dyn KnobSink) {
    for entry in snapshot.0.iter().rev() {
        let _ = match &entry.prior {
            Some(v) => sink.write(&entry.module, &entry.knob, v),
            None => sink.clear(&entry.module, &entry.knob),
        };
    }
}

fn to_value<T: Serialize>(v: &T) -> GovResult<serde_json::Value> {
    serde_json::to_value(v).map_err(|e| GovError::SerializationFail(e.to_string()))
}
