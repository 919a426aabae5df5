//! Drives one cycle end to end through the `CycleState` machine (spec
//! §4.11), gluing together the optimizer, the canary engine, and the
//! cooldown scanner. Suspension points (overlay invocation, canary
//! observation) are modeled as an explicit `observe` closure rather than
//! `async`, matching the "single-threaded cooperative state machine with
//! explicit suspension" design note.

use std::collections::BTreeMap;
use std::path::Path;

use gov_core::{CycleId, GovResult, Hash32, MetricsEnvelope, ModuleId};
use gov_io::canon::hash_canonical;
use gov_ledger::{EntryType, LedgerReader, LedgerWriter};
use gov_optimizer::portfolio::{self, Budgets, PortfolioCounts, PortfolioNotes, PortfolioTuningIr, RegistryEntry, SignificanceGate};
use gov_optimizer::candidate::ObjectiveWeights;
use gov_optimizer::influence::{compute_influence_report, InfluenceInputs};
use gov_optimizer::promotion::PromotionPolicy;
use gov_stats::{EffectsStore, StabilizationStore};
use gov_topology::EvidenceBundle;
use gov_tuning::ir::TuningIr;
use gov_tuning::validate::ValidationIssue;
use serde::Serialize;

use crate::cancellation::CancellationToken;
use gov_canary::apply::{validate_and_apply, ApplyOutcome, ModuleContext};
use gov_canary::cooldown::{is_cooling_down, CooldownPolicy};
use gov_canary::drift::{compute_drift, DriftPolicy};
use gov_canary::sink::KnobSink;

pub struct CycleConfig {
    pub weights: ObjectiveWeights,
    pub budgets: Budgets,
    pub gate: SignificanceGate,
    pub drift_policy: DriftPolicy,
    pub cooldown_policy: CooldownPolicy,
}

#[derive(Debug)]
pub enum CycleOutcome {
    Cancelled,
    Rejected { issues: Vec<ValidationIssue> },
    Committed { portfolio: PortfolioTuningIr },
    RolledBack { portfolio: PortfolioTuningIr, reasons: Vec<String> },
}

#[derive(Serialize)]
struct RejectedPayload<'a> {
    portfolio_hash: &'a Hash32,
    issues: &'a [ValidationIssue],
}

/// The result of the canary observation window (spec §4.9 step 3):
/// either the observed metrics, or a declaration that the phase timed out
/// (spec §4.11: "Timeout at any state → treat as drift, roll back").
pub enum Observation {
    Metrics(MetricsEnvelope),
    TimedOut,
}

/// Owns nothing; every call borrows its stores for the duration of one
/// cycle. Mirrors §4.11's "dedicated writer task owns the Ledger and the
/// Stabilization/Effects stores" by taking `&mut` rather than cloning.
pub struct CycleDriver<'a> {
    pub ledger: &'a mut LedgerWriter,
    pub ledger_path: &'a Path,
    pub stabilization: &'a mut StabilizationStore,
    pub effects: &'a mut EffectsStore,
    pub sink: &'a mut dyn KnobSink,
}

impl<'a> CycleDriver<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn run_cycle(
        &mut self,
        current_cycle: CycleId,
        registry: &[RegistryEntry],
        modules: &BTreeMap<ModuleId, ModuleContext>,
        promotion: &PromotionPolicy,
        evidence_bundles: &BTreeMap<Hash32, EvidenceBundle>,
        config: &CycleConfig,
        cancel: &CancellationToken,
        baseline_metrics: &MetricsEnvelope,
        baseline_signature: &Hash32,
        observe: impl FnOnce() -> GovResult<Observation>,
        ts: i64,
    ) -> GovResult<CycleOutcome> {
        // IDLE -> COLLECT -> PLAN
        let raw_portfolio = portfolio::optimize(
            registry,
            self.effects,
            self.stabilization,
            promotion,
            config.weights.clone(),
            config.budgets,
            config.gate,
            current_cycle,
        )?;
        tracing::info!(
            portfolio_hash = %raw_portfolio.portfolio_hash,
            candidates_total = raw_portfolio.notes.counts.candidates_total,
            "cycle planned"
        );
        self.ledger.append(
            EntryType::PortfolioSelected,
            to_value(&raw_portfolio.notes)?,
            ts,
        )?;

        let planned = filter_cooldown(raw_portfolio, self.ledger_path, current_cycle, &config.cooldown_policy)?;

        // PLAN -> VALIDATE: cancellation is still honored here.
        if cancel.is_cancelled() {
            let issues = vec![ValidationIssue {
                code: "cancelled".into(),
                detail: "cycle cancelled before APPLY".into(),
                knob: None,
            }];
            let payload = RejectedPayload { portfolio_hash: &planned.portfolio_hash, issues: &issues };
            self.ledger.append(EntryType::TuningIrRejected, to_value(&payload)?, ts)?;
            return Ok(CycleOutcome::Cancelled);
        }

        // VALIDATE -> APPLY
        let outcome = validate_and_apply(
            &planned,
            modules,
            self.stabilization,
            Some(promotion as &dyn gov_tuning::validate::PromotionLookup),
            evidence_bundles,
            current_cycle,
            self.sink,
            self.ledger,
            ts,
        )?;
        let snapshot = match outcome {
            ApplyOutcome::Rejected { issues } => {
                report_promotion_influence(self.ledger, &planned, promotion, InfluenceOutcome::Rejected, ts)?;
                return Ok(CycleOutcome::Rejected { issues });
            }
            ApplyOutcome::Applied { snapshot } => snapshot,
        };

        // APPLY -> OBSERVE: the cycle is no longer cancellable from here.
        let observation = observe()?;

        // OBSERVE -> COMMIT_OR_ROLLBACK -> REPORT
        let (observed_metrics, reasons) = match observation {
            Observation::TimedOut => (baseline_metrics.clone(), vec!["cycle_timeout".to_string()]),
            Observation::Metrics(m) => {
                let drift = compute_drift(baseline_metrics, &m, &config.drift_policy);
                (m, drift.reasons)
            }
        };
        let sample = observed_metrics.delta(baseline_metrics).delta_latency;

        if !reasons.is_empty() {
            gov_canary::rollback(&planned, &snapshot, &reasons, current_cycle, self.sink, self.ledger, ts)?;
            tracing::warn!(reasons = ?reasons, "cycle rolled back");
            report_promotion_influence(self.ledger, &planned, promotion, InfluenceOutcome::RolledBack { sample }, ts)?;
            return Ok(CycleOutcome::RolledBack { portfolio: planned, reasons });
        }

        gov_canary::commit(
            &planned,
            baseline_metrics,
            &observed_metrics,
            baseline_signature,
            current_cycle,
            self.stabilization,
            self.effects,
            self.ledger,
            ts,
        )?;
        tracing::info!(portfolio_hash = %planned.portfolio_hash, "cycle committed");
        report_promotion_influence(self.ledger, &planned, promotion, InfluenceOutcome::Committed { sample }, ts)?;
        Ok(CycleOutcome::Committed { portfolio: planned })
    }
}

/// This cycle's commit/rollback/reject outcome, the only shapes REPORT
/// needs to turn a selection into influence-report sample counts.
enum InfluenceOutcome {
    Committed { sample: f64 },
    RolledBack { sample: f64 },
    Rejected,
}

/// REPORT: appends a `promotion_influence_reported` entry before the cycle
/// returns to IDLE (spec §4.10/§4.11) on every path that reached a
/// selection — rejected, rolled back, or committed. Not called on
/// `Cancelled`: cancellation happens before APPLY, before
/// COMMIT_OR_ROLLBACK is ever reached, so there is nothing to report.
///
/// `rollbacks_*`/`applies_*`/the sample vectors describe *this* cycle only,
/// not a rolling ledger window — consistent with §4.10 framing the report
/// as something emitted once per cycle from this cycle's own selection and
/// outcome, never fed back into the optimizer (`gov_optimizer::influence`'s
/// architectural barrier).
fn report_promotion_influence(
    ledger: &mut LedgerWriter,
    planned: &PortfolioTuningIr,
    promotion: &PromotionPolicy,
    outcome: InfluenceOutcome,
    ts: i64,
) -> GovResult<()> {
    let mut selected_promoted_pairs = std::collections::BTreeSet::new();
    let mut selected_with_promotion = 0u64;
    let mut selected_unpromoted = 0u64;
    for item in &planned.items {
        for knob in item.assignments.keys() {
            if promotion.has_promotion(&item.target, knob) {
                selected_with_promotion += 1;
                selected_promoted_pairs.insert((item.target.clone(), knob.clone()));
            } else {
                selected_unpromoted += 1;
            }
        }
    }
    let dormant_promotions = promotion
        .declared_pairs()
        .filter(|(module, knob)| !selected_promoted_pairs.contains(&((*module).clone(), (*knob).clone())))
        .count() as u64;

    let (rollbacks_promoted, applies_promoted, rollbacks_unpromoted, applies_unpromoted, promoted_samples, unpromoted_samples) =
        match outcome {
            InfluenceOutcome::Committed { sample } => (
                0,
                selected_with_promotion,
                0,
                selected_unpromoted,
                vec![sample; selected_with_promotion as usize],
                vec![sample; selected_unpromoted as usize],
            ),
            InfluenceOutcome::RolledBack { sample } => (
                selected_with_promotion,
                0,
                selected_unpromoted,
                0,
                vec![sample; selected_with_promotion as usize],
                vec![sample; selected_unpromoted as usize],
            ),
            InfluenceOutcome::Rejected => (0, 0, 0, 0, Vec::new(), Vec::new()),
        };

    let inputs = InfluenceInputs {
        candidates_total: planned.notes.counts.candidates_total,
        promotion_biased: planned.notes.counts.promotion_biased,
        selected_with_promotion,
        dormant_promotions,
        rollbacks_promoted,
        applies_promoted,
        rollbacks_unpromoted,
        applies_unpromoted,
        promoted_samples,
        unpromoted_samples,
    };
    let report = compute_influence_report(&inputs);
    ledger.append(EntryType::PromotionInfluenceReported, to_value(&report)?, ts)?;
    Ok(())
}

/// Drops assignments for any `(module, knob)` still cooling down after a
/// prior rollback (spec §4.9 "Cooldown"), recomputing `ir_hash` per item and
/// `portfolio_hash` for the bundle since assignments may have shrunk.
fn filter_cooldown(
    portfolio: PortfolioTuningIr,
    ledger_path: &Path,
    current_cycle: CycleId,
    policy: &CooldownPolicy,
) -> GovResult<PortfolioTuningIr> {
    let reader = LedgerReader::new(ledger_path);
    let PortfolioTuningIr { schema_version, source_cycle_id, policy: policy_name, items, notes, .. } = portfolio;

    let mut filtered = Vec::new();
    for mut item in items {
        let mut assignments = BTreeMap::new();
        for (knob, value) in item.assignments {
            if is_cooling_down(&reader, &item.target, &knob, current_cycle, policy)? {
                tracing::debug!(module = %item.target, knob = %knob, "cooldown excludes knob from this cycle");
                continue;
            }
            assignments.insert(knob, value);
        }
        if assignments.is_empty() {
            continue;
        }
        item.assignments = assignments;
        item.provenance.ir_hash = item.recompute_ir_hash()?;
        filtered.push(item);
    }

    let selected = filtered.len() as u64;
    let portfolio_hash = recompute_portfolio_hash(&filtered, source_cycle_id)?;

    Ok(PortfolioTuningIr {
        schema_version,
        portfolio_hash,
        source_cycle_id,
        policy: policy_name,
        items: filtered,
        notes: PortfolioNotes {
            optimizer_version: notes.optimizer_version,
            counts: PortfolioCounts {
                candidates_total: notes.counts.candidates_total,
                selected,
                promotion_biased: notes.counts.promotion_biased,
                promoted_default_applied: notes.counts.promoted_default_applied,
            },
        },
    })
}

#[derive(Serialize)]
struct PortfolioForHash<'a> {
    items: &'a [TuningIr],
    source_cycle_id: CycleId,
}

fn recompute_portfolio_hash(items: &[TuningIr], source_cycle_id: CycleId) -> GovResult<Hash32> {
    let for_hash = PortfolioForHash { items, source_cycle_id };
    hash_canonical(&for_hash)
}

fn to_value<T: Serialize>(v: &T) -> GovResult<serde_json::Value> {
    serde_json::to_value(v).map_err(|e| gov_core::GovError::SerializationFail(e.to_string()))
}
