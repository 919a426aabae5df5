//! The deterministic greedy portfolio-selection algorithm (spec §4.8).

use std::collections::BTreeMap;

use gov_capability::CapabilitySet;
use gov_core::determinism::cmp_candidates_by_order;
use gov_core::{CycleId, GovResult, Hash32, KnobName, MetricsEnvelope, ModuleId};
use gov_io::canon::hash_canonical;
use gov_stats::{EffectsStore, StabilizationPolicy, StabilizationStore};
use gov_tuning::ir::{Provenance, TuningIr, TuningMode};
use gov_tuning::TuningEnvelope;
use serde::{Deserialize, Serialize};

use crate::candidate::{Candidate, ImpactVector, ObjectiveWeights};
use crate::promotion::PromotionPolicy;

#[derive(Clone, Copy, Debug)]
pub struct SignificanceGate {
    pub min_samples: u64,
    pub z_threshold: f64,
}

#[derive(Clone, Copy, Debug)]
pub struct Budgets {
    pub max_changes_per_cycle: u32,
    pub cost_budget: f64,
    pub per_module_cap: Option<u32>,
}

/// One module's view for this cycle: its tunable envelope, the
/// capabilities it currently declares, and the metrics this engine
/// measures deltas against.
#[derive(Clone, Debug)]
pub struct RegistryEntry {
    pub module: ModuleId,
    pub envelope: TuningEnvelope,
    pub capabilities: CapabilitySet,
    pub current_metrics: MetricsEnvelope,
    pub baseline_metrics: MetricsEnvelope,
    pub baseline_signature: Hash32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PortfolioCounts {
    pub candidates_total: u64,
    pub selected: u64,
    pub promotion_biased: u64,
    pub promoted_default_applied: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PortfolioNotes {
    pub optimizer_version: String,
    pub counts: PortfolioCounts,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PortfolioTuningIr {
    pub schema_version: String,
    pub portfolio_hash: Hash32,
    pub source_cycle_id: CycleId,
    pub policy: String,
    pub items: Vec<TuningIr>,
    pub notes: PortfolioNotes,
}

#[derive(Serialize)]
struct PortfolioForHash<'a> {
    items: &'a [TuningIr],
    source_cycle_id: CycleId,
}

/// Step 1: every (module, knob, recorded-value-or-promoted-default) with
/// an effect recorded against the module's *current* baseline signature,
/// or a declared promoted default with no significant measured effect yet.
fn enumerate_candidates(
    entry: &RegistryEntry,
    effects: &EffectsStore,
    promotion: &PromotionPolicy,
    weights: &ObjectiveWeights,
) -> Vec<Candidate> {
    let module_impact_baseline = entry.current_metrics.delta(&entry.baseline_metrics);
    let mut out = Vec::new();

    for (knob, _spec) in &entry.envelope.knobs {
        let recorded = effects.entries_for(&entry.module, knob);
        let mut has_measured = false;

        for (value, baseline_sig, stats) in recorded {
            if baseline_sig != entry.baseline_signature {
                continue;
            }
            has_measured = true;
            let impact = ImpactVector {
                delta_latency: stats.mean,
                delta_cost: module_impact_baseline.delta_cost,
                delta_error: module_impact_baseline.delta_error,
                delta_throughput: module_impact_baseline.delta_throughput,
            };
            out.push(Candidate {
                node_id: entry.module.clone(),
                knob: knob.clone(),
                proposed_value: value,
                score: weights.score(&impact),
                impact,
                reason_tags: Vec::new(),
                n_samples: stats.n,
                stderr: stats.stderr(),
            });
        }

        if !has_measured {
            if let Some(promoted_value) = promotion.promoted_value(&entry.module, knob) {
                out.push(Candidate {
                    node_id: entry.module.clone(),
                    knob: knob.clone(),
                    proposed_value: promoted_value,
                    impact: ImpactVector::default(),
                    reason_tags: vec!["promoted_default_applied".into()],
                    score: 0.0,
                    n_samples: 0,
                    stderr: 0.0,
                });
            }
        }
    }
    out
}

/// Step 2: capability present, hot_apply true, stabilization eligible.
fn passes_filters(
    entry: &RegistryEntry,
    candidate: &Candidate,
    stabilization: &StabilizationStore,
    current_cycle: CycleId,
) -> bool {
    let Some(spec) = entry.envelope.spec(&candidate.knob) else { return false };
    if !entry.capabilities.contains(&spec.capability_required) {
        return false;
    }
    if !spec.hot_apply {
        return false;
    }
    let policy = StabilizationPolicy { stabilization_cycles: spec.stabilization_cycles };
    stabilization.is_eligible(&entry.module, &candidate.knob, current_cycle, &policy)
}

/// Step 3. Promoted defaults (tagged `promoted_default_applied`, `n_samples
/// == 0`) bypass the gate entirely — they're scored neutral and only ever
/// fill remaining slack (step 6).
fn passes_significance_gate(candidate: &Candidate, gate: &SignificanceGate) -> bool {
    if candidate.reason_tags.iter().any(|t| t == "promoted_default_applied") {
        return true;
    }
    if candidate.n_samples < gate.min_samples {
        return false;
    }
    if candidate.stderr > 0.0 {
        return candidate.impact.delta_latency.abs() / candidate.stderr >= gate.z_threshold;
    }
    // Zero variance with enough samples is a perfectly consistent effect.
    true
}

/// Step 5: within one (module, knob) group, pick the best-scoring
/// candidate; if the top two are tied within `epsilon` and one is the
/// promoted value, the promoted one wins and is tagged `promotion_biased`.
fn resolve_promotion_bias(mut group: Vec<Candidate>, promotion: &PromotionPolicy) -> Candidate {
    group.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    if group.len() < 2 {
        return group.into_iter().next().expect("group is non-empty");
    }
    let best = &group[0];
    let second = &group[1];
    if (best.score - second.score).abs() <= promotion.score_epsilon {
        for c in &group {
            if promotion.is_promoted_value(&c.node_id, &c.knob, &c.proposed_value) {
                let mut winner = c.clone();
                winner.reason_tags.push("promotion_biased".into());
                return winner;
            }
        }
    }
    group.into_iter().next().expect("group is non-empty")
}

/// Steps 1-8 end to end.
pub fn optimize(
    registry: &[RegistryEntry],
    effects: &EffectsStore,
    stabilization: &StabilizationStore,
    promotion: &PromotionPolicy,
    weights: ObjectiveWeights,
    budgets: Budgets,
    gate: SignificanceGate,
    current_cycle: CycleId,
) -> GovResult<PortfolioTuningIr> {
    let mut candidates_total: u64 = 0;
    let mut promotion_biased: u64 = 0;
    let mut promoted_default_applied: u64 = 0;

    let mut finalists: Vec<Candidate> = Vec::new();

    for entry in registry {
        let raw = enumerate_candidates(entry, effects, promotion, &weights);
        candidates_total += raw.len() as u64;

        let filtered: Vec<Candidate> = raw
            .into_iter()
            .filter(|c| passes_filters(entry, c, stabilization, current_cycle))
            .filter(|c| passes_significance_gate(c, &gate))
            .collect();

        let mut groups: BTreeMap<KnobName, Vec<Candidate>> = BTreeMap::new();
        for c in filtered {
            groups.entry(c.knob.clone()).or_default().push(c);
        }
        for (_knob, group) in groups {
            let winner = resolve_promotion_bias(group, promotion);
            if winner.reason_tags.iter().any(|t| t == "promotion_biased") {
                promotion_biased += 1;
            }
            if winner.reason_tags.iter().any(|t| t == "promoted_default_applied") {
                promoted_default_applied += 1;
            }
            finalists.push(winner);
        }
    }

    // Step 7: stable deterministic sort.
    finalists.sort_by(|a, b| {
        cmp_candidates_by_order(a.score, a.node_id.as_str(), a.knob.as_str(), b.score, b.node_id.as_str(), b.knob.as_str())
    });

    // Step 8: budget-greedy selection.
    let mut cost_spent = 0.0_f64;
    let mut per_module_count: BTreeMap<ModuleId, u32> = BTreeMap::new();
    let mut selected: Vec<Candidate> = Vec::new();

    for candidate in finalists {
        if selected.len() as u32 >= budgets.max_changes_per_cycle {
            break;
        }
        if let Some(cap) = budgets.per_module_cap {
            let used = per_module_count.get(&candidate.node_id).copied().unwrap_or(0);
            if used >= cap {
                continue;
            }
        }
        let spend = candidate.impact.delta_cost.max(0.0);
        if cost_spent + spend > budgets.cost_budget {
            continue;
        }
        cost_spent += spend;
        *per_module_count.entry(candidate.node_id.clone()).or_insert(0) += 1;
        selected.push(candidate);
    }

    let items: Vec<TuningIr> = selected
        .into_iter()
        .map(|c| build_tuning_ir(c, current_cycle))
        .collect::<GovResult<Vec<_>>>()?;

    let portfolio_for_hash = PortfolioForHash { items: &items, source_cycle_id: current_cycle };
    let portfolio_hash = hash_canonical(&portfolio_for_hash)?;
    let selected_count = items.len() as u64;

    Ok(PortfolioTuningIr {
        schema_version: "1".into(),
        portfolio_hash,
        source_cycle_id: current_cycle,
        policy: "greedy_budget_v1".into(),
        items,
        notes: PortfolioNotes {
            optimizer_version: "v0.6".into(),
            counts: PortfolioCounts {
                candidates_total,
                selected: selected_count,
                promotion_biased,
                promoted_default_applied,
            },
        },
    })
}

fn build_tuning_ir(candidate: Candidate, current_cycle: CycleId) -> GovResult<TuningIr> {
    let mut assignments = std::collections::BTreeMap::new();
    assignments.insert(candidate.knob, candidate.proposed_value);

    let mut ir = TuningIr {
        target: candidate.node_id,
        assignments,
        mode: TuningMode::AppliedTune,
        provenance: Provenance {
            ir_hash: Hash32::from_trusted_hex("0".repeat(64)),
            source_cycle_id: current_cycle,
            reason_tags: candidate.reason_tags,
            evidence_bundle_hash: None,
        },
    };
    ir.provenance.ir_hash = ir.recompute_ir_hash()?;
    Ok(ir)
}
