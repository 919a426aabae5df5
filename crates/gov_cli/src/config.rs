//! File-backed DTOs for `cycle tick`'s inputs. None of the core crates'
//! runtime types (`RegistryEntry`, `ObjectiveWeights`, `PromotionPolicy`,
//! ...) derive `Deserialize` — they are computed/constructed values, not
//! authored config — so this module is the one place that bridges authored
//! JSON into them.

use std::collections::BTreeMap;
use std::path::Path;

use gov_canary::cooldown::CooldownPolicy;
use gov_canary::drift::DriftPolicy;
use gov_capability::CapabilitySet;
use gov_core::{CapToken, GovError, GovResult, Hash32, KnobName, MetricsEnvelope, ModuleId};
use gov_optimizer::candidate::ObjectiveWeights;
use gov_optimizer::portfolio::{Budgets, RegistryEntry, SignificanceGate};
use gov_optimizer::promotion::PromotionPolicy;
use gov_tuning::TuningEnvelope;
use serde::Deserialize;

#[derive(Deserialize)]
struct RegistrySnapshotEntry {
    module: ModuleId,
    envelope: TuningEnvelope,
    capabilities: Vec<CapToken>,
    current_metrics: MetricsEnvelope,
    baseline_metrics: MetricsEnvelope,
    baseline_signature: Hash32,
}

pub fn load_registry(path: &Path) -> GovResult<Vec<RegistryEntry>> {
    let bytes = read(path)?;
    let raw: Vec<RegistrySnapshotEntry> = serde_json::from_slice(&bytes)
        .map_err(|e| GovError::SerializationFail(e.to_string()))?;
    Ok(raw
        .into_iter()
        .map(|r| {
            let mut capabilities = CapabilitySet::new();
            for cap in &r.capabilities {
                capabilities.grant(cap.as_str());
            }
            RegistryEntry {
                module: r.module,
                envelope: r.envelope,
                capabilities,
                current_metrics: r.current_metrics,
                baseline_metrics: r.baseline_metrics,
                baseline_signature: r.baseline_signature,
            }
        })
        .collect())
}

#[derive(Deserialize)]
struct PromotedValue {
    module: ModuleId,
    knob: KnobName,
    value: gov_core::value::KnobValue,
}

#[derive(Deserialize)]
struct ObjectiveWeightsFile {
    w_latency: f64,
    w_cost: f64,
    w_error: f64,
    w_throughput: f64,
}

#[derive(Deserialize)]
struct BudgetsFile {
    max_changes_per_cycle: u32,
    cost_budget: f64,
    per_module_cap: Option<u32>,
}

#[derive(Deserialize)]
struct SignificanceGateFile {
    min_samples: u64,
    z_threshold: f64,
}

#[derive(Deserialize)]
struct CooldownPolicyFile {
    cooldown_cycles: u32,
}

#[derive(Deserialize)]
struct CycleConfigFile {
    weights: ObjectiveWeightsFile,
    budgets: BudgetsFile,
    gate: SignificanceGateFile,
    drift_policy: DriftPolicy,
    cooldown_policy: CooldownPolicyFile,
    #[serde(default)]
    promotion: PromotionFile,
}

#[derive(Deserialize, Default)]
struct PromotionFile {
    score_epsilon: f64,
    #[serde(default)]
    declared: Vec<PromotedValue>,
}

pub struct CycleInputs {
    pub weights: ObjectiveWeights,
    pub budgets: Budgets,
    pub gate: SignificanceGate,
    pub drift_policy: DriftPolicy,
    pub cooldown_policy: CooldownPolicy,
    pub promotion: PromotionPolicy,
}

pub fn load_cycle_config(path: &Path) -> GovResult<CycleInputs> {
    let bytes = read(path)?;
    let raw: CycleConfigFile =
        serde_json::from_slice(&bytes).map_err(|e| GovError::SerializationFail(e.to_string()))?;

    let mut promotion = PromotionPolicy::new(raw.promotion.score_epsilon);
    for p in raw.promotion.declared {
        promotion.declare(p.module, p.knob, p.value);
    }

    Ok(CycleInputs {
        weights: ObjectiveWeights {
            w_latency: raw.weights.w_latency,
            w_cost: raw.weights.w_cost,
            w_error: raw.weights.w_error,
            w_throughput: raw.weights.w_throughput,
        },
        budgets: Budgets {
            max_changes_per_cycle: raw.budgets.max_changes_per_cycle,
            cost_budget: raw.budgets.cost_budget,
            per_module_cap: raw.budgets.per_module_cap,
        },
        gate: SignificanceGate { min_samples: raw.gate.min_samples, z_threshold: raw.gate.z_threshold },
        drift_policy: raw.drift_policy,
        cooldown_policy: CooldownPolicy { cooldown_cycles: raw.cooldown_policy.cooldown_cycles },
        promotion,
    })
}

#[derive(Deserialize)]
pub struct BaselineFile {
    pub metrics: MetricsEnvelope,
    pub signature: Hash32,
}

pub fn load_baseline(path: &Path) -> GovResult<BaselineFile> {
    let bytes = read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| GovError::SerializationFail(e.to_string()))
}

/// Evidence bundles keyed by content hash, loaded from `<state>/evidence/*.bundle.json`.
pub fn load_evidence_bundles(dir: &Path) -> GovResult<BTreeMap<Hash32, gov_topology::bundle::EvidenceBundle>> {
    let mut out = BTreeMap::new();
    if !dir.exists() {
        return Ok(out);
    }
    let rd = std::fs::read_dir(dir).map_err(|e| GovError::SerializationFail(e.to_string()))?;
    for entry in rd {
        let entry = entry.map_err(|e| GovError::SerializationFail(e.to_string()))?;
        let bytes = std::fs::read(entry.path()).map_err(|e| GovError::SerializationFail(e.to_string()))?;
        let bundle: gov_topology::bundle::EvidenceBundle =
            serde_json::from_slice(&bytes).map_err(|e| GovError::SerializationFail(e.to_string()))?;
        let hash = bundle.content_hash()?;
        out.insert(hash, bundle);
    }
    Ok(out)
}

fn read(path: &Path) -> GovResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| GovError::SerializationFail(format!("{}: {e}", path.display())))
}
