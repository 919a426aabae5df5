//! One function per subcommand (spec §6), each returning the process exit
//! code directly rather than an error the caller has to translate — mirrors
//! `vm_cli`'s `run` returning `ExitCode` straight from pipeline outcomes.

use std::path::Path;
use std::process::ExitCode;

use gov_canary::apply::ModuleContext;
use gov_canary::sink::InMemoryKnobSink;
use gov_core::{CycleId, Hash32};
use gov_ledger::{EntryType, LedgerHandle, LedgerReader, LedgerWriter};
use gov_optimizer::portfolio::RegistryEntry;
use gov_orchestrator::cycle::{CycleConfig, CycleDriver, CycleOutcome, Observation};
use gov_orchestrator::CancellationToken;
use gov_stats::{EffectsStore, StabilizationStore};
use gov_topology::manifest;
use gov_topology::validate as topology_validate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config;

pub fn topology_lint(manifest_path: &Path) -> ExitCode {
    if !manifest_path.exists() {
        eprintln!("govctl: manifest not found: {}", manifest_path.display());
        return ExitCode::from(2);
    }

    let loaded = manifest::load(manifest_path);
    let m = match loaded {
        Ok(m) => m,
        Err(gov_core::GovError::ManifestHashMismatch { expected, actual }) => {
            eprintln!("govctl: manifest hash mismatch: expected {expected} got {actual}");
            return ExitCode::from(3);
        }
        Err(e) => {
            eprintln!("govctl: cannot load manifest: {e}");
            return ExitCode::from(4);
        }
    };

    let report = match topology_validate::validate(&m) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("govctl: lint failed: {e}");
            return ExitCode::from(4);
        }
    };

    if !report.forbidden_crossings.is_empty() {
        eprintln!("govctl: forbidden crossings: {:?}", report.forbidden_crossings);
        return ExitCode::from(5);
    }
    if !report.is_ok() {
        for issue in &report.issues {
            eprintln!("govctl: lint issue [{}]: {}", issue.code, issue.detail);
        }
        return ExitCode::from(4);
    }

    println!("govctl: manifest clean");
    ExitCode::from(0)
}

#[derive(Serialize)]
struct ManifestRelockedPayload<'a> {
    manifest_path: String,
    manifest_hash: &'a Hash32,
}

/// `evidence relock` recomputes `provenance.manifest_hash` after an
/// authoring edit and writes the manifest back atomically. The `--bundle`
/// flag names the manifest file, consistent with `topology relock` in
/// SPEC_FULL's C3 section (the manifest is the thing that carries a
/// provenance hash to relock; evidence bundles are content-hashed and have
/// nothing to rewrite). `--state` is where the relock's `manifest_relocked`
/// entry is appended, so the operation leaves an evidence trail like every
/// other closed entry type (spec §4.2).
pub fn evidence_relock(manifest_path: &Path, state: &Path) -> ExitCode {
    let bytes = match std::fs::read(manifest_path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("govctl: cannot read {}: {e}", manifest_path.display());
            return ExitCode::from(2);
        }
    };
    let m: manifest::Manifest = match serde_json::from_slice(&bytes) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("govctl: cannot parse manifest: {e}");
            return ExitCode::from(4);
        }
    };
    let relocked = match manifest::relock(manifest_path, m) {
        Ok(relocked) => relocked,
        Err(e) => {
            eprintln!("govctl: relock failed: {e}");
            return ExitCode::from(4);
        }
    };

    let ledger_path = state.join("evidence_ledger.jsonl");
    let mut ledger = match LedgerWriter::open(&ledger_path) {
        Ok(LedgerHandle::Writable(w)) => w,
        Ok(LedgerHandle::ReadOnly { reason, .. }) => {
            eprintln!("govctl: ledger is read-only: {reason}");
            return ExitCode::from(1);
        }
        Err(e) => {
            eprintln!("govctl: cannot open ledger: {e}");
            return ExitCode::from(1);
        }
    };
    let payload = ManifestRelockedPayload {
        manifest_path: manifest_path.display().to_string(),
        manifest_hash: &relocked.provenance.manifest_hash,
    };
    let payload = match serde_json::to_value(&payload) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("govctl: cannot serialize relock entry: {e}");
            return ExitCode::from(1);
        }
    };
    if let Err(e) = ledger.append(EntryType::ManifestRelocked, payload, current_timestamp()) {
        eprintln!("govctl: cannot append relock entry: {e}");
        return ExitCode::from(1);
    }

    println!("govctl: relocked, manifest_hash={}", relocked.provenance.manifest_hash.as_hex());
    ExitCode::from(0)
}

pub fn ledger_verify(state: &Path) -> ExitCode {
    let ledger_path = state.join("evidence_ledger.jsonl");
    match LedgerWriter::open(&ledger_path) {
        Ok(LedgerHandle::Writable(w)) => {
            println!("govctl: ledger chain ok, tail_hash={}", w.tail_hash().as_hex());
            ExitCode::from(0)
        }
        Ok(LedgerHandle::ReadOnly { reason, entries }) => {
            eprintln!("govctl: ledger corrupt at {} entries: {reason}", entries.len());
            ExitCode::from(1)
        }
        Err(e) => {
            eprintln!("govctl: ledger verify failed: {e}");
            ExitCode::from(1)
        }
    }
}

pub fn cycle_tick(state: &Path) -> ExitCode {
    match run_cycle_tick(state) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("govctl: cycle tick failed: {e}");
            ExitCode::from(1)
        }
    }
}

fn run_cycle_tick(state: &Path) -> gov_core::GovResult<ExitCode> {
    let ledger_path = state.join("evidence_ledger.jsonl");
    let effects_path = state.join("effects_store.json");
    let stabilization_path = state.join("stabilization_state.json");
    let registry_path = state.join("registry_snapshot.json");
    let cycle_config_path = state.join("cycle_config.json");
    let baseline_path = state.join("baseline.json");
    let evidence_dir = state.join("evidence");
    let cursor_path = state.join("cycle_cursor.json");

    let mut ledger = match LedgerWriter::open(&ledger_path)? {
        LedgerHandle::Writable(w) => w,
        LedgerHandle::ReadOnly { reason, .. } => {
            eprintln!("govctl: ledger is read-only: {reason}");
            return Ok(ExitCode::from(1));
        }
    };

    let mut effects = EffectsStore::load(&effects_path)?;
    let mut stabilization = StabilizationStore::load(&stabilization_path)?;
    let registry: Vec<RegistryEntry> = config::load_registry(&registry_path)?;
    let cycle_inputs = config::load_cycle_config(&cycle_config_path)?;
    let baseline = config::load_baseline(&baseline_path)?;
    let evidence_bundles = config::load_evidence_bundles(&evidence_dir)?;
    let current_cycle = next_cycle_id(&cursor_path)?;

    let mut modules = BTreeMap::new();
    for entry in &registry {
        modules.insert(
            entry.module.clone(),
            ModuleContext { envelope: &entry.envelope, capabilities: &entry.capabilities },
        );
    }

    let config = CycleConfig {
        weights: cycle_inputs.weights,
        budgets: cycle_inputs.budgets,
        gate: cycle_inputs.gate,
        drift_policy: cycle_inputs.drift_policy,
        cooldown_policy: cycle_inputs.cooldown_policy,
    };

    let mut sink = InMemoryKnobSink::new();
    let ts = current_timestamp();

    let mut driver = CycleDriver {
        ledger: &mut ledger,
        ledger_path: &ledger_path,
        stabilization: &mut stabilization,
        effects: &mut effects,
        sink: &mut sink,
    };

    // No overlay/HTTP collaborator is wired up in this workspace (spec
    // Non-goal: overlay subprocess sandboxing). A CLI-driven tick observes
    // the registry's own `current_metrics` as the post-apply measurement
    // rather than suspending for an external canary window.
    let post_apply_metrics: Vec<_> = registry.iter().map(|r| r.current_metrics).collect();
    let observed = post_apply_metrics.first().copied().unwrap_or_default();

    let outcome = driver.run_cycle(
        current_cycle,
        &registry,
        &modules,
        &cycle_inputs.promotion,
        &evidence_bundles,
        &config,
        &CancellationToken::new(),
        &baseline.metrics,
        &baseline.signature,
        || Ok(Observation::Metrics(observed)),
        ts,
    )?;

    effects.save(&effects_path)?;
    stabilization.save(&stabilization_path)?;
    save_cycle_cursor(&cursor_path, current_cycle.next())?;

    match outcome {
        CycleOutcome::Committed { portfolio } => {
            println!("govctl: cycle {} committed, portfolio_hash={}", current_cycle.0, portfolio.portfolio_hash.as_hex());
            Ok(ExitCode::from(0))
        }
        CycleOutcome::RolledBack { reasons, .. } => {
            println!("govctl: cycle {} rolled back: {reasons:?}", current_cycle.0);
            Ok(ExitCode::from(0))
        }
        CycleOutcome::Rejected { issues } => {
            println!("govctl: cycle {} rejected: {issues:?}", current_cycle.0);
            Ok(ExitCode::from(0))
        }
        CycleOutcome::Cancelled => {
            println!("govctl: cycle {} cancelled", current_cycle.0);
            Ok(ExitCode::from(0))
        }
    }
}

fn next_cycle_id(cursor_path: &Path) -> gov_core::GovResult<CycleId> {
    if !cursor_path.exists() {
        return Ok(CycleId(0));
    }
    let bytes = std::fs::read(cursor_path)
        .map_err(|e| gov_core::GovError::SerializationFail(e.to_string()))?;
    let value: u64 = serde_json::from_slice(&bytes)
        .map_err(|e| gov_core::GovError::SerializationFail(e.to_string()))?;
    Ok(CycleId(value))
}

fn save_cycle_cursor(cursor_path: &Path, next: CycleId) -> gov_core::GovResult<()> {
    gov_io::atomic::write_canonical_file(cursor_path, &next.0).map_err(Into::into)
}

/// `LedgerEntry.ts` is an opaque `i64` the caller supplies (spec §4.2 carries
/// no canonical clock); the CLI is the one place a wall clock is acceptable
/// since it sits outside the deterministic core.
fn current_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
