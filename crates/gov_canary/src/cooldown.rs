//! Cooldown scanner: consults `tuning_ir_rolled_back` ledger entries to
//! decide whether a (module, knob) pair is still excluded (spec §4.9).

use gov_core::{CycleId, GovResult, KnobName, ModuleId};
use gov_ledger::LedgerReader;
use serde::Deserialize;

#[derive(Clone, Copy, Debug)]
pub struct CooldownPolicy {
    pub cooldown_cycles: u32,
}

#[derive(Deserialize)]
struct RolledBackItem {
    target: ModuleId,
    knobs: Vec<KnobName>,
}

#[derive(Deserialize)]
struct RolledBackPayload {
    cycle_id: CycleId,
    items: Vec<RolledBackItem>,
}

/// True iff a `tuning_ir_rolled_back` entry touching `(module, knob)` is
/// within `policy.cooldown_cycles` of `current_cycle`. The matched field is
/// always `entry_type` — `gov_ledger` normalizes a legacy `type` key at
/// replay, so this scanner never needs to care which form was persisted.
pub fn is_cooling_down(
    reader: &LedgerReader,
    module: &ModuleId,
    knob: &KnobName,
    current_cycle: CycleId,
    policy: &CooldownPolicy,
) -> GovResult<bool> {
    let rollbacks = reader.entries_of_type("tuning_ir_rolled_back")?;
    for entry in rollbacks {
        let Ok(payload) = serde_json::from_value::<RolledBackPayload>(entry.payload) else {
            continue;
        };
        let elapsed = current_cycle.0.saturating_sub(payload.cycle_id.0);
        if elapsed >= u64::from(policy.cooldown_cycles) {
            continue;
        }
        if payload.items.iter().any(|i| &i.target == module && i.knobs.contains(knob)) {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gov_ledger::{EntryType, LedgerHandle, LedgerWriter};
    use tempfile::tempdir;

    #[test]
    fn recent_rollback_blocks_the_same_knob() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let mut w = match LedgerWriter::open(&path).unwrap() {
            LedgerHandle::Writable(w) => w,
            _ => unreachable!(),
        };
        w.append(
            EntryType::TuningIrRolledBack,
            serde_json::json!({
                "portfolio_hash": "a".repeat(64),
                "cycle_id": 5,
                "reasons": ["rollback_latency_spike"],
                "items": [{"target": "m1", "knobs": ["batch"]}],
            }),
            1000,
        )
        .unwrap();

        let reader = LedgerReader::new(&path);
        let policy = CooldownPolicy { cooldown_cycles: 5 };

        assert!(is_cooling_down(
            &reader,
            &"m1".parse().unwrap(),
            &"batch".parse().unwrap(),
            CycleId(7),
            &policy
        )
        .unwrap());

        assert!(!is_cooling_down(
            &reader,
            &"m1".parse().unwrap(),
            &"batch".parse().unwrap(),
            CycleId(20),
            &policy
        )
        .unwrap());

        assert!(!is_cooling_down(
            &reader,
            &"m2".parse().unwrap(),
            &"batch".parse().unwrap(),
            CycleId(7),
            &policy
        )
        .unwrap());
    }
}
