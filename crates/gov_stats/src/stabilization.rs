//! Persistent record of "cycles since last change" per (module, knob)
//! (spec §4.5). Change recording itself is atomic with the cycle commit in
//! `gov_canary`; this store just holds the bookkeeping.

use std::collections::BTreeMap;
use std::path::Path;

use gov_core::{CycleId, GovResult, KnobName, ModuleId};
use gov_io::atomic::write_canonical_file;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct StabilizationEntry {
    pub last_change_cycle: CycleId,
    pub total_changes: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct StabilizationPolicy {
    pub stabilization_cycles: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StabilizationStore {
    entries: BTreeMap<String, StabilizationEntry>,
}

fn key(module: &ModuleId, knob: &KnobName) -> String {
    format!("{module}\u{1}{knob}")
}

impl StabilizationStore {
    pub fn new() -> Self {
        StabilizationStore::default()
    }

    /// A missing or empty file yields an empty store — not an error
    /// (spec §4.6's rule applied symmetrically to this store).
    pub fn load(path: &Path) -> GovResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let bytes = std::fs::read(path)
            .map_err(|e| gov_core::GovError::SerializationFail(e.to_string()))?;
        if bytes.is_empty() {
            return Ok(Self::new());
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| gov_core::GovError::SerializationFail(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> GovResult<()> {
        write_canonical_file(path, self).map_err(Into::into)
    }

    pub fn get(&self, module: &ModuleId, knob: &KnobName) -> Option<StabilizationEntry> {
        self.entries.get(&key(module, knob)).copied()
    }

    /// `current_cycle - last_change_cycle >= policy.stabilization_cycles`.
    /// A (module, knob) pair never touched is always eligible.
    pub fn is_eligible(
        &self,
        module: &ModuleId,
        knob: &KnobName,
        current_cycle: CycleId,
        policy: &StabilizationPolicy,
    ) -> bool {
        match self.get(module, knob) {
            None => true,
            Some(entry) => {
                current_cycle.0.saturating_sub(entry.last_change_cycle.0)
                    >= u64::from(policy.stabilization_cycles)
            }
        }
    }

    /// Called by the Canary Engine atomically with a cycle commit.
    pub fn record_change(&mut self, module: &ModuleId, knob: &KnobName, cycle: CycleId) {
        let e = self
            .entries
            .entry(key(module, knob))
            .or_insert(StabilizationEntry { last_change_cycle: cycle, total_changes: 0 });
        e.last_change_cycle = cycle;
        e.total_changes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn untouched_pair_is_eligible() {
        let store = StabilizationStore::new();
        let policy = StabilizationPolicy { stabilization_cycles: 5 };
        assert!(store.is_eligible(
            &"m1".parse().unwrap(),
            &"k1".parse().unwrap(),
            CycleId(10),
            &policy
        ));
    }

    #[test]
    fn recent_change_blocks_eligibility_until_cycles_elapse() {
        let mut store = StabilizationStore::new();
        let module: ModuleId = "m1".parse().unwrap();
        let knob: KnobName = "k1".parse().unwrap();
        store.record_change(&module, &knob, CycleId(10));
        let policy = StabilizationPolicy { stabilization_cycles: 5 };

        assert!(!store.is_eligible(&module, &knob, CycleId(12), &policy));
        assert!(store.is_eligible(&module, &knob, CycleId(15), &policy));
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stabilization.json");
        let store = StabilizationStore::load(&path).unwrap();
        assert!(store.entries.is_empty());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stabilization.json");
        let mut store = StabilizationStore::new();
        store.record_change(&"m1".parse().unwrap(), &"k1".parse().unwrap(), CycleId(3));
        store.save(&path).unwrap();

        let loaded = StabilizationStore::load(&path).unwrap();
        assert_eq!(
            loaded.get(&"m1".parse().unwrap(), &"k1".parse().unwrap()).unwrap().total_changes,
            1
        );
    }
}
