//! Online Welford statistics per `(module, knob, proposed_value,
//! baseline_signature)` (spec §4.6).

use std::path::Path;

use gov_core::value::KnobValue;
use gov_core::{GovResult, Hash32, KnobName, ModuleId};
use gov_io::atomic::write_canonical_file;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RunningStats {
    pub n: u64,
    pub mean: f64,
    pub m2: f64,
}

impl RunningStats {
    /// Welford update: `delta = x - mean; mean' = mean + delta/n'; m2' = m2
    /// + delta*(x - mean')`.
    pub fn update(&mut self, x: f64) {
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        let delta2 = x - self.mean;
        self.m2 += delta * delta2;
    }

    /// `m2/(n-1)` for `n>1`; 0.0 for `n<=1` so `stderr` stays well-defined
    /// rather than NaN.
    pub fn variance(&self) -> f64 {
        if self.n > 1 {
            self.m2 / (self.n - 1) as f64
        } else {
            0.0
        }
    }

    pub fn stderr(&self) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        (self.variance() / self.n as f64).sqrt()
    }
}

/// A lookup key into the effects store. `KnobValue` carries an `f64`
/// variant, so this type intentionally does not derive `Eq`/`Ord` — lookups
/// go through `EffectKeyWire::matches`, which compares the value's
/// deterministic `sort_key()` text form instead of float equality.
#[derive(Clone, Debug)]
pub struct EffectKey {
    pub module: ModuleId,
    pub knob: KnobName,
    pub value: KnobValue,
    pub baseline_signature: Hash32,
}

impl EffectKey {
    pub fn new(module: ModuleId, knob: KnobName, value: KnobValue, baseline_signature: Hash32) -> Self {
        EffectKey { module, knob, value, baseline_signature }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EffectsStore {
    entries: Vec<EffectEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct EffectEntry {
    key: EffectKeyWire,
    stats: RunningStats,
}

/// Wire-serializable projection of `EffectKey`: `KnobValue` carries `f64`
/// so the key is stored/matched via its canonical `sort_key()` string, not
/// float equality.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct EffectKeyWire {
    module: ModuleId,
    knob: KnobName,
    value: KnobValue,
    value_sort_key: String,
    baseline_signature: Hash32,
}

impl EffectKeyWire {
    fn from_key(key: &EffectKey) -> Self {
        EffectKeyWire {
            module: key.module.clone(),
            knob: key.knob.clone(),
            value: key.value.clone(),
            value_sort_key: key.value.sort_key(),
            baseline_signature: key.baseline_signature.clone(),
        }
    }

    fn matches(&self, key: &EffectKey) -> bool {
        self.module == key.module
            && self.knob == key.knob
            && self.value_sort_key == key.value.sort_key()
            && self.baseline_signature == key.baseline_signature
    }
}

impl EffectsStore {
    pub fn new() -> Self {
        EffectsStore::default()
    }

    /// A missing or empty file yields an empty store, never an error
    /// (spec §4.6).
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

    pub fn get(&self, key: &EffectKey) -> RunningStats {
        self.entries
            .iter()
            .find(|e| e.key.matches(key))
            .map(|e| e.stats)
            .unwrap_or_default()
    }

    pub fn record(&mut self, key: &EffectKey, observed: f64) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.key.matches(key)) {
            entry.stats.update(observed);
        } else {
            let mut stats = RunningStats::default();
            stats.update(observed);
            self.entries.push(EffectEntry { key: EffectKeyWire::from_key(key), stats });
            self.entries.sort_by(|a, b| {
                (a.key.module.as_str(), a.key.knob.as_str(), a.key.value_sort_key.as_str(), a.key.baseline_signature.as_hex())
                    .cmp(&(b.key.module.as_str(), b.key.knob.as_str(), b.key.value_sort_key.as_str(), b.key.baseline_signature.as_hex()))
            });
        }
    }

    pub fn mean(&self, key: &EffectKey) -> f64 {
        self.get(key).mean
    }

    pub fn stderr(&self, key: &EffectKey) -> f64 {
        self.get(key).stderr()
    }

    pub fn variance(&self, key: &EffectKey) -> f64 {
        self.get(key).variance()
    }

    /// Every recorded (module, knob, value, baseline_signature, stats)
    /// tuple for `module`/`knob` — the enumeration surface the Portfolio
    /// Optimizer's candidate step (§4.8 step 1) walks.
    pub fn entries_for(&self, module: &ModuleId, knob: &KnobName) -> Vec<(KnobValue, Hash32, RunningStats)> {
        self.entries
            .iter()
            .filter(|e| &e.key.module == module && &e.key.knob == knob)
            .map(|e| (e.key.value.clone(), e.key.baseline_signature.clone(), e.stats))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_key() -> EffectKey {
        EffectKey::new(
            "m1".parse().unwrap(),
            "batch".parse().unwrap(),
            KnobValue::Int(4),
            Hash32::from_trusted_hex("a".repeat(64)),
        )
    }

    #[test]
    fn welford_matches_naive_mean_and_variance() {
        let samples = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let mut stats = RunningStats::default();
        for &x in &samples {
            stats.update(x);
        }
        let naive_mean = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!((stats.mean - naive_mean).abs() < 1e-9);

        let naive_var = samples.iter().map(|x| (x - naive_mean).powi(2)).sum::<f64>()
            / (samples.len() - 1) as f64;
        assert!((stats.variance() - naive_var).abs() < 1e-9);
    }

    #[test]
    fn missing_file_loads_empty_not_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("effects.json");
        let store = EffectsStore::load(&path).unwrap();
        assert_eq!(store.get(&sample_key()).n, 0);
    }

    #[test]
    fn save_then_load_roundtrips_stats() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("effects.json");
        let mut store = EffectsStore::new();
        let key = sample_key();
        for x in [-12.0, -11.0, -13.0] {
            store.record(&key, x);
        }
        store.save(&path).unwrap();

        let loaded = EffectsStore::load(&path).unwrap();
        assert_eq!(loaded.get(&key).n, 3);
    }

    #[test]
    fn single_sample_has_zero_variance_not_nan() {
        let mut stats = RunningStats::default();
        stats.update(5.0);
        assert_eq!(stats.variance(), 0.0);
        assert_eq!(stats.stderr(), 0.0);
    }

    #[test]
    fn entries_for_enumerates_recorded_candidates() {
        let mut store = EffectsStore::new();
        store.record(&sample_key(), -1.0);
        store.record(
            &EffectKey::new("m1".parse().unwrap(), "batch".parse().unwrap(), KnobValue::Int(8), Hash32::from_trusted_hex("a".repeat(64))),
            -2.0,
        );
        let found = store.entries_for(&"m1".parse().unwrap(), &"batch".parse().unwrap());
        assert_eq!(found.len(), 2);
    }
}
