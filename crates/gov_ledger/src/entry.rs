//! The ledger entry envelope and its closed `entry_type` set.

use gov_core::Hash32;
use serde::{Deserialize, Serialize};

/// Closed set of ledger entry types (spec §4.2). Stable wire names; a new
/// variant here is a ledger format change, not a refactor.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    TuningIrProposed,
    TuningIrApplied,
    TuningIrRejected,
    TuningIrRolledBack,
    EffectRecorded,
    PortfolioSelected,
    PromotionInfluenceReported,
    CooldownEntered,
    RollbackAttributed,
    ManifestRelocked,
}

impl EntryType {
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            EntryType::TuningIrProposed => "tuning_ir_proposed",
            EntryType::TuningIrApplied => "tuning_ir_applied",
            EntryType::TuningIrRejected => "tuning_ir_rejected",
            EntryType::TuningIrRolledBack => "tuning_ir_rolled_back",
            EntryType::EffectRecorded => "effect_recorded",
            EntryType::PortfolioSelected => "portfolio_selected",
            EntryType::PromotionInfluenceReported => "promotion_influence_reported",
            EntryType::CooldownEntered => "cooldown_entered",
            EntryType::RollbackAttributed => "rollback_attributed",
            EntryType::ManifestRelocked => "manifest_relocked",
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_wire_str())
    }
}

/// A single ledger entry, as persisted and as replayed.
///
/// `tail_hash = sha256(idx || entry_type || ts || sha256(canonical(payload)) || prev_tail_hash)`,
/// fields joined with `|` to avoid ambiguous concatenation (spec §8 I2).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub idx: u64,
    pub entry_type: EntryType,
    pub ts: i64,
    pub payload: serde_json::Value,
    pub prev_tail_hash: Hash32,
    pub tail_hash: Hash32,
}

/// Parse a raw JSONL line into a `serde_json::Value`, normalizing a legacy
/// `type` key to `entry_type` before typed deserialization (spec §9 "Field
/// naming": an observed source bug class this engine must tolerate on load,
/// without ever writing the legacy form itself).
pub fn normalize_legacy_type_key(mut raw: serde_json::Value) -> serde_json::Value {
    if let serde_json::Value::Object(map) = &mut raw {
        if !map.contains_key("entry_type") {
            if let Some(legacy) = map.remove("type") {
                map.insert("entry_type".to_string(), legacy);
            }
        }
    }
    raw
}

pub(crate) fn tail_hash_input(
    idx: u64,
    entry_type: EntryType,
    ts: i64,
    payload_hash: &Hash32,
    prev_tail_hash: &Hash32,
) -> String {
    format!(
        "{}|{}|{}|{}|{}",
        idx,
        entry_type.as_wire_str(),
        ts,
        payload_hash.as_hex(),
        prev_tail_hash.as_hex()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_type_key_is_normalized() {
        let raw = serde_json::json!({"type": "tuning_ir_applied", "idx": 1});
        let normalized = normalize_legacy_type_key(raw);
        assert_eq!(normalized["entry_type"], "tuning_ir_applied");
        assert!(normalized.get("type").is_none());
    }

    #[test]
    fn existing_entry_type_key_is_untouched() {
        let raw = serde_json::json!({"entry_type": "effect_recorded", "type": "stale"});
        let normalized = normalize_legacy_type_key(raw);
        assert_eq!(normalized["entry_type"], "effect_recorded");
    }

    #[test]
    fn wire_strings_match_closed_set() {
        assert_eq!(EntryType::TuningIrRolledBack.as_wire_str(), "tuning_ir_rolled_back");
        assert_eq!(EntryType::ManifestRelocked.to_string(), "manifest_relocked");
    }
}
