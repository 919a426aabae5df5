//! Per-(module, knob) declared promoted value plus the threshold rules the
//! optimizer uses for tie-break bias (spec §3 `PromotionPolicy`, §4.8 step 5).

use std::collections::BTreeMap;

use gov_core::value::KnobValue;
use gov_core::{KnobName, ModuleId};
use gov_tuning::validate::PromotionLookup;

#[derive(Clone, Debug, Default)]
pub struct PromotionPolicy {
    declared: BTreeMap<(ModuleId, KnobName), KnobValue>,
    /// Two scores within this distance are considered tied for the
    /// promotion-bias rule (§4.8 step 5).
    pub score_epsilon: f64,
}

impl PromotionPolicy {
    pub fn new(score_epsilon: f64) -> Self {
        PromotionPolicy { declared: BTreeMap::new(), score_epsilon }
    }

    pub fn declare(&mut self, module: ModuleId, knob: KnobName, value: KnobValue) {
        self.declared.insert((module, knob), value);
    }

    pub fn promoted_value(&self, module: &ModuleId, knob: &KnobName) -> Option<KnobValue> {
        self.declared.get(&(module.clone(), knob.clone())).cloned()
    }

    pub fn is_promoted_value(&self, module: &ModuleId, knob: &KnobName, value: &KnobValue) -> bool {
        self.promoted_value(module, knob)
            .is_some_and(|promoted| promoted.sort_key() == value.sort_key())
    }

    pub fn has_promotion(&self, module: &ModuleId, knob: &KnobName) -> bool {
        self.declared.contains_key(&(module.clone(), knob.clone()))
    }

    /// Every declared `(module, knob)` pair, used by the promotion
    /// influence report (spec §4.10) to count promotions that went
    /// unselected this cycle.
    pub fn declared_pairs(&self) -> impl Iterator<Item = (&ModuleId, &KnobName)> {
        self.declared.keys().map(|(m, k)| (m, k))
    }
}

impl PromotionLookup for PromotionPolicy {
    fn promoted_value(&self, module: &ModuleId, knob: &KnobName) -> Option<KnobValue> {
        PromotionPolicy::promoted_value(self, module, knob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_value_round_trips() {
        let mut policy = PromotionPolicy::new(0.01);
        policy.declare("m1".parse().unwrap(), "batch".parse().unwrap(), KnobValue::Int(4));
        assert!(policy.is_promoted_value(&"m1".parse().unwrap(), &"batch".parse().unwrap(), &KnobValue::Int(4)));
        assert!(!policy.is_promoted_value(&"m1".parse().unwrap(), &"batch".parse().unwrap(), &KnobValue::Int(5)));
    }
}
