//! Per-module declaration of tunable knobs (spec §3 `TuningEnvelope`).

use std::collections::BTreeMap;

use gov_core::value::Bounds;
use gov_core::{CapToken, KnobName};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KnobSpec {
    pub bounds: Bounds,
    pub hot_apply: bool,
    pub stabilization_cycles: u32,
    pub capability_required: CapToken,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TuningEnvelope {
    pub knobs: BTreeMap<KnobName, KnobSpec>,
}

impl TuningEnvelope {
    pub fn spec(&self, knob: &KnobName) -> Option<&KnobSpec> {
        self.knobs.get(knob)
    }
}
