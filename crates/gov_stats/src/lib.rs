//! gov_stats — the stabilization store (C5) and effects store (C6).

#![forbid(unsafe_code)]

pub mod effects;
pub mod stabilization;

pub use effects::{EffectKey, EffectsStore, RunningStats};
pub use stabilization::{StabilizationEntry, StabilizationPolicy, StabilizationStore};
