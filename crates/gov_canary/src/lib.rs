//! gov_canary — the Canary Hot-Apply Engine (C9): validate, apply, observe,
//! commit-or-rollback, and the cooldown scanner that gates re-selection.

#![forbid(unsafe_code)]

pub mod apply;
pub mod commit;
pub mod cooldown;
pub mod drift;
pub mod rollback;
pub mod sink;

pub use apply::{validate_and_apply, ApplyOutcome, ApplySnapshot, ModuleContext, SnapshotEntry};
pub use commit::commit;
pub use cooldown::{is_cooling_down, CooldownPolicy};
pub use drift::{compute_drift, DriftPolicy, DriftReport};
pub use rollback::rollback;
pub use sink::{InMemoryKnobSink, KnobSink};
