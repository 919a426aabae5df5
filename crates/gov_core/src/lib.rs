//! gov_core — core types, closed error enum, bounded value domains.
//!
//! This crate is I/O-free: no filesystem access, no hashing, no RNG. It
//! defines the stable types shared by every other layer of the governance
//! engine (`gov_io`, `gov_ledger`, `gov_topology`, `gov_capability`,
//! `gov_stats`, `gov_tuning`, `gov_optimizer`, `gov_canary`,
//! `gov_orchestrator`, `gov_cli`).

#![forbid(unsafe_code)]

pub mod determinism;
pub mod domain;
pub mod error;
pub mod ids;
pub mod metrics;
pub mod value;

pub use domain::{Lane, LanePair, Phase, Realm};
pub use error::{GovError, GovResult};
pub use ids::{CapToken, CycleId, EvidenceTag, Hash32, KnobName, LinkId, ModuleId, NodeId};
pub use metrics::{MetricsDelta, MetricsEnvelope};
pub use value::{Bounds, KnobKind, KnobValue};
