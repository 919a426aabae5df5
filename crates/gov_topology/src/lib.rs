//! gov_topology — the YGGDRASIL topology manifest: node/link registry,
//! membrane validator, execution-DAG planner, and bridge promotion
//! workflow (C3).

#![forbid(unsafe_code)]

pub mod bundle;
pub mod dag;
pub mod manifest;
pub mod validate;

pub use bundle::{load_and_verify, EvidenceBundle};
pub use dag::{plan_execution_dag, ExecutionPlan};
pub use manifest::{load, relock, Manifest, Node, NodeKind, Provenance, RuneLink};
pub use validate::{validate, LintIssue, LintReport};
