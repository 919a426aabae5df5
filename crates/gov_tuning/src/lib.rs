//! gov_tuning — the tuning envelope, `TuningIR`, and the validator that
//! checks a proposal against bounds, capabilities, stabilization, and
//! evidence requirements (C7).

#![forbid(unsafe_code)]

pub mod envelope;
pub mod ir;
pub mod validate;

pub use envelope::{KnobSpec, TuningEnvelope};
pub use ir::{Provenance, TuningIr, TuningMode};
pub use validate::{validate, ValidationIssue, ValidationReport};
