//! Closed error set (spec §7). Every fallible operation in the engine
//! resolves to one of these variants; the orchestrator is the only place
//! that maps a `GovError` to a ledger entry (`tuning_ir_rejected`,
//! `tuning_ir_rolled_back`). Nothing here panics.

use thiserror::Error;

/// Stable, operator-triage-friendly error kinds. Names are part of the
/// external contract (ledger payloads, CLI exit diagnostics) and must not be
/// renamed casually.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GovError {
    #[error("serialization failed: {0}")]
    SerializationFail(String),

    #[error("manifest hash mismatch: expected {expected} got {actual}")]
    ManifestHashMismatch { expected: String, actual: String },

    #[error("validation error ({subkind}): {detail}")]
    ValidationError { subkind: String, detail: String },

    #[error("capability missing: {0}")]
    CapabilityMissing(String),

    #[error("policy violation: {0}")]
    PolicyViolation(String),

    #[error("stabilization blocked: {module}/{knob} needs {remaining} more cycle(s)")]
    StabilizationBlocked {
        module: String,
        knob: String,
        remaining: u32,
    },

    #[error("evidence missing: {0}")]
    EvidenceMissing(String),

    #[error("evidence hash mismatch: expected {expected} got {actual}")]
    EvidenceHashMismatch { expected: String, actual: String },

    #[error("bounds violation: {0}")]
    BoundsViolation(String),

    #[error("significance gate failed: {0}")]
    SignificanceGateFailed(String),

    #[error("budget exceeded: {0}")]
    BudgetExceeded(String),

    #[error("ledger append failed: {0}")]
    LedgerAppendFailed(String),

    #[error("ledger corruption detected at idx {idx}: {detail}")]
    LedgerCorruptionDetected { idx: u64, detail: String },

    #[error("drift exceeded threshold: {0}")]
    DriftExceeded(String),

    #[error("cycle timed out at state {0}")]
    CycleTimeout(String),

    #[error("cancelled: {0}")]
    Cancelled(String),
}

impl GovError {
    /// Stable machine-readable tag, suitable for embedding in ledger
    /// payloads or CLI exit diagnostics without leaking the `Display` text
    /// shape (which may change wording over time).
    pub fn kind_tag(&self) -> &'static str {
        match self {
            GovError::SerializationFail(_) => "SerializationFail",
            GovError::ManifestHashMismatch { .. } => "ManifestHashMismatch",
            GovError::ValidationError { .. } => "ValidationError",
            GovError::CapabilityMissing(_) => "CapabilityMissing",
            GovError::PolicyViolation(_) => "PolicyViolation",
            GovError::StabilizationBlocked { .. } => "StabilizationBlocked",
            GovError::EvidenceMissing(_) => "EvidenceMissing",
            GovError::EvidenceHashMismatch { .. } => "EvidenceHashMismatch",
            GovError::BoundsViolation(_) => "BoundsViolation",
            GovError::SignificanceGateFailed(_) => "SignificanceGateFailed",
            GovError::BudgetExceeded(_) => "BudgetExceeded",
            GovError::LedgerAppendFailed(_) => "LedgerAppendFailed",
            GovError::LedgerCorruptionDetected { .. } => "LedgerCorruptionDetected",
            GovError::DriftExceeded(_) => "DriftExceeded",
            GovError::CycleTimeout(_) => "CycleTimeout",
            GovError::Cancelled(_) => "Cancelled",
        }
    }

    /// `LedgerCorruptionDetected` is unconditionally fatal. `SerializationFail`
    /// is only fatal when raised by the ledger writer itself; everywhere else
    /// (e.g. a malformed tuning proposal) it resolves to a per-cycle rejection.
    /// Callers outside the ledger writer should not treat `SerializationFail`
    /// as fatal on the strength of this method alone.
    pub fn is_always_fatal(&self) -> bool {
        matches!(self, GovError::LedgerCorruptionDetected { .. })
    }
}

pub type GovResult<T> = Result<T, GovError>;
