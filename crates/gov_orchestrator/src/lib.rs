//! gov_orchestrator — the cycle orchestrator (C11): the `CycleState`
//! machine, the overlay-invocation seam, cancellation, and the driver that
//! threads one cycle through the optimizer and canary engine.

#![forbid(unsafe_code)]

pub mod cancellation;
pub mod cycle;
pub mod overlay;
pub mod state;

pub use cancellation::CancellationToken;
pub use cycle::{CycleConfig, CycleDriver, CycleOutcome, Observation};
pub use overlay::{OverlayError, OverlayInvocation, OverlayInvoker, OverlayManifest, OverlayOutcome};
pub use state::CycleState;
