//! gov_io — canonicalizer (C1), SHA-256 hashing, and atomic canonical-JSON
//! file I/O shared by every crate that persists an artifact
//! (`gov_ledger`, `gov_topology`, `gov_stats`, `gov_tuning`).

#![forbid(unsafe_code)]

pub mod atomic;
pub mod canon;
pub mod error;

pub use error::IoError;

pub mod prelude {
    pub use crate::atomic::write_canonical_file;
    pub use crate::canon::{canonical_bytes, hash_canonical, to_canon_value};
    pub use crate::error::IoError;
}
