//! gov_ledger — the append-only, tail-hash-chained evidence ledger (C2).
//!
//! The ledger is the only globally shared mutable resource in the engine
//! (spec §5): a single writer appends, any number of readers replay. This
//! crate models that as explicit handles (`LedgerWriter`, `LedgerReader`),
//! not as a singleton — callers choose their own concurrency wrapper.

#![forbid(unsafe_code)]

pub mod entry;
pub mod reader;
pub mod writer;

pub use entry::{EntryType, LedgerEntry};
pub use reader::LedgerReader;
pub use writer::{LedgerHandle, LedgerWriter};
