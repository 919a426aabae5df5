//! CLI argument surface (spec §6). Four subcommands, one per governance
//! lifecycle action: lint a manifest, relock a manifest after an authoring
//! edit, drive one cycle, replay the ledger chain.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "govctl", about = "Offline governance/tuning plane CLI")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate a YGGDRASIL manifest against the membrane invariants.
    Topology {
        #[command(subcommand)]
        action: TopologyAction,
    },
    /// Evidence-bundle operations.
    Evidence {
        #[command(subcommand)]
        action: EvidenceAction,
    },
    /// Drive one governance cycle end to end.
    Cycle {
        #[command(subcommand)]
        action: CycleAction,
    },
    /// Ledger operations.
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum TopologyAction {
    /// Exit 0 clean, 2 file missing, 3 hash mismatch, 4 validation fail, 5 forbidden crossing.
    Lint {
        #[arg(long)]
        manifest: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
pub enum EvidenceAction {
    /// Re-hash a manifest after an authoring change to its nodes/links.
    Relock {
        #[arg(long)]
        bundle: PathBuf,
        /// State directory holding `evidence_ledger.jsonl`, so the relock is
        /// recorded as a `manifest_relocked` entry.
        #[arg(long)]
        state: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
pub enum CycleAction {
    /// Run one cycle against a state directory.
    Tick {
        #[arg(long)]
        state: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
pub enum LedgerAction {
    /// Replay the tail-hash chain; non-zero exit on mismatch.
    Verify {
        #[arg(long)]
        state: PathBuf,
    },
}
