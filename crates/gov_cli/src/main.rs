// crates/gov_cli/src/main.rs
//
// govctl — offline, deterministic CLI for the governance/tuning plane.
// Drives the four operator-facing actions (spec §6): lint a manifest,
// relock it after an authoring edit, tick one cycle, verify the ledger
// chain. No network, no subprocess, no OS RNG.

mod args;
mod commands;
mod config;

use std::process::ExitCode;

use args::{Args, Command, CycleAction, EvidenceAction, LedgerAction, TopologyAction};
use clap::Parser;

fn main() -> ExitCode {
    init_tracing();

    let args = Args::parse();
    match args.command {
        Command::Topology { action: TopologyAction::Lint { manifest } } => {
            commands::topology_lint(&manifest)
        }
        Command::Evidence { action: EvidenceAction::Relock { bundle, state } } => {
            commands::evidence_relock(&bundle, &state)
        }
        Command::Cycle { action: CycleAction::Tick { state } } => commands::cycle_tick(&state),
        Command::Ledger { action: LedgerAction::Verify { state } } => commands::ledger_verify(&state),
    }
}

/// `DEV_LOG_PAYLOAD=1` switches ledger payload logging from hash-only to
/// full (spec §6 "Environment"); it only loosens what `tracing` emits, it
/// never changes ledger contents.
fn init_tracing() {
    let dev_payload = std::env::var("DEV_LOG_PAYLOAD").as_deref() == Ok("1");
    let default_filter = if dev_payload { "gov_cli=debug,gov_ledger=debug,info" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}
