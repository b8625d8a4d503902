//! `slotwise`: run slot allocation or outbound reconciliation over JSON snapshots.

mod config;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde::de::DeserializeOwned;

use slotwise_inventory::{
    AssignmentMode, DemandBatch, OutboundLine, SlotAllocator, WarehouseSnapshot, reconcile_snapshot,
};

#[derive(Debug, Parser)]
#[command(name = "slotwise", version, about = "Warehouse slot allocation and outbound reconciliation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Assign an intake batch to locations and commit it.
    Assign {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        batch: PathBuf,
        #[arg(long, default_value = "automatic")]
        mode: AssignmentMode,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Deduct an outbound batch from locations and the container ledger.
    Reconcile {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        outbound: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Validate a snapshot and report capacity and ledger problems.
    Check {
        #[arg(long)]
        snapshot: PathBuf,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckReport {
    over_capacity: Vec<(String, u32)>,
    ledger_discrepancies: Vec<slotwise_inventory::LedgerDiscrepancy>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn write_json<T: Serialize>(value: &T, out: Option<&Path>) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => fs::write(path, text).with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

fn load_snapshot(path: &Path) -> anyhow::Result<WarehouseSnapshot> {
    let snapshot: WarehouseSnapshot = read_json(path)?;
    snapshot
        .validate()
        .with_context(|| format!("invalid snapshot {}", path.display()))?;
    Ok(snapshot)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Assign {
            snapshot,
            batch,
            mode,
            out,
        } => {
            let allocator = SlotAllocator::new(config::allocation_config_from_env()?);
            tracing::debug!(config = ?allocator.config(), "allocation config loaded");
            let current = load_snapshot(&snapshot)?;
            let batch: DemandBatch = read_json(&batch)?;
            let outcome = allocator.allocate(&batch, &current, mode, Utc::now());
            for entry in &outcome.audit {
                tracing::info!(audit = %entry, "audit");
            }
            write_json(
                &serde_json::json!({
                    "snapshot": outcome.snapshot,
                    "lines": outcome.lines,
                    "audit": outcome.audit,
                    "overCapacity": outcome.over_capacity,
                }),
                out.as_deref(),
            )
        }
        Command::Reconcile {
            snapshot,
            outbound,
            out,
        } => {
            let current = load_snapshot(&snapshot)?;
            let lines: Vec<OutboundLine> = read_json(&outbound)?;
            let outcome = reconcile_snapshot(&lines, &current, Utc::now());
            tracing::info!(summary = %outcome.report.summary(), "reconciliation");
            write_json(
                &serde_json::json!({
                    "snapshot": outcome.snapshot,
                    "report": outcome.report,
                    "audit": outcome.audit,
                }),
                out.as_deref(),
            )
        }
        Command::Check { snapshot } => {
            let current = load_snapshot(&snapshot)?;
            let report = CheckReport {
                over_capacity: current
                    .over_capacity()
                    .into_iter()
                    .map(|(code, excess)| (code.to_string(), excess))
                    .collect(),
                ledger_discrepancies: current.ledger_discrepancies(),
            };
            let clean = report.over_capacity.is_empty() && report.ledger_discrepancies.is_empty();
            write_json(&report, None)?;
            if !clean {
                bail!("snapshot {} has capacity or ledger problems", snapshot.display());
            }
            Ok(())
        }
    }
}

fn main() -> anyhow::Result<()> {
    slotwise_observability::init();
    run(Cli::parse())
}
