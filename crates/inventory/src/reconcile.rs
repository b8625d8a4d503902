//! Outbound reconciliation: remove shipped stock from locations and the ledger.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use slotwise_core::{ContainerId, LocationCode};

use crate::audit::{AuditEntry, AuditKind};
use crate::demand::OutboundLine;
use crate::ledger::{ContainerLedger, LedgerDeduction};
use crate::location::Location;
use crate::snapshot::WarehouseSnapshot;

/// Why an outbound row was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    #[error("location is missing")]
    MissingLocation,

    #[error("destination is missing")]
    MissingDestination,

    #[error("pallet count must be positive (got {pallets})")]
    NonPositivePallets { pallets: i64 },

    #[error("location {location} does not exist")]
    UnknownLocation { location: String },

    #[error("location {location} does not store {destination}")]
    DestinationNotStored { location: String, destination: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    /// Zero-based position in the outbound batch.
    pub row: usize,
    pub reason: SkipReason,
}

/// One outbound row as applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedDeduction {
    pub row: usize,
    pub location: LocationCode,
    /// The location's tag the row matched.
    pub destination: String,
    pub pallets: u32,
    pub cartons: u32,
    /// Location reached zero pallets and was cleared.
    pub emptied: bool,
    pub ledger: LedgerDeduction,
    /// The named container had no ledger entry for this destination.
    pub ledger_miss: bool,
    pub container_id: Option<ContainerId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub pallets_deducted: u64,
    pub cartons_deducted: u64,
    pub applied: Vec<AppliedDeduction>,
    pub skipped: Vec<SkippedLine>,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    /// One-line text for user notification.
    pub fn summary(&self) -> String {
        let mut text = format!(
            "deducted {} pallets / {} cartons over {} rows",
            self.pallets_deducted,
            self.cartons_deducted,
            self.applied.len()
        );
        if !self.skipped.is_empty() {
            let reasons: Vec<String> = self
                .skipped
                .iter()
                .map(|s| format!("row {}: {}", s.row + 1, s.reason))
                .collect();
            text.push_str(&format!("; skipped {} ({})", self.skipped.len(), reasons.join("; ")));
        }
        text
    }
}

/// Result of `reconcile_snapshot`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub snapshot: WarehouseSnapshot,
    pub report: ReconciliationReport,
    pub audit: Vec<AuditEntry>,
}

/// Cartons leaving with `pallets`: explicit count if given, else the
/// proportional share `ceil(pallets / current_pallets * current_cartons)`.
fn carton_deduction(loc: &Location, pallets: u32, explicit: Option<i64>) -> u32 {
    match explicit {
        Some(cartons) if cartons >= 0 => {
            u32::try_from(cartons).unwrap_or(u32::MAX).min(loc.current_cartons)
        }
        _ if loc.current_pallets == 0 => 0,
        _ => {
            let share = (u64::from(pallets) * u64::from(loc.current_cartons))
                .div_ceil(u64::from(loc.current_pallets));
            u32::try_from(share).unwrap_or(u32::MAX).min(loc.current_cartons)
        }
    }
}

fn check_line(line: &OutboundLine) -> Result<u32, SkipReason> {
    if line.location.trim().is_empty() {
        return Err(SkipReason::MissingLocation);
    }
    if line.destination.trim().is_empty() {
        return Err(SkipReason::MissingDestination);
    }
    if line.pallets <= 0 {
        return Err(SkipReason::NonPositivePallets {
            pallets: line.pallets,
        });
    }
    Ok(u32::try_from(line.pallets).unwrap_or(u32::MAX))
}

fn apply_line(
    row: usize,
    line: &OutboundLine,
    locations: &mut [Location],
    ledger: &mut ContainerLedger,
) -> Result<AppliedDeduction, SkipReason> {
    let requested = check_line(line)?;
    let wanted_code = line.location.trim();

    let loc = locations
        .iter_mut()
        .find(|loc| loc.code.as_str() == wanted_code)
        .ok_or_else(|| SkipReason::UnknownLocation {
            location: wanted_code.to_string(),
        })?;

    let tag_idx = loc
        .matching_tag(&line.destination)
        .ok_or_else(|| SkipReason::DestinationNotStored {
            location: wanted_code.to_string(),
            destination: line.destination.trim().to_string(),
        })?;
    let tag = loc.destination_tags[tag_idx].clone();

    let pallets = requested.min(loc.current_pallets);
    let cartons = carton_deduction(loc, pallets, line.cartons);
    loc.current_pallets -= pallets;
    loc.current_cartons -= cartons;

    let emptied = loc.current_pallets == 0;
    if emptied {
        loc.remove_tag(&tag);
        let stale = loc.clear_if_empty();
        if !stale.is_empty() {
            warn!(location = %loc.code, ?stale, "cleared tags left on an empty location");
        }
    }

    let container_id = line.container();
    let (ledger_deduction, ledger_miss) = match &container_id {
        _ if pallets == 0 && cartons == 0 => (LedgerDeduction::default(), false),
        Some(container) => match ledger.deduct_container(&tag, container, pallets, cartons) {
            Some(deduction) => (deduction, false),
            None => {
                warn!(row, %container, destination = %tag, "container not in ledger; ledger unchanged");
                (LedgerDeduction::default(), true)
            }
        },
        None => (ledger.deduct_fifo(&tag, pallets, cartons), false),
    };

    debug!(row, location = %loc.code, destination = %tag, pallets, cartons, emptied, "outbound row applied");

    Ok(AppliedDeduction {
        row,
        location: loc.code.clone(),
        destination: tag,
        pallets,
        cartons,
        emptied,
        ledger: ledger_deduction,
        ledger_miss,
        container_id,
    })
}

/// Deduct shipped stock. Inputs are not modified; updated copies are returned.
///
/// Every deduction is clamped at the stock present, so re-applying a row that
/// was already applied cannot drive counters negative. Guarding against a
/// whole document being submitted twice is the caller's job.
#[tracing::instrument(skip_all, fields(lines = lines.len(), locations = locations.len()))]
pub fn reconcile(
    lines: &[OutboundLine],
    locations: &[Location],
    ledger: &ContainerLedger,
) -> (Vec<Location>, ContainerLedger, ReconciliationReport) {
    let mut locations = locations.to_vec();
    let mut ledger = ledger.clone();
    let mut report = ReconciliationReport::default();

    for (row, line) in lines.iter().enumerate() {
        match apply_line(row, line, &mut locations, &mut ledger) {
            Ok(applied) => {
                report.pallets_deducted += u64::from(applied.pallets);
                report.cartons_deducted += u64::from(applied.cartons);
                report.applied.push(applied);
            }
            Err(reason) => {
                warn!(row, %reason, "outbound row skipped");
                report.skipped.push(SkippedLine { row, reason });
            }
        }
    }

    info!(
        applied = report.applied.len(),
        skipped = report.skipped.len(),
        pallets = report.pallets_deducted,
        "outbound reconciliation finished"
    );
    (locations, ledger, report)
}

/// `reconcile` over a snapshot, with audit lines stamped `occurred_at`.
pub fn reconcile_snapshot(
    lines: &[OutboundLine],
    snapshot: &WarehouseSnapshot,
    occurred_at: DateTime<Utc>,
) -> ReconcileOutcome {
    let (locations, ledger, report) = reconcile(lines, &snapshot.locations, &snapshot.ledger);

    let mut audit: Vec<AuditEntry> = report
        .applied
        .iter()
        .map(|a| {
            let entry = AuditEntry::new(occurred_at, AuditKind::OutboundDeducted, a.destination.clone())
                .at(a.location.clone())
                .quantities(a.pallets, a.cartons)
                .container(a.container_id.clone());
            if a.ledger_miss {
                entry.note("container not found in ledger")
            } else if a.emptied {
                entry.note("location emptied")
            } else {
                entry
            }
        })
        .chain(report.skipped.iter().map(|s| {
            let line = &lines[s.row];
            AuditEntry::new(occurred_at, AuditKind::OutboundSkipped, line.destination.trim())
                .note(format!("row {}: {}", s.row + 1, s.reason))
        }))
        .collect();
    audit.sort_by_key(|entry| entry.kind == AuditKind::OutboundSkipped);

    ReconcileOutcome {
        snapshot: WarehouseSnapshot { locations, ledger },
        report,
        audit,
    }
}
