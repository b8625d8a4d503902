//! Slot allocation and inventory reconciliation engine.
//!
//! Pure, deterministic domain logic over in-memory location records and the
//! container ledger (no IO, no persistence, no UI). Intake batches flow
//! through [`SlotAllocator`]; outbound batches through [`reconcile`].

pub mod assignment;
pub mod audit;
pub mod classifier;
pub mod config;
pub mod demand;
pub mod ledger;
pub mod location;
pub mod reconcile;
pub mod snapshot;

pub use assignment::{
    AllocationOutcome, AssignedLine, AssignmentMode, AssignmentOutcome, Route, SlotAllocator, assign,
};
pub use audit::{AuditEntry, AuditKind};
pub use classifier::{ZoneCategory, classify, normalize_destination, same_destination};
pub use config::AllocationConfig;
pub use demand::{DemandBatch, DemandLine, OutboundLine, Placement, SubAssignment, ValidDemand};
pub use ledger::{ContainerEntry, ContainerLedger, LedgerDeduction, LedgerDiscrepancy};
pub use location::{Location, Utilization, ZoneType};
pub use reconcile::{
    AppliedDeduction, ReconcileOutcome, ReconciliationReport, SkipReason, SkippedLine, reconcile,
    reconcile_snapshot,
};
pub use snapshot::WarehouseSnapshot;
