//! Warehouse snapshot: the location records plus the container ledger.

use serde::{Deserialize, Serialize};

use slotwise_core::{DomainError, DomainResult, LocationCode, find_duplicate_id};

use crate::ledger::{ContainerLedger, LedgerDiscrepancy};
use crate::location::Location;

/// Everything both engine algorithms read and produce.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseSnapshot {
    pub locations: Vec<Location>,
    #[serde(default, rename = "containerLedger")]
    pub ledger: ContainerLedger,
}

impl WarehouseSnapshot {
    pub fn new(locations: Vec<Location>) -> Self {
        Self {
            locations,
            ledger: ContainerLedger::new(),
        }
    }

    pub fn with_ledger(mut self, ledger: ContainerLedger) -> Self {
        self.ledger = ledger;
        self
    }

    /// Reject snapshots the engine cannot key by location code.
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(code) = find_duplicate_id(&self.locations) {
            return Err(DomainError::conflict(format!("duplicate location code {code}")));
        }
        self.locations.iter().try_for_each(Location::validate)
    }

    pub fn location(&self, code: &str) -> Option<&Location> {
        self.locations.iter().find(|loc| loc.code.as_str() == code)
    }

    /// Locations above their capacity, with the excess.
    pub fn over_capacity(&self) -> Vec<(LocationCode, u32)> {
        self.locations
            .iter()
            .filter_map(|loc| loc.overflow().map(|excess| (loc.code.clone(), excess)))
            .collect()
    }

    pub fn ledger_discrepancies(&self) -> Vec<LedgerDiscrepancy> {
        self.ledger.check_consistency(&self.locations)
    }
}
