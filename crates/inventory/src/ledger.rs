//! Container ledger: per destination, how many pallets/cartons came from which container.
//!
//! Derived bookkeeping kept in step with location occupancy. Containers of a
//! destination keep their recording order, which is the order FIFO deduction
//! consumes them in.

use std::collections::BTreeMap;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use slotwise_core::ContainerId;

use crate::classifier::same_destination;
use crate::location::Location;

/// Stock attributed to one container for one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEntry {
    pub container_id: ContainerId,
    pub pallets: u32,
    pub cartons: u32,
}

/// What a ledger deduction actually removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LedgerDeduction {
    pub pallets: u32,
    pub cartons: u32,
    /// Containers whose counters changed, in the order they were consumed.
    pub touched: Vec<ContainerId>,
}

/// A destination whose ledger total exceeds the stock located for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerDiscrepancy {
    pub destination: String,
    pub ledger_pallets: u64,
    pub located_pallets: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Containers(Vec<ContainerEntry>);

/// `destination -> containerId -> {pallets, cartons}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ContainerLedger {
    destinations: BTreeMap<String, Containers>,
}

impl Containers {
    fn find_mut(&mut self, container_id: &ContainerId) -> Option<&mut ContainerEntry> {
        self.0
            .iter_mut()
            .find(|entry| entry.container_id.matches(container_id))
    }

    fn add(&mut self, container_id: &ContainerId, pallets: u32, cartons: u32) {
        match self.find_mut(container_id) {
            Some(entry) => {
                entry.pallets = entry.pallets.saturating_add(pallets);
                entry.cartons = entry.cartons.saturating_add(cartons);
            }
            None => self.0.push(ContainerEntry {
                container_id: container_id.clone(),
                pallets,
                cartons,
            }),
        }
    }

    fn prune(&mut self) {
        self.0.retain(|entry| entry.pallets > 0);
    }

    fn pallets(&self) -> u64 {
        self.0.iter().map(|entry| u64::from(entry.pallets)).sum()
    }
}

impl ContainerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    /// Destination keys, sorted.
    pub fn destinations(&self) -> impl Iterator<Item = &str> {
        self.destinations.keys().map(String::as_str)
    }

    fn key_for(&self, destination: &str) -> Option<String> {
        self.destinations
            .keys()
            .find(|key| same_destination(key, destination))
            .cloned()
    }

    /// Containers recorded for `destination`, in FIFO order.
    pub fn containers(&self, destination: &str) -> &[ContainerEntry] {
        self.key_for(destination)
            .and_then(|key| self.destinations.get(&key))
            .map(|containers| containers.0.as_slice())
            .unwrap_or(&[])
    }

    /// Total pallets attributed to `destination` across its containers.
    pub fn destination_total(&self, destination: &str) -> u64 {
        self.key_for(destination)
            .and_then(|key| self.destinations.get(&key))
            .map(Containers::pallets)
            .unwrap_or(0)
    }

    /// Additive merge of one container's contribution to a destination.
    pub fn record(&mut self, destination: &str, container_id: &ContainerId, pallets: u32, cartons: u32) {
        let key = self
            .key_for(destination)
            .unwrap_or_else(|| destination.trim().to_string());
        let containers = self.destinations.entry(key.clone()).or_default();
        containers.add(container_id, pallets, cartons);
        containers.prune();
        if containers.0.is_empty() {
            self.destinations.remove(&key);
        }
    }

    /// Deduct from one named container. `None` when the ledger has no such entry.
    pub fn deduct_container(
        &mut self,
        destination: &str,
        container_id: &ContainerId,
        pallets: u32,
        cartons: u32,
    ) -> Option<LedgerDeduction> {
        let key = self.key_for(destination)?;
        let containers = self.destinations.get_mut(&key)?;
        let entry = containers.find_mut(container_id)?;

        let taken_pallets = pallets.min(entry.pallets);
        let taken_cartons = cartons.min(entry.cartons);
        entry.pallets -= taken_pallets;
        entry.cartons -= taken_cartons;
        let touched = vec![entry.container_id.clone()];

        self.settle(&key);
        Some(LedgerDeduction {
            pallets: taken_pallets,
            cartons: taken_cartons,
            touched,
        })
    }

    /// Deduct across the destination's containers oldest first.
    ///
    /// Pallets and cartons are consumed independently, each until its own
    /// amount is exhausted.
    pub fn deduct_fifo(&mut self, destination: &str, pallets: u32, cartons: u32) -> LedgerDeduction {
        let Some(key) = self.key_for(destination) else {
            return LedgerDeduction::default();
        };
        let Some(containers) = self.destinations.get_mut(&key) else {
            return LedgerDeduction::default();
        };

        let mut deduction = LedgerDeduction::default();
        let mut pallets_left = pallets;
        let mut cartons_left = cartons;

        for entry in containers.0.iter_mut() {
            if pallets_left == 0 && cartons_left == 0 {
                break;
            }
            let take_pallets = pallets_left.min(entry.pallets);
            let take_cartons = cartons_left.min(entry.cartons);
            if take_pallets == 0 && take_cartons == 0 {
                continue;
            }
            entry.pallets -= take_pallets;
            entry.cartons -= take_cartons;
            pallets_left -= take_pallets;
            cartons_left -= take_cartons;
            deduction.pallets += take_pallets;
            deduction.cartons += take_cartons;
            deduction.touched.push(entry.container_id.clone());
        }

        self.settle(&key);
        deduction
    }

    fn settle(&mut self, key: &str) {
        if let Some(containers) = self.destinations.get_mut(key) {
            containers.prune();
            if containers.0.is_empty() {
                self.destinations.remove(key);
            }
        }
    }

    /// Destinations whose ledger pallets exceed the pallets of locations tagged with them.
    pub fn check_consistency(&self, locations: &[Location]) -> Vec<LedgerDiscrepancy> {
        self.destinations
            .iter()
            .filter_map(|(destination, containers)| {
                let ledger_pallets = containers.pallets();
                let located_pallets: u64 = locations
                    .iter()
                    .filter(|loc| loc.holds(destination))
                    .map(|loc| u64::from(loc.current_pallets))
                    .sum();
                (ledger_pallets > located_pallets).then(|| LedgerDiscrepancy {
                    destination: destination.clone(),
                    ledger_pallets,
                    located_pallets,
                })
            })
            .collect()
    }
}

#[derive(Serialize)]
struct WireCounts {
    pallets: u32,
    cartons: u32,
}

/// Per-container value as stored; early snapshots kept a bare pallet count.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireValue {
    Legacy(u32),
    Counts {
        pallets: u32,
        #[serde(default)]
        cartons: u32,
    },
}

impl Serialize for Containers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in &self.0 {
            map.serialize_entry(
                entry.container_id.as_str(),
                &WireCounts {
                    pallets: entry.pallets,
                    cartons: entry.cartons,
                },
            )?;
        }
        map.end()
    }
}

struct ContainersVisitor;

impl<'de> Visitor<'de> for ContainersVisitor {
    type Value = Containers;

    fn expecting(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("a map of container ids to pallet counts")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut containers = Containers::default();
        while let Some((container_id, value)) = access.next_entry::<ContainerId, WireValue>()? {
            let (pallets, cartons) = match value {
                WireValue::Legacy(pallets) => (pallets, 0),
                WireValue::Counts { pallets, cartons } => (pallets, cartons),
            };
            containers.add(&container_id, pallets, cartons);
        }
        containers.prune();
        Ok(containers)
    }
}

impl<'de> Deserialize<'de> for Containers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ContainersVisitor)
    }
}

impl<'de> Deserialize<'de> for ContainerLedger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut destinations = BTreeMap::<String, Containers>::deserialize(deserializer)?;
        destinations.retain(|_, containers| !containers.0.is_empty());
        Ok(Self { destinations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::ZoneType;
    use slotwise_core::LocationCode;

    fn cid(raw: &str) -> ContainerId {
        ContainerId::new(raw).unwrap()
    }

    fn ledger_with(entries: &[(&str, &str, u32, u32)]) -> ContainerLedger {
        let mut ledger = ContainerLedger::new();
        for (destination, container, pallets, cartons) in entries {
            ledger.record(destination, &cid(container), *pallets, *cartons);
        }
        ledger
    }

    #[test]
    fn record_merges_existing_pairs() {
        let ledger = ledger_with(&[("XLX7", "C1", 4, 40), ("XLX7", "c1", 2, 10), ("XLX7", "C2", 1, 5)]);
        let containers = ledger.containers("XLX7");
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].pallets, 6);
        assert_eq!(containers[0].cartons, 50);
        assert_eq!(ledger.destination_total("fba-xlx7"), 7);
    }

    #[test]
    fn zero_pallet_records_are_not_kept() {
        let ledger = ledger_with(&[("XLX7", "C1", 0, 12)]);
        assert!(ledger.is_empty());
    }

    #[test]
    fn fifo_consumes_oldest_container_first() {
        let mut ledger = ledger_with(&[("XLX7", "C1", 10, 0), ("XLX7", "C2", 5, 0)]);
        let taken = ledger.deduct_fifo("XLX7", 12, 0);
        assert_eq!(taken.pallets, 12);
        assert_eq!(taken.touched, vec![cid("C1"), cid("C2")]);

        let containers = ledger.containers("XLX7");
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].container_id, cid("C2"));
        assert_eq!(containers[0].pallets, 3);
    }

    #[test]
    fn fifo_cartons_are_consumed_independently() {
        let mut ledger = ledger_with(&[("XLX7", "C1", 2, 5), ("XLX7", "C2", 3, 30)]);
        let taken = ledger.deduct_fifo("XLX7", 1, 12);
        assert_eq!(taken.pallets, 1);
        assert_eq!(taken.cartons, 12);
        let containers = ledger.containers("XLX7");
        assert_eq!((containers[0].pallets, containers[0].cartons), (1, 0));
        assert_eq!((containers[1].pallets, containers[1].cartons), (3, 23));
    }

    #[test]
    fn emptied_destination_is_removed() {
        let mut ledger = ledger_with(&[("XLX7", "C1", 3, 0), ("ONT8", "C1", 1, 0)]);
        ledger.deduct_fifo("XLX7", 10, 0);
        assert_eq!(ledger.destinations().collect::<Vec<_>>(), vec!["ONT8"]);
    }

    #[test]
    fn named_container_matches_case_insensitively() {
        let mut ledger = ledger_with(&[("XLX7", "MSKU1", 4, 8), ("XLX7", "MSKU2", 4, 8)]);
        let taken = ledger.deduct_container("XLX7", &cid("msku2"), 4, 100).unwrap();
        assert_eq!((taken.pallets, taken.cartons), (4, 8));
        let containers = ledger.containers("XLX7");
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].container_id, cid("MSKU1"));
        assert!(ledger.deduct_container("XLX7", &cid("NOPE"), 1, 0).is_none());
    }

    #[test]
    fn legacy_bare_counts_are_normalized() {
        let json = r#"{"XLX7": {"C9": 7, "C1": {"pallets": 2, "cartons": 20}, "C5": 0}, "ONT8": {"C3": 0}}"#;
        let ledger: ContainerLedger = serde_json::from_str(json).unwrap();
        let containers = ledger.containers("XLX7");
        // Document order is kept, zero entries are dropped.
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].container_id, cid("C9"));
        assert_eq!((containers[0].pallets, containers[0].cartons), (7, 0));

        assert!(ledger.containers("ONT8").is_empty());
        assert_eq!(ledger.destinations().count(), 1);

        let out = serde_json::to_value(&ledger).unwrap();
        assert_eq!(out["XLX7"]["C9"], serde_json::json!({"pallets": 7, "cartons": 0}));
    }

    #[test]
    fn consistency_check_flags_unbacked_ledger_stock() {
        let ledger = ledger_with(&[("XLX7", "C1", 10, 0), ("ONT8", "C1", 2, 0)]);
        let locations = vec![
            Location::new(LocationCode::new("A01").unwrap(), ZoneType::AmazonMainA)
                .with_stock("XLX7", 6, 0),
            Location::new(LocationCode::new("A02").unwrap(), ZoneType::AmazonMainA)
                .with_stock("ONT8", 2, 0),
        ];
        let issues = ledger.check_consistency(&locations);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].destination, "XLX7");
        assert_eq!((issues[0].ledger_pallets, issues[0].located_pallets), (10, 6));
    }
}
