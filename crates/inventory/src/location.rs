//! Storage location record and its capacity/tag invariants.

use serde::{Deserialize, Serialize};

use slotwise_core::{DomainError, DomainResult, Entity, LocationCode};

use crate::classifier::{ZoneCategory, same_destination};

/// Category tag of a physical location; decides which destinations it may store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneType {
    #[serde(rename = "amazon-main-A")]
    AmazonMainA,
    #[serde(rename = "amazon-main-B")]
    AmazonMainB,
    #[serde(rename = "amazon-buffer")]
    AmazonBuffer,
    #[serde(rename = "private")]
    Private,
    #[serde(rename = "platform")]
    Platform,
    #[serde(rename = "express")]
    Express,
    #[serde(rename = "walmart")]
    Walmart,
    #[serde(rename = "high-value")]
    HighValue,
    #[serde(rename = "suspense")]
    Suspense,
}

impl ZoneType {
    /// Zone types tried when the primary pool has no room.
    pub const FALLBACK: [ZoneType; 2] = [ZoneType::AmazonBuffer, ZoneType::Suspense];
}

impl ZoneCategory {
    /// Zone types allowed to hold this category.
    ///
    /// `primary_only` narrows main-zone destinations to `amazon-main-A`; it is
    /// ignored for every other category.
    pub fn zone_types(self, primary_only: bool) -> &'static [ZoneType] {
        match self {
            ZoneCategory::AmazonMain if primary_only => &[ZoneType::AmazonMainA],
            ZoneCategory::AmazonMain => &[ZoneType::AmazonMainA, ZoneType::AmazonMainB],
            ZoneCategory::AmazonBuffer => &[ZoneType::AmazonBuffer],
            ZoneCategory::Express => &[ZoneType::Express],
            ZoneCategory::Walmart => &[ZoneType::Walmart],
            ZoneCategory::Private => &[ZoneType::Private],
            ZoneCategory::Platform => &[ZoneType::Platform],
            ZoneCategory::HighValue => &[ZoneType::HighValue],
            ZoneCategory::Suspense => &[ZoneType::Suspense],
        }
    }
}

/// Utilization as an exact ratio `current / max`; unbounded locations count as empty.
#[derive(Debug, Clone, Copy)]
pub struct Utilization {
    used: u64,
    capacity: u64,
}

impl Utilization {
    fn of(used: u32, capacity: Option<u32>) -> Self {
        match capacity {
            Some(max) if max > 0 => Self {
                used: u64::from(used),
                capacity: u64::from(max),
            },
            // A zero-capacity bin is full by definition.
            Some(_) => Self { used: 1, capacity: 1 },
            None => Self { used: 0, capacity: 1 },
        }
    }
}

impl Ord for Utilization {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        (self.used * other.capacity).cmp(&(other.used * self.capacity))
    }
}

impl PartialEq for Utilization {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for Utilization {}

impl PartialOrd for Utilization {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// One physical storage bin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub code: LocationCode,
    pub zone_type: ZoneType,
    #[serde(default)]
    pub max_pallets: Option<u32>,
    #[serde(default)]
    pub current_pallets: u32,
    #[serde(default)]
    pub current_cartons: u32,
    #[serde(default)]
    pub destination_tags: Vec<String>,
    #[serde(default)]
    pub max_destination_tags: Option<usize>,
}

impl Location {
    /// An empty, unbounded location.
    pub fn new(code: LocationCode, zone_type: ZoneType) -> Self {
        Self {
            code,
            zone_type,
            max_pallets: None,
            current_pallets: 0,
            current_cartons: 0,
            destination_tags: Vec::new(),
            max_destination_tags: None,
        }
    }

    pub fn with_max_pallets(mut self, max: u32) -> Self {
        self.max_pallets = Some(max);
        self
    }

    pub fn with_max_destination_tags(mut self, max: usize) -> Self {
        self.max_destination_tags = Some(max);
        self
    }

    /// Seed stock, e.g. when loading a manually edited snapshot.
    pub fn with_stock(mut self, destination: impl Into<String>, pallets: u32, cartons: u32) -> Self {
        self.add_tag(&destination.into());
        self.current_pallets += pallets;
        self.current_cartons += cartons;
        self
    }

    /// Free pallet slots; `None` means unbounded. Over-capacity reads as zero.
    pub fn remaining_capacity(&self) -> Option<u32> {
        self.max_pallets
            .map(|max| max.saturating_sub(self.current_pallets))
    }

    /// Whether `pallets` more would still respect `max_pallets`.
    pub fn fits(&self, pallets: u32) -> bool {
        self.remaining_capacity().is_none_or(|free| free >= pallets)
    }

    /// Pallets above capacity left behind by manual edits.
    pub fn overflow(&self) -> Option<u32> {
        self.max_pallets
            .filter(|max| self.current_pallets > *max)
            .map(|max| self.current_pallets - max)
    }

    /// Whether a tag naming the same logical destination is stored here.
    pub fn holds(&self, destination: &str) -> bool {
        self.matching_tag(destination).is_some()
    }

    /// Position of the tag that normalizes like `destination`.
    pub fn matching_tag(&self, destination: &str) -> Option<usize> {
        self.destination_tags
            .iter()
            .position(|tag| same_destination(tag, destination))
    }

    /// Whether one more distinct destination may be tagged here.
    pub fn tag_budget_available(&self) -> bool {
        self.max_destination_tags
            .is_none_or(|max| self.destination_tags.len() < max)
    }

    /// Tag rule of the assignment filter: already holds it, or has room for it.
    pub fn accepts(&self, destination: &str) -> bool {
        self.holds(destination) || self.tag_budget_available()
    }

    pub fn utilization(&self) -> Utilization {
        Utilization::of(self.current_pallets, self.max_pallets)
    }

    /// Add `destination` unless an equivalent tag is already present.
    pub fn add_tag(&mut self, destination: &str) -> bool {
        if self.holds(destination) {
            return false;
        }
        self.destination_tags.push(destination.trim().to_string());
        true
    }

    /// Remove the tag matching `destination`, returning it.
    pub fn remove_tag(&mut self, destination: &str) -> Option<String> {
        self.matching_tag(destination)
            .map(|idx| self.destination_tags.remove(idx))
    }

    /// Drop every tag and carton once a location is empty.
    pub(crate) fn clear_if_empty(&mut self) -> Vec<String> {
        if self.current_pallets > 0 {
            return Vec::new();
        }
        self.current_cartons = 0;
        std::mem::take(&mut self.destination_tags)
    }

    /// Structural checks for a record entering the engine.
    pub fn validate(&self) -> DomainResult<()> {
        let mut seen: Vec<String> = Vec::with_capacity(self.destination_tags.len());
        for tag in &self.destination_tags {
            let normalized = crate::classifier::normalize_destination(tag);
            if normalized.is_empty() {
                return Err(DomainError::validation(format!(
                    "location {} carries a blank destination tag",
                    self.code
                )));
            }
            if seen.contains(&normalized) {
                return Err(DomainError::invariant(format!(
                    "location {} carries duplicate destination tag {tag}",
                    self.code
                )));
            }
            seen.push(normalized);
        }
        Ok(())
    }
}

impl Entity for Location {
    type Id = LocationCode;

    fn id(&self) -> &Self::Id {
        &self.code
    }
}
