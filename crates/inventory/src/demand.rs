//! Batch input lines: intake demand and outbound shipments.

use serde::{Deserialize, Serialize};

use slotwise_core::{ContainerId, DomainError, DomainResult, LocationCode};

/// One slice of a split placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubAssignment {
    pub location: LocationCode,
    pub pallets: u32,
    pub cartons: u32,
}

/// Where a demand line's pallets went.
///
/// Serialized as a bare location code or as a list of sub-assignments, the
/// shape exported back into intake sheets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Placement {
    Single(LocationCode),
    Split(Vec<SubAssignment>),
}

impl Placement {
    /// Per-location quantities; a single placement takes the whole line.
    pub fn parts(&self, pallets: u32, cartons: u32) -> Vec<SubAssignment> {
        match self {
            Placement::Single(location) => vec![SubAssignment {
                location: location.clone(),
                pallets,
                cartons,
            }],
            Placement::Split(parts) => parts.clone(),
        }
    }

    /// A carried split must account for exactly the line's pallets, with no empty parts.
    pub fn check_covers(&self, pallets: u32) -> DomainResult<()> {
        let Placement::Split(parts) = self else {
            return Ok(());
        };
        if parts.is_empty() {
            return Err(DomainError::validation("split placement has no parts"));
        }
        if let Some(empty) = parts.iter().find(|p| p.pallets == 0) {
            return Err(DomainError::validation(format!(
                "split part at {} carries no pallets",
                empty.location
            )));
        }
        let total: u64 = parts.iter().map(|p| u64::from(p.pallets)).sum();
        if total != u64::from(pallets) {
            return Err(DomainError::validation(format!(
                "split parts hold {total} pallets but the line has {pallets}"
            )));
        }
        Ok(())
    }

    pub fn locations(&self) -> Vec<&LocationCode> {
        match self {
            Placement::Single(location) => vec![location],
            Placement::Split(parts) => parts.iter().map(|p| &p.location).collect(),
        }
    }
}

/// One intake row: pallets for a destination, unloaded from a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandLine {
    pub sequence_index: usize,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub pallets: i64,
    #[serde(default)]
    pub cartons: Option<i64>,
    #[serde(default)]
    pub container_id: Option<String>,
    /// Placement carried over from a previous export.
    #[serde(default)]
    pub assigned: Option<Placement>,
}

/// Quantities of a demand line that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidDemand {
    pub pallets: u32,
    pub cartons: u32,
}

impl DemandLine {
    pub fn new(sequence_index: usize, destination: impl Into<String>, pallets: i64) -> Self {
        Self {
            sequence_index,
            destination: destination.into(),
            pallets,
            cartons: None,
            container_id: None,
            assigned: None,
        }
    }

    pub fn with_cartons(mut self, cartons: i64) -> Self {
        self.cartons = Some(cartons);
        self
    }

    pub fn with_container(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = Some(container_id.into());
        self
    }

    pub fn with_assigned(mut self, placement: Placement) -> Self {
        self.assigned = Some(placement);
        self
    }

    pub fn validate(&self) -> DomainResult<ValidDemand> {
        if self.destination.trim().is_empty() {
            return Err(DomainError::validation("destination cannot be empty"));
        }
        if self.pallets <= 0 {
            return Err(DomainError::validation(format!(
                "pallets must be positive (got {})",
                self.pallets
            )));
        }
        let pallets = u32::try_from(self.pallets)
            .map_err(|_| DomainError::validation(format!("pallets out of range ({})", self.pallets)))?;
        let cartons = match self.cartons {
            None => 0,
            Some(c) if c < 0 => {
                return Err(DomainError::validation(format!(
                    "cartons cannot be negative (got {c})"
                )));
            }
            Some(c) => u32::try_from(c)
                .map_err(|_| DomainError::validation(format!("cartons out of range ({c})")))?,
        };
        Ok(ValidDemand { pallets, cartons })
    }

    /// Container this line is attributed to, if it names a usable one.
    pub fn container(&self) -> Option<ContainerId> {
        self.container_id
            .as_deref()
            .and_then(|raw| ContainerId::new(raw).ok())
    }
}

/// Intake batch as delivered by the spreadsheet collaborator.
///
/// The container number usually sits in the sheet header, so it is shared by
/// every line that does not name its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandBatch {
    #[serde(default)]
    pub container_id: Option<String>,
    pub lines: Vec<DemandLine>,
}

impl DemandBatch {
    pub fn new(lines: Vec<DemandLine>) -> Self {
        Self {
            container_id: None,
            lines,
        }
    }

    pub fn with_container(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = Some(container_id.into());
        self
    }

    /// Lines with the shared container id filled in where missing.
    pub fn resolved_lines(&self) -> Vec<DemandLine> {
        let shared = self
            .container_id
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty());
        self.lines
            .iter()
            .cloned()
            .map(|mut line| {
                let blank = line
                    .container_id
                    .as_deref()
                    .is_none_or(|raw| raw.trim().is_empty());
                if blank {
                    line.container_id = shared.map(str::to_string);
                }
                line
            })
            .collect()
    }
}

/// One outbound row: pallets leaving a location for a destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundLine {
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub pallets: i64,
    #[serde(default)]
    pub cartons: Option<i64>,
    #[serde(default)]
    pub container_id: Option<String>,
}

impl OutboundLine {
    pub fn new(location: impl Into<String>, destination: impl Into<String>, pallets: i64) -> Self {
        Self {
            location: location.into(),
            destination: destination.into(),
            pallets,
            cartons: None,
            container_id: None,
        }
    }

    pub fn with_cartons(mut self, cartons: i64) -> Self {
        self.cartons = Some(cartons);
        self
    }

    pub fn with_container(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = Some(container_id.into());
        self
    }

    pub fn container(&self) -> Option<ContainerId> {
        self.container_id
            .as_deref()
            .and_then(|raw| ContainerId::new(raw).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_pallets_are_rejected() {
        assert!(DemandLine::new(0, "XLX7", 0).validate().is_err());
        assert!(DemandLine::new(0, "XLX7", -3).validate().is_err());
        assert_eq!(
            DemandLine::new(0, "XLX7", 3).with_cartons(30).validate(),
            Ok(ValidDemand { pallets: 3, cartons: 30 })
        );
    }

    #[test]
    fn blank_destination_is_rejected() {
        let err = DemandLine::new(0, "   ", 2).validate().unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("destination")));
    }

    #[test]
    fn negative_cartons_are_rejected() {
        assert!(DemandLine::new(0, "XLX7", 2).with_cartons(-1).validate().is_err());
    }

    #[test]
    fn batch_container_fills_blank_lines_only() {
        let batch = DemandBatch::new(vec![
            DemandLine::new(0, "XLX7", 2),
            DemandLine::new(1, "ONT8", 2).with_container("OWN1"),
            DemandLine::new(2, "ONT8", 2).with_container("  "),
        ])
        .with_container("MSKU1");
        let lines = batch.resolved_lines();
        assert_eq!(lines[0].container_id.as_deref(), Some("MSKU1"));
        assert_eq!(lines[1].container_id.as_deref(), Some("OWN1"));
        assert_eq!(lines[2].container().map(String::from), Some("MSKU1".to_string()));
    }

    #[test]
    fn placement_round_trips_both_shapes() {
        let single: Placement = serde_json::from_str("\"A01\"").unwrap();
        assert_eq!(single.parts(3, 30)[0].pallets, 3);

        let split: Placement = serde_json::from_str(
            r#"[{"location":"A01","pallets":2,"cartons":20},{"location":"A02","pallets":1,"cartons":10}]"#,
        )
        .unwrap();
        assert_eq!(split.locations().len(), 2);
        assert_eq!(split.parts(99, 99)[1].pallets, 1);
    }
}
