//! Audit-log lines produced by allocation and reconciliation runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use slotwise_core::{ContainerId, LocationCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    LineAssigned,
    LineUnassigned,
    LineRejected,
    OutboundDeducted,
    OutboundSkipped,
}

impl AuditKind {
    /// Stable name used by log shippers and the operations dashboard.
    pub fn event_type(&self) -> &'static str {
        match self {
            AuditKind::LineAssigned => "slotting.line.assigned",
            AuditKind::LineUnassigned => "slotting.line.unassigned",
            AuditKind::LineRejected => "slotting.line.rejected",
            AuditKind::OutboundDeducted => "outbound.line.deducted",
            AuditKind::OutboundSkipped => "outbound.line.skipped",
        }
    }
}

/// One audit-log line. Timestamps come from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub occurred_at: DateTime<Utc>,
    pub kind: AuditKind,
    pub location: Option<LocationCode>,
    pub destination: String,
    pub container_id: Option<ContainerId>,
    pub pallets: u32,
    pub cartons: u32,
    pub note: Option<String>,
}

impl AuditEntry {
    pub fn new(occurred_at: DateTime<Utc>, kind: AuditKind, destination: impl Into<String>) -> Self {
        Self {
            occurred_at,
            kind,
            location: None,
            destination: destination.into(),
            container_id: None,
            pallets: 0,
            cartons: 0,
            note: None,
        }
    }

    pub fn at(mut self, location: LocationCode) -> Self {
        self.location = Some(location);
        self
    }

    pub fn quantities(mut self, pallets: u32, cartons: u32) -> Self {
        self.pallets = pallets;
        self.cartons = cartons;
        self
    }

    pub fn container(mut self, container_id: Option<ContainerId>) -> Self {
        self.container_id = container_id;
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

impl core::fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} {} location={} destination={} pallets={} cartons={}",
            self.occurred_at.to_rfc3339(),
            self.kind.event_type(),
            self.location.as_ref().map_or("-", LocationCode::as_str),
            self.destination,
            self.pallets,
            self.cartons,
        )?;
        if let Some(container) = &self.container_id {
            write!(f, " container={container}")?;
        }
        if let Some(note) = &self.note {
            write!(f, " note=\"{note}\"")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn display_renders_one_log_line() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap();
        let entry = AuditEntry::new(at, AuditKind::LineAssigned, "XLX7")
            .at(LocationCode::new("A02").unwrap())
            .quantities(3, 30)
            .container(ContainerId::new("MSKU1").ok());
        assert_eq!(
            entry.to_string(),
            "2026-03-01T08:30:00+00:00 slotting.line.assigned location=A02 destination=XLX7 pallets=3 cartons=30 container=MSKU1"
        );
    }

    #[test]
    fn skipped_rows_carry_their_reason() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap();
        let entry = AuditEntry::new(at, AuditKind::OutboundSkipped, "").note("location is missing");
        assert!(entry.to_string().contains("outbound.line.skipped location=-"));
        assert!(entry.to_string().ends_with("note=\"location is missing\""));
    }
}
