//! Slot assignment: decide which locations receive each intake line.
//!
//! A batch is assigned against a private simulation of the warehouse, so each
//! line sees the occupancy produced by the lines before it. Nothing the caller
//! passes in is mutated; `SlotAllocator::commit` produces the updated snapshot.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use slotwise_core::{ContainerId, DomainError, Entity, LocationCode};

use crate::audit::{AuditEntry, AuditKind};
use crate::classifier::{ZoneCategory, classify, normalize_destination};
use crate::config::AllocationConfig;
use crate::demand::{DemandBatch, DemandLine, Placement, SubAssignment};
use crate::location::{Location, ZoneType};
use crate::snapshot::WarehouseSnapshot;

/// Automatic runs apply the forced-area rule; manual runs (operator-driven) do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentMode {
    #[default]
    Automatic,
    Manual,
}

impl core::str::FromStr for AssignmentMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "automatic" | "auto" => Ok(Self::Automatic),
            "manual" => Ok(Self::Manual),
            other => Err(DomainError::validation(format!("unknown assignment mode: {other}"))),
        }
    }
}

/// Which pass produced a placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Primary,
    Fallback,
    Split,
    /// Placement round-tripped from an earlier export.
    Carried,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AssignmentOutcome {
    Placed { placement: Placement, route: Route },
    Unassigned,
    Rejected { reason: String },
}

/// Result for one demand line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedLine {
    pub sequence_index: usize,
    pub destination: String,
    pub container_id: Option<ContainerId>,
    pub pallets: u32,
    pub cartons: u32,
    pub category: Option<ZoneCategory>,
    pub outcome: AssignmentOutcome,
}

impl AssignedLine {
    fn rejected(line: &DemandLine, err: &DomainError) -> Self {
        Self {
            sequence_index: line.sequence_index,
            destination: line.destination.trim().to_string(),
            container_id: line.container(),
            pallets: 0,
            cartons: 0,
            category: None,
            outcome: AssignmentOutcome::Rejected {
                reason: err.to_string(),
            },
        }
    }

    /// The receiving location of an unsplit placement.
    pub fn location(&self) -> Option<&LocationCode> {
        match &self.outcome {
            AssignmentOutcome::Placed {
                placement: Placement::Single(code),
                ..
            } => Some(code),
            _ => None,
        }
    }

    pub fn placement(&self) -> Option<&Placement> {
        match &self.outcome {
            AssignmentOutcome::Placed { placement, .. } => Some(placement),
            _ => None,
        }
    }

    pub fn is_placed(&self) -> bool {
        self.placement().is_some()
    }

    /// Per-location quantities of this line; empty unless placed.
    pub fn parts(&self) -> Vec<SubAssignment> {
        self.placement()
            .map(|p| p.parts(self.pallets, self.cartons))
            .unwrap_or_default()
    }
}

/// Working copy of the location set for one batch, keyed by location code.
struct Simulation {
    slots: Vec<Location>,
    by_code: HashMap<LocationCode, usize>,
}

impl Simulation {
    fn new(locations: &[Location]) -> Self {
        let mut slots = Vec::with_capacity(locations.len());
        let mut by_code = HashMap::with_capacity(locations.len());
        for loc in locations {
            if by_code.contains_key(loc.id()) {
                warn!(location = %loc.code, "duplicate location code ignored in simulation");
                continue;
            }
            if let Some(excess) = loc.overflow() {
                warn!(location = %loc.code, excess, "location already above capacity");
            }
            by_code.insert(loc.id().clone(), slots.len());
            slots.push(loc.clone());
        }
        Self { slots, by_code }
    }

    fn occupy(&mut self, code: &LocationCode, destination: &str, pallets: u32, cartons: u32) -> bool {
        let Some(&idx) = self.by_code.get(code) else {
            return false;
        };
        let slot = &mut self.slots[idx];
        slot.current_pallets = slot.current_pallets.saturating_add(pallets);
        slot.current_cartons = slot.current_cartons.saturating_add(cartons);
        slot.add_tag(destination);
        true
    }

    /// Slots passing `pool` that can take `pallets` of `destination`, best first.
    fn candidates<F>(&self, pool: F, destination: &str, pallets: u32) -> Vec<usize>
    where
        F: Fn(&Location) -> bool,
    {
        let eligible = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, loc)| pool(*loc) && loc.fits(pallets) && loc.accepts(destination))
            .map(|(idx, loc)| (idx, loc.holds(destination)))
            .collect();
        self.rank(eligible)
    }

    /// Consolidate first: tag holders ahead of the rest. Holders pack tightest
    /// first; others spread by lowest load, then fewest tags. Input order breaks ties.
    fn rank(&self, mut eligible: Vec<(usize, bool)>) -> Vec<usize> {
        eligible.sort_by(|&(a, holds_a), &(b, holds_b)| {
            let (la, lb) = (&self.slots[a], &self.slots[b]);
            holds_b
                .cmp(&holds_a)
                .then_with(|| match (holds_a, holds_b) {
                    (true, true) => lb.utilization().cmp(&la.utilization()),
                    (false, false) => la
                        .utilization()
                        .cmp(&lb.utilization())
                        .then(la.destination_tags.len().cmp(&lb.destination_tags.len())),
                    _ => core::cmp::Ordering::Equal,
                })
                .then(a.cmp(&b))
        });
        eligible.into_iter().map(|(idx, _)| idx).collect()
    }

    fn code(&self, idx: usize) -> LocationCode {
        self.slots[idx].code.clone()
    }
}

/// Sum of valid pallets per normalized destination across the batch.
fn batch_totals(lines: &[DemandLine]) -> HashMap<String, u64> {
    let mut totals: HashMap<String, u64> = HashMap::new();
    for line in lines {
        if let Ok(valid) = line.validate() {
            *totals
                .entry(normalize_destination(&line.destination))
                .or_default() += u64::from(valid.pallets);
        }
    }
    totals
}

/// Proportional carton share per part; the last part takes the remainder.
fn split_cartons(cartons: u32, pallets: u32, shares: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(shares.len());
    let mut given = 0u32;
    for (i, share) in shares.iter().enumerate() {
        let part = if i + 1 == shares.len() {
            cartons - given
        } else if pallets == 0 {
            0
        } else {
            (u64::from(cartons) * u64::from(*share) / u64::from(pallets)) as u32
        };
        given += part;
        out.push(part);
    }
    out
}

/// Result of `SlotAllocator::allocate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationOutcome {
    pub lines: Vec<AssignedLine>,
    pub snapshot: WarehouseSnapshot,
    pub audit: Vec<AuditEntry>,
    /// Locations that were already over capacity before the run.
    pub over_capacity: Vec<LocationCode>,
}

/// Slot assignment engine.
#[derive(Debug, Clone, Default)]
pub struct SlotAllocator {
    config: AllocationConfig,
}

impl SlotAllocator {
    pub fn new(config: AllocationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    /// Assign every line against a simulation of `locations`.
    ///
    /// Lines are processed in input order; the result is ordered by
    /// `sequence_index`.
    #[tracing::instrument(skip_all, fields(lines = lines.len(), locations = locations.len(), ?mode))]
    pub fn assign(&self, lines: &[DemandLine], locations: &[Location], mode: AssignmentMode) -> Vec<AssignedLine> {
        let mut sim = Simulation::new(locations);
        let totals = batch_totals(lines);
        let mut out = Vec::with_capacity(lines.len());

        for line in lines {
            let valid = match line.validate() {
                Ok(valid) => valid,
                Err(err) => {
                    warn!(seq = line.sequence_index, error = %err, "demand line rejected");
                    out.push(AssignedLine::rejected(line, &err));
                    continue;
                }
            };
            let destination = line.destination.trim().to_string();

            if let Some(placement) = &line.assigned {
                if let Err(err) = placement.check_covers(valid.pallets) {
                    warn!(seq = line.sequence_index, error = %err, "carried placement rejected");
                    out.push(AssignedLine::rejected(line, &err));
                    continue;
                }
                for part in placement.parts(valid.pallets, valid.cartons) {
                    if !sim.occupy(&part.location, &destination, part.pallets, part.cartons) {
                        warn!(seq = line.sequence_index, location = %part.location, "carried placement names an unknown location");
                    }
                }
                out.push(AssignedLine {
                    sequence_index: line.sequence_index,
                    destination,
                    container_id: line.container(),
                    pallets: valid.pallets,
                    cartons: valid.cartons,
                    category: Some(classify(&line.destination)),
                    outcome: AssignmentOutcome::Placed {
                        placement: placement.clone(),
                        route: Route::Carried,
                    },
                });
                continue;
            }

            let category = classify(&destination);
            let total = totals
                .get(&normalize_destination(&destination))
                .copied()
                .unwrap_or(0);
            let primary_only = total > u64::from(self.config.main_primary_threshold);
            let zone_types = category.zone_types(primary_only);
            let forced = mode == AssignmentMode::Automatic && category.is_forced();

            let primary_pool = |loc: &Location| {
                zone_types.contains(&loc.zone_type) && (!forced || self.config.in_forced_pool(&loc.code))
            };
            let fallback_pool = |loc: &Location| ZoneType::FALLBACK.contains(&loc.zone_type);

            let outcome = if let Some(&idx) = sim.candidates(primary_pool, &destination, valid.pallets).first() {
                debug!(seq = line.sequence_index, location = %sim.code(idx), %category, "primary placement");
                Self::place_single(&mut sim, idx, &destination, valid.pallets, valid.cartons, Route::Primary)
            } else if let Some(&idx) = sim.candidates(fallback_pool, &destination, valid.pallets).first() {
                debug!(seq = line.sequence_index, location = %sim.code(idx), %category, "fallback placement");
                Self::place_single(&mut sim, idx, &destination, valid.pallets, valid.cartons, Route::Fallback)
            } else if let Some(parts) = self
                .config
                .allow_split
                .then(|| Self::plan_split(&sim, primary_pool, &destination, valid.pallets, valid.cartons))
                .flatten()
            {
                debug!(seq = line.sequence_index, parts = parts.len(), %category, "split placement");
                for part in &parts {
                    sim.occupy(&part.location, &destination, part.pallets, part.cartons);
                }
                AssignmentOutcome::Placed {
                    placement: Placement::Split(parts),
                    route: Route::Split,
                }
            } else {
                warn!(seq = line.sequence_index, %destination, %category, pallets = valid.pallets, "no eligible location");
                AssignmentOutcome::Unassigned
            };

            out.push(AssignedLine {
                sequence_index: line.sequence_index,
                destination,
                container_id: line.container(),
                pallets: valid.pallets,
                cartons: valid.cartons,
                category: Some(category),
                outcome,
            });
        }

        out.sort_by_key(|line| line.sequence_index);
        out
    }

    fn place_single(
        sim: &mut Simulation,
        idx: usize,
        destination: &str,
        pallets: u32,
        cartons: u32,
        route: Route,
    ) -> AssignmentOutcome {
        let code = sim.code(idx);
        sim.occupy(&code, destination, pallets, cartons);
        AssignmentOutcome::Placed {
            placement: Placement::Single(code),
            route,
        }
    }

    /// Greedy fill across the primary pool; `None` unless the whole line fits.
    fn plan_split<F>(
        sim: &Simulation,
        pool: F,
        destination: &str,
        pallets: u32,
        cartons: u32,
    ) -> Option<Vec<SubAssignment>>
    where
        F: Fn(&Location) -> bool,
    {
        let eligible = sim
            .slots
            .iter()
            .enumerate()
            .filter(|(_, loc)| pool(*loc) && loc.accepts(destination) && loc.remaining_capacity() != Some(0))
            .map(|(idx, loc)| (idx, loc.holds(destination)))
            .collect();

        let mut left = pallets;
        let mut taken: Vec<(usize, u32)> = Vec::new();
        for idx in sim.rank(eligible) {
            if left == 0 {
                break;
            }
            let take = sim.slots[idx].remaining_capacity().unwrap_or(left).min(left);
            taken.push((idx, take));
            left -= take;
        }
        if left > 0 || taken.len() < 2 {
            return None;
        }

        let shares: Vec<u32> = taken.iter().map(|(_, take)| *take).collect();
        let carton_parts = split_cartons(cartons, pallets, &shares);
        Some(
            taken
                .into_iter()
                .zip(carton_parts)
                .map(|((idx, take), cartons)| SubAssignment {
                    location: sim.code(idx),
                    pallets: take,
                    cartons,
                })
                .collect(),
        )
    }

    /// Apply placed lines to a snapshot: location counters, tags, and the
    /// container ledger.
    pub fn commit(&self, snapshot: &WarehouseSnapshot, lines: &[AssignedLine]) -> WarehouseSnapshot {
        let mut next = snapshot.clone();
        let index: HashMap<LocationCode, usize> = next
            .locations
            .iter()
            .enumerate()
            .rev()
            .map(|(idx, loc)| (loc.code.clone(), idx))
            .collect();

        for line in lines {
            let mut stored_pallets = 0u32;
            let mut stored_cartons = 0u32;
            for part in line.parts() {
                let Some(&idx) = index.get(&part.location) else {
                    warn!(seq = line.sequence_index, location = %part.location, "cannot commit to unknown location");
                    continue;
                };
                let loc = &mut next.locations[idx];
                loc.current_pallets = loc.current_pallets.saturating_add(part.pallets);
                loc.current_cartons = loc.current_cartons.saturating_add(part.cartons);
                loc.add_tag(&line.destination);
                stored_pallets = stored_pallets.saturating_add(part.pallets);
                stored_cartons = stored_cartons.saturating_add(part.cartons);
            }
            if stored_pallets == 0 {
                continue;
            }
            match &line.container_id {
                Some(container) => {
                    next.ledger
                        .record(&line.destination, container, stored_pallets, stored_cartons);
                }
                None => {
                    warn!(seq = line.sequence_index, destination = %line.destination, "placed line has no container id; ledger not updated");
                }
            }
        }
        next
    }

    /// Assign a batch and commit it, with audit lines stamped `occurred_at`.
    pub fn allocate(
        &self,
        batch: &DemandBatch,
        snapshot: &WarehouseSnapshot,
        mode: AssignmentMode,
        occurred_at: DateTime<Utc>,
    ) -> AllocationOutcome {
        let lines = self.assign(&batch.resolved_lines(), &snapshot.locations, mode);
        let next = self.commit(snapshot, &lines);
        let audit = lines.iter().flat_map(|line| audit_for(line, occurred_at)).collect();
        let over_capacity = snapshot
            .over_capacity()
            .into_iter()
            .map(|(code, _)| code)
            .collect();

        let placed = lines.iter().filter(|l| l.is_placed()).count();
        let rejected = lines
            .iter()
            .filter(|l| matches!(l.outcome, AssignmentOutcome::Rejected { .. }))
            .count();
        info!(
            lines = lines.len(),
            placed,
            unassigned = lines.len() - placed - rejected,
            rejected,
            "allocation batch finished"
        );

        AllocationOutcome {
            lines,
            snapshot: next,
            audit,
            over_capacity,
        }
    }
}

fn audit_for(line: &AssignedLine, occurred_at: DateTime<Utc>) -> Vec<AuditEntry> {
    let base = |kind| {
        AuditEntry::new(occurred_at, kind, line.destination.clone()).container(line.container_id.clone())
    };
    match &line.outcome {
        AssignmentOutcome::Placed { route, .. } => line
            .parts()
            .into_iter()
            .map(|part| {
                let entry = base(AuditKind::LineAssigned)
                    .at(part.location)
                    .quantities(part.pallets, part.cartons);
                match route {
                    Route::Primary => entry,
                    Route::Fallback => entry.note("fallback zone"),
                    Route::Split => entry.note("split placement"),
                    Route::Carried => entry.note("carried from previous export"),
                }
            })
            .collect(),
        AssignmentOutcome::Unassigned => vec![
            base(AuditKind::LineUnassigned)
                .quantities(line.pallets, line.cartons)
                .note("no eligible location"),
        ],
        AssignmentOutcome::Rejected { reason } => vec![base(AuditKind::LineRejected).note(reason.clone())],
    }
}

/// Assign with the default layout configuration.
pub fn assign(lines: &[DemandLine], locations: &[Location], mode: AssignmentMode) -> Vec<AssignedLine> {
    SlotAllocator::default().assign(lines, locations, mode)
}
