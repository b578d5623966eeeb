//! Layout energy: eight penalty terms, zero when compliant.
//!
//! | Term | Penalty |
//! |------|---------|
//! | overlap | Σ over item pairs of (SAT overlap area)² |
//! | aisle | Σ over nearby pairs of (required − gap)² when the gap is short |
//! | egress | travel beyond 200 ft, unreachable seating, missing exits |
//! | sightline | Σ over chairs of (fraction of obstacles blocking the focal point)² |
//! | capacity | (seats − target)² |
//! | ada | missing wheelchair spaces and unreachable ones |
//! | aesthetic | wall alignment, mirror symmetry, balance, table spacing |
//! | service | tables too close to walls or cut off from catering |
//!
//! Every term is non-negative and a pure function of its inputs. The total is
//! `Σ weight · term`; terms with zero weight are not evaluated.
//!
//! # Aisle clearance
//!
//! Required clearance depends on the pair: chair↔table 1.5 ft, table↔table
//! 3 ft, anything involving a bar or service station 5 ft, everything else
//! 4.5 ft. Chair↔chair pairs are exempt since rows of chairs abut. Round
//! tables measure clearance from their circular top rather than their box.

use crate::furniture::{AisleRole, FurnitureItem, FurnitureKind, LayoutWeights, RoomBoundary};
use crate::geometry::{
    angular_offset_to_grid, distance_to_boundary, obb_gap, point_in_polygon, polygon_centroid,
    sat_overlap, segment_aabb_intersection, Obb,
};
use crate::grid::{DistanceField, ADA_PATH_WIDTH, CELL_SIZE, EGRESS_PATH_WIDTH, SERVICE_PATH_WIDTH};
use crate::spatial_index::SpatialIndex;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Longest allowed travel from a seat to an exit, in feet.
pub const MAX_EGRESS_TRAVEL: f64 = 200.0;
/// Penalty per seating item with no path to an exit.
pub const EGRESS_UNREACHABLE_PENALTY: f64 = 500.0;
/// Penalty for a room without exits.
pub const NO_EXIT_PENALTY: f64 = 1000.0;
/// Seats served by one wheelchair space.
pub const SEATS_PER_ADA_SPACE: u32 = 25;
/// Multiplier on the squared wheelchair-space deficit.
pub const ADA_DEFICIT_WEIGHT: f64 = 100.0;
/// Penalty per wheelchair space off the accessible route.
pub const ADA_UNREACHABLE_PENALTY: f64 = 50.0;
/// Wheelchair space footprint `(width, depth)` in feet.
pub const ADA_SPACE: (f64, f64) = (3.0, 4.0);
/// Required clearance between a table and the walls, in feet.
pub const SERVICE_CLEARANCE: f64 = 5.0;
/// Penalty per table cut off from catering.
pub const SERVICE_UNREACHABLE_PENALTY: f64 = 200.0;

/// The largest aisle requirement; the broad phase searches this far.
const MAX_AISLE: f64 = 5.0;
const EPS: f64 = 1e-9;

/// Per-term energies, unweighted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnergyBreakdown {
    /// Overlap term.
    pub overlap: f64,
    /// Aisle term.
    pub aisle: f64,
    /// Egress term.
    pub egress: f64,
    /// Sightline term.
    pub sightline: f64,
    /// Capacity term.
    pub capacity: f64,
    /// ADA term.
    pub ada: f64,
    /// Aesthetic term.
    pub aesthetic: f64,
    /// Service term.
    pub service: f64,
}

impl EnergyBreakdown {
    /// Terms in weight order.
    pub fn as_array(&self) -> [f64; 8] {
        [
            self.overlap,
            self.aisle,
            self.egress,
            self.sightline,
            self.capacity,
            self.ada,
            self.aesthetic,
            self.service,
        ]
    }

    /// Weighted total.
    pub fn total(&self, weights: &LayoutWeights) -> f64 {
        self.as_array()
            .iter()
            .zip(weights.as_array())
            .map(|(t, w)| t * w)
            .sum()
    }
}

/// Weighted layout energy. Lower is better; zero is fully compliant.
pub fn compute_layout_energy(
    items: &[FurnitureItem],
    room: &RoomBoundary,
    weights: &LayoutWeights,
    target_capacity: u32,
) -> f64 {
    let needs_index = weights.overlap > 0.0 || weights.aisle > 0.0;
    let index = needs_index.then(|| SpatialIndex::from_items(items));

    let mut energy = 0.0;
    if let Some(index) = &index {
        if weights.overlap > 0.0 {
            energy += weights.overlap * overlap_energy_indexed(items, index);
        }
        if weights.aisle > 0.0 {
            energy += weights.aisle * aisle_energy_indexed(items, index);
        }
    }
    if weights.egress > 0.0 {
        energy += weights.egress * egress_energy(items, room);
    }
    if weights.sightline > 0.0 {
        energy += weights.sightline * sightline_energy(items, room);
    }
    if weights.capacity > 0.0 {
        energy += weights.capacity * capacity_energy(items, target_capacity);
    }
    if weights.ada > 0.0 {
        energy += weights.ada * ada_energy(items, room);
    }
    if weights.aesthetic > 0.0 {
        energy += weights.aesthetic * aesthetic_energy(items, room);
    }
    if weights.service > 0.0 {
        energy += weights.service * service_energy(items, room);
    }
    energy
}

/// All eight terms, unweighted.
pub fn compute_energy_breakdown(
    items: &[FurnitureItem],
    room: &RoomBoundary,
    target_capacity: u32,
) -> EnergyBreakdown {
    let index = SpatialIndex::from_items(items);
    EnergyBreakdown {
        overlap: overlap_energy_indexed(items, &index),
        aisle: aisle_energy_indexed(items, &index),
        egress: egress_energy(items, room),
        sightline: sightline_energy(items, room),
        capacity: capacity_energy(items, target_capacity),
        ada: ada_energy(items, room),
        aesthetic: aesthetic_energy(items, room),
        service: service_energy(items, room),
    }
}

/// Number of terms above `tolerance`.
pub fn count_violations(breakdown: &EnergyBreakdown, tolerance: f64) -> usize {
    breakdown
        .as_array()
        .iter()
        .filter(|&&t| t > tolerance)
        .count()
}

/// Σ over pairs of squared SAT overlap.
pub fn overlap_energy(items: &[FurnitureItem]) -> f64 {
    overlap_energy_indexed(items, &SpatialIndex::from_items(items))
}

fn overlap_energy_indexed(items: &[FurnitureItem], index: &SpatialIndex) -> f64 {
    index
        .candidate_pairs(0.0)
        .into_iter()
        .map(|(i, j)| sat_overlap(&items[i].obb(), &items[j].obb()).powi(2))
        .sum()
}

/// Clearance a pair of kinds must keep, or `None` when exempt.
pub fn required_aisle(a: FurnitureKind, b: FurnitureKind) -> Option<f64> {
    use AisleRole::*;
    match (a.aisle_role(), b.aisle_role()) {
        (Seat, Seat) => None,
        (Service, Seat | Table | Service | Fixture) | (Seat | Table | Fixture, Service) => {
            Some(5.0)
        }
        (Seat, Table) | (Table, Seat) => Some(1.5),
        (Table, Table) => Some(3.0),
        (Fixture, Seat | Table | Fixture) | (Seat | Table, Fixture) => Some(4.5),
    }
}

/// Distance from a point to an oriented box (zero inside).
fn point_obb_distance(x: f64, y: f64, obb: &Obb) -> f64 {
    let [(ux, uy), (vx, vy)] = obb.axes();
    let (dx, dy) = (x - obb.cx, y - obb.cy);
    let along = (dx * ux + dy * uy).abs() - obb.half_width;
    let across = (dx * vx + dy * vy).abs() - obb.half_depth;
    along.max(0.0).hypot(across.max(0.0))
}

/// Walking clearance between two items.
pub fn clearance_gap(a: &FurnitureItem, b: &FurnitureItem) -> f64 {
    let round = |i: &FurnitureItem| i.kind == FurnitureKind::RoundTable;
    match (round(a), round(b)) {
        (true, true) => {
            let d = (a.x - b.x).hypot(a.y - b.y);
            (d - a.width.min(a.depth) / 2.0 - b.width.min(b.depth) / 2.0).max(0.0)
        }
        (true, false) => (point_obb_distance(a.x, a.y, &b.obb()) - a.width.min(a.depth) / 2.0).max(0.0),
        (false, true) => (point_obb_distance(b.x, b.y, &a.obb()) - b.width.min(b.depth) / 2.0).max(0.0),
        (false, false) => obb_gap(&a.obb(), &b.obb()),
    }
}

/// Σ over nearby non-exempt pairs of squared clearance deficit.
pub fn aisle_energy(items: &[FurnitureItem]) -> f64 {
    aisle_energy_indexed(items, &SpatialIndex::from_items(items))
}

fn aisle_energy_indexed(items: &[FurnitureItem], index: &SpatialIndex) -> f64 {
    let mut energy = 0.0;
    for (i, j) in index.candidate_pairs(MAX_AISLE) {
        let (a, b) = (&items[i], &items[j]);
        let Some(required) = required_aisle(a.kind, b.kind) else {
            continue;
        };
        let gap = clearance_gap(a, b);
        if gap < required {
            energy += (required - gap).powi(2);
        }
    }
    energy
}

/// Margin used to find the free cells around an item.
fn reach_margin(path_width: f64) -> f64 {
    path_width / 2.0 + CELL_SIZE
}

/// Excess travel beyond the limit and unreachable seating.
pub fn egress_energy(items: &[FurnitureItem], room: &RoomBoundary) -> f64 {
    if room.exits.is_empty() {
        return NO_EXIT_PENALTY;
    }
    let field = DistanceField::for_path(room, items, EGRESS_PATH_WIDTH);
    let margin = reach_margin(EGRESS_PATH_WIDTH);

    items
        .iter()
        .filter(|i| i.seats > 0)
        .map(|item| {
            let d = field.distance_to_item(&item.obb(), margin);
            if !d.is_finite() {
                EGRESS_UNREACHABLE_PENALTY
            } else if d > MAX_EGRESS_TRAVEL {
                (d - MAX_EGRESS_TRAVEL).powi(2)
            } else {
                0.0
            }
        })
        .sum()
}

/// The point guests should be able to see.
///
/// The focal polygon's centroid when present, else the first stage or podium,
/// else the middle of the front wall.
pub fn focal_point(items: &[FurnitureItem], room: &RoomBoundary) -> (f64, f64) {
    if let Some(polygon) = room.focal_polygon.as_ref().filter(|p| !p.is_empty()) {
        return polygon_centroid(polygon);
    }
    items
        .iter()
        .find(|i| i.kind.is_focal())
        .map(|i| (i.x, i.y))
        .unwrap_or((room.width / 2.0, 0.0))
}

/// Σ over chairs of the squared fraction of obstacles on the line of sight.
pub fn sightline_energy(items: &[FurnitureItem], room: &RoomBoundary) -> f64 {
    let focal = focal_point(items, room);
    let obstacles: Vec<_> = items
        .iter()
        .filter(|i| i.kind != FurnitureKind::Chair)
        .map(|i| i.obb().aabb())
        .filter(|bb| !bb.contains(focal.0, focal.1))
        .collect();
    if obstacles.is_empty() {
        return 0.0;
    }
    let total = obstacles.len() as f64;

    items
        .iter()
        .filter(|i| i.kind == FurnitureKind::Chair)
        .map(|chair| {
            let blocked = obstacles
                .iter()
                .filter(|bb| !bb.contains(chair.x, chair.y))
                .filter(|bb| segment_aabb_intersection((chair.x, chair.y), focal, bb).is_some())
                .count();
            (blocked as f64 / total).powi(2)
        })
        .sum()
}

/// Squared deviation of total seats from the target.
pub fn capacity_energy(items: &[FurnitureItem], target_capacity: u32) -> f64 {
    let seats: u32 = items.iter().map(|i| i.seats).sum();
    (f64::from(seats) - f64::from(target_capacity)).powi(2)
}

/// Wheelchair spaces the layout must offer.
pub fn required_ada_spaces(items: &[FurnitureItem]) -> usize {
    let seats: u32 = items.iter().map(|i| i.seats).sum();
    seats.div_ceil(SEATS_PER_ADA_SPACE).max(1) as usize
}

/// The four side-adjacent probe boxes of `item` at `distance` beyond its edges.
fn side_probes(item: &FurnitureItem, along: f64, depth: f64, distance: f64) -> [Obb; 4] {
    let obb = item.obb();
    let [(ux, uy), (vx, vy)] = obb.axes();
    let rot = item.rotation;
    let side = |nx: f64, ny: f64, half: f64, tangent_rot: f64| {
        let offset = half + distance + depth / 2.0;
        Obb::new(item.x + nx * offset, item.y + ny * offset, along, depth, tangent_rot)
    };
    let quarter = std::f64::consts::FRAC_PI_2;
    [
        side(ux, uy, obb.half_width, rot + quarter),
        side(-ux, -uy, obb.half_width, rot + quarter),
        side(vx, vy, obb.half_depth, rot),
        side(-vx, -vy, obb.half_depth, rot),
    ]
}

fn obb_inside_room(obb: &Obb, room: &RoomBoundary) -> bool {
    obb.corners()
        .iter()
        .all(|&(x, y)| point_in_polygon(x, y, &room.vertices))
}

/// Clear 3×4 ft spaces beside tables, at most one per table.
pub fn find_ada_spaces(items: &[FurnitureItem], room: &RoomBoundary) -> Vec<Obb> {
    let index = SpatialIndex::from_items(items);
    let mut spaces = Vec::new();
    for (t, table) in items.iter().enumerate().filter(|(_, i)| i.kind.is_table()) {
        let found = side_probes(table, ADA_SPACE.0, ADA_SPACE.1, 0.0)
            .into_iter()
            .find(|space| {
                obb_inside_room(space, room)
                    && index
                        .query(&space.aabb())
                        .iter()
                        .filter(|e| e.index != t)
                        .all(|e| sat_overlap(space, &items[e.index].obb()) <= EPS)
            });
        if let Some(space) = found {
            spaces.push(space);
        }
    }
    spaces
}

/// Wheelchair-space deficit plus spaces off the accessible route.
pub fn ada_energy(items: &[FurnitureItem], room: &RoomBoundary) -> f64 {
    let required = required_ada_spaces(items);
    let spaces = find_ada_spaces(items, room);
    let deficit = required.saturating_sub(spaces.len()) as f64;
    let mut energy = ADA_DEFICIT_WEIGHT * deficit * deficit;

    if !room.exits.is_empty() && !spaces.is_empty() {
        let field = DistanceField::for_path(room, items, ADA_PATH_WIDTH);
        let margin = reach_margin(ADA_PATH_WIDTH);
        let unreachable = spaces
            .iter()
            .take(required)
            .filter(|s| !field.distance_to_item(s, margin).is_finite())
            .count();
        energy += ADA_UNREACHABLE_PENALTY * unreachable as f64;
    }
    energy
}

/// Directions of the room's walls, in radians.
fn wall_angles(room: &RoomBoundary) -> Vec<f64> {
    let v = &room.vertices;
    let n = v.len();
    let angles: Vec<f64> = (0..n)
        .filter_map(|i| {
            let (a, b) = (v[i], v[(i + 1) % n]);
            let (dx, dy) = (b.0 - a.0, b.1 - a.1);
            (dx.hypot(dy) > EPS).then(|| dy.atan2(dx))
        })
        .collect();
    if angles.is_empty() {
        vec![0.0]
    } else {
        angles
    }
}

fn nearest_distance(items: &[&FurnitureItem], skip: Option<usize>, x: f64, y: f64) -> Option<f64> {
    items
        .iter()
        .enumerate()
        .filter(|(k, _)| Some(*k) != skip)
        .map(|(_, o)| (o.x - x).hypot(o.y - y))
        .min_by(f64::total_cmp)
}

/// Alignment to walls, mirror symmetry, visual balance and table spacing.
pub fn aesthetic_energy(items: &[FurnitureItem], room: &RoomBoundary) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    let n = items.len() as f64;

    let walls = wall_angles(room);
    let alignment: f64 = items
        .iter()
        .map(|item| {
            walls
                .iter()
                .map(|w| angular_offset_to_grid(item.rotation - w))
                .fold(f64::INFINITY, f64::min)
                .powi(2)
        })
        .sum();

    // Mirror about the vertical axis x = W/2, matched against the same kind.
    let mut symmetry = 0.0;
    for item in items {
        let mx = room.width - item.x;
        let same: Vec<&FurnitureItem> = items.iter().filter(|o| o.kind == item.kind).collect();
        if let Some(d) = nearest_distance(&same, None, mx, item.y) {
            symmetry += d * d;
        }
    }
    symmetry /= n;

    let (cx, cy) = room.center();
    let mean_x = items.iter().map(|i| i.x).sum::<f64>() / n;
    let mean_y = items.iter().map(|i| i.y).sum::<f64>() / n;
    let balance = (mean_x - cx).powi(2) + (mean_y - cy).powi(2);

    let tables: Vec<&FurnitureItem> = items.iter().filter(|i| i.kind.is_table()).collect();
    let spacing = if tables.len() >= 2 {
        let nn: Vec<f64> = (0..tables.len())
            .filter_map(|k| nearest_distance(&tables, Some(k), tables[k].x, tables[k].y))
            .collect();
        let mean = nn.iter().sum::<f64>() / nn.len() as f64;
        nn.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / nn.len() as f64
    } else {
        0.0
    };

    alignment + symmetry + balance + spacing
}

/// Clearance between an item's footprint and the walls; zero if it pokes out.
pub fn wall_clearance(item: &FurnitureItem, room: &RoomBoundary) -> f64 {
    item.obb()
        .corners()
        .iter()
        .map(|&(x, y)| {
            if point_in_polygon(x, y, &room.vertices) {
                distance_to_boundary(x, y, &room.vertices)
            } else {
                0.0
            }
        })
        .fold(f64::INFINITY, f64::min)
}

/// True when no side of `table` offers a free point for a service cart.
fn hemmed_in(table: &FurnitureItem, items: &[FurnitureItem], room: &RoomBoundary) -> bool {
    let half_path = SERVICE_PATH_WIDTH / 2.0;
    side_probes(table, EPS, EPS, half_path).iter().all(|probe| {
        let (px, py) = (probe.cx, probe.cy);
        !point_in_polygon(px, py, &room.vertices)
            || items
                .iter()
                .filter(|o| o.kind.blocks_paths() && !std::ptr::eq(*o, table))
                .any(|o| o.obb().contains_point(px, py, 0.0))
    })
}

/// Wall clearance deficits and tables cut off from catering.
pub fn service_energy(items: &[FurnitureItem], room: &RoomBoundary) -> f64 {
    let tables: Vec<&FurnitureItem> = items.iter().filter(|i| i.kind.is_table()).collect();
    if tables.is_empty() {
        return 0.0;
    }

    let mut energy: f64 = tables
        .iter()
        .map(|t| {
            let clearance = wall_clearance(t, room);
            if clearance < SERVICE_CLEARANCE {
                (SERVICE_CLEARANCE - clearance).powi(2)
            } else {
                0.0
            }
        })
        .sum();

    if room.exits.is_empty() {
        let hemmed = tables.iter().filter(|t| hemmed_in(t, items, room)).count();
        energy += SERVICE_UNREACHABLE_PENALTY * hemmed as f64;
    } else {
        let field = DistanceField::for_path(room, items, SERVICE_PATH_WIDTH);
        let margin = reach_margin(SERVICE_PATH_WIDTH);
        let unreachable = tables
            .iter()
            .filter(|t| !field.distance_to_item(&t.obb(), margin).is_finite())
            .count();
        energy += SERVICE_UNREACHABLE_PENALTY * unreachable as f64;
    }
    energy
}
