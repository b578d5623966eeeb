//! Dead space and coverage report.
//!
//! Dead space is floor farther than [`DEAD_SPACE_THRESHOLD`] (walking
//! distance over the grid) from any furniture. Dead cells are grouped into
//! 4-connected regions. Two further scores summarize the layout:
//!
//! - **coverage**: furniture footprint / room area, clamped to 1
//! - **connectivity**: `1 / (1 + extra clusters)`, where items closer than
//!   [`CLUSTER_DISTANCE`] belong to one cluster
//!
//! [`compare_layouts`] measures how far apart two layouts of one room are in
//! structure rather than position: the 1-Wasserstein distance between their
//! dead-region area profiles and between their cluster size profiles.

use crate::furniture::{FurnitureItem, RoomBoundary};
use crate::geometry::obb_gap;
use crate::grid::{DistanceField, Grid, CELL_SIZE};
use crate::spatial_index::SpatialIndex;
use std::collections::VecDeque;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Distance from furniture beyond which floor counts as dead, in feet.
pub const DEAD_SPACE_THRESHOLD: f64 = 6.0;
/// Gap below which two items share a cluster, in feet.
pub const CLUSTER_DISTANCE: f64 = 3.0;

/// A connected patch of dead floor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeadSpaceRegion {
    /// Cells in the region.
    pub cells: usize,
    /// Area in square feet.
    pub area: f64,
    /// Mean cell center.
    pub centroid: (f64, f64),
}

/// Summary of a layout's use of floor space.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayoutAnalysis {
    /// Total dead area in square feet.
    pub dead_space_area: f64,
    /// Dead area / room area.
    pub dead_space_fraction: f64,
    /// Dead regions, largest first.
    pub regions: Vec<DeadSpaceRegion>,
    /// Footprint / room area, at most 1.
    pub coverage: f64,
    /// Number of furniture clusters.
    pub clusters: usize,
    /// `1 / (1 + extra clusters)`.
    pub connectivity: f64,
}

/// Analyzes `items` in `room`.
pub fn analyze_layout(items: &[FurnitureItem], room: &RoomBoundary) -> LayoutAnalysis {
    let field = furniture_distance_field(items, room);
    let grid = field.grid();
    let dead: Vec<bool> = (0..grid.len())
        .map(|idx| !grid.is_blocked(idx) && field.at(idx) > DEAD_SPACE_THRESHOLD)
        .collect();

    let mut regions = dead_regions(grid, &dead);
    regions.sort_by(|a, b| b.cells.cmp(&a.cells));

    let room_area = room.area();
    let dead_space_area: f64 = regions.iter().map(|r| r.area).sum();
    let footprint: f64 = items.iter().map(FurnitureItem::area).sum();
    let (coverage, dead_space_fraction) = if room_area > 0.0 {
        ((footprint / room_area).min(1.0), (dead_space_area / room_area).min(1.0))
    } else {
        (0.0, 0.0)
    };

    let clusters = furniture_clusters(items, CLUSTER_DISTANCE).len();
    let connectivity = 1.0 / (1.0 + clusters.saturating_sub(1) as f64);

    log::debug!(
        "analysis: {} dead regions ({:.1} sq ft), coverage {:.3}, {} clusters",
        regions.len(),
        dead_space_area,
        coverage,
        clusters
    );

    LayoutAnalysis {
        dead_space_area,
        dead_space_fraction,
        regions,
        coverage,
        clusters,
        connectivity,
    }
}

/// Structural difference between two layouts of the same room.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayoutComparison {
    /// W1 distance between dead-region areas, in square feet.
    pub dead_space_distance: f64,
    /// W1 distance between cluster sizes, in items.
    pub cluster_distance: f64,
    /// `b.coverage - a.coverage`.
    pub coverage_delta: f64,
    /// `b.connectivity - a.connectivity`.
    pub connectivity_delta: f64,
    /// Report for the first layout.
    pub analysis_a: LayoutAnalysis,
    /// Report for the second layout.
    pub analysis_b: LayoutAnalysis,
}

/// Compares two layouts of `room`.
///
/// Both distances are symmetric and zero for identical layouts. A region or
/// cluster with no partner is matched against an empty one.
pub fn compare_layouts(
    a: &[FurnitureItem],
    b: &[FurnitureItem],
    room: &RoomBoundary,
) -> LayoutComparison {
    let analysis_a = analyze_layout(a, room);
    let analysis_b = analyze_layout(b, room);

    let areas = |report: &LayoutAnalysis| -> Vec<f64> {
        report.regions.iter().map(|r| r.area).collect()
    };
    let dead_space_distance = profile_distance(areas(&analysis_a), areas(&analysis_b));

    let sizes = |items: &[FurnitureItem]| -> Vec<f64> {
        furniture_clusters(items, CLUSTER_DISTANCE)
            .iter()
            .map(|c| c.len() as f64)
            .collect()
    };
    let cluster_distance = profile_distance(sizes(a), sizes(b));

    log::debug!(
        "comparison: dead space distance {:.1} sq ft, cluster distance {:.1}",
        dead_space_distance,
        cluster_distance
    );

    LayoutComparison {
        dead_space_distance,
        cluster_distance,
        coverage_delta: analysis_b.coverage - analysis_a.coverage,
        connectivity_delta: analysis_b.connectivity - analysis_a.connectivity,
        analysis_a,
        analysis_b,
    }
}

// Sorted matching is optimal for non-negative values on a line when
// unmatched entries pair with zero.
fn profile_distance(mut a: Vec<f64>, mut b: Vec<f64>) -> f64 {
    a.sort_by(|x, y| y.total_cmp(x));
    b.sort_by(|x, y| y.total_cmp(x));
    let len = a.len().max(b.len());
    (0..len)
        .map(|k| (a.get(k).copied().unwrap_or(0.0) - b.get(k).copied().unwrap_or(0.0)).abs())
        .sum()
}

/// Walking distance from every cell to the nearest furniture footprint.
pub fn furniture_distance_field(items: &[FurnitureItem], room: &RoomBoundary) -> DistanceField {
    let grid = Grid::new(room, CELL_SIZE);
    let mut seeds = Vec::new();
    for item in items {
        let cells = grid.cells_in(&item.obb(), 0.0);
        if cells.is_empty() {
            seeds.push(grid.cell_at(item.x, item.y));
        } else {
            seeds.extend(cells);
        }
    }
    DistanceField::from_seeds(grid, &seeds)
}

fn dead_regions(grid: &Grid, dead: &[bool]) -> Vec<DeadSpaceRegion> {
    let (cols, rows) = (grid.cols(), grid.rows());
    let cell_area = grid.cell_size() * grid.cell_size();
    let mut seen = vec![false; dead.len()];
    let mut regions = Vec::new();
    let mut queue = VecDeque::new();

    for start in 0..dead.len() {
        if !dead[start] || seen[start] {
            continue;
        }
        seen[start] = true;
        queue.push_back(start);
        let (mut count, mut sx, mut sy) = (0usize, 0.0, 0.0);
        while let Some(idx) = queue.pop_front() {
            let (x, y) = grid.center_of(idx);
            count += 1;
            sx += x;
            sy += y;
            let (c, r) = (idx % cols, idx / cols);
            let mut neighbors = Vec::with_capacity(4);
            if c > 0 {
                neighbors.push(idx - 1);
            }
            if c + 1 < cols {
                neighbors.push(idx + 1);
            }
            if r > 0 {
                neighbors.push(idx - cols);
            }
            if r + 1 < rows {
                neighbors.push(idx + cols);
            }
            for next in neighbors {
                if dead[next] && !seen[next] {
                    seen[next] = true;
                    queue.push_back(next);
                }
            }
        }
        regions.push(DeadSpaceRegion {
            cells: count,
            area: count as f64 * cell_area,
            centroid: (sx / count as f64, sy / count as f64),
        });
    }
    regions
}

/// Groups items whose footprints come within `threshold` of each other.
///
/// Clusters are listed by their smallest member index.
pub fn furniture_clusters(items: &[FurnitureItem], threshold: f64) -> Vec<Vec<usize>> {
    let mut parent: Vec<usize> = (0..items.len()).collect();
    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    let index = SpatialIndex::from_items(items);
    for (i, j) in index.candidate_pairs(threshold) {
        if obb_gap(&items[i].obb(), &items[j].obb()) < threshold {
            let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
            if ri != rj {
                parent[ri.max(rj)] = ri.min(rj);
            }
        }
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut slot = vec![usize::MAX; items.len()];
    for i in 0..items.len() {
        let root = find(&mut parent, i);
        if slot[root] == usize::MAX {
            slot[root] = groups.len();
            groups.push(Vec::new());
        }
        groups[slot[root]].push(i);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::furniture::FurnitureKind;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_room_is_all_dead() {
        let room = RoomBoundary::rectangle(10.0, 8.0);
        let report = analyze_layout(&[], &room);
        assert_eq!(report.regions.len(), 1);
        assert_relative_eq!(report.dead_space_area, 80.0);
        assert_relative_eq!(report.dead_space_fraction, 1.0);
        assert_eq!(report.coverage, 0.0);
        assert_eq!(report.clusters, 0);
        assert_eq!(report.connectivity, 1.0);
    }

    #[test]
    fn test_central_table_leaves_two_dead_ends() {
        let room = RoomBoundary::rectangle(20.0, 10.0);
        let items = vec![FurnitureItem::new(FurnitureKind::RectTable, 10.0, 5.0, 2.0, 2.0)];
        let report = analyze_layout(&items, &room);
        assert_eq!(report.regions.len(), 2);
        assert!(report.dead_space_area > 0.0 && report.dead_space_area < 200.0);
        assert_relative_eq!(report.coverage, 4.0 / 200.0);
        for region in &report.regions {
            assert!((region.centroid.0 - 10.0).abs() > 5.0);
        }
    }

    #[test]
    fn test_dense_layout_has_no_dead_space() {
        let room = RoomBoundary::rectangle(12.0, 12.0);
        let items: Vec<_> = [(3.0, 3.0), (9.0, 3.0), (3.0, 9.0), (9.0, 9.0)]
            .iter()
            .map(|&(x, y)| FurnitureItem::new(FurnitureKind::RectTable, x, y, 2.0, 2.0))
            .collect();
        let report = analyze_layout(&items, &room);
        assert!(report.regions.is_empty());
        assert_eq!(report.dead_space_area, 0.0);
    }

    #[test]
    fn test_clusters_and_connectivity() {
        let room = RoomBoundary::rectangle(30.0, 10.0);
        let items = vec![
            FurnitureItem::of_kind(FurnitureKind::Chair, 5.0, 5.0),
            FurnitureItem::of_kind(FurnitureKind::Chair, 7.5, 5.0),
            FurnitureItem::of_kind(FurnitureKind::Chair, 20.0, 5.0),
        ];
        let clusters = furniture_clusters(&items, CLUSTER_DISTANCE);
        assert_eq!(clusters, vec![vec![0, 1], vec![2]]);
        let report = analyze_layout(&items, &room);
        assert_eq!(report.clusters, 2);
        assert_relative_eq!(report.connectivity, 0.5);
    }

    #[test]
    fn test_compare_identical_layouts() {
        let room = RoomBoundary::rectangle(20.0, 10.0);
        let items = vec![FurnitureItem::new(FurnitureKind::RectTable, 10.0, 5.0, 2.0, 2.0)];
        let cmp = compare_layouts(&items, &items, &room);
        assert_eq!(cmp.dead_space_distance, 0.0);
        assert_eq!(cmp.cluster_distance, 0.0);
        assert_eq!(cmp.coverage_delta, 0.0);
        assert_eq!(cmp.analysis_a, cmp.analysis_b);
    }

    #[test]
    fn test_compare_against_dead_free_layout() {
        let room = RoomBoundary::rectangle(12.0, 12.0);
        let sparse = vec![FurnitureItem::new(FurnitureKind::RectTable, 1.0, 1.0, 2.0, 2.0)];
        let dense: Vec<_> = [(3.0, 3.0), (9.0, 3.0), (3.0, 9.0), (9.0, 9.0)]
            .iter()
            .map(|&(x, y)| FurnitureItem::new(FurnitureKind::RectTable, x, y, 2.0, 2.0))
            .collect();

        let cmp = compare_layouts(&sparse, &dense, &room);
        assert!(cmp.analysis_b.regions.is_empty());
        assert!(cmp.analysis_a.dead_space_area > 0.0);
        assert_relative_eq!(cmp.dead_space_distance, cmp.analysis_a.dead_space_area);
        assert!(cmp.coverage_delta > 0.0);

        let back = compare_layouts(&dense, &sparse, &room);
        assert_relative_eq!(back.dead_space_distance, cmp.dead_space_distance);
        assert_relative_eq!(back.cluster_distance, cmp.cluster_distance);
    }

    #[test]
    fn test_compare_cluster_profiles() {
        let room = RoomBoundary::rectangle(30.0, 10.0);
        let split = vec![
            FurnitureItem::of_kind(FurnitureKind::Chair, 5.0, 5.0),
            FurnitureItem::of_kind(FurnitureKind::Chair, 7.5, 5.0),
            FurnitureItem::of_kind(FurnitureKind::Chair, 20.0, 5.0),
        ];
        let joined = vec![
            FurnitureItem::of_kind(FurnitureKind::Chair, 5.0, 5.0),
            FurnitureItem::of_kind(FurnitureKind::Chair, 7.5, 5.0),
            FurnitureItem::of_kind(FurnitureKind::Chair, 10.0, 5.0),
        ];
        // sizes [2, 1] against [3]
        let cmp = compare_layouts(&split, &joined, &room);
        assert_relative_eq!(cmp.cluster_distance, 2.0);
        assert_relative_eq!(cmp.connectivity_delta, 0.5);
    }

    #[test]
    fn test_coverage_clamped() {
        let room = RoomBoundary::rectangle(4.0, 4.0);
        let items = vec![
            FurnitureItem::new(FurnitureKind::DanceFloor, 2.0, 2.0, 4.0, 4.0),
            FurnitureItem::new(FurnitureKind::Stage, 2.0, 2.0, 4.0, 4.0),
        ];
        assert_eq!(analyze_layout(&items, &room).coverage, 1.0);
    }
}
