//! Occupancy grid and multi-source shortest-path flood fill.
//!
//! The room is discretized into square cells (1 ft by default). A cell is
//! blocked when its center lies outside the room polygon or inside a
//! path-blocking item grown by half the required path width, so any free cell
//! can host a walker of that width.
//!
//! [`DistanceField`] runs Dijkstra from a set of seed cells over the free
//! cells with 8-connectivity (cardinal step 1, diagonal √2, times the cell
//! size). Diagonal steps may not cut the corner of a blocked cell.

use crate::furniture::{FurnitureItem, RoomBoundary};
use crate::geometry::{point_in_polygon, Obb};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Default cell edge in feet.
pub const CELL_SIZE: f64 = 1.0;
/// Clear width of an egress path in feet (44 in).
pub const EGRESS_PATH_WIDTH: f64 = 3.67;
/// Clear width of an accessible route in feet.
pub const ADA_PATH_WIDTH: f64 = 3.0;
/// Clear width of a catering route in feet.
pub const SERVICE_PATH_WIDTH: f64 = 5.0;

/// Boolean occupancy grid over the room's bounding rectangle.
#[derive(Debug, Clone)]
pub struct Grid {
    cols: usize,
    rows: usize,
    cell: f64,
    blocked: Vec<bool>,
}

impl Grid {
    /// Grid where only cells outside the room are blocked.
    pub fn new(room: &RoomBoundary, cell: f64) -> Self {
        let cell = cell.max(0.1);
        let cols = ((room.width / cell).ceil() as usize).max(1);
        let rows = ((room.height / cell).ceil() as usize).max(1);
        let mut blocked = vec![false; cols * rows];
        for r in 0..rows {
            for c in 0..cols {
                let (x, y) = ((c as f64 + 0.5) * cell, (r as f64 + 0.5) * cell);
                blocked[r * cols + c] = !point_in_polygon(x, y, &room.vertices);
            }
        }
        Self {
            cols,
            rows,
            cell,
            blocked,
        }
    }

    /// Grid with path-blocking items grown by `path_width / 2`.
    pub fn with_obstacles(
        room: &RoomBoundary,
        items: &[FurnitureItem],
        path_width: f64,
        cell: f64,
    ) -> Self {
        let mut grid = Self::new(room, cell);
        let inflate = path_width / 2.0;
        for item in items.iter().filter(|i| i.kind.blocks_paths()) {
            grid.block_obb(&item.obb(), inflate);
        }
        grid
    }

    /// Marks every cell whose center falls in `obb` grown by `inflate`.
    pub fn block_obb(&mut self, obb: &Obb, inflate: f64) {
        for idx in self.cells_in(obb, inflate) {
            self.blocked[idx] = true;
        }
    }

    /// Indices of cells whose centers fall in `obb` grown by `inflate`.
    pub fn cells_in(&self, obb: &Obb, inflate: f64) -> Vec<usize> {
        let bb = obb.aabb().expand(inflate);
        let c0 = ((bb.min_x / self.cell).floor().max(0.0)) as usize;
        let r0 = ((bb.min_y / self.cell).floor().max(0.0)) as usize;
        let c1 = ((bb.max_x / self.cell).ceil().max(0.0) as usize).min(self.cols);
        let r1 = ((bb.max_y / self.cell).ceil().max(0.0) as usize).min(self.rows);
        let mut out = Vec::new();
        for r in r0..r1 {
            for c in c0..c1 {
                let (x, y) = self.center(c, r);
                if obb.contains_point(x, y, inflate) {
                    out.push(r * self.cols + c);
                }
            }
        }
        out
    }

    /// Columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Cell edge length.
    pub fn cell_size(&self) -> f64 {
        self.cell
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    /// Returns true if the grid has no cells.
    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }

    /// Center of cell `(c, r)`.
    pub fn center(&self, c: usize, r: usize) -> (f64, f64) {
        ((c as f64 + 0.5) * self.cell, (r as f64 + 0.5) * self.cell)
    }

    /// Center of the cell at flat index `idx`.
    pub fn center_of(&self, idx: usize) -> (f64, f64) {
        self.center(idx % self.cols, idx / self.cols)
    }

    /// Cell containing `(x, y)`, clamped to the grid.
    pub fn cell_at(&self, x: f64, y: f64) -> usize {
        let c = ((x / self.cell).floor().max(0.0) as usize).min(self.cols - 1);
        let r = ((y / self.cell).floor().max(0.0) as usize).min(self.rows - 1);
        r * self.cols + c
    }

    /// Returns true if the cell at `idx` is blocked.
    pub fn is_blocked(&self, idx: usize) -> bool {
        self.blocked[idx]
    }

    /// Free cells within `radius` of `(x, y)`.
    pub fn free_cells_near(&self, x: f64, y: f64, radius: f64) -> Vec<usize> {
        let c0 = (((x - radius) / self.cell).floor().max(0.0)) as usize;
        let r0 = (((y - radius) / self.cell).floor().max(0.0)) as usize;
        let c1 = ((((x + radius) / self.cell).ceil().max(0.0)) as usize).min(self.cols);
        let r1 = ((((y + radius) / self.cell).ceil().max(0.0)) as usize).min(self.rows);
        let mut out = Vec::new();
        for r in r0..r1 {
            for c in c0..c1 {
                let idx = r * self.cols + c;
                let (cx, cy) = self.center(c, r);
                if !self.blocked[idx] && (cx - x).hypot(cy - y) <= radius {
                    out.push(idx);
                }
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    cost: f64,
    idx: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cost.total_cmp(&other.cost) == Ordering::Equal && self.idx == other.idx
    }
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    // Reversed so the max-heap pops the smallest cost.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.idx.cmp(&self.idx))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest walking distance from the seed cells to every free cell.
#[derive(Debug, Clone)]
pub struct DistanceField {
    grid: Grid,
    dist: Vec<f64>,
}

impl DistanceField {
    /// Runs Dijkstra from explicit seed cells. Blocked seeds are ignored.
    pub fn from_seeds(grid: Grid, seeds: &[usize]) -> Self {
        let mut dist = vec![f64::INFINITY; grid.len()];
        let mut heap = BinaryHeap::new();
        for &s in seeds {
            if s < dist.len() && !grid.blocked[s] && dist[s] > 0.0 {
                dist[s] = 0.0;
                heap.push(HeapEntry { cost: 0.0, idx: s });
            }
        }

        let (cols, rows) = (grid.cols as isize, grid.rows as isize);
        let straight = grid.cell;
        let diagonal = grid.cell * std::f64::consts::SQRT_2;
        const STEPS: [(isize, isize); 8] = [
            (1, 0),
            (-1, 0),
            (0, 1),
            (0, -1),
            (1, 1),
            (1, -1),
            (-1, 1),
            (-1, -1),
        ];

        while let Some(HeapEntry { cost, idx }) = heap.pop() {
            if cost > dist[idx] {
                continue;
            }
            let (c, r) = ((idx % grid.cols) as isize, (idx / grid.cols) as isize);
            for (dc, dr) in STEPS {
                let (nc, nr) = (c + dc, r + dr);
                if nc < 0 || nr < 0 || nc >= cols || nr >= rows {
                    continue;
                }
                let next = (nr * cols + nc) as usize;
                if grid.blocked[next] {
                    continue;
                }
                let step = if dc != 0 && dr != 0 {
                    // No squeezing between two blocked corners.
                    let side_a = (r * cols + nc) as usize;
                    let side_b = (nr * cols + c) as usize;
                    if grid.blocked[side_a] || grid.blocked[side_b] {
                        continue;
                    }
                    diagonal
                } else {
                    straight
                };
                let candidate = cost + step;
                if candidate < dist[next] {
                    dist[next] = candidate;
                    heap.push(HeapEntry {
                        cost: candidate,
                        idx: next,
                    });
                }
            }
        }

        Self { grid, dist }
    }

    /// Runs Dijkstra seeded at every free cell within reach of a room exit.
    pub fn from_exits(grid: Grid, room: &RoomBoundary) -> Self {
        let mut seeds = Vec::new();
        for exit in &room.exits {
            let radius = exit.width / 2.0 + grid.cell;
            seeds.extend(grid.free_cells_near(exit.x, exit.y, radius));
        }
        Self::from_seeds(grid, &seeds)
    }

    /// Egress field: exits as seeds, items grown by half the path width.
    pub fn for_path(room: &RoomBoundary, items: &[FurnitureItem], path_width: f64) -> Self {
        let grid = Grid::with_obstacles(room, items, path_width, CELL_SIZE);
        Self::from_exits(grid, room)
    }

    /// Underlying grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Distance at a flat cell index.
    pub fn at(&self, idx: usize) -> f64 {
        self.dist[idx]
    }

    /// Distance at the cell containing `(x, y)`; infinite when unreachable.
    pub fn distance_at(&self, x: f64, y: f64) -> f64 {
        self.dist[self.grid.cell_at(x, y)]
    }

    /// Shortest distance to any reachable cell touching `obb` grown by `margin`.
    ///
    /// Items that block paths sit on blocked cells themselves, so their
    /// reachability is measured at the free cells just around them.
    pub fn distance_to_item(&self, obb: &Obb, margin: f64) -> f64 {
        self.grid
            .cells_in(obb, margin)
            .into_iter()
            .map(|idx| self.dist[idx])
            .fold(f64::INFINITY, f64::min)
    }

    /// Fraction of free cells that are reachable.
    pub fn reachable_fraction(&self) -> f64 {
        let free = self.grid.blocked.iter().filter(|b| !**b).count();
        if free == 0 {
            return 0.0;
        }
        let reached = self.dist.iter().filter(|d| d.is_finite()).count();
        reached as f64 / free as f64
    }
}
