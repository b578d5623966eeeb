//! Geometry kernel: oriented boxes, SAT tests and polygon helpers.
//!
//! Furniture footprints are oriented bounding boxes ([`Obb`]). Collision and
//! clearance are measured with the separating axis theorem over the two edge
//! normals of each box.
//!
//! # Overlap area
//!
//! [`sat_overlap`] returns `depth × extent`, where `depth` is the smallest
//! penetration over all SAT axes and `extent` is the overlap of the two shapes
//! measured along the axis perpendicular to it. For axis-aligned boxes this is
//! the exact intersection area; for rotated, partially overlapping boxes it is
//! an approximation that can over- or under-estimate the true area.

use geo::{Area, Centroid, Coord, LineString, Polygon};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const EPS: f64 = 1e-12;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Minimum x.
    pub min_x: f64,
    /// Minimum y.
    pub min_y: f64,
    /// Maximum x.
    pub max_x: f64,
    /// Maximum y.
    pub max_y: f64,
}

impl Aabb {
    /// Creates a box from its corners.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Grows the box by `margin` on every side.
    pub fn expand(&self, margin: f64) -> Self {
        Self::new(
            self.min_x - margin,
            self.min_y - margin,
            self.max_x + margin,
            self.max_y + margin,
        )
    }

    /// Returns true if `(x, y)` lies inside or on the box.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Returns true if the boxes touch or overlap.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }
}

/// Oriented bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Obb {
    /// Center x.
    pub cx: f64,
    /// Center y.
    pub cy: f64,
    /// Half extent along the local x axis.
    pub half_width: f64,
    /// Half extent along the local y axis.
    pub half_depth: f64,
    /// Rotation in radians.
    pub rotation: f64,
}

impl Obb {
    /// Creates a box from its center, full extents and rotation.
    pub fn new(cx: f64, cy: f64, width: f64, depth: f64, rotation: f64) -> Self {
        Self {
            cx,
            cy,
            half_width: width / 2.0,
            half_depth: depth / 2.0,
            rotation,
        }
    }

    /// Unit vectors of the local x and y axes.
    pub fn axes(&self) -> [(f64, f64); 2] {
        let (s, c) = self.rotation.sin_cos();
        [(c, s), (-s, c)]
    }

    /// Corners in counter-clockwise order.
    pub fn corners(&self) -> [(f64, f64); 4] {
        let [(ux, uy), (vx, vy)] = self.axes();
        let (hw, hd) = (self.half_width, self.half_depth);
        let at = |a: f64, b: f64| (self.cx + a * ux + b * vx, self.cy + a * uy + b * vy);
        [at(-hw, -hd), at(hw, -hd), at(hw, hd), at(-hw, hd)]
    }

    /// Axis-aligned bounds of the box.
    pub fn aabb(&self) -> Aabb {
        let corners = self.corners();
        let mut bb = Aabb::new(f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (x, y) in corners {
            bb.min_x = bb.min_x.min(x);
            bb.min_y = bb.min_y.min(y);
            bb.max_x = bb.max_x.max(x);
            bb.max_y = bb.max_y.max(y);
        }
        bb
    }

    /// Returns true if `(x, y)` lies inside the box grown by `inflate`.
    pub fn contains_point(&self, x: f64, y: f64, inflate: f64) -> bool {
        let [(ux, uy), (vx, vy)] = self.axes();
        let (dx, dy) = (x - self.cx, y - self.cy);
        let along = dx * ux + dy * uy;
        let across = dx * vx + dy * vy;
        along.abs() <= self.half_width + inflate && across.abs() <= self.half_depth + inflate
    }

    /// Projection interval of the box onto a unit axis.
    fn project(&self, axis: (f64, f64)) -> (f64, f64) {
        project_points(&self.corners(), axis)
    }
}

fn project_points(points: &[(f64, f64)], axis: (f64, f64)) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &(x, y) in points {
        let p = x * axis.0 + y * axis.1;
        lo = lo.min(p);
        hi = hi.max(p);
    }
    (lo, hi)
}

fn interval_overlap(a: (f64, f64), b: (f64, f64)) -> f64 {
    a.1.min(b.1) - a.0.max(b.0)
}

/// Approximate overlap area of two boxes (see the module docs).
///
/// Zero whenever a separating axis exists. Symmetric in its arguments.
pub fn sat_overlap(a: &Obb, b: &Obb) -> f64 {
    let axes = [a.axes(), b.axes()].concat();
    let mut depths = [0.0; 4];

    for (k, &axis) in axes.iter().enumerate() {
        let d = interval_overlap(a.project(axis), b.project(axis));
        if d <= 0.0 {
            return 0.0;
        }
        depths[k] = d;
    }

    let min_depth = depths.iter().copied().fold(f64::INFINITY, f64::min);

    // Several axes can share the minimum depth; take the smallest area so the
    // result does not depend on argument order.
    let mut area = f64::INFINITY;
    for (k, &axis) in axes.iter().enumerate() {
        if depths[k] > min_depth + EPS {
            continue;
        }
        let perp = (-axis.1, axis.0);
        let extent = interval_overlap(a.project(perp), b.project(perp)).max(0.0);
        area = area.min(depths[k] * extent);
    }
    area
}

/// Clearance between two boxes: the largest separation over the SAT axes.
///
/// Zero when the boxes touch or overlap.
pub fn obb_gap(a: &Obb, b: &Obb) -> f64 {
    let mut gap = 0.0_f64;
    for axis in [a.axes(), b.axes()].concat() {
        let pa = a.project(axis);
        let pb = b.project(axis);
        gap = gap.max(pb.0 - pa.1).max(pa.0 - pb.1);
    }
    gap
}

/// Ray-casting point-in-polygon test.
pub fn point_in_polygon(x: f64, y: f64, polygon: &[(f64, f64)]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = polygon[i];
        let (xj, yj) = polygon[j];
        if (yi > y) != (yj > y) {
            let x_cross = xj + (y - yj) * (xi - xj) / (yi - yj);
            if x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Slab test of the segment `p0 → p1` against `bb`.
///
/// Returns the entry parameter `t ∈ [0, 1]` (0 when `p0` is inside), or
/// `None` when the segment misses the box.
pub fn segment_aabb_intersection(p0: (f64, f64), p1: (f64, f64), bb: &Aabb) -> Option<f64> {
    let mut t_min = 0.0_f64;
    let mut t_max = 1.0_f64;

    let slabs = [
        (p0.0, p1.0 - p0.0, bb.min_x, bb.max_x),
        (p0.1, p1.1 - p0.1, bb.min_y, bb.max_y),
    ];
    for (origin, dir, lo, hi) in slabs {
        if dir.abs() < EPS {
            if origin < lo || origin > hi {
                return None;
            }
            continue;
        }
        let inv = 1.0 / dir;
        let mut t0 = (lo - origin) * inv;
        let mut t1 = (hi - origin) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_min = t_min.max(t0);
        t_max = t_max.min(t1);
        if t_min > t_max {
            return None;
        }
    }
    Some(t_min)
}

fn to_geo(polygon: &[(f64, f64)]) -> Polygon<f64> {
    let coords: Vec<Coord<f64>> = polygon.iter().map(|&(x, y)| Coord { x, y }).collect();
    Polygon::new(LineString::from(coords), vec![])
}

/// Unsigned polygon area.
pub fn polygon_area(polygon: &[(f64, f64)]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    to_geo(polygon).unsigned_area()
}

/// Area centroid; the vertex mean for degenerate polygons.
pub fn polygon_centroid(polygon: &[(f64, f64)]) -> (f64, f64) {
    if polygon.is_empty() {
        return (0.0, 0.0);
    }
    if polygon.len() >= 3 && polygon_area(polygon) > EPS {
        if let Some(c) = to_geo(polygon).centroid() {
            return (c.x(), c.y());
        }
    }
    let n = polygon.len() as f64;
    let sx: f64 = polygon.iter().map(|p| p.0).sum();
    let sy: f64 = polygon.iter().map(|p| p.1).sum();
    (sx / n, sy / n)
}

/// Distance from a point to a segment.
pub fn point_segment_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    if len_sq < EPS {
        return ((p.0 - a.0).powi(2) + (p.1 - a.1).powi(2)).sqrt();
    }
    let t = (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0);
    let (qx, qy) = (a.0 + t * dx, a.1 + t * dy);
    ((p.0 - qx).powi(2) + (p.1 - qy).powi(2)).sqrt()
}

/// Distance from a point to the nearest polygon edge.
pub fn distance_to_boundary(x: f64, y: f64, polygon: &[(f64, f64)]) -> f64 {
    let n = polygon.len();
    if n == 0 {
        return 0.0;
    }
    (0..n)
        .map(|i| point_segment_distance((x, y), polygon[i], polygon[(i + 1) % n]))
        .fold(f64::INFINITY, f64::min)
}

/// Smallest angle between `rotation` and a multiple of 90°, in `[0, π/4]`.
pub fn angular_offset_to_grid(rotation: f64) -> f64 {
    let quarter = std::f64::consts::FRAC_PI_2;
    let r = rotation.rem_euclid(quarter);
    r.min(quarter - r)
}
