//! Neighbor generation for layout search.
//!
//! A move copies the layout and applies exactly one operator, chosen
//! uniformly:
//!
//! - **Translate**: shift one item by up to `magnitude` on each axis
//! - **Rotate**: small turn, or (30% of the time) snap to the nearest 90°
//! - **Swap**: exchange the positions of two items
//! - **BandShift**: slide every item in a horizontal band by a shared Δx
//! - **NudgeNearest**: push an item's nearest neighbor along the line joining them
//! - **Mirror**: reflect one item's x and rotation about the layout's centroid
//!
//! Positions are clamped into the room's bounds and rotations normalized to
//! `[0, 2π)`. A magnitude of zero returns an unchanged copy.

use crate::furniture::{FurnitureItem, Layout, RoomBoundary};
use crate::state::{items_to_state, state_to_items, ItemTemplate};
use rand::Rng;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

const SNAP_PROBABILITY: f64 = 0.3;
const MAX_TURN: f64 = PI / 12.0;
const EPS: f64 = 1e-12;

/// A single layout move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborOperator {
    /// Move one item.
    Translate,
    /// Turn or snap one item.
    Rotate,
    /// Exchange two positions.
    Swap,
    /// Shift a horizontal band of items together.
    BandShift,
    /// Move an item's nearest neighbor along their connecting axis.
    NudgeNearest,
    /// Mirror one item about the layout centroid.
    Mirror,
}

impl NeighborOperator {
    /// All operators.
    pub const ALL: [NeighborOperator; 6] = [
        NeighborOperator::Translate,
        NeighborOperator::Rotate,
        NeighborOperator::Swap,
        NeighborOperator::BandShift,
        NeighborOperator::NudgeNearest,
        NeighborOperator::Mirror,
    ];

    /// Picks an operator uniformly.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    /// Applies the operator in place.
    pub fn apply<R: Rng>(self, items: &mut [FurnitureItem], magnitude: f64, rng: &mut R) {
        let n = items.len();
        if n == 0 {
            return;
        }
        match self {
            NeighborOperator::Translate => {
                let i = rng.gen_range(0..n);
                items[i].x += rng.gen_range(-magnitude..=magnitude);
                items[i].y += rng.gen_range(-magnitude..=magnitude);
            }
            NeighborOperator::Rotate => {
                let i = rng.gen_range(0..n);
                if rng.gen::<f64>() < SNAP_PROBABILITY {
                    items[i].rotation = (items[i].rotation / FRAC_PI_2).round() * FRAC_PI_2;
                } else {
                    let turn = (magnitude * 0.1).min(MAX_TURN);
                    items[i].rotation += rng.gen_range(-turn..=turn);
                }
            }
            NeighborOperator::Swap => {
                if n < 2 {
                    return NeighborOperator::Translate.apply(items, magnitude, rng);
                }
                let i = rng.gen_range(0..n);
                let mut j = rng.gen_range(0..n - 1);
                if j >= i {
                    j += 1;
                }
                let (xi, yi) = (items[i].x, items[i].y);
                items[i].x = items[j].x;
                items[i].y = items[j].y;
                items[j].x = xi;
                items[j].y = yi;
            }
            NeighborOperator::BandShift => {
                let anchor = items[rng.gen_range(0..n)].y;
                let half_band = magnitude.max(1.0);
                let dx = rng.gen_range(-magnitude..=magnitude);
                for item in items.iter_mut().filter(|i| (i.y - anchor).abs() <= half_band) {
                    item.x += dx;
                }
            }
            NeighborOperator::NudgeNearest => {
                let i = rng.gen_range(0..n);
                let (x, y) = (items[i].x, items[i].y);
                let nearest = (0..n)
                    .filter(|&j| j != i)
                    .min_by(|&a, &b| {
                        let da = (items[a].x - x).hypot(items[a].y - y);
                        let db = (items[b].x - x).hypot(items[b].y - y);
                        da.total_cmp(&db)
                    });
                let Some(j) = nearest else {
                    return NeighborOperator::Translate.apply(items, magnitude, rng);
                };
                let (dx, dy) = (items[j].x - x, items[j].y - y);
                let len = dx.hypot(dy);
                let (ux, uy) = if len > EPS {
                    (dx / len, dy / len)
                } else {
                    (1.0, 0.0)
                };
                let step = rng.gen_range(-magnitude..=magnitude);
                items[j].x += ux * step;
                items[j].y += uy * step;
            }
            NeighborOperator::Mirror => {
                let cx = items.iter().map(|i| i.x).sum::<f64>() / n as f64;
                let i = rng.gen_range(0..n);
                items[i].x = 2.0 * cx - items[i].x;
                items[i].rotation = -items[i].rotation;
            }
        }
    }
}

fn normalize(items: &mut [FurnitureItem], room: &RoomBoundary) {
    for item in items {
        item.x = item.x.clamp(0.0, room.width);
        item.y = item.y.clamp(0.0, room.height);
        item.rotation = item.rotation.rem_euclid(TAU);
    }
}

/// Returns a perturbed copy of `items`.
pub fn perturb_items<R: Rng>(
    items: &[FurnitureItem],
    room: &RoomBoundary,
    magnitude: f64,
    rng: &mut R,
) -> Vec<FurnitureItem> {
    let mut out = items.to_vec();
    if magnitude.abs() <= EPS || out.is_empty() {
        return out;
    }
    NeighborOperator::random(rng).apply(&mut out, magnitude.abs(), rng);
    normalize(&mut out, room);
    out
}

/// Returns a perturbed copy of `layout`; the cached energy is carried over.
pub fn perturb_layout<R: Rng>(layout: &Layout, magnitude: f64, rng: &mut R) -> Layout {
    Layout {
        items: perturb_items(&layout.items, &layout.room, magnitude, rng),
        room: layout.room.clone(),
        energy: layout.energy,
    }
}

/// Packed-state variant of [`perturb_items`].
pub fn perturb_state<R: Rng>(
    state: &[f64],
    templates: &[ItemTemplate],
    room: &RoomBoundary,
    magnitude: f64,
    rng: &mut R,
) -> Vec<f64> {
    if magnitude.abs() <= EPS {
        return state.to_vec();
    }
    let items = state_to_items(state, templates);
    items_to_state(&perturb_items(&items, room, magnitude, rng)).0
}
