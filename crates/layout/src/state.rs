//! Packed numeric state for the continuous solvers.
//!
//! A layout is flattened into `(x, y, rotation)` triplets, index-aligned with
//! an immutable array of [`ItemTemplate`]s that carry everything the solvers
//! never touch (kind, dimensions, seats).

use crate::furniture::{FurnitureItem, FurnitureKind, RoomBoundary};
use venue_core::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Values per item in the packed state.
pub const STATE_STRIDE: usize = 3;

/// Fixed metadata of one item.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ItemTemplate {
    /// Item kind.
    pub kind: FurnitureKind,
    /// Extent along the local x axis.
    pub width: f64,
    /// Extent along the local y axis.
    pub depth: f64,
    /// Guests seated.
    pub seats: u32,
}

impl From<&FurnitureItem> for ItemTemplate {
    fn from(item: &FurnitureItem) -> Self {
        Self {
            kind: item.kind,
            width: item.width,
            depth: item.depth,
            seats: item.seats,
        }
    }
}

impl ItemTemplate {
    /// Places the template at a pose.
    pub fn place(&self, x: f64, y: f64, rotation: f64) -> FurnitureItem {
        FurnitureItem {
            kind: self.kind,
            x,
            y,
            rotation,
            width: self.width,
            depth: self.depth,
            seats: self.seats,
        }
    }
}

/// Splits items into a packed state and their templates.
pub fn items_to_state(items: &[FurnitureItem]) -> (Vec<f64>, Vec<ItemTemplate>) {
    let mut state = Vec::with_capacity(items.len() * STATE_STRIDE);
    let mut templates = Vec::with_capacity(items.len());
    for item in items {
        state.extend_from_slice(&[item.x, item.y, item.rotation]);
        templates.push(ItemTemplate::from(item));
    }
    (state, templates)
}

/// Rebuilds items from a packed state.
///
/// Extra trailing values are ignored and missing triplets drop their items;
/// use [`state_to_items_checked`] when the lengths come from outside.
pub fn state_to_items(state: &[f64], templates: &[ItemTemplate]) -> Vec<FurnitureItem> {
    state
        .chunks_exact(STATE_STRIDE)
        .zip(templates)
        .map(|(pose, t)| t.place(pose[0], pose[1], pose[2]))
        .collect()
}

/// Like [`state_to_items`] but rejects a length mismatch.
pub fn state_to_items_checked(
    state: &[f64],
    templates: &[ItemTemplate],
) -> Result<Vec<FurnitureItem>> {
    let expected = templates.len() * STATE_STRIDE;
    if state.len() != expected {
        return Err(Error::DimensionMismatch {
            expected,
            actual: state.len(),
        });
    }
    Ok(state_to_items(state, templates))
}

/// Box bounds of the packed state: `x ∈ [0, W]`, `y ∈ [0, H]`, `rotation ∈ [0, 2π]`.
pub fn state_bounds(room: &RoomBoundary, n_items: usize) -> (Vec<f64>, Vec<f64>) {
    let lower = [0.0, 0.0, 0.0].repeat(n_items);
    let upper = [room.width, room.height, std::f64::consts::TAU].repeat(n_items);
    (lower, upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<FurnitureItem> {
        vec![
            FurnitureItem::of_kind(FurnitureKind::Stage, 30.0, 6.0),
            FurnitureItem::of_kind(FurnitureKind::Chair, 10.0, 20.0).with_rotation(0.5),
            FurnitureItem::of_kind(FurnitureKind::RoundTable, 40.0, 25.0).with_seats(8),
        ]
    }

    #[test]
    fn test_state_roundtrip_preserves_metadata() {
        let items = items();
        let (state, templates) = items_to_state(&items);
        assert_eq!(state.len(), 9);
        assert_eq!(templates.len(), 3);
        assert_eq!(state_to_items(&state, &templates), items);
    }

    #[test]
    fn test_checked_rejects_mismatch() {
        let (state, templates) = items_to_state(&items());
        assert!(state_to_items_checked(&state, &templates).is_ok());
        match state_to_items_checked(&state[..7], &templates) {
            Err(Error::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, 9);
                assert_eq!(actual, 7);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_state_bounds() {
        let room = RoomBoundary::rectangle(60.0, 40.0);
        let (lower, upper) = state_bounds(&room, 2);
        assert_eq!(lower, vec![0.0; 6]);
        assert_eq!(upper[3], 60.0);
        assert_eq!(upper[4], 40.0);
        assert!((upper[5] - std::f64::consts::TAU).abs() < 1e-12);
    }
}
