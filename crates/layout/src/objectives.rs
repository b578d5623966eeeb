//! Four-way decomposition of the layout energy.
//!
//! | Objective | Terms |
//! |-----------|-------|
//! | safety | overlap + aisle + egress |
//! | accessibility | ADA |
//! | experience | sightline + aesthetic + capacity |
//! | operations | service |
//!
//! Each term is scaled by its [`LayoutWeights`] entry, so the four objectives
//! sum to the scalar energy of the same layout.

use crate::energy::{compute_energy_breakdown, EnergyBreakdown};
use crate::furniture::{FurnitureItem, LayoutWeights, RoomBoundary};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of objectives.
pub const N_OBJECTIVES: usize = 4;

/// Objective names, in [`LayoutObjectives::as_array`] order.
pub const OBJECTIVE_NAMES: [&str; N_OBJECTIVES] =
    ["safety", "accessibility", "experience", "operations"];

/// Weighted objective values. All minimized.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayoutObjectives {
    /// Overlap, aisles and egress.
    pub safety: f64,
    /// Wheelchair spaces.
    pub accessibility: f64,
    /// Sightlines, aesthetics and seat count.
    pub experience: f64,
    /// Catering access.
    pub operations: f64,
}

impl LayoutObjectives {
    /// Groups a breakdown under `weights`.
    pub fn from_breakdown(b: &EnergyBreakdown, weights: &LayoutWeights) -> Self {
        Self {
            safety: weights.overlap * b.overlap + weights.aisle * b.aisle + weights.egress * b.egress,
            accessibility: weights.ada * b.ada,
            experience: weights.sightline * b.sightline
                + weights.aesthetic * b.aesthetic
                + weights.capacity * b.capacity,
            operations: weights.service * b.service,
        }
    }

    /// Values in [`OBJECTIVE_NAMES`] order.
    pub fn as_array(&self) -> [f64; N_OBJECTIVES] {
        [self.safety, self.accessibility, self.experience, self.operations]
    }

    /// Sum of the four objectives.
    pub fn total(&self) -> f64 {
        self.as_array().iter().sum()
    }
}

/// Evaluates the four objectives of a layout.
pub fn compute_objectives(
    items: &[FurnitureItem],
    room: &RoomBoundary,
    weights: &LayoutWeights,
    target_capacity: u32,
) -> LayoutObjectives {
    let breakdown = compute_energy_breakdown(items, room, target_capacity);
    LayoutObjectives::from_breakdown(&breakdown, weights)
}
