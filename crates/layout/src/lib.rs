//! # Venue Layout
//!
//! Furniture layout and event planning for the venue optimization engine.
//!
//! This crate describes what a good venue looks like and wires the solvers of
//! [`venue_core`] into a planning pipeline.
//!
//! ## Features
//!
//! - Room and furniture model with oriented footprints
//! - Eight-term layout energy (overlap, aisles, egress, sightlines, capacity,
//!   ADA, aesthetics, service access)
//! - Template layouts for theater, banquet, classroom, cocktail, boardroom and
//!   u-shape events
//! - Event → room → timeslot scheduling over QUBO, Potts and transport models
//! - Dead-space analysis and a four-objective decomposition for Pareto search
//! - An [`Orchestrator`] that runs generation, scheduling, tempering, CMA-ES,
//!   MCMC and NSGA-II end to end
//!
//! ## Quick Start
//!
//! ```rust
//! use venue_layout::{
//!     compute_layout_energy, generate_template_layout, LayoutStyle, LayoutWeights, RoomBoundary,
//! };
//!
//! let room = RoomBoundary::rectangle(60.0, 40.0).with_exit(30.0, 40.0, 6.0);
//! let layout = generate_template_layout(&room, LayoutStyle::Theater, 80, 7);
//!
//! let energy = compute_layout_energy(&layout.items, &room, &LayoutWeights::default(), 80);
//! assert!(energy >= 0.0);
//! println!("{} items, {} seats, energy {:.2}", layout.items.len(), layout.total_seats(), energy);
//! ```
//!
//! ## Scheduling
//!
//! ```rust
//! use venue_layout::{EventSpec, RoomSpec, SchedulingSolver, TimeslotSpec};
//!
//! let events = vec![EventSpec::new("keynote", 120, 60), EventSpec::new("workshop", 30, 90)];
//! let rooms = vec![RoomSpec::new("hall", 200), RoomSpec::new("studio", 40)];
//! let slots = vec![TimeslotSpec::new("morning", 0, 9 * 60, 12 * 60)];
//!
//! let result = SchedulingSolver::default().solve(&events, &rooms, &slots);
//! assert!(result.feasible);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization support

pub mod analysis;
pub mod energy;
pub mod furniture;
pub mod geometry;
pub mod grid;
pub mod neighbor;
pub mod objectives;
pub mod pipeline;
pub mod schedule;
pub mod spatial_index;
pub mod state;
pub mod template;

// Re-exports
pub use analysis::{
    analyze_layout, compare_layouts, furniture_clusters, DeadSpaceRegion, LayoutAnalysis,
    LayoutComparison,
};
pub use energy::{
    compute_energy_breakdown, compute_layout_energy, count_violations, EnergyBreakdown,
};
pub use furniture::{AisleRole, Exit, FurnitureItem, FurnitureKind, Layout, LayoutWeights, RoomBoundary};
pub use geometry::{obb_gap, sat_overlap, Aabb, Obb};
pub use grid::{DistanceField, Grid};
pub use neighbor::{perturb_items, perturb_layout, perturb_state, NeighborOperator};
pub use objectives::{compute_objectives, LayoutObjectives, N_OBJECTIVES, OBJECTIVE_NAMES};
pub use pipeline::{
    LayoutProblem, Orchestrator, ParetoLayout, PipelineConfig, PipelineStage, PlanRequest,
    PlanResponse, StageStats,
};
pub use schedule::{
    build_potts_scheduling, build_scheduling_qubo, EventAssignment, EventSpec, RoomSpec,
    ScheduleResult, SchedulerConfig, SchedulingMethod, SchedulingPenalties, SchedulingSolver,
    TimeslotSpec,
};
pub use spatial_index::{SpatialEntry, SpatialIndex};
pub use state::{items_to_state, state_bounds, state_to_items, state_to_items_checked, ItemTemplate};
pub use template::{generate_template_layout, parse_description, LayoutStyle, ParsedDescription};
pub use venue_core::{Error, Result};
