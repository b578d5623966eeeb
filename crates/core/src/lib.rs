//! # Venue Core
//!
//! Domain-agnostic optimization frameworks for the venue layout engine.
//!
//! The layout crate describes *what* a good venue is (energy terms, templates,
//! scheduling costs); this crate provides the solvers that search for one.
//! Nothing here knows about furniture or rooms.
//!
//! ## Core Components
//!
//! - **SA framework**: [`SaRunner`], [`SaProblem`] - Simulated annealing with
//!   geometric, linear or logarithmic cooling and optional reheats
//! - **Parallel tempering**: [`PtRunner`] - Replica exchange over any [`SaProblem`]
//! - **Discrete models**: [`QuboMatrix`], [`IsingModel`], [`PottsModel`] and
//!   their annealing adapters in [`discrete`]
//! - **Simulated bifurcation**: [`simulated_bifurcation`] - Ising ground states
//!   from adiabatic oscillator dynamics
//! - **CMA-ES**: [`CmaesRunner`] - Continuous black-box minimization
//! - **MCMC**: [`McmcSampler`] - Metropolis–Hastings at fixed temperature
//! - **MOEA**: [`MoeaRunner`] - NSGA-II Pareto optimization
//! - **Optimal transport**: [`sinkhorn`] - Entropic OT plans, with
//!   [`sinkhorn_unbalanced`] and [`sinkhorn_partial`] relaxations
//!
//! ## Solver Summary
//!
//! | Solver | Search space | Output |
//! |--------|--------------|--------|
//! | `SaRunner` | any (neighbor move) | best state |
//! | `PtRunner` | any (neighbor move) | best state + replicas |
//! | `solve_qubo_sa` / `solve_qubo_pt` | `{0,1}^n` | bits + energy |
//! | `simulated_bifurcation` | `{-1,+1}^n` | spins + energy |
//! | `CmaesRunner` | `R^n` (optionally boxed) | best point |
//! | `McmcSampler` | any (symmetric move) | samples |
//! | `MoeaRunner` | boxed `R^n` | Pareto front |
//! | `sinkhorn` | transport polytope | plan + cost |
//! | `sinkhorn_unbalanced` / `sinkhorn_partial` | relaxed polytope | plan + cost + mass |
//!
//! ## Configuration
//!
//! Every solver takes a config struct with `Default` and chained builders. All
//! stochastic solvers carry an explicit seed:
//!
//! ```rust
//! use venue_core::{PtConfig, SaConfig};
//!
//! let sa = SaConfig::new()
//!     .with_initial_temp(50.0)
//!     .with_max_iterations(20_000)
//!     .with_seed(7);
//!
//! let pt = PtConfig::new()
//!     .with_replicas(6)
//!     .with_temperature_range(0.1, 10.0)
//!     .with_seed(7);
//! # let _ = (sa, pt);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization support

pub mod bifurcation;
pub mod cmaes;
pub mod discrete;
pub mod error;
pub mod mcmc;
pub mod moea;
pub mod ot;
pub mod qubo;
pub mod sa;
pub mod tempering;

// Re-exports
pub use bifurcation::{simulated_bifurcation, simulated_bifurcation_qubo, SbConfig, SbVariant};
pub use cmaes::{minimize, CmaesConfig, CmaesResult, CmaesRunner, CmaesStop};
pub use discrete::{
    solve_ising_sa, solve_potts_sa, solve_qubo_pt, solve_qubo_sa, Assignment, DiscreteResult,
};
pub use error::{Error, Result};
pub use mcmc::{McmcConfig, McmcResult, McmcSampler};
pub use moea::{
    crowding_distance, dominates, fast_non_dominated_sort, MoeaConfig, MoeaProblem, MoeaResult,
    MoeaRunner, ParetoSolution,
};
pub use ot::{sinkhorn, sinkhorn_partial, sinkhorn_unbalanced, SinkhornConfig, SinkhornResult};
pub use qubo::{
    bits_to_spins, evaluate_ising, evaluate_potts, evaluate_qubo, qubo_to_ising, spins_to_bits,
    IsingModel, PottsModel, QuboMatrix,
};
pub use sa::{
    metropolis_accept, CoolingSchedule, SaConfig, SaProblem, SaResult, SaRunner, SaSolution,
};
pub use tempering::{PtConfig, PtResult, PtRunner};
