//! Planning pipeline.
//!
//! ```text
//! description + room ──► template ──► PT ──► CMA-ES ──► MCMC alternatives
//!                                               └─────► NSGA-II Pareto front
//! events + rooms + slots ──► scheduler
//! ```
//!
//! Every stage is a plain synchronous call that takes its inputs by reference
//! and returns new values. Each stage derives its own seed from
//! [`PipelineConfig::seed`], so stages can be rerun in isolation and still
//! reproduce the full run.
//!
//! The continuous stages share [`LayoutProblem`], which exposes the packed
//! `(x, y, rotation)` state to the annealing, sampling and evolutionary
//! runners and the energy evaluator as their objective.

use crate::energy::{compute_energy_breakdown, compute_layout_energy, count_violations};
use crate::furniture::{Layout, LayoutWeights, RoomBoundary};
use crate::neighbor::perturb_state;
use crate::objectives::{compute_objectives, LayoutObjectives};
use crate::schedule::{
    validate_schedule_input, EventSpec, RoomSpec, ScheduleResult, SchedulerConfig,
    SchedulingSolver, TimeslotSpec,
};
use crate::state::{items_to_state, state_bounds, state_to_items, ItemTemplate, STATE_STRIDE};
use crate::template::{generate_template_layout, parse_description};
use rand::Rng;
use std::fmt;
use std::time::{Duration, Instant};
use venue_core::{
    CmaesConfig, CmaesRunner, Error, McmcConfig, McmcSampler, MoeaConfig, MoeaProblem,
    MoeaRunner, PtConfig, PtRunner, Result, SaProblem, SaSolution,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const VIOLATION_TOLERANCE: f64 = 1e-6;

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PipelineStage {
    /// Template generation.
    Generate,
    /// Event scheduling.
    Schedule,
    /// PT + CMA-ES refinement.
    Optimize,
    /// MCMC alternatives.
    Sample,
    /// Pareto front.
    Pareto,
}

impl PipelineStage {
    fn index(self) -> u64 {
        match self {
            PipelineStage::Generate => 1,
            PipelineStage::Schedule => 2,
            PipelineStage::Optimize => 3,
            PipelineStage::Sample => 4,
            PipelineStage::Pareto => 5,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Generate => "generate",
            PipelineStage::Schedule => "schedule",
            PipelineStage::Optimize => "optimize",
            PipelineStage::Sample => "sample",
            PipelineStage::Pareto => "pareto",
        };
        f.write_str(name)
    }
}

/// Summary of one stage.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StageStats {
    /// Stage.
    pub stage: PipelineStage,
    /// Wall time.
    pub solve_time: Duration,
    /// Objective evaluations (or proposals) spent.
    pub iterations: u64,
    /// In `[0, 1]`, higher is better.
    pub quality: f64,
    /// Violated energy terms or schedule constraints.
    pub violations: usize,
    /// Seats, events, samples or front members produced.
    pub items_placed: usize,
    /// What the stage was asked for.
    pub items_requested: usize,
}

impl StageStats {
    fn log(&self) {
        log::info!(
            "[{}] {:?}, {} iterations, quality {:.3}, {} violations, {}/{} placed",
            self.stage,
            self.solve_time,
            self.iterations,
            self.quality,
            self.violations,
            self.items_placed,
            self.items_requested
        );
    }
}

fn layout_quality(energy: f64) -> f64 {
    1.0 / (1.0 + energy.max(0.0))
}

/// Configuration for [`Orchestrator`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Base seed; each stage derives its own.
    pub seed: u64,
    /// Parallel tempering over the packed state.
    pub pt: PtConfig,
    /// CMA-ES refinement; the budget is shared by all item blocks.
    pub cmaes: CmaesConfig,
    /// Alternative sampling.
    pub mcmc: McmcConfig,
    /// Pareto search.
    pub moea: MoeaConfig,
    /// Scheduling.
    pub scheduler: SchedulerConfig,
    /// Neighbor move magnitude in feet.
    pub move_magnitude: f64,
    /// Items refined together by one CMA-ES run.
    pub cmaes_block_items: usize,
    /// Alternatives produced by the full pipeline.
    pub alternatives: usize,
    /// Minimum mean item displacement between kept alternatives, in feet.
    pub min_diversity: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            pt: PtConfig::default()
                .with_replicas(6)
                .with_temperature_range(0.5, 200.0)
                .with_sweeps(100)
                .with_steps_per_sweep(10),
            cmaes: CmaesConfig::default()
                .with_sigma(0.5)
                .with_max_evaluations(2_000),
            mcmc: McmcConfig::default()
                .with_temperature(5.0)
                .with_burn_in(200)
                .with_thin(5),
            moea: MoeaConfig::default()
                .with_population_size(32)
                .with_generations(30),
            scheduler: SchedulerConfig::default(),
            move_magnitude: 2.0,
            cmaes_block_items: 16,
            alternatives: 3,
            min_diversity: 0.5,
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Small budgets for previews and tests.
    pub fn quick() -> Self {
        Self {
            pt: PtConfig::default()
                .with_replicas(3)
                .with_temperature_range(0.5, 50.0)
                .with_sweeps(15)
                .with_steps_per_sweep(4),
            cmaes: CmaesConfig::default()
                .with_sigma(0.3)
                .with_max_evaluations(120),
            mcmc: McmcConfig::default()
                .with_temperature(5.0)
                .with_burn_in(20)
                .with_thin(2),
            moea: MoeaConfig::default()
                .with_population_size(8)
                .with_generations(4),
            scheduler: SchedulerConfig::default().with_sa(
                venue_core::SaConfig::default()
                    .with_initial_temp(20.0)
                    .with_max_iterations(3_000),
            ),
            ..Self::default()
        }
    }

    /// Sets the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the tempering settings.
    pub fn with_pt(mut self, pt: PtConfig) -> Self {
        self.pt = pt;
        self
    }

    /// Sets the CMA-ES settings.
    pub fn with_cmaes(mut self, cmaes: CmaesConfig) -> Self {
        self.cmaes = cmaes;
        self
    }

    /// Sets the sampler settings.
    pub fn with_mcmc(mut self, mcmc: McmcConfig) -> Self {
        self.mcmc = mcmc;
        self
    }

    /// Sets the Pareto search settings.
    pub fn with_moea(mut self, moea: MoeaConfig) -> Self {
        self.moea = moea;
        self
    }

    /// Sets the scheduler settings.
    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Sets the neighbor move magnitude.
    pub fn with_move_magnitude(mut self, feet: f64) -> Self {
        self.move_magnitude = feet.max(0.0);
        self
    }

    /// Sets the CMA-ES block size.
    pub fn with_cmaes_block_items(mut self, n: usize) -> Self {
        self.cmaes_block_items = n.max(1);
        self
    }

    /// Sets the number of alternatives.
    pub fn with_alternatives(mut self, n: usize) -> Self {
        self.alternatives = n;
        self
    }

    /// Sets the diversity threshold.
    pub fn with_min_diversity(mut self, feet: f64) -> Self {
        self.min_diversity = feet.max(0.0);
        self
    }
}

/// Packed state with its energy.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedLayout {
    /// `(x, y, rotation)` triplets.
    pub state: Vec<f64>,
    energy: f64,
}

impl SaSolution for PackedLayout {
    fn energy(&self) -> f64 {
        self.energy
    }

    fn set_energy(&mut self, energy: f64) {
        self.energy = energy;
    }
}

/// A layout search problem over the packed state.
///
/// Drives [`PtRunner`] and [`McmcSampler`] through [`SaProblem`] and
/// [`MoeaRunner`] through [`MoeaProblem`], where the objectives are the four
/// groups of [`LayoutObjectives`].
#[derive(Debug, Clone)]
pub struct LayoutProblem {
    templates: Vec<ItemTemplate>,
    initial: Vec<f64>,
    room: RoomBoundary,
    weights: LayoutWeights,
    target_capacity: u32,
    magnitude: f64,
}

impl LayoutProblem {
    /// Creates a problem starting at `layout`.
    pub fn new(layout: &Layout, weights: LayoutWeights, target_capacity: u32, magnitude: f64) -> Self {
        let (initial, templates) = items_to_state(&layout.items);
        Self {
            templates,
            initial,
            room: layout.room.clone(),
            weights,
            target_capacity,
            magnitude,
        }
    }

    /// Starting state.
    pub fn initial_state(&self) -> &[f64] {
        &self.initial
    }

    /// Item templates, index-aligned with the state.
    pub fn templates(&self) -> &[ItemTemplate] {
        &self.templates
    }

    /// Weighted energy of a state.
    pub fn energy_of(&self, state: &[f64]) -> f64 {
        let items = state_to_items(state, &self.templates);
        compute_layout_energy(&items, &self.room, &self.weights, self.target_capacity)
    }

    /// Rebuilds a layout from a state.
    pub fn to_layout(&self, state: &[f64], energy: f64) -> Layout {
        Layout::new(state_to_items(state, &self.templates), self.room.clone()).with_energy(energy)
    }
}

impl SaProblem for LayoutProblem {
    type Solution = PackedLayout;

    fn initial_solution<R: Rng>(&self, _rng: &mut R) -> PackedLayout {
        PackedLayout {
            state: self.initial.clone(),
            energy: f64::INFINITY,
        }
    }

    fn neighbor<R: Rng>(&self, solution: &PackedLayout, rng: &mut R) -> PackedLayout {
        PackedLayout {
            state: perturb_state(&solution.state, &self.templates, &self.room, self.magnitude, rng),
            energy: f64::INFINITY,
        }
    }

    fn evaluate(&self, solution: &mut PackedLayout) {
        solution.energy = self.energy_of(&solution.state);
    }

    fn on_temperature_change(&self, temperature: f64, iteration: u64, best: &PackedLayout, _current: &PackedLayout) {
        log::trace!("layout T={:.3} iter={} best={:.3}", temperature, iteration, best.energy);
    }
}

impl MoeaProblem for LayoutProblem {
    fn bounds(&self) -> (Vec<f64>, Vec<f64>) {
        state_bounds(&self.room, self.templates.len())
    }

    fn evaluate(&self, x: &[f64]) -> Vec<f64> {
        let items = state_to_items(x, &self.templates);
        compute_objectives(&items, &self.room, &self.weights, self.target_capacity)
            .as_array()
            .to_vec()
    }

    /// The starting layout plus perturbations of it.
    fn initial_population<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<Vec<f64>> {
        let mut population = Vec::with_capacity(size);
        if size > 0 {
            population.push(self.initial.clone());
        }
        while population.len() < size {
            let mut state = self.initial.clone();
            for _ in 0..rng.gen_range(1..=4) {
                state = perturb_state(&state, &self.templates, &self.room, self.magnitude, rng);
            }
            population.push(state);
        }
        population
    }

    fn on_generation(&self, generation: usize, front: &[venue_core::ParetoSolution]) {
        log::trace!("pareto generation {}: {} on the front", generation, front.len());
    }
}

/// A layout on the Pareto front.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParetoLayout {
    /// The layout; its energy is the sum of `objectives`.
    pub layout: Layout,
    /// Objective values.
    pub objectives: LayoutObjectives,
    /// Crowding distance on the front.
    pub crowding_distance: f64,
}

/// Mean center displacement between two states of the same items.
pub fn mean_displacement(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len()) / STATE_STRIDE;
    if n == 0 {
        return 0.0;
    }
    let total: f64 = a
        .chunks_exact(STATE_STRIDE)
        .zip(b.chunks_exact(STATE_STRIDE))
        .map(|(p, q)| (p[0] - q[0]).hypot(p[1] - q[1]))
        .sum();
    total / n as f64
}

/// Input to [`Orchestrator::run_full_pipeline`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlanRequest {
    /// Free-text event description.
    pub description: String,
    /// Room to furnish.
    pub room: RoomBoundary,
    /// Events to schedule.
    #[cfg_attr(feature = "serde", serde(default))]
    pub events: Vec<EventSpec>,
    /// Rooms available to the scheduler.
    #[cfg_attr(feature = "serde", serde(default))]
    pub rooms: Vec<RoomSpec>,
    /// Timeslots available to the scheduler.
    #[cfg_attr(feature = "serde", serde(default))]
    pub timeslots: Vec<TimeslotSpec>,
    /// Energy weights.
    #[cfg_attr(feature = "serde", serde(default))]
    pub weights: LayoutWeights,
    /// Seat target; defaults to the capacity parsed from the description.
    #[cfg_attr(feature = "serde", serde(default))]
    pub target_capacity: Option<u32>,
}

impl PlanRequest {
    /// A request with no scheduling part and default weights.
    pub fn new(description: impl Into<String>, room: RoomBoundary) -> Self {
        Self {
            description: description.into(),
            room,
            events: Vec::new(),
            rooms: Vec::new(),
            timeslots: Vec::new(),
            weights: LayoutWeights::default(),
            target_capacity: None,
        }
    }

    /// Checks the room, the scheduling input and the weights.
    pub fn validate(&self) -> Result<()> {
        self.room.validate()?;
        validate_schedule_input(&self.events, &self.rooms, &self.timeslots)?;
        if let Some(w) = self
            .weights
            .as_array()
            .iter()
            .find(|w| !(w.is_finite() && **w >= 0.0))
        {
            return Err(Error::InvalidConfig(format!(
                "layout weights must be finite and non-negative, got {}",
                w
            )));
        }
        Ok(())
    }
}

/// Output of [`Orchestrator::run_full_pipeline`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlanResponse {
    /// Event schedule.
    pub schedule: ScheduleResult,
    /// Optimized layout.
    pub optimized: Layout,
    /// Diverse near-optimal alternatives.
    pub alternatives: Vec<Layout>,
    /// Pareto-optimal trade-offs.
    pub pareto: Vec<ParetoLayout>,
    /// One entry per stage, in execution order.
    pub stats: Vec<StageStats>,
}

/// Runs the planning stages.
#[derive(Debug, Clone, Default)]
pub struct Orchestrator {
    config: PipelineConfig,
}

impl Orchestrator {
    /// Creates an orchestrator.
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Seed of `stage`.
    pub fn stage_seed(&self, stage: PipelineStage) -> u64 {
        self.config
            .seed
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .wrapping_add(stage.index())
    }

    /// Template layout for a free-text description.
    pub fn generate_initial(&self, description: &str, room: &RoomBoundary) -> Layout {
        self.generate_stage(description, room).0
    }

    /// Schedules events onto rooms and timeslots.
    pub fn schedule_events(
        &self,
        events: &[EventSpec],
        rooms: &[RoomSpec],
        timeslots: &[TimeslotSpec],
    ) -> ScheduleResult {
        self.schedule_stage(events, rooms, timeslots).0
    }

    /// Parallel tempering, then CMA-ES from the tempering best.
    pub fn optimize_layout(&self, layout: &Layout, weights: &LayoutWeights, target_capacity: u32) -> Layout {
        self.optimize_stage(layout, weights, target_capacity).0
    }

    /// Up to `n` diverse low-energy variations of `layout`.
    pub fn sample_alternatives(&self, layout: &Layout, weights: &LayoutWeights, n: usize) -> Vec<Layout> {
        self.sample_stage(layout, weights, n).0
    }

    /// Pareto front of `layout`'s items in `room` under default weights.
    pub fn compute_pareto_front(&self, layout: &Layout, room: &RoomBoundary) -> Vec<ParetoLayout> {
        self.pareto_stage(layout, room).0
    }

    /// Runs every stage.
    pub fn run_full_pipeline(&self, request: &PlanRequest) -> Result<PlanResponse> {
        request.validate()?;
        let started = Instant::now();
        let parsed = parse_description(&request.description);
        let target = request.target_capacity.unwrap_or(parsed.capacity);

        let (initial, generate) = self.generate_stage(&request.description, &request.room);
        let (schedule, scheduling) =
            self.schedule_stage(&request.events, &request.rooms, &request.timeslots);
        let (optimized, optimize) = self.optimize_stage(&initial, &request.weights, target);
        let (alternatives, sample) =
            self.sample_stage(&optimized, &request.weights, self.config.alternatives);
        let (pareto, front) = self.pareto_stage(&optimized, &request.room);

        log::info!(
            "pipeline finished in {:?}: energy {:.3} -> {:.3}",
            started.elapsed(),
            initial.energy,
            optimized.energy
        );

        Ok(PlanResponse {
            schedule,
            optimized,
            alternatives,
            pareto,
            stats: vec![generate, scheduling, optimize, sample, front],
        })
    }

    fn generate_stage(&self, description: &str, room: &RoomBoundary) -> (Layout, StageStats) {
        let started = Instant::now();
        let parsed = parse_description(description);
        let layout = generate_template_layout(
            room,
            parsed.style,
            parsed.capacity,
            self.stage_seed(PipelineStage::Generate),
        );
        let breakdown = compute_energy_breakdown(&layout.items, room, parsed.capacity);
        let stats = StageStats {
            stage: PipelineStage::Generate,
            solve_time: started.elapsed(),
            iterations: 1,
            quality: layout_quality(layout.energy),
            violations: count_violations(&breakdown, VIOLATION_TOLERANCE),
            items_placed: layout.total_seats() as usize,
            items_requested: parsed.capacity as usize,
        };
        stats.log();
        (layout, stats)
    }

    fn schedule_stage(
        &self,
        events: &[EventSpec],
        rooms: &[RoomSpec],
        timeslots: &[TimeslotSpec],
    ) -> (ScheduleResult, StageStats) {
        let config = self
            .config
            .scheduler
            .clone()
            .with_seed(self.stage_seed(PipelineStage::Schedule));
        let result = SchedulingSolver::new(config).solve(events, rooms, timeslots);
        let placed = result.assignments.len();
        let stats = StageStats {
            stage: PipelineStage::Schedule,
            solve_time: result.solve_time,
            iterations: self.config.scheduler.sa.max_iterations,
            quality: if events.is_empty() {
                1.0
            } else {
                (1.0 - result.violations.len() as f64 / events.len() as f64).max(0.0)
            },
            violations: result.violations.len(),
            items_placed: placed,
            items_requested: events.len(),
        };
        stats.log();
        (result, stats)
    }

    fn optimize_stage(
        &self,
        layout: &Layout,
        weights: &LayoutWeights,
        target_capacity: u32,
    ) -> (Layout, StageStats) {
        let started = Instant::now();
        let seed = self.stage_seed(PipelineStage::Optimize);
        let problem = LayoutProblem::new(layout, *weights, target_capacity, self.config.move_magnitude);
        let initial_energy = problem.energy_of(problem.initial_state());

        let pt = PtRunner::new(self.config.pt.clone().with_seed(seed), problem.clone()).run();
        log::debug!(
            "tempering: {:.3} -> {:.3} over {} sweeps",
            initial_energy,
            pt.best.energy,
            pt.sweeps
        );
        let mut evaluations = pt.evaluations;
        let mut best = pt.best;

        evaluations += self.refine_blocks(&problem, &mut best, seed) as u64;

        let optimized = problem.to_layout(&best.state, best.energy);
        let breakdown = compute_energy_breakdown(&optimized.items, &optimized.room, target_capacity);
        let stats = StageStats {
            stage: PipelineStage::Optimize,
            solve_time: started.elapsed(),
            iterations: evaluations,
            quality: layout_quality(best.energy),
            violations: count_violations(&breakdown, VIOLATION_TOLERANCE),
            items_placed: optimized.items.len(),
            items_requested: layout.items.len(),
        };
        stats.log();
        (optimized, stats)
    }

    /// CMA-ES over consecutive blocks of items, the rest held fixed.
    ///
    /// Keeps each covariance at most `3 × cmaes_block_items` wide. A block's
    /// result replaces `best` only when it lowers the energy.
    fn refine_blocks(&self, problem: &LayoutProblem, best: &mut PackedLayout, seed: u64) -> usize {
        let n_items = problem.templates().len();
        if n_items == 0 || self.config.cmaes.max_evaluations == 0 {
            return 0;
        }
        let block = self.config.cmaes_block_items.max(1);
        let n_blocks = n_items.div_ceil(block);
        let budget = (self.config.cmaes.max_evaluations / n_blocks).max(1);
        let (lower, upper) = state_bounds(&problem.room, n_items);
        let mut evaluations = 0;

        for b in 0..n_blocks {
            let (start, end) = (b * block * STATE_STRIDE, ((b + 1) * block).min(n_items) * STATE_STRIDE);
            let base = best.state.clone();
            let objective = |x: &[f64]| {
                let mut state = base.clone();
                state[start..end].copy_from_slice(x);
                problem.energy_of(&state)
            };
            let config = self
                .config
                .cmaes
                .clone()
                .with_max_evaluations(budget)
                .with_bounds(lower[start..end].to_vec(), upper[start..end].to_vec())
                .with_seed(seed.wrapping_add(b as u64));
            let result = CmaesRunner::new(config, objective).run(&base[start..end]);
            evaluations += result.evaluations;

            if result.best_f < best.energy {
                log::debug!(
                    "cma-es block {}/{}: {:.3} -> {:.3} ({:?})",
                    b + 1,
                    n_blocks,
                    best.energy,
                    result.best_f,
                    result.stop
                );
                best.state[start..end].copy_from_slice(&result.best_x);
                best.energy = result.best_f;
            }
        }
        evaluations
    }

    fn sample_stage(&self, layout: &Layout, weights: &LayoutWeights, n: usize) -> (Vec<Layout>, StageStats) {
        let started = Instant::now();
        let problem = LayoutProblem::new(
            layout,
            *weights,
            layout.total_seats(),
            self.config.move_magnitude,
        );
        let config = self
            .config
            .mcmc
            .clone()
            .with_samples(n.saturating_mul(3).max(1))
            .with_seed(self.stage_seed(PipelineStage::Sample));
        let result = McmcSampler::new(config, problem.clone()).run();

        let mut candidates = result.samples;
        candidates.sort_by(|a, b| a.energy().total_cmp(&b.energy()));
        let mut kept: Vec<PackedLayout> = Vec::with_capacity(n);
        for candidate in candidates {
            if kept.len() >= n {
                break;
            }
            let distinct = std::iter::once(problem.initial_state())
                .chain(kept.iter().map(|k| k.state.as_slice()))
                .all(|other| mean_displacement(&candidate.state, other) >= self.config.min_diversity);
            if distinct {
                kept.push(candidate);
            }
        }

        let alternatives: Vec<Layout> = kept
            .iter()
            .map(|s| problem.to_layout(&s.state, s.energy))
            .collect();
        let best_energy = alternatives
            .iter()
            .map(|l| l.energy)
            .fold(f64::INFINITY, f64::min);
        let stats = StageStats {
            stage: PipelineStage::Sample,
            solve_time: started.elapsed(),
            iterations: result.steps as u64,
            quality: if alternatives.is_empty() {
                0.0
            } else {
                layout_quality(best_energy)
            },
            violations: 0,
            items_placed: alternatives.len(),
            items_requested: n,
        };
        stats.log();
        (alternatives, stats)
    }

    fn pareto_stage(&self, layout: &Layout, room: &RoomBoundary) -> (Vec<ParetoLayout>, StageStats) {
        let started = Instant::now();
        let seated = Layout::new(layout.items.clone(), room.clone());
        let problem = LayoutProblem::new(
            &seated,
            LayoutWeights::default(),
            layout.total_seats(),
            self.config.move_magnitude,
        );
        let config = self
            .config
            .moea
            .clone()
            .with_seed(self.stage_seed(PipelineStage::Pareto));
        let population = config.population_size;
        let result = MoeaRunner::new(config, problem.clone()).run();

        let front: Vec<ParetoLayout> = result
            .front
            .iter()
            .map(|s| {
                let objectives = LayoutObjectives {
                    safety: s.objectives[0],
                    accessibility: s.objectives[1],
                    experience: s.objectives[2],
                    operations: s.objectives[3],
                };
                ParetoLayout {
                    layout: problem.to_layout(&s.state, objectives.total()),
                    objectives,
                    crowding_distance: s.crowding_distance,
                }
            })
            .collect();

        let best = front
            .iter()
            .map(|p| p.layout.energy)
            .fold(f64::INFINITY, f64::min);
        let stats = StageStats {
            stage: PipelineStage::Pareto,
            solve_time: started.elapsed(),
            iterations: result.evaluations as u64,
            quality: if front.is_empty() { 0.0 } else { layout_quality(best) },
            violations: 0,
            items_placed: front.len(),
            items_requested: population,
        };
        stats.log();
        (front, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::furniture::FurnitureKind;

    fn room() -> RoomBoundary {
        RoomBoundary::rectangle(40.0, 30.0)
            .with_exit(20.0, 0.0, 6.0)
            .with_exit(20.0, 30.0, 6.0)
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(PipelineConfig::quick().with_seed(5))
    }

    #[test]
    fn test_stage_seeds_distinct() {
        let o = orchestrator();
        let seeds: Vec<u64> = [
            PipelineStage::Generate,
            PipelineStage::Schedule,
            PipelineStage::Optimize,
            PipelineStage::Sample,
            PipelineStage::Pareto,
        ]
        .iter()
        .map(|s| o.stage_seed(*s))
        .collect();
        for i in 0..seeds.len() {
            for j in i + 1..seeds.len() {
                assert_ne!(seeds[i], seeds[j]);
            }
        }
    }

    #[test]
    fn test_mean_displacement() {
        let a = [0.0, 0.0, 0.0, 10.0, 10.0, 1.0];
        let b = [3.0, 4.0, 2.0, 10.0, 10.0, 0.0];
        assert!((mean_displacement(&a, &b) - 2.5).abs() < 1e-12);
        assert_eq!(mean_displacement(&[], &[]), 0.0);
    }

    #[test]
    fn test_layout_problem_energy_matches_evaluator() {
        let layout = orchestrator().generate_initial("banquet for 16 guests", &room());
        let problem = LayoutProblem::new(&layout, LayoutWeights::default(), 16, 1.0);
        let direct = compute_layout_energy(&layout.items, &layout.room, &LayoutWeights::default(), 16);
        assert!((problem.energy_of(problem.initial_state()) - direct).abs() < 1e-9);
        assert_eq!(MoeaProblem::evaluate(&problem, problem.initial_state()).len(), 4);
    }

    #[test]
    fn test_optimize_never_worse() {
        let o = orchestrator();
        let mut layout = o.generate_initial("banquet for 16 guests", &room());
        // Knock one table into another so there is something to fix.
        if let Some(table) = layout.items.iter_mut().find(|i| i.kind == FurnitureKind::RoundTable) {
            table.x += 3.0;
        }
        let weights = LayoutWeights::default();
        let before = compute_layout_energy(&layout.items, &layout.room, &weights, 16);
        let optimized = o.optimize_layout(&layout, &weights, 16);
        assert_eq!(optimized.items.len(), layout.items.len());
        assert!(optimized.energy <= before + 1e-9);
        for (a, b) in layout.items.iter().zip(&optimized.items) {
            assert_eq!(a.kind, b.kind);
            assert_eq!(a.seats, b.seats);
        }
    }

    #[test]
    fn test_optimize_deterministic() {
        let o = orchestrator();
        let layout = o.generate_initial("cocktail party for 20 guests", &room());
        let a = o.optimize_layout(&layout, &LayoutWeights::default(), 20);
        let b = o.optimize_layout(&layout, &LayoutWeights::default(), 20);
        assert_eq!(a, b);
    }

    #[test]
    fn test_alternatives_are_diverse() {
        let o = orchestrator();
        let layout = o.generate_initial("banquet for 16 guests", &room());
        let (state, _) = items_to_state(&layout.items);
        let alternatives = o.sample_alternatives(&layout, &LayoutWeights::default(), 3);
        assert!(alternatives.len() <= 3);
        let states: Vec<Vec<f64>> = alternatives.iter().map(|l| items_to_state(&l.items).0).collect();
        for (i, s) in states.iter().enumerate() {
            assert!(mean_displacement(s, &state) >= o.config().min_diversity);
            for t in &states[i + 1..] {
                assert!(mean_displacement(s, t) >= o.config().min_diversity);
            }
        }
    }

    #[test]
    fn test_pareto_front_nonempty() {
        let o = orchestrator();
        let layout = o.generate_initial("boardroom meeting for 8 people", &room());
        let front = o.compute_pareto_front(&layout, &layout.room);
        assert!(!front.is_empty());
        for member in &front {
            assert_eq!(member.layout.items.len(), layout.items.len());
            assert!(member.objectives.as_array().iter().all(|v| *v >= 0.0));
        }
    }

    #[test]
    fn test_request_validation() {
        let mut request = PlanRequest::new("banquet", room());
        assert!(request.validate().is_ok());
        request.weights.overlap = -1.0;
        assert!(matches!(request.validate(), Err(Error::InvalidConfig(_))));

        let mut request = PlanRequest::new("banquet", room());
        request.timeslots = vec![TimeslotSpec::new("x", 0, 600, 500)];
        assert!(matches!(request.validate(), Err(Error::InvalidSchedule(_))));
    }
}
