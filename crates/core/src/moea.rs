//! Multi-objective evolutionary optimization (NSGA-II).
//!
//! Real-coded, box-bounded, all objectives minimized.
//!
//! # Algorithm
//!
//! 1. Rank the population by fast non-dominated sorting and compute the
//!    crowding distance inside every front.
//! 2. Select parents by binary tournament on `(rank, -crowding)`.
//! 3. Produce offspring with simulated binary crossover (SBX) and polynomial
//!    mutation, clamped to the bounds.
//! 4. Evaluate offspring in parallel.
//! 5. Elitist `(μ + λ)` survival: fill the next population front by front,
//!    breaking the last front by descending crowding distance.
//!
//! # References
//!
//! - Deb et al. (2002), "A fast and elitist multiobjective genetic algorithm:
//!   NSGA-II"
//! - Deb & Agrawal (1995), "Simulated binary crossover for continuous search
//!   space"

use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the evolutionary optimizer.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MoeaConfig {
    /// Population size.
    pub population_size: usize,
    /// Number of generations.
    pub generations: usize,
    /// Probability of applying SBX to a parent pair.
    pub crossover_rate: f64,
    /// Per-variable mutation probability (`None` = `1/n`).
    pub mutation_rate: Option<f64>,
    /// SBX distribution index.
    pub eta_crossover: f64,
    /// Polynomial mutation distribution index.
    pub eta_mutation: f64,
    /// RNG seed.
    pub seed: u64,
}

impl Default for MoeaConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            generations: 100,
            crossover_rate: 0.9,
            mutation_rate: None,
            eta_crossover: 15.0,
            eta_mutation: 20.0,
            seed: 42,
        }
    }
}

impl MoeaConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the population size (rounded up to an even number).
    pub fn with_population_size(mut self, size: usize) -> Self {
        let size = size.max(4);
        self.population_size = size + size % 2;
        self
    }

    /// Sets the generation count.
    pub fn with_generations(mut self, generations: usize) -> Self {
        self.generations = generations;
        self
    }

    /// Sets the crossover rate.
    pub fn with_crossover_rate(mut self, rate: f64) -> Self {
        self.crossover_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the per-variable mutation rate.
    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = Some(rate.clamp(0.0, 1.0));
        self
    }

    /// Sets the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Multi-objective problem over a box-bounded real vector.
pub trait MoeaProblem: Sync {
    /// Lower and upper bounds per variable.
    fn bounds(&self) -> (Vec<f64>, Vec<f64>);

    /// Objective vector to minimize.
    fn evaluate(&self, x: &[f64]) -> Vec<f64>;

    /// Creates the initial population. Defaults to uniform sampling.
    fn initial_population<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<Vec<f64>> {
        let (lower, upper) = self.bounds();
        (0..size)
            .map(|_| {
                lower
                    .iter()
                    .zip(&upper)
                    .map(|(&lo, &hi)| if hi > lo { rng.gen_range(lo..=hi) } else { lo })
                    .collect()
            })
            .collect()
    }

    /// Called after each generation with the current first front.
    fn on_generation(&self, _generation: usize, _front: &[ParetoSolution]) {}
}

/// A ranked member of the population.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParetoSolution {
    /// Decision vector.
    pub state: Vec<f64>,
    /// Objective vector.
    pub objectives: Vec<f64>,
    /// Non-domination rank (0 = first front).
    pub front_rank: usize,
    /// Crowding distance inside its front.
    pub crowding_distance: f64,
}

/// Result of an optimization run.
#[derive(Debug, Clone)]
pub struct MoeaResult {
    /// Rank-0 solutions of the final population.
    pub front: Vec<ParetoSolution>,
    /// Final population.
    pub population: Vec<ParetoSolution>,
    /// Generations completed.
    pub generations: usize,
    /// Objective evaluations.
    pub evaluations: usize,
    /// Wall time.
    pub elapsed: Duration,
}

/// Returns true if `a` Pareto-dominates `b` (all ≤, at least one <).
pub fn dominates(a: &[f64], b: &[f64]) -> bool {
    let mut strictly = false;
    for (x, y) in a.iter().zip(b) {
        if x > y {
            return false;
        }
        if x < y {
            strictly = true;
        }
    }
    strictly
}

/// Fast non-dominated sorting. Returns fronts as index lists, best first.
pub fn fast_non_dominated_sort(objectives: &[Vec<f64>]) -> Vec<Vec<usize>> {
    let n = objectives.len();
    let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut domination_count = vec![0usize; n];
    let mut fronts: Vec<Vec<usize>> = vec![Vec::new()];

    for p in 0..n {
        for q in 0..n {
            if p == q {
                continue;
            }
            if dominates(&objectives[p], &objectives[q]) {
                dominated_by[p].push(q);
            } else if dominates(&objectives[q], &objectives[p]) {
                domination_count[p] += 1;
            }
        }
        if domination_count[p] == 0 {
            fronts[0].push(p);
        }
    }

    let mut i = 0;
    while i < fronts.len() && !fronts[i].is_empty() {
        let mut next = Vec::new();
        for &p in &fronts[i] {
            for &q in &dominated_by[p] {
                domination_count[q] -= 1;
                if domination_count[q] == 0 {
                    next.push(q);
                }
            }
        }
        i += 1;
        if !next.is_empty() {
            fronts.push(next);
        }
    }

    fronts.retain(|f| !f.is_empty());
    fronts
}

/// Crowding distance of each member of `front` (aligned with `front`).
///
/// Boundary members get `f64::INFINITY`.
pub fn crowding_distance(objectives: &[Vec<f64>], front: &[usize]) -> Vec<f64> {
    let size = front.len();
    let mut distance = vec![0.0; size];
    if size <= 2 {
        return vec![f64::INFINITY; size];
    }
    let m = objectives[front[0]].len();

    for k in 0..m {
        let mut order: Vec<usize> = (0..size).collect();
        order.sort_by(|&a, &b| objectives[front[a]][k].total_cmp(&objectives[front[b]][k]));

        let lo = objectives[front[order[0]]][k];
        let hi = objectives[front[order[size - 1]]][k];
        distance[order[0]] = f64::INFINITY;
        distance[order[size - 1]] = f64::INFINITY;

        let span = hi - lo;
        if span <= f64::EPSILON {
            continue;
        }
        for w in 1..size - 1 {
            let prev = objectives[front[order[w - 1]]][k];
            let next = objectives[front[order[w + 1]]][k];
            distance[order[w]] += (next - prev) / span;
        }
    }

    distance
}

/// Ranks a set of evaluated states.
fn rank_population(states: Vec<Vec<f64>>, objectives: Vec<Vec<f64>>) -> Vec<ParetoSolution> {
    let fronts = fast_non_dominated_sort(&objectives);
    let mut rank = vec![0usize; states.len()];
    let mut crowd = vec![0.0; states.len()];
    for (r, front) in fronts.iter().enumerate() {
        let distances = crowding_distance(&objectives, front);
        for (&idx, d) in front.iter().zip(distances) {
            rank[idx] = r;
            crowd[idx] = d;
        }
    }
    states
        .into_iter()
        .zip(objectives)
        .enumerate()
        .map(|(i, (state, objectives))| ParetoSolution {
            state,
            objectives,
            front_rank: rank[i],
            crowding_distance: crowd[i],
        })
        .collect()
}

/// Crowded-comparison order: lower rank first, then larger crowding.
fn crowded_cmp(a: &ParetoSolution, b: &ParetoSolution) -> Ordering {
    a.front_rank
        .cmp(&b.front_rank)
        .then_with(|| b.crowding_distance.total_cmp(&a.crowding_distance))
}

/// NSGA-II runner.
pub struct MoeaRunner<P: MoeaProblem> {
    config: MoeaConfig,
    problem: P,
}

impl<P: MoeaProblem> MoeaRunner<P> {
    /// Creates a new runner.
    pub fn new(config: MoeaConfig, problem: P) -> Self {
        Self { config, problem }
    }

    /// Returns the problem.
    pub fn problem(&self) -> &P {
        &self.problem
    }

    /// Runs from a random initial population.
    pub fn run(&self) -> MoeaResult {
        self.run_seeded(&[])
    }

    /// Runs with `seeds` placed at the front of the initial population.
    pub fn run_seeded(&self, seeds: &[Vec<f64>]) -> MoeaResult {
        let start = Instant::now();
        let cfg = &self.config;
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let (lower, upper) = self.problem.bounds();
        let n = lower.len();
        let mutation_rate = cfg.mutation_rate.unwrap_or(1.0 / n.max(1) as f64);

        let mut states: Vec<Vec<f64>> = seeds
            .iter()
            .take(cfg.population_size)
            .map(|s| clamp_to(s, &lower, &upper))
            .collect();
        let missing = cfg.population_size - states.len();
        states.extend(self.problem.initial_population(missing, &mut rng));

        let objectives = self.evaluate_all(&states);
        let mut evaluations = states.len();
        let mut population = rank_population(states, objectives);

        for generation in 0..cfg.generations {
            let mut offspring: Vec<Vec<f64>> = Vec::with_capacity(cfg.population_size);
            while offspring.len() < cfg.population_size {
                let p1 = tournament(&population, &mut rng);
                let p2 = tournament(&population, &mut rng);
                let (mut c1, mut c2) = if rng.gen::<f64>() < cfg.crossover_rate {
                    sbx_crossover(&p1.state, &p2.state, &lower, &upper, cfg.eta_crossover, &mut rng)
                } else {
                    (p1.state.clone(), p2.state.clone())
                };
                polynomial_mutation(&mut c1, &lower, &upper, mutation_rate, cfg.eta_mutation, &mut rng);
                polynomial_mutation(&mut c2, &lower, &upper, mutation_rate, cfg.eta_mutation, &mut rng);
                offspring.push(c1);
                if offspring.len() < cfg.population_size {
                    offspring.push(c2);
                }
            }

            let offspring_objectives = self.evaluate_all(&offspring);
            evaluations += offspring.len();

            // (mu + lambda) survival
            let (mut states, mut objectives): (Vec<_>, Vec<_>) = population
                .into_iter()
                .map(|s| (s.state, s.objectives))
                .unzip();
            states.extend(offspring);
            objectives.extend(offspring_objectives);

            let mut merged = rank_population(states, objectives);
            merged.sort_by(crowded_cmp);
            merged.truncate(cfg.population_size);

            // Re-rank the survivors so crowding reflects the new population.
            let (states, objectives): (Vec<_>, Vec<_>) =
                merged.into_iter().map(|s| (s.state, s.objectives)).unzip();
            population = rank_population(states, objectives);

            let front: Vec<ParetoSolution> = population
                .iter()
                .filter(|s| s.front_rank == 0)
                .cloned()
                .collect();
            self.problem.on_generation(generation, &front);

            if generation % 20 == 0 {
                log::debug!(
                    "MOEA gen {}: front size={}, evals={}",
                    generation,
                    front.len(),
                    evaluations
                );
            }
        }

        let front = population
            .iter()
            .filter(|s| s.front_rank == 0)
            .cloned()
            .collect();

        MoeaResult {
            front,
            population,
            generations: cfg.generations,
            evaluations,
            elapsed: start.elapsed(),
        }
    }

    fn evaluate_all(&self, states: &[Vec<f64>]) -> Vec<Vec<f64>> {
        states.par_iter().map(|s| self.problem.evaluate(s)).collect()
    }
}

fn clamp_to(x: &[f64], lower: &[f64], upper: &[f64]) -> Vec<f64> {
    x.iter()
        .zip(lower.iter().zip(upper))
        .map(|(&v, (&lo, &hi))| v.clamp(lo, hi.max(lo)))
        .collect()
}

/// Binary tournament on the crowded-comparison order.
fn tournament<'a, R: Rng>(population: &'a [ParetoSolution], rng: &mut R) -> &'a ParetoSolution {
    let a = &population[rng.gen_range(0..population.len())];
    let b = &population[rng.gen_range(0..population.len())];
    if crowded_cmp(b, a) == Ordering::Less {
        b
    } else {
        a
    }
}

/// Simulated binary crossover.
pub fn sbx_crossover<R: Rng>(
    p1: &[f64],
    p2: &[f64],
    lower: &[f64],
    upper: &[f64],
    eta: f64,
    rng: &mut R,
) -> (Vec<f64>, Vec<f64>) {
    let mut c1 = p1.to_vec();
    let mut c2 = p2.to_vec();
    for i in 0..p1.len() {
        if rng.gen::<bool>() || (p1[i] - p2[i]).abs() < 1e-14 {
            continue;
        }
        let u: f64 = rng.gen();
        let beta = if u <= 0.5 {
            (2.0 * u).powf(1.0 / (eta + 1.0))
        } else {
            (1.0 / (2.0 * (1.0 - u))).powf(1.0 / (eta + 1.0))
        };
        let (lo, hi) = (lower[i], upper[i].max(lower[i]));
        c1[i] = (0.5 * ((1.0 + beta) * p1[i] + (1.0 - beta) * p2[i])).clamp(lo, hi);
        c2[i] = (0.5 * ((1.0 - beta) * p1[i] + (1.0 + beta) * p2[i])).clamp(lo, hi);
    }
    (c1, c2)
}

/// Polynomial mutation applied per variable with probability `rate`.
pub fn polynomial_mutation<R: Rng>(
    x: &mut [f64],
    lower: &[f64],
    upper: &[f64],
    rate: f64,
    eta: f64,
    rng: &mut R,
) {
    for i in 0..x.len() {
        if rng.gen::<f64>() >= rate {
            continue;
        }
        let (lo, hi) = (lower[i], upper[i].max(lower[i]));
        let u: f64 = rng.gen();
        let delta = if u < 0.5 {
            (2.0 * u).powf(1.0 / (eta + 1.0)) - 1.0
        } else {
            1.0 - (2.0 * (1.0 - u)).powf(1.0 / (eta + 1.0))
        };
        x[i] = (x[i] + delta * (hi - lo)).clamp(lo, hi);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Schaffer's problem: f1 = x², f2 = (x - 2)², front x ∈ [0, 2].
    struct Schaffer;

    impl MoeaProblem for Schaffer {
        fn bounds(&self) -> (Vec<f64>, Vec<f64>) {
            (vec![-10.0], vec![10.0])
        }

        fn evaluate(&self, x: &[f64]) -> Vec<f64> {
            vec![x[0] * x[0], (x[0] - 2.0).powi(2)]
        }
    }

    #[test]
    fn test_dominates() {
        assert!(dominates(&[1.0, 2.0], &[2.0, 2.0]));
        assert!(!dominates(&[1.0, 2.0], &[1.0, 2.0]));
        assert!(!dominates(&[1.0, 3.0], &[2.0, 2.0]));
    }

    #[test]
    fn test_non_dominated_sort_known_fronts() {
        let objectives = vec![
            vec![1.0, 5.0], // front 0
            vec![2.0, 3.0], // front 0
            vec![4.0, 1.0], // front 0
            vec![3.0, 4.0], // front 1
            vec![5.0, 5.0], // front 2
            vec![2.0, 6.0], // front 1
        ];
        let fronts = fast_non_dominated_sort(&objectives);
        assert_eq!(fronts.len(), 3);
        let mut f0 = fronts[0].clone();
        f0.sort_unstable();
        assert_eq!(f0, vec![0, 1, 2]);
        let mut f1 = fronts[1].clone();
        f1.sort_unstable();
        assert_eq!(f1, vec![3, 5]);
        assert_eq!(fronts[2], vec![4]);
    }

    #[test]
    fn test_crowding_distance_boundaries() {
        let objectives = vec![vec![0.0, 4.0], vec![1.0, 2.0], vec![3.0, 1.0], vec![4.0, 0.0]];
        let front = vec![0, 1, 2, 3];
        let d = crowding_distance(&objectives, &front);
        assert!(d[0].is_infinite());
        assert!(d[3].is_infinite());
        // (3 - 0)/4 + (4 - 1)/4 = 1.5
        assert!((d[1] - 1.5).abs() < 1e-12);
        // (4 - 1)/4 + (2 - 0)/4 = 1.25
        assert!((d[2] - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_sbx_and_mutation_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let lower = vec![0.0, -1.0];
        let upper = vec![1.0, 1.0];
        for _ in 0..500 {
            let (mut c1, c2) =
                sbx_crossover(&[0.1, -0.9], &[0.9, 0.9], &lower, &upper, 15.0, &mut rng);
            polynomial_mutation(&mut c1, &lower, &upper, 1.0, 20.0, &mut rng);
            for c in [&c1, &c2] {
                assert!(c[0] >= 0.0 && c[0] <= 1.0);
                assert!(c[1] >= -1.0 && c[1] <= 1.0);
            }
        }
    }

    #[test]
    fn test_schaffer_front() {
        let config = MoeaConfig::default()
            .with_population_size(40)
            .with_generations(60)
            .with_seed(7);
        let result = MoeaRunner::new(config, Schaffer).run();

        assert!(result.front.len() >= 10);
        for s in &result.front {
            assert_eq!(s.front_rank, 0);
            assert!(s.state[0] > -0.1 && s.state[0] < 2.1, "x = {}", s.state[0]);
        }
        // No member of the front dominates another.
        for a in &result.front {
            for b in &result.front {
                assert!(!dominates(&a.objectives, &b.objectives));
            }
        }
    }

    #[test]
    fn test_seeded_population_keeps_seed() {
        let config = MoeaConfig::default()
            .with_population_size(10)
            .with_generations(0);
        let result = MoeaRunner::new(config, Schaffer).run_seeded(&[vec![1.0]]);
        assert_eq!(result.population.len(), 10);
        assert_eq!(result.population[0].state, vec![1.0]);
    }
}
