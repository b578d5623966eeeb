//! Annealing adapters for the discrete energy models.
//!
//! Each model gets a small [`SaProblem`] implementation whose neighbor move
//! changes one variable and updates the energy incrementally, so a proposal
//! costs `O(n)` instead of a full re-evaluation.
//!
//! | Model | Move | Solver |
//! |-------|------|--------|
//! | [`QuboMatrix`] | bit flip | [`solve_qubo_sa`], [`solve_qubo_pt`] |
//! | [`IsingModel`] | spin flip | [`solve_ising_sa`] |
//! | [`PottsModel`] | label change | [`solve_potts_sa`] |

use crate::qubo::{evaluate_ising, evaluate_potts, IsingModel, PottsModel, QuboMatrix};
use crate::sa::{SaConfig, SaProblem, SaRunner, SaSolution};
use crate::tempering::{PtConfig, PtRunner};
use rand::prelude::*;
use std::time::Duration;

/// Outcome of a discrete solve.
#[derive(Debug, Clone)]
pub struct DiscreteResult<T> {
    /// Best assignment found.
    pub assignment: Vec<T>,
    /// Energy of `assignment`.
    pub energy: f64,
    /// Proposals evaluated.
    pub evaluations: u64,
    /// Wall time.
    pub elapsed: Duration,
}

/// Assignment with an incrementally maintained energy.
#[derive(Debug, Clone)]
pub struct Assignment<T> {
    /// Variable values.
    pub values: Vec<T>,
    energy: f64,
    stale: bool,
}

impl<T> Assignment<T> {
    fn fresh(values: Vec<T>) -> Self {
        Self {
            values,
            energy: f64::INFINITY,
            stale: true,
        }
    }

    fn with_energy(values: Vec<T>, energy: f64) -> Self {
        Self {
            values,
            energy,
            stale: false,
        }
    }
}

impl<T: Clone> SaSolution for Assignment<T> {
    fn energy(&self) -> f64 {
        self.energy
    }

    fn set_energy(&mut self, energy: f64) {
        self.energy = energy;
        self.stale = false;
    }
}

struct QuboProblem<'a> {
    q: &'a QuboMatrix,
}

impl SaProblem for QuboProblem<'_> {
    type Solution = Assignment<bool>;

    fn initial_solution<R: Rng>(&self, rng: &mut R) -> Self::Solution {
        Assignment::fresh((0..self.q.n()).map(|_| rng.gen()).collect())
    }

    fn neighbor<R: Rng>(&self, solution: &Self::Solution, rng: &mut R) -> Self::Solution {
        let n = solution.values.len();
        if n == 0 {
            return solution.clone();
        }
        let k = rng.gen_range(0..n);
        let delta = self.q.flip_delta(&solution.values, k);
        let mut values = solution.values.clone();
        values[k] = !values[k];
        Assignment::with_energy(values, solution.energy + delta)
    }

    fn evaluate(&self, solution: &mut Self::Solution) {
        if solution.stale {
            let energy = self.q.evaluate(&solution.values);
            solution.set_energy(energy);
        }
    }
}

struct IsingProblem<'a> {
    model: &'a IsingModel,
}

impl SaProblem for IsingProblem<'_> {
    type Solution = Assignment<i8>;

    fn initial_solution<R: Rng>(&self, rng: &mut R) -> Self::Solution {
        Assignment::fresh(
            (0..self.model.n())
                .map(|_| if rng.gen() { 1 } else { -1 })
                .collect(),
        )
    }

    fn neighbor<R: Rng>(&self, solution: &Self::Solution, rng: &mut R) -> Self::Solution {
        let n = solution.values.len();
        if n == 0 {
            return solution.clone();
        }
        let k = rng.gen_range(0..n);
        let delta = self.model.flip_delta(&solution.values, k);
        let mut values = solution.values.clone();
        values[k] = -values[k];
        Assignment::with_energy(values, solution.energy + delta)
    }

    fn evaluate(&self, solution: &mut Self::Solution) {
        if solution.stale {
            let energy = evaluate_ising(self.model, &solution.values);
            solution.set_energy(energy);
        }
    }
}

struct PottsProblem<'a> {
    model: &'a PottsModel,
}

impl SaProblem for PottsProblem<'_> {
    type Solution = Assignment<usize>;

    fn initial_solution<R: Rng>(&self, rng: &mut R) -> Self::Solution {
        let k = self.model.k().max(1);
        Assignment::fresh((0..self.model.n()).map(|_| rng.gen_range(0..k)).collect())
    }

    fn neighbor<R: Rng>(&self, solution: &Self::Solution, rng: &mut R) -> Self::Solution {
        let n = solution.values.len();
        let k = self.model.k();
        if n == 0 || k < 2 {
            return solution.clone();
        }
        let i = rng.gen_range(0..n);
        // Draw a label different from the current one.
        let mut label = rng.gen_range(0..k - 1);
        if label >= solution.values[i] {
            label += 1;
        }
        let delta = self.model.relabel_delta(&solution.values, i, label);
        let mut values = solution.values.clone();
        values[i] = label;
        Assignment::with_energy(values, solution.energy + delta)
    }

    fn evaluate(&self, solution: &mut Self::Solution) {
        if solution.stale {
            let energy = evaluate_potts(self.model, &solution.values);
            solution.set_energy(energy);
        }
    }
}

/// Minimizes a QUBO with simulated annealing over single bit flips.
pub fn solve_qubo_sa(q: &QuboMatrix, config: &SaConfig) -> DiscreteResult<bool> {
    let runner = SaRunner::new(config.clone(), QuboProblem { q });
    let result = runner.run();
    // Incremental updates drift; report the exact energy.
    let energy = q.evaluate(&result.best.values);
    log::debug!(
        "QUBO SA: n={}, energy={:.4}, acceptance={:.3}",
        q.n(),
        energy,
        result.acceptance_rate()
    );
    DiscreteResult {
        assignment: result.best.values,
        energy,
        evaluations: result.iterations,
        elapsed: result.elapsed,
    }
}

/// Minimizes a QUBO with parallel tempering over single bit flips.
pub fn solve_qubo_pt(q: &QuboMatrix, config: &PtConfig) -> DiscreteResult<bool> {
    let runner = PtRunner::new(config.clone(), QuboProblem { q });
    let result = runner.run();
    let energy = q.evaluate(&result.best.values);
    log::debug!(
        "QUBO PT: n={}, energy={:.4}, replicas={}",
        q.n(),
        energy,
        result.temperatures.len()
    );
    DiscreteResult {
        assignment: result.best.values,
        energy,
        evaluations: result.evaluations,
        elapsed: result.elapsed,
    }
}

/// Minimizes an Ising model with simulated annealing over single spin flips.
pub fn solve_ising_sa(model: &IsingModel, config: &SaConfig) -> DiscreteResult<i8> {
    let runner = SaRunner::new(config.clone(), IsingProblem { model });
    let result = runner.run();
    let energy = evaluate_ising(model, &result.best.values);
    DiscreteResult {
        assignment: result.best.values,
        energy,
        evaluations: result.iterations,
        elapsed: result.elapsed,
    }
}

/// Minimizes a Potts model with simulated annealing over single label changes.
pub fn solve_potts_sa(model: &PottsModel, config: &SaConfig) -> DiscreteResult<usize> {
    let runner = SaRunner::new(config.clone(), PottsProblem { model });
    let result = runner.run();
    let energy = evaluate_potts(model, &result.best.values);
    DiscreteResult {
        assignment: result.best.values,
        energy,
        evaluations: result.iterations,
        elapsed: result.elapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qubo::qubo_to_ising;
    use approx::assert_relative_eq;

    fn brute_force_min(q: &QuboMatrix) -> f64 {
        let n = q.n();
        (0..(1u32 << n))
            .map(|mask| {
                let x: Vec<bool> = (0..n).map(|i| mask & (1 << i) != 0).collect();
                q.evaluate(&x)
            })
            .fold(f64::INFINITY, f64::min)
    }

    /// Pick-exactly-one over 6 bits with a preferred index.
    fn one_hot_qubo() -> QuboMatrix {
        let n = 6;
        let lambda = 10.0;
        let mut q = QuboMatrix::new(n);
        for i in 0..n {
            q.add(i, i, -lambda);
            for j in (i + 1)..n {
                q.add(i, j, 2.0 * lambda);
            }
        }
        q.add(4, 4, -3.0);
        q
    }

    fn sa_config() -> SaConfig {
        SaConfig::default()
            .with_initial_temp(20.0)
            .with_final_temp(0.01)
            .with_max_iterations(5_000)
            .with_seed(11)
    }

    #[test]
    fn test_qubo_sa_finds_ground_state() {
        let q = one_hot_qubo();
        let result = solve_qubo_sa(&q, &sa_config());
        assert_relative_eq!(result.energy, brute_force_min(&q));
        assert_eq!(
            result.assignment,
            vec![false, false, false, false, true, false]
        );
    }

    #[test]
    fn test_qubo_pt_finds_ground_state() {
        let q = one_hot_qubo();
        let config = PtConfig::default()
            .with_replicas(4)
            .with_temperature_range(0.1, 20.0)
            .with_sweeps(200)
            .with_seed(5);
        let result = solve_qubo_pt(&q, &config);
        assert_relative_eq!(result.energy, brute_force_min(&q));
    }

    #[test]
    fn test_incremental_energy_matches_exact() {
        let q = one_hot_qubo();
        let problem = QuboProblem { q: &q };
        let mut rng = StdRng::seed_from_u64(3);
        let mut s = problem.initial_solution(&mut rng);
        problem.evaluate(&mut s);
        for _ in 0..200 {
            s = problem.neighbor(&s, &mut rng);
            problem.evaluate(&mut s);
            assert_relative_eq!(s.energy(), q.evaluate(&s.values), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_ising_sa_agrees_with_qubo() {
        let q = one_hot_qubo();
        let ising = qubo_to_ising(&q);
        let result = solve_ising_sa(&ising, &sa_config());
        assert_relative_eq!(result.energy, brute_force_min(&q), epsilon = 1e-9);
    }

    #[test]
    fn test_potts_sa_colors_triangle() {
        // Three mutually conflicting variables, three labels.
        let mut model = PottsModel::new(3, 3);
        for i in 0..3 {
            for j in (i + 1)..3 {
                model.set_coupling(i, j, -5.0);
            }
        }
        let result = solve_potts_sa(&model, &sa_config());
        assert_relative_eq!(result.energy, 0.0);
        let mut labels = result.assignment.clone();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), 3);
    }

    #[test]
    fn test_empty_models() {
        let q = QuboMatrix::new(0);
        let result = solve_qubo_sa(&q, &sa_config().with_max_iterations(10));
        assert!(result.assignment.is_empty());
        assert_eq!(result.energy, 0.0);
    }
}
