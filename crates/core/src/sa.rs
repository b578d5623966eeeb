//! Simulated Annealing framework.
//!
//! A single Metropolis chain walks the solution space of an [`SaProblem`],
//! accepting uphill moves with probability `exp(-Δ/T)` while the temperature
//! follows a [`CoolingSchedule`]. The run stops when the iteration budget is
//! spent; once the temperature reaches `final_temp` it stays there.
//!
//! Every run is driven by an explicit seeded RNG, so two runs with the same
//! configuration and problem produce the same trajectory.
//!
//! # Example
//!
//! ```rust
//! use rand::Rng;
//! use venue_core::sa::{SaConfig, SaProblem, SaRunner, SaSolution};
//!
//! #[derive(Clone)]
//! struct Point { x: f64, energy: f64 }
//!
//! impl SaSolution for Point {
//!     fn energy(&self) -> f64 { self.energy }
//!     fn set_energy(&mut self, energy: f64) { self.energy = energy; }
//! }
//!
//! struct Parabola;
//!
//! impl SaProblem for Parabola {
//!     type Solution = Point;
//!     fn initial_solution<R: Rng>(&self, _rng: &mut R) -> Point {
//!         Point { x: 10.0, energy: f64::INFINITY }
//!     }
//!     fn neighbor<R: Rng>(&self, s: &Point, rng: &mut R) -> Point {
//!         Point { x: s.x + rng.gen_range(-1.0..1.0), energy: f64::INFINITY }
//!     }
//!     fn evaluate(&self, s: &mut Point) {
//!         s.energy = (s.x - 3.0).powi(2);
//!     }
//! }
//!
//! let result = SaRunner::new(SaConfig::default().with_seed(7), Parabola).run();
//! assert!((result.best.x - 3.0).abs() < 0.5);
//! ```

use rand::prelude::*;
use rand::rngs::StdRng;
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Temperature schedule between reheats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CoolingSchedule {
    /// `T_k = T_0 · rate^k`.
    #[default]
    Geometric,
    /// Linear ramp from `T_0` to `T_final` over the iteration budget.
    Linear,
    /// `T_k = T_0 / (1 + ln(1 + k))`.
    Logarithmic,
}

/// Configuration for simulated annealing.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SaConfig {
    /// Starting temperature.
    pub initial_temp: f64,
    /// Temperature floor.
    pub final_temp: f64,
    /// Multiplier per temperature step (geometric schedule).
    pub cooling_rate: f64,
    /// Proposals evaluated at each temperature.
    pub iterations_per_temp: usize,
    /// Total proposal budget.
    pub max_iterations: u64,
    /// Cooling schedule.
    pub cooling: CoolingSchedule,
    /// Reheat every `n` iterations (None = never).
    pub reheat_interval: Option<u64>,
    /// Fraction of the initial temperature restored on reheat.
    pub reheat_fraction: f64,
    /// RNG seed.
    pub seed: u64,
}

impl Default for SaConfig {
    fn default() -> Self {
        Self {
            initial_temp: 100.0,
            final_temp: 0.01,
            cooling_rate: 0.95,
            iterations_per_temp: 50,
            max_iterations: 10_000,
            cooling: CoolingSchedule::Geometric,
            reheat_interval: None,
            reheat_fraction: 0.5,
            seed: 42,
        }
    }
}

impl SaConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial temperature.
    pub fn with_initial_temp(mut self, temp: f64) -> Self {
        self.initial_temp = temp.max(f64::EPSILON);
        self
    }

    /// Sets the final temperature.
    pub fn with_final_temp(mut self, temp: f64) -> Self {
        self.final_temp = temp.max(f64::EPSILON);
        self
    }

    /// Sets the geometric cooling rate.
    pub fn with_cooling_rate(mut self, rate: f64) -> Self {
        self.cooling_rate = rate.clamp(0.5, 0.99999);
        self
    }

    /// Sets the number of proposals per temperature step.
    pub fn with_iterations_per_temp(mut self, n: usize) -> Self {
        self.iterations_per_temp = n.max(1);
        self
    }

    /// Sets the total iteration budget.
    pub fn with_max_iterations(mut self, n: u64) -> Self {
        self.max_iterations = n;
        self
    }

    /// Sets the cooling schedule.
    pub fn with_cooling(mut self, cooling: CoolingSchedule) -> Self {
        self.cooling = cooling;
        self
    }

    /// Enables periodic reheating.
    pub fn with_reheat(mut self, interval: u64, fraction: f64) -> Self {
        self.reheat_interval = Some(interval.max(1));
        self.reheat_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Sets the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Temperature after `step` temperature steps starting from `start`.
    pub fn temperature_at(&self, start: f64, step: u64) -> f64 {
        let t = match self.cooling {
            CoolingSchedule::Geometric => start * self.cooling_rate.powf(step as f64),
            CoolingSchedule::Linear => {
                let total_steps =
                    (self.max_iterations / self.iterations_per_temp.max(1) as u64).max(1);
                let frac = (step as f64 / total_steps as f64).min(1.0);
                start - (start - self.final_temp) * frac
            }
            CoolingSchedule::Logarithmic => start / (1.0 + (1.0 + step as f64).ln()),
        };
        t.max(self.final_temp)
    }
}

/// A solution that carries its own energy (lower is better).
pub trait SaSolution: Clone {
    /// Returns the cached energy.
    fn energy(&self) -> f64;

    /// Stores the energy.
    fn set_energy(&mut self, energy: f64);
}

/// Problem definition for annealing-style solvers.
///
/// The same trait drives [`SaRunner`] and
/// [`PtRunner`](crate::tempering::PtRunner).
pub trait SaProblem {
    /// Solution type.
    type Solution: SaSolution;

    /// Creates the starting solution.
    fn initial_solution<R: Rng>(&self, rng: &mut R) -> Self::Solution;

    /// Proposes a neighbor of `solution`. Must not modify `solution`.
    fn neighbor<R: Rng>(&self, solution: &Self::Solution, rng: &mut R) -> Self::Solution;

    /// Computes and stores the energy of `solution`.
    fn evaluate(&self, solution: &mut Self::Solution);

    /// Called after each temperature step.
    fn on_temperature_change(
        &self,
        _temperature: f64,
        _iteration: u64,
        _best: &Self::Solution,
        _current: &Self::Solution,
    ) {
    }
}

/// Metropolis acceptance test for an energy change `delta` at `temperature`.
///
/// Downhill and neutral moves are always accepted; non-finite candidates
/// (NaN deltas) are always rejected.
pub fn metropolis_accept<R: Rng>(delta: f64, temperature: f64, rng: &mut R) -> bool {
    if delta.is_nan() {
        return false;
    }
    if delta <= 0.0 {
        return true;
    }
    if temperature <= 0.0 {
        return false;
    }
    rng.gen::<f64>() < (-delta / temperature).exp()
}

/// Result of an annealing run.
#[derive(Debug, Clone)]
pub struct SaResult<S> {
    /// Best solution found.
    pub best: S,
    /// Proposals evaluated.
    pub iterations: u64,
    /// Accepted proposals.
    pub accepted: u64,
    /// Proposals that improved the best energy.
    pub improvements: u64,
    /// Temperature when the run stopped.
    pub final_temperature: f64,
    /// Wall time.
    pub elapsed: Duration,
    /// Best energy after each temperature step.
    pub history: Vec<f64>,
}

impl<S> SaResult<S> {
    /// Fraction of proposals accepted.
    pub fn acceptance_rate(&self) -> f64 {
        if self.iterations == 0 {
            0.0
        } else {
            self.accepted as f64 / self.iterations as f64
        }
    }
}

/// Simulated annealing runner.
pub struct SaRunner<P: SaProblem> {
    config: SaConfig,
    problem: P,
}

impl<P: SaProblem> SaRunner<P> {
    /// Creates a new runner.
    pub fn new(config: SaConfig, problem: P) -> Self {
        Self { config, problem }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SaConfig {
        &self.config
    }

    /// Returns the problem.
    pub fn problem(&self) -> &P {
        &self.problem
    }

    /// Runs with an RNG seeded from the configuration.
    pub fn run(&self) -> SaResult<P::Solution> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        self.run_with_rng(&mut rng)
    }

    /// Runs with the given RNG.
    pub fn run_with_rng<R: Rng>(&self, rng: &mut R) -> SaResult<P::Solution> {
        let mut current = self.problem.initial_solution(rng);
        self.problem.evaluate(&mut current);
        self.run_from(current, rng)
    }

    /// Runs starting from an already evaluated solution.
    pub fn run_from<R: Rng>(&self, initial: P::Solution, rng: &mut R) -> SaResult<P::Solution> {
        let start = Instant::now();
        let cfg = &self.config;

        let mut current = initial;
        let mut best = current.clone();
        let mut history = Vec::new();

        let mut schedule_start = cfg.initial_temp;
        let mut step = 0u64;
        let mut temperature = cfg.temperature_at(schedule_start, step);

        let mut iteration = 0u64;
        let mut accepted = 0u64;
        let mut improvements = 0u64;

        while iteration < cfg.max_iterations {
            for _ in 0..cfg.iterations_per_temp {
                if iteration >= cfg.max_iterations {
                    break;
                }

                let mut candidate = self.problem.neighbor(&current, rng);
                self.problem.evaluate(&mut candidate);

                let delta = candidate.energy() - current.energy();
                if metropolis_accept(delta, temperature, rng) {
                    current = candidate;
                    accepted += 1;
                    if current.energy() < best.energy() {
                        best = current.clone();
                        improvements += 1;
                    }
                }

                iteration += 1;

                if let Some(interval) = cfg.reheat_interval {
                    if iteration % interval == 0 {
                        schedule_start = cfg.initial_temp * cfg.reheat_fraction;
                        step = 0;
                        temperature = cfg.temperature_at(schedule_start, step);
                    }
                }
            }

            history.push(best.energy());
            self.problem
                .on_temperature_change(temperature, iteration, &best, &current);

            step += 1;
            temperature = cfg.temperature_at(schedule_start, step);
        }

        SaResult {
            best,
            iterations: iteration,
            accepted,
            improvements,
            final_temperature: temperature,
            elapsed: start.elapsed(),
            history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug)]
    struct Scalar {
        x: f64,
        energy: f64,
    }

    impl SaSolution for Scalar {
        fn energy(&self) -> f64 {
            self.energy
        }

        fn set_energy(&mut self, energy: f64) {
            self.energy = energy;
        }
    }

    struct Quadratic {
        target: f64,
    }

    impl SaProblem for Quadratic {
        type Solution = Scalar;

        fn initial_solution<R: Rng>(&self, rng: &mut R) -> Scalar {
            Scalar {
                x: rng.gen_range(-50.0..50.0),
                energy: f64::INFINITY,
            }
        }

        fn neighbor<R: Rng>(&self, solution: &Scalar, rng: &mut R) -> Scalar {
            Scalar {
                x: solution.x + rng.gen_range(-2.0..2.0),
                energy: f64::INFINITY,
            }
        }

        fn evaluate(&self, solution: &mut Scalar) {
            solution.set_energy((solution.x - self.target).powi(2));
        }
    }

    #[test]
    fn test_sa_finds_minimum() {
        let config = SaConfig::default()
            .with_initial_temp(50.0)
            .with_max_iterations(20_000)
            .with_seed(3);
        let result = SaRunner::new(config, Quadratic { target: 4.0 }).run();

        assert!((result.best.x - 4.0).abs() < 0.5, "x = {}", result.best.x);
        assert_eq!(result.iterations, 20_000);
        assert!(result.acceptance_rate() > 0.0);
    }

    #[test]
    fn test_sa_deterministic_for_seed() {
        let config = SaConfig::default().with_max_iterations(2_000).with_seed(11);
        let a = SaRunner::new(config.clone(), Quadratic { target: 1.0 }).run();
        let b = SaRunner::new(config, Quadratic { target: 1.0 }).run();

        assert_eq!(a.best.x.to_bits(), b.best.x.to_bits());
        assert_eq!(a.history, b.history);
    }

    #[test]
    fn test_history_is_monotone() {
        let config = SaConfig::default().with_max_iterations(5_000).with_seed(5);
        let result = SaRunner::new(config, Quadratic { target: -2.0 }).run();
        for pair in result.history.windows(2) {
            assert!(pair[1] <= pair[0]);
        }
    }

    #[test]
    fn test_cooling_schedules_respect_floor() {
        for cooling in [
            CoolingSchedule::Geometric,
            CoolingSchedule::Linear,
            CoolingSchedule::Logarithmic,
        ] {
            let config = SaConfig::default()
                .with_cooling(cooling)
                .with_final_temp(0.5)
                .with_max_iterations(1_000);
            assert!(config.temperature_at(100.0, 0) <= 100.0);
            assert!(config.temperature_at(100.0, 100_000) >= 0.5);
        }
    }

    #[test]
    fn test_reheat_raises_temperature() {
        let config = SaConfig::default()
            .with_initial_temp(10.0)
            .with_cooling_rate(0.5)
            .with_iterations_per_temp(10)
            .with_max_iterations(200)
            .with_reheat(100, 0.8);
        let result = SaRunner::new(config, Quadratic { target: 0.0 }).run();
        // The final 100 iterations restart at 8.0 and cool for 10 steps.
        assert!(result.final_temperature > 0.0);
        assert_eq!(result.iterations, 200);
    }

    #[test]
    fn test_metropolis_rejects_nan() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(!metropolis_accept(f64::NAN, 10.0, &mut rng));
        assert!(metropolis_accept(-1.0, 0.0, &mut rng));
        assert!(!metropolis_accept(1.0, 0.0, &mut rng));
    }
}
