//! Parallel Tempering (replica-exchange Monte Carlo).
//!
//! `n_replicas` Metropolis chains run at fixed temperatures spaced
//! geometrically between `t_min` and `t_max`. After every sweep, adjacent
//! replicas propose to exchange their states; the exchange between
//! temperatures `T_i < T_j` is accepted with probability
//! `min(1, exp((β_i - β_j)(E_i - E_j)))`.
//!
//! Hot replicas explore, cold replicas refine, and swaps let good structure
//! found at high temperature migrate down the ladder. The chains are stepped
//! one after another on a single seeded RNG, so results are reproducible.

use crate::sa::{metropolis_accept, SaProblem, SaSolution};
use rand::prelude::*;
use rand::rngs::StdRng;
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for parallel tempering.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PtConfig {
    /// Number of replicas (at least 2).
    pub n_replicas: usize,
    /// Coldest temperature.
    pub t_min: f64,
    /// Hottest temperature.
    pub t_max: f64,
    /// Number of sweeps.
    pub sweeps: usize,
    /// Metropolis proposals per replica per sweep.
    pub steps_per_sweep: usize,
    /// Attempt swaps every `swap_interval` sweeps.
    pub swap_interval: usize,
    /// RNG seed.
    pub seed: u64,
}

impl Default for PtConfig {
    fn default() -> Self {
        Self {
            n_replicas: 8,
            t_min: 0.1,
            t_max: 100.0,
            sweeps: 200,
            steps_per_sweep: 10,
            swap_interval: 1,
            seed: 42,
        }
    }
}

impl PtConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the replica count.
    pub fn with_replicas(mut self, n: usize) -> Self {
        self.n_replicas = n.max(2);
        self
    }

    /// Sets the temperature range.
    pub fn with_temperature_range(mut self, t_min: f64, t_max: f64) -> Self {
        self.t_min = t_min.max(f64::EPSILON);
        self.t_max = t_max.max(self.t_min);
        self
    }

    /// Sets the sweep budget.
    pub fn with_sweeps(mut self, sweeps: usize) -> Self {
        self.sweeps = sweeps;
        self
    }

    /// Sets the proposals per replica per sweep.
    pub fn with_steps_per_sweep(mut self, steps: usize) -> Self {
        self.steps_per_sweep = steps.max(1);
        self
    }

    /// Sets the swap interval.
    pub fn with_swap_interval(mut self, interval: usize) -> Self {
        self.swap_interval = interval.max(1);
        self
    }

    /// Sets the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Geometric temperature ladder, coldest first.
    pub fn temperatures(&self) -> Vec<f64> {
        let n = self.n_replicas.max(2);
        let ratio = (self.t_max / self.t_min).max(1.0);
        (0..n)
            .map(|k| self.t_min * ratio.powf(k as f64 / (n - 1) as f64))
            .collect()
    }
}

/// Result of a parallel tempering run.
#[derive(Debug, Clone)]
pub struct PtResult<S> {
    /// Best solution seen by any replica.
    pub best: S,
    /// Final state of each replica, coldest first.
    pub replicas: Vec<S>,
    /// Temperature ladder, coldest first.
    pub temperatures: Vec<f64>,
    /// Sweeps performed.
    pub sweeps: usize,
    /// Metropolis proposals evaluated over all replicas.
    pub evaluations: u64,
    /// Swap acceptance rate for each adjacent pair `(k, k+1)`.
    pub swap_acceptance: Vec<f64>,
    /// Best energy after each sweep.
    pub history: Vec<f64>,
    /// Wall time.
    pub elapsed: Duration,
}

/// Parallel tempering runner over any [`SaProblem`].
pub struct PtRunner<P: SaProblem> {
    config: PtConfig,
    problem: P,
}

impl<P: SaProblem> PtRunner<P> {
    /// Creates a new runner.
    pub fn new(config: PtConfig, problem: P) -> Self {
        Self { config, problem }
    }

    /// Returns the problem.
    pub fn problem(&self) -> &P {
        &self.problem
    }

    /// Runs with an RNG seeded from the configuration.
    pub fn run(&self) -> PtResult<P::Solution> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        self.run_with_rng(&mut rng)
    }

    /// Runs with the given RNG.
    pub fn run_with_rng<R: Rng>(&self, rng: &mut R) -> PtResult<P::Solution> {
        let start = Instant::now();
        let temperatures = self.config.temperatures();
        let n = temperatures.len();

        let mut replicas: Vec<P::Solution> = (0..n)
            .map(|_| {
                let mut s = self.problem.initial_solution(rng);
                self.problem.evaluate(&mut s);
                s
            })
            .collect();

        let mut best = replicas
            .iter()
            .min_by(|a, b| a.energy().total_cmp(&b.energy()))
            .cloned()
            .unwrap_or_else(|| replicas[0].clone());

        let mut swap_attempts = vec![0u64; n - 1];
        let mut swap_accepts = vec![0u64; n - 1];
        let mut history = Vec::with_capacity(self.config.sweeps);
        let mut evaluations = 0u64;

        for sweep in 0..self.config.sweeps {
            for (replica, &temperature) in replicas.iter_mut().zip(&temperatures) {
                for _ in 0..self.config.steps_per_sweep {
                    let mut candidate = self.problem.neighbor(replica, rng);
                    self.problem.evaluate(&mut candidate);
                    evaluations += 1;

                    let delta = candidate.energy() - replica.energy();
                    if metropolis_accept(delta, temperature, rng) {
                        *replica = candidate;
                        if replica.energy() < best.energy() {
                            best = replica.clone();
                        }
                    }
                }
            }

            if (sweep + 1) % self.config.swap_interval == 0 {
                // Alternate even and odd pairs so every pair gets a chance.
                let offset = (sweep / self.config.swap_interval) % 2;
                let mut k = offset;
                while k + 1 < n {
                    swap_attempts[k] += 1;
                    let beta_cold = 1.0 / temperatures[k];
                    let beta_hot = 1.0 / temperatures[k + 1];
                    let log_ratio =
                        (beta_cold - beta_hot) * (replicas[k].energy() - replicas[k + 1].energy());
                    let accept = if log_ratio.is_nan() {
                        false
                    } else {
                        log_ratio >= 0.0 || rng.gen::<f64>() < log_ratio.exp()
                    };
                    if accept {
                        replicas.swap(k, k + 1);
                        swap_accepts[k] += 1;
                    }
                    k += 2;
                }
            }

            history.push(best.energy());

            if sweep % 50 == 0 {
                log::debug!(
                    "PT sweep {}: best={:.4}, cold={:.4}, hot={:.4}",
                    sweep,
                    best.energy(),
                    replicas[0].energy(),
                    replicas[n - 1].energy()
                );
            }
        }

        let swap_acceptance = swap_attempts
            .iter()
            .zip(&swap_accepts)
            .map(|(&a, &s)| if a == 0 { 0.0 } else { s as f64 / a as f64 })
            .collect();

        PtResult {
            best,
            replicas,
            temperatures,
            sweeps: self.config.sweeps,
            evaluations,
            swap_acceptance,
            history,
            elapsed: start.elapsed(),
        }
    }
}
