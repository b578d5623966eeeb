//! Metropolis–Hastings sampling at a fixed temperature.
//!
//! The sampler draws from the Boltzmann distribution `π(s) ∝ exp(-E(s)/T)`
//! using the neighbor move of an [`SaProblem`] as a symmetric proposal. After
//! `burn_in` steps, every `thin`-th state is recorded until `n_samples` states
//! have been collected.

use crate::sa::{metropolis_accept, SaProblem, SaSolution};
use rand::prelude::*;
use rand::rngs::StdRng;
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the sampler.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct McmcConfig {
    /// Sampling temperature.
    pub temperature: f64,
    /// Steps discarded before recording.
    pub burn_in: usize,
    /// Steps between recorded samples.
    pub thin: usize,
    /// Samples to record.
    pub n_samples: usize,
    /// RNG seed.
    pub seed: u64,
}

impl Default for McmcConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            burn_in: 500,
            thin: 10,
            n_samples: 100,
            seed: 42,
        }
    }
}

impl McmcConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature.max(f64::EPSILON);
        self
    }

    /// Sets the burn-in length.
    pub fn with_burn_in(mut self, steps: usize) -> Self {
        self.burn_in = steps;
        self
    }

    /// Sets the thinning interval.
    pub fn with_thin(mut self, thin: usize) -> Self {
        self.thin = thin.max(1);
        self
    }

    /// Sets the number of recorded samples.
    pub fn with_samples(mut self, n: usize) -> Self {
        self.n_samples = n;
        self
    }

    /// Sets the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Output of a sampling run.
#[derive(Debug, Clone)]
pub struct McmcResult<S> {
    /// Recorded states in chain order.
    pub samples: Vec<S>,
    /// Lowest-energy state visited.
    pub best: S,
    /// Proposals evaluated.
    pub steps: usize,
    /// Fraction of proposals accepted.
    pub acceptance_rate: f64,
    /// Wall time.
    pub elapsed: Duration,
}

impl<S: SaSolution> McmcResult<S> {
    /// Energies of the recorded samples.
    pub fn energies(&self) -> Vec<f64> {
        self.samples.iter().map(SaSolution::energy).collect()
    }

    /// Mean energy over the recorded samples.
    pub fn mean_energy(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(SaSolution::energy).sum::<f64>() / self.samples.len() as f64
    }
}

/// Metropolis–Hastings sampler over any [`SaProblem`].
pub struct McmcSampler<P: SaProblem> {
    config: McmcConfig,
    problem: P,
}

impl<P: SaProblem> McmcSampler<P> {
    /// Creates a new sampler.
    pub fn new(config: McmcConfig, problem: P) -> Self {
        Self { config, problem }
    }

    /// Samples starting from the problem's initial solution.
    pub fn run(&self) -> McmcResult<P::Solution> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut initial = self.problem.initial_solution(&mut rng);
        self.problem.evaluate(&mut initial);
        self.run_from(initial, &mut rng)
    }

    /// Samples starting from an already evaluated state.
    pub fn run_from<R: Rng>(&self, initial: P::Solution, rng: &mut R) -> McmcResult<P::Solution> {
        let start = Instant::now();
        let cfg = &self.config;
        let total = cfg.burn_in + cfg.n_samples * cfg.thin;

        let mut current = initial;
        let mut best = current.clone();
        let mut samples = Vec::with_capacity(cfg.n_samples);
        let mut accepted = 0usize;

        for step in 1..=total {
            let mut candidate = self.problem.neighbor(&current, rng);
            self.problem.evaluate(&mut candidate);

            let delta = candidate.energy() - current.energy();
            if metropolis_accept(delta, cfg.temperature, rng) {
                current = candidate;
                accepted += 1;
                if current.energy() < best.energy() {
                    best = current.clone();
                }
            }

            if step > cfg.burn_in && (step - cfg.burn_in) % cfg.thin == 0 {
                samples.push(current.clone());
            }
        }

        let acceptance_rate = if total == 0 {
            0.0
        } else {
            accepted as f64 / total as f64
        };
        log::debug!(
            "MCMC: {} samples, acceptance={:.3}, best={:.4}",
            samples.len(),
            acceptance_rate,
            best.energy()
        );

        McmcResult {
            samples,
            best,
            steps: total,
            acceptance_rate,
            elapsed: start.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[derive(Clone)]
    struct Level {
        k: i32,
        energy: f64,
    }

    impl SaSolution for Level {
        fn energy(&self) -> f64 {
            self.energy
        }

        fn set_energy(&mut self, energy: f64) {
            self.energy = energy;
        }
    }

    /// Two states with energies 0 and 1 and a symmetric flip proposal.
    struct TwoLevel;

    impl SaProblem for TwoLevel {
        type Solution = Level;

        fn initial_solution<R: Rng>(&self, _rng: &mut R) -> Level {
            Level {
                k: 1,
                energy: f64::INFINITY,
            }
        }

        fn neighbor<R: Rng>(&self, s: &Level, _rng: &mut R) -> Level {
            Level {
                k: 1 - s.k,
                energy: f64::INFINITY,
            }
        }

        fn evaluate(&self, s: &mut Level) {
            s.energy = f64::from(s.k);
        }
    }

    #[test]
    fn test_sample_count_and_thinning() {
        let config = McmcConfig::default()
            .with_burn_in(20)
            .with_thin(5)
            .with_samples(30);
        let result = McmcSampler::new(config, TwoLevel).run();
        assert_eq!(result.samples.len(), 30);
        assert_eq!(result.steps, 20 + 150);
        assert_eq!(result.best.k, 0);
    }

    #[test]
    fn test_boltzmann_occupation() {
        // P(k=1) = e^{-1} / (1 + e^{-1}) at T = 1.
        let config = McmcConfig::default()
            .with_burn_in(100)
            .with_thin(1)
            .with_samples(40_000)
            .with_seed(12);
        let result = McmcSampler::new(config, TwoLevel).run();
        let expected = (-1.0f64).exp() / (1.0 + (-1.0f64).exp());
        assert_relative_eq!(result.mean_energy(), expected, epsilon = 0.02);
    }

    #[test]
    fn test_cold_chain_stays_low() {
        let config = McmcConfig::default().with_temperature(0.01).with_samples(50);
        let result = McmcSampler::new(config, TwoLevel).run();
        assert!(result.energies().iter().all(|&e| e == 0.0));
    }
}
