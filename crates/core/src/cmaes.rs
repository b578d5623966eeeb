//! Covariance Matrix Adaptation Evolution Strategy (CMA-ES).
//!
//! Continuous black-box minimizer following Hansen's tutorial formulation:
//!
//! - population `λ = 4 + ⌊3 ln n⌋`, parents `μ = ⌊λ/2⌋` with log weights;
//! - mean update from the weighted best `μ` samples;
//! - cumulative step-size adaptation on the conjugate path `p_σ`;
//! - covariance update combining the rank-one path `p_c` and the rank-μ term;
//! - periodic eigendecomposition `C = B D² Bᵀ` (cyclic Jacobi) used for
//!   sampling and for whitening `C^{-1/2}`.
//!
//! Box bounds are handled by evaluating at the clamped point and adding a
//! quadratic penalty on the distance to it. Non-finite objective values are
//! replaced with a large constant so a single bad sample never poisons the
//! ranking.
//!
//! Candidates are sampled sequentially from the seeded RNG and evaluated in
//! parallel with rayon, so results do not depend on thread scheduling.
//!
//! # References
//!
//! - Hansen (2016), "The CMA Evolution Strategy: A Tutorial"

use nalgebra::{DMatrix, DVector};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;
use rayon::prelude::*;
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Objective value substituted for NaN or infinite evaluations.
pub const NON_FINITE_PENALTY: f64 = 1e12;

/// Configuration for CMA-ES.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CmaesConfig {
    /// Initial step size.
    pub sigma0: f64,
    /// Population size override (`None` = `4 + ⌊3 ln n⌋`).
    pub population_size: Option<usize>,
    /// Evaluation budget.
    pub max_evaluations: usize,
    /// Stop when `σ · √λ_max(C)` falls below this.
    pub tol_sigma: f64,
    /// Stop after this many generations without improving the best value.
    pub stagnation_generations: usize,
    /// Lower box bounds.
    pub lower: Option<Vec<f64>>,
    /// Upper box bounds.
    pub upper: Option<Vec<f64>>,
    /// Weight of the quadratic out-of-bounds penalty.
    pub penalty_weight: f64,
    /// RNG seed.
    pub seed: u64,
}

impl Default for CmaesConfig {
    fn default() -> Self {
        Self {
            sigma0: 0.5,
            population_size: None,
            max_evaluations: 10_000,
            tol_sigma: 1e-12,
            stagnation_generations: 100,
            lower: None,
            upper: None,
            penalty_weight: 1e4,
            seed: 42,
        }
    }
}

impl CmaesConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial step size.
    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma0 = sigma.max(f64::EPSILON);
        self
    }

    /// Overrides the population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = Some(size.max(4));
        self
    }

    /// Sets the evaluation budget.
    pub fn with_max_evaluations(mut self, n: usize) -> Self {
        self.max_evaluations = n;
        self
    }

    /// Sets the stagnation limit.
    pub fn with_stagnation_generations(mut self, n: usize) -> Self {
        self.stagnation_generations = n.max(1);
        self
    }

    /// Sets box bounds.
    pub fn with_bounds(mut self, lower: Vec<f64>, upper: Vec<f64>) -> Self {
        self.lower = Some(lower);
        self.upper = Some(upper);
        self
    }

    /// Sets the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn clamp(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .enumerate()
            .map(|(i, &v)| {
                let lo = self
                    .lower
                    .as_ref()
                    .and_then(|b| b.get(i).copied())
                    .unwrap_or(f64::NEG_INFINITY);
                let hi = self
                    .upper
                    .as_ref()
                    .and_then(|b| b.get(i).copied())
                    .unwrap_or(f64::INFINITY);
                if lo <= hi {
                    v.clamp(lo, hi)
                } else {
                    v
                }
            })
            .collect()
    }
}

/// Why a CMA-ES run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CmaesStop {
    /// Evaluation budget exhausted.
    MaxEvaluations,
    /// Search distribution collapsed.
    TolSigma,
    /// Best value stopped improving.
    Stagnation,
}

/// Result of a CMA-ES run.
#[derive(Debug, Clone)]
pub struct CmaesResult {
    /// Best point found (within bounds when bounds are set).
    pub best_x: Vec<f64>,
    /// Objective value at `best_x`, without penalty.
    pub best_f: f64,
    /// Objective evaluations.
    pub evaluations: usize,
    /// Generations completed.
    pub generations: usize,
    /// Step size at termination.
    pub final_sigma: f64,
    /// Termination reason.
    pub stop: CmaesStop,
    /// Best value after each generation.
    pub history: Vec<f64>,
    /// Wall time.
    pub elapsed: Duration,
}

/// CMA-ES runner over an objective closure.
pub struct CmaesRunner<F> {
    config: CmaesConfig,
    objective: F,
}

impl<F> CmaesRunner<F>
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    /// Creates a new runner.
    pub fn new(config: CmaesConfig, objective: F) -> Self {
        Self { config, objective }
    }

    /// Evaluates `x` at its clamped point, returning (penalized, raw, clamped).
    fn evaluate(&self, x: &[f64]) -> (f64, f64, Vec<f64>) {
        let clamped = self.config.clamp(x);
        let raw = (self.objective)(&clamped);
        let raw = if raw.is_finite() {
            raw
        } else {
            NON_FINITE_PENALTY
        };
        let dist_sq: f64 = x
            .iter()
            .zip(&clamped)
            .map(|(a, b)| (a - b).powi(2))
            .sum();
        (raw + self.config.penalty_weight * dist_sq, raw, clamped)
    }

    /// Minimizes the objective starting from `x0`.
    pub fn run(&self, x0: &[f64]) -> CmaesResult {
        let start = Instant::now();
        let cfg = &self.config;
        let n = x0.len();

        if n == 0 {
            let (_, raw, _) = self.evaluate(x0);
            return CmaesResult {
                best_x: Vec::new(),
                best_f: raw,
                evaluations: 1,
                generations: 0,
                final_sigma: cfg.sigma0,
                stop: CmaesStop::MaxEvaluations,
                history: vec![raw],
                elapsed: start.elapsed(),
            };
        }

        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let nf = n as f64;

        // Strategy parameters
        let lambda = cfg
            .population_size
            .unwrap_or(4 + (3.0 * nf.ln()).floor() as usize)
            .max(4);
        let mu = lambda / 2;
        let raw_weights: Vec<f64> = (0..mu)
            .map(|i| (mu as f64 + 0.5).ln() - ((i + 1) as f64).ln())
            .collect();
        let weight_sum: f64 = raw_weights.iter().sum();
        let weights: Vec<f64> = raw_weights.iter().map(|w| w / weight_sum).collect();
        let mueff = 1.0 / weights.iter().map(|w| w * w).sum::<f64>();

        let cc = (4.0 + mueff / nf) / (nf + 4.0 + 2.0 * mueff / nf);
        let cs = (mueff + 2.0) / (nf + mueff + 5.0);
        let c1 = 2.0 / ((nf + 1.3).powi(2) + mueff);
        let cmu = (1.0 - c1).min(2.0 * (mueff - 2.0 + 1.0 / mueff) / ((nf + 2.0).powi(2) + mueff));
        let damps = 1.0 + 2.0 * (((mueff - 1.0) / (nf + 1.0)).sqrt() - 1.0).max(0.0) + cs;
        let chi_n = nf.sqrt() * (1.0 - 1.0 / (4.0 * nf) + 1.0 / (21.0 * nf * nf));

        // Dynamic state
        let mut mean = DVector::from_column_slice(x0);
        let mut sigma = cfg.sigma0;
        let mut pc = DVector::<f64>::zeros(n);
        let mut ps = DVector::<f64>::zeros(n);
        let mut b = DMatrix::<f64>::identity(n, n);
        let mut d = DVector::<f64>::from_element(n, 1.0);
        let mut c = DMatrix::<f64>::identity(n, n);
        let mut inv_sqrt_c = DMatrix::<f64>::identity(n, n);
        let mut eigen_eval = 0usize;

        let (_, f0, x0_clamped) = self.evaluate(x0);
        let mut best_x = x0_clamped;
        let mut best_f = f0;
        let mut evaluations = 1usize;
        let mut generations = 0usize;
        let mut stagnation = 0usize;
        let mut history = Vec::new();
        let mut stop = CmaesStop::MaxEvaluations;

        while evaluations < cfg.max_evaluations {
            // Sample sequentially for determinism.
            let bd = &b * DMatrix::from_diagonal(&d);
            let candidates: Vec<DVector<f64>> = (0..lambda)
                .map(|_| {
                    let z = DVector::<f64>::from_fn(n, |_, _| rng.sample(StandardNormal));
                    &mean + sigma * (&bd * z)
                })
                .collect();

            let scored: Vec<(f64, f64, Vec<f64>)> = candidates
                .par_iter()
                .map(|x| self.evaluate(x.as_slice()))
                .collect();
            evaluations += lambda;
            generations += 1;

            let mut order: Vec<usize> = (0..lambda).collect();
            order.sort_by(|&i, &j| scored[i].0.total_cmp(&scored[j].0));

            let improved = scored
                .iter()
                .filter(|(_, raw, _)| *raw < best_f - 1e-12)
                .min_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((_, raw, clamped)) = improved {
                best_f = *raw;
                best_x = clamped.clone();
                stagnation = 0;
            } else {
                stagnation += 1;
            }
            history.push(best_f);

            // Mean update
            let old_mean = mean.clone();
            mean = DVector::zeros(n);
            for (w, &idx) in weights.iter().zip(&order) {
                mean += *w * &candidates[idx];
            }
            let y_w = (&mean - &old_mean) / sigma;

            // Step-size path
            ps = (1.0 - cs) * &ps + (cs * (2.0 - cs) * mueff).sqrt() * (&inv_sqrt_c * &y_w);
            let ps_norm = ps.norm();
            let decay = 1.0 - (1.0 - cs).powf(2.0 * evaluations as f64 / lambda as f64);
            let hsig = ps_norm / decay.max(f64::EPSILON).sqrt() / chi_n < 1.4 + 2.0 / (nf + 1.0);
            let hsig_f = if hsig { 1.0 } else { 0.0 };

            // Covariance path
            pc = (1.0 - cc) * &pc + hsig_f * (cc * (2.0 - cc) * mueff).sqrt() * &y_w;

            // Covariance update: rank-one + rank-mu
            let mut rank_mu = DMatrix::<f64>::zeros(n, n);
            for (w, &idx) in weights.iter().zip(&order) {
                let diff = (&candidates[idx] - &old_mean) / sigma;
                rank_mu += *w * &diff * diff.transpose();
            }
            let rank_one = &pc * pc.transpose() + (1.0 - hsig_f) * cc * (2.0 - cc) * &c;
            c = (1.0 - c1 - cmu) * &c + c1 * rank_one + cmu * rank_mu;

            // Step-size update
            sigma *= ((cs / damps) * (ps_norm / chi_n - 1.0)).exp();
            sigma = sigma.min(1e10);

            // Re-diagonalize lazily
            if (evaluations - eigen_eval) as f64 > lambda as f64 / (c1 + cmu) / nf / 10.0 {
                eigen_eval = evaluations;
                c = (&c + c.transpose()) * 0.5;
                let (values, vectors) = jacobi_eigen(&c);
                b = vectors;
                d = values.map(|v| v.max(1e-20).sqrt());
                let d_inv = DMatrix::from_diagonal(&d.map(|v| 1.0 / v));
                inv_sqrt_c = &b * d_inv * b.transpose();
            }

            if generations % 50 == 0 {
                log::debug!(
                    "CMA-ES gen {}: best={:.6}, sigma={:.3e}, evals={}",
                    generations,
                    best_f,
                    sigma,
                    evaluations
                );
            }

            let max_d = d.iter().copied().fold(0.0_f64, f64::max);
            if sigma * max_d < cfg.tol_sigma {
                stop = CmaesStop::TolSigma;
                break;
            }
            if stagnation >= cfg.stagnation_generations {
                stop = CmaesStop::Stagnation;
                break;
            }
        }

        CmaesResult {
            best_x,
            best_f,
            evaluations,
            generations,
            final_sigma: sigma,
            stop,
            history,
            elapsed: start.elapsed(),
        }
    }
}

/// Minimizes `objective` from `x0` with the given configuration.
pub fn minimize<F>(objective: F, x0: &[f64], config: &CmaesConfig) -> CmaesResult
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    CmaesRunner::new(config.clone(), objective).run(x0)
}

/// Eigendecomposition of a symmetric matrix by cyclic Jacobi rotations.
///
/// Returns `(eigenvalues, eigenvectors)` with eigenvectors as columns.
pub fn jacobi_eigen(matrix: &DMatrix<f64>) -> (DVector<f64>, DMatrix<f64>) {
    let n = matrix.nrows();
    let mut a = matrix.clone();
    let mut v = DMatrix::<f64>::identity(n, n);
    let scale = a.iter().map(|x| x * x).sum::<f64>().sqrt().max(f64::MIN_POSITIVE);

    for _sweep in 0..64 {
        let mut off = 0.0;
        for p in 0..n {
            for q in (p + 1)..n {
                off += a[(p, q)] * a[(p, q)];
            }
        }
        if off.sqrt() <= 1e-15 * scale {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[(p, q)];
                if apq.abs() <= f64::MIN_POSITIVE {
                    continue;
                }
                let theta = (a[(q, q)] - a[(p, p)]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let cos = 1.0 / (t * t + 1.0).sqrt();
                let sin = t * cos;

                for k in 0..n {
                    let akp = a[(k, p)];
                    let akq = a[(k, q)];
                    a[(k, p)] = cos * akp - sin * akq;
                    a[(k, q)] = sin * akp + cos * akq;
                }
                for k in 0..n {
                    let apk = a[(p, k)];
                    let aqk = a[(q, k)];
                    a[(p, k)] = cos * apk - sin * aqk;
                    a[(q, k)] = sin * apk + cos * aqk;
                }
                for k in 0..n {
                    let vkp = v[(k, p)];
                    let vkq = v[(k, q)];
                    v[(k, p)] = cos * vkp - sin * vkq;
                    v[(k, q)] = sin * vkp + cos * vkq;
                }
            }
        }
    }

    (a.diagonal(), v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sphere(x: &[f64]) -> f64 {
        x.iter().map(|v| v * v).sum()
    }

    #[test]
    fn test_jacobi_reconstructs_matrix() {
        let m = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.5, 1.0, 3.0, 0.2, 0.5, 0.2, 2.0]);
        let (values, vectors) = jacobi_eigen(&m);
        let rebuilt = &vectors * DMatrix::from_diagonal(&values) * vectors.transpose();
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(rebuilt[(i, j)], m[(i, j)], epsilon = 1e-10);
            }
        }
        let trace: f64 = values.iter().sum();
        assert_relative_eq!(trace, 9.0, epsilon = 1e-10);
    }

    #[test]
    fn test_jacobi_diagonal_input() {
        let m = DMatrix::from_diagonal(&DVector::from_vec(vec![3.0, 1.0]));
        let (values, _) = jacobi_eigen(&m);
        assert_relative_eq!(values[0], 3.0);
        assert_relative_eq!(values[1], 1.0);
    }

    #[test]
    fn test_cmaes_minimizes_sphere() {
        let config = CmaesConfig::default()
            .with_sigma(1.0)
            .with_max_evaluations(6000)
            .with_seed(1);
        let result = minimize(sphere, &[3.0, -2.0, 1.5, 4.0, -1.0], &config);
        assert!(result.best_f < 1e-8, "best_f = {}", result.best_f);
        assert!(result.best_x.iter().all(|v| v.abs() < 1e-3));
    }

    #[test]
    fn test_cmaes_rosenbrock() {
        let rosen = |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
        let config = CmaesConfig::default()
            .with_sigma(0.5)
            .with_max_evaluations(8000)
            .with_seed(2);
        let result = minimize(rosen, &[-1.0, 1.0], &config);
        assert!(result.best_f < 1e-6, "best_f = {}", result.best_f);
        assert_relative_eq!(result.best_x[0], 1.0, epsilon = 1e-2);
    }

    #[test]
    fn test_cmaes_respects_bounds() {
        let f = |x: &[f64]| (x[0] - 5.0).powi(2) + (x[1] + 5.0).powi(2);
        let config = CmaesConfig::default()
            .with_bounds(vec![0.0, -2.0], vec![2.0, 2.0])
            .with_max_evaluations(3000)
            .with_seed(3);
        let result = minimize(f, &[1.0, 0.0], &config);
        assert!(result.best_x[0] <= 2.0 && result.best_x[0] >= 0.0);
        assert!(result.best_x[1] <= 2.0 && result.best_x[1] >= -2.0);
        assert_relative_eq!(result.best_x[0], 2.0, epsilon = 1e-3);
        assert_relative_eq!(result.best_x[1], -2.0, epsilon = 1e-3);
    }

    #[test]
    fn test_cmaes_non_finite_objective() {
        let f = |x: &[f64]| if x[0] < 0.0 { f64::NAN } else { x[0] * x[0] + 1.0 };
        let config = CmaesConfig::default().with_max_evaluations(500).with_seed(4);
        let result = minimize(f, &[1.0, 0.0], &config);
        assert!(result.best_f.is_finite());
        assert!(result.best_f < NON_FINITE_PENALTY);
    }

    #[test]
    fn test_cmaes_deterministic() {
        let config = CmaesConfig::default().with_max_evaluations(400).with_seed(9);
        let a = minimize(sphere, &[1.0, 1.0, 1.0], &config);
        let b = minimize(sphere, &[1.0, 1.0, 1.0], &config);
        assert_eq!(a.best_x, b.best_x);
        assert_eq!(a.history, b.history);
    }
}
