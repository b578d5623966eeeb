//! Entropic optimal transport (Sinkhorn).
//!
//! Solves
//!
//! ```text
//! min_P  <P, C> - ε H(P)   s.t.  P 1 = a,  Pᵀ 1 = b,  P ≥ 0
//! ```
//!
//! with the Sinkhorn fixed-point iteration carried out on the dual potentials
//! in the log domain, which stays stable for small `ε`.
//!
//! Two relaxations sit next to the balanced solver:
//!
//! | Function | Marginals | Use |
//! |----------|-----------|-----|
//! | [`sinkhorn`] | exact | supply equals demand |
//! | [`sinkhorn_unbalanced`] | KL penalty `ρ` | masses differ, surplus may be dropped |
//! | [`sinkhorn_partial`] | upper bounds | move only a fraction of the mass |
//!
//! # References
//!
//! - Cuturi (2013), "Sinkhorn Distances: Lightspeed Computation of Optimal
//!   Transport"
//! - Peyré & Cuturi (2019), "Computational Optimal Transport", §4.4
//! - Chizat et al. (2018), "Scaling Algorithms for Unbalanced Optimal Transport"
//! - Benamou et al. (2015), "Iterative Bregman Projections for Regularized
//!   Transportation Problems"

use crate::error::{Error, Result};
use nalgebra::DMatrix;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the Sinkhorn solver.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SinkhornConfig {
    /// Entropic regularization strength.
    pub epsilon: f64,
    /// Iteration budget.
    pub max_iterations: usize,
    /// Stop when the L1 marginal error falls below this.
    pub tolerance: f64,
}

impl Default for SinkhornConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.05,
            max_iterations: 1000,
            tolerance: 1e-9,
        }
    }
}

impl SinkhornConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the regularization strength.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon.max(1e-6);
        self
    }

    /// Sets the iteration budget.
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n.max(1);
        self
    }

    /// Sets the convergence tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Output of a Sinkhorn solve.
#[derive(Debug, Clone)]
pub struct SinkhornResult {
    /// Transport plan, `len(a) × len(b)`.
    pub plan: DMatrix<f64>,
    /// `<P, C>`.
    pub transport_cost: f64,
    /// Iterations performed.
    pub iterations: usize,
    /// L1 error of the row and column marginals at exit.
    pub marginal_error: f64,
    /// Whether the tolerance was reached.
    pub converged: bool,
    /// Total mass moved by the plan.
    pub mass: f64,
}

fn log_sum_exp(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let max = values.clone().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.map(|v| (v - max).exp()).sum::<f64>().ln()
}

fn check_problem(a: &[f64], b: &[f64], cost: &DMatrix<f64>) -> Result<(usize, usize)> {
    let (n, m) = (a.len(), b.len());
    if cost.nrows() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            actual: cost.nrows(),
        });
    }
    if cost.ncols() != m {
        return Err(Error::DimensionMismatch {
            expected: m,
            actual: cost.ncols(),
        });
    }
    if a.iter().chain(b).any(|&v| v < 0.0 || !v.is_finite()) {
        return Err(Error::InvalidConfig(
            "marginals must be finite and non-negative".to_string(),
        ));
    }

    Ok((n, m))
}

/// Balanced entropic optimal transport between `a` and `b` under `cost`.
///
/// Masses are normalized to sum to one before solving; the returned plan is
/// scaled back to the total mass of `a`.
pub fn sinkhorn(
    a: &[f64],
    b: &[f64],
    cost: &DMatrix<f64>,
    config: &SinkhornConfig,
) -> Result<SinkhornResult> {
    let (n, m) = check_problem(a, b, cost)?;

    let mass_a: f64 = a.iter().sum();
    let mass_b: f64 = b.iter().sum();
    if mass_a <= 0.0 || mass_b <= 0.0 {
        return Err(Error::InvalidConfig("marginals must carry mass".to_string()));
    }
    if (mass_a - mass_b).abs() > 1e-9 * mass_a.max(mass_b) {
        log::warn!(
            "Sinkhorn marginals unbalanced ({:.4} vs {:.4}); normalizing both",
            mass_a,
            mass_b
        );
    }

    let a: Vec<f64> = a.iter().map(|v| v / mass_a).collect();
    let b: Vec<f64> = b.iter().map(|v| v / mass_b).collect();
    let log_a: Vec<f64> = a.iter().map(|v| v.ln()).collect();
    let log_b: Vec<f64> = b.iter().map(|v| v.ln()).collect();
    let eps = config.epsilon;

    let mut f = vec![0.0; n];
    let mut g = vec![0.0; m];
    let mut iterations = 0;
    let mut marginal_error = f64::INFINITY;

    let plan_entry = |f: &[f64], g: &[f64], i: usize, j: usize| -> f64 {
        ((f[i] + g[j] - cost[(i, j)]) / eps).exp()
    };

    while iterations < config.max_iterations {
        iterations += 1;

        for i in 0..n {
            let lse = log_sum_exp((0..m).map(|j| (g[j] - cost[(i, j)]) / eps));
            f[i] = if log_a[i].is_finite() {
                eps * (log_a[i] - lse)
            } else {
                f64::NEG_INFINITY
            };
        }
        for j in 0..m {
            let lse = log_sum_exp((0..n).map(|i| (f[i] - cost[(i, j)]) / eps));
            g[j] = if log_b[j].is_finite() {
                eps * (log_b[j] - lse)
            } else {
                f64::NEG_INFINITY
            };
        }

        // Columns are exact after the g-update; measure the row error.
        marginal_error = (0..n)
            .map(|i| ((0..m).map(|j| plan_entry(&f, &g, i, j)).sum::<f64>() - a[i]).abs())
            .sum();
        if marginal_error < config.tolerance {
            break;
        }
    }

    let plan = DMatrix::from_fn(n, m, |i, j| plan_entry(&f, &g, i, j) * mass_a);
    let transport_cost = plan.component_mul(cost).sum();
    let converged = marginal_error < config.tolerance;

    log::debug!(
        "Sinkhorn: {}x{}, iterations={}, error={:.2e}, cost={:.4}",
        n,
        m,
        iterations,
        marginal_error,
        transport_cost
    );

    Ok(SinkhornResult {
        mass: plan.sum(),
        plan,
        transport_cost,
        iterations,
        marginal_error,
        converged,
    })
}

fn marginals(plan: &DMatrix<f64>) -> (Vec<f64>, Vec<f64>) {
    let rows = (0..plan.nrows()).map(|i| plan.row(i).sum()).collect();
    let cols = (0..plan.ncols()).map(|j| plan.column(j).sum()).collect();
    (rows, cols)
}

fn l1_change(prev: &[f64], next: &[f64]) -> f64 {
    prev.iter().zip(next).map(|(p, q)| (p - q).abs()).sum()
}

/// Unbalanced entropic transport with KL-relaxed marginals.
///
/// Solves
///
/// ```text
/// min_P  <P, C> + ε KL(P | abᵀ) + ρ KL(P 1 | a) + ρ KL(Pᵀ 1 | b)
/// ```
///
/// Masses are not normalized: the plan may create or destroy mass when that
/// is cheaper than transporting it. As `ρ → ∞` the solution approaches the
/// balanced plan; as `ρ → 0` the plan shrinks towards zero.
///
/// `marginal_error` reports the L1 change of the plan's marginals over the
/// last iteration.
pub fn sinkhorn_unbalanced(
    a: &[f64],
    b: &[f64],
    cost: &DMatrix<f64>,
    reg_m: f64,
    config: &SinkhornConfig,
) -> Result<SinkhornResult> {
    let (n, m) = check_problem(a, b, cost)?;
    if !(reg_m > 0.0 && reg_m.is_finite()) {
        return Err(Error::InvalidConfig(format!(
            "marginal relaxation must be positive, got {}",
            reg_m
        )));
    }
    if a.iter().sum::<f64>() <= 0.0 || b.iter().sum::<f64>() <= 0.0 {
        return Err(Error::InvalidConfig("marginals must carry mass".to_string()));
    }

    let eps = config.epsilon;
    let fi = reg_m / (reg_m + eps);
    let log_a: Vec<f64> = a.iter().map(|v| v.ln()).collect();
    let log_b: Vec<f64> = b.iter().map(|v| v.ln()).collect();

    let mut f = vec![0.0; n];
    let mut g = vec![0.0; m];
    let build = |f: &[f64], g: &[f64]| {
        DMatrix::from_fn(n, m, |i, j| ((f[i] + g[j] - cost[(i, j)]) / eps).exp())
    };
    let (mut rows, mut cols) = marginals(&build(&f, &g));
    let mut iterations = 0;
    let mut change = f64::INFINITY;

    while iterations < config.max_iterations {
        iterations += 1;

        for i in 0..n {
            let lse = log_sum_exp((0..m).map(|j| (g[j] - cost[(i, j)]) / eps));
            f[i] = if log_a[i].is_finite() {
                fi * eps * (log_a[i] - lse)
            } else {
                f64::NEG_INFINITY
            };
        }
        for j in 0..m {
            let lse = log_sum_exp((0..n).map(|i| (f[i] - cost[(i, j)]) / eps));
            g[j] = if log_b[j].is_finite() {
                fi * eps * (log_b[j] - lse)
            } else {
                f64::NEG_INFINITY
            };
        }

        let (next_rows, next_cols) = marginals(&build(&f, &g));
        change = l1_change(&rows, &next_rows) + l1_change(&cols, &next_cols);
        rows = next_rows;
        cols = next_cols;
        if change < config.tolerance {
            break;
        }
    }

    let plan = build(&f, &g);
    let transport_cost = plan.component_mul(cost).sum();
    let mass = plan.sum();

    log::debug!(
        "Unbalanced Sinkhorn: {}x{}, rho={}, iterations={}, mass={:.4}, cost={:.4}",
        n,
        m,
        reg_m,
        iterations,
        mass,
        transport_cost
    );

    Ok(SinkhornResult {
        plan,
        transport_cost,
        iterations,
        marginal_error: change,
        converged: change < config.tolerance,
        mass,
    })
}

/// Partial entropic transport: moves `fraction` of `min(Σa, Σb)` while keeping
/// every row sum at most `a[i]` and every column sum at most `b[j]`.
///
/// Iterates Bregman projections onto the row bounds, the column bounds and the
/// total-mass constraint. The cheapest pairs are filled first, so a small
/// fraction concentrates the plan on the lowest-cost cells.
///
/// `marginal_error` reports the L1 change of the plan's marginals over the
/// last iteration.
pub fn sinkhorn_partial(
    a: &[f64],
    b: &[f64],
    cost: &DMatrix<f64>,
    fraction: f64,
    config: &SinkhornConfig,
) -> Result<SinkhornResult> {
    let (n, m) = check_problem(a, b, cost)?;
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(Error::InvalidConfig(format!(
            "transported fraction must be in (0, 1], got {}",
            fraction
        )));
    }
    let target = fraction * a.iter().sum::<f64>().min(b.iter().sum::<f64>());
    if target <= 0.0 {
        return Err(Error::InvalidConfig("marginals must carry mass".to_string()));
    }

    let eps = config.epsilon;
    let min_cost = cost.iter().cloned().fold(f64::INFINITY, f64::min);
    let mut plan = DMatrix::from_fn(n, m, |i, j| (-(cost[(i, j)] - min_cost) / eps).exp());
    let scale = target / plan.sum();
    plan *= scale;

    let (mut rows, mut cols) = marginals(&plan);
    let mut iterations = 0;
    let mut change = f64::INFINITY;

    while iterations < config.max_iterations {
        iterations += 1;

        for i in 0..n {
            let row = plan.row(i).sum();
            if row > a[i] {
                let shrink = a[i] / row;
                plan.row_mut(i).scale_mut(shrink);
            }
        }
        for j in 0..m {
            let col = plan.column(j).sum();
            if col > b[j] {
                let shrink = b[j] / col;
                plan.column_mut(j).scale_mut(shrink);
            }
        }
        let total = plan.sum();
        if total > 0.0 {
            plan *= target / total;
        }

        let (next_rows, next_cols) = marginals(&plan);
        change = l1_change(&rows, &next_rows) + l1_change(&cols, &next_cols);
        rows = next_rows;
        cols = next_cols;
        if change < config.tolerance {
            break;
        }
    }

    let transport_cost = plan.component_mul(cost).sum();
    let mass = plan.sum();

    log::debug!(
        "Partial Sinkhorn: {}x{}, target={:.4}, iterations={}, cost={:.4}",
        n,
        m,
        target,
        iterations,
        transport_cost
    );

    Ok(SinkhornResult {
        plan,
        transport_cost,
        iterations,
        marginal_error: change,
        converged: change < config.tolerance,
        mass,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_marginals_match() {
        let a = [0.2, 0.5, 0.3];
        let b = [0.4, 0.6];
        let cost = DMatrix::from_row_slice(3, 2, &[0.0, 1.0, 1.0, 0.0, 0.5, 0.5]);
        let result = sinkhorn(&a, &b, &cost, &SinkhornConfig::default().with_epsilon(0.1)).unwrap();

        assert!(result.converged);
        for i in 0..3 {
            assert_relative_eq!(result.plan.row(i).sum(), a[i], epsilon = 1e-6);
        }
        for j in 0..2 {
            assert_relative_eq!(result.plan.column(j).sum(), b[j], epsilon = 1e-6);
        }
    }

    #[test]
    fn test_small_epsilon_approaches_assignment() {
        let a = [0.5, 0.5];
        let b = [0.5, 0.5];
        let cost = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
        let result = sinkhorn(&a, &b, &cost, &SinkhornConfig::default().with_epsilon(0.01)).unwrap();
        assert_relative_eq!(result.plan[(0, 0)], 0.5, epsilon = 1e-6);
        assert_relative_eq!(result.plan[(1, 1)], 0.5, epsilon = 1e-6);
        assert!(result.transport_cost < 1e-6);
    }

    #[test]
    fn test_uniform_cost_gives_product_plan() {
        let a = [0.25, 0.75];
        let b = [0.5, 0.5];
        let cost = DMatrix::from_element(2, 2, 3.0);
        let result = sinkhorn(&a, &b, &cost, &SinkhornConfig::default()).unwrap();
        for i in 0..2 {
            for j in 0..2 {
                assert_relative_eq!(result.plan[(i, j)], a[i] * b[j], epsilon = 1e-9);
            }
        }
        assert_relative_eq!(result.transport_cost, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_unbalanced_single_cell_closed_form() {
        // 1x1, zero cost: log P = fi / (1 + fi) * ln(ab)
        let cost = DMatrix::from_element(1, 1, 0.0);
        let config = SinkhornConfig::default().with_epsilon(0.1);
        let result = sinkhorn_unbalanced(&[1.0], &[4.0], &cost, 1.0, &config).unwrap();
        let fi = 1.0 / 1.1;
        let expected = (fi / (1.0 + fi) * 4.0_f64.ln()).exp();
        assert!(result.converged);
        assert_relative_eq!(result.mass, expected, epsilon = 1e-6);
        assert!(result.mass > 1.0 && result.mass < 4.0);
    }

    #[test]
    fn test_unbalanced_large_rho_matches_marginals() {
        let a = [0.2, 0.5, 0.3];
        let b = [0.4, 0.6];
        let cost = DMatrix::from_row_slice(3, 2, &[0.0, 1.0, 1.0, 0.0, 0.5, 0.5]);
        let config = SinkhornConfig::default().with_epsilon(0.1);
        let result = sinkhorn_unbalanced(&a, &b, &cost, 1e4, &config).unwrap();
        for i in 0..3 {
            assert_relative_eq!(result.plan.row(i).sum(), a[i], epsilon = 1e-3);
        }
        for j in 0..2 {
            assert_relative_eq!(result.plan.column(j).sum(), b[j], epsilon = 1e-3);
        }
    }

    #[test]
    fn test_unbalanced_small_rho_drops_mass() {
        let a = [0.5, 0.5];
        let b = [0.5, 0.5];
        let cost = DMatrix::from_element(2, 2, 1.0);
        let config = SinkhornConfig::default().with_epsilon(0.1);
        let tight = sinkhorn_unbalanced(&a, &b, &cost, 100.0, &config).unwrap();
        let loose = sinkhorn_unbalanced(&a, &b, &cost, 0.1, &config).unwrap();
        assert!(loose.mass < tight.mass);
        assert!(sinkhorn_unbalanced(&a, &b, &cost, 0.0, &config).is_err());
    }

    #[test]
    fn test_partial_moves_requested_mass() {
        let a = [0.2, 0.5, 0.3];
        let b = [0.4, 0.6];
        let cost = DMatrix::from_row_slice(3, 2, &[0.0, 1.0, 1.0, 0.0, 0.5, 0.5]);
        let config = SinkhornConfig::default()
            .with_epsilon(0.1)
            .with_max_iterations(5000)
            .with_tolerance(1e-10);
        let result = sinkhorn_partial(&a, &b, &cost, 0.7, &config).unwrap();
        assert_relative_eq!(result.mass, 0.7, epsilon = 1e-9);
        for i in 0..3 {
            assert!(result.plan.row(i).sum() <= a[i] + 1e-4);
        }
        for j in 0..2 {
            assert!(result.plan.column(j).sum() <= b[j] + 1e-4);
        }
    }

    #[test]
    fn test_partial_prefers_cheapest_pair() {
        let a = [0.5, 0.5];
        let b = [0.5, 0.5];
        let cost = DMatrix::from_row_slice(2, 2, &[0.0, 5.0, 5.0, 3.0]);
        let result =
            sinkhorn_partial(&a, &b, &cost, 0.5, &SinkhornConfig::default()).unwrap();
        assert!(result.plan[(0, 0)] > 0.49);
        assert!(result.transport_cost < 0.01);
        assert!(sinkhorn_partial(&a, &b, &cost, 1.5, &SinkhornConfig::default()).is_err());
    }

    #[test]
    fn test_dimension_mismatch() {
        let cost = DMatrix::from_element(2, 3, 1.0);
        let err = sinkhorn(&[0.5, 0.5], &[1.0], &cost, &SinkhornConfig::default());
        assert!(matches!(
            err,
            Err(Error::DimensionMismatch {
                expected: 1,
                actual: 3
            })
        ));
    }
}
