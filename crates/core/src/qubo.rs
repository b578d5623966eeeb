//! QUBO, Ising and Potts energy models.
//!
//! # Conventions
//!
//! - **QUBO**: minimize `E(x) = Σ_{i≤j} Q_ij x_i x_j` over `x ∈ {0,1}^n`.
//!   Only the upper triangle is stored (`n(n+1)/2` entries); `(i, j)` and
//!   `(j, i)` address the same cell.
//! - **Ising**: `E(s) = -Σ_{i<j} J_ij s_i s_j - Σ_i h_i s_i + offset` over
//!   `s ∈ {-1,+1}^n`, with `J` dense, symmetric and zero on the diagonal.
//! - **Potts**: `E(σ) = -Σ_{i<j} J_ij δ(σ_i, σ_j) - Σ_i h_i(σ_i)` over
//!   `σ ∈ {0..k}^n`.
//!
//! [`qubo_to_ising`] applies the exact substitution `x = (s + 1)/2` and keeps
//! the constant term in `offset`, so `evaluate_ising(qubo_to_ising(q), s)`
//! equals `evaluate_qubo(q, x)` for corresponding assignments.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Upper-triangular QUBO coefficient matrix.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QuboMatrix {
    n: usize,
    data: Vec<f64>,
}

impl QuboMatrix {
    /// Creates an all-zero matrix over `n` variables.
    pub fn new(n: usize) -> Self {
        Self {
            n,
            data: vec![0.0; n * (n + 1) / 2],
        }
    }

    /// Number of binary variables.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Raw upper-triangle storage, row-major.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Returns `Q_ij` (symmetric access).
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[self.offset(i, j)]
    }

    /// Sets `Q_ij` (symmetric access).
    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        let k = self.offset(i, j);
        self.data[k] = value;
    }

    /// Adds `value` to `Q_ij` (symmetric access).
    #[inline]
    pub fn add(&mut self, i: usize, j: usize, value: f64) {
        let k = self.offset(i, j);
        self.data[k] += value;
    }

    // Row i starts after rows 0..i, which hold n, n-1, ..., n-i+1 entries.
    #[inline]
    fn offset(&self, i: usize, j: usize) -> usize {
        let (i, j) = if i <= j { (i, j) } else { (j, i) };
        i * (2 * self.n - i + 1) / 2 + (j - i)
    }

    /// Evaluates `Σ_{i≤j} Q_ij x_i x_j`.
    pub fn evaluate(&self, x: &[bool]) -> f64 {
        let mut energy = 0.0;
        for i in 0..self.n {
            if !x[i] {
                continue;
            }
            let row = self.offset(i, i);
            for j in i..self.n {
                if x[j] {
                    energy += self.data[row + (j - i)];
                }
            }
        }
        energy
    }

    /// Energy change from flipping bit `k` of `x`.
    pub fn flip_delta(&self, x: &[bool], k: usize) -> f64 {
        let mut field = self.get(k, k);
        for (j, &xj) in x.iter().enumerate() {
            if j != k && xj {
                field += self.get(k, j);
            }
        }
        if x[k] {
            -field
        } else {
            field
        }
    }
}

/// Ising spin-glass model.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IsingModel {
    n: usize,
    /// Dense symmetric couplings, row-major `n × n`, zero diagonal.
    couplings: Vec<f64>,
    /// Local fields.
    fields: Vec<f64>,
    /// Constant energy offset.
    pub offset: f64,
}

impl IsingModel {
    /// Creates a model with zero couplings and fields.
    pub fn new(n: usize) -> Self {
        Self {
            n,
            couplings: vec![0.0; n * n],
            fields: vec![0.0; n],
            offset: 0.0,
        }
    }

    /// Number of spins.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Returns `J_ij`.
    #[inline]
    pub fn coupling(&self, i: usize, j: usize) -> f64 {
        self.couplings[i * self.n + j]
    }

    /// Sets `J_ij = J_ji`. Self-couplings are ignored.
    pub fn set_coupling(&mut self, i: usize, j: usize, value: f64) {
        if i == j {
            return;
        }
        self.couplings[i * self.n + j] = value;
        self.couplings[j * self.n + i] = value;
    }

    /// Returns `h_i`.
    #[inline]
    pub fn field(&self, i: usize) -> f64 {
        self.fields[i]
    }

    /// Sets `h_i`.
    pub fn set_field(&mut self, i: usize, value: f64) {
        self.fields[i] = value;
    }

    /// Row `i` of the coupling matrix.
    pub fn coupling_row(&self, i: usize) -> &[f64] {
        &self.couplings[i * self.n..(i + 1) * self.n]
    }

    /// Local field felt by spin `k`: `h_k + Σ_j J_kj s_j`.
    pub fn local_field(&self, spins: &[i8], k: usize) -> f64 {
        self.fields[k]
            + self
                .coupling_row(k)
                .iter()
                .zip(spins)
                .map(|(&j, &s)| j * f64::from(s))
                .sum::<f64>()
    }

    /// Energy change from flipping spin `k`.
    pub fn flip_delta(&self, spins: &[i8], k: usize) -> f64 {
        2.0 * f64::from(spins[k]) * self.local_field(spins, k)
    }
}

/// Potts model with `k` labels per variable.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PottsModel {
    n: usize,
    k: usize,
    /// Dense symmetric pair couplings, `n × n`.
    couplings: Vec<f64>,
    /// Local fields, `n × k`.
    fields: Vec<f64>,
}

impl PottsModel {
    /// Creates a model with zero couplings and fields.
    pub fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            k,
            couplings: vec![0.0; n * n],
            fields: vec![0.0; n * k],
        }
    }

    /// Number of variables.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of labels.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Returns `J_ij`.
    #[inline]
    pub fn coupling(&self, i: usize, j: usize) -> f64 {
        self.couplings[i * self.n + j]
    }

    /// Sets `J_ij = J_ji`.
    pub fn set_coupling(&mut self, i: usize, j: usize, value: f64) {
        if i == j {
            return;
        }
        self.couplings[i * self.n + j] = value;
        self.couplings[j * self.n + i] = value;
    }

    /// Returns `h_i(label)`.
    #[inline]
    pub fn field(&self, i: usize, label: usize) -> f64 {
        self.fields[i * self.k + label]
    }

    /// Sets `h_i(label)`.
    pub fn set_field(&mut self, i: usize, label: usize, value: f64) {
        self.fields[i * self.k + label] = value;
    }

    /// Energy change from relabelling variable `i` to `label`.
    pub fn relabel_delta(&self, labels: &[usize], i: usize, label: usize) -> f64 {
        let old = labels[i];
        if old == label {
            return 0.0;
        }
        let mut delta = self.field(i, old) - self.field(i, label);
        for (j, &lj) in labels.iter().enumerate() {
            if j == i {
                continue;
            }
            let jij = self.coupling(i, j);
            if lj == old {
                delta += jij;
            }
            if lj == label {
                delta -= jij;
            }
        }
        delta
    }
}

/// Evaluates a QUBO at a binary assignment.
pub fn evaluate_qubo(q: &QuboMatrix, x: &[bool]) -> f64 {
    q.evaluate(x)
}

/// Evaluates an Ising model at a spin assignment.
pub fn evaluate_ising(model: &IsingModel, spins: &[i8]) -> f64 {
    let n = model.n;
    let mut energy = model.offset;
    for i in 0..n {
        let si = f64::from(spins[i]);
        energy -= model.fields[i] * si;
        for j in (i + 1)..n {
            energy -= model.coupling(i, j) * si * f64::from(spins[j]);
        }
    }
    energy
}

/// Evaluates a Potts model at a label assignment.
pub fn evaluate_potts(model: &PottsModel, labels: &[usize]) -> f64 {
    let n = model.n;
    let mut energy = 0.0;
    for i in 0..n {
        energy -= model.field(i, labels[i]);
        for j in (i + 1)..n {
            if labels[i] == labels[j] {
                energy -= model.coupling(i, j);
            }
        }
    }
    energy
}

/// Converts a QUBO to an equivalent Ising model via `x = (s + 1)/2`.
///
/// `J_ij = -Q_ij/4`, `h_i = -Q_ii/2 - Σ_{j≠i} Q_ij/4`, and the constant
/// `Σ_i Q_ii/2 + Σ_{i<j} Q_ij/4` goes into `offset`.
pub fn qubo_to_ising(q: &QuboMatrix) -> IsingModel {
    let n = q.n();
    let mut model = IsingModel::new(n);
    let mut offset = 0.0;

    for i in 0..n {
        let qii = q.get(i, i);
        let mut h = -qii / 2.0;
        offset += qii / 2.0;
        for j in 0..n {
            if j == i {
                continue;
            }
            let qij = q.get(i, j);
            h -= qij / 4.0;
            if j > i {
                model.set_coupling(i, j, -qij / 4.0);
                offset += qij / 4.0;
            }
        }
        model.set_field(i, h);
    }

    model.offset = offset;
    model
}

/// Maps spins to bits (`+1 → 1`, `-1 → 0`).
pub fn spins_to_bits(spins: &[i8]) -> Vec<bool> {
    spins.iter().map(|&s| s > 0).collect()
}

/// Maps bits to spins (`1 → +1`, `0 → -1`).
pub fn bits_to_spins(bits: &[bool]) -> Vec<i8> {
    bits.iter().map(|&b| if b { 1 } else { -1 }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn all_assignments(n: usize) -> Vec<Vec<bool>> {
        (0..(1u32 << n))
            .map(|mask| (0..n).map(|i| mask & (1 << i) != 0).collect())
            .collect()
    }

    fn sample_qubo(n: usize, seed: u64) -> QuboMatrix {
        // Small deterministic pseudo-random coefficients.
        let mut q = QuboMatrix::new(n);
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        for i in 0..n {
            for j in i..n {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                let v = ((state >> 33) % 21) as f64 - 10.0;
                q.set(i, j, v);
            }
        }
        q
    }

    #[test]
    fn test_storage_size() {
        for n in 0..8 {
            assert_eq!(QuboMatrix::new(n).as_slice().len(), n * (n + 1) / 2);
        }
    }

    #[test]
    fn test_symmetric_access() {
        let mut q = QuboMatrix::new(4);
        q.set(3, 1, 2.5);
        assert_eq!(q.get(1, 3), 2.5);
        q.add(1, 3, 1.0);
        assert_eq!(q.get(3, 1), 3.5);

        // Every cell is distinct.
        let mut q = QuboMatrix::new(5);
        let mut v = 0.0;
        for i in 0..5 {
            for j in i..5 {
                v += 1.0;
                q.set(i, j, v);
            }
        }
        let mut seen: Vec<f64> = q.as_slice().to_vec();
        seen.sort_by(f64::total_cmp);
        seen.dedup();
        assert_eq!(seen.len(), 15);
    }

    #[test]
    fn test_evaluate_qubo_small() {
        let mut q = QuboMatrix::new(2);
        q.set(0, 0, -1.0);
        q.set(1, 1, -1.0);
        q.set(0, 1, 3.0);
        assert_eq!(evaluate_qubo(&q, &[false, false]), 0.0);
        assert_eq!(evaluate_qubo(&q, &[true, false]), -1.0);
        assert_eq!(evaluate_qubo(&q, &[true, true]), 1.0);
    }

    #[test]
    fn test_flip_delta_matches_full_evaluation() {
        let q = sample_qubo(5, 3);
        for x in all_assignments(5) {
            let base = q.evaluate(&x);
            for k in 0..5 {
                let mut y = x.clone();
                y[k] = !y[k];
                assert_relative_eq!(q.flip_delta(&x, k), q.evaluate(&y) - base, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_ising_energy_equals_qubo_energy() {
        for n in 1..=4 {
            for seed in 0..5 {
                let q = sample_qubo(n, seed);
                let ising = qubo_to_ising(&q);
                for x in all_assignments(n) {
                    let s = bits_to_spins(&x);
                    assert_relative_eq!(
                        evaluate_ising(&ising, &s),
                        evaluate_qubo(&q, &x),
                        epsilon = 1e-9
                    );
                }
            }
        }
    }

    #[test]
    fn test_ising_ranking_matches_qubo_ranking() {
        for n in 1..=4 {
            let q = sample_qubo(n, 17 + n as u64);
            let ising = qubo_to_ising(&q);
            let assignments = all_assignments(n);

            let mut by_qubo: Vec<usize> = (0..assignments.len()).collect();
            by_qubo.sort_by(|&a, &b| {
                evaluate_qubo(&q, &assignments[a])
                    .total_cmp(&evaluate_qubo(&q, &assignments[b]))
                    .then(a.cmp(&b))
            });

            let mut by_ising: Vec<usize> = (0..assignments.len()).collect();
            by_ising.sort_by(|&a, &b| {
                let ea = evaluate_ising(&ising, &bits_to_spins(&assignments[a]));
                let eb = evaluate_ising(&ising, &bits_to_spins(&assignments[b]));
                ea.total_cmp(&eb).then(a.cmp(&b))
            });

            assert_eq!(by_qubo, by_ising);
        }
    }

    #[test]
    fn test_ising_has_zero_self_coupling() {
        let q = sample_qubo(4, 2);
        let ising = qubo_to_ising(&q);
        for i in 0..4 {
            assert_eq!(ising.coupling(i, i), 0.0);
            for j in 0..4 {
                assert_eq!(ising.coupling(i, j), ising.coupling(j, i));
            }
        }
    }

    #[test]
    fn test_ising_flip_delta() {
        let mut model = IsingModel::new(3);
        model.set_coupling(0, 1, 1.0);
        model.set_coupling(1, 2, -0.5);
        model.set_field(2, 0.3);
        let spins = [1i8, -1, 1];
        for k in 0..3 {
            let mut flipped = spins;
            flipped[k] = -flipped[k];
            assert_relative_eq!(
                model.flip_delta(&spins, k),
                evaluate_ising(&model, &flipped) - evaluate_ising(&model, &spins),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_potts_energy_and_delta() {
        let mut model = PottsModel::new(3, 2);
        model.set_coupling(0, 1, -2.0);
        model.set_coupling(0, 2, -2.0);
        model.set_coupling(1, 2, -2.0);
        model.set_field(0, 0, 1.0);

        // All in the same label pays three conflicts.
        assert_relative_eq!(evaluate_potts(&model, &[0, 0, 0]), 6.0 - 1.0);
        assert_relative_eq!(evaluate_potts(&model, &[0, 1, 1]), 2.0 - 1.0);

        let labels = [0usize, 0, 0];
        let mut moved = labels;
        moved[2] = 1;
        assert_relative_eq!(
            model.relabel_delta(&labels, 2, 1),
            evaluate_potts(&model, &moved) - evaluate_potts(&model, &labels)
        );
    }
}
