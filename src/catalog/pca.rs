//! Principal component analysis by power iteration.
//!
//! Components are extracted one at a time from `XᵀX` (X mean-centered),
//! each iteration re-orthogonalized against the components already found.
//! `XᵀX` is never materialized: every step is two matrix–vector products,
//! O(n·d). Directions whose variance is negligible relative to the total come
//! back as zero vectors, so rank-deficient inputs produce zero score columns.

use ndarray::{Array1, Array2, Axis};

/// Upper bound on power iterations per component.
pub const MAX_ITERATIONS: usize = 1000;

/// Convergence threshold on the largest per-coordinate change of the unit
/// direction between iterations.
const TOLERANCE: f64 = 1e-10;

/// A component whose eigenvalue is below this fraction of the total variance
/// is treated as absent.
const RELATIVE_VARIANCE_FLOOR: f64 = 1e-10;

/// Fitted principal axes.
#[derive(Debug, Clone)]
pub struct Pca {
    pub mean: Array1<f64>,
    /// One unit-length (or all-zero) row per component.
    pub components: Array2<f64>,
    /// Variance captured along each component, `λ / (n - 1)`.
    pub explained_variance: Array1<f64>,
}

impl Pca {
    /// Fit `n_components` axes to `data` (one observation per row).
    pub fn fit(data: &Array2<f64>, n_components: usize) -> Self {
        let (n, d) = data.dim();
        let mean = data.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(d));
        let centered = data - &mean;

        let total: f64 = centered.iter().map(|x| x * x).sum();
        let mut components = Array2::zeros((n_components, d));
        let mut explained_variance = Array1::zeros(n_components);
        let mut found: Vec<Array1<f64>> = Vec::with_capacity(n_components);

        for c in 0..n_components {
            let (direction, eigenvalue) = leading_direction(&centered, &found, total, c);
            components.row_mut(c).assign(&direction);
            explained_variance[c] = eigenvalue / (n.saturating_sub(1).max(1)) as f64;
            found.push(direction);
        }

        tracing::trace!(n, d, ?explained_variance, "pca fitted");
        Self {
            mean,
            components,
            explained_variance,
        }
    }

    /// Scores of `data` on the fitted axes: `(data - mean) · componentsᵀ`.
    pub fn transform(&self, data: &Array2<f64>) -> Array2<f64> {
        (data - &self.mean).dot(&self.components.t())
    }
}

/// Fit and transform in one step.
pub fn fit_transform(data: &Array2<f64>, n_components: usize) -> Array2<f64> {
    Pca::fit(data, n_components).transform(data)
}

/// Top remaining eigenvector of `xᵀx` orthogonal to `found`, with its
/// eigenvalue. Returns a zero vector when no meaningful variance is left.
fn leading_direction(
    x: &Array2<f64>,
    found: &[Array1<f64>],
    total: f64,
    seed: usize,
) -> (Array1<f64>, f64) {
    let d = x.ncols();
    let zero = || (Array1::zeros(d), 0.0);
    if total <= 0.0 {
        return zero();
    }

    let mut v = start_vector(d, seed);
    orthogonalize(&mut v, found);
    if !normalize(&mut v) {
        return zero();
    }

    let mut eigenvalue = 0.0;
    for _ in 0..MAX_ITERATIONS {
        let mut next = x.t().dot(&x.dot(&v));
        orthogonalize(&mut next, found);
        eigenvalue = next.dot(&v);
        if eigenvalue <= total * RELATIVE_VARIANCE_FLOOR || !normalize(&mut next) {
            return zero();
        }

        let delta = next
            .iter()
            .zip(v.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        v = next;
        if delta < TOLERANCE {
            break;
        }
    }

    orient(&mut v);
    (v, eigenvalue)
}

/// Remove the projection of `v` onto each (unit or zero) vector in `basis`.
fn orthogonalize(v: &mut Array1<f64>, basis: &[Array1<f64>]) {
    for b in basis {
        let coeff = v.dot(b);
        v.scaled_add(-coeff, b);
    }
}

/// Scale `v` to unit length. Returns `false` if it has no length to scale.
fn normalize(v: &mut Array1<f64>) -> bool {
    let norm = v.dot(v).sqrt();
    if norm <= f64::MIN_POSITIVE || !norm.is_finite() {
        return false;
    }
    *v /= norm;
    true
}

/// Fix the sign ambiguity: the largest-magnitude loading is made positive.
fn orient(v: &mut Array1<f64>) {
    let pivot = v
        .iter()
        .copied()
        .fold(0.0f64, |best, x| if x.abs() > best.abs() { x } else { best });
    if pivot < 0.0 {
        v.mapv_inplace(|x| -x);
    }
}

/// Deterministic pseudo-random start in `[-0.5, 0.5)^d` (splitmix64), so a
/// start orthogonal to the wanted eigenvector is practically impossible and
/// repeated fits of the same data agree exactly.
fn start_vector(d: usize, seed: usize) -> Array1<f64> {
    Array1::from_shape_fn(d, |i| {
        let mut z = (i as u64)
            .wrapping_add((seed as u64).wrapping_mul(0x1000_0000_01b3))
            .wrapping_add(0x9e37_79b9_7f4a_7c15);
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^= z >> 31;
        (z >> 11) as f64 / (1u64 << 53) as f64 - 0.5
    })
}
