//! `OrthogonalUpdater`: incremental weighted QR maintenance of the design
//! matrix during the forward pass

use nalgebra::DVector;

/// Relative collinearity threshold below which a candidate column is
/// rejected rather than appended.
pub const COLLINEARITY_THRESHOLD: f64 = 1e-10;

/// Maintains a thin QR factorization of the design matrix under the
/// weighted inner product `⟨u,v⟩ = Σ wᵢ uᵢ vᵢ`, via two-pass modified
/// Gram-Schmidt.
///
/// Columns are never removed during the forward pass:
/// pruning is a logical flag applied afterward and drives a full re-solve
/// by [`crate::lstsq`], not a downdate here.
#[derive(Debug, Clone)]
pub struct OrthogonalUpdater {
    w: DVector<f64>,
    y: DVector<f64>,
    /// Weighted-orthonormal columns, in append order.
    q: Vec<DVector<f64>>,
    /// `⟨q_j, y⟩` cached at append time.
    proj_y: Vec<f64>,
    /// `⟨y, y⟩`, fixed at construction.
    total_y_sq: f64,
}

impl OrthogonalUpdater {
    pub fn new(y: DVector<f64>, w: DVector<f64>) -> Self {
        let total_y_sq = weighted_inner(&w, &y, &y);
        Self {
            w,
            y,
            q: Vec::new(),
            proj_y: Vec::new(),
            total_y_sq,
        }
    }

    pub fn weighted_inner(&self, a: &DVector<f64>, b: &DVector<f64>) -> f64 {
        weighted_inner(&self.w, a, b)
    }

    /// Number of columns currently in the orthonormal basis.
    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    pub fn q_columns(&self) -> &[DVector<f64>] {
        &self.q
    }

    /// Current weighted residual sum of squares, `‖y‖²_w − Σⱼ ⟨qⱼ,y⟩²`.
    pub fn rss(&self) -> f64 {
        (self.total_y_sq - self.proj_y.iter().map(|p| p * p).sum::<f64>()).max(0.0)
    }

    /// Orthogonalizes `candidate` against every current `Q` column via
    /// two-pass modified Gram-Schmidt, without mutating state. Returns the
    /// residual vector and its weighted norm.
    fn residual_against_basis(&self, candidate: &DVector<f64>) -> (DVector<f64>, f64) {
        let mut r = candidate.clone();
        for _ in 0..2 {
            for q in &self.q {
                let coeff = self.weighted_inner(q, &r);
                r -= q * coeff;
            }
        }
        let norm = self.weighted_inner(&r, &r).max(0.0).sqrt();
        (r, norm)
    }

    /// Attempts to append `candidate` as a new orthonormal column.
    ///
    /// Returns `None` (rejecting the candidate as collinear) without
    /// mutating state when its residual norm against the current basis is
    /// too small relative to its own norm.
    pub fn try_append(&mut self, candidate: &DVector<f64>) -> Option<usize> {
        let original_norm = self.weighted_inner(candidate, candidate).max(0.0).sqrt();
        if original_norm <= 0.0 {
            return None;
        }
        let (residual, norm) = self.residual_against_basis(candidate);
        if norm < COLLINEARITY_THRESHOLD * original_norm {
            return None;
        }
        let q_new = residual / norm;
        let proj = self.weighted_inner(&q_new, &self.y);
        self.q.push(q_new);
        self.proj_y.push(proj);
        Some(self.q.len() - 1)
    }

    /// Evaluates the weighted RSS reduction achievable by appending
    /// `columns` in sequence (each orthogonalized against `Q` and any
    /// already-accepted column from this same call), without mutating
    /// state. Columns that would be rejected as collinear contribute 0.
    ///
    /// This is the non-mutating scoring primitive knot search uses to
    /// compare candidates before the winner is
    /// committed via repeated [`OrthogonalUpdater::try_append`] calls.
    pub fn rss_reduction_for(&self, columns: &[DVector<f64>]) -> f64 {
        let mut accepted: Vec<DVector<f64>> = Vec::with_capacity(columns.len());
        let mut reduction = 0.0;
        for candidate in columns {
            let original_norm = self.weighted_inner(candidate, candidate).max(0.0).sqrt();
            if original_norm <= 0.0 {
                continue;
            }
            let mut r = candidate.clone();
            for _ in 0..2 {
                for q in &self.q {
                    let coeff = self.weighted_inner(q, &r);
                    r -= q * coeff;
                }
                for q in &accepted {
                    let coeff = self.weighted_inner(q, &r);
                    r -= q * coeff;
                }
            }
            let norm = self.weighted_inner(&r, &r).max(0.0).sqrt();
            if norm < COLLINEARITY_THRESHOLD * original_norm {
                continue;
            }
            let q_new = r / norm;
            let proj = self.weighted_inner(&q_new, &self.y);
            reduction += proj * proj;
            accepted.push(q_new);
        }
        reduction
    }
}

fn weighted_inner(w: &DVector<f64>, a: &DVector<f64>, b: &DVector<f64>) -> f64 {
    w.iter().zip(a.iter()).zip(b.iter()).map(|((wi, ai), bi)| wi * ai * bi).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rss_decreases_monotonically_as_columns_are_appended() {
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        let w = DVector::from_element(4, 1.0);
        let mut updater = OrthogonalUpdater::new(y, w);
        let rss0 = updater.rss();

        let column = DVector::from_vec(vec![1.0, 1.0, 1.0, 1.0]);
        updater.try_append(&column).expect("constant column accepted");
        let rss1 = updater.rss();
        assert!(rss1 <= rss0);

        let column2 = DVector::from_vec(vec![0.0, 1.0, 2.0, 3.0]);
        updater.try_append(&column2).expect("linear column accepted");
        let rss2 = updater.rss();
        assert!(rss2 <= rss1);
        assert!(rss2 < 1e-9, "perfect linear fit should drive RSS to ~0, got {rss2}");
    }

    #[test]
    fn collinear_column_is_rejected() {
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        let w = DVector::from_element(4, 1.0);
        let mut updater = OrthogonalUpdater::new(y, w);
        let column = DVector::from_vec(vec![1.0, 1.0, 1.0, 1.0]);
        updater.try_append(&column).unwrap();

        let duplicate = DVector::from_vec(vec![2.0, 2.0, 2.0, 2.0]);
        assert!(updater.try_append(&duplicate).is_none());
        assert_eq!(updater.len(), 1);
    }

    #[test]
    fn rss_reduction_for_matches_committed_append() {
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        let w = DVector::from_element(4, 1.0);
        let updater = OrthogonalUpdater::new(y, w);
        let column = DVector::from_vec(vec![1.0, 1.0, 1.0, 1.0]);
        let predicted = updater.rss_reduction_for(&[column.clone()]);

        let mut mutated = updater.clone();
        let rss_before = mutated.rss();
        mutated.try_append(&column).unwrap();
        let rss_after = mutated.rss();
        assert!((predicted - (rss_before - rss_after)).abs() < 1e-9);
    }
}
