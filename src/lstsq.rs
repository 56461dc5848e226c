//! Weighted least-squares re-solve over an arbitrary basis-column subset.
//!
//! Used by [`crate::pruning::PruningPasser`] to re-solve RSS for the
//! surviving columns at each backward-elimination step, and by
//! [`crate::fit`] to compute the final coefficient vector once the pruning
//! pass has selected the best-GCV step.

use nalgebra::{DMatrix, DVector};

/// Solves `min_c Σ wᵢ (yᵢ − (Xc)ᵢ)²` via the weighted normal equations,
/// `(XᵀWX) c = XᵀWy`, scaling rows by `√w` rather than folding weights into
/// the matrix product directly (matching [`crate::orthogonal`]'s weighted
/// inner product discipline).
///
/// Tries a Cholesky factorization of `XᵀWX` first (exact for full column
/// rank) and falls back to an LU factorization for the rank-deficient
/// designs a pruning step restricted to a near-collinear column subset can
/// produce. Returns `None` only if both factorizations fail.
pub fn solve(x: &DMatrix<f64>, y: &DVector<f64>, w: &DVector<f64>) -> Option<(DVector<f64>, f64)> {
    let m = x.nrows();
    let p = x.ncols();
    if p == 0 {
        let rss = y.iter().zip(w.iter()).map(|(yi, wi)| wi * yi * yi).sum();
        return Some((DVector::zeros(0), rss));
    }

    let sqrt_w = DVector::from_iterator(m, w.iter().map(|wi| wi.max(0.0).sqrt()));
    let xw = DMatrix::from_fn(m, p, |r, c| x[(r, c)] * sqrt_w[r]);
    let yw = DVector::from_fn(m, |r, _| y[r] * sqrt_w[r]);

    let xtx = xw.transpose() * &xw;
    let xty = xw.transpose() * &yw;

    let coefficients = match xtx.clone().cholesky() {
        Some(chol) => chol.solve(&xty),
        None => xtx.lu().solve(&xty)?,
    };

    let residual = &yw - &xw * &coefficients;
    let rss = residual.iter().map(|v| v * v).sum();
    Some((coefficients, rss))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exact_linear_fit() {
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0]);
        let y = DVector::from_vec(vec![1.0, 3.0, 5.0, 7.0]);
        let w = DVector::from_element(4, 1.0);
        let (coefficients, rss) = solve(&x, &y, &w).unwrap();
        assert!((coefficients[0] - 1.0).abs() < 1e-9);
        assert!((coefficients[1] - 2.0).abs() < 1e-9);
        assert!(rss < 1e-12);
    }

    #[test]
    fn zero_weight_rows_do_not_influence_fit() {
        let x = DMatrix::from_row_slice(3, 1, &[1.0, 2.0, 100.0]);
        let y = DVector::from_vec(vec![2.0, 4.0, -999.0]);
        let w = DVector::from_vec(vec![1.0, 1.0, 0.0]);
        let (coefficients, _) = solve(&x, &y, &w).unwrap();
        assert!((coefficients[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn empty_column_set_returns_weighted_total_sum_of_squares() {
        let x = DMatrix::<f64>::zeros(3, 0);
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let w = DVector::from_element(3, 1.0);
        let (coefficients, rss) = solve(&x, &y, &w).unwrap();
        assert_eq!(coefficients.len(), 0);
        assert!((rss - 14.0).abs() < 1e-9);
    }
}
