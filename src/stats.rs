//! GCV/RSQ/GRSQ formulas shared by the forward and pruning passes.

/// Generalized cross-validation score for a model with `k` effective
/// (unpruned) basis functions and weighted residual sum of squares `rss`.
///
/// Returns `+inf` when `1 − (k + penalty·(k−1)/2)/m` is non-positive, so
/// such models are never selected by pruning.
pub fn gcv(rss: f64, m: usize, k: f64, penalty: f64) -> f64 {
    let m = m as f64;
    let denom = 1.0 - (k + penalty * (k - 1.0) / 2.0) / m;
    if denom > 0.0 {
        (rss / m) / (denom * denom)
    } else {
        f64::INFINITY
    }
}

/// `1 − rss / rss0`. A zero-variance response (`rss0 == 0`) reads as `0`
/// rather than `NaN`.
pub fn rsq(rss: f64, rss0: f64) -> f64 {
    if rss0 > 0.0 {
        1.0 - rss / rss0
    } else {
        0.0
    }
}

/// `1 − gcv / gcv0`, guarded the same way as [`rsq`].
pub fn grsq(gcv_value: f64, gcv0: f64) -> f64 {
    if gcv0.is_finite() && gcv0 > 0.0 {
        1.0 - gcv_value / gcv0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gcv_is_infinite_when_denominator_nonpositive() {
        assert_eq!(gcv(1.0, 10, 9.0, 3.0), f64::INFINITY);
    }

    #[test]
    fn gcv_matches_hand_computation() {
        let g = gcv(2.0, 100, 5.0, 3.0);
        let denom = 1.0 - (5.0 + 3.0 * 4.0 / 2.0) / 100.0;
        let expected = (2.0 / 100.0) / (denom * denom);
        assert!((g - expected).abs() < 1e-12);
    }

    #[test]
    fn rsq_handles_zero_variance_response() {
        assert_eq!(rsq(0.0, 0.0), 0.0);
    }

    #[test]
    fn grsq_handles_infinite_gcv0() {
        assert_eq!(grsq(1.0, f64::INFINITY), 0.0);
    }
}
