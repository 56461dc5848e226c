//! Validated sample domain: the dense predictor matrix, response, and weights.

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, InvalidInput};

/// A validated `(X, y, w)` triple, ready for the forward pass.
///
/// Construction via [`Dataset::new`] performs every `InvalidInput` check
/// before any other component observes the data.
#[derive(Debug, Clone)]
pub struct Dataset {
    x: DMatrix<f64>,
    y: DVector<f64>,
    w: DVector<f64>,
    /// Weighted total sum of squares about the weighted mean of `y`.
    rss0: f64,
}

impl Dataset {
    /// Validates and wraps `(X, y, w)`. `w` defaults to all-ones when `None`.
    pub fn new(x: DMatrix<f64>, y: DVector<f64>, w: Option<DVector<f64>>) -> Result<Self, Error> {
        let m = x.nrows();
        let n = x.ncols();

        if m == 0 || n == 0 {
            return Err(InvalidInput::EmptyMatrix { m, n }.into());
        }
        if y.len() != m {
            return Err(InvalidInput::ShapeMismatchY { m_x: m, m_y: y.len() }.into());
        }
        let w = w.unwrap_or_else(|| DVector::from_element(m, 1.0));
        if w.len() != m {
            return Err(InvalidInput::ShapeMismatchW { m_x: m, m_w: w.len() }.into());
        }

        for row in 0..m {
            for col in 0..n {
                let value = x[(row, col)];
                if !value.is_finite() {
                    return Err(InvalidInput::NonFiniteX { row, col }.into());
                }
            }
        }
        for row in 0..m {
            if !y[row].is_finite() {
                return Err(InvalidInput::NonFiniteY { row }.into());
            }
            let weight = w[row];
            if !weight.is_finite() {
                return Err(InvalidInput::NonFiniteW { row }.into());
            }
            if weight < 0.0 {
                return Err(InvalidInput::NegativeWeight { row, value: weight }.into());
            }
        }

        let total_weight = w.sum();
        let mean = if total_weight > 0.0 {
            w.dot(&y) / total_weight
        } else {
            0.0
        };
        let rss0 = y
            .iter()
            .zip(w.iter())
            .map(|(yi, wi)| wi * (yi - mean) * (yi - mean))
            .sum();

        Ok(Self { x, y, w, rss0 })
    }

    pub fn m(&self) -> usize {
        self.x.nrows()
    }

    pub fn n(&self) -> usize {
        self.x.ncols()
    }

    pub fn x(&self) -> &DMatrix<f64> {
        &self.x
    }

    pub fn y(&self) -> &DVector<f64> {
        &self.y
    }

    pub fn w(&self) -> &DVector<f64> {
        &self.w
    }

    /// `Σ wᵢ (yᵢ − ȳ)²`, the weighted total sum of squares used as `RSS0`
    /// for `RSQ = 1 − RSS / RSS0`
    pub fn rss0(&self) -> f64 {
        self.rss0
    }

    /// Column `f` of `X` as an owned vector, used by knot search.
    pub fn column(&self, f: usize) -> DVector<f64> {
        self.x.column(f).clone_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: &[[f64; 2]]) -> DMatrix<f64> {
        DMatrix::from_row_slice(rows.len(), 2, &rows.concat())
    }

    #[test]
    fn rejects_shape_mismatch() {
        let x = matrix(&[[0.0, 1.0], [1.0, 2.0]]);
        let y = DVector::from_vec(vec![1.0]);
        assert!(matches!(
            Dataset::new(x, y, None),
            Err(Error::InvalidInput(InvalidInput::ShapeMismatchY { .. }))
        ));
    }

    #[test]
    fn rejects_negative_weight() {
        let x = matrix(&[[0.0, 1.0], [1.0, 2.0]]);
        let y = DVector::from_vec(vec![1.0, 2.0]);
        let w = DVector::from_vec(vec![1.0, -1.0]);
        assert!(matches!(
            Dataset::new(x, y, Some(w)),
            Err(Error::InvalidInput(InvalidInput::NegativeWeight { .. }))
        ));
    }

    #[test]
    fn rejects_non_finite_x() {
        let x = matrix(&[[0.0, f64::NAN], [1.0, 2.0]]);
        let y = DVector::from_vec(vec![1.0, 2.0]);
        assert!(matches!(
            Dataset::new(x, y, None),
            Err(Error::InvalidInput(InvalidInput::NonFiniteX { .. }))
        ));
    }

    #[test]
    fn defaults_weights_to_ones() {
        let x = matrix(&[[0.0, 1.0], [1.0, 2.0]]);
        let y = DVector::from_vec(vec![1.0, 2.0]);
        let dataset = Dataset::new(x, y, None).unwrap();
        assert_eq!(dataset.w(), &DVector::from_element(2, 1.0));
    }

    #[test]
    fn rss0_is_weighted_variance_about_weighted_mean() {
        let x = matrix(&[[0.0, 1.0], [1.0, 2.0], [2.0, 3.0]]);
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let dataset = Dataset::new(x, y, None).unwrap();
        assert!((dataset.rss0() - 2.0).abs() < 1e-9);
    }
}
