//! `BasisFunction`: the Constant/Linear/Hinge term algebra.

use std::collections::BTreeSet;

use nalgebra::{DMatrix, DVector};

use crate::basis::Basis;

/// A linear factor `parent(x) · x[feature]`, with no knot.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearTerm {
    pub parent: usize,
    pub feature: usize,
    pub degree: usize,
    pub pruned: bool,
    pub label: Option<String>,
}

/// A hinge factor `parent(x) · max(0, s·(x[feature] − knot))`.
#[derive(Debug, Clone, PartialEq)]
pub struct HingeTerm {
    pub parent: usize,
    pub feature: usize,
    pub knot: f64,
    /// `true` encodes `s = -1` (left hinge, `max(0, knot - x)`); `false` encodes `s = +1`.
    pub reverse: bool,
    pub degree: usize,
    pub pruned: bool,
    pub label: Option<String>,
}

/// A node in the directed forest rooted at the Constant term
///
/// Parents are referenced by index into the owning [`Basis`], never by
/// ownership — evaluation and traversal always take the `Basis` as context.
#[derive(Debug, Clone, PartialEq)]
pub enum BasisFunction {
    /// The unique, unprunable root. Evaluates to 1 everywhere.
    Constant,
    Linear(LinearTerm),
    Hinge(HingeTerm),
}

impl BasisFunction {
    /// Builds the Linear term `parent(x) · x[feature]`.
    pub fn linear(parent: usize, feature: usize, degree: usize) -> Self {
        BasisFunction::Linear(LinearTerm {
            parent,
            feature,
            degree,
            pruned: false,
            label: None,
        })
    }

    /// Builds the Hinge term `parent(x) · max(0, s·(x[feature] − knot))`.
    pub fn hinge(parent: usize, feature: usize, knot: f64, reverse: bool, degree: usize) -> Self {
        BasisFunction::Hinge(HingeTerm {
            parent,
            feature,
            knot,
            reverse,
            degree,
            pruned: false,
            label: None,
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        let label = Some(label.into());
        match &mut self {
            BasisFunction::Constant => {}
            BasisFunction::Linear(t) => t.label = label,
            BasisFunction::Hinge(t) => t.label = label,
        }
        self
    }

    pub fn degree(&self) -> usize {
        match self {
            BasisFunction::Constant => 0,
            BasisFunction::Linear(t) => t.degree,
            BasisFunction::Hinge(t) => t.degree,
        }
    }

    pub fn parent(&self) -> Option<usize> {
        match self {
            BasisFunction::Constant => None,
            BasisFunction::Linear(t) => Some(t.parent),
            BasisFunction::Hinge(t) => Some(t.parent),
        }
    }

    pub fn feature(&self) -> Option<usize> {
        match self {
            BasisFunction::Constant => None,
            BasisFunction::Linear(t) => Some(t.feature),
            BasisFunction::Hinge(t) => Some(t.feature),
        }
    }

    pub fn knot(&self) -> Option<f64> {
        match self {
            BasisFunction::Hinge(t) => Some(t.knot),
            _ => None,
        }
    }

    pub fn reverse(&self) -> Option<bool> {
        match self {
            BasisFunction::Hinge(t) => Some(t.reverse),
            _ => None,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            BasisFunction::Constant => None,
            BasisFunction::Linear(t) => t.label.as_deref(),
            BasisFunction::Hinge(t) => t.label.as_deref(),
        }
    }

    pub fn is_pruned(&self) -> bool {
        match self {
            BasisFunction::Constant => false,
            BasisFunction::Linear(t) => t.pruned,
            BasisFunction::Hinge(t) => t.pruned,
        }
    }

    /// Sets the pruned flag. A no-op on the Constant term, which is
    /// unprunable.
    pub fn set_pruned(&mut self, pruned: bool) {
        match self {
            BasisFunction::Constant => {}
            BasisFunction::Linear(t) => t.pruned = pruned,
            BasisFunction::Hinge(t) => t.pruned = pruned,
        }
    }

    /// Returns the opposite-orientation twin of a Hinge term, sharing
    /// `(parent, feature, knot)`. `None` for Constant/Linear.
    pub fn mirror(&self) -> Option<BasisFunction> {
        match self {
            BasisFunction::Hinge(t) => Some(BasisFunction::Hinge(HingeTerm {
                reverse: !t.reverse,
                pruned: false,
                ..t.clone()
            })),
            _ => None,
        }
    }

    /// Feature indices along the root-to-`self` path
    pub fn covered_features(&self, basis: &Basis) -> BTreeSet<usize> {
        let mut covered = match self.parent() {
            Some(parent) => basis.term(parent).covered_features(basis),
            None => BTreeSet::new(),
        };
        if let Some(feature) = self.feature() {
            covered.insert(feature);
        }
        covered
    }

    /// Evaluates this term at a single sample row, recursing along the
    /// parent chain. Short-circuits as soon as an ancestor evaluates to 0.
    pub fn evaluate(&self, basis: &Basis, x_row: &[f64]) -> f64 {
        match self {
            BasisFunction::Constant => 1.0,
            BasisFunction::Linear(t) => {
                let parent = basis.term(t.parent).evaluate(basis, x_row);
                if parent == 0.0 {
                    return 0.0;
                }
                parent * x_row[t.feature]
            }
            BasisFunction::Hinge(t) => {
                let parent = basis.term(t.parent).evaluate(basis, x_row);
                if parent == 0.0 {
                    return 0.0;
                }
                parent * hinge_value(x_row[t.feature], t.knot, t.reverse)
            }
        }
    }

    /// Batch evaluation over every sample row of `X`.
    pub fn evaluate_column(&self, basis: &Basis, x: &DMatrix<f64>) -> DVector<f64> {
        match self {
            BasisFunction::Constant => DVector::from_element(x.nrows(), 1.0),
            BasisFunction::Linear(t) => {
                let parent = basis.term(t.parent).evaluate_column(basis, x);
                parent.component_mul(&x.column(t.feature))
            }
            BasisFunction::Hinge(t) => {
                let parent = basis.term(t.parent).evaluate_column(basis, x);
                let feature = x.column(t.feature);
                DVector::from_iterator(
                    x.nrows(),
                    feature
                        .iter()
                        .zip(parent.iter())
                        .map(|(&xf, &p)| p * hinge_value(xf, t.knot, t.reverse)),
                )
            }
        }
    }
}

#[inline]
fn hinge_value(x: f64, knot: f64, reverse: bool) -> f64 {
    let diff = if reverse { knot - x } else { x - knot };
    diff.max(0.0)
}
