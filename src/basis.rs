//! `Basis`: the ordered, append-only collection of basis-function terms.

use nalgebra::{DMatrix, DVector};

use crate::term::BasisFunction;

/// Ordered sequence of [`BasisFunction`] terms evaluated against a fixed
/// number of variables.
///
/// Index 0 is always the Constant term. Appends are positional: a term's
/// index is its identity for downstream coefficient alignment, and is
/// never reused even after pruning (pruning only flips a flag).
#[derive(Debug, Clone)]
pub struct Basis {
    terms: Vec<BasisFunction>,
    num_variables: usize,
}

impl Basis {
    /// Constructs a basis seeded with the Constant term for `num_variables` features.
    pub fn new(num_variables: usize) -> Self {
        Self {
            terms: vec![BasisFunction::Constant],
            num_variables,
        }
    }

    /// Appends a term, returning its positional id.
    ///
    /// Debug-asserts the structural invariants that are
    /// local to this single append: the parent exists and precedes the
    /// new term, and is not itself pruned. Degree and feature-coverage
    /// limits are enforced by the caller ([`crate::forward::ForwardPasser`]),
    /// which alone knows `max_degree` and is generating the candidate.
    pub fn append(&mut self, term: BasisFunction) -> usize {
        if let Some(parent) = term.parent() {
            debug_assert!(parent < self.terms.len(), "parent must already exist in the basis");
            debug_assert!(!self.terms[parent].is_pruned(), "parent must not be pruned at construction");
        }
        let id = self.terms.len();
        self.terms.push(term);
        id
    }

    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    /// Total number of terms, pruned or not.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Number of unpruned terms — the width of [`Basis::transform`]'s output.
    pub fn plen(&self) -> usize {
        self.terms.iter().filter(|t| !t.is_pruned()).count()
    }

    /// Unpruned terms in insertion order, paired with their positional id.
    pub fn piter(&self) -> impl Iterator<Item = (usize, &BasisFunction)> {
        self.terms.iter().enumerate().filter(|(_, t)| !t.is_pruned())
    }

    /// All terms, pruned or not, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &BasisFunction> {
        self.terms.iter()
    }

    pub fn term(&self, index: usize) -> &BasisFunction {
        &self.terms[index]
    }

    pub fn set_pruned(&mut self, index: usize, pruned: bool) {
        self.terms[index].set_pruned(pruned);
    }

    /// Resets every pruned flag, recovering the forward pass's raw basis
    ///
    pub fn unprune_all(&mut self) {
        for term in &mut self.terms {
            term.set_pruned(false);
        }
    }

    /// Fills an `m × plen()` matrix: column `j` is the evaluation of the
    /// `j`-th unpruned term over every row of `X`. Deterministic in the
    /// insertion order of the unpruned terms.
    pub fn transform(&self, x: &DMatrix<f64>) -> DMatrix<f64> {
        let columns: Vec<DVector<f64>> = self.piter().map(|(_, term)| term.evaluate_column(self, x)).collect();
        if columns.is_empty() {
            return DMatrix::zeros(x.nrows(), 0);
        }
        DMatrix::from_columns(&columns)
    }
}
