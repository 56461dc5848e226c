//! `KnotSearch`: best-knot selection for a single (parent, feature)
//! candidate pair.
//!
//! The sufficient-statistics sweep over each candidate knot is expressed
//! here in terms of
//! [`crate::orthogonal::OrthogonalUpdater::rss_reduction_for`], which
//! Gram-Schmidt-orthogonalizes a candidate pair against the current `Q` in
//! one non-mutating pass. Candidate knots are still streamed in decreasing
//! order of `X[·,f]`; what's simplified relative to Friedman's incremental
//! update is that each candidate's projection is recomputed rather than
//! carried forward via running correlation sums. See `DESIGN.md` for the
//! tradeoff.

use nalgebra::DVector;

use crate::basis::Basis;
use crate::config::ResolvedConfig;
use crate::data::Dataset;
use crate::orthogonal::OrthogonalUpdater;
use crate::stats::gcv;

/// The alternative selected for one (parent, feature) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CandidateKind {
    /// A mirror pair of hinge terms sharing `knot`.
    HingePair { knot: f64 },
    /// The knotless fast-path alternative
    Linear,
}

/// The best alternative found for a (parent, feature) pair, together with
/// the RSS reduction and resulting GCV it would yield if appended.
#[derive(Debug, Clone, Copy)]
pub struct KnotCandidate {
    pub parent: usize,
    pub feature: usize,
    pub kind: CandidateKind,
    pub rss_reduction: f64,
    pub gcv: f64,
}

/// Searches `(parent, feature)` for the best knot (or, when eligible, the
/// knotless linear alternative), scored by weighted RSS reduction.
///
/// `force_linear` is set when `feature` is in `config.linvars`: only the
/// knotless alternative is considered, regardless of `config.allow_linear`.
/// Returns `None` when no alternative improves RSS.
pub fn search(
    basis: &Basis,
    dataset: &Dataset,
    updater: &OrthogonalUpdater,
    parent: usize,
    feature: usize,
    config: &ResolvedConfig,
    force_linear: bool,
) -> Option<KnotCandidate> {
    let m = dataset.m();
    let parent_term = basis.term(parent);
    let pcol = parent_term.evaluate_column(basis, dataset.x());
    let xcol = dataset.column(feature);
    let current_rss = updater.rss();
    let base_k = basis.plen() as f64;

    if force_linear {
        return linear_candidate(updater, parent, feature, config, &pcol, &xcol, current_rss, m, base_k);
    }

    let active: Vec<usize> = (0..m).filter(|&i| pcol[i] != 0.0).collect();
    let hinge_candidate = if active.is_empty() {
        None
    } else {
        best_hinge(basis, dataset, updater, parent, feature, config, &pcol, &xcol, &active, base_k)
    };

    if !config.allow_linear {
        return hinge_candidate;
    }

    let linear = linear_candidate(updater, parent, feature, config, &pcol, &xcol, current_rss, m, base_k);
    match (hinge_candidate, linear) {
        (Some(h), Some(l)) => Some(if l.gcv <= h.gcv { l } else { h }),
        (Some(h), None) => Some(h),
        (None, Some(l)) => Some(l),
        (None, None) => None,
    }
}

#[allow(clippy::too_many_arguments)]
fn linear_candidate(
    updater: &OrthogonalUpdater,
    parent: usize,
    feature: usize,
    config: &ResolvedConfig,
    pcol: &DVector<f64>,
    xcol: &DVector<f64>,
    current_rss: f64,
    m: usize,
    base_k: f64,
) -> Option<KnotCandidate> {
    let column = pcol.component_mul(xcol);
    let reduction = updater.rss_reduction_for(std::slice::from_ref(&column));
    if reduction <= 0.0 {
        return None;
    }
    let new_rss = (current_rss - reduction).max(0.0);
    Some(KnotCandidate {
        parent,
        feature,
        kind: CandidateKind::Linear,
        rss_reduction: reduction,
        gcv: gcv(new_rss, m, base_k + 1.0, config.penalty),
    })
}

#[allow(clippy::too_many_arguments)]
fn best_hinge(
    basis: &Basis,
    dataset: &Dataset,
    updater: &OrthogonalUpdater,
    parent: usize,
    feature: usize,
    config: &ResolvedConfig,
    pcol: &DVector<f64>,
    xcol: &DVector<f64>,
    active: &[usize],
    base_k: f64,
) -> Option<KnotCandidate> {
    let mut sorted = active.to_vec();
    sorted.sort_by(|&a, &b| xcol[a].partial_cmp(&xcol[b]).expect("non-finite x rejected at Dataset::new"));

    let mut distinct_values: Vec<f64> = Vec::new();
    let mut distinct_row_position: Vec<usize> = Vec::new();
    let mut distinct_row_index: Vec<usize> = Vec::new();
    for (position, &row) in sorted.iter().enumerate() {
        let value = xcol[row];
        if distinct_values.last().is_none_or(|&last| last != value) {
            distinct_values.push(value);
            distinct_row_position.push(position);
            distinct_row_index.push(row);
        }
    }
    let num_distinct = distinct_values.len();
    let endspan = config.endspan;
    if num_distinct <= 2 * endspan {
        return None;
    }

    let n = basis.num_variables();
    let minspan = config.minspan_for(n, active.len());

    let mut eligible: Vec<usize> = Vec::new();
    let mut last_accepted_position: Option<usize> = None;
    for idx in endspan..(num_distinct - endspan) {
        let position = distinct_row_position[idx];
        let gap_ok = last_accepted_position.is_none_or(|last| position.saturating_sub(last) >= minspan);
        if gap_ok {
            eligible.push(idx);
            last_accepted_position = Some(position);
        }
    }

    let check_every = config.check_every.max(1);
    let strided: Vec<usize> = eligible.into_iter().step_by(check_every).collect();
    if strided.is_empty() {
        return None;
    }

    let mut best: Option<(f64, f64, usize)> = None; // (rss_reduction, knot, row_index), swept decreasing
    for &idx in strided.iter().rev() {
        let knot = distinct_values[idx];
        let row_index = distinct_row_index[idx];
        let plus = hinge_column(pcol, xcol, knot, false);
        let minus = hinge_column(pcol, xcol, knot, true);
        let reduction = updater.rss_reduction_for(&[plus, minus]);
        if reduction <= 0.0 {
            continue;
        }
        let better = match best {
            None => true,
            Some((best_reduction, best_knot, best_row)) => {
                reduction > best_reduction
                    || (reduction == best_reduction && knot < best_knot)
                    || (reduction == best_reduction && knot == best_knot && row_index < best_row)
            }
        };
        if better {
            best = Some((reduction, knot, row_index));
        }
    }

    let (reduction, knot, _) = best?;
    let new_rss = (updater.rss() - reduction).max(0.0);
    Some(KnotCandidate {
        parent,
        feature,
        kind: CandidateKind::HingePair { knot },
        rss_reduction: reduction,
        gcv: gcv(new_rss, dataset.m(), base_k + 2.0, config.penalty),
    })
}

/// `parent(x) · max(0, s·(x[feature] − knot))`, `s = -1` iff `reverse`.
pub(crate) fn hinge_column(pcol: &DVector<f64>, xcol: &DVector<f64>, knot: f64, reverse: bool) -> DVector<f64> {
    DVector::from_iterator(
        xcol.len(),
        xcol.iter().zip(pcol.iter()).map(|(&x, &p)| {
            let diff = if reverse { knot - x } else { x - knot };
            p * diff.max(0.0)
        }),
    )
}
