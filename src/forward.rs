//! `ForwardPasser`: the greedy forward pass.

use nalgebra::DVector;

use crate::basis::Basis;
use crate::config::ResolvedConfig;
use crate::data::Dataset;
use crate::knot::{self, CandidateKind, KnotCandidate};
use crate::orthogonal::OrthogonalUpdater;
use crate::records::{ForwardAction, ForwardPassRecord, ForwardStep, StoppingCondition};
use crate::stats::{gcv, grsq, rsq};
use crate::term::BasisFunction;

/// Runs the greedy forward pass over a validated [`Dataset`] under a
/// [`ResolvedConfig`], producing the unpruned [`Basis`] and its
/// [`ForwardPassRecord`].
pub struct ForwardPasser<'a> {
    dataset: &'a Dataset,
    config: &'a ResolvedConfig,
    xlabels: Option<&'a [String]>,
}

impl<'a> ForwardPasser<'a> {
    pub fn new(dataset: &'a Dataset, config: &'a ResolvedConfig, xlabels: Option<&'a [String]>) -> Self {
        Self { dataset, config, xlabels }
    }

    /// Runs the pass to completion: every iteration selects the candidate
    /// triple with maximum RSS reduction across every eligible (parent,
    /// feature) pair, appends it, records the step, and checks the four
    /// stopping conditions.
    pub fn run(&self) -> (Basis, ForwardPassRecord) {
        let n = self.dataset.n();
        let m = self.dataset.m();
        let mut basis = Basis::new(n);
        let mut updater = OrthogonalUpdater::new(self.dataset.y().clone(), self.dataset.w().clone());
        let constant_column = DVector::from_element(m, 1.0);
        updater.try_append(&constant_column);

        let gcv0 = gcv(updater.rss(), m, 1.0, self.config.penalty);
        let mut record = ForwardPassRecord::default();
        record.push(ForwardStep {
            mse: updater.rss() / m as f64,
            gcv: gcv0,
            rsq: 0.0,
            grsq: 0.0,
            action: None,
        });

        let mut prev_rsq = 0.0;
        loop {
            if basis.len() >= self.config.max_terms {
                record.set_stopping_condition(StoppingCondition::MaxTerms);
                break;
            }

            let best = self.best_candidate(&basis, &updater);
            let Some(candidate) = best else {
                let condition = if basis.len() == 1 {
                    StoppingCondition::Degenerate
                } else {
                    StoppingCondition::NoImprovement
                };
                record.set_stopping_condition(condition);
                break;
            };

            let action = self.append_candidate(&mut basis, &mut updater, &candidate);
            let Some(action) = action else {
                record.set_stopping_condition(StoppingCondition::AllCollinear);
                break;
            };

            let rss = updater.rss();
            let k = basis.plen() as f64;
            let gcv_value = gcv(rss, m, k, self.config.penalty);
            let rsq_value = rsq(rss, self.dataset.rss0());
            let grsq_value = grsq(gcv_value, gcv0);
            record.push(ForwardStep {
                mse: rss / m as f64,
                gcv: gcv_value,
                rsq: rsq_value,
                grsq: grsq_value,
                action: Some(action),
            });

            if rsq_value > 1.0 - self.config.thresh {
                record.set_stopping_condition(StoppingCondition::RsqThreshold);
                break;
            }
            if rsq_value - prev_rsq < self.config.thresh {
                record.set_stopping_condition(StoppingCondition::RsqImprovementBelowThresh);
                break;
            }
            prev_rsq = rsq_value;
        }

        (basis, record)
    }

    /// Scans every (parent, feature) pair eligible under `max_degree` and
    /// feature-coverage constraints, returning the
    /// maximal-RSS-reduction candidate with the documented tie-break:
    /// smaller feature index, then smaller parent index, then smaller knot.
    #[cfg(not(feature = "parallel"))]
    fn best_candidate(&self, basis: &Basis, updater: &OrthogonalUpdater) -> Option<KnotCandidate> {
        let n = self.dataset.n();
        let mut best: Option<KnotCandidate> = None;

        for parent in self.eligible_parents(basis) {
            for feature in self.eligible_features(basis, parent, n) {
                let force_linear = self.config.linvars.contains(&feature);
                let Some(candidate) = knot::search(basis, self.dataset, updater, parent, feature, self.config, force_linear) else {
                    continue;
                };
                if Self::is_better(&candidate, best.as_ref()) {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    /// Same scan as the sequential path, fanned out over parents with
    /// `rayon` and reduced with the same [`Self::is_better`] tie-break, so
    /// the winning candidate is identical regardless of feature flag.
    #[cfg(feature = "parallel")]
    fn best_candidate(&self, basis: &Basis, updater: &OrthogonalUpdater) -> Option<KnotCandidate> {
        use rayon::prelude::*;

        let n = self.dataset.n();
        self.eligible_parents(basis)
            .into_par_iter()
            .map(|parent| {
                let mut best: Option<KnotCandidate> = None;
                for feature in self.eligible_features(basis, parent, n) {
                    let force_linear = self.config.linvars.contains(&feature);
                    let Some(candidate) = knot::search(basis, self.dataset, updater, parent, feature, self.config, force_linear) else {
                        continue;
                    };
                    if Self::is_better(&candidate, best.as_ref()) {
                        best = Some(candidate);
                    }
                }
                best
            })
            .reduce(
                || None,
                |a, b| match (a, b) {
                    (Some(a), Some(b)) => Some(if Self::is_better(&b, Some(&a)) { b } else { a }),
                    (Some(a), None) => Some(a),
                    (None, Some(b)) => Some(b),
                    (None, None) => None,
                },
            )
    }

    fn eligible_parents(&self, basis: &Basis) -> Vec<usize> {
        (0..basis.len())
            .filter(|&parent| {
                let term = basis.term(parent);
                !term.is_pruned() && term.degree() < self.config.max_degree
            })
            .collect()
    }

    fn eligible_features(&self, basis: &Basis, parent: usize, n: usize) -> Vec<usize> {
        let covered = basis.term(parent).covered_features(basis);
        (0..n).filter(|feature| !covered.contains(feature)).collect()
    }

    fn is_better(candidate: &KnotCandidate, current: Option<&KnotCandidate>) -> bool {
        let Some(current) = current else { return true };
        if candidate.rss_reduction != current.rss_reduction {
            return candidate.rss_reduction > current.rss_reduction;
        }
        if candidate.feature != current.feature {
            return candidate.feature < current.feature;
        }
        if candidate.parent != current.parent {
            return candidate.parent < current.parent;
        }
        match (candidate.kind, current.kind) {
            (CandidateKind::HingePair { knot: a }, CandidateKind::HingePair { knot: b }) => a < b,
            _ => false,
        }
    }

    /// Commits the winning candidate: recomputes its raw column(s) directly
    /// from `(parent, feature[, knot])` rather than re-reading them back out
    /// of `basis` (which doesn't contain the term yet), appends to the QR
    /// updater, and only then appends the term(s) to `basis`. Returns `None`
    /// only when
    /// every column in the candidate is rejected.
    fn append_candidate(&self, basis: &mut Basis, updater: &mut OrthogonalUpdater, candidate: &KnotCandidate) -> Option<ForwardAction> {
        let parent = candidate.parent;
        let feature = candidate.feature;
        let degree = basis.term(parent).degree() + 1;
        let pcol = basis.term(parent).evaluate_column(basis, self.dataset.x());
        let xcol = self.dataset.column(feature);
        let label = self.xlabels.and_then(|labels| labels.get(feature)).cloned();

        match candidate.kind {
            CandidateKind::Linear => {
                let column = pcol.component_mul(&xcol);
                updater.try_append(&column)?;
                let mut term = BasisFunction::linear(parent, feature, degree);
                if let Some(label) = label {
                    term = term.with_label(label);
                }
                let id = basis.append(term);
                Some(ForwardAction::Linear { parent, feature, id })
            }
            CandidateKind::HingePair { knot } => {
                let plus = knot::hinge_column(&pcol, &xcol, knot, false);
                let minus = knot::hinge_column(&pcol, &xcol, knot, true);
                let plus_ok = updater.try_append(&plus).is_some();
                let minus_ok = updater.try_append(&minus).is_some();
                if !plus_ok && !minus_ok {
                    return None;
                }
                let mut plus_term = BasisFunction::hinge(parent, feature, knot, false, degree);
                let mut minus_term = BasisFunction::hinge(parent, feature, knot, true, degree);
                if let Some(label) = label {
                    plus_term = plus_term.with_label(label.clone());
                    minus_term = minus_term.with_label(label);
                }
                let plus_id = basis.append(plus_term);
                let minus_id = basis.append(minus_term);
                Some(ForwardAction::HingePair {
                    parent,
                    feature,
                    knot,
                    terms: (plus_id, minus_id),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn dataset_univariate_kink(m: usize) -> Dataset {
        let x: Vec<f64> = (0..m).map(|i| i as f64 / (m - 1) as f64).collect();
        let y: Vec<f64> = x.iter().map(|&xi| (xi - 0.5).max(0.0)).collect();
        Dataset::new(DMatrix::from_vec(m, 1, x), DVector::from_vec(y), None).unwrap()
    }

    #[test]
    fn forward_pass_finds_kink_near_half() {
        let dataset = dataset_univariate_kink(200);
        let config = crate::config::FitConfig::default().resolve(1, 200, None).unwrap();
        let passer = ForwardPasser::new(&dataset, &config, None);
        let (basis, record) = passer.run();

        assert!(basis.len() > 1, "forward pass should add at least one term");
        assert!(record.len() > 1);
        let last_rsq = record.iter().last().unwrap().rsq;
        assert!(last_rsq > 0.9, "rsq={last_rsq}");
    }

    #[test]
    fn constant_response_yields_only_constant_term() {
        let m = 50;
        let x: Vec<f64> = (0..m).map(|i| i as f64).collect();
        let y = vec![3.0; m];
        let dataset = Dataset::new(DMatrix::from_vec(m, 1, x), DVector::from_vec(y), None).unwrap();
        let config = crate::config::FitConfig::default().resolve(1, m, None).unwrap();
        let passer = ForwardPasser::new(&dataset, &config, None);
        let (basis, record) = passer.run();

        assert_eq!(basis.len(), 1);
        assert_eq!(record.stopping_condition(), Some(StoppingCondition::Degenerate));
    }

    #[test]
    fn max_terms_stops_the_pass_exactly_at_the_cap() {
        let m = 300;
        let x: Vec<f64> = (0..m).flat_map(|i| vec![(i % 17) as f64, (i % 23) as f64]).collect();
        let x = DMatrix::from_row_slice(m, 2, &x);
        let y: Vec<f64> = (0..m)
            .map(|i| (x[(i, 0)] - 5.0).max(0.0) * (x[(i, 1)] - 8.0).max(0.0))
            .collect();
        let dataset = Dataset::new(x, DVector::from_vec(y), None).unwrap();
        let config = crate::config::FitConfig {
            max_terms: Some(4),
            max_degree: 2,
            ..crate::config::FitConfig::default()
        }
        .resolve(2, m, None)
        .unwrap();
        let passer = ForwardPasser::new(&dataset, &config, None);
        let (basis, record) = passer.run();

        assert_eq!(basis.len(), 4);
        assert_eq!(record.stopping_condition(), Some(StoppingCondition::MaxTerms));
    }

    #[test]
    fn linvars_restricts_feature_to_linear_entry() {
        let dataset = dataset_univariate_kink(200);
        let config = crate::config::FitConfig {
            linvars: vec![0usize.into()],
            ..crate::config::FitConfig::default()
        }
        .resolve(1, 200, None)
        .unwrap();
        let passer = ForwardPasser::new(&dataset, &config, None);
        let (basis, _) = passer.run();

        for term in basis.iter() {
            assert!(!matches!(term, BasisFunction::Hinge(_)), "linvars feature must not gain a hinge term");
        }
    }
}
