//! `PruningPasser`: backward elimination by GCV.

use std::collections::HashSet;

use nalgebra::DMatrix;

use crate::basis::Basis;
use crate::config::ResolvedConfig;
use crate::data::Dataset;
use crate::lstsq;
use crate::records::{PruningPassRecord, PruningStep};
use crate::stats::{gcv, grsq, rsq};

/// Runs backward elimination over a forward pass's [`Basis`] under a
/// [`ResolvedConfig`], mutating pruned flags and producing a
/// [`PruningPassRecord`].
pub struct PruningPasser<'a> {
    dataset: &'a Dataset,
    config: &'a ResolvedConfig,
}

impl<'a> PruningPasser<'a> {
    pub fn new(dataset: &'a Dataset, config: &'a ResolvedConfig) -> Self {
        Self { dataset, config }
    }

    /// Repeatedly removes the single non-root term whose removal yields the
    /// smallest RSS increase, until only the Constant term survives.
    /// Selects the step with minimum GCV across the whole trace (ties
    /// broken toward fewer terms) and sets `basis`'s pruned flags to match.
    pub fn run(&self, basis: &mut Basis) -> PruningPassRecord {
        let m = self.dataset.m();
        let gcv0 = gcv(self.dataset.rss0(), m, 1.0, self.config.penalty);
        let mut record = PruningPassRecord::default();

        let mut surviving: Vec<usize> = (0..basis.len()).collect();
        let (rss, _) = self.rss_for(basis, &surviving);
        record.push(self.step(rss, surviving.len(), gcv0, None));

        while surviving.len() > 1 {
            let mut best: Option<(usize, f64)> = None;
            for &candidate in surviving.iter() {
                if candidate == 0 {
                    continue; // the Constant term is unprunable
                }
                let trial: Vec<usize> = surviving.iter().copied().filter(|&id| id != candidate).collect();
                let (trial_rss, _) = self.rss_for(basis, &trial);
                let better = match best {
                    None => true,
                    Some((_, best_rss)) => trial_rss < best_rss,
                };
                if better {
                    best = Some((candidate, trial_rss));
                }
            }

            let Some((removed, rss)) = best else { break };
            surviving.retain(|&id| id != removed);
            record.push(self.step(rss, surviving.len(), gcv0, Some(removed)));
        }

        let selected = Self::select_min_gcv(&record);
        record.set_selected(selected);
        self.apply_pruned_flags(basis, &record, selected);

        record
    }

    fn step(&self, rss: f64, k: usize, gcv0: f64, removed: Option<usize>) -> PruningStep {
        let gcv_value = gcv(rss, self.dataset.m(), k as f64, self.config.penalty);
        PruningStep {
            mse: rss / self.dataset.m() as f64,
            gcv: gcv_value,
            rsq: rsq(rss, self.dataset.rss0()),
            grsq: grsq(gcv_value, gcv0),
            removed,
        }
    }

    /// Argmin-GCV over the whole trace. Since steps are recorded in
    /// decreasing term-count order, scanning ascending and updating on `<=`
    /// breaks ties toward the later (fewer-term) step.
    fn select_min_gcv(record: &PruningPassRecord) -> usize {
        let mut selected = 0;
        for i in 1..record.len() {
            if record.get(i).unwrap().gcv <= record.get(selected).unwrap().gcv {
                selected = i;
            }
        }
        selected
    }

    /// Replays the removals up to and including `selected` against the
    /// initial (full) surviving set, then writes pruned flags onto `basis`.
    fn apply_pruned_flags(&self, basis: &mut Basis, record: &PruningPassRecord, selected: usize) {
        let mut surviving: HashSet<usize> = (0..basis.len()).collect();
        for step in record.iter().take(selected + 1) {
            if let Some(removed) = step.removed {
                surviving.remove(&removed);
            }
        }
        for id in 0..basis.len() {
            basis.set_pruned(id, !surviving.contains(&id));
        }
    }

    fn rss_for(&self, basis: &Basis, ids: &[usize]) -> (f64, DMatrix<f64>) {
        let columns: Vec<_> = ids.iter().map(|&id| basis.term(id).evaluate_column(basis, self.dataset.x())).collect();
        let design = if columns.is_empty() {
            DMatrix::zeros(self.dataset.m(), 0)
        } else {
            DMatrix::from_columns(&columns)
        };
        match lstsq::solve(&design, self.dataset.y(), self.dataset.w()) {
            Some((_, rss)) => (rss, design),
            None => (f64::INFINITY, design),
        }
    }
}
