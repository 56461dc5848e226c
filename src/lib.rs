//! Multivariate adaptive regression splines (MARS): forward pass, pruning
//! pass, and the shared basis-function algebra (Friedman 1991).
//!
//! ## Pipeline
//!
//! 1. **Forward pass** — [`ForwardPasser`] greedily grows an additive basis
//!    of hinge/linear terms via knot search, maintaining an incremental
//!    weighted QR factorization ([`OrthogonalUpdater`]) for fast residual
//!    scoring.
//! 2. **Pruning pass** — [`PruningPasser`] backward-eliminates terms by
//!    GCV, selecting the step with minimum GCV over the whole trace.
//! 3. **Final fit** — [`lstsq`] re-solves coefficients over the pruned
//!    basis's surviving columns.
//!
//! ## Core Types
//!
//! - [`Basis`] / [`BasisFunction`] — the term algebra
//! - [`ForwardPasser`] / [`ForwardPassRecord`] — greedy basis construction
//! - [`PruningPasser`] / [`PruningPassRecord`] — backward elimination by GCV
//! - [`FitConfig`] / [`ResolvedConfig`] — options and their derivations
//! - [`Dataset`] — validated `(X, y, w)` sample domain
//!
//! This crate implements only the fitting core. The estimator facade
//! (predict/score/transform wrappers, tabular-input coercion, serialization,
//! summary formatting, code generation for scoring) is an external
//! collaborator; its only contract with this crate is [`fit`].

mod basis;
mod config;
mod data;
mod error;
mod forward;
mod knot;
mod lstsq;
mod orthogonal;
mod pruning;
mod records;
mod stats;
mod term;

pub use basis::Basis;
pub use config::{FeatureRef, FitConfig, ResolvedConfig};
pub use data::Dataset;
pub use error::{Error, InvalidConfig, InvalidInput};
pub use forward::ForwardPasser;
pub use orthogonal::OrthogonalUpdater;
pub use pruning::PruningPasser;
pub use records::{ForwardAction, ForwardPassRecord, ForwardStep, PruningPassRecord, PruningStep, StoppingCondition};
pub use term::{BasisFunction, HingeTerm, LinearTerm};

use nalgebra::{DMatrix, DVector};

/// The output of [`fit`]: the pruned basis, both pass records, and the
/// final weighted least-squares coefficient vector over the unpruned columns.
#[derive(Debug, Clone)]
pub struct FitResult {
    pub basis: Basis,
    pub forward_record: ForwardPassRecord,
    pub pruning_record: PruningPassRecord,
    pub coefficients: DVector<f64>,
}

/// Fits a MARS model to `(x, y, w)` under `config`
///
/// `w` defaults to all-ones when `None`. `xlabels`, if given, resolves
/// string `linvars` entries and is carried onto basis-function labels for
/// presentation; it plays no role in the fitting math.
///
/// This function contains no model-selection logic of its own: it validates
/// `(x, y, w)` via [`Dataset::new`], validates and derives `config` via
/// [`FitConfig::resolve`], runs [`ForwardPasser::run`], runs
/// [`PruningPasser::run`] over the resulting basis, and re-solves final
/// coefficients via [`lstsq::solve`] over the pruned basis's surviving
/// columns.
pub fn fit(
    x: DMatrix<f64>,
    y: DVector<f64>,
    w: Option<DVector<f64>>,
    config: FitConfig,
    xlabels: Option<Vec<String>>,
) -> Result<FitResult, Error> {
    let dataset = Dataset::new(x, y, w)?;
    let resolved = config.resolve(dataset.n(), dataset.m(), xlabels.as_deref())?;

    log::info!("{:<32}{:<32}", "forward pass", format!("m={} n={}", dataset.m(), dataset.n()));
    let forward = ForwardPasser::new(&dataset, &resolved, xlabels.as_deref());
    let (mut basis, forward_record) = forward.run();
    log::info!(
        "{:<32}{:<32}",
        "forward pass complete",
        format!("terms={} stop={:?}", basis.len(), forward_record.stopping_condition())
    );

    log::info!("{:<32}{:<32}", "pruning pass", format!("terms={}", basis.len()));
    let pruning = PruningPasser::new(&dataset, &resolved);
    let pruning_record = pruning.run(&mut basis);
    log::info!("{:<32}{:<32}", "pruning pass complete", format!("plen={}", basis.plen()));

    let columns: Vec<DVector<f64>> = basis.piter().map(|(_, term)| term.evaluate_column(&basis, dataset.x())).collect();
    let design = if columns.is_empty() {
        DMatrix::zeros(dataset.m(), 0)
    } else {
        DMatrix::from_columns(&columns)
    };
    let plen = basis.plen();
    let (coefficients, _) = lstsq::solve(&design, dataset.y(), dataset.w()).unwrap_or((DVector::zeros(plen), f64::INFINITY));

    Ok(FitResult {
        basis,
        forward_record,
        pruning_record,
        coefficients,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_grid(m: usize, n: usize, seed: u64) -> DMatrix<f64> {
        let mut state = seed;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 1_000_000) as f64 / 1_000_000.0
        };
        DMatrix::from_fn(m, n, |_, _| next())
    }

    #[test]
    fn univariate_kink_recovers_the_true_knot() {
        let m = 200;
        let x = uniform_grid(m, 1, 42);
        let y = DVector::from_iterator(m, (0..m).map(|i| (x[(i, 0)] - 0.5).max(0.0)));
        let result = fit(x, y, None, FitConfig::default(), None).unwrap();

        let last_step = result.forward_record.iter().last().unwrap();
        assert!(last_step.rsq > 0.9, "rsq={}", last_step.rsq);
        assert!(result.basis.plen() >= 2, "at least constant + one hinge should survive pruning");
    }

    #[test]
    fn sample_weight_zeroing_does_not_change_the_fit() {
        let m = 500;
        let x = uniform_grid(m, 2, 7);
        let y = DVector::from_iterator(
            m,
            (0..m).map(|i| (x[(i, 0)] - 0.3).max(0.0) + 2.0 * (0.7 - x[(i, 1)]).max(0.0)),
        );
        let base = fit(x.clone(), y.clone(), None, FitConfig::default(), None).unwrap();

        let extra_m = m + 100;
        let mut x_rows: Vec<f64> = Vec::with_capacity(extra_m * 2);
        for i in 0..m {
            x_rows.push(x[(i, 0)]);
            x_rows.push(x[(i, 1)]);
        }
        for i in 0..100 {
            x_rows.push(1000.0 + i as f64);
            x_rows.push(-1000.0 - i as f64);
        }
        let x_ext = DMatrix::from_row_slice(extra_m, 2, &x_rows);
        let mut y_ext: Vec<f64> = y.iter().copied().collect();
        y_ext.extend((0..100).map(|i| 999.0 * i as f64));
        let mut w_ext = vec![1.0; m];
        w_ext.extend(vec![0.0; 100]);

        let extended = fit(
            x_ext,
            DVector::from_vec(y_ext),
            Some(DVector::from_vec(w_ext)),
            FitConfig::default(),
            None,
        )
        .unwrap();

        assert_eq!(base.basis.plen(), extended.basis.plen());
        for (a, b) in base.coefficients.iter().zip(extended.coefficients.iter()) {
            assert!((a - b).abs() < 1e-6, "coefficients diverged: {a} vs {b}");
        }
    }

    #[test]
    fn linvars_reduces_rsq_relative_to_unconstrained_fit() {
        let m = 200;
        let x = uniform_grid(m, 1, 99);
        let y = DVector::from_iterator(m, (0..m).map(|i| (x[(i, 0)] - 0.5).max(0.0)));

        let unconstrained = fit(x.clone(), y.clone(), None, FitConfig::default(), None).unwrap();
        let constrained = fit(
            x,
            y,
            None,
            FitConfig {
                linvars: vec![0usize.into()],
                ..FitConfig::default()
            },
            None,
        )
        .unwrap();

        let unconstrained_rsq = unconstrained.forward_record.iter().last().unwrap().rsq;
        let constrained_rsq = constrained.forward_record.iter().last().unwrap().rsq;
        assert!(constrained_rsq < unconstrained_rsq);
        for term in constrained.basis.iter() {
            assert!(!matches!(term, BasisFunction::Hinge(_)));
        }
    }

    #[test]
    fn rejects_sparse_style_invalid_input() {
        let x = DMatrix::from_row_slice(2, 1, &[f64::NAN, 1.0]);
        let y = DVector::from_vec(vec![1.0, 2.0]);
        let result = fit(x, y, None, FitConfig::default(), None);
        assert!(matches!(result, Err(Error::InvalidInput(InvalidInput::NonFiniteX { .. }))));
    }

    #[test]
    fn rejects_invalid_config_before_touching_the_forward_pass() {
        let x = DMatrix::from_row_slice(3, 1, &[0.0, 1.0, 2.0]);
        let y = DVector::from_vec(vec![0.0, 1.0, 2.0]);
        let config = FitConfig {
            penalty: -1.0,
            ..FitConfig::default()
        };
        let result = fit(x, y, None, config, None);
        assert!(matches!(result, Err(Error::InvalidConfig(InvalidConfig::NegativePenalty(_)))));
    }
}
