//! Fitting options, their documented defaults, and the derivation of
//! data-dependent parameters (`max_terms`, `endspan`, `check_every`).

use crate::error::{Error, InvalidConfig};

/// A feature reference usable in [`FitConfig::linvars`]: either a column
/// index or a name resolved against `xlabels` at validation time.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureRef {
    Index(usize),
    Name(String),
}

impl From<usize> for FeatureRef {
    fn from(index: usize) -> Self {
        FeatureRef::Index(index)
    }
}

impl From<&str> for FeatureRef {
    fn from(name: &str) -> Self {
        FeatureRef::Name(name.to_string())
    }
}

impl From<String> for FeatureRef {
    fn from(name: String) -> Self {
        FeatureRef::Name(name)
    }
}

/// Options controlling the forward pass and pruning pass.
///
/// `max_terms` mirrors the `-1`-sentinel idiom for "derive from data" as
/// `None`: the original default (`2n + 10`) is not known until `n` is, so
/// it cannot be a plain field default. `endspan`/`minspan`/`check_every`
/// follow the same convention.
#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Hard cap on basis size including the constant. `None` derives `2n + 10`.
    pub max_terms: Option<usize>,
    /// Maximum product depth of any term.
    pub max_degree: usize,
    /// GCV complexity penalty (the `d` parameter of Friedman 1991 eq. 32).
    pub penalty: f64,
    /// Knots excluded at each feature boundary. `None` derives from `endspan_alpha`.
    pub endspan: Option<usize>,
    /// Probability controlling the derived `endspan`, used when `endspan` is `None`.
    pub endspan_alpha: f64,
    /// Minimum data-point gap between knots for a given parent. `None` derives per-parent.
    pub minspan: Option<usize>,
    /// Probability controlling the derived `minspan`, used when `minspan` is `None`.
    pub minspan_alpha: f64,
    /// Forward-pass stopping threshold on RSQ.
    pub thresh: f64,
    /// Minimum samples below which `check_every` derives to 1.
    pub min_search_points: usize,
    /// Candidate-knot subsampling stride. `None` derives from `min_search_points`.
    pub check_every: Option<usize>,
    /// Enable the knotless fast-path alternative to a hinge pair.
    pub allow_linear: bool,
    /// Features restricted to linear entry, regardless of `allow_linear`.
    pub linvars: Vec<FeatureRef>,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_terms: None,
            max_degree: 1,
            penalty: 3.0,
            endspan: None,
            endspan_alpha: 0.05,
            minspan: None,
            minspan_alpha: 0.05,
            thresh: 1e-3,
            min_search_points: 100,
            check_every: None,
            allow_linear: true,
            linvars: Vec::new(),
        }
    }
}

/// `FitConfig` after validation and data-dependent derivation.
///
/// `minspan` is deliberately left unresolved to a single value: it is
/// derived per-parent from the count of rows where the parent is
/// nonzero, so [`ResolvedConfig::minspan_for`] computes it on demand.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub max_terms: usize,
    pub max_degree: usize,
    pub penalty: f64,
    pub endspan: usize,
    pub minspan_override: Option<usize>,
    pub minspan_alpha: f64,
    pub thresh: f64,
    pub check_every: usize,
    pub allow_linear: bool,
    pub linvars: Vec<usize>,
}

impl ResolvedConfig {
    /// Derives the per-parent minspan, floored at 1.
    ///
    /// `n` is the feature count, `c` the number of rows where the parent
    /// term is nonzero. Returns the fixed override if one was configured.
    pub fn minspan_for(&self, n: usize, c: usize) -> usize {
        if let Some(fixed) = self.minspan_override {
            return fixed.max(1);
        }
        if c == 0 {
            return 1;
        }
        let alpha = self.minspan_alpha;
        let arg = -(1.0 / (n as f64 * c as f64)) * (1.0 - alpha).ln();
        if !arg.is_finite() || arg <= 0.0 {
            return 1;
        }
        let derived = (-arg.log2() / 2.5).floor();
        if derived.is_finite() {
            (derived as i64).max(1) as usize
        } else {
            1
        }
    }
}

impl FitConfig {
    /// Validates this configuration and derives the data-dependent options,
    /// given the number of features `n` and samples `m`.
    ///
    /// `xlabels` resolves string entries in [`FitConfig::linvars`] to
    /// indices. Validation failures are raised here, before any
    /// forward-pass or pruning-pass state is constructed.
    pub fn resolve(&self, n: usize, m: usize, xlabels: Option<&[String]>) -> Result<ResolvedConfig, Error> {
        if let Some(xlabels) = xlabels {
            if xlabels.len() != n {
                return Err(InvalidConfig::XlabelsLengthMismatch {
                    expected: n,
                    got: xlabels.len(),
                }
                .into());
            }
        }

        if let Some(0) = self.max_terms {
            return Err(InvalidConfig::NonPositiveMaxTerms(0).into());
        }
        if self.max_degree == 0 {
            return Err(InvalidConfig::NonPositiveMaxDegree(0).into());
        }
        if self.penalty < 0.0 {
            return Err(InvalidConfig::NegativePenalty(self.penalty).into());
        }
        if !(0.0 < self.endspan_alpha && self.endspan_alpha < 1.0) {
            return Err(InvalidConfig::EndspanAlphaOutOfRange(self.endspan_alpha).into());
        }
        if !(0.0 < self.minspan_alpha && self.minspan_alpha < 1.0) {
            return Err(InvalidConfig::MinspanAlphaOutOfRange(self.minspan_alpha).into());
        }
        if self.min_search_points == 0 {
            return Err(InvalidConfig::NonPositiveMinSearchPoints(0).into());
        }

        let max_terms = self.max_terms.unwrap_or(2 * n + 10);
        let endspan = self.endspan.unwrap_or_else(|| derive_endspan(self.endspan_alpha, n));
        let check_every = self
            .check_every
            .unwrap_or_else(|| derive_check_every(m, self.min_search_points));
        let linvars = self.resolve_linvars(n, xlabels)?;

        Ok(ResolvedConfig {
            max_terms,
            max_degree: self.max_degree,
            penalty: self.penalty,
            endspan,
            minspan_override: self.minspan,
            minspan_alpha: self.minspan_alpha,
            thresh: self.thresh,
            check_every,
            allow_linear: self.allow_linear,
            linvars,
        })
    }

    /// Resolves every `linvars` entry to a feature index. A string entry
    /// must resolve uniquely against `xlabels`; otherwise this
    /// raises `InvalidConfig::UnresolvedLinvar`.
    fn resolve_linvars(&self, n: usize, xlabels: Option<&[String]>) -> Result<Vec<usize>, Error> {
        let mut resolved = Vec::with_capacity(self.linvars.len());
        for var in &self.linvars {
            let index = match var {
                FeatureRef::Index(i) => *i,
                FeatureRef::Name(name) => {
                    let labels = xlabels.ok_or_else(|| InvalidConfig::UnresolvedLinvar(name.clone()))?;
                    let matches: Vec<usize> = labels
                        .iter()
                        .enumerate()
                        .filter(|(_, label)| *label == name)
                        .map(|(i, _)| i)
                        .collect();
                    match matches.as_slice() {
                        [single] => *single,
                        _ => return Err(InvalidConfig::UnresolvedLinvar(name.clone()).into()),
                    }
                }
            };
            if index >= n {
                return Err(InvalidConfig::LinvarIndexOutOfBounds { index, n }.into());
            }
            resolved.push(index);
        }
        Ok(resolved)
    }
}

/// `round(3 - log2(endspan_alpha / n))`, floored at 1
fn derive_endspan(endspan_alpha: f64, n: usize) -> usize {
    let raw = 3.0 - (endspan_alpha / n.max(1) as f64).log2();
    let rounded = raw.round();
    if rounded.is_finite() {
        (rounded as i64).max(1) as usize
    } else {
        1
    }
}

/// `max(1, floor(m / min_search_points))`
fn derive_check_every(m: usize, min_search_points: usize) -> usize {
    (m / min_search_points.max(1)).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = FitConfig::default();
        assert_eq!(config.max_terms, None);
        assert_eq!(config.max_degree, 1);
        assert_eq!(config.penalty, 3.0);
        assert_eq!(config.endspan_alpha, 0.05);
        assert_eq!(config.minspan_alpha, 0.05);
        assert_eq!(config.thresh, 1e-3);
        assert_eq!(config.min_search_points, 100);
        assert!(config.allow_linear);
        assert!(config.linvars.is_empty());
    }

    #[test]
    fn derives_max_terms_as_2n_plus_10() {
        let resolved = FitConfig::default().resolve(5, 200, None).unwrap();
        assert_eq!(resolved.max_terms, 20);
    }

    #[test]
    fn rejects_non_positive_max_terms() {
        let config = FitConfig {
            max_terms: Some(0),
            ..FitConfig::default()
        };
        assert!(matches!(
            config.resolve(5, 200, None),
            Err(Error::InvalidConfig(InvalidConfig::NonPositiveMaxTerms(0)))
        ));
    }

    #[test]
    fn rejects_negative_penalty() {
        let config = FitConfig {
            penalty: -1.0,
            ..FitConfig::default()
        };
        assert!(matches!(
            config.resolve(5, 200, None),
            Err(Error::InvalidConfig(InvalidConfig::NegativePenalty(_)))
        ));
    }

    #[test]
    fn resolves_linvar_name_uniquely() {
        let config = FitConfig {
            linvars: vec!["x1".into()],
            ..FitConfig::default()
        };
        let labels = vec!["x0".to_string(), "x1".to_string()];
        let resolved = config.resolve(2, 200, Some(&labels)).unwrap();
        assert_eq!(resolved.linvars, vec![1]);
    }

    #[test]
    fn rejects_unresolvable_linvar_name() {
        let config = FitConfig {
            linvars: vec!["ghost".into()],
            ..FitConfig::default()
        };
        let labels = vec!["x0".to_string(), "x1".to_string()];
        assert!(matches!(
            config.resolve(2, 200, Some(&labels)),
            Err(Error::InvalidConfig(InvalidConfig::UnresolvedLinvar(_)))
        ));
    }

    #[test]
    fn check_every_floors_to_one_for_small_samples() {
        let resolved = FitConfig::default().resolve(3, 50, None).unwrap();
        assert_eq!(resolved.check_every, 1);
    }
}
