//! Hyperparameters of the rule learner
//!
use std::str::FromStr;

use linfa::{Float, ParamGuard};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{Result, SkopeRulesError};
use crate::SkopeRules;

/// Size of a random subset, either absolute or relative to the population
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SubsetSize {
    /// Draw exactly this many elements
    Count(usize),
    /// Draw this fraction of the population, must lie in `(0, 1]`
    Fraction(f64),
}

impl SubsetSize {
    /// Number of elements drawn out of `total`, before any clamping
    pub fn of(&self, total: usize) -> usize {
        match *self {
            SubsetSize::Count(n) => n,
            SubsetSize::Fraction(f) => (f * total as f64) as usize,
        }
    }

    fn is_valid(&self) -> bool {
        match *self {
            SubsetSize::Count(n) => n > 0,
            SubsetSize::Fraction(f) => f > 0. && f <= 1.,
        }
    }
}

/// Parses `"200"` as a count and `"0.8"` as a fraction
impl FromStr for SubsetSize {
    type Err = SkopeRulesError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(n) = s.parse::<usize>() {
            return Ok(SubsetSize::Count(n));
        }
        match s.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(SubsetSize::Fraction(f)),
            _ => Err(SkopeRulesError::InvalidMaxSamples(s.to_string())),
        }
    }
}

/// The set of hyperparameters that can be specified for fitting
/// [skope rules](struct.SkopeRules.html).
///
/// ### Example
///
/// ```rust
/// use linfa::prelude::*;
/// use linfa_rules::{SkopeRules, SubsetSize};
/// use ndarray::{Array1, Array2};
///
/// let x = Array2::from_shape_fn((40, 2), |(i, j)| (i * (j + 1)) as f64);
/// let y: Array1<usize> = (0..40).map(|i| usize::from(i >= 30)).collect();
/// let dataset = Dataset::new(x, y);
///
/// let model = SkopeRules::params()
///     .feature_names(vec!["a", "b"])
///     .precision_min(0.3)
///     .max_samples(SubsetSize::Fraction(0.7))
///     .random_state(Some(0))
///     .fit(&dataset)
///     .unwrap();
///
/// for (rule, stats) in model.rules() {
///     println!("{} ({:.2}, {:.2})", rule, stats.precision, stats.recall);
/// }
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct SkopeRulesValidParams<F> {
    feature_names: Option<Vec<String>>,
    precision_min: F,
    recall_min: F,
    n_estimators: usize,
    similarity_thres: f64,
    max_samples: SubsetSize,
    max_samples_features: SubsetSize,
    bootstrap: bool,
    bootstrap_features: bool,
    max_depth: Option<usize>,
    min_samples_split: usize,
    n_jobs: usize,
    random_state: Option<u64>,
}

impl<F: Float> SkopeRulesValidParams<F> {
    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    pub fn precision_min(&self) -> F {
        self.precision_min
    }

    pub fn recall_min(&self) -> F {
        self.recall_min
    }

    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    pub fn similarity_thres(&self) -> f64 {
        self.similarity_thres
    }

    pub fn max_samples(&self) -> SubsetSize {
        self.max_samples
    }

    pub fn max_samples_features(&self) -> SubsetSize {
        self.max_samples_features
    }

    pub fn bootstrap(&self) -> bool {
        self.bootstrap
    }

    pub fn bootstrap_features(&self) -> bool {
        self.bootstrap_features
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    pub fn n_jobs(&self) -> usize {
        self.n_jobs
    }

    pub fn random_state(&self) -> Option<u64> {
        self.random_state
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct SkopeRulesParams<F>(SkopeRulesValidParams<F>);

impl<F: Float> SkopeRulesParams<F> {
    pub fn new() -> Self {
        Self(SkopeRulesValidParams {
            feature_names: None,
            precision_min: F::cast(0.5),
            recall_min: F::cast(0.01),
            n_estimators: 10,
            similarity_thres: 0.99,
            max_samples: SubsetSize::Fraction(0.8),
            max_samples_features: SubsetSize::Fraction(1.0),
            bootstrap: false,
            bootstrap_features: false,
            max_depth: Some(3),
            min_samples_split: 2,
            n_jobs: 1,
            random_state: None,
        })
    }

    /// Sets the names used to write rules, one per column of the training data
    pub fn feature_names<S: Into<String>, I: IntoIterator<Item = S>>(mut self, names: I) -> Self {
        self.0.feature_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the minimal out-of-bag precision of a selected rule
    pub fn precision_min(mut self, precision_min: F) -> Self {
        self.0.precision_min = precision_min;
        self
    }

    /// Sets the minimal out-of-bag recall of a selected rule
    pub fn recall_min(mut self, recall_min: F) -> Self {
        self.0.recall_min = recall_min;
        self
    }

    /// Sets the number of trees grown per tree family, which is also the number of rules
    /// used for scoring
    pub fn n_estimators(mut self, n_estimators: usize) -> Self {
        self.0.n_estimators = n_estimators;
        self
    }

    /// Sets the Jaccard similarity above which the worse of two rules is dropped
    pub fn similarity_thres(mut self, similarity_thres: f64) -> Self {
        self.0.similarity_thres = similarity_thres;
        self
    }

    /// Sets the number of rows drawn to train each tree
    ///
    /// A count larger than the number of rows is clamped to the number of rows.
    pub fn max_samples(mut self, max_samples: SubsetSize) -> Self {
        self.0.max_samples = max_samples;
        self
    }

    /// Sets the number of features drawn to train each tree
    pub fn max_samples_features(mut self, max_samples_features: SubsetSize) -> Self {
        self.0.max_samples_features = max_samples_features;
        self
    }

    /// Sets whether rows are drawn with replacement
    pub fn bootstrap(mut self, bootstrap: bool) -> Self {
        self.0.bootstrap = bootstrap;
        self
    }

    /// Sets whether features are drawn with replacement
    pub fn bootstrap_features(mut self, bootstrap_features: bool) -> Self {
        self.0.bootstrap_features = bootstrap_features;
        self
    }

    /// Sets the optional depth limit of the trees, which bounds the length of the rules
    pub fn max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.0.max_depth = max_depth;
        self
    }

    /// Sets the minimum number of rows required to split a node
    pub fn min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.0.min_samples_split = min_samples_split;
        self
    }

    /// Sets the number of worker threads, zero uses one thread per core
    pub fn n_jobs(mut self, n_jobs: usize) -> Self {
        self.0.n_jobs = n_jobs;
        self
    }

    /// Sets the seed of the sampling, `None` seeds from system entropy
    pub fn random_state(mut self, random_state: Option<u64>) -> Self {
        self.0.random_state = random_state;
        self
    }
}

impl<F: Float> Default for SkopeRulesParams<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> SkopeRules<F> {
    /// Defaults are provided if the optional parameters are not specified:
    /// * `feature_names = None` (rules use `c0`, `c1`, ...)
    /// * `precision_min = 0.5`
    /// * `recall_min = 0.01`
    /// * `n_estimators = 10`
    /// * `similarity_thres = 0.99`
    /// * `max_samples = SubsetSize::Fraction(0.8)`
    /// * `max_samples_features = SubsetSize::Fraction(1.0)`
    /// * `bootstrap = false`
    /// * `bootstrap_features = false`
    /// * `max_depth = Some(3)`
    /// * `min_samples_split = 2`
    /// * `n_jobs = 1`
    /// * `random_state = None`
    // Violates the convention that new should return a value of type `Self`
    #[allow(clippy::new_ret_no_self)]
    pub fn params() -> SkopeRulesParams<F> {
        SkopeRulesParams::new()
    }
}

impl<F: Float> ParamGuard for SkopeRulesParams<F> {
    type Checked = SkopeRulesValidParams<F>;
    type Error = SkopeRulesError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let unit = |v: F| v >= F::zero() && v <= F::one();

        if !unit(self.0.precision_min) {
            Err(SkopeRulesError::InvalidParameter(format!(
                "precision_min must be in [0, 1], got {}",
                self.0.precision_min
            )))
        } else if !unit(self.0.recall_min) {
            Err(SkopeRulesError::InvalidParameter(format!(
                "recall_min must be in [0, 1], got {}",
                self.0.recall_min
            )))
        } else if !(self.0.similarity_thres > 0. && self.0.similarity_thres <= 1.) {
            Err(SkopeRulesError::InvalidSimilarity(self.0.similarity_thres))
        } else if self.0.n_estimators == 0 {
            Err(SkopeRulesError::InvalidParameter(
                "n_estimators must be at least one".to_string(),
            ))
        } else if !self.0.max_samples.is_valid() {
            Err(SkopeRulesError::InvalidMaxSamples(format!(
                "{:?}",
                self.0.max_samples
            )))
        } else if !self.0.max_samples_features.is_valid() {
            Err(SkopeRulesError::InvalidParameter(format!(
                "max_samples_features must be a positive count or a fraction in (0, 1], got {:?}",
                self.0.max_samples_features
            )))
        } else if self.0.min_samples_split < 2 {
            Err(SkopeRulesError::InvalidParameter(format!(
                "min_samples_split must be at least 2, got {}",
                self.0.min_samples_split
            )))
        } else if matches!(&self.0.feature_names, Some(names) if names.is_empty()) {
            Err(SkopeRulesError::InvalidParameter(
                "feature_names must not be empty".to_string(),
            ))
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
