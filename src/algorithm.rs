//! The fitted rule learner and its `Fit` implementation
//!
use std::collections::BTreeSet;
use std::fmt;

use linfa::dataset::{AsSingleTargets, DatasetBase};
use linfa::traits::{Fit, PredictInplace};
use linfa::Float;
use ndarray::{Array1, ArrayBase, Data, Ix2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::aggregate::RuleAggregator;
use crate::bagging::{draw_bags, fit_estimators, Estimator, TreeSettings};
use crate::dedup::deduplicate;
use crate::error::{Result, SkopeRulesError};
use crate::evaluate::CandidateSet;
use crate::extract::{distinct_rules, FlatTree};
use crate::hyperparams::{SkopeRulesValidParams, SubsetSize};
use crate::rule::RuleBook;
use crate::score::{ordered_score, vote_score, weighted_score};

/// Non fatal conditions met while fitting
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FitWarning {
    /// Labels other than `0` and `1` were found, every non zero label is treated as positive
    LabelsCoerced { labels: Vec<usize> },
    /// `max_samples` asked for more rows than available
    MaxSamplesClamped { max_samples: usize, n_samples: usize },
    /// The estimator saw every row, its rules were evaluated on its in-bag rows
    InBagEvaluation { estimator: usize },
}

impl fmt::Display for FitWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitWarning::LabelsCoerced { labels } => write!(
                f,
                "found labels {:?}, only 0 and 1 are expected, non zero labels are treated as positive",
                labels
            ),
            FitWarning::MaxSamplesClamped {
                max_samples,
                n_samples,
            } => write!(
                f,
                "max_samples ({}) is greater than the total number of samples ({}), max_samples will be set to n_samples",
                max_samples, n_samples
            ),
            FitWarning::InBagEvaluation { estimator } => write!(
                f,
                "estimator {} has no out-of-bag samples, its rules are evaluated on in-bag samples",
                estimator
            ),
        }
    }
}

/// A fitted rule learner
///
/// Rules are conjunctions of feature thresholds read from the paths of bagged decision
/// trees. Every rule is scored on the rows its tree did not see, rules below the precision
/// or recall bounds are dropped, and a rule covering nearly the same rows as a better rule
/// is removed. The remaining rules form a ranked [`RuleBook`].
///
/// The first `n_estimators` rules of the book are used to score observations. An
/// observation matched by any of them is predicted as positive.
///
/// ### Example
///
/// ```rust
/// use linfa::prelude::*;
/// use linfa_rules::SkopeRules;
/// use ndarray::{Array1, Array2};
///
/// let x = Array2::from_shape_fn((50, 1), |(i, _)| i as f64);
/// let y: Array1<usize> = (0..50).map(|i| usize::from(i >= 40)).collect();
/// let dataset = Dataset::new(x, y);
///
/// let model = SkopeRules::params()
///     .feature_names(vec!["age"])
///     .random_state(Some(42))
///     .fit(&dataset)
///     .unwrap();
///
/// let flagged = model.predict(&dataset);
/// assert_eq!(flagged.len(), 50);
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug)]
pub struct SkopeRules<F: Float> {
    rules: RuleBook<F>,
    n_estimators: usize,
    n_features: usize,
    feature_names: Vec<String>,
    max_samples: usize,
    estimators: Vec<Estimator<F>>,
    warnings: Vec<FitWarning>,
}

impl<F: Float> SkopeRules<F> {
    /// The selected rules, best first
    pub fn rules(&self) -> &RuleBook<F> {
        &self.rules
    }

    /// Number of rules used for scoring
    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Number of rows drawn for every tree
    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    /// Trees of both families, classification trees first
    pub fn estimators(&self) -> &[Estimator<F>] {
        &self.estimators
    }

    pub fn warnings(&self) -> &[FitWarning] {
        &self.warnings
    }

    fn check_features<D: Data<Elem = F>>(&self, x: &ArrayBase<D, Ix2>) -> Result<()> {
        if x.ncols() != self.n_features {
            return Err(SkopeRulesError::FeatureMismatch {
                expected: self.n_features,
                found: x.ncols(),
            });
        }
        Ok(())
    }

    /// Anomaly score of every row, the number of best rules matching it
    ///
    /// Higher is more likely to be positive.
    pub fn decision_function<D: Data<Elem = F>>(&self, x: &ArrayBase<D, Ix2>) -> Result<Array1<F>> {
        self.check_features(x)?;
        Ok(weighted_score(&self.rules, self.n_estimators, x))
    }

    /// Number of best rules voting for every row
    pub fn rules_vote<D: Data<Elem = F>>(&self, x: &ArrayBase<D, Ix2>) -> Result<Array1<F>> {
        self.check_features(x)?;
        Ok(vote_score(&self.rules, self.n_estimators, x))
    }

    /// Rank of the worst ranked best rule matching every row, zero if none matches
    ///
    /// Scores are bounded by `n_estimators - 1`.
    pub fn separate_rule_score<D: Data<Elem = F>>(
        &self,
        x: &ArrayBase<D, Ix2>,
    ) -> Result<Array1<F>> {
        self.check_features(x)?;
        Ok(ordered_score(&self.rules, self.n_estimators, x))
    }
}

/// Binary view of the labels
///
/// Returns the positive mask together with the sorted distinct labels when they are not
/// exactly `{0, 1}`.
fn binary_labels<'a, I: Iterator<Item = &'a usize>>(
    labels: I,
) -> Result<(Array1<bool>, Option<Vec<usize>>)> {
    let labels = labels.cloned().collect::<Vec<_>>();
    let classes = labels.iter().cloned().collect::<BTreeSet<_>>();

    if classes.len() < 2 {
        return Err(SkopeRulesError::SingleClass(
            classes.into_iter().next().unwrap_or_default(),
        ));
    }

    let y = labels.iter().map(|&label| label > 0).collect();
    let coerced = if classes.len() == 2 && classes.contains(&0) && classes.contains(&1) {
        None
    } else {
        Some(classes.into_iter().collect())
    };

    Ok((y, coerced))
}

fn resolve_max_samples(
    max_samples: SubsetSize,
    n_samples: usize,
    warnings: &mut Vec<FitWarning>,
) -> Result<usize> {
    match max_samples {
        SubsetSize::Count(n) if n > n_samples => {
            let warning = FitWarning::MaxSamplesClamped {
                max_samples: n,
                n_samples,
            };
            warn!("{}", warning);
            warnings.push(warning);
            Ok(n_samples)
        }
        size => match size.of(n_samples) {
            0 => Err(SkopeRulesError::InvalidMaxSamples(format!(
                "{:?} of {} samples",
                size, n_samples
            ))),
            n => Ok(n),
        },
    }
}

fn resolve_max_features(max_features: SubsetSize, n_features: usize) -> Result<usize> {
    let resolved = max_features.of(n_features);
    if resolved == 0 || resolved > n_features {
        return Err(SkopeRulesError::InvalidParameter(format!(
            "max_samples_features must select between 1 and {} features, got {:?}",
            n_features, max_features
        )));
    }
    Ok(resolved)
}

impl<F: Float, D: Data<Elem = F>, T: AsSingleTargets<Elem = usize>>
    Fit<ArrayBase<D, Ix2>, T, SkopeRulesError> for SkopeRulesValidParams<F>
{
    type Object = SkopeRules<F>;

    /// Grows the bagged trees, evaluates every tree path on the out-of-bag rows of its
    /// tree and keeps the precise, non redundant rules
    #[instrument(skip_all, fields(n_estimators = self.n_estimators()))]
    fn fit(&self, dataset: &DatasetBase<ArrayBase<D, Ix2>, T>) -> Result<Self::Object> {
        let x = dataset.records().view();
        let (n_samples, n_features) = x.dim();
        if n_samples == 0 {
            return Err(SkopeRulesError::NotEnoughSamples);
        }

        let mut warnings = Vec::new();

        let (y, coerced) = binary_labels(dataset.targets().as_single_targets().iter())?;
        if let Some(labels) = coerced {
            let warning = FitWarning::LabelsCoerced { labels };
            warn!("{}", warning);
            warnings.push(warning);
        }

        let feature_names = match self.feature_names() {
            Some(names) if names.len() != n_features => {
                return Err(SkopeRulesError::FeatureNames {
                    expected: n_features,
                    found: names.len(),
                })
            }
            Some(names) => names.to_vec(),
            None => (0..n_features).map(|i| format!("c{}", i)).collect(),
        };

        let sample_weight = dataset.weights();
        if let Some(weights) = sample_weight {
            if weights.len() != n_samples {
                return Err(SkopeRulesError::SampleWeights {
                    expected: n_samples,
                    found: weights.len(),
                });
            }
        }

        let max_samples = resolve_max_samples(self.max_samples(), n_samples, &mut warnings)?;
        let max_features = resolve_max_features(self.max_samples_features(), n_features)?;

        let mut rng = match self.random_state() {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let draws = draw_bags(
            &mut rng,
            self.n_estimators(),
            n_samples,
            max_samples,
            self.bootstrap(),
            n_features,
            max_features,
            self.bootstrap_features(),
        );
        let settings = TreeSettings {
            max_depth: self.max_depth(),
            min_samples_split: self.min_samples_split(),
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.n_jobs())
            .build()?;

        let (estimators, candidates) = pool.install(|| -> Result<_> {
            let estimators = fit_estimators(x, y.view(), sample_weight, &draws, settings)?;
            info!(n_trees = estimators.len(), max_samples, "fitted trees");

            let candidates = estimators
                .par_iter()
                .map(|estimator| {
                    let tree = FlatTree::from_decision_tree(estimator.tree());
                    let rules = distinct_rules(&tree, estimator.features(), &feature_names);
                    let candidates = CandidateSet::new(rules, estimator.in_bag());
                    let evaluated = candidates.evaluate(&x, y.view());
                    (candidates.in_bag, evaluated)
                })
                .collect::<Vec<_>>();

            Ok((estimators, candidates))
        })?;

        let mut aggregator = RuleAggregator::new(self.precision_min(), self.recall_min());
        for (idx, (in_bag, evaluated)) in candidates.into_iter().enumerate() {
            if in_bag {
                let warning = FitWarning::InBagEvaluation { estimator: idx };
                warn!("{}", warning);
                warnings.push(warning);
            }
            aggregator.extend(evaluated);
        }
        debug!(n_rules = aggregator.len(), "aggregated rules above the bounds");

        let ranked = aggregator.into_ranked();
        let n_ranked = ranked.len();
        let rules = RuleBook::new(deduplicate(ranked, &x, self.similarity_thres()));
        info!(
            n_rules = rules.len(),
            n_duplicates = n_ranked - rules.len(),
            "selected rules"
        );

        Ok(SkopeRules {
            rules,
            n_estimators: self.n_estimators(),
            n_features,
            feature_names,
            max_samples,
            estimators,
            warnings,
        })
    }
}

impl<F: Float, D: Data<Elem = F>> PredictInplace<ArrayBase<D, Ix2>, Array1<bool>>
    for SkopeRules<F>
{
    /// Flags every row matched by at least one of the best rules
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array1<bool>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of output targets."
        );
        assert_eq!(
            x.ncols(),
            self.n_features,
            "The number of features must match the number of features the rules were fitted on."
        );

        let scores = weighted_score(&self.rules, self.n_estimators, x);
        for (target, score) in y.iter_mut().zip(scores.iter()) {
            *target = *score > F::zero();
        }
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array1<bool> {
        Array1::from_elem(x.nrows(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::array;

    #[test]
    fn binary_labels_pass_through() {
        let (y, coerced) = binary_labels([0usize, 1, 1, 0].iter()).unwrap();
        assert_eq!(y, array![false, true, true, false]);
        assert!(coerced.is_none());
    }

    #[test]
    fn other_labels_are_coerced() {
        let (y, coerced) = binary_labels([0usize, 2, 3, 0].iter()).unwrap();
        assert_eq!(y, array![false, true, true, false]);
        assert_eq!(coerced, Some(vec![0, 2, 3]));
    }

    #[test]
    fn single_class_is_rejected() {
        assert!(matches!(
            binary_labels([1usize, 1, 1].iter()),
            Err(SkopeRulesError::SingleClass(1))
        ));
        assert!(matches!(
            binary_labels([0usize, 0].iter()),
            Err(SkopeRulesError::SingleClass(0))
        ));
    }

    #[test]
    fn labels_without_zero_become_all_positive() {
        let (y, coerced) = binary_labels([1usize, 2, 2].iter()).unwrap();
        assert_eq!(y, array![true, true, true]);
        assert_eq!(coerced, Some(vec![1, 2]));
    }

    #[test]
    fn max_samples_resolution() {
        let mut warnings = Vec::new();

        assert_eq!(
            resolve_max_samples(SubsetSize::Fraction(0.8), 10, &mut warnings).unwrap(),
            8
        );
        assert_eq!(
            resolve_max_samples(SubsetSize::Count(4), 10, &mut warnings).unwrap(),
            4
        );
        assert!(warnings.is_empty());

        assert_eq!(
            resolve_max_samples(SubsetSize::Count(25), 10, &mut warnings).unwrap(),
            10
        );
        assert_eq!(
            warnings,
            vec![FitWarning::MaxSamplesClamped {
                max_samples: 25,
                n_samples: 10
            }]
        );

        assert!(matches!(
            resolve_max_samples(SubsetSize::Fraction(0.05), 10, &mut warnings),
            Err(SkopeRulesError::InvalidMaxSamples(_))
        ));
    }

    #[test]
    fn max_features_resolution() {
        assert_eq!(resolve_max_features(SubsetSize::Fraction(1.0), 4).unwrap(), 4);
        assert_eq!(resolve_max_features(SubsetSize::Fraction(0.5), 4).unwrap(), 2);
        assert!(resolve_max_features(SubsetSize::Count(5), 4).is_err());
        assert!(resolve_max_features(SubsetSize::Fraction(0.1), 4).is_err());
    }

    #[test]
    fn warnings_are_readable() {
        let warning = FitWarning::InBagEvaluation { estimator: 3 };
        assert_eq!(
            warning.to_string(),
            "estimator 3 has no out-of-bag samples, its rules are evaluated on in-bag samples"
        );
    }
}
