//! Error types of the rule learner
//!
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SkopeRulesError>;

#[derive(Error, Debug)]
pub enum SkopeRulesError {
    #[error("this method needs samples of at least 2 classes in the data, but the data contains only one class: {0}")]
    SingleClass(usize),
    #[error("similarity_thres must be in (0, 1], got {0}")]
    InvalidSimilarity(f64),
    #[error("max_samples ({0}) is not supported, valid choices are an integer count or a fraction in (0, 1]")]
    InvalidMaxSamples(String),
    #[error("invalid parameter {0}")]
    InvalidParameter(String),
    #[error("expected {expected} feature names, got {found}")]
    FeatureNames { expected: usize, found: usize },
    #[error("expected {expected} sample weights, got {found}")]
    SampleWeights { expected: usize, found: usize },
    #[error("x has {found} features but the rules were fitted on {expected} features, please reshape your data")]
    FeatureMismatch { expected: usize, found: usize },
    #[error("not enough samples to learn rules from")]
    NotEnoughSamples,
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
}
