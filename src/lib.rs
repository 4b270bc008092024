//!
//! # Rule learning from bagged trees
//! `linfa-rules` learns short, human readable rules that isolate a minority class, in the
//! manner of skope-rules.
//!
//! # The big picture
//!
//! `linfa-rules` is a crate in the [linfa](https://github.com/rust-ml/linfa) ecosystem,
//! an effort to create a toolkit for classical Machine Learning implemented in pure Rust, akin to Python's scikit-learn.
//!
//! Decision trees are grown on random subsets of rows and features. Every root to leaf path
//! of a tree is a conjunction of threshold conditions, a rule such as
//! `age > 30.5 and income <= 1200`. Each rule is evaluated as a binary classifier on the
//! rows its tree did not see (out-of-bag). Rules precise enough and with enough recall are
//! merged across trees, ranked, and freed of near duplicates by comparing the rows they
//! match.
//!
//! # Current state
//!
//! `linfa-rules` provides the fitted [`SkopeRules`] model, its [`RuleBook`] of selected
//! rules and three ways of scoring observations with them. The building blocks, path
//! extraction, out-of-bag evaluation, aggregation and deduplication, are exported as well.
//!
//! # Example
//!
//! ```rust
//! use linfa::prelude::*;
//! use linfa_rules::SkopeRules;
//!
//! let dataset = linfa_datasets::winequality().map_targets(|q| usize::from(*q > 6));
//!
//! let model = SkopeRules::params()
//!     .precision_min(0.3)
//!     .n_estimators(5)
//!     .random_state(Some(7))
//!     .fit(&dataset)
//!     .unwrap();
//!
//! println!("{}", model.rules());
//! ```

mod aggregate;
mod algorithm;
mod bagging;
mod dedup;
mod error;
mod evaluate;
mod extract;
mod hyperparams;
mod rule;
mod score;

pub use aggregate::RuleAggregator;
pub use algorithm::{FitWarning, SkopeRules};
pub use bagging::{Estimator, TreeFamily};
pub use dedup::{deduplicate, jaccard};
pub use error::{Result, SkopeRulesError};
pub use evaluate::{evaluate_rule, CandidateSet};
pub use extract::{tree_to_rules, FlatNode, FlatTree, TreeStructure};
pub use hyperparams::{SkopeRulesParams, SkopeRulesValidParams, SubsetSize};
pub use rule::{Condition, Operator, Rule, RuleBook, RuleStats};
pub use score::{ordered_score, vote_score, weighted_score};
