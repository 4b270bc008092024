//! Bagged decision trees the rules are read from
//!
//! Every bag draws a subset of rows and a subset of features. The same draws are used to
//! grow two families of trees: plain classification trees, and trees whose rows are
//! weighted by the user supplied sample weights.
use linfa::traits::Fit;
use linfa::{Dataset, Float};
use linfa_trees::DecisionTree;
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use rand::seq::index;
use rand::Rng;
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::Result;

/// The kind of tree an [`Estimator`] belongs to
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeFamily {
    /// Trained on the binary labels with unit weights
    Classification,
    /// Trained on the binary labels with rows weighted by their sample weight, identical to
    /// the classification family when no sample weights are given
    ValueWeighted,
}

/// Rows and features drawn for one bag
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct BagDraw {
    pub samples: Vec<usize>,
    pub in_bag: Array1<bool>,
    pub features: Vec<usize>,
}

/// A fitted tree together with the data it was trained on
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug)]
pub struct Estimator<F: Float> {
    tree: DecisionTree<F, bool>,
    family: TreeFamily,
    samples: Vec<usize>,
    in_bag: Array1<bool>,
    features: Vec<usize>,
}

impl<F: Float> Estimator<F> {
    pub fn tree(&self) -> &DecisionTree<F, bool> {
        &self.tree
    }

    pub fn family(&self) -> TreeFamily {
        self.family
    }

    /// Drawn row indices, with repetitions when rows are bootstrapped
    pub fn samples(&self) -> &[usize] {
        &self.samples
    }

    /// Rows seen by the tree during training
    pub fn in_bag(&self) -> &Array1<bool> {
        &self.in_bag
    }

    /// Number of distinct rows seen by the tree
    pub fn n_in_bag(&self) -> usize {
        self.in_bag.iter().filter(|&&m| m).count()
    }

    /// Columns of the full matrix the tree was trained on, in tree feature order
    pub fn features(&self) -> &[usize] {
        &self.features
    }
}

/// Settings of the trees grown in every bag
#[derive(Clone, Copy, Debug)]
pub(crate) struct TreeSettings {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
}

fn draw_indices(rng: &mut impl Rng, population: usize, amount: usize, replace: bool) -> Vec<usize> {
    if replace {
        (0..amount).map(|_| rng.gen_range(0..population)).collect()
    } else {
        index::sample(rng, population, amount).into_vec()
    }
}

/// Draws `n_bags` row and feature subsets
///
/// `max_samples` and `max_features` must not exceed `n_samples` and `n_features`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn draw_bags(
    rng: &mut impl Rng,
    n_bags: usize,
    n_samples: usize,
    max_samples: usize,
    bootstrap: bool,
    n_features: usize,
    max_features: usize,
    bootstrap_features: bool,
) -> Vec<BagDraw> {
    (0..n_bags)
        .map(|_| {
            let features = draw_indices(rng, n_features, max_features, bootstrap_features);
            let samples = draw_indices(rng, n_samples, max_samples, bootstrap);

            let mut in_bag = Array1::from_elem(n_samples, false);
            for &idx in &samples {
                in_bag[idx] = true;
            }

            BagDraw {
                samples,
                in_bag,
                features,
            }
        })
        .collect()
}

/// Row weights of the value weighted family
///
/// Weights are shifted to start at zero and mapped through a sigmoid so that positive rows
/// with a large weight dominate, while every negative row gets the same weight below one
/// half. The result is rescaled to a mean of one. `y` must contain at least one positive
/// row.
pub(crate) fn value_weights(y: ArrayView1<bool>, sample_weight: &[f32]) -> Array1<f32> {
    let min = sample_weight.iter().cloned().fold(f32::INFINITY, f32::min);
    let shifted = sample_weight.iter().map(|w| w - min).collect::<Vec<_>>();

    let n = y.len() as f32;
    let contamination = y.iter().filter(|&&label| label).count() as f32 / n;
    let mean_weight = shifted.iter().sum::<f32>() / n;

    let weights: Array1<f32> = y
        .iter()
        .zip(shifted)
        .map(|(&label, w)| {
            let target = if label {
                w.sqrt() * 0.5 / contamination
            } else {
                -mean_weight.sqrt()
            };
            1. / (1. + (-target).exp())
        })
        .collect();

    let scale = n / weights.sum();
    weights * scale
}

fn fit_tree<F: Float>(
    x: ArrayView2<F>,
    y: ArrayView1<bool>,
    weights: Option<&Array1<f32>>,
    draw: &BagDraw,
    settings: TreeSettings,
) -> Result<DecisionTree<F, bool>> {
    let records = x
        .select(Axis(0), &draw.samples)
        .select(Axis(1), &draw.features);
    let targets = y.select(Axis(0), &draw.samples);

    let dataset = Dataset::new(records, targets);
    // a single row of the lightest weight is enough to make a leaf, with some slack for
    // the running sums linfa-trees subtracts from
    let (dataset, min_weight_leaf) = match weights {
        Some(weights) => {
            let weights = weights.select(Axis(0), &draw.samples);
            let lightest = weights.iter().cloned().fold(f32::INFINITY, f32::min);
            (dataset.with_weights(weights), lightest * 0.5)
        }
        None => (dataset, 1.0),
    };

    // linfa-trees checks the split size against the row count
    let tree = DecisionTree::params()
        .max_depth(settings.max_depth)
        .min_weight_split(settings.min_samples_split as f32)
        .min_weight_leaf(min_weight_leaf)
        .fit(&dataset)?;

    Ok(tree)
}

/// Grows one tree of each family per draw, classification trees first
///
/// Trees are fitted in parallel on the current rayon thread pool.
pub(crate) fn fit_estimators<F: Float>(
    x: ArrayView2<F>,
    y: ArrayView1<bool>,
    sample_weight: Option<&[f32]>,
    draws: &[BagDraw],
    settings: TreeSettings,
) -> Result<Vec<Estimator<F>>> {
    let weights = sample_weight.map(|sw| value_weights(y, sw));

    let jobs = [TreeFamily::Classification, TreeFamily::ValueWeighted]
        .iter()
        .flat_map(|&family| draws.iter().map(move |draw| (family, draw)))
        .collect::<Vec<_>>();

    jobs.into_par_iter()
        .map(|(family, draw)| {
            let weights = match family {
                TreeFamily::Classification => None,
                TreeFamily::ValueWeighted => weights.as_ref(),
            };
            let tree = fit_tree(x, y, weights, draw, settings)?;

            Ok(Estimator {
                tree,
                family,
                samples: draw.samples.clone(),
                in_bag: draw.in_bag.clone(),
                features: draw.features.clone(),
            })
        })
        .collect()
}
