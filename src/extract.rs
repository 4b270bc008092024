//! Conversion of fitted trees into path rules
//!
//! The rule learner only needs to walk the split structure of a tree, so trees are seen
//! through the [`TreeStructure`] trait. [`FlatTree`] stores that structure in an arena of
//! integer indexed nodes and can be built from a fitted `linfa_trees::DecisionTree`.
use std::collections::HashSet;
use std::fmt::Debug;

use linfa::{Float, Label};
use linfa_trees::{DecisionTree, TreeNode};

use crate::rule::{Condition, Operator, Rule};

/// Read access to the split structure of a fitted binary tree
///
/// Node handles are opaque indices. Internal nodes send observations with
/// `feature <= threshold` to the left child and the others to the right child. Feature
/// indices are local to the columns the tree was trained on.
pub trait TreeStructure<F> {
    fn root(&self) -> usize;
    fn is_leaf(&self, node: usize) -> bool;
    fn feature_at(&self, node: usize) -> usize;
    fn threshold_at(&self, node: usize) -> F;
    fn left_child(&self, node: usize) -> usize;
    fn right_child(&self, node: usize) -> usize;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FlatNode<F> {
    Leaf,
    Split {
        feature: usize,
        threshold: F,
        left: usize,
        right: usize,
    },
}

/// Arena representation of a binary tree, the root is stored at index zero
#[derive(Clone, Debug, PartialEq)]
pub struct FlatTree<F> {
    nodes: Vec<FlatNode<F>>,
}

impl<F: Float> FlatTree<F> {
    /// A tree made of a single leaf
    pub fn leaf() -> Self {
        FlatTree {
            nodes: vec![FlatNode::Leaf],
        }
    }

    /// Assembles a tree from raw nodes
    ///
    /// ### Panics
    ///
    /// If `nodes` is empty or a split refers to a child outside of `nodes`
    pub fn from_nodes(nodes: Vec<FlatNode<F>>) -> Self {
        assert!(!nodes.is_empty(), "a tree needs at least a root node");
        for node in &nodes {
            if let FlatNode::Split { left, right, .. } = node {
                assert!(
                    *left < nodes.len() && *right < nodes.len(),
                    "child index out of bounds"
                );
            }
        }

        FlatTree { nodes }
    }

    /// Flattens a fitted decision tree, preserving its split values
    pub fn from_decision_tree<L: Label + Debug>(tree: &DecisionTree<F, L>) -> Self {
        let mut nodes = Vec::new();
        push_node(&mut nodes, tree.root_node());

        FlatTree { nodes }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, FlatNode::Leaf))
            .count()
    }

    fn split(&self, node: usize) -> (usize, F, usize, usize) {
        match self.nodes[node] {
            FlatNode::Split {
                feature,
                threshold,
                left,
                right,
            } => (feature, threshold, left, right),
            FlatNode::Leaf => panic!("node {} is a leaf and has no split", node),
        }
    }
}

fn push_node<F: Float, L: Label + Debug>(
    nodes: &mut Vec<FlatNode<F>>,
    node: &TreeNode<F, L>,
) -> usize {
    let id = nodes.len();
    nodes.push(FlatNode::Leaf);

    if node.is_leaf() {
        return id;
    }

    let children = node.children();
    if let (Some(left), Some(right)) = (children[0].as_ref(), children[1].as_ref()) {
        let (feature, threshold, _) = node.split();
        let left = push_node(nodes, left);
        let right = push_node(nodes, right);
        nodes[id] = FlatNode::Split {
            feature,
            threshold,
            left,
            right,
        };
    }

    id
}

impl<F: Float> TreeStructure<F> for FlatTree<F> {
    fn root(&self) -> usize {
        0
    }

    fn is_leaf(&self, node: usize) -> bool {
        matches!(self.nodes[node], FlatNode::Leaf)
    }

    fn feature_at(&self, node: usize) -> usize {
        self.split(node).0
    }

    fn threshold_at(&self, node: usize) -> F {
        self.split(node).1
    }

    fn left_child(&self, node: usize) -> usize {
        self.split(node).2
    }

    fn right_child(&self, node: usize) -> usize {
        self.split(node).3
    }
}

/// Returns one rule per leaf of `tree`, leaves ordered left to right
///
/// ### Parameters
///
/// * `tree`: the fitted tree
/// * `features`: global column of each feature the tree was trained on, the tree's feature
///   `i` is column `features[i]` of the full matrix
/// * `feature_names`: names of every column of the full matrix
///
pub fn tree_to_rules<F: Float, T: TreeStructure<F>>(
    tree: &T,
    features: &[usize],
    feature_names: &[String],
) -> Vec<Rule<F>> {
    let mut rules = Vec::new();
    let mut stack = vec![(tree.root(), Vec::new())];

    while let Some((node, path)) = stack.pop() {
        if tree.is_leaf(node) {
            let rule = if path.is_empty() {
                Rule::tautology(&feature_names[features[0]])
            } else {
                Rule::from_path(path, feature_names)
            };
            rules.push(rule);
            continue;
        }

        let feature = features[tree.feature_at(node)];
        let threshold = tree.threshold_at(node);

        let mut right = path.clone();
        right.push(Condition::new(feature, Operator::Greater, threshold));
        let mut left = path;
        left.push(Condition::new(feature, Operator::LessOrEqual, threshold));

        // left is popped first
        stack.push((tree.right_child(node), right));
        stack.push((tree.left_child(node), left));
    }

    rules
}

/// Like [`tree_to_rules`] but keeps only the first occurrence of each rule
pub(crate) fn distinct_rules<F: Float, T: TreeStructure<F>>(
    tree: &T,
    features: &[usize],
    feature_names: &[String],
) -> Vec<Rule<F>> {
    let mut seen = HashSet::new();
    tree_to_rules(tree, features, feature_names)
        .into_iter()
        .filter(|rule| seen.insert(rule.text().to_string()))
        .collect()
}
