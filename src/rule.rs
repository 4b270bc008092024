//! Rules, their out-of-bag statistics and the ranked rule book
//!
use std::fmt;
use std::hash::{Hash, Hasher};

use linfa::Float;
use ndarray::{Array1, ArrayBase, Data, Ix1, Ix2};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Comparison applied by a single condition of a rule
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    /// `feature <= threshold`, taken when descending to the left child
    LessOrEqual,
    /// `feature > threshold`, taken when descending to the right child
    Greater,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::LessOrEqual => "<=",
            Operator::Greater => ">",
        }
    }

    fn holds<F: Float>(&self, value: F, threshold: F) -> bool {
        match self {
            Operator::LessOrEqual => value <= threshold,
            Operator::Greater => value > threshold,
        }
    }
}

/// An atomic `feature <op> threshold` test
///
/// `feature` is a column index of the full feature matrix the rules were fitted on.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Condition<F> {
    pub feature: usize,
    pub op: Operator,
    pub threshold: F,
}

impl<F: Float> Condition<F> {
    pub fn new(feature: usize, op: Operator, threshold: F) -> Self {
        Condition {
            feature,
            op,
            threshold,
        }
    }

    /// Renders the condition with a human readable feature name
    pub fn render(&self, name: &str) -> String {
        format!("{} {} {}", name, self.op.symbol(), self.threshold)
    }

    pub fn holds<D: Data<Elem = F>>(&self, row: &ArrayBase<D, Ix1>) -> bool {
        self.op.holds(row[self.feature], self.threshold)
    }
}

/// A conjunction of conditions collected along one root-to-leaf path of a tree
///
/// Two rules are considered the same rule when their textual forms are equal. Logically
/// equivalent conjunctions written in a different order are distinct rules.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug)]
pub struct Rule<F> {
    conditions: Vec<Condition<F>>,
    text: String,
}

impl<F: Float> Rule<F> {
    /// Builds a rule from path conditions, naming features through `feature_names`
    /// (indexed by global column). An empty path gives the tautology rule.
    pub fn from_path(conditions: Vec<Condition<F>>, feature_names: &[String]) -> Self {
        let text = conditions
            .iter()
            .map(|cond| cond.render(&feature_names[cond.feature]))
            .collect::<Vec<_>>()
            .join(" and ");

        Rule { conditions, text }
    }

    /// The rule selecting every row, written `name==name`
    pub fn tautology(name: &str) -> Self {
        Rule {
            conditions: Vec::new(),
            text: format!("{}=={}", name, name),
        }
    }

    pub fn conditions(&self) -> &[Condition<F>] {
        &self.conditions
    }

    /// Canonical textual form, used as the identity of the rule
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_tautology(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Whether a single observation satisfies every condition
    pub fn matches<D: Data<Elem = F>>(&self, row: &ArrayBase<D, Ix1>) -> bool {
        self.conditions.iter().all(|cond| cond.holds(row))
    }

    /// Boolean mask of the rows of `x` selected by the rule
    pub fn mask<D: Data<Elem = F>>(&self, x: &ArrayBase<D, Ix2>) -> Array1<bool> {
        x.rows().into_iter().map(|row| self.matches(&row)).collect()
    }
}

impl<F> PartialEq for Rule<F> {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl<F> Eq for Rule<F> {}

impl<F> Hash for Rule<F> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl<F> fmt::Display for Rule<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Out-of-bag performance of a rule, averaged over every tree that produced it
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RuleStats<F> {
    pub precision: F,
    pub recall: F,
    /// Number of trees whose evaluation of the rule passed the selection thresholds
    pub count: usize,
}

impl<F: Float> RuleStats<F> {
    pub fn new(precision: F, recall: F) -> Self {
        RuleStats {
            precision,
            recall,
            count: 1,
        }
    }

    /// Folds one more observation into the running means
    pub fn update(&mut self, precision: F, recall: F) {
        self.count += 1;
        let count = F::cast(self.count);
        self.precision += (precision - self.precision) / count;
        self.recall += (recall - self.recall) / count;
    }
}

/// The ranked, deduplicated rules of a fitted model
///
/// Entries are ordered by decreasing precision, then decreasing recall.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct RuleBook<F> {
    entries: Vec<(Rule<F>, RuleStats<F>)>,
}

impl<F: Float> RuleBook<F> {
    pub(crate) fn new(entries: Vec<(Rule<F>, RuleStats<F>)>) -> Self {
        RuleBook { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&(Rule<F>, RuleStats<F>)> {
        self.entries.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (Rule<F>, RuleStats<F>)> {
        self.entries.iter()
    }

    /// The `n` best ranked entries, or all of them if there are fewer
    pub fn top(&self, n: usize) -> &[(Rule<F>, RuleStats<F>)] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// `(rule, precision, recall, count)` tuples in rank order
    pub fn to_tuples(&self) -> Vec<(String, F, F, usize)> {
        self.entries
            .iter()
            .map(|(rule, stats)| {
                (
                    rule.text().to_string(),
                    stats.precision,
                    stats.recall,
                    stats.count,
                )
            })
            .collect()
    }
}

impl<'a, F> IntoIterator for &'a RuleBook<F> {
    type Item = &'a (Rule<F>, RuleStats<F>);
    type IntoIter = std::slice::Iter<'a, (Rule<F>, RuleStats<F>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<F: Float> fmt::Display for RuleBook<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (rule, stats) in &self.entries {
            writeln!(
                f,
                "{} (precision: {:.3}, recall: {:.3}, count: {})",
                rule, stats.precision, stats.recall, stats.count
            )?;
        }
        Ok(())
    }
}
