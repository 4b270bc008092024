//! Merging of the rules produced by many trees
//!
use std::cmp::Ordering;
use std::collections::HashMap;

use linfa::Float;

use crate::rule::{Rule, RuleStats};

/// Collects `(rule, precision, recall)` evaluations and keeps a running mean per rule
///
/// Evaluations below `precision_min` or `recall_min` are dropped. Rules are kept in the
/// order they were first seen, which is the tie-break order of [`into_ranked`].
///
/// [`into_ranked`]: RuleAggregator::into_ranked
#[derive(Clone, Debug)]
pub struct RuleAggregator<F> {
    precision_min: F,
    recall_min: F,
    slots: HashMap<String, usize>,
    rules: Vec<(Rule<F>, RuleStats<F>)>,
}

impl<F: Float> RuleAggregator<F> {
    pub fn new(precision_min: F, recall_min: F) -> Self {
        RuleAggregator {
            precision_min,
            recall_min,
            slots: HashMap::new(),
            rules: Vec::new(),
        }
    }

    /// Folds one evaluation into the statistics of `rule`, returns `false` if it was
    /// filtered out
    pub fn push(&mut self, rule: Rule<F>, precision: F, recall: F) -> bool {
        if precision < self.precision_min || recall < self.recall_min {
            return false;
        }

        match self.slots.get(rule.text()) {
            Some(&slot) => self.rules[slot].1.update(precision, recall),
            None => {
                self.slots.insert(rule.text().to_string(), self.rules.len());
                self.rules.push((rule, RuleStats::new(precision, recall)));
            }
        }

        true
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, rule: &str) -> Option<&RuleStats<F>> {
        self.slots.get(rule).map(|&slot| &self.rules[slot].1)
    }

    /// Rules sorted by decreasing precision, then decreasing recall
    pub fn into_ranked(self) -> Vec<(Rule<F>, RuleStats<F>)> {
        let mut rules = self.rules;
        rules.sort_by(|(_, a), (_, b)| {
            b.precision
                .partial_cmp(&a.precision)
                .unwrap_or(Ordering::Equal)
                .then(b.recall.partial_cmp(&a.recall).unwrap_or(Ordering::Equal))
        });
        rules
    }
}

impl<F: Float> Extend<(Rule<F>, (F, F))> for RuleAggregator<F> {
    fn extend<I: IntoIterator<Item = (Rule<F>, (F, F))>>(&mut self, iter: I) {
        for (rule, (precision, recall)) in iter {
            self.push(rule, precision, recall);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::rule::{Condition, Operator};
    use approx::assert_abs_diff_eq;

    fn rule(threshold: f64) -> Rule<f64> {
        Rule::from_path(
            vec![Condition::new(0, Operator::Greater, threshold)],
            &["x".to_string()],
        )
    }

    #[test]
    fn identical_evaluations_keep_their_mean() {
        let mut agg = RuleAggregator::new(0.5, 0.01);
        agg.push(rule(1.0), 0.75, 0.25);
        agg.push(rule(1.0), 0.75, 0.25);

        assert_eq!(agg.len(), 1);
        let stats = agg.get("x > 1").unwrap();
        assert_eq!(stats.count, 2);
        assert_abs_diff_eq!(stats.precision, 0.75);
        assert_abs_diff_eq!(stats.recall, 0.25);
    }

    #[test]
    fn running_mean_over_trees() {
        let mut agg = RuleAggregator::new(0.5, 0.01);
        agg.extend(vec![
            (rule(1.0), (0.6, 0.3)),
            (rule(1.0), (1.0, 0.1)),
            (rule(1.0), (0.8, 0.2)),
        ]);

        let stats = agg.get("x > 1").unwrap();
        assert_eq!(stats.count, 3);
        assert_abs_diff_eq!(stats.precision, 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.recall, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn thresholds_filter_each_evaluation() {
        let mut agg = RuleAggregator::new(0.5, 0.1);

        assert!(!agg.push(rule(1.0), 0.4, 0.9));
        assert!(!agg.push(rule(1.0), 0.9, 0.05));
        assert!(agg.is_empty());

        // thresholds are inclusive, and a filtered evaluation does not count
        assert!(agg.push(rule(1.0), 0.5, 0.1));
        assert!(!agg.push(rule(1.0), 0.2, 0.2));
        assert_eq!(agg.get("x > 1").unwrap().count, 1);
    }

    #[test]
    fn ranked_by_precision_then_recall() {
        let mut agg = RuleAggregator::new(0.0, 0.0);
        agg.push(rule(1.0), 0.7, 0.9);
        agg.push(rule(2.0), 0.9, 0.1);
        agg.push(rule(3.0), 0.7, 0.95);
        agg.push(rule(4.0), 0.7, 0.9);

        let ranked: Vec<_> = agg
            .into_ranked()
            .into_iter()
            .map(|(r, _)| r.text().to_string())
            .collect();

        // ties keep discovery order
        assert_eq!(ranked, vec!["x > 2", "x > 3", "x > 1", "x > 4"]);
    }
}
