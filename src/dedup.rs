//! Removal of rules selecting nearly the same rows as a better ranked rule
//!
use linfa::Float;
use ndarray::{Array1, ArrayBase, Data, Ix2};

use crate::rule::{Rule, RuleStats};

/// Rows matched by each ranked rule on the training matrix
///
/// Masks are computed lazily, in rank order, and only for rules that get compared.
struct CoverageIndex<'a, D: Data> {
    x: &'a ArrayBase<D, Ix2>,
    masks: Vec<Array1<bool>>,
}

impl<'a, F: Float, D: Data<Elem = F>> CoverageIndex<'a, D> {
    fn new(x: &'a ArrayBase<D, Ix2>, capacity: usize) -> Self {
        CoverageIndex {
            x,
            masks: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, rule: &Rule<F>) -> usize {
        self.masks.push(rule.mask(self.x));
        self.masks.len() - 1
    }

    fn jaccard(&self, a: usize, b: usize) -> f64 {
        jaccard(&self.masks[a], &self.masks[b])
    }
}

/// Jaccard similarity `|a ∩ b| / |a ∪ b|` of two row masks, zero for two empty masks
pub fn jaccard(a: &Array1<bool>, b: &Array1<bool>) -> f64 {
    let (intersection, union) = a
        .iter()
        .zip(b.iter())
        .fold((0usize, 0usize), |(inter, union), (&x, &y)| {
            (inter + usize::from(x && y), union + usize::from(x || y))
        });

    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Drops every rule whose coverage on `x` has a Jaccard similarity above
/// `similarity_thres` with a retained, better ranked rule
///
/// `ranked` must be sorted best first. The best rule is always retained, and omitted rules
/// take no part in later comparisons.
pub fn deduplicate<F: Float, D: Data<Elem = F>>(
    ranked: Vec<(Rule<F>, RuleStats<F>)>,
    x: &ArrayBase<D, Ix2>,
    similarity_thres: f64,
) -> Vec<(Rule<F>, RuleStats<F>)> {
    let mut coverage = CoverageIndex::new(x, ranked.len());
    // coverage slot of each retained rule
    let mut retained: Vec<usize> = Vec::with_capacity(ranked.len());
    let mut keep = vec![false; ranked.len()];

    for (i, (rule, _)) in ranked.iter().enumerate() {
        let current = coverage.push(rule);
        let redundant = retained
            .iter()
            .any(|&rival| coverage.jaccard(rival, current) > similarity_thres);

        if !redundant {
            retained.push(current);
            keep[i] = true;
        }
    }

    ranked
        .into_iter()
        .zip(keep)
        .filter_map(|(entry, keep)| if keep { Some(entry) } else { None })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::rule::{Condition, Operator};
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    fn x_gt(threshold: f64, precision: f64) -> (Rule<f64>, RuleStats<f64>) {
        (
            Rule::from_path(
                vec![Condition::new(0, Operator::Greater, threshold)],
                &["x".to_string()],
            ),
            RuleStats::new(precision, 0.5),
        )
    }

    fn data() -> Array2<f64> {
        Array2::from_shape_vec((100, 1), (0..100).map(f64::from).collect()).unwrap()
    }

    fn texts(rules: &[(Rule<f64>, RuleStats<f64>)]) -> Vec<&str> {
        rules.iter().map(|(r, _)| r.text()).collect()
    }

    #[test]
    fn jaccard_of_masks() {
        let a = array![true, true, false, false];
        let b = array![false, true, true, false];
        assert_abs_diff_eq!(jaccard(&a, &b), 1.0 / 3.0);
        assert_abs_diff_eq!(jaccard(&a, &a), 1.0);

        let empty = array![false, false, false, false];
        assert_abs_diff_eq!(jaccard(&empty, &empty), 0.0);
    }

    #[test]
    fn identical_coverage_keeps_the_better_rule() {
        // both select rows 50..100
        let ranked = vec![x_gt(49.5, 0.9), x_gt(49.2, 0.8)];
        let kept = deduplicate(ranked, &data(), 0.99);

        assert_eq!(texts(&kept), vec!["x > 49.5"]);
    }

    #[test]
    fn near_duplicates_are_removed_distinct_rules_kept() {
        // 50 rows, 49 rows (similarity 0.98), 10 rows (similarity 0.2)
        let ranked = vec![x_gt(49.5, 0.9), x_gt(50.5, 0.8), x_gt(89.5, 0.7)];

        let kept = deduplicate(ranked.clone(), &data(), 0.95);
        assert_eq!(texts(&kept), vec!["x > 49.5", "x > 89.5"]);

        let kept = deduplicate(ranked, &data(), 0.99);
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn omitted_rules_do_not_remove_others() {
        // the second rule is dropped against the first one; the third rule is close to
        // the second (0.98) but not to the first (0.96)
        let ranked = vec![x_gt(49.5, 0.9), x_gt(50.5, 0.8), x_gt(51.5, 0.7)];
        let kept = deduplicate(ranked, &data(), 0.97);

        assert_eq!(texts(&kept), vec!["x > 49.5", "x > 51.5"]);
    }

    #[test]
    fn threshold_of_one_disables_deduplication() {
        let ranked = vec![x_gt(49.5, 0.9), x_gt(49.2, 0.8), x_gt(48.7, 0.7)];
        let kept = deduplicate(ranked, &data(), 1.0);

        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn best_rule_always_survives() {
        let ranked = vec![x_gt(-1.0, 0.9), x_gt(-2.0, 0.8), x_gt(-3.0, 0.7)];
        let kept = deduplicate(ranked, &data(), 0.01);

        assert_eq!(texts(&kept), vec!["x > -1"]);
        assert!(deduplicate(Vec::new(), &data(), 0.5).is_empty());
    }
}
