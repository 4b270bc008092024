//! Out-of-bag evaluation of candidate rules
//!
use linfa::Float;
use ndarray::{Array1, ArrayBase, ArrayView1, Data, Ix2};

use crate::rule::Rule;

/// The rules derived from one tree together with the rows they are evaluated on
#[derive(Clone, Debug)]
pub struct CandidateSet<F> {
    pub rules: Vec<Rule<F>>,
    /// Rows the originating tree did not see, or its in-bag rows when it saw every row
    pub eval_mask: Array1<bool>,
    /// Whether `eval_mask` had to fall back to the in-bag rows
    pub in_bag: bool,
}

impl<F: Float> CandidateSet<F> {
    /// Pairs `rules` with the out-of-bag complement of `in_bag_mask`
    ///
    /// Falls back to the in-bag rows if no row is out-of-bag.
    pub fn new(rules: Vec<Rule<F>>, in_bag_mask: &Array1<bool>) -> Self {
        let oob = in_bag_mask.mapv(|in_bag| !in_bag);
        if oob.iter().any(|&m| m) {
            CandidateSet {
                rules,
                eval_mask: oob,
                in_bag: false,
            }
        } else {
            CandidateSet {
                rules,
                eval_mask: in_bag_mask.clone(),
                in_bag: true,
            }
        }
    }

    /// Precision and recall of every rule, in rule order
    pub fn evaluate<D: Data<Elem = F>>(
        &self,
        x: &ArrayBase<D, Ix2>,
        y: ArrayView1<bool>,
    ) -> Vec<(Rule<F>, (F, F))> {
        self.rules
            .iter()
            .map(|rule| {
                let perf = evaluate_rule(rule, x, y, self.eval_mask.view());
                (rule.clone(), perf)
            })
            .collect()
    }
}

/// Computes `(precision, recall)` of `rule` used as a binary classifier on the rows selected
/// by `mask`
///
/// A rule matching at most one row, or no positive row, scores `(0, 0)`. Recall is relative
/// to the positive rows inside `mask`.
///
/// # Panics
///
/// Panics if `x`, `y` and `mask` differ in their number of rows.
pub fn evaluate_rule<F: Float, D: Data<Elem = F>>(
    rule: &Rule<F>,
    x: &ArrayBase<D, Ix2>,
    y: ArrayView1<bool>,
    mask: ArrayView1<bool>,
) -> (F, F) {
    assert_eq!(
        x.nrows(),
        y.len(),
        "The number of rows in the records and the labels must match"
    );
    assert_eq!(
        y.len(),
        mask.len(),
        "The number of labels and the length of the row mask must match"
    );

    let mut detected = 0usize;
    let mut true_pos = 0usize;
    let mut positives = 0usize;

    for ((row, &label), &selected) in x.rows().into_iter().zip(y.iter()).zip(mask.iter()) {
        if !selected {
            continue;
        }
        if label {
            positives += 1;
        }
        if rule.matches(&row) {
            detected += 1;
            if label {
                true_pos += 1;
            }
        }
    }

    if detected <= 1 || true_pos == 0 {
        return (F::zero(), F::zero());
    }

    (
        F::cast(true_pos) / F::cast(detected),
        F::cast(true_pos) / F::cast(positives),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::rule::{Condition, Operator};
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    fn x_gt(threshold: f64) -> Rule<f64> {
        Rule::from_path(
            vec![Condition::new(0, Operator::Greater, threshold)],
            &["x".to_string()],
        )
    }

    fn data() -> (Array2<f64>, Array1<bool>) {
        let x = Array2::from_shape_vec((10, 1), (0..10).map(f64::from).collect()).unwrap();
        let y = (0..10).map(|v| v > 5).collect();
        (x, y)
    }

    #[test]
    fn perfect_rule() {
        let (x, y) = data();
        let mask = Array1::from_elem(10, true);

        let (precision, recall) = evaluate_rule(&x_gt(5.5), &x, y.view(), mask.view());
        assert_abs_diff_eq!(precision, 1.0);
        assert_abs_diff_eq!(recall, 1.0);
    }

    #[test]
    fn partial_rule() {
        let (x, y) = data();
        let mask = Array1::from_elem(10, true);

        // matches 4..=9, four of them positive out of four positives
        let (precision, recall) = evaluate_rule(&x_gt(3.5), &x, y.view(), mask.view());
        assert_abs_diff_eq!(precision, 4.0 / 6.0);
        assert_abs_diff_eq!(recall, 1.0);

        // matches 8 and 9 only
        let (precision, recall) = evaluate_rule(&x_gt(7.5), &x, y.view(), mask.view());
        assert_abs_diff_eq!(precision, 1.0);
        assert_abs_diff_eq!(recall, 0.5);
    }

    #[test]
    fn recall_is_relative_to_masked_rows() {
        let (x, y) = data();
        // rows 0, 1, 8, 9
        let mask: Array1<bool> = (0..10).map(|i| i < 2 || i > 7).collect();

        let (precision, recall) = evaluate_rule(&x_gt(0.5), &x, y.view(), mask.view());
        assert_abs_diff_eq!(precision, 2.0 / 3.0);
        assert_abs_diff_eq!(recall, 1.0);
    }

    #[test]
    fn degenerate_rules_score_zero() {
        let (x, y) = data();
        let mask = Array1::from_elem(10, true);

        // a single matched row
        assert_eq!(
            evaluate_rule(&x_gt(8.5), &x, y.view(), mask.view()),
            (0.0, 0.0)
        );
        // no match at all
        assert_eq!(
            evaluate_rule(&x_gt(100.), &x, y.view(), mask.view()),
            (0.0, 0.0)
        );
        // matches only negatives
        let negatives = Rule::from_path(
            vec![Condition::new(0, Operator::LessOrEqual, 3.0)],
            &["x".to_string()],
        );
        assert_eq!(
            evaluate_rule(&negatives, &x, y.view(), mask.view()),
            (0.0, 0.0)
        );
    }

    #[test]
    #[should_panic]
    fn short_mask_panics() {
        let (x, y) = data();
        let mask = Array1::from_elem(8, true);

        evaluate_rule(&x_gt(5.5), &x, y.view(), mask.view());
    }

    #[test]
    #[should_panic]
    fn short_labels_panic() {
        let (x, y) = data();
        let mask = Array1::from_elem(9, true);

        evaluate_rule(&x_gt(5.5), &x, y.slice(ndarray::s![..9]), mask.view());
    }

    #[test]
    fn falls_back_to_in_bag_rows() {
        let (x, y) = data();

        let oob = CandidateSet::new(vec![x_gt(5.5)], &array![
            true, true, true, true, true, false, false, true, true, true
        ]);
        assert!(!oob.in_bag);
        assert_eq!(oob.eval_mask.iter().filter(|&&m| m).count(), 2);

        let all_in_bag = CandidateSet::new(vec![x_gt(5.5)], &Array1::from_elem(10, true));
        assert!(all_in_bag.in_bag);
        assert_eq!(all_in_bag.eval_mask, Array1::from_elem(10, true));

        let evaluated = all_in_bag.evaluate(&x, y.view());
        assert_eq!(evaluated.len(), 1);
        assert_eq!(evaluated[0].1, (1.0, 1.0));
    }
}
