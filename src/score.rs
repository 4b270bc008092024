//! Scoring of observations with the rules of a fitted model
//!
//! All scores only use the `n_rules` best ranked rules of the rule book.
use linfa::Float;
use ndarray::{Array1, ArrayBase, Data, Ix2, Zip};

use crate::rule::RuleBook;

/// Adds one per matching rule
///
/// Every rule counts the same, the rule precision is not used as a weight.
pub fn weighted_score<F: Float, D: Data<Elem = F>>(
    rules: &RuleBook<F>,
    n_rules: usize,
    x: &ArrayBase<D, Ix2>,
) -> Array1<F> {
    let mut scores = Array1::zeros(x.nrows());
    for (rule, _) in rules.top(n_rules) {
        Zip::from(&mut scores)
            .and(&rule.mask(x))
            .for_each(|score, &hit| {
                if hit {
                    *score += F::one();
                }
            });
    }

    scores
}

/// Number of rules voting for each observation
pub fn vote_score<F: Float, D: Data<Elem = F>>(
    rules: &RuleBook<F>,
    n_rules: usize,
    x: &ArrayBase<D, Ix2>,
) -> Array1<F> {
    let mut votes = Array1::<usize>::zeros(x.nrows());
    for (rule, _) in rules.top(n_rules) {
        votes += &rule.mask(x).mapv(usize::from);
    }

    votes.mapv(F::cast)
}

/// Rank based score
///
/// Rules are visited best first and every observation they match takes the maximum of its
/// current score and the rank of the rule, so scores stay below `n_rules`.
pub fn ordered_score<F: Float, D: Data<Elem = F>>(
    rules: &RuleBook<F>,
    n_rules: usize,
    x: &ArrayBase<D, Ix2>,
) -> Array1<F> {
    let mut scores = Array1::zeros(x.nrows());
    for (rank, (rule, _)) in rules.top(n_rules).iter().enumerate() {
        let rank = F::cast(rank);
        Zip::from(&mut scores)
            .and(&rule.mask(x))
            .for_each(|score: &mut F, &hit| {
                if hit && rank > *score {
                    *score = rank;
                }
            });
    }

    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::rule::{Condition, Operator, Rule, RuleStats};
    use ndarray::{array, Array2};

    fn book() -> RuleBook<f64> {
        let names = ["x".to_string()];
        let rule = |op: Operator, threshold: f64| {
            Rule::from_path(vec![Condition::new(0, op, threshold)], &names)
        };

        RuleBook::new(vec![
            (rule(Operator::Greater, 7.5), RuleStats::new(1.0, 0.5)),
            (rule(Operator::Greater, 5.5), RuleStats::new(0.9, 1.0)),
            (rule(Operator::LessOrEqual, 1.5), RuleStats::new(0.6, 0.2)),
        ])
    }

    fn data() -> Array2<f64> {
        Array2::from_shape_vec((10, 1), (0..10).map(f64::from).collect()).unwrap()
    }

    #[test]
    fn weighted_counts_matching_rules() {
        let scores = weighted_score(&book(), 3, &data());
        assert_eq!(scores, array![1., 1., 0., 0., 0., 0., 1., 1., 2., 2.]);
    }

    #[test]
    fn votes_use_only_the_best_rules() {
        let votes = vote_score(&book(), 2, &data());
        assert_eq!(votes, array![0., 0., 0., 0., 0., 0., 1., 1., 2., 2.]);

        let all = vote_score(&book(), 10, &data());
        assert_eq!(all, weighted_score(&book(), 10, &data()));
    }

    #[test]
    fn ordered_score_keeps_highest_rank() {
        let scores = ordered_score(&book(), 3, &data());
        assert_eq!(scores, array![2., 2., 0., 0., 0., 0., 1., 1., 1., 1.]);
    }

    #[test]
    fn ordered_score_is_bounded() {
        for n_rules in 1..5 {
            let scores = ordered_score(&book(), n_rules, &data());
            let bound = (n_rules - 1) as f64;
            assert!(scores.iter().all(|&s| s <= bound));
        }
    }
}
