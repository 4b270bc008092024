use std::error::Error;

use linfa::prelude::*;
use linfa_rules::{SkopeRules, SubsetSize};
use ndarray::Array1;

// Learns rules describing the very good wines, rated above 6
fn main() -> std::result::Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_writer(std::io::stderr)
        .init();

    let (train, valid) = linfa_datasets::winequality()
        .map_targets(|q| usize::from(*q > 6))
        .split_with_ratio(0.8);

    println!(
        "Fitting rules on {} wines, validating on {}",
        train.nsamples(),
        valid.nsamples()
    );

    let model = SkopeRules::params()
        .feature_names(train.feature_names())
        .precision_min(0.5)
        .recall_min(0.02)
        .n_estimators(30)
        .similarity_thres(0.9)
        .max_samples_features(SubsetSize::Fraction(0.5))
        .max_depth(Some(3))
        .random_state(Some(42))
        .fit(&train)?;

    println!("{} rules have been built", model.rules().len());
    println!("The most precise rules are the following:");
    for (rule, stats) in model.rules().top(5) {
        println!(
            "  {} (precision: {:.2}, recall: {:.2}, trees: {})",
            rule, stats.precision, stats.recall, stats.count
        );
    }

    let truth = valid.targets().mapv(|q| q == 1);
    let mut flagged = Array1::from_elem(valid.nsamples(), false);

    println!("Validation performance of the union of the first k rules:");
    for (k, (rule, _)) in model.rules().top(5).iter().enumerate() {
        flagged.zip_mut_with(&rule.mask(valid.records()), |f, &hit| *f |= hit);

        let cm = flagged.confusion_matrix(truth.view())?;
        println!(
            "  k = {}: precision {:.3}, recall {:.3}",
            k + 1,
            cm.precision(),
            cm.recall()
        );
    }

    let ordered = model.separate_rule_score(valid.records())?;
    println!(
        "{} validation wines are matched by a rule ranked below the first",
        ordered.iter().filter(|&&s| s > 0.).count()
    );

    let predicted = model.predict(&valid);
    let cm = predicted.confusion_matrix(truth.view())?;
    println!("{:?}", cm);
    println!("accuracy {:.3}, MCC {:.3}", cm.accuracy(), cm.mcc());

    Ok(())
}
