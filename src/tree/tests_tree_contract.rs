// =========================================================================
// Tree prediction contract: determinism, distribution conservation,
// missing-value strategy semantics, and the one-branch heuristic.
// =========================================================================

use super::tests::{age_fields, age_tree_definition};
use super::*;
use crate::fields::Field;
use serde_json::json;

fn record(pairs: &[(&str, Value)]) -> Record {
    let mut record = Record::new();
    for (field, value) in pairs {
        record.insert((*field).to_string(), value.clone());
    }
    record
}

/// Two numeric fields so a deeper tree can split twice.
fn two_field_dictionary() -> FieldDictionary {
    let mut fields = FieldDictionary::new();
    fields.insert(Field::new("000000", "age", OpType::Numeric));
    fields.insert(Field::new("000001", "weight", OpType::Numeric));
    fields
}

/// Root splits on age; the young branch splits again on weight.
fn two_level_definition() -> Value {
    json!({
        "predicate": true,
        "count": 10,
        "output": "light",
        "distribution": [["light", 5], ["heavy", 3], ["old", 2]],
        "children": [
            {"predicate": {"operator": "<", "field": "000000", "value": 30},
             "output": "light", "count": 8, "confidence": 0.5,
             "distribution": [["light", 5], ["heavy", 3]],
             "children": [
                 {"predicate": {"operator": "<", "field": "000001", "value": 70},
                  "output": "light", "count": 5, "confidence": 0.6,
                  "distribution": [["light", 5]], "children": []},
                 {"predicate": {"operator": ">=", "field": "000001", "value": 70},
                  "output": "heavy", "count": 3, "confidence": 0.4,
                  "distribution": [["heavy", 3]], "children": []}
             ]},
            {"predicate": {"operator": ">=", "field": "000000", "value": 30},
             "output": "old", "count": 2, "confidence": 0.3,
             "distribution": [["old", 2]], "children": []}
        ]
    })
}

#[test]
fn identical_inputs_yield_identical_predictions() {
    let tree =
        Tree::from_definition(&age_tree_definition(), age_fields(), None).expect("valid tree");
    for strategy in [MissingStrategy::LastPrediction, MissingStrategy::Proportional] {
        let input = record(&[("000000", json!(25))]);
        let first = tree.predict(&input, strategy).expect("prediction");
        let second = tree.predict(&input, strategy).expect("prediction");
        assert_eq!(first, second);
    }
}

#[test]
fn proportional_conserves_root_count() {
    let tree =
        Tree::from_definition(&two_level_definition(), two_field_dictionary(), None)
            .expect("valid tree");
    let prediction = tree
        .predict(&Record::new(), MissingStrategy::Proportional)
        .expect("prediction");
    assert_eq!(prediction.count, tree.root().count);
    assert_eq!(prediction.distribution.total(), tree.root().count);
}

#[test]
fn one_branch_holds_when_input_contains_split_field() {
    // The heuristic checks input presence even under proportional mode:
    // with age present only the matching subtree is visited, so its
    // weights never mix with the sibling branch.
    let tree =
        Tree::from_definition(&two_level_definition(), two_field_dictionary(), None)
            .expect("valid tree");
    let prediction = tree
        .predict(&record(&[("000000", json!(50))]), MissingStrategy::Proportional)
        .expect("prediction");
    assert_eq!(prediction.prediction, NodeOutput::Label("old".to_string()));
    assert_eq!(prediction.count, 2.0);
    assert_eq!(prediction.path, vec!["age >= 30"]);
}

#[test]
fn fan_out_resumes_single_branch_below() {
    // age missing -> fan out at the root; weight present -> the young
    // subtree descends a single branch while the old leaf contributes
    // its whole distribution. Path strings are suppressed once fan-out
    // has happened.
    let tree =
        Tree::from_definition(&two_level_definition(), two_field_dictionary(), None)
            .expect("valid tree");
    let prediction = tree
        .predict(&record(&[("000001", json!(80))]), MissingStrategy::Proportional)
        .expect("prediction");
    assert!(prediction.path.is_empty());
    assert_eq!(prediction.count, 5.0); // heavy 3 + old 2
    match &prediction.distribution {
        Distribution::Categorical(entries) => {
            assert_eq!(entries[0], ("heavy".to_string(), 3.0));
            assert_eq!(entries[1], ("old".to_string(), 2.0));
        }
        Distribution::Numeric(_) => panic!("expected categorical distribution"),
    }
}

#[test]
fn missing_branch_flag_forces_single_branch() {
    // A child predicate carrying the missing flag makes the split
    // decidable even for an absent value.
    let fields = age_fields();
    let definition = json!({
        "predicate": true,
        "count": 10,
        "output": "young",
        "distribution": [["young", 6], ["old", 4]],
        "children": [
            {"predicate": {"operator": "<*", "field": "000000", "value": 30},
             "output": "young", "count": 6, "confidence": 0.55,
             "distribution": [["young", 6]], "children": []},
            {"predicate": {"operator": ">=", "field": "000000", "value": 30},
             "output": "old", "count": 4, "confidence": 0.45,
             "distribution": [["old", 4]], "children": []}
        ]
    });
    let tree = Tree::from_definition(&definition, fields, None).expect("valid tree");
    let prediction = tree
        .predict(&Record::new(), MissingStrategy::Proportional)
        .expect("prediction");
    // the missing-friendly branch answers alone
    assert_eq!(prediction.count, 6.0);
    assert_eq!(prediction.path, vec!["age < 30 or missing"]);
}

#[test]
fn null_comparison_child_forces_single_branch() {
    let fields = age_fields();
    let definition = json!({
        "predicate": true,
        "count": 10,
        "output": "known",
        "distribution": [["known", 7], ["unknown", 3]],
        "children": [
            {"predicate": {"operator": "=", "field": "000000", "value": null},
             "output": "unknown", "count": 3, "confidence": 0.3,
             "distribution": [["unknown", 3]], "children": []},
            {"predicate": {"operator": "!=", "field": "000000", "value": null},
             "output": "known", "count": 7, "confidence": 0.7,
             "distribution": [["known", 7]], "children": []}
        ]
    });
    let tree = Tree::from_definition(&definition, fields, None).expect("valid tree");
    let prediction = tree
        .predict(&Record::new(), MissingStrategy::Proportional)
        .expect("prediction");
    assert_eq!(prediction.prediction, NodeOutput::Label("unknown".to_string()));
    assert_eq!(prediction.path, vec!["age is missing"]);
}

fn regression_definition() -> Value {
    // 40 distinct bins per leaf so the merged distribution overflows
    // the bin limit.
    let left_bins: Vec<Value> = (0..40).map(|i| json!([i as f64, 1.0])).collect();
    let right_bins: Vec<Value> = (0..40).map(|i| json!([100.0 + i as f64, 1.0])).collect();
    json!({
        "predicate": true,
        "count": 80,
        "output": 60.0,
        "distribution": [[50.0, 80.0]],
        "children": [
            {"predicate": {"operator": "<", "field": "000000", "value": 30},
             "output": 19.5, "count": 40, "confidence": 2.0,
             "distribution": left_bins, "children": []},
            {"predicate": {"operator": ">=", "field": "000000", "value": 30},
             "output": 119.5, "count": 40, "confidence": 2.0,
             "distribution": right_bins, "children": []}
        ]
    })
}

#[test]
fn regression_fan_out_caps_bins_and_preserves_weight() {
    let tree =
        Tree::from_definition(&regression_definition(), age_fields(), None).expect("valid tree");
    let prediction = tree
        .predict(&Record::new(), MissingStrategy::Proportional)
        .expect("prediction");
    match &prediction.distribution {
        Distribution::Numeric(bins) => {
            assert!(bins.len() <= stats::BINS_LIMIT);
            let total: f64 = bins.iter().map(|(_, w)| w).sum();
            assert!((total - 80.0).abs() < 1e-9);
        }
        Distribution::Categorical(_) => panic!("expected numeric distribution"),
    }
    // the prediction is the weighted mean of the merged bins
    let mean = prediction.prediction.as_f64().expect("numeric prediction");
    assert!((mean - 69.5).abs() < 1e-9);
    // and the median lies inside the observed value range
    let median = prediction.median.expect("median");
    assert!((0.0..=139.0).contains(&median));
    // regression error is defined here
    let confidence = prediction.confidence.expect("confidence");
    assert!(confidence.is_finite() && confidence > 0.0);
}

#[test]
fn regression_singular_aggregate_answers_from_leaf() {
    let fields = age_fields();
    let definition = json!({
        "predicate": true,
        "count": 1,
        "output": 5.0,
        "distribution": [[5.0, 1.0]],
        "children": [
            {"predicate": {"operator": "<", "field": "000000", "value": 30},
             "output": 0.0, "count": 0, "distribution": [], "children": []},
            {"predicate": {"operator": ">=", "field": "000000", "value": 30},
             "output": 5.0, "count": 1, "confidence": 0.9, "median": 5.0,
             "distribution": [[5.0, 1.0]], "children": []}
        ]
    });
    let tree = Tree::from_definition(&definition, fields, None).expect("valid tree");
    let prediction = tree
        .predict(&Record::new(), MissingStrategy::Proportional)
        .expect("prediction");
    // one instance total: the answering leaf's own values verbatim
    assert_eq!(prediction.prediction, NodeOutput::Numeric(5.0));
    assert_eq!(prediction.confidence, Some(0.9));
    assert_eq!(prediction.median, Some(5.0));
    assert_eq!(prediction.count, 1.0);
}

#[test]
fn classification_confidence_within_unit_interval() {
    let tree =
        Tree::from_definition(&two_level_definition(), two_field_dictionary(), None)
            .expect("valid tree");
    for input in [
        Record::new(),
        record(&[("000000", json!(20)), ("000001", json!(60))]),
        record(&[("000001", json!(90))]),
    ] {
        let prediction = tree
            .predict(&input, MissingStrategy::Proportional)
            .expect("prediction");
        let confidence = prediction.confidence.expect("confidence");
        assert!((0.0..=1.0).contains(&confidence), "got {confidence}");
    }
}

mod tree_proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prediction_is_deterministic(age in -50.0..150.0f64) {
            let tree = Tree::from_definition(&age_tree_definition(), age_fields(), None)
                .expect("valid tree");
            let input = record(&[("000000", json!(age))]);
            let first = tree.predict(&input, MissingStrategy::LastPrediction).expect("prediction");
            let second = tree.predict(&input, MissingStrategy::LastPrediction).expect("prediction");
            prop_assert_eq!(first, second);
        }

        #[test]
        fn last_prediction_matches_threshold(age in -50.0..150.0f64) {
            let tree = Tree::from_definition(&age_tree_definition(), age_fields(), None)
                .expect("valid tree");
            let input = record(&[("000000", json!(age))]);
            let prediction = tree.predict(&input, MissingStrategy::LastPrediction)
                .expect("prediction");
            let expected = if age < 30.0 { "young" } else { "old" };
            prop_assert_eq!(prediction.prediction.as_label(), Some(expected));
        }

        #[test]
        fn proportional_confidence_bounded(weight in 0.0..200.0f64) {
            let tree = Tree::from_definition(&two_level_definition(), two_field_dictionary(), None)
                .expect("valid tree");
            let input = record(&[("000001", json!(weight))]);
            let prediction = tree.predict(&input, MissingStrategy::Proportional)
                .expect("prediction");
            let confidence = prediction.confidence.expect("confidence");
            prop_assert!((0.0..=1.0).contains(&confidence));
        }
    }
}
