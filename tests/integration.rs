//! End-to-end evaluation tests: build models from serialized definitions
//! and score records against them, the way the surrounding SDK would.

use predecir::prelude::*;
use serde_json::{json, Value};

fn record(pairs: &[(&str, Value)]) -> Record {
    let mut record = Record::new();
    for (field, value) in pairs {
        record.insert((*field).to_string(), value.clone());
    }
    record
}

/// A small loan-risk model: numeric split, then a text split on one
/// side, with summary-derived distributions.
fn loan_fields() -> FieldDictionary {
    FieldDictionary::from_value(&json!({
        "000000": {"name": "income", "optype": "numeric"},
        "000001": {
            "name": "notes",
            "optype": "text",
            "term_analysis": {"token_mode": "tokens_only"},
            "summary": {"term_forms": {"default": ["defaulted", "defaults"]}}
        },
        "000002": {"name": "risk", "optype": "categorical",
                   "summary": {"categories": [["low", 60], ["high", 40]]}}
    }))
    .expect("valid field dictionary")
}

fn loan_definition() -> Value {
    json!({
        "predicate": true,
        "id": 0,
        "count": 100,
        "output": "low",
        "objective_summary": {"categories": [["low", 60], ["high", 40]]},
        "children": [
            {"predicate": {"operator": ">=", "field": "000000", "value": 50000},
             "id": 1, "output": "low", "count": 55, "confidence": 0.83,
             "objective_summary": {"categories": [["low", 50], ["high", 5]]},
             "children": []},
            {"predicate": {"operator": "<", "field": "000000", "value": 50000},
             "id": 2, "output": "high", "count": 45, "confidence": 0.62,
             "objective_summary": {"categories": [["low", 10], ["high", 35]]},
             "children": [
                 {"predicate": {"operator": ">", "field": "000001", "value": 0,
                                "term": "default"},
                  "id": 3, "output": "high", "count": 30, "confidence": 0.85,
                  "objective_summary": {"categories": [["high", 28], ["low", 2]]},
                  "children": []},
                 {"predicate": {"operator": "<=", "field": "000001", "value": 0,
                                "term": "default"},
                  "id": 4, "output": "low", "count": 15, "confidence": 0.51,
                  "objective_summary": {"categories": [["low", 8], ["high", 7]]},
                  "children": []}
             ]}
        ]
    })
}

#[test]
fn classification_end_to_end() {
    let tree = Tree::from_definition(&loan_definition(), loan_fields(), None)
        .expect("valid tree");
    assert!(!tree.is_regression());

    // high income descends one level
    let prediction = tree
        .predict(
            &record(&[("000000", json!(80000))]),
            MissingStrategy::LastPrediction,
        )
        .expect("prediction");
    assert_eq!(prediction.prediction.as_label(), Some("low"));
    assert_eq!(prediction.path, vec!["income >= 50000"]);
    assert_eq!(prediction.count, 55.0);

    // low income with a risky note descends two levels, through the
    // term predicate and its synonym forms
    let prediction = tree
        .predict(
            &record(&[
                ("000000", json!(20000)),
                ("000001", json!("customer defaulted twice")),
            ]),
            MissingStrategy::LastPrediction,
        )
        .expect("prediction");
    assert_eq!(prediction.prediction.as_label(), Some("high"));
    assert_eq!(
        prediction.path,
        vec!["income < 50000", "notes contains default"]
    );
    assert_eq!(prediction.probability, Some(28.0 / 30.0));
}

#[test]
fn proportional_merges_and_conserves_weight() {
    let tree = Tree::from_definition(&loan_definition(), loan_fields(), None)
        .expect("valid tree");
    let prediction = tree
        .predict(&Record::new(), MissingStrategy::Proportional)
        .expect("prediction");
    // income missing: every leaf contributes, so the merged weight is
    // the root count
    assert_eq!(prediction.count, 100.0);
    assert_eq!(prediction.distribution.total(), 100.0);
    let confidence = prediction.confidence.expect("confidence");
    assert!((0.0..=1.0).contains(&confidence));
}

#[test]
fn rule_generation_round() {
    let tree = Tree::from_definition(&loan_definition(), loan_fields(), None)
        .expect("valid tree");
    let text = RuleGenerator::new(&tree, RuleSyntax::PSEUDOCODE).generate();
    assert!(text.contains("IF income >= 50000 THEN"));
    assert!(text.contains("PREDICT \"high\""));

    let python = RuleGenerator::new(&tree, RuleSyntax::PYTHON).generate();
    assert!(python.contains("if record[\"income\"] >= 50000:"));
    assert!(python.contains("return \"low\""));
}

#[test]
fn anomaly_scoring_end_to_end() {
    let fields = FieldDictionary::from_value(&json!({
        "000000": {"name": "bytes", "optype": "numeric"},
        "000001": {"name": "proto", "optype": "categorical"}
    }))
    .expect("valid field dictionary");
    let definition = json!({
        "predicates": [true],
        "children": [
            {"predicates": [
                 {"op": ">", "field": "000000", "value": 1000},
                 {"op": "=", "field": "000001", "value": "tcp"}
             ],
             "children": [
                 {"predicates": [{"op": ">", "field": "000000", "value": 100000}],
                  "children": []}
             ]},
            {"predicates": [{"op": "<=", "field": "000000", "value": 1000}],
             "children": []}
        ]
    });
    let tree = AnomalyTree::from_definition(&definition, fields).expect("valid tree");

    let deep = tree.depth(&record(&[
        ("000000", json!(500000)),
        ("000001", json!("tcp")),
    ]));
    assert_eq!(deep.depth, 3);

    let shallow = tree.depth(&record(&[
        ("000000", json!(50000)),
        ("000001", json!("udp")),
    ]));
    // matches neither child conjunction: only the root admits it
    assert_eq!(shallow.depth, 1);
    assert!(shallow.path.is_empty());
}

#[test]
fn association_coverage_end_to_end() {
    let fields = FieldDictionary::from_value(&json!({
        "000000": {"name": "basket", "optype": "items"},
        "000001": {"name": "total", "optype": "numeric"}
    }))
    .expect("valid field dictionary");
    let definition = json!({
        "items": [
            {"field_id": "000000", "name": "bread", "count": 40},
            {"field_id": "000000", "name": "butter", "count": 30},
            {"field_id": "000001", "name": "20+", "bin_start": 20, "count": 25}
        ],
        "rules": [
            {"id": "000000", "lhs": [0, 1], "rhs": [2], "confidence": 0.8,
             "leverage": 0.05, "lift": 2.1, "p_value": 0.0004,
             "support": 0.2, "covers": 20}
        ]
    });
    let association = Association::from_definition(&definition, fields).expect("valid");
    let rule = &association.rules()[0];

    assert!(association.rule_covers(
        rule,
        &record(&[("000000", json!("bread milk butter")), ("000001", json!(25))])
    ));
    assert!(!association.rule_covers(
        rule,
        &record(&[("000000", json!("bread milk")), ("000001", json!(25))])
    ));
    assert!(!association.rule_covers(
        rule,
        &record(&[("000000", json!("bread butter")), ("000001", json!(10))])
    ));
}

#[test]
fn evaluation_is_reentrant_across_threads() {
    let tree = std::sync::Arc::new(
        Tree::from_definition(&loan_definition(), loan_fields(), None).expect("valid tree"),
    );
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let tree = std::sync::Arc::clone(&tree);
            std::thread::spawn(move || {
                let income = 10000.0 * (i as f64 + 1.0);
                let input = record(&[("000000", json!(income))]);
                tree.predict(&input, MissingStrategy::LastPrediction)
                    .expect("prediction")
            })
        })
        .collect();
    for handle in handles {
        let prediction = handle.join().expect("thread");
        assert!(prediction.count > 0.0);
    }
}
