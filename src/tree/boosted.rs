//! Boosted tree evaluation.
//!
//! A boosted tree is structurally a decision tree whose nodes carry
//! gradient and Hessian accumulators instead of a full distribution; a
//! single tree contributes one additive increment to an ensemble score.
//! Last-prediction traversal answers the reached node's output directly;
//! proportional traversal accumulates `(g_sum, h_sum, count)` over every
//! reachable leaf and answers `-g_sum / (h_sum + lambda)`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{invalid_structure, PredecirError, Result};
use crate::fields::{present_value, FieldDictionary, OpType, Record};
use crate::predicate::Predicate;

/// One node of a boosted tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedNode {
    /// Condition guarding entry into this node
    pub predicate: Predicate,
    /// Additive output contributed when prediction stops here
    pub output: f64,
    /// Instance count observed at this node
    pub count: f64,
    /// Gradient accumulator
    pub g_sum: f64,
    /// Hessian accumulator
    pub h_sum: f64,
    /// Child nodes, in declaration order
    pub children: Vec<BoostedNode>,
}

impl BoostedNode {
    fn from_value(raw: &Value) -> Result<Self> {
        let Some(map) = raw.as_object() else {
            return Err(invalid_structure("boosted tree node is not an object"));
        };
        let predicate = match map.get("predicate") {
            Some(raw_predicate) => Predicate::from_value(raw_predicate)?,
            None => Predicate::Always,
        };
        let output = map.get("output").and_then(Value::as_f64).unwrap_or(0.0);
        let count = map.get("count").and_then(Value::as_f64).unwrap_or(0.0);
        let g_sum = map.get("g_sum").and_then(Value::as_f64).unwrap_or(0.0);
        let h_sum = map.get("h_sum").and_then(Value::as_f64).unwrap_or(0.0);
        let children = match map.get("children") {
            Some(Value::Array(entries)) => entries
                .iter()
                .map(BoostedNode::from_value)
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(invalid_structure(format!(
                    "children is not an array: {other}"
                )))
            }
            None => Vec::new(),
        };
        Ok(BoostedNode {
            predicate,
            output,
            count,
            g_sum,
            h_sum,
            children,
        })
    }

    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn split_field(children: &[BoostedNode]) -> Option<&str> {
        let mut field: Option<&str> = None;
        for child in children {
            match (field, child.predicate.field_id()) {
                (_, None) => return None,
                (None, Some(id)) => field = Some(id),
                (Some(seen), Some(id)) if seen == id => {}
                _ => return None,
            }
        }
        field
    }
}

/// The boosting increment predicted by one boosted tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedPrediction {
    /// The additive score contribution
    pub prediction: f64,
    /// Instance count backing the prediction
    pub count: f64,
    /// Rendered rules of the branches taken, in order
    pub path: Vec<String>,
}

/// A single boosted tree over a field dictionary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostedTree {
    root: BoostedNode,
    fields: FieldDictionary,
    lambda: f64,
}

impl BoostedTree {
    /// Builds a boosted tree from the nested node structure of a model
    /// definition. The regularization lambda defaults to 1.
    ///
    /// # Errors
    ///
    /// Returns `InvalidModelStructure` for malformed node shapes.
    pub fn from_definition(root: &Value, fields: FieldDictionary) -> Result<Self> {
        Ok(BoostedTree {
            root: BoostedNode::from_value(root)?,
            fields,
            lambda: 1.0,
        })
    }

    /// Sets the regularization lambda used by proportional prediction.
    #[must_use]
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> &BoostedNode {
        &self.root
    }

    /// Predicts this tree's boosting increment for one input record.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDistribution` when a proportional traversal
    /// reaches no instances.
    pub fn predict(
        &self,
        input: &Record,
        strategy: super::MissingStrategy,
    ) -> Result<BoostedPrediction> {
        match strategy {
            super::MissingStrategy::LastPrediction => Ok(self.predict_last(input)),
            super::MissingStrategy::Proportional => self.predict_proportional(input),
        }
    }

    fn predict_last(&self, input: &Record) -> BoostedPrediction {
        let mut node = &self.root;
        let mut path = Vec::new();
        'descend: loop {
            for child in &node.children {
                if child.predicate.apply(input, &self.fields) {
                    path.push(child.predicate.to_rule(&self.fields));
                    node = child;
                    continue 'descend;
                }
            }
            break;
        }
        BoostedPrediction {
            prediction: node.output,
            count: node.count,
            path,
        }
    }

    fn predict_proportional(&self, input: &Record) -> Result<BoostedPrediction> {
        let mut path = Vec::new();
        let (g_sum, h_sum, count) =
            self.traverse_proportional(&self.root, input, &mut path, false);
        if count <= 0.0 {
            return Err(PredecirError::InvalidDistribution {
                message: "proportional traversal reached no instances".to_string(),
            });
        }
        Ok(BoostedPrediction {
            prediction: -g_sum / (h_sum + self.lambda),
            count,
            path,
        })
    }

    /// Accumulates `(g_sum, h_sum, count)` over every leaf reachable
    /// under the missing-value semantics; mirrors the plain tree's
    /// proportional traversal.
    fn traverse_proportional(
        &self,
        node: &BoostedNode,
        input: &Record,
        path: &mut Vec<String>,
        missing_found: bool,
    ) -> (f64, f64, f64) {
        if node.is_leaf() {
            return (node.g_sum, node.h_sum, node.count);
        }
        if self.one_branch(&node.children, input) {
            for child in &node.children {
                if child.predicate.apply(input, &self.fields) {
                    if !missing_found {
                        let rule = child.predicate.to_rule(&self.fields);
                        if !path.contains(&rule) {
                            path.push(rule);
                        }
                    }
                    return self.traverse_proportional(child, input, path, missing_found);
                }
            }
            return (node.g_sum, node.h_sum, node.count);
        }
        let mut totals = (0.0, 0.0, 0.0);
        for child in &node.children {
            let (g, h, count) = self.traverse_proportional(child, input, path, true);
            totals.0 += g;
            totals.1 += h;
            totals.2 += count;
        }
        totals
    }

    fn one_branch(&self, children: &[BoostedNode], input: &Record) -> bool {
        let split_field = BoostedNode::split_field(children);
        let contains = split_field.is_some_and(|field| present_value(input, field).is_some());
        let textual = split_field
            .and_then(|field| self.fields.get(field))
            .is_some_and(|field| matches!(field.optype, OpType::Text | OpType::Items));
        contains
            || textual
            || children.iter().any(|child| child.predicate.missing())
            || children
                .iter()
                .any(|child| matches!(child.predicate.value(), Some(Value::Null)))
    }
}
