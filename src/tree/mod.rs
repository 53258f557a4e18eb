//! Decision tree evaluation: recursive predicate-tree traversal with two
//! missing-value strategies.
//!
//! A [`Tree`] is built once from a serialized model definition (a nested
//! JSON structure of nodes, each carrying a predicate, an output, an
//! instance count, and a distribution) together with a
//! [`FieldDictionary`]. After construction the tree is immutable; every
//! [`Tree::predict`] call is a pure function of the tree and one input
//! record, so concurrent predictions against the same tree are safe.
//!
//! Two strategies handle records that lack the value a split needs:
//!
//! - [`MissingStrategy::LastPrediction`] descends to the first child
//!   whose predicate holds and answers from the deepest node reached.
//! - [`MissingStrategy::Proportional`] fans out over every child when a
//!   split field is truly missing, merges the leaf distributions
//!   additively, and answers from the aggregate (weighted mean plus
//!   regression error for regression, top label plus Wilson confidence
//!   for classification).
//!
//! # Examples
//!
//! ```
//! use predecir::fields::{Field, FieldDictionary, OpType, Record};
//! use predecir::tree::{MissingStrategy, Tree};
//! use serde_json::json;
//!
//! let mut fields = FieldDictionary::new();
//! fields.insert(Field::new("000000", "age", OpType::Numeric));
//!
//! let definition = json!({
//!     "predicate": true,
//!     "count": 10,
//!     "distribution": [["young", 6], ["old", 4]],
//!     "children": [
//!         {"predicate": {"operator": "<", "field": "000000", "value": 30},
//!          "output": "young", "count": 6, "confidence": 0.55,
//!          "distribution": [["young", 6]], "children": []},
//!         {"predicate": {"operator": ">=", "field": "000000", "value": 30},
//!          "output": "old", "count": 4, "confidence": 0.45,
//!          "distribution": [["old", 4]], "children": []}
//!     ],
//!     "output": "young"
//! });
//!
//! let tree = Tree::from_definition(&definition, fields, None).unwrap();
//! let mut record = Record::new();
//! record.insert("000000".to_string(), json!(25));
//! let prediction = tree.predict(&record, MissingStrategy::LastPrediction).unwrap();
//! assert_eq!(prediction.prediction.to_string(), "young");
//! assert_eq!(prediction.path, vec!["age < 30"]);
//! ```

mod boosted;
#[cfg(test)]
mod tests_tree_contract;

pub use boosted::{BoostedNode, BoostedPrediction, BoostedTree};

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{invalid_structure, PredecirError, Result};
use crate::fields::{number_of, present_value, FieldDictionary, OpType, Record};
use crate::predicate::Predicate;
use crate::stats;

/// Policy for handling predictions when the record lacks a value needed
/// to choose a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MissingStrategy {
    /// Stop at the deepest node reachable and answer from it.
    #[default]
    LastPrediction,
    /// Fan out over all branches of an undecidable split and answer
    /// from the merged leaf distributions.
    Proportional,
}

impl MissingStrategy {
    /// Parses a strategy token.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedStrategy` for unrecognized tokens.
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "last_prediction" => Ok(MissingStrategy::LastPrediction),
            "proportional" => Ok(MissingStrategy::Proportional),
            other => Err(PredecirError::UnsupportedStrategy {
                strategy: other.to_string(),
            }),
        }
    }
}

/// Which summary key a node's distribution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionUnit {
    /// Binned numeric points
    Bins,
    /// Exact numeric value counts
    Counts,
    /// Categorical labels
    Categories,
}

/// Weighted multiset of values observed at a tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Distribution {
    /// Label and weight pairs
    Categorical(Vec<(String, f64)>),
    /// Representative point and weight pairs, ascending by point
    Numeric(Vec<(f64, f64)>),
}

impl Distribution {
    /// Total weight of the distribution.
    #[must_use]
    pub fn total(&self) -> f64 {
        match self {
            Distribution::Categorical(entries) => entries.iter().map(|(_, w)| w).sum(),
            Distribution::Numeric(entries) => entries.iter().map(|(_, w)| w).sum(),
        }
    }

    /// Number of distinct entries.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Distribution::Categorical(entries) => entries.len(),
            Distribution::Numeric(entries) => entries.len(),
        }
    }

    /// Whether the distribution has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A leaf or split output value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeOutput {
    /// Regression output
    Numeric(f64),
    /// Classification label
    Label(String),
}

impl NodeOutput {
    fn from_value(raw: &Value) -> Result<Self> {
        match raw {
            Value::Number(n) => n
                .as_f64()
                .map(NodeOutput::Numeric)
                .ok_or_else(|| invalid_structure("node output is not a finite number")),
            Value::String(s) => Ok(NodeOutput::Label(s.clone())),
            other => Err(invalid_structure(format!(
                "node output has unsupported type: {other}"
            ))),
        }
    }

    /// The numeric value, for regression outputs.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NodeOutput::Numeric(value) => Some(*value),
            NodeOutput::Label(_) => None,
        }
    }

    /// The label, for classification outputs.
    #[must_use]
    pub fn as_label(&self) -> Option<&str> {
        match self {
            NodeOutput::Numeric(_) => None,
            NodeOutput::Label(label) => Some(label),
        }
    }
}

impl fmt::Display for NodeOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeOutput::Numeric(value) => write!(f, "{value}"),
            NodeOutput::Label(label) => f.write_str(label),
        }
    }
}

/// One node of a decision tree.
///
/// Leaf nodes have no children; every non-root node carries exactly one
/// predicate (the root carries the universal predicate). The
/// distribution's total weight equals the node's instance count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Node id, when the definition carries one
    pub id: Option<u64>,
    /// Condition guarding entry into this node
    pub predicate: Predicate,
    /// Output value answered when prediction stops here
    pub output: NodeOutput,
    /// Instance count observed at this node
    pub count: f64,
    /// Confidence recorded for this node
    pub confidence: Option<f64>,
    /// Distribution of observed values at this node
    pub distribution: Distribution,
    /// Summary key the distribution came from
    pub distribution_unit: DistributionUnit,
    /// Median of the node's numeric distribution
    pub median: Option<f64>,
    /// Gini impurity of the node's categorical distribution
    pub impurity: Option<f64>,
    /// Child nodes, in declaration order
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Whether this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// The field id all children split on, when they agree on one.
    #[must_use]
    pub(crate) fn split_field(children: &[TreeNode]) -> Option<&str> {
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

    fn from_value(
        raw: &Value,
        default_distribution: Option<&(Distribution, DistributionUnit)>,
    ) -> Result<Self> {
        let Some(map) = raw.as_object() else {
            return Err(invalid_structure("tree node is not an object"));
        };

        let predicate = match map.get("predicate") {
            Some(raw_predicate) => Predicate::from_value(raw_predicate)?,
            None => Predicate::Always,
        };
        let id = map.get("id").and_then(Value::as_u64);
        let count = map.get("count").and_then(Value::as_f64).unwrap_or(0.0);
        let confidence = map.get("confidence").and_then(Value::as_f64);
        let output = match map.get("output") {
            Some(raw_output) => NodeOutput::from_value(raw_output)?,
            None => return Err(invalid_structure("tree node has no output")),
        };

        let (distribution, distribution_unit, summary_median) =
            parse_node_distribution(map, default_distribution)?;

        let median = map
            .get("median")
            .and_then(Value::as_f64)
            .or(summary_median)
            .or_else(|| match &distribution {
                Distribution::Numeric(bins) => stats::dist_median(bins, count),
                Distribution::Categorical(_) => None,
            });
        let impurity = match &distribution {
            Distribution::Categorical(entries) if !entries.is_empty() => {
                Some(stats::gini_impurity(entries))
            }
            _ => None,
        };

        let children = match map.get("children") {
            Some(Value::Array(entries)) => entries
                .iter()
                .map(|child| TreeNode::from_value(child, default_distribution))
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(invalid_structure(format!(
                    "children is not an array: {other}"
                )))
            }
            None => Vec::new(),
        };

        Ok(TreeNode {
            id,
            predicate,
            output,
            count,
            confidence,
            distribution,
            distribution_unit,
            median,
            impurity,
            children,
        })
    }
}

/// A prediction together with its calibrated uncertainty and the
/// decision path that produced it.
///
/// Produced fresh by every [`Tree::predict`] call and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted value
    pub prediction: NodeOutput,
    /// Confidence estimate (Wilson lower bound for classification,
    /// regression error otherwise); absent when not computable
    pub confidence: Option<f64>,
    /// Share of the predicted label in the answering distribution
    pub probability: Option<f64>,
    /// Instance count backing the prediction
    pub count: f64,
    /// Median of the answering numeric distribution
    pub median: Option<f64>,
    /// Rendered rules of the branches taken, in order
    pub path: Vec<String>,
    /// Distribution the prediction was drawn from
    pub distribution: Distribution,
    /// Summary key of that distribution
    pub distribution_unit: DistributionUnit,
    /// Predicates of the final node's children (the candidate next
    /// splits); empty at a leaf
    pub children: Vec<Predicate>,
}

/// A decision tree model over a field dictionary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    root: TreeNode,
    fields: FieldDictionary,
    regression: bool,
}

impl Tree {
    /// Builds a tree from the nested node structure of a model
    /// definition.
    ///
    /// Each node may carry an explicit `distribution`, or an
    /// `objective_summary` with one of `bins` / `counts` / `categories`;
    /// nodes with neither fall back to `default_distribution` (itself in
    /// either of those two forms) when one is supplied.
    ///
    /// # Errors
    ///
    /// Returns `InvalidModelStructure` when a node, predicate, or
    /// distribution does not match the expected shapes.
    pub fn from_definition(
        root: &Value,
        fields: FieldDictionary,
        default_distribution: Option<&Value>,
    ) -> Result<Self> {
        let default = match default_distribution {
            Some(raw) => Some(parse_distribution_value(raw, None)?),
            None => None,
        };
        let root = TreeNode::from_value(root, default.as_ref())?;
        let regression = matches!(root.distribution, Distribution::Numeric(_))
            && matches!(root.output, NodeOutput::Numeric(_));
        Ok(Tree {
            root,
            fields,
            regression,
        })
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// The field dictionary the tree evaluates against.
    #[must_use]
    pub fn fields(&self) -> &FieldDictionary {
        &self.fields
    }

    /// Whether the tree predicts a numeric objective.
    #[must_use]
    pub fn is_regression(&self) -> bool {
        self.regression
    }

    /// Predicts the objective value for one input record.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDistribution` when a proportional aggregation
    /// produces an empty or zero-weight distribution.
    pub fn predict(&self, input: &Record, strategy: MissingStrategy) -> Result<Prediction> {
        match strategy {
            MissingStrategy::LastPrediction => Ok(self.predict_last(input)),
            MissingStrategy::Proportional => self.predict_proportional(input),
        }
    }

    fn predict_last(&self, input: &Record) -> Prediction {
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
        self.prediction_from_node(node, path)
    }

    fn prediction_from_node(&self, node: &TreeNode, path: Vec<String>) -> Prediction {
        let probability = match (&node.output, &node.distribution) {
            (NodeOutput::Label(label), Distribution::Categorical(entries)) => {
                let total: f64 = entries.iter().map(|(_, w)| w).sum();
                if total > 0.0 {
                    entries
                        .iter()
                        .find(|(candidate, _)| candidate == label)
                        .map(|(_, weight)| weight / total)
                } else {
                    None
                }
            }
            _ => None,
        };
        Prediction {
            prediction: node.output.clone(),
            confidence: node.confidence,
            probability,
            count: node.count,
            median: if self.regression { node.median } else { None },
            path,
            distribution: node.distribution.clone(),
            distribution_unit: node.distribution_unit,
            children: node.children.iter().map(|c| c.predicate.clone()).collect(),
        }
    }

    fn predict_proportional(&self, input: &Record) -> Result<Prediction> {
        let mut path = Vec::new();
        let traversal = self.traverse_proportional(&self.root, input, &mut path, false);
        match traversal.merged {
            Merged::Categorical(map) => self.categorical_aggregate(map, path, traversal.last_node),
            Merged::Numeric(bins) => self.numeric_aggregate(bins, path, traversal.last_node),
        }
    }

    fn categorical_aggregate(
        &self,
        map: HashMap<String, f64>,
        path: Vec<String>,
        last_node: &TreeNode,
    ) -> Result<Prediction> {
        let total: f64 = map.values().sum();
        let mut entries: Vec<(String, f64)> = map.into_iter().collect();
        // descending weight, label as tie-breaker for determinism
        entries.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        let Some((top_label, top_weight)) = entries.first().cloned() else {
            return Err(PredecirError::InvalidDistribution {
                message: "proportional aggregation produced no distribution".to_string(),
            });
        };
        let confidence = stats::ws_confidence(&top_label, &entries, stats::DEFAULT_Z)?;
        Ok(Prediction {
            prediction: NodeOutput::Label(top_label),
            confidence: Some(confidence),
            probability: Some(top_weight / total),
            count: total,
            median: None,
            path,
            distribution: Distribution::Categorical(entries),
            distribution_unit: DistributionUnit::Categories,
            children: last_node
                .children
                .iter()
                .map(|c| c.predicate.clone())
                .collect(),
        })
    }

    fn numeric_aggregate(
        &self,
        mut bins: Vec<(f64, f64)>,
        path: Vec<String>,
        last_node: &TreeNode,
    ) -> Result<Prediction> {
        // Singular case: the whole aggregate is one leaf with one
        // instance, so answer from that leaf verbatim.
        if bins.len() == 1 && bins[0].1 == 1.0 {
            return Ok(Prediction {
                path,
                count: 1.0,
                ..self.prediction_from_node(last_node, Vec::new())
            });
        }
        bins.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        let total: f64 = bins.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return Err(PredecirError::InvalidDistribution {
                message: format!("merged distribution weight {total} is not positive"),
            });
        }
        if bins.len() > stats::BINS_LIMIT {
            bins = stats::merge_bins(bins, stats::BINS_LIMIT);
        }
        let mean = stats::dist_mean(&bins);
        let variance = stats::unbiased_sample_variance(&bins, Some(mean));
        let error = stats::regression_error(variance, total, stats::DEFAULT_Z);
        let median = stats::dist_median(&bins, total);
        Ok(Prediction {
            prediction: NodeOutput::Numeric(mean),
            confidence: if error.is_nan() { None } else { Some(error) },
            probability: None,
            count: total,
            median,
            path,
            distribution: Distribution::Numeric(bins),
            distribution_unit: DistributionUnit::Bins,
            children: last_node
                .children
                .iter()
                .map(|c| c.predicate.clone())
                .collect(),
        })
    }

    /// Depth-first proportional traversal.
    ///
    /// Single-branch descent applies while the split is decidable; a
    /// truly missing split value fans out over every child and merges
    /// the returned distributions additively. `missing_found` marks that
    /// a fan-out happened above, which suppresses further path strings.
    /// Returns the merged distribution together with the last node a
    /// unique path reached, whose metadata backs the singular case.
    fn traverse_proportional<'a>(
        &'a self,
        node: &'a TreeNode,
        input: &Record,
        path: &mut Vec<String>,
        missing_found: bool,
    ) -> Traversal<'a> {
        if node.children.is_empty() {
            return Traversal {
                merged: Merged::from_distribution(&node.distribution),
                last_node: node,
            };
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
            // No child matched a present value: answer from this node.
            return Traversal {
                merged: Merged::from_distribution(&node.distribution),
                last_node: node,
            };
        }

        // True missing-value ambiguity: fan out over every child.
        let mut merged = Merged::empty_like(&node.distribution);
        let mut last_node = node;
        for child in &node.children {
            let branch = self.traverse_proportional(child, input, path, true);
            merged.absorb(branch.merged);
            last_node = branch.last_node;
        }
        Traversal { merged, last_node }
    }

    /// The "one branch" applicability heuristic: a split behaves as a
    /// normal single-branch descent when the input carries the split
    /// field, when any child predicate admits missing values, or when
    /// any child compares against null. Text and items split fields
    /// always take the single-branch route (fanning out over term
    /// predicates would double-count a present text value that merely
    /// lacks the term).
    fn one_branch(&self, children: &[TreeNode], input: &Record) -> bool {
        let split_field = TreeNode::split_field(children);
        let contains = split_field.is_some_and(|field| present_value(input, field).is_some());
        let textual = split_field
            .and_then(|field| self.fields.get(field))
            .is_some_and(|field| matches!(field.optype, OpType::Text | OpType::Items));
        contains || textual || missing_branch(children) || none_value(children)
    }
}

struct Traversal<'a> {
    merged: Merged,
    last_node: &'a TreeNode,
}

/// Accumulator for merged leaf distributions.
enum Merged {
    Categorical(HashMap<String, f64>),
    Numeric(Vec<(f64, f64)>),
}

impl Merged {
    fn empty_like(distribution: &Distribution) -> Self {
        match distribution {
            Distribution::Categorical(_) => Merged::Categorical(HashMap::new()),
            Distribution::Numeric(_) => Merged::Numeric(Vec::new()),
        }
    }

    fn from_distribution(distribution: &Distribution) -> Self {
        match distribution {
            Distribution::Categorical(entries) => {
                let mut map = HashMap::with_capacity(entries.len());
                for (label, weight) in entries {
                    *map.entry(label.clone()).or_insert(0.0) += weight;
                }
                Merged::Categorical(map)
            }
            Distribution::Numeric(entries) => Merged::Numeric(entries.clone()),
        }
    }

    fn absorb(&mut self, other: Merged) {
        match (self, other) {
            (Merged::Categorical(into), Merged::Categorical(from)) => {
                for (label, weight) in from {
                    *into.entry(label).or_insert(0.0) += weight;
                }
            }
            (Merged::Numeric(into), Merged::Numeric(from)) => {
                for (point, weight) in from {
                    add_bin(into, point, weight);
                }
            }
            // mixed node kinds cannot arise from a well-formed build
            _ => {}
        }
    }
}

/// Adds weight to the bin at `point`, creating it when absent.
fn add_bin(bins: &mut Vec<(f64, f64)>, point: f64, weight: f64) {
    for (candidate, existing) in bins.iter_mut() {
        if *candidate == point {
            *existing += weight;
            return;
        }
    }
    bins.push((point, weight));
}

fn missing_branch(children: &[TreeNode]) -> bool {
    children.iter().any(|child| child.predicate.missing())
}

fn none_value(children: &[TreeNode]) -> bool {
    children
        .iter()
        .any(|child| matches!(child.predicate.value(), Some(Value::Null)))
}

/// Parses a node's distribution from its explicit `distribution` key,
/// its `objective_summary`, or the supplied fallback, in that order.
/// Also surfaces the summary's recorded median when present.
fn parse_node_distribution(
    map: &serde_json::Map<String, Value>,
    default: Option<&(Distribution, DistributionUnit)>,
) -> Result<(Distribution, DistributionUnit, Option<f64>)> {
    if let Some(raw) = map.get("distribution") {
        let unit = map
            .get("distribution_unit")
            .and_then(Value::as_str)
            .map(parse_unit)
            .transpose()?;
        let (distribution, unit) = parse_distribution_value(raw, unit)?;
        return Ok((distribution, unit, None));
    }
    if let Some(summary) = map.get("objective_summary") {
        let Some(summary_map) = summary.as_object() else {
            return Err(invalid_structure("objective_summary is not an object"));
        };
        let median = summary_map.get("median").and_then(Value::as_f64);
        if let Some(bins) = summary_map.get("bins") {
            let (distribution, _) = parse_distribution_value(bins, Some(DistributionUnit::Bins))?;
            return Ok((distribution, DistributionUnit::Bins, median));
        }
        if let Some(counts) = summary_map.get("counts") {
            let (distribution, _) =
                parse_distribution_value(counts, Some(DistributionUnit::Counts))?;
            return Ok((distribution, DistributionUnit::Counts, median));
        }
        if let Some(categories) = summary_map.get("categories") {
            let (distribution, _) =
                parse_distribution_value(categories, Some(DistributionUnit::Categories))?;
            return Ok((distribution, DistributionUnit::Categories, median));
        }
        return Err(invalid_structure(
            "objective_summary carries none of bins/counts/categories",
        ));
    }
    match default {
        Some((distribution, unit)) => Ok((distribution.clone(), *unit, None)),
        None => Err(invalid_structure(
            "tree node has no distribution, no objective_summary, and no fallback",
        )),
    }
}

fn parse_unit(token: &str) -> Result<DistributionUnit> {
    match token {
        "bins" => Ok(DistributionUnit::Bins),
        "counts" => Ok(DistributionUnit::Counts),
        "categories" => Ok(DistributionUnit::Categories),
        other => Err(invalid_structure(format!(
            "unknown distribution unit: {other}"
        ))),
    }
}

/// Parses a `[[value, weight], ...]` array into a distribution,
/// inferring categorical vs numeric from the first entry when no unit is
/// given.
fn parse_distribution_value(
    raw: &Value,
    unit: Option<DistributionUnit>,
) -> Result<(Distribution, DistributionUnit)> {
    let Some(entries) = raw.as_array() else {
        return Err(invalid_structure("distribution is not an array"));
    };
    let categorical = match unit {
        Some(DistributionUnit::Categories) => true,
        Some(_) => false,
        None => entries
            .first()
            .and_then(|entry| entry.as_array())
            .and_then(|pair| pair.first())
            .is_some_and(Value::is_string),
    };
    if categorical {
        let mut parsed = Vec::with_capacity(entries.len());
        for entry in entries {
            let pair = entry.as_array().filter(|pair| pair.len() == 2);
            let (label, weight) = match pair {
                Some(pair) => (pair[0].as_str(), pair[1].as_f64()),
                None => (None, None),
            };
            match (label, weight) {
                (Some(label), Some(weight)) if weight >= 0.0 => {
                    parsed.push((label.to_string(), weight));
                }
                _ => {
                    return Err(invalid_structure(
                        "distribution entry is not a [label, weight] pair",
                    ))
                }
            }
        }
        Ok((
            Distribution::Categorical(parsed),
            unit.unwrap_or(DistributionUnit::Categories),
        ))
    } else {
        let mut parsed = Vec::with_capacity(entries.len());
        for entry in entries {
            let pair = entry.as_array().filter(|pair| pair.len() == 2);
            let (point, weight) = match pair {
                Some(pair) => (number_of(&pair[0]), pair[1].as_f64()),
                None => (None, None),
            };
            match (point, weight) {
                (Some(point), Some(weight)) if weight >= 0.0 => parsed.push((point, weight)),
                _ => {
                    return Err(invalid_structure(
                        "distribution entry is not a [point, weight] pair",
                    ))
                }
            }
        }
        parsed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok((
            Distribution::Numeric(parsed),
            unit.unwrap_or(DistributionUnit::Bins),
        ))
    }
}
