//! Anomaly depth scoring: recursive predicate-conjunction trees.
//!
//! An anomaly tree is structurally a predicate tree whose nodes each
//! carry a conjunction of predicates. Scoring a record walks the tree
//! from the root, descending into the first child whose whole
//! conjunction holds, and returns how deep the walk got together with
//! the rendered path. A record the root conjunction excludes scores
//! depth 0 with an empty path. Shallower depths read as more anomalous
//! in the consuming scorer.
//!
//! # Examples
//!
//! ```
//! use predecir::anomaly::AnomalyTree;
//! use predecir::fields::{Field, FieldDictionary, OpType, Record};
//! use serde_json::json;
//!
//! let mut fields = FieldDictionary::new();
//! fields.insert(Field::new("000000", "size", OpType::Numeric));
//!
//! let definition = json!({
//!     "predicates": [true],
//!     "children": [
//!         {"predicates": [{"op": ">", "field": "000000", "value": 5}], "children": []},
//!         {"predicates": [{"op": "<=", "field": "000000", "value": 5}], "children": []}
//!     ]
//! });
//! let tree = AnomalyTree::from_definition(&definition, fields).unwrap();
//!
//! let mut record = Record::new();
//! record.insert("000000".to_string(), json!(7));
//! let score = tree.depth(&record);
//! assert_eq!(score.depth, 2);
//! assert_eq!(score.path, vec!["size > 5"]);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{invalid_structure, Result};
use crate::fields::{FieldDictionary, Record};
use crate::predicate::Predicate;

/// One node of an anomaly tree: a conjunction of predicates plus
/// children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyNode {
    /// Predicates AND-ed together to guard entry into this node
    pub predicates: Vec<Predicate>,
    /// Node id, when the definition carries one
    pub id: Option<String>,
    /// Child nodes, in declaration order
    pub children: Vec<AnomalyNode>,
}

impl AnomalyNode {
    fn from_value(raw: &Value) -> Result<Self> {
        let Some(map) = raw.as_object() else {
            return Err(invalid_structure("anomaly tree node is not an object"));
        };
        let predicates = match map.get("predicates") {
            Some(Value::Bool(true)) => vec![Predicate::Always],
            Some(Value::Array(entries)) => entries
                .iter()
                .map(parse_anomaly_predicate)
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(invalid_structure(format!(
                    "predicates property has unrecognized type: {other}"
                )))
            }
            None => {
                return Err(invalid_structure("predicates property missing"));
            }
        };
        let id = map
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string);
        let children = match map.get("children") {
            Some(Value::Array(entries)) => entries
                .iter()
                .map(AnomalyNode::from_value)
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(invalid_structure(format!(
                    "children is not an array: {other}"
                )))
            }
            None => Vec::new(),
        };
        Ok(AnomalyNode {
            predicates,
            id,
            children,
        })
    }

    /// Whether every predicate of the conjunction holds for the record.
    #[must_use]
    pub fn apply(&self, input: &Record, fields: &FieldDictionary) -> bool {
        self.predicates
            .iter()
            .all(|predicate| predicate.apply(input, fields))
    }

    /// Renders the conjunction, joining the individual conditions with
    /// `and`. The universal predicate renders only when it stands alone.
    #[must_use]
    pub fn to_rule(&self, fields: &FieldDictionary) -> String {
        let conditions: Vec<String> = self
            .predicates
            .iter()
            .filter(|predicate| !predicate.is_always())
            .map(|predicate| predicate.to_rule(fields))
            .collect();
        if conditions.is_empty() {
            "true".to_string()
        } else {
            conditions.join(" and ")
        }
    }
}

/// Traversal depth and path of one scored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyScore {
    /// How many nodes the walk entered (0 when the root excluded the
    /// record)
    pub depth: usize,
    /// Rendered conjunctions of the branches taken, in order
    pub path: Vec<String>,
}

/// An anomaly tree over a field dictionary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyTree {
    root: AnomalyNode,
    fields: FieldDictionary,
}

impl AnomalyTree {
    /// Builds an anomaly tree from the nested node structure of a model
    /// definition.
    ///
    /// # Errors
    ///
    /// Returns `InvalidModelStructure` when a node's `predicates`
    /// property is missing or of an unrecognized type.
    pub fn from_definition(root: &Value, fields: FieldDictionary) -> Result<Self> {
        Ok(AnomalyTree {
            root: AnomalyNode::from_value(root)?,
            fields,
        })
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> &AnomalyNode {
        &self.root
    }

    /// Scores one record: traversal depth plus the rendered path.
    #[must_use]
    pub fn depth(&self, input: &Record) -> AnomalyScore {
        let mut path = Vec::new();
        if !self.root.apply(input, &self.fields) {
            return AnomalyScore { depth: 0, path };
        }
        let mut depth = 1;
        let mut node = &self.root;
        'descend: loop {
            for child in &node.children {
                if child.apply(input, &self.fields) {
                    path.push(child.to_rule(&self.fields));
                    depth += 1;
                    node = child;
                    continue 'descend;
                }
            }
            break;
        }
        AnomalyScore { depth, path }
    }
}

/// Anomaly definitions abbreviate the operator key as `op`; accept both
/// spellings and the literal `true`.
fn parse_anomaly_predicate(raw: &Value) -> Result<Predicate> {
    match raw {
        Value::Object(map) if map.contains_key("op") && !map.contains_key("operator") => {
            let mut normalized = map.clone();
            if let Some(op) = normalized.remove("op") {
                normalized.insert("operator".to_string(), op);
            }
            Predicate::from_value(&Value::Object(normalized))
        }
        other => Predicate::from_value(other),
    }
}
