//! Predecir: local evaluation engine for tree-based ML models in pure Rust.
//!
//! Predecir reproduces, entirely offline, the scoring a remote
//! machine-learning service performs: it takes a serialized model
//! description (decision tree, boosted tree, anomaly-detection tree, or
//! association-rule set) plus an input record, and produces a prediction
//! together with calibrated uncertainty (confidence intervals, impurity,
//! medians) — without any network call.
//!
//! # Quick Start
//!
//! ```
//! use predecir::prelude::*;
//! use serde_json::json;
//!
//! let mut fields = FieldDictionary::new();
//! fields.insert(Field::new("000000", "age", OpType::Numeric));
//!
//! let definition = json!({
//!     "predicate": true,
//!     "count": 10,
//!     "output": "young",
//!     "distribution": [["young", 6], ["old", 4]],
//!     "children": [
//!         {"predicate": {"operator": "<", "field": "000000", "value": 30},
//!          "output": "young", "count": 6, "confidence": 0.55,
//!          "distribution": [["young", 6]], "children": []},
//!         {"predicate": {"operator": ">=", "field": "000000", "value": 30},
//!          "output": "old", "count": 4, "confidence": 0.45,
//!          "distribution": [["old", 4]], "children": []}
//!     ]
//! });
//!
//! let tree = Tree::from_definition(&definition, fields, None).unwrap();
//! let mut record = Record::new();
//! record.insert("000000".to_string(), json!(25));
//!
//! let prediction = tree.predict(&record, MissingStrategy::LastPrediction).unwrap();
//! assert_eq!(prediction.prediction.to_string(), "young");
//! assert_eq!(prediction.path, vec!["age < 30"]);
//! ```
//!
//! # Modules
//!
//! - [`fields`]: Field dictionary (id, name, optype, analysis options,
//!   summary statistics)
//! - [`predicate`]: Stateless condition evaluation with term matching
//! - [`tree`]: Decision and boosted tree prediction with two
//!   missing-value strategies
//! - [`stats`]: Wilson score confidence, regression error, Gini
//!   impurity, distribution median, bin merging
//! - [`rules`]: Tree-to-rules rendering in selectable output syntaxes
//! - [`anomaly`]: Anomaly depth scoring over predicate-conjunction trees
//! - [`association`]: Association item and rule matching
//! - [`error`]: Error types
//!
//! All model structures are built once from an external definition and
//! are immutable during evaluation; concurrent evaluations against the
//! same model are safe because no node is mutated after construction.

pub mod anomaly;
pub mod association;
pub mod error;
pub mod fields;
pub mod predicate;
pub mod prelude;
pub mod rules;
pub mod stats;
pub mod tree;
