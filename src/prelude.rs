//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use predecir::prelude::*;
//! ```

pub use crate::anomaly::{AnomalyScore, AnomalyTree};
pub use crate::association::{Association, AssociationItem, AssociationRule};
pub use crate::error::{PredecirError, Result};
pub use crate::fields::{Field, FieldDictionary, OpType, Record};
pub use crate::predicate::{Operator, Predicate};
pub use crate::rules::{RuleGenerator, RuleSyntax};
pub use crate::tree::{
    BoostedTree, Distribution, DistributionUnit, MissingStrategy, NodeOutput, Prediction, Tree,
};
