//! Field dictionary: per-field metadata consumed during evaluation.
//!
//! A model definition carries a map of field id to field metadata (display
//! name, operation type, text/item analysis options, summary statistics).
//! The dictionary is built once from the definition and is read-only for
//! the lifetime of the model; every predicate, tree, anomaly, and
//! association evaluation looks fields up by id through it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{invalid_structure, PredecirError, Result};

/// An input record: field id mapped to its raw value.
///
/// Values keep their JSON type; a field absent from the map (or mapped to
/// `null`) counts as missing and is routed through the missing-value
/// semantics of the evaluators rather than treated as an error.
pub type Record = HashMap<String, Value>;

/// Operation type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpType {
    /// Continuous numeric field
    Numeric,
    /// Discrete labeled field
    Categorical,
    /// Free text field, evaluated through term matching
    Text,
    /// Delimiter-separated item set field
    Items,
    /// Datetime field (compared numerically during evaluation)
    Datetime,
}

impl OpType {
    /// Parses an optype token from a model definition.
    ///
    /// # Errors
    ///
    /// Returns `InvalidModelStructure` for unrecognized tokens.
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "numeric" => Ok(OpType::Numeric),
            "categorical" => Ok(OpType::Categorical),
            "text" => Ok(OpType::Text),
            "items" => Ok(OpType::Items),
            "datetime" => Ok(OpType::Datetime),
            other => Err(invalid_structure(format!("unknown optype: {other}"))),
        }
    }
}

/// Token mode for term matching over text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TokenMode {
    /// Match individual tokens anywhere in the input (default)
    #[default]
    TokensOnly,
    /// Match the whole input against the whole term
    FullTermsOnly,
    /// Token matching, except multi-token terms match as full terms
    All,
}

impl TokenMode {
    /// Parses a token-mode token from a model definition.
    ///
    /// # Errors
    ///
    /// Returns `InvalidModelStructure` for unrecognized tokens.
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "tokens_only" => Ok(TokenMode::TokensOnly),
            "full_terms_only" => Ok(TokenMode::FullTermsOnly),
            "all" => Ok(TokenMode::All),
            other => Err(invalid_structure(format!("unknown token mode: {other}"))),
        }
    }
}

/// Term-analysis options of a text field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TermAnalysis {
    /// Whether term comparison distinguishes case
    pub case_sensitive: bool,
    /// Token mode governing how terms are matched
    pub token_mode: TokenMode,
}

/// Item-analysis options of an items field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ItemAnalysis {
    /// Separator splitting an input into individual items; a single
    /// space when absent
    pub separator: Option<String>,
}

impl ItemAnalysis {
    /// The effective separator.
    #[must_use]
    pub fn separator(&self) -> &str {
        self.separator.as_deref().unwrap_or(" ")
    }
}

/// The slices of a field's summary statistics the evaluators consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FieldSummary {
    /// Label and instance count per category (categorical fields)
    pub categories: Vec<(String, f64)>,
    /// Representative point and instance count per bin, ascending by
    /// point (numeric fields with many distinct values)
    pub bins: Vec<(f64, f64)>,
    /// Exact value and instance count pairs (numeric fields with few
    /// distinct values)
    pub counts: Vec<(f64, f64)>,
    /// Known alternate spellings per term (text fields)
    pub term_forms: HashMap<String, Vec<String>>,
    /// Item label and instance count per item (items fields)
    pub items: Vec<(String, f64)>,
}

impl FieldSummary {
    /// All known forms of a term: the term itself followed by its
    /// recorded synonyms.
    #[must_use]
    pub fn forms_of(&self, term: &str) -> Vec<String> {
        let mut forms = vec![term.to_string()];
        if let Some(extra) = self.term_forms.get(term) {
            forms.extend(extra.iter().cloned());
        }
        forms
    }

    fn from_value(raw: &Value) -> Result<Self> {
        let mut summary = FieldSummary::default();
        let Some(map) = raw.as_object() else {
            return Err(invalid_structure("field summary is not an object"));
        };
        if let Some(categories) = map.get("categories") {
            summary.categories = labeled_pairs(categories, "categories")?;
        }
        if let Some(bins) = map.get("bins") {
            summary.bins = numeric_pairs(bins, "bins")?;
        }
        if let Some(counts) = map.get("counts") {
            summary.counts = numeric_pairs(counts, "counts")?;
        }
        if let Some(items) = map.get("items") {
            summary.items = labeled_pairs(items, "items")?;
        }
        if let Some(term_forms) = map.get("term_forms") {
            let Some(forms) = term_forms.as_object() else {
                return Err(invalid_structure("term_forms is not an object"));
            };
            for (term, entries) in forms {
                let Some(list) = entries.as_array() else {
                    return Err(invalid_structure("term_forms entry is not an array"));
                };
                let synonyms = list
                    .iter()
                    .map(|v| {
                        v.as_str().map(str::to_string).ok_or_else(|| {
                            invalid_structure("term form is not a string")
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                summary.term_forms.insert(term.clone(), synonyms);
            }
        }
        Ok(summary)
    }
}

/// Metadata of a single model field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field identifier used by predicates and items
    pub field_id: String,
    /// Display name used when rendering rules
    pub name: String,
    /// Operation type
    pub optype: OpType,
    /// Term-analysis options (text fields)
    pub term_analysis: TermAnalysis,
    /// Item-analysis options (items fields)
    pub item_analysis: ItemAnalysis,
    /// Summary statistics
    pub summary: FieldSummary,
}

impl Field {
    /// Creates a field with the given id, name, and optype, with default
    /// analysis options and an empty summary.
    #[must_use]
    pub fn new(field_id: impl Into<String>, name: impl Into<String>, optype: OpType) -> Self {
        Self {
            field_id: field_id.into(),
            name: name.into(),
            optype,
            term_analysis: TermAnalysis::default(),
            item_analysis: ItemAnalysis::default(),
            summary: FieldSummary::default(),
        }
    }

    fn from_value(field_id: &str, raw: &Value) -> Result<Self> {
        let Some(map) = raw.as_object() else {
            return Err(invalid_structure(format!(
                "field {field_id} is not an object"
            )));
        };
        let name = map
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(field_id)
            .to_string();
        let optype_token = map
            .get("optype")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid_structure(format!("field {field_id} has no optype")))?;
        let optype = OpType::parse(optype_token)?;

        let mut term_analysis = TermAnalysis::default();
        if let Some(options) = map.get("term_analysis").and_then(Value::as_object) {
            if let Some(case) = options.get("case_sensitive").and_then(Value::as_bool) {
                term_analysis.case_sensitive = case;
            }
            if let Some(mode) = options.get("token_mode").and_then(Value::as_str) {
                term_analysis.token_mode = TokenMode::parse(mode)?;
            }
        }

        let mut item_analysis = ItemAnalysis::default();
        if let Some(options) = map.get("item_analysis").and_then(Value::as_object) {
            if let Some(separator) = options.get("separator").and_then(Value::as_str) {
                item_analysis.separator = Some(separator.to_string());
            }
        }

        let summary = match map.get("summary") {
            Some(raw_summary) => FieldSummary::from_value(raw_summary)?,
            None => FieldSummary::default(),
        };

        Ok(Field {
            field_id: field_id.to_string(),
            name,
            optype,
            term_analysis,
            item_analysis,
            summary,
        })
    }
}

/// Read-only map of field id to field metadata.
///
/// Constructed once from the model definition; evaluation never mutates
/// it, so a dictionary may be shared freely across concurrent
/// predictions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldDictionary {
    fields: HashMap<String, Field>,
}

impl FieldDictionary {
    /// Creates an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a dictionary from the `{field_id -> metadata}` object of a
    /// model definition.
    ///
    /// # Errors
    ///
    /// Returns `InvalidModelStructure` when the object or any field
    /// metadata inside it is malformed.
    pub fn from_value(raw: &Value) -> Result<Self> {
        let Some(map) = raw.as_object() else {
            return Err(invalid_structure("field dictionary is not an object"));
        };
        let mut fields = HashMap::with_capacity(map.len());
        for (field_id, field_raw) in map {
            fields.insert(field_id.clone(), Field::from_value(field_id, field_raw)?);
        }
        Ok(FieldDictionary { fields })
    }

    /// Inserts a field, replacing any previous entry with the same id.
    pub fn insert(&mut self, field: Field) {
        self.fields.insert(field.field_id.clone(), field);
    }

    /// Looks up a field by id.
    #[must_use]
    pub fn get(&self, field_id: &str) -> Option<&Field> {
        self.fields.get(field_id)
    }

    /// Looks up a field by id, failing with `MissingField`.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` when the id is unknown.
    pub fn require(&self, field_id: &str) -> Result<&Field> {
        self.fields.get(field_id).ok_or_else(|| PredecirError::MissingField {
            field_id: field_id.to_string(),
        })
    }

    /// Display name of a field, falling back to the id itself.
    #[must_use]
    pub fn name_of<'a>(&'a self, field_id: &'a str) -> &'a str {
        self.fields
            .get(field_id)
            .map_or(field_id, |field| field.name.as_str())
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the dictionary is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Retrieves a record value, treating JSON `null` as absent.
pub(crate) fn present_value<'a>(input: &'a Record, field_id: &str) -> Option<&'a Value> {
    input.get(field_id).filter(|value| !value.is_null())
}

/// Coerces a value to a double for numeric comparison.
pub(crate) fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The string form of a value, as used for term matching and categorical
/// comparison.
pub(crate) fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn labeled_pairs(raw: &Value, what: &str) -> Result<Vec<(String, f64)>> {
    let Some(entries) = raw.as_array() else {
        return Err(invalid_structure(format!("{what} is not an array")));
    };
    entries
        .iter()
        .map(|entry| {
            let pair = entry.as_array().filter(|pair| pair.len() == 2);
            let (label, weight) = match pair {
                Some(pair) => (pair[0].as_str(), pair[1].as_f64()),
                None => (None, None),
            };
            match (label, weight) {
                (Some(label), Some(weight)) => Ok((label.to_string(), weight)),
                _ => Err(invalid_structure(format!(
                    "{what} entry is not a [label, count] pair"
                ))),
            }
        })
        .collect()
}

fn numeric_pairs(raw: &Value, what: &str) -> Result<Vec<(f64, f64)>> {
    let Some(entries) = raw.as_array() else {
        return Err(invalid_structure(format!("{what} is not an array")));
    };
    entries
        .iter()
        .map(|entry| {
            let pair = entry.as_array().filter(|pair| pair.len() == 2);
            let (point, weight) = match pair {
                Some(pair) => (pair[0].as_f64(), pair[1].as_f64()),
                None => (None, None),
            };
            match (point, weight) {
                (Some(point), Some(weight)) => Ok((point, weight)),
                _ => Err(invalid_structure(format!(
                    "{what} entry is not a [value, count] pair"
                ))),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dictionary_from_value() {
        let raw = json!({
            "000000": {"name": "age", "optype": "numeric"},
            "000001": {
                "name": "review",
                "optype": "text",
                "term_analysis": {"case_sensitive": true, "token_mode": "all"},
                "summary": {"term_forms": {"great": ["greatest", "greater"]}}
            }
        });
        let fields = FieldDictionary::from_value(&raw).expect("valid dictionary");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.name_of("000000"), "age");

        let review = fields.get("000001").expect("field exists");
        assert_eq!(review.optype, OpType::Text);
        assert!(review.term_analysis.case_sensitive);
        assert_eq!(review.term_analysis.token_mode, TokenMode::All);
        assert_eq!(
            review.summary.forms_of("great"),
            vec!["great", "greatest", "greater"]
        );
    }

    #[test]
    fn test_unknown_optype_rejected() {
        let raw = json!({"000000": {"name": "x", "optype": "quantum"}});
        let err = FieldDictionary::from_value(&raw).expect_err("invalid optype");
        assert!(err.to_string().contains("quantum"));
    }

    #[test]
    fn test_summary_pairs() {
        let raw = json!({
            "000000": {
                "name": "label",
                "optype": "categorical",
                "summary": {"categories": [["yes", 8], ["no", 2]]}
            }
        });
        let fields = FieldDictionary::from_value(&raw).expect("valid dictionary");
        let summary = &fields.get("000000").expect("field").summary;
        assert_eq!(summary.categories, vec![("yes".to_string(), 8.0), ("no".to_string(), 2.0)]);
    }

    #[test]
    fn test_missing_field_error() {
        let fields = FieldDictionary::new();
        let err = fields.require("000009").expect_err("missing");
        assert!(matches!(err, PredecirError::MissingField { .. }));
    }

    #[test]
    fn test_number_coercion() {
        assert_eq!(number_of(&json!(3.5)), Some(3.5));
        assert_eq!(number_of(&json!("  42 ")), Some(42.0));
        assert_eq!(number_of(&json!(true)), None);
    }

    #[test]
    fn test_present_value_filters_null() {
        let mut record = Record::new();
        record.insert("a".to_string(), Value::Null);
        record.insert("b".to_string(), json!(1));
        assert!(present_value(&record, "a").is_none());
        assert!(present_value(&record, "b").is_some());
    }
}
