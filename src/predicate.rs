//! Stateless predicate evaluation over one field of one input record.
//!
//! A predicate is either the universal "always true" condition found at
//! tree roots, or a comparison of a field value against a target value.
//! Comparisons over text and items fields route through term matching:
//! the number of occurrences of the predicate's term in the input is
//! counted, then compared against the target value with the predicate's
//! operator (so `< 1` reads as "term absent").
//!
//! # Examples
//!
//! ```
//! use predecir::fields::{Field, FieldDictionary, OpType, Record};
//! use predecir::predicate::Predicate;
//! use serde_json::json;
//!
//! let mut fields = FieldDictionary::new();
//! fields.insert(Field::new("000000", "age", OpType::Numeric));
//!
//! let predicate = Predicate::from_value(&json!({
//!     "operator": "<", "field": "000000", "value": 30
//! })).unwrap();
//!
//! let mut record = Record::new();
//! record.insert("000000".to_string(), json!(25));
//! assert!(predicate.apply(&record, &fields));
//! assert_eq!(predicate.to_rule(&fields), "age < 30");
//! ```

use std::fmt;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{invalid_structure, Result};
use crate::fields::{
    number_of, present_value, text_of, FieldDictionary, ItemAnalysis, OpType, Record,
    TermAnalysis, TokenMode,
};

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessOrEqual,
    /// `>=`
    GreaterOrEqual,
    /// `>`
    GreaterThan,
    /// `in` (substring containment)
    In,
}

impl Operator {
    /// Parses an operator token from a model definition.
    ///
    /// A trailing `*` marks the source's "also true when the field value
    /// is missing" suffix; it is stripped here, once, at load time, and
    /// reported as the second element of the returned pair.
    ///
    /// # Errors
    ///
    /// Returns `InvalidModelStructure` for unrecognized tokens.
    pub fn parse(token: &str) -> Result<(Self, bool)> {
        let (token, missing) = match token.strip_suffix('*') {
            Some(stripped) => (stripped, true),
            None => (token, false),
        };
        let operator = match token {
            "=" | "==" => Operator::Equal,
            "!=" | "/=" => Operator::NotEqual,
            "<" => Operator::LessThan,
            "<=" => Operator::LessOrEqual,
            ">=" => Operator::GreaterOrEqual,
            ">" => Operator::GreaterThan,
            "in" => Operator::In,
            other => {
                return Err(invalid_structure(format!(
                    "unknown predicate operator: {other}"
                )))
            }
        };
        Ok((operator, missing))
    }

    /// The operator's symbol as rendered in rules.
    #[must_use]
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::LessThan => "<",
            Operator::LessOrEqual => "<=",
            Operator::GreaterOrEqual => ">=",
            Operator::GreaterThan => ">",
            Operator::In => "in",
        }
    }

    /// Applies the operator to two doubles.
    ///
    /// `In` never holds for plain numbers.
    #[must_use]
    pub fn holds(&self, left: f64, right: f64) -> bool {
        match self {
            Operator::Equal => left == right,
            Operator::NotEqual => left != right,
            Operator::LessThan => left < right,
            Operator::LessOrEqual => left <= right,
            Operator::GreaterOrEqual => left >= right,
            Operator::GreaterThan => left > right,
            Operator::In => false,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A condition over one field of one input record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// The universal predicate used at tree roots; always true.
    Always,
    /// A comparison of a field value against a target value.
    Comparison {
        /// Comparison operator
        operator: Operator,
        /// Field id the comparison reads
        field: String,
        /// Target value (kept in its JSON form; `null` encodes a
        /// missing-value comparison)
        value: Value,
        /// Term whose occurrence count is compared, for text/items fields
        term: Option<String>,
        /// True when the condition also holds for an absent field value
        missing: bool,
    },
}

impl Predicate {
    /// Builds a predicate from its model-definition form: the literal
    /// `true`, or an object with `operator`, `field`, and optional
    /// `value` / `term` keys.
    ///
    /// # Errors
    ///
    /// Returns `InvalidModelStructure` for any other shape.
    pub fn from_value(raw: &Value) -> Result<Self> {
        match raw {
            Value::Bool(true) => Ok(Predicate::Always),
            Value::Object(map) => {
                let token = map
                    .get("operator")
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid_structure("predicate has no operator"))?;
                let (operator, missing) = Operator::parse(token)?;
                let field = map
                    .get("field")
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid_structure("predicate has no field"))?
                    .to_string();
                let value = map.get("value").cloned().unwrap_or(Value::Null);
                let term = map
                    .get("term")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Ok(Predicate::Comparison {
                    operator,
                    field,
                    value,
                    term,
                    missing,
                })
            }
            other => Err(invalid_structure(format!(
                "unrecognized predicate form: {other}"
            ))),
        }
    }

    /// Whether this is the universal predicate.
    #[must_use]
    pub fn is_always(&self) -> bool {
        matches!(self, Predicate::Always)
    }

    /// The field id this predicate reads, if any.
    #[must_use]
    pub fn field_id(&self) -> Option<&str> {
        match self {
            Predicate::Always => None,
            Predicate::Comparison { field, .. } => Some(field),
        }
    }

    /// Whether the predicate carries the missing flag.
    #[must_use]
    pub fn missing(&self) -> bool {
        match self {
            Predicate::Always => false,
            Predicate::Comparison { missing, .. } => *missing,
        }
    }

    /// The comparison target value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Predicate::Always => None,
            Predicate::Comparison { value, .. } => Some(value),
        }
    }

    /// Evaluates the predicate against one input record.
    ///
    /// Missing-value semantics: an absent (or null) field value makes
    /// the predicate true only when its missing flag is set or when it
    /// compares for equality against `null`; a present value makes a
    /// `!= null` comparison true without further inspection.
    #[must_use]
    pub fn apply(&self, input: &Record, fields: &FieldDictionary) -> bool {
        let Predicate::Comparison {
            operator,
            field,
            value,
            term,
            missing,
        } = self
        else {
            return true;
        };

        let Some(input_value) = present_value(input, field) else {
            return *missing || (*operator == Operator::Equal && value.is_null());
        };
        if *operator == Operator::NotEqual && value.is_null() {
            return true;
        }

        if let Some(term) = term {
            let count = match fields.get(field) {
                Some(meta) if meta.optype == OpType::Text => {
                    let forms = meta.summary.forms_of(term);
                    term_matches(&text_of(input_value), &forms, &meta.term_analysis)
                }
                Some(meta) => item_matches(&text_of(input_value), term, &meta.item_analysis),
                None => return false,
            };
            let threshold = number_of(value).unwrap_or(0.0);
            return operator.holds(count as f64, threshold);
        }

        if *operator == Operator::In {
            return text_of(input_value).contains(&text_of(value));
        }

        match (number_of(input_value), number_of(value)) {
            (Some(left), Some(right)) => operator.holds(left, right),
            _ => {
                let left = text_of(input_value);
                let right = text_of(value);
                match operator {
                    Operator::Equal => left == right,
                    Operator::NotEqual => left != right,
                    _ => false,
                }
            }
        }
    }

    /// Renders the predicate as a human-readable condition using the
    /// field's display name.
    #[must_use]
    pub fn to_rule(&self, fields: &FieldDictionary) -> String {
        let Predicate::Comparison {
            operator,
            field,
            value,
            term,
            missing,
        } = self
        else {
            return "true".to_string();
        };

        let name = fields.name_of(field);
        let missing_suffix = if *missing { " or missing" } else { "" };

        if let Some(term) = term {
            let full_term = self.is_full_term(fields);
            let threshold = number_of(value).unwrap_or(0.0);
            let negated = (*operator == Operator::LessThan && threshold <= 1.0)
                || (*operator == Operator::LessOrEqual && threshold == 0.0);
            let relation = match (negated, full_term) {
                (true, true) => "is not equal to",
                (true, false) => "does not contain",
                (false, true) => "is equal to",
                (false, false) => "contains",
            };
            let qualifier = if full_term || negated {
                String::new()
            } else {
                count_qualifier(*operator, threshold)
            };
            return format!("{name} {relation} {term}{qualifier}{missing_suffix}");
        }

        if value.is_null() {
            return match operator {
                Operator::Equal => format!("{name} is missing"),
                _ => format!("{name} is not missing"),
            };
        }

        format!(
            "{name} {operator} {}{missing_suffix}",
            literal(value)
        )
    }

    /// Whether the predicate's term should be treated as a full term:
    /// either the field matches in full-terms mode, or the mode is `All`
    /// and the term itself spans a word boundary (a multi-word term).
    /// Items fields never render as full terms.
    #[must_use]
    pub fn is_full_term(&self, fields: &FieldDictionary) -> bool {
        let Predicate::Comparison {
            field,
            term: Some(term),
            ..
        } = self
        else {
            return false;
        };
        let Some(meta) = fields.get(field) else {
            return false;
        };
        if meta.optype == OpType::Items {
            return false;
        }
        match meta.term_analysis.token_mode {
            TokenMode::FullTermsOnly => true,
            TokenMode::All => spans_word_boundary(term),
            TokenMode::TokensOnly => false,
        }
    }
}

/// Counts occurrences of a term (in any of its known forms) in a text
/// input, honoring the field's token mode and case sensitivity.
#[must_use]
pub fn term_matches(text: &str, forms: &[String], options: &TermAnalysis) -> usize {
    let Some(first) = forms.first() else {
        return 0;
    };
    match options.token_mode {
        TokenMode::FullTermsOnly => full_term_match(text, first, options.case_sensitive),
        TokenMode::All if forms.len() == 1 && spans_word_boundary(first) => {
            full_term_match(text, first, options.case_sensitive)
        }
        _ => count_token_matches(text, forms, options.case_sensitive),
    }
}

/// Counts occurrences of an item in a separator-delimited input.
#[must_use]
pub fn item_matches(text: &str, item: &str, options: &ItemAnalysis) -> usize {
    text.split(options.separator())
        .filter(|part| *part == item)
        .count()
}

/// Counts boundary-delimited occurrences of a literal item name in a
/// text input: the name must be preceded and followed by the start/end
/// of input or a non-word character (underscore included as a word
/// character).
#[must_use]
pub fn count_boundary_matches(text: &str, name: &str, case_sensitive: bool) -> usize {
    let pattern = format!(
        "(?:^|[^a-zA-Z0-9_]){}(?:$|[^a-zA-Z0-9_])",
        regex::escape(name)
    );
    match RegexBuilder::new(&pattern)
        .case_insensitive(!case_sensitive)
        .build()
    {
        Ok(re) => re.find_iter(text).count(),
        Err(_) => 0,
    }
}

fn full_term_match(text: &str, term: &str, case_sensitive: bool) -> usize {
    let matched = if case_sensitive {
        text == term
    } else {
        text.to_lowercase() == term.to_lowercase()
    };
    usize::from(matched)
}

fn count_token_matches(text: &str, forms: &[String], case_sensitive: bool) -> usize {
    let alternation = forms
        .iter()
        .map(|form| regex::escape(form))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(r"(?:\b|_)(?:{alternation})(?:\b|_)");
    match RegexBuilder::new(&pattern)
        .case_insensitive(!case_sensitive)
        .build()
    {
        Ok(re) => re.find_iter(text).count(),
        Err(_) => 0,
    }
}

/// True when the term itself contains an internal word boundary, i.e.
/// reads as more than one token.
fn spans_word_boundary(term: &str) -> bool {
    match RegexBuilder::new(r"^.+\b.+$").build() {
        Ok(re) => re.is_match(term),
        Err(_) => false,
    }
}

fn count_qualifier(operator: Operator, threshold: f64) -> String {
    if operator == Operator::GreaterThan && threshold == 0.0 {
        return String::new();
    }
    let times = crate::rules::format_number(threshold);
    match operator {
        Operator::LessThan => format!(" less than {times} times"),
        Operator::LessOrEqual => format!(" no more than {times} times"),
        Operator::GreaterOrEqual => format!(" at least {times} times"),
        Operator::GreaterThan => format!(" more than {times} times"),
        Operator::Equal => format!(" exactly {times} times"),
        _ => String::new(),
    }
}

/// The literal form of a comparison value for rule rendering: strings
/// unquoted, numbers as printed by JSON.
pub(crate) fn literal(value: &Value) -> String {
    text_of(value)
}
