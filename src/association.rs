//! Association item and rule matching.
//!
//! An association model pairs a list of items (each a condition over one
//! field: a categorical label, a numeric bin, a text term, or an item-set
//! member) with a list of rules whose antecedents and consequents index
//! into that item list. Matching is purely local: an item tests one
//! record value, and a rule covers a record when every item on both of
//! its sides matches.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{invalid_structure, Result};
use crate::fields::{number_of, text_of, FieldDictionary, OpType, Record};
use crate::predicate::{count_boundary_matches, term_matches};

/// One association item: a condition over a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationItem {
    /// Position of the item in the model's item list
    pub index: usize,
    /// Field id the item reads
    pub field_id: String,
    /// Label, term, or item name; absent for items representing a
    /// missing value
    pub name: Option<String>,
    /// Negates the match result
    pub complement: bool,
    /// Lower bin bound for numeric items; unbounded when absent
    pub bin_start: Option<f64>,
    /// Upper bin bound for numeric items; unbounded when absent
    pub bin_end: Option<f64>,
    /// Instance count observed for the item
    pub count: f64,
}

impl AssociationItem {
    /// Builds an item from its model-definition form.
    ///
    /// # Errors
    ///
    /// Returns `InvalidModelStructure` when the item is not an object or
    /// lacks its field id.
    pub fn from_value(index: usize, raw: &Value) -> Result<Self> {
        let Some(map) = raw.as_object() else {
            return Err(invalid_structure(format!(
                "association item {index} is not an object"
            )));
        };
        let field_id = map
            .get("field_id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                invalid_structure(format!("association item {index} has no field_id"))
            })?
            .to_string();
        Ok(AssociationItem {
            index,
            field_id,
            name: map.get("name").and_then(Value::as_str).map(str::to_string),
            complement: map
                .get("complement")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            bin_start: map.get("bin_start").and_then(Value::as_f64),
            bin_end: map.get("bin_end").and_then(Value::as_f64),
            count: map.get("count").and_then(Value::as_f64).unwrap_or(0.0),
        })
    }

    /// Tests one record value against the item's condition.
    ///
    /// A missing value matches only items that themselves represent
    /// "missing" (no name). Numeric items test the bin range with absent
    /// bounds unbounded; categorical items test label equality; text
    /// items count occurrences of the term and its known forms; item-set
    /// items count boundary-delimited occurrences of the literal name.
    /// The `complement` flag negates whichever result applies.
    #[must_use]
    pub fn matches(&self, value: Option<&Value>, fields: &FieldDictionary) -> bool {
        let Some(value) = value.filter(|value| !value.is_null()) else {
            return self.name.is_none();
        };
        let Some(field) = fields.get(&self.field_id) else {
            return false;
        };
        let result = match field.optype {
            OpType::Numeric | OpType::Datetime => match number_of(value) {
                Some(number) => {
                    self.bin_start.map_or(true, |start| start <= number)
                        && self.bin_end.map_or(true, |end| number <= end)
                }
                None => false,
            },
            OpType::Categorical => {
                self.name.as_deref() == Some(text_of(value).as_str())
            }
            OpType::Text => match &self.name {
                Some(term) => {
                    let forms = field.summary.forms_of(term);
                    term_matches(&text_of(value), &forms, &field.term_analysis) > 0
                }
                None => false,
            },
            OpType::Items => match &self.name {
                Some(name) => {
                    count_boundary_matches(
                        &text_of(value),
                        name,
                        field.term_analysis.case_sensitive,
                    ) > 0
                }
                None => false,
            },
        };
        if self.complement {
            !result
        } else {
            result
        }
    }

    /// A short human-readable description of the item's condition.
    #[must_use]
    pub fn describe(&self, fields: &FieldDictionary) -> String {
        let name = fields.name_of(&self.field_id);
        match (&self.name, self.bin_start, self.bin_end) {
            (Some(label), None, None) => format!("{name} = {label}"),
            (_, Some(start), Some(end)) => {
                format!(
                    "{start} <= {name} <= {end}",
                    start = crate::rules::format_number(start),
                    end = crate::rules::format_number(end)
                )
            }
            (_, Some(start), None) => {
                format!("{name} >= {}", crate::rules::format_number(start))
            }
            (_, None, Some(end)) => {
                format!("{name} <= {}", crate::rules::format_number(end))
            }
            (None, None, None) => format!("{name} is missing"),
        }
    }
}

/// One association rule: antecedent item indices, consequent item
/// indices, and the rule's interest measures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationRule {
    /// Rule id, when the definition carries one
    pub id: Option<String>,
    /// Antecedent item indices
    pub lhs: Vec<usize>,
    /// Consequent item indices
    pub rhs: Vec<usize>,
    /// Confidence: P(consequent | antecedent)
    pub confidence: f64,
    /// Leverage: observed minus expected joint support
    pub leverage: f64,
    /// Lift: confidence over consequent support
    pub lift: f64,
    /// Significance of the rule
    pub p_value: f64,
    /// Joint support of antecedent and consequent
    pub support: f64,
    /// Instances the rule covers
    pub covers: f64,
}

impl AssociationRule {
    /// Builds a rule from its model-definition form.
    ///
    /// # Errors
    ///
    /// Returns `InvalidModelStructure` for malformed shapes.
    pub fn from_value(raw: &Value) -> Result<Self> {
        let Some(map) = raw.as_object() else {
            return Err(invalid_structure("association rule is not an object"));
        };
        Ok(AssociationRule {
            id: map.get("id").and_then(Value::as_str).map(str::to_string),
            lhs: index_list(map.get("lhs"), "lhs")?,
            rhs: index_list(map.get("rhs"), "rhs")?,
            confidence: map.get("confidence").and_then(Value::as_f64).unwrap_or(0.0),
            leverage: map.get("leverage").and_then(Value::as_f64).unwrap_or(0.0),
            lift: map.get("lift").and_then(Value::as_f64).unwrap_or(0.0),
            p_value: map.get("p_value").and_then(Value::as_f64).unwrap_or(0.0),
            support: map.get("support").and_then(Value::as_f64).unwrap_or(0.0),
            covers: map.get("covers").and_then(Value::as_f64).unwrap_or(0.0),
        })
    }
}

/// An association model: items, rules, and the field dictionary they
/// evaluate against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Association {
    items: Vec<AssociationItem>,
    rules: Vec<AssociationRule>,
    fields: FieldDictionary,
}

impl Association {
    /// Builds an association model from the `{items, rules}` section of
    /// a model definition.
    ///
    /// # Errors
    ///
    /// Returns `InvalidModelStructure` for malformed shapes, including
    /// rules whose indices fall outside the item list.
    pub fn from_definition(raw: &Value, fields: FieldDictionary) -> Result<Self> {
        let Some(map) = raw.as_object() else {
            return Err(invalid_structure("association definition is not an object"));
        };
        let items = match map.get("items") {
            Some(Value::Array(entries)) => entries
                .iter()
                .enumerate()
                .map(|(index, item)| AssociationItem::from_value(index, item))
                .collect::<Result<Vec<_>>>()?,
            _ => return Err(invalid_structure("association definition has no items")),
        };
        let rules = match map.get("rules") {
            Some(Value::Array(entries)) => entries
                .iter()
                .map(AssociationRule::from_value)
                .collect::<Result<Vec<_>>>()?,
            _ => Vec::new(),
        };
        for rule in &rules {
            for &index in rule.lhs.iter().chain(rule.rhs.iter()) {
                if index >= items.len() {
                    return Err(invalid_structure(format!(
                        "rule references item {index} but only {} items exist",
                        items.len()
                    )));
                }
            }
        }
        Ok(Association {
            items,
            rules,
            fields,
        })
    }

    /// The model's items.
    #[must_use]
    pub fn items(&self) -> &[AssociationItem] {
        &self.items
    }

    /// The model's rules.
    #[must_use]
    pub fn rules(&self) -> &[AssociationRule] {
        &self.rules
    }

    /// The field dictionary.
    #[must_use]
    pub fn fields(&self) -> &FieldDictionary {
        &self.fields
    }

    /// Whether a rule covers a record: the conjunction of all its LHS
    /// and RHS items' matches.
    #[must_use]
    pub fn rule_covers(&self, rule: &AssociationRule, input: &Record) -> bool {
        rule.lhs.iter().chain(rule.rhs.iter()).all(|&index| {
            let item = &self.items[index];
            item.matches(input.get(&item.field_id), &self.fields)
        })
    }
}

fn index_list(raw: Option<&Value>, what: &str) -> Result<Vec<usize>> {
    match raw {
        Some(Value::Array(entries)) => entries
            .iter()
            .map(|entry| {
                entry
                    .as_u64()
                    .map(|index| index as usize)
                    .ok_or_else(|| invalid_structure(format!("{what} entry is not an index")))
            })
            .collect(),
        _ => Err(invalid_structure(format!("rule has no {what} list"))),
    }
}
