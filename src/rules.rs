//! Rule generation: serializes a decision tree into nested conditional
//! statements in a selectable output syntax.
//!
//! A [`RuleSyntax`] is a table of literal tokens (condition keyword,
//! block delimiters, conjunction, per-operator symbols, quoting); the
//! generator itself is syntax-agnostic, so adding a new output target
//! means adding a table, not code.
//!
//! # Examples
//!
//! ```
//! use predecir::fields::{Field, FieldDictionary, OpType};
//! use predecir::rules::{RuleGenerator, RuleSyntax};
//! use predecir::tree::Tree;
//! use serde_json::json;
//!
//! let mut fields = FieldDictionary::new();
//! fields.insert(Field::new("000000", "age", OpType::Numeric));
//! let definition = json!({
//!     "predicate": true, "count": 10, "output": "young",
//!     "distribution": [["young", 6], ["old", 4]],
//!     "children": [
//!         {"predicate": {"operator": "<", "field": "000000", "value": 30},
//!          "output": "young", "count": 6, "distribution": [["young", 6]], "children": []},
//!         {"predicate": {"operator": ">=", "field": "000000", "value": 30},
//!          "output": "old", "count": 4, "distribution": [["old", 4]], "children": []}
//!     ]
//! });
//! let tree = Tree::from_definition(&definition, fields, None).unwrap();
//!
//! let text = RuleGenerator::new(&tree, RuleSyntax::PSEUDOCODE).generate();
//! assert!(text.contains("IF age < 30 THEN"));
//! assert!(text.contains("PREDICT \"young\""));
//! ```

use std::collections::HashSet;

use serde_json::Value;

use crate::fields::OpType;
use crate::predicate::{Operator, Predicate};
use crate::tree::{NodeOutput, Tree, TreeNode};

/// Literal tokens of one rule output target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleSyntax {
    /// Target name
    pub name: &'static str,
    /// Conditional keyword opening a branch
    pub condition: &'static str,
    /// Token closing the condition and opening the block
    pub block_open: &'static str,
    /// Token closing the block; empty for indentation-scoped targets
    pub block_close: &'static str,
    /// Conjunction joining two conditions
    pub conjunction: &'static str,
    /// Disjunction joining a condition with its missing-value escape
    pub disjunction: &'static str,
    /// Keyword producing the terminal output
    pub outcome: &'static str,
    /// Quote wrapped around classification outputs and term literals
    pub quote: &'static str,
    /// Template wrapping a field name into a value reference; `{}` is
    /// replaced by the display name
    pub field_template: &'static str,
    /// Function name rendering a term-occurrence count
    pub term_count: &'static str,
    /// Condition rendering a missing field value
    pub is_missing: &'static str,
    /// Condition rendering a present field value
    pub is_not_missing: &'static str,
    /// Equality token
    pub equals: &'static str,
    /// Inequality token
    pub not_equals: &'static str,
    /// Membership/containment token
    pub contains: &'static str,
    /// Indentation unit
    pub indent: &'static str,
}

impl RuleSyntax {
    /// Plain-text pseudocode target.
    pub const PSEUDOCODE: RuleSyntax = RuleSyntax {
        name: "pseudocode",
        condition: "IF",
        block_open: " THEN",
        block_close: "",
        conjunction: " AND ",
        disjunction: " OR ",
        outcome: "PREDICT",
        quote: "\"",
        field_template: "{}",
        term_count: "occurrences",
        is_missing: "{} is missing",
        is_not_missing: "{} is not missing",
        equals: "=",
        not_equals: "!=",
        contains: "in",
        indent: "    ",
    };

    /// Python-flavored target.
    pub const PYTHON: RuleSyntax = RuleSyntax {
        name: "python",
        condition: "if",
        block_open: ":",
        block_close: "",
        conjunction: " and ",
        disjunction: " or ",
        outcome: "return",
        quote: "\"",
        field_template: "record[\"{}\"]",
        term_count: "term_matches",
        is_missing: "{} is None",
        is_not_missing: "{} is not None",
        equals: "==",
        not_equals: "!=",
        contains: "in",
        indent: "    ",
    };

    fn field(&self, name: &str) -> String {
        self.field_template.replace("{}", name)
    }

    fn operator_token(&self, operator: Operator) -> &'static str {
        match operator {
            Operator::Equal => self.equals,
            Operator::NotEqual => self.not_equals,
            Operator::In => self.contains,
            Operator::LessThan => "<",
            Operator::LessOrEqual => "<=",
            Operator::GreaterOrEqual => ">=",
            Operator::GreaterThan => ">",
        }
    }
}

/// Renders a tree as nested conditional statements in one target syntax.
#[derive(Debug, Clone)]
pub struct RuleGenerator<'a> {
    tree: &'a Tree,
    syntax: RuleSyntax,
}

impl<'a> RuleGenerator<'a> {
    /// Creates a generator for one tree and target syntax.
    #[must_use]
    pub fn new(tree: &'a Tree, syntax: RuleSyntax) -> Self {
        Self { tree, syntax }
    }

    /// Renders the whole tree.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut out = String::new();
        self.render(self.tree.root(), 0, None, false, &mut out);
        out
    }

    /// Renders only the branches whose node ids appear in `ids`. When
    /// the allowlist runs out above a subtree, `subtree` selects between
    /// rendering that whole subtree unfiltered (true) or closing with
    /// the deepest allowed node's outcome (false).
    #[must_use]
    pub fn generate_filtered(&self, ids: &HashSet<u64>, subtree: bool) -> String {
        let mut out = String::new();
        self.render(self.tree.root(), 0, Some(ids), subtree, &mut out);
        out
    }

    fn render(
        &self,
        node: &TreeNode,
        depth: usize,
        allow: Option<&HashSet<u64>>,
        subtree: bool,
        out: &mut String,
    ) {
        if node.children.is_empty() {
            self.render_outcome(node, depth, out);
            return;
        }
        if let Some(ids) = allow {
            let allowed: Vec<&TreeNode> = node
                .children
                .iter()
                .filter(|child| child.id.is_some_and(|id| ids.contains(&id)))
                .collect();
            if allowed.is_empty() {
                // The allowlist ends here: either open up the whole
                // subtree or settle for this node's outcome.
                if subtree {
                    self.render_children(node, depth, None, false, out);
                } else {
                    self.render_outcome(node, depth, out);
                }
                return;
            }
            for child in allowed {
                self.render_branch(child, depth, allow, subtree, out);
            }
            return;
        }
        self.render_children(node, depth, None, false, out);
    }

    fn render_children(
        &self,
        node: &TreeNode,
        depth: usize,
        allow: Option<&HashSet<u64>>,
        subtree: bool,
        out: &mut String,
    ) {
        for child in &node.children {
            self.render_branch(child, depth, allow, subtree, out);
        }
    }

    fn render_branch(
        &self,
        child: &TreeNode,
        depth: usize,
        allow: Option<&HashSet<u64>>,
        subtree: bool,
        out: &mut String,
    ) {
        let syntax = &self.syntax;
        let indent = syntax.indent.repeat(depth);
        let condition = self.render_condition(&child.predicate);
        out.push_str(&format!(
            "{indent}{} {condition}{}\n",
            syntax.condition, syntax.block_open
        ));
        self.render(child, depth + 1, allow, subtree, out);
        if !syntax.block_close.is_empty() {
            out.push_str(&format!("{indent}{}\n", syntax.block_close));
        }
    }

    fn render_outcome(&self, node: &TreeNode, depth: usize, out: &mut String) {
        let syntax = &self.syntax;
        let indent = syntax.indent.repeat(depth);
        let value = match &node.output {
            NodeOutput::Numeric(value) => format_number(*value),
            NodeOutput::Label(label) => format!("{0}{label}{0}", syntax.quote),
        };
        out.push_str(&format!("{indent}{} {value}\n", syntax.outcome));
    }

    /// Renders one predicate as an expression in the target syntax,
    /// dispatching on the field's optype.
    fn render_condition(&self, predicate: &Predicate) -> String {
        let syntax = &self.syntax;
        let Predicate::Comparison {
            operator,
            field,
            value,
            term,
            missing,
        } = predicate
        else {
            return "true".to_string();
        };
        let fields = self.tree.fields();
        let name = syntax.field(fields.name_of(field));

        let core = if let Some(term) = term {
            let threshold = crate::fields::number_of(value).unwrap_or(0.0);
            format!(
                "{}({name}, {q}{term}{q}) {op} {n}",
                syntax.term_count,
                q = syntax.quote,
                op = syntax.operator_token(*operator),
                n = format_number(threshold),
            )
        } else if value.is_null() {
            let template = match operator {
                Operator::Equal => syntax.is_missing,
                _ => syntax.is_not_missing,
            };
            return template.replace("{}", &name);
        } else {
            let literal = self.render_value(value, fields_optype(fields, field));
            format!("{name} {} {literal}", syntax.operator_token(*operator))
        };

        if *missing {
            let escape = syntax.is_missing.replace("{}", &name);
            format!("{core}{}{escape}", syntax.disjunction)
        } else {
            core
        }
    }

    fn render_value(&self, value: &Value, optype: Option<OpType>) -> String {
        match value {
            Value::String(s) => format!("{0}{s}{0}", self.syntax.quote),
            Value::Number(n) => n
                .as_f64()
                .map_or_else(|| n.to_string(), format_number),
            other => match optype {
                Some(OpType::Categorical) => format!("{0}{other}{0}", self.syntax.quote),
                _ => other.to_string(),
            },
        }
    }
}

fn fields_optype(fields: &crate::fields::FieldDictionary, field: &str) -> Option<OpType> {
    fields.get(field).map(|meta| meta.optype)
}

/// Formats a double without a trailing fractional zero.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
