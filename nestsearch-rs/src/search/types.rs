//! Expression tree for hierarchical queries.

use crate::condition::{Condition, ConditionSet};
use crate::types::Combine;
use serde::{Deserialize, Serialize};

/// The five structural operators, in detection precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierOperator {
    /// `<<=>>`: same node, or either side nested in the other at any depth.
    DeepBidirectional,
    /// `<=>`: same node, or either side a direct child of the other.
    Bidirectional,
    /// `>>`: left is an ancestor of right.
    DeepStrict,
    /// `=>`: same node, or left is a parent of right.
    Flexible,
    /// `>`: left is the direct parent of right.
    Strict,
}

impl HierOperator {
    /// All operators, most specific token first.
    pub const PRECEDENCE: [HierOperator; 5] = [
        HierOperator::DeepBidirectional,
        HierOperator::Bidirectional,
        HierOperator::DeepStrict,
        HierOperator::Flexible,
        HierOperator::Strict,
    ];

    pub fn token(self) -> &'static str {
        match self {
            HierOperator::DeepBidirectional => "<<=>>",
            HierOperator::Bidirectional => "<=>",
            HierOperator::DeepStrict => ">>",
            HierOperator::Flexible => "=>",
            HierOperator::Strict => ">",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::PRECEDENCE.into_iter().find(|op| op.token() == token)
    }

    /// Whether traversal goes beyond direct children.
    pub fn is_deep(self) -> bool {
        matches!(self, HierOperator::DeepStrict | HierOperator::DeepBidirectional)
    }

    pub fn default_depth(self) -> usize {
        match self {
            HierOperator::DeepStrict => 3,
            HierOperator::DeepBidirectional => 5,
            _ => 1,
        }
    }
}

impl std::fmt::Display for HierOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// Search kind inferred for a leaf term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TermKind {
    Text,
    PageRef,
    BlockRef,
    Regex {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        flags: Option<String>,
    },
}

/// A leaf of the expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    /// Text with prefixes, quotes and markers removed.
    pub text: String,

    #[serde(flatten)]
    pub kind: TermKind,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub negate: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub expand: bool,
}

impl Term {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: TermKind::Text,
            negate: false,
            expand: false,
        }
    }

    /// Lower the term into a condition.
    pub fn to_condition(&self) -> Condition {
        let mut condition = match &self.kind {
            TermKind::Text => Condition::text(&self.text),
            TermKind::PageRef => Condition::page_ref(&self.text),
            TermKind::BlockRef => Condition::block_ref(&self.text),
            TermKind::Regex { flags } => Condition::regex(&self.text, flags.as_deref()),
        };
        condition.negate = self.negate;
        condition.expand = self.expand;
        condition
    }
}

/// A parsed query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expression {
    Term(Term),
    Compound {
        operator: Combine,
        operands: Vec<Expression>,
    },
    Hierarchical {
        operator: HierOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        max_depth: usize,
    },
}

impl Expression {
    pub fn is_hierarchical(&self) -> bool {
        matches!(self, Expression::Hierarchical { .. })
    }

    /// Reduce an operand to a flat condition set.
    ///
    /// Leaves are collected in order; the combine rule is the operand's
    /// top-level operator (AND for a bare term). Nested compounds of the other
    /// operator are flattened into it.
    pub fn to_condition_set(&self) -> ConditionSet {
        let combine = match self {
            Expression::Compound { operator, .. } => *operator,
            _ => Combine::And,
        };
        let mut conditions = Vec::new();
        self.collect_conditions(&mut conditions);
        ConditionSet::new(conditions, combine)
    }

    fn collect_conditions(&self, out: &mut Vec<Condition>) {
        match self {
            Expression::Term(term) => out.push(term.to_condition()),
            Expression::Compound { operands, .. } => {
                for operand in operands {
                    operand.collect_conditions(out);
                }
            }
            Expression::Hierarchical { left, right, .. } => {
                left.collect_conditions(out);
                right.collect_conditions(out);
            }
        }
    }

    /// Whether a compound of one operator contains a compound of the other,
    /// which `to_condition_set` cannot represent exactly.
    pub fn has_mixed_compounds(&self) -> bool {
        fn walk(expr: &Expression, parent: Option<Combine>) -> bool {
            match expr {
                Expression::Term(_) => false,
                Expression::Compound { operator, operands } => {
                    parent.is_some_and(|p| p != *operator)
                        || operands.iter().any(|o| walk(o, Some(*operator)))
                }
                Expression::Hierarchical { left, right, .. } => {
                    walk(left, None) || walk(right, None)
                }
            }
        }
        walk(self, None)
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.negate {
            f.write_str("-")?;
        }
        match &self.kind {
            TermKind::Text if needs_quotes(&self.text) => write!(f, "\"{}\"", self.text)?,
            TermKind::Text => f.write_str(&self.text)?,
            TermKind::PageRef => write!(f, "ref:[[{}]]", self.text)?,
            TermKind::BlockRef => write!(f, "ref:(({}))", self.text)?,
            TermKind::Regex { flags } => {
                write!(f, "regex:/{}/{}", self.text, flags.as_deref().unwrap_or(""))?
            }
        }
        if self.expand {
            f.write_str("~")?;
        }
        Ok(())
    }
}

fn needs_quotes(text: &str) -> bool {
    text.starts_with('-')
        || text.ends_with('~')
        || text.chars().any(|c| matches!(c, '<' | '=' | '>' | '+' | '|' | '(' | ')'))
}

/// Renders the expression back into query syntax.
impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Term(term) => write!(f, "{}", term),
            Expression::Compound { operator, operands } => {
                let sep = match operator {
                    Combine::And => " + ",
                    Combine::Or => " | ",
                };
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    match operand {
                        Expression::Term(_) => write!(f, "{}", operand)?,
                        _ => write!(f, "({})", operand)?,
                    }
                }
                Ok(())
            }
            Expression::Hierarchical {
                operator,
                left,
                right,
                ..
            } => write!(f, "{} {} {}", left, operator, right),
        }
    }
}
