use std::fmt;

use crate::parser::{
    ast::{Condition, FunctionCondition},
    ParseError,
};

/// Boolean tree produced by the parser. `And`/`Or` are n-ary and keep their
/// operands in source order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterNode {
    And(Vec<FilterNode>),
    Or(Vec<FilterNode>),
    Not(Box<FilterNode>),
    Condition(Condition),
    Function(FunctionCondition),
}

impl FilterNode {
    /// `left op right`, flattening operands that already use `op`.
    pub fn combine(is_and: bool, left: FilterNode, right: FilterNode) -> FilterNode {
        let mut operands = Vec::new();
        for node in [left, right] {
            match (is_and, node) {
                (true, FilterNode::And(children)) | (false, FilterNode::Or(children)) => operands.extend(children),
                (_, other) => operands.push(other),
            }
        }
        if is_and { FilterNode::And(operands) } else { FilterNode::Or(operands) }
    }

    pub fn contains_function(&self) -> bool {
        match self {
            FilterNode::And(children) | FilterNode::Or(children) => children.iter().any(|c| c.contains_function()),
            FilterNode::Not(inner) => inner.contains_function(),
            FilterNode::Condition(_) => false,
            FilterNode::Function(_) => true,
        }
    }

    /// Leaf conditions in source order.
    pub fn conditions(&self) -> Vec<&Condition> {
        let mut out = Vec::new();
        self.collect_conditions(&mut out);
        out
    }

    fn collect_conditions<'a>(&'a self, out: &mut Vec<&'a Condition>) {
        match self {
            FilterNode::And(children) | FilterNode::Or(children) => {
                for child in children {
                    child.collect_conditions(out);
                }
            }
            FilterNode::Not(inner) => inner.collect_conditions(out),
            FilterNode::Condition(c) => out.push(c),
            FilterNode::Function(f) => out.push(&f.condition),
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, parent_and: bool) -> fmt::Result {
        match (self, parent_and) {
            (FilterNode::Or(_), true) | (FilterNode::And(_), false) => write!(f, "({self})"),
            _ => write!(f, "{self}"),
        }
    }
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterNode::And(children) | FilterNode::Or(children) => {
                let is_and = matches!(self, FilterNode::And(_));
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(if is_and { " and " } else { " or " })?;
                    }
                    child.fmt_operand(f, is_and)?;
                }
                Ok(())
            }
            FilterNode::Not(inner) => match inner.as_ref() {
                FilterNode::And(_) | FilterNode::Or(_) => write!(f, "not ({inner})"),
                _ => write!(f, "not {inner}"),
            },
            FilterNode::Condition(c) => write!(f, "{c}"),
            FilterNode::Function(func) => write!(f, "{func}"),
        }
    }
}

/// A parsed filter: the boolean tree without its aggregate conditions, plus
/// the aggregate conditions that were conjoined at the top level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterExpression {
    pub root: Option<FilterNode>,
    pub functions: Vec<FunctionCondition>,
}

impl FilterExpression {
    /// Split top-level function conditions off the tree. A function anywhere
    /// below `or` or `not` cannot be evaluated per group and is rejected.
    pub fn from_tree(node: FilterNode) -> Result<FilterExpression, ParseError> {
        match node {
            FilterNode::Function(function) => Ok(FilterExpression { root: None, functions: vec![function] }),
            FilterNode::And(children) => {
                let mut functions = Vec::new();
                let mut rest = Vec::new();
                for child in children {
                    match child {
                        FilterNode::Function(function) => functions.push(function),
                        other => {
                            Self::reject_nested_function(&other)?;
                            rest.push(other);
                        }
                    }
                }
                let root = match rest.len() {
                    0 => None,
                    1 => rest.pop(),
                    _ => Some(FilterNode::And(rest)),
                };
                Ok(FilterExpression { root, functions })
            }
            other => {
                Self::reject_nested_function(&other)?;
                Ok(FilterExpression { root: Some(other), functions: vec![] })
            }
        }
    }

    fn reject_nested_function(node: &FilterNode) -> Result<(), ParseError> {
        if node.contains_function() {
            return ParseError::fragment(
                "Function conditions can only be combined with 'and'",
                node.to_string(),
            ).err();
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none() && self.functions.is_empty()
    }

    /// Unique field names, tree conditions first, then function inner conditions.
    pub fn fields(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let tree = self.root.iter().flat_map(|r| r.conditions());
        let inner = self.functions.iter().map(|f| &f.condition);
        for condition in tree.chain(inner) {
            if !out.contains(&condition.field) {
                out.push(condition.field.clone());
            }
        }
        out
    }

    /// Every leaf condition of the tree, function conditions excluded.
    pub fn conditions(&self) -> Vec<&Condition> {
        self.root.as_ref().map(|r| r.conditions()).unwrap_or_default()
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        if let Some(root) = &self.root {
            match root {
                FilterNode::Or(_) if !self.functions.is_empty() => write!(f, "({root})")?,
                _ => write!(f, "{root}")?,
            }
            first = false;
        }
        for function in &self.functions {
            if !first {
                f.write_str(" and ")?;
            }
            write!(f, "{function}")?;
            first = false;
        }
        Ok(())
    }
}
