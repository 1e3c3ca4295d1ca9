use std::fmt;

use ordered_float::NotNan;

use crate::{
    catalog::FieldReference,
    parser::ast::{ComparatorOp, Literal},
};

/// A column as seen by the compiled statement: `qualifier` is a joined table
/// name, a version alias or a subquery alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub qualifier: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(qualifier: &str, column: &str) -> Self {
        Self { qualifier: qualifier.to_string(), column: column.to_string() }
    }

    pub fn of(field: &FieldReference) -> Self {
        Self::new(&field.table, &field.column)
    }

    /// `qualifier.column`, also the key of the column in executor rows.
    pub fn key(&self) -> String {
        format!("{}.{}", self.qualifier, self.column)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.qualifier, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Literal(Literal),
    /// `factor * column`
    Scaled { factor: NotNan<f64>, column: ColumnRef },
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(l) => write!(f, "{}", l.to_sql()),
            Operand::Scaled { factor, column } => write!(f, "{:?} * {}", factor.into_inner(), column),
        }
    }
}

/// Executable filter bound to the joined tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    Compare { left: ColumnRef, op: ComparatorOp, right: Operand },
    Like { column: ColumnRef, pattern: String, negated: bool },
}

impl Predicate {
    pub fn compare(left: ColumnRef, op: ComparatorOp, value: Literal) -> Self {
        Predicate::Compare { left, op, right: Operand::Literal(value) }
    }

    /// Conjunction of all parts; `None` when there are none.
    pub fn all(parts: Vec<Predicate>) -> Option<Predicate> {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Predicate::And(children) => flat.extend(children),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(Predicate::And(flat)),
        }
    }

    /// Every column the predicate reads.
    pub fn columns(&self) -> Vec<&ColumnRef> {
        match self {
            Predicate::And(children) | Predicate::Or(children) => children.iter().flat_map(|c| c.columns()).collect(),
            Predicate::Not(inner) => inner.columns(),
            Predicate::Compare { left, right: Operand::Scaled { column, .. }, .. } => vec![left, column],
            Predicate::Compare { left, .. } => vec![left],
            Predicate::Like { column, .. } => vec![column],
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::And(_) | Predicate::Or(_) => write!(f, "({self})"),
            _ => write!(f, "{self}"),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::And(children) | Predicate::Or(children) => {
                let glue = if matches!(self, Predicate::And(_)) { " AND " } else { " OR " };
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(glue)?;
                    }
                    child.fmt_child(f)?;
                }
                Ok(())
            }
            Predicate::Not(inner) => {
                f.write_str("NOT ")?;
                inner.fmt_child(f)
            }
            Predicate::Compare { left, op, right } => write!(f, "{left} {op} {right}"),
            Predicate::Like { column, pattern, negated } => {
                let like = if *negated { "NOT LIKE" } else { "LIKE" };
                write!(f, "{column} {like} {}", Literal::Pattern(pattern.clone()).to_sql())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_sql_with_grouping() {
        let p = Predicate::And(vec![
            Predicate::compare(ColumnRef::new("nsa", "z"), ComparatorOp::Lt, Literal::Float(NotNan::new(0.1).unwrap())),
            Predicate::Or(vec![
                Predicate::Like { column: ColumnRef::new("ifudesign", "name"), pattern: "127%".into(), negated: false },
                Predicate::Not(Box::new(Predicate::compare(ColumnRef::new("cube", "plate"), ComparatorOp::Eq, Literal::Int(8485)))),
            ]),
        ]);
        assert_eq!(
            p.to_string(),
            "nsa.z < 0.1 AND (ifudesign.name LIKE '127%' OR NOT cube.plate = 8485)"
        );
    }

    #[test]
    fn scaled_operand() {
        let p = Predicate::Compare {
            left: ColumnRef::new("valcount_0", "valcount"),
            op: ComparatorOp::GtEq,
            right: Operand::Scaled { factor: NotNan::new(0.2).unwrap(), column: ColumnRef::new("bingood", "goodcount") },
        };
        assert_eq!(p.to_string(), "valcount_0.valcount >= 0.2 * bingood.goodcount");
        assert_eq!(p.columns().len(), 2);
    }

    #[test]
    fn all_flattens() {
        let a = Predicate::compare(ColumnRef::new("a", "x"), ComparatorOp::Eq, Literal::Int(1));
        assert_eq!(Predicate::all(vec![]), None);
        assert_eq!(Predicate::all(vec![a.clone()]), Some(a.clone()));
        assert_eq!(
            Predicate::all(vec![Predicate::And(vec![a.clone(), a.clone()]), a.clone()]),
            Some(Predicate::And(vec![a.clone(), a.clone(), a]))
        );
    }
}
