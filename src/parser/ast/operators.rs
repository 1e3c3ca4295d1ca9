use std::fmt;

use crate::parser::FilterParser;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparatorOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq
}

impl fmt::Display for ComparatorOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparatorOp::Eq => write!(f, "="),
            ComparatorOp::NotEq => write!(f, "!="),
            ComparatorOp::Lt => write!(f, "<"),
            ComparatorOp::LtEq => write!(f, "<="),
            ComparatorOp::Gt => write!(f, ">"),
            ComparatorOp::GtEq => write!(f, ">="),
        }
    }
}

impl fmt::Debug for ComparatorOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComparatorOp({})", self)
    }
}

impl ComparatorOp {
    /// Consumes an operator at the cursor. Longer operators win over their prefixes.
    pub fn check(parser: &mut FilterParser) -> Option<ComparatorOp> {
        if parser.comparers.equal_c.compare(parser) {
            parser.jump(parser.comparers.equal_c.length);
            return Some(ComparatorOp::Eq);
        }

        if parser.comparers.not_equal.compare(parser) {
            parser.jump(parser.comparers.not_equal.length);
            return Some(ComparatorOp::NotEq);
        }

        if parser.comparers.less_than_or_equal.compare(parser) {
            parser.jump(parser.comparers.less_than_or_equal.length);
            return Some(ComparatorOp::LtEq);
        }

        if parser.comparers.greater_than_or_equal.compare(parser) {
            parser.jump(parser.comparers.greater_than_or_equal.length);
            return Some(ComparatorOp::GtEq);
        }

        if parser.comparers.equal.compare(parser) {
            parser.jump(parser.comparers.equal.length);
            return Some(ComparatorOp::Eq);
        }

        if parser.comparers.less_than.compare(parser) {
            parser.jump(parser.comparers.less_than.length);
            return Some(ComparatorOp::Lt);
        }

        if parser.comparers.greater_than.compare(parser) {
            parser.jump(parser.comparers.greater_than.length);
            return Some(ComparatorOp::Gt);
        }

        None
    }

    /// Applies the operator to an already computed ordering.
    pub fn holds(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            ComparatorOp::Eq => ordering == Equal,
            ComparatorOp::NotEq => ordering != Equal,
            ComparatorOp::Lt => ordering == Less,
            ComparatorOp::LtEq => ordering != Greater,
            ComparatorOp::Gt => ordering == Greater,
            ComparatorOp::GtEq => ordering != Less,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use super::*;

    fn check(text: &str) -> (Option<ComparatorOp>, usize) {
        let mut parser = FilterParser::new(text);
        let op = ComparatorOp::check(&mut parser);
        (op, parser.position)
    }

    #[test]
    fn two_char_operators_are_not_split() {
        assert_eq!(check("<= 1"), (Some(ComparatorOp::LtEq), 2));
        assert_eq!(check(">=1"), (Some(ComparatorOp::GtEq), 2));
        assert_eq!(check("== 1"), (Some(ComparatorOp::Eq), 2));
        assert_eq!(check("!=1"), (Some(ComparatorOp::NotEq), 2));
        assert_eq!(check("<1"), (Some(ComparatorOp::Lt), 1));
        assert_eq!(check("= 1"), (Some(ComparatorOp::Eq), 1));
    }

    #[test]
    fn no_operator() {
        assert_eq!(check("abc"), (None, 0));
    }

    #[test]
    fn holds_follows_ordering() {
        assert!(ComparatorOp::LtEq.holds(Ordering::Equal));
        assert!(ComparatorOp::LtEq.holds(Ordering::Less));
        assert!(!ComparatorOp::Gt.holds(Ordering::Equal));
        assert!(ComparatorOp::NotEq.holds(Ordering::Greater));
    }
}
