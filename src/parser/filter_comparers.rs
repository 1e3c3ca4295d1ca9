use crate::parser::WordComparer;

/// Keywords and operators of the filter language.
///
/// Two-character operators are listed before their one-character prefixes and
/// must be tried first.
#[derive(Debug)]
pub struct FilterComparers {
    pub and: WordComparer,
    pub or: WordComparer,
    pub not: WordComparer,
    pub equal: WordComparer,
    pub equal_c: WordComparer, // ==
    pub not_equal: WordComparer,
    pub greater_than_or_equal: WordComparer,
    pub less_than_or_equal: WordComparer,
    pub greater_than: WordComparer,
    pub less_than: WordComparer,
}

impl Default for FilterComparers {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterComparers {
    pub fn new() -> Self {
        Self {
            and: WordComparer::new("AND").with_whitespace_postfix().with_optional_postfix('('),
            or: WordComparer::new("OR").with_whitespace_postfix().with_optional_postfix('('),
            not: WordComparer::new("NOT").with_whitespace_postfix().with_optional_postfix('('),
            equal_c: WordComparer::new("=="),
            equal: WordComparer::new("="),
            not_equal: WordComparer::new("!="),
            greater_than_or_equal: WordComparer::new(">="),
            less_than_or_equal: WordComparer::new("<="),
            greater_than: WordComparer::new(">"),
            less_than: WordComparer::new("<"),
        }
    }
}
