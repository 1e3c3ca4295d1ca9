use tracing::debug;

use crate::{
    catalog::ParameterCatalog,
    parser::{
        ast::{ComparatorOp, Condition, FilterExpression, FilterNode, FunctionCondition, FunctionKind, Literal},
        substitute_shortcuts, FilterComparers, ParseError,
    },
    QueryResult,
};

/// Cursor over a filter string.
///
/// Grammar, `and`/`or` sharing one level and associating left to right:
///
/// ```text
/// sequence  := unary (("and" | "or") unary)*
/// unary     := "not" unary | "(" sequence ")" | function | condition
/// function  := name "(" condition ")" op number
/// condition := name op value
/// ```
#[derive(Debug, Default)]
pub struct FilterParser {
    pub position: usize,
    pub length: usize,
    pub text_v: Vec<char>,
    pub text: String,

    pub comparers: FilterComparers,
}

impl FilterParser {
    pub fn new(text: &str) -> Self {
        let text_v: Vec<char> = text.chars().collect();
        Self {
            position: 0,
            length: text_v.len(),
            text_v,
            text: text.to_string(),
            comparers: FilterComparers::new(),
        }
    }

    /// Substitute shortcuts, then parse.
    pub fn parse(text: &str, catalog: &ParameterCatalog) -> QueryResult<FilterExpression> {
        let expanded = substitute_shortcuts(text, catalog);
        debug!(filter = %expanded, "parsing filter");
        Ok(FilterParser::new(&expanded).parse_expression()?)
    }

    pub fn eof(&self) -> bool {
        self.position >= self.length
    }

    pub fn current(&self) -> char {
        if self.position < self.length {
            return self.text_v[self.position];
        }

        '\0'
    }

    pub fn next(&mut self) {
        if self.position < self.length {
            self.position += 1;
        }
    }

    pub fn next_non_whitespace(&mut self) {
        while self.current().is_whitespace() {
            self.next();
        }
    }

    pub fn jump(&mut self, ahead: usize) {
        self.position = (self.position + ahead).min(self.length);
    }

    pub fn text_from_range(&self, start: usize, end: usize) -> String {
        let end = end.min(self.length);
        let start = start.min(end);
        self.text_v[start..end].iter().collect()
    }

    pub fn text_from_pivot(&self, pivot: usize) -> String {
        self.text_from_range(pivot, self.position)
    }

    /// Parse the whole text.
    pub fn parse_expression(&mut self) -> Result<FilterExpression, ParseError> {
        self.next_non_whitespace();
        if self.eof() {
            return ParseError::new("Empty filter", 0, self).err();
        }

        let node = self.parse_sequence(0)?;
        FilterExpression::from_tree(node)
    }

    fn parse_sequence(&mut self, depth: usize) -> Result<FilterNode, ParseError> {
        let mut node = self.parse_unary(depth)?;

        loop {
            self.next_non_whitespace();
            if self.eof() {
                break;
            }

            if self.current() == ')' {
                if depth > 0 {
                    break;
                }
                return ParseError::new("Unbalanced parenthesis", self.position, self).err();
            }

            let is_and = if self.comparers.and.compare(self) {
                self.jump(self.comparers.and.length);
                true
            } else if self.comparers.or.compare(self) {
                self.jump(self.comparers.or.length);
                false
            } else {
                return ParseError::new("Expected 'and' or 'or'", self.position, self).err();
            };

            let right = self.parse_unary(depth)?;
            node = FilterNode::combine(is_and, node, right);
        }

        Ok(node)
    }

    fn parse_unary(&mut self, depth: usize) -> Result<FilterNode, ParseError> {
        self.next_non_whitespace();
        if self.eof() {
            return ParseError::new("Expected a condition", self.position, self).err();
        }

        if self.comparers.not.compare(self) {
            self.jump(self.comparers.not.length);
            let inner = self.parse_unary(depth)?;
            return Ok(FilterNode::Not(Box::new(inner)));
        }

        if self.current() == '(' {
            let pivot = self.position;
            self.next();
            let inner = self.parse_sequence(depth + 1)?;
            self.next_non_whitespace();
            if self.current() != ')' {
                return ParseError::new("Expected ')'", pivot, self).err();
            }
            self.next();
            return Ok(inner);
        }

        let pivot = self.position;
        let name = self.parse_name();
        if name.is_empty() {
            return ParseError::new("Expected a parameter name", pivot, self).err();
        }

        self.next_non_whitespace();
        if self.current() == '(' {
            return self.parse_function(&name, pivot).map(FilterNode::Function);
        }

        self.parse_condition_tail(&name, pivot).map(FilterNode::Condition)
    }

    fn parse_function(&mut self, name: &str, pivot: usize) -> Result<FunctionCondition, ParseError> {
        let Some(kind) = FunctionKind::from_name(name) else {
            return ParseError::unknown_function(name, pivot, self).err();
        };
        self.next();

        self.next_non_whitespace();
        let inner_pivot = self.position;
        let field = self.parse_name();
        if field.is_empty() {
            return ParseError::new("Expected a parameter name", inner_pivot, self).err();
        }
        let condition = self.parse_condition_tail(&field, inner_pivot)?;

        self.next_non_whitespace();
        if self.current() != ')' {
            return ParseError::new("Expected ')'", pivot, self).err();
        }
        self.next();

        self.next_non_whitespace();
        let Some(op) = ComparatorOp::check(self) else {
            return ParseError::new("Expected a comparison operator", pivot, self).err();
        };
        let value = self.parse_value()?;
        if !value.is_numeric() {
            return ParseError::new("Function threshold must be a number", pivot, self).err();
        }

        Ok(FunctionCondition { kind, condition, op, value })
    }

    fn parse_condition_tail(&mut self, field: &str, pivot: usize) -> Result<Condition, ParseError> {
        self.next_non_whitespace();
        let Some(op) = ComparatorOp::check(self) else {
            return ParseError::new("Expected a comparison operator", pivot, self).err();
        };
        let value = self.parse_value()?;

        Ok(Condition::new(field, op, value))
    }

    fn parse_name(&mut self) -> String {
        let pivot = self.position;
        while !self.eof() && (self.current().is_alphanumeric() || self.current() == '_' || self.current() == '.') {
            self.next();
        }
        self.text_from_pivot(pivot)
    }

    fn parse_value(&mut self) -> Result<Literal, ParseError> {
        self.next_non_whitespace();
        if self.eof() {
            return ParseError::new("Expected a value", self.position, self).err();
        }

        let quote = self.current();
        if quote == '\'' || quote == '"' {
            let pivot = self.position;
            self.next();
            let start = self.position;
            while !self.eof() && self.current() != quote {
                self.next();
            }
            if self.eof() {
                return ParseError::new("Unterminated string", pivot, self).err();
            }
            let value = self.text_from_pivot(start);
            self.next();
            return Ok(Literal::from_quoted(&value));
        }

        let pivot = self.position;
        while !self.eof() && !self.current().is_whitespace() && self.current() != '(' && self.current() != ')' {
            self.next();
        }
        let token = self.text_from_pivot(pivot);
        if token.is_empty() {
            return ParseError::new("Expected a value", pivot, self).err();
        }

        if Literal::overflows(&token) {
            return ParseError::new("Number out of range", pivot, self).err();
        }
        Ok(Literal::from_bare(&token))
    }
}
