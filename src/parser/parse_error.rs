use std::fmt::Display;

use crate::parser::FilterParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    Syntax,
    /// function-call syntax naming a function without a handler
    UnknownFunction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl ParseError {
    pub fn new(message: &str, pivot: usize, parser: &FilterParser) -> Self {
        Self {
            kind: ParseErrorKind::Syntax,
            message: message.to_string(),
            text: parser.text_from_range(pivot, parser.position + 1),
            start: pivot,
            end: parser.position,
        }
    }

    pub fn unknown_function(name: &str, pivot: usize, parser: &FilterParser) -> Self {
        Self {
            kind: ParseErrorKind::UnknownFunction,
            message: format!("Unknown function '{name}'"),
            text: name.to_string(),
            start: pivot,
            end: parser.position,
        }
    }

    /// Error about an already parsed fragment rather than a cursor position.
    pub fn fragment(message: &str, text: String) -> Self {
        let end = text.chars().count();
        Self { kind: ParseErrorKind::Syntax, message: message.to_string(), text, start: 0, end }
    }

    pub fn err<T>(self) -> Result<T, ParseError> {
        Err(self)
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} near '{}' (chars {}..{})", self.message, self.text, self.start, self.end)
    }
}

impl std::error::Error for ParseError {}
