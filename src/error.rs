use thiserror::Error;

use crate::parser::{ParseError, ParseErrorKind};

pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while compiling or running a query.
///
/// Every variant is raised synchronously at the step that detects it. None of
/// them is retried by the compiler or the runner.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// A field, shortcut or function name does not resolve.
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    /// The filter text is malformed.
    #[error("your boolean expression contained a syntax error: {message} (near '{fragment}')")]
    Syntax { message: String, fragment: String },

    /// Resolved filter fields failed type or range checks.
    #[error("parameters failed to validate: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// The join graph cannot connect the required tables.
    #[error("no join path from '{from}' to '{to}'")]
    NoPath { from: String, to: String },

    /// The store or the RPC channel is unreachable.
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// Invalid combination of caller options.
    #[error("usage error: {0}")]
    Usage(String),
}

impl QueryError {
    pub fn usage(message: impl Into<String>) -> Self {
        QueryError::Usage(message.into())
    }

    pub fn connectivity(message: impl Into<String>) -> Self {
        QueryError::Connectivity(message.into())
    }

    /// Only connectivity-class errors allow auto mode to fall back to remote.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, QueryError::Connectivity(_))
    }
}

impl From<ParseError> for QueryError {
    fn from(err: ParseError) -> Self {
        match err.kind {
            ParseErrorKind::UnknownFunction => QueryError::UnknownParameter(err.text),
            ParseErrorKind::Syntax => QueryError::Syntax {
                message: err.message,
                fragment: err.text,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_joins_field_messages() {
        let err = QueryError::Validation(vec!["nsa.z: a".into(), "cube.ra: b".into()]);
        assert_eq!(err.to_string(), "parameters failed to validate: nsa.z: a; cube.ra: b");
    }

    #[test]
    fn only_connectivity_is_connectivity() {
        assert!(QueryError::connectivity("down").is_connectivity());
        assert!(!QueryError::usage("bad").is_connectivity());
        assert!(!QueryError::UnknownParameter("x".into()).is_connectivity());
    }

    #[test]
    fn parse_error_kinds_map_to_taxonomy() {
        let syntax = ParseError {
            kind: ParseErrorKind::Syntax,
            message: "Invalid condition".into(),
            text: "=!".into(),
            start: 3,
            end: 4,
        };
        assert!(matches!(QueryError::from(syntax), QueryError::Syntax { fragment, .. } if fragment == "=!"));

        let unknown = ParseError {
            kind: ParseErrorKind::UnknownFunction,
            message: "Unknown function".into(),
            text: "nperbad".into(),
            start: 0,
            end: 7,
        };
        assert_eq!(QueryError::from(unknown), QueryError::UnknownParameter("nperbad".into()));
    }
}
