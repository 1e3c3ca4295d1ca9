use std::fmt;

use ordered_float::NotNan;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    Int(i64),
    Float(NotNan<f64>),
    String(String),
    Bool(bool),
    /// Text with `*` wildcards, stored with SQL `%` wildcards.
    Pattern(String),
}

impl Literal {
    /// Classify an unquoted token.
    pub fn from_bare(token: &str) -> Literal {
        match token.to_ascii_lowercase().as_str() {
            "true" => return Literal::Bool(true),
            "false" => return Literal::Bool(false),
            _ => {}
        }

        if Self::numeric_start(token) {
            if let Ok(i) = token.parse::<i64>() {
                return Literal::Int(i);
            }
            if let Some(f) = token.parse::<f64>().ok().filter(|f| f.is_finite()).and_then(|f| NotNan::new(f).ok()) {
                return Literal::Float(f);
            }
        }

        Self::from_quoted(token)
    }

    /// Classify a quoted token; quoting only disables number and boolean parsing.
    pub fn from_quoted(token: &str) -> Literal {
        if token.contains('*') {
            Literal::Pattern(token.replace('*', "%"))
        } else {
            Literal::String(token.to_string())
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Int(i) => Some(*i as f64),
            Literal::Float(f) => Some(f.into_inner()),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }

    /// A number too large for `f64`, such as `1e999`.
    pub fn overflows(token: &str) -> bool {
        Self::numeric_start(token) && token.parse::<f64>().is_ok_and(|f| f.is_infinite())
    }

    fn numeric_start(token: &str) -> bool {
        token
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '+' || c == '.')
    }

    /// SQL text of the literal.
    pub fn to_sql(&self) -> String {
        match self {
            Literal::Int(i) => i.to_string(),
            Literal::Float(f) => format!("{:?}", f.into_inner()),
            Literal::Bool(b) => b.to_string(),
            Literal::String(s) | Literal::Pattern(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Float(v) => write!(f, "{:?}", v.into_inner()),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::String(s) => {
                let bare = !s.is_empty()
                    && s.chars().all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
                    && !Literal::overflows(s)
                    && matches!(Literal::from_bare(s), Literal::String(_));
                if bare { write!(f, "{s}") } else { write!(f, "'{s}'") }
            }
            Literal::Pattern(p) => write!(f, "'{}'", p.replace('%', "*")),
        }
    }
}
