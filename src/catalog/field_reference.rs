use std::fmt;

use crate::catalog::ParamType;

/// A queryable column, fully qualified.
///
/// - `name` is the canonical parameter name (`table.column`) used for labels.
/// - `requires` names a table whose join the field implies even though the
///   column lives elsewhere (`cube.plateifu` needs `ifudesign`).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FieldReference {
    pub schema: String,
    pub table: String,
    pub column: String,
    pub name: String,
    pub display: String,
    pub param_type: ParamType,
    pub best: bool,
    pub requires: Option<String>,
}

impl FieldReference {
    pub fn new(schema: &str, table: &str, column: &str, param_type: ParamType) -> Self {
        Self {
            schema: schema.to_string(),
            table: table.to_string(),
            column: column.to_string(),
            name: format!("{table}.{column}"),
            display: column.to_string(),
            param_type,
            best: false,
            requires: None,
        }
    }

    pub fn with_display(mut self, display: &str) -> Self { self.display = display.to_string(); self }
    pub fn with_best(mut self) -> Self { self.best = true; self }
    pub fn with_requires(mut self, table: &str) -> Self { self.requires = Some(table.to_string()); self }

    /// `schema.table`
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    /// `schema.table.column`, the form used in compiled SQL.
    pub fn qualified_column(&self) -> String {
        format!("{}.{}.{}", self.schema, self.table, self.column)
    }
}

impl fmt::Display for FieldReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_column())
    }
}

impl fmt::Debug for FieldReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldReference({} as {})", self.qualified_column(), self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_forms() {
        let field = FieldReference::new("mangasampledb", "nsa", "z", ParamType::Float);
        assert_eq!(field.name, "nsa.z");
        assert_eq!(field.qualified_table(), "mangasampledb.nsa");
        assert_eq!(field.qualified_column(), "mangasampledb.nsa.z");
        assert_eq!(format!("{:?}", field), "FieldReference(mangasampledb.nsa.z as nsa.z)");
    }
}
