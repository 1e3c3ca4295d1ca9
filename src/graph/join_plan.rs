use std::fmt;

use crate::catalog::TableInfo;

/// `table.column = ref_table.ref_column` for one join step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOn {
    pub table: String,
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
}

impl fmt::Display for JoinOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} = {}.{}", self.table, self.column, self.ref_table, self.ref_column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinStep {
    /// the table added by this step
    pub table: TableInfo,
    pub on: JoinOn,
    pub variant: Option<String>,
}

/// Anchor first, then tables in join order. Every step's `on` references
/// the step's own table and one table placed before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPlan {
    pub anchor: TableInfo,
    pub steps: Vec<JoinStep>,
}

impl JoinPlan {
    pub fn new(anchor: TableInfo) -> Self {
        Self { anchor, steps: vec![] }
    }

    /// Bare table names in join order, anchor first.
    pub fn table_names(&self) -> Vec<String> {
        self.tables().map(|t| t.name.clone()).collect()
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableInfo> {
        std::iter::once(&self.anchor).chain(self.steps.iter().map(|s| &s.table))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables().any(|t| t.name == name || t.qualified() == name)
    }

    pub fn has_joins(&self) -> bool {
        !self.steps.is_empty()
    }
}
