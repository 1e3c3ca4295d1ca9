use crate::{
    catalog::{FieldReference, ParameterCatalog, ReturnType},
    graph::JoinPlan,
    parser::ast::FilterExpression,
    planner::{ColumnRef, Predicate, SortOrder, SqlWriter},
    QueryError, QueryResult,
};

/// One output column, labelled by its canonical parameter name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedField {
    pub label: String,
    pub field: FieldReference,
}

impl ProjectedField {
    pub fn column(&self) -> ColumnRef {
        ColumnRef::of(&self.field)
    }
}

/// A pipeline-info table joined under an alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasJoin {
    pub alias: String,
    /// qualified table name
    pub table: String,
    pub column: String,
    /// main-query column holding the foreign key
    pub on: ColumnRef,
}

/// `SELECT group AS group_label, count(key) AS count_label FROM table WHERE filter GROUP BY group`,
/// joined on `alias.group_label = on`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountSubquery {
    pub alias: String,
    pub schema: String,
    pub table: String,
    pub group_column: String,
    pub group_label: String,
    pub key_column: String,
    pub count_label: String,
    /// columns are qualified by `table`
    pub filter: Option<Predicate>,
    pub on: ColumnRef,
}

impl CountSubquery {
    pub fn count_column(&self) -> ColumnRef {
        ColumnRef::new(&self.alias, &self.count_label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub label: String,
    pub column: ColumnRef,
    pub order: SortOrder,
}

/// Everything needed to render or execute one request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub projection: Vec<ProjectedField>,
    pub join_plan: JoinPlan,
    pub alias_joins: Vec<AliasJoin>,
    pub subqueries: Vec<CountSubquery>,
    pub predicate: Option<Predicate>,
    pub group_by: Vec<ColumnRef>,
    pub order_by: Option<OrderBy>,
    pub filter: Option<FilterExpression>,
    pub return_type: Option<ReturnType>,
}

impl CompiledQuery {
    pub fn new(projection: Vec<ProjectedField>, join_plan: JoinPlan) -> Self {
        Self {
            projection,
            join_plan,
            alias_joins: vec![],
            subqueries: vec![],
            predicate: None,
            group_by: vec![],
            order_by: None,
            filter: None,
            return_type: None,
        }
    }

    /// Output labels in projection order.
    pub fn field_order(&self) -> Vec<String> {
        self.projection.iter().map(|p| p.label.clone()).collect()
    }

    /// Tables of the join plan in join order.
    pub fn join_names(&self) -> Vec<String> {
        self.join_plan.table_names()
    }

    pub fn has_order_by(&self) -> bool {
        self.order_by.is_some()
    }

    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty()
    }

    /// Sort by `field`, replacing any previous order.
    pub fn sort_by(&mut self, catalog: &ParameterCatalog, field: &str, order: SortOrder) -> QueryResult<()> {
        let field = catalog.resolve(field)?;
        if !self.join_plan.contains(&field.table) {
            return Err(QueryError::usage(format!("cannot sort by {}: table {} is not joined", field.name, field.table)));
        }
        let column = ColumnRef::of(&field);
        if self.is_grouped() && !self.group_by.contains(&column) {
            return Err(QueryError::usage(format!("cannot sort grouped results by {}", field.name)));
        }

        self.order_by = Some(OrderBy { label: field.name.clone(), column, order });
        Ok(())
    }

    /// PostgreSQL text of the statement with literal binds.
    pub fn to_sql(&self) -> String {
        SqlWriter::new(self).statement(None)
    }

    /// The WHERE clause alone.
    pub fn filter_sql(&self) -> Option<String> {
        self.predicate.as_ref().map(|p| p.to_string())
    }
}
