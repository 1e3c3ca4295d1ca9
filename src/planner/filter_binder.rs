use crate::{
    catalog::{FieldReference, ParamType, ParameterCatalog},
    parser::ast::{ComparatorOp, Condition, FilterExpression, FilterNode, FunctionCondition, Literal},
    planner::{ColumnRef, Predicate},
    QueryError, QueryResult,
};

/// Checks a parsed filter against the catalog and turns it into a
/// [`Predicate`] over the joined tables.
pub struct FilterBinder<'a> {
    catalog: &'a ParameterCatalog,
}

impl<'a> FilterBinder<'a> {
    pub fn new(catalog: &'a ParameterCatalog) -> Self {
        Self { catalog }
    }

    /// Every problem of every condition is reported at once.
    pub fn validate(&self, filter: &FilterExpression) -> QueryResult<()> {
        let mut messages = Vec::new();

        for condition in filter.conditions() {
            let field = self.catalog.resolve(&condition.field)?;
            messages.extend(Self::check(condition, &field));
        }
        for function in &filter.functions {
            let field = self.catalog.resolve(&function.condition.field)?;
            messages.extend(Self::check(&function.condition, &field));
            messages.extend(self.check_function(function, &field));
        }

        if messages.is_empty() {
            Ok(())
        } else {
            Err(QueryError::Validation(messages))
        }
    }

    /// Predicate for the boolean tree; function conditions are handled by
    /// the aggregate rewrite.
    pub fn bind(&self, filter: &FilterExpression) -> QueryResult<Option<Predicate>> {
        filter.root.as_ref().map(|node| self.bind_node(node)).transpose()
    }

    /// A single condition, optionally qualified by something other than the
    /// field's own table.
    pub fn bind_condition(&self, condition: &Condition, qualifier: Option<&str>) -> QueryResult<Predicate> {
        let field = self.catalog.resolve(&condition.field)?;
        let mut column = ColumnRef::of(&field);
        if let Some(q) = qualifier {
            column.qualifier = q.to_string();
        }

        Ok(match &condition.value {
            Literal::Pattern(pattern) => Predicate::Like {
                column,
                pattern: pattern.clone(),
                negated: condition.op == ComparatorOp::NotEq,
            },
            value => Predicate::compare(column, condition.op, Self::coerce(&field, value)),
        })
    }

    fn bind_node(&self, node: &FilterNode) -> QueryResult<Predicate> {
        Ok(match node {
            FilterNode::And(children) => Predicate::And(children.iter().map(|c| self.bind_node(c)).collect::<QueryResult<_>>()?),
            FilterNode::Or(children) => Predicate::Or(children.iter().map(|c| self.bind_node(c)).collect::<QueryResult<_>>()?),
            FilterNode::Not(inner) => Predicate::Not(Box::new(self.bind_node(inner)?)),
            FilterNode::Condition(condition) => self.bind_condition(condition, None)?,
            FilterNode::Function(function) => {
                return Err(QueryError::Syntax {
                    message: "Function conditions can only be combined with 'and'".to_string(),
                    fragment: function.to_string(),
                });
            }
        })
    }

    fn check(condition: &Condition, field: &FieldReference) -> Vec<String> {
        let mut messages = Vec::new();
        let name = &field.name;
        let ordering = !matches!(condition.op, ComparatorOp::Eq | ComparatorOp::NotEq);

        if let Literal::Pattern(_) = condition.value {
            if field.param_type != ParamType::String {
                messages.push(format!("{name}: wildcard patterns need a string parameter"));
            }
            if ordering {
                messages.push(format!("{name}: wildcard patterns only support = and !="));
            }
            return messages;
        }

        if ordering && !field.param_type.is_numeric() {
            messages.push(format!("{name}: operator {} needs a numeric parameter", condition.op));
        }
        if !field.param_type.accepts(&condition.value) {
            messages.push(format!("{name}: expected {}, got {}", field.param_type.name(), condition.value));
        }
        messages
    }

    fn check_function(&self, function: &FunctionCondition, field: &FieldReference) -> Option<String> {
        let name = function.kind.name();
        match self.catalog.aggregate_source() {
            None => Some(format!("{name}: no per-element table to aggregate")),
            Some(source) if source.table != field.table => {
                Some(format!("{name}: the condition must use a {} parameter, got {}", source.table, field.name))
            }
            Some(_) => None,
        }
    }

    /// Literal in the field's own kind; text columns compare against text.
    fn coerce(field: &FieldReference, value: &Literal) -> Literal {
        match (field.param_type, value) {
            (ParamType::String, Literal::Int(_) | Literal::Float(_) | Literal::Bool(_)) => Literal::String(value.to_string()),
            _ => value.clone(),
        }
    }
}
