use ordered_float::NotNan;
use tracing::debug;

use crate::{
    catalog::{FieldReference, ParameterCatalog},
    parser::ast::{ComparatorOp, FunctionCondition, FunctionKind, Literal},
    planner::{ColumnRef, CompiledQuery, CountSubquery, FilterBinder, Operand, Predicate},
    QueryError, QueryResult,
};

/// Turns a per-element query into a per-object one.
///
/// Each `npergood(cond) op pct` becomes two grouped count subqueries over the
/// per-element table, valid elements (`bingood`) and valid elements meeting
/// `cond` (`valcount_N`), joined on the group key and compared with
/// `valcount op pct/100 * goodcount`.
pub struct AggregateRewrite<'a> {
    catalog: &'a ParameterCatalog,
}

impl<'a> AggregateRewrite<'a> {
    pub fn new(catalog: &'a ParameterCatalog) -> Self {
        Self { catalog }
    }

    /// Whether any of the filter fields lives in the schema of the per-element tables.
    pub fn applies_to(&self, filter_fields: &[FieldReference]) -> bool {
        let Some(schema) = self
            .catalog
            .aggregate_source()
            .and_then(|s| self.catalog.table(&s.table))
            .map(|t| t.schema.as_str())
        else {
            return false;
        };
        filter_fields.iter().any(|f| f.schema == schema)
    }

    /// `defaults` are the default fields of the request; the grouped result
    /// keeps the ones that are not per element.
    pub fn apply(
        &self,
        query: &mut CompiledQuery,
        functions: &[FunctionCondition],
        defaults: &[FieldReference],
    ) -> QueryResult<()> {
        if functions.is_empty() {
            return Ok(());
        }
        let source = self
            .catalog
            .aggregate_source()
            .ok_or_else(|| QueryError::Validation(vec!["no per-element table to aggregate".to_string()]))?;
        let table = self
            .catalog
            .table(&source.table)
            .ok_or_else(|| QueryError::UnknownParameter(format!("table {}", source.table)))?;
        if !query.join_plan.contains(&table.name) {
            return Err(QueryError::usage(format!("aggregate filters need {} to be joined", table.name)));
        }

        let on = ColumnRef::new(&table.name, &source.group_key);
        let invalid = source
            .invalid
            .as_ref()
            .map(|(column, value)| Predicate::compare(ColumnRef::new(&table.name, column), ComparatorOp::NotEq, Literal::Int(*value)));

        let subquery = |alias: &str, group_label: &str, count_label: &str, filter: Option<Predicate>| CountSubquery {
            alias: alias.to_string(),
            schema: table.schema.clone(),
            table: table.name.clone(),
            group_column: source.group_key.clone(),
            group_label: group_label.to_string(),
            key_column: source.key.clone(),
            count_label: count_label.to_string(),
            filter,
            on: on.clone(),
        };

        let good = subquery("bingood", "binfile", "goodcount", invalid.clone());
        let good_count = good.count_column();
        query.subqueries.push(good);

        let binder = FilterBinder::new(self.catalog);
        let mut filters = query.predicate.take().into_iter().collect::<Vec<_>>();
        for (i, function) in functions.iter().enumerate() {
            match function.kind {
                FunctionKind::PercentOfGood => {
                    let inner = binder.bind_condition(&function.condition, None)?;
                    let filter = Predicate::all(invalid.iter().cloned().chain([inner]).collect());
                    let counted = subquery(&format!("valcount_{i}"), "valfile", "valcount", filter);

                    let factor = NotNan::new(function.fraction()).map_err(|_| {
                        QueryError::Validation(vec![format!("{}: threshold is not a number", function.kind.name())])
                    })?;
                    filters.push(Predicate::Compare {
                        left: counted.count_column(),
                        op: function.op,
                        right: Operand::Scaled { factor, column: good_count.clone() },
                    });
                    query.subqueries.push(counted);
                }
            }
        }
        query.predicate = Predicate::all(filters);

        debug!(functions = functions.len(), "applied aggregate rewrite");
        self.group_by_objects(query, defaults);
        Ok(())
    }

    /// Group by the default fields that are not per element and reduce the
    /// projection to them, one row per object.
    pub fn group_by_objects(&self, query: &mut CompiledQuery, defaults: &[FieldReference]) {
        query
            .projection
            .retain(|p| defaults.contains(&p.field) && !self.catalog.is_per_element(&p.field));
        query.group_by = query.projection.iter().map(|p| p.column()).collect();
        if query.order_by.as_ref().is_some_and(|o| !query.group_by.contains(&o.column)) {
            query.order_by = None;
        }
    }
}
