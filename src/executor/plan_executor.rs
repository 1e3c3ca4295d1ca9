use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    executor::{eval::Eval, helpers::Helpers},
    planner::{AliasJoin, ColumnRef, CompiledQuery, CountSubquery, SortOrder},
    QueryResult,
};

type JoinedRow = Map<String, Value>;

/// Raw table contents, keyed by bare column name.
pub trait TableSource {
    /// Rows of `schema.table`.
    fn table_rows(&self, qualified: &str) -> QueryResult<Vec<Map<String, Value>>>;
}

/// Runs a [`CompiledQuery`] directly over a [`TableSource`], step for step
/// as the rendered SQL would: joins, alias joins, count subqueries, WHERE,
/// GROUP BY, ORDER BY and the window.
pub struct PlanExecutor<'a> {
    query: &'a CompiledQuery,
}

impl<'a> PlanExecutor<'a> {
    pub fn new(query: &'a CompiledQuery) -> Self {
        Self { query }
    }

    /// Projected tuples inside `window`.
    pub fn execute(&self, source: &dyn TableSource, window: Option<(u64, u64)>) -> QueryResult<Vec<Vec<Value>>> {
        let rows = self.matching_rows(source)?;
        Ok(Self::slice(rows, window).iter().map(|r| self.project(r)).collect())
    }

    /// Number of rows the statement returns inside `window`.
    pub fn count(&self, source: &dyn TableSource, window: Option<(u64, u64)>) -> QueryResult<u64> {
        let total = self.matching_rows(source)?.len() as u64;
        Ok(match window {
            Some((start, end)) => end.min(total).saturating_sub(start),
            None => total,
        })
    }

    /// Filtered, grouped and ordered rows before projection.
    pub fn matching_rows(&self, source: &dyn TableSource) -> QueryResult<Vec<JoinedRow>> {
        let q = self.query;
        let anchor = &q.join_plan.anchor;
        let mut rows = Self::scan(source, &anchor.qualified(), &anchor.name)?;

        for step in &q.join_plan.steps {
            let right = Self::scan(source, &step.table.qualified(), &step.table.name)?;
            let (left_key, right_key) = if step.on.table == step.table.name {
                (ColumnRef::new(&step.on.ref_table, &step.on.ref_column), ColumnRef::new(&step.on.table, &step.on.column))
            } else {
                (ColumnRef::new(&step.on.table, &step.on.column), ColumnRef::new(&step.on.ref_table, &step.on.ref_column))
            };
            rows = Self::hash_join(rows, right, &left_key, &right_key);
        }

        for alias in &q.alias_joins {
            rows = self.alias_join(source, rows, alias)?;
        }
        for sub in &q.subqueries {
            rows = self.subquery_join(source, rows, sub)?;
        }

        if let Some(predicate) = &q.predicate {
            let eval = Eval::new(predicate);
            rows.retain(|r| eval.matches(r));
        }

        if q.is_grouped() {
            let mut seen = HashSet::new();
            rows.retain(|r| {
                let key: Vec<Value> = q.group_by.iter().map(|c| Eval::column(c, r)).collect();
                seen.insert(Helpers::canonical_tuple(&key))
            });
        }

        if let Some(order) = &q.order_by {
            let ascending = order.order == SortOrder::Asc;
            // stable
            rows.sort_by(|a, b| Helpers::cmp_json_for_sort(&Eval::column(&order.column, a), &Eval::column(&order.column, b), ascending));
        }

        debug!(rows = rows.len(), tables = q.join_plan.steps.len() + 1, "executed plan");
        Ok(rows)
    }

    fn project(&self, row: &JoinedRow) -> Vec<Value> {
        self.query.projection.iter().map(|p| Eval::column(&p.column(), row)).collect()
    }

    fn slice(rows: Vec<JoinedRow>, window: Option<(u64, u64)>) -> Vec<JoinedRow> {
        match window {
            Some((start, end)) => {
                let start = (start as usize).min(rows.len());
                let end = (end as usize).clamp(start, rows.len());
                rows.into_iter().skip(start).take(end - start).collect()
            }
            None => rows,
        }
    }

    fn scan(source: &dyn TableSource, qualified: &str, visible: &str) -> QueryResult<Vec<JoinedRow>> {
        Ok(source
            .table_rows(qualified)?
            .into_iter()
            .map(|row| row.into_iter().map(|(k, v)| (format!("{visible}.{k}"), v)).collect())
            .collect())
    }

    fn hash_join(left: Vec<JoinedRow>, right: Vec<JoinedRow>, left_key: &ColumnRef, right_key: &ColumnRef) -> Vec<JoinedRow> {
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, r) in right.iter().enumerate() {
            if let Some(key) = Helpers::join_key(&Eval::column(right_key, r)) {
                index.entry(key).or_default().push(i);
            }
        }

        let mut out = Vec::new();
        for l in left {
            let Some(matches) = Helpers::join_key(&Eval::column(left_key, &l)).and_then(|k| index.get(&k)) else {
                continue;
            };
            for &i in matches {
                let mut merged = l.clone();
                merged.extend(right[i].iter().map(|(k, v)| (k.clone(), v.clone())));
                out.push(merged);
            }
        }
        out
    }

    fn alias_join(&self, source: &dyn TableSource, rows: Vec<JoinedRow>, alias: &AliasJoin) -> QueryResult<Vec<JoinedRow>> {
        let right = Self::scan(source, &alias.table, &alias.alias)?;
        Ok(Self::hash_join(rows, right, &alias.on, &ColumnRef::new(&alias.alias, &alias.column)))
    }

    /// `SELECT group, count(key) ... GROUP BY group`, joined on the group key.
    fn subquery_join(&self, source: &dyn TableSource, rows: Vec<JoinedRow>, sub: &CountSubquery) -> QueryResult<Vec<JoinedRow>> {
        let inner = Self::scan(source, &format!("{}.{}", sub.schema, sub.table), &sub.table)?;
        let group = ColumnRef::new(&sub.table, &sub.group_column);
        let key = ColumnRef::new(&sub.table, &sub.key_column);

        let mut counts: Vec<(Value, i64)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let filter = sub.filter.as_ref().map(Eval::new);
        for row in inner.iter().filter(|r| filter.as_ref().is_none_or(|f| f.matches(r))) {
            let group_value = Eval::column(&group, row);
            let Some(group_key) = Helpers::join_key(&group_value) else {
                continue;
            };
            let counted = i64::from(!Eval::column(&key, row).is_null());
            match positions.get(&group_key) {
                Some(&i) => counts[i].1 += counted,
                None => {
                    positions.insert(group_key, counts.len());
                    counts.push((group_value, counted));
                }
            }
        }

        let grouped: Vec<JoinedRow> = counts
            .into_iter()
            .map(|(g, n)| {
                let mut row = Map::new();
                row.insert(format!("{}.{}", sub.alias, sub.group_label), g);
                row.insert(format!("{}.{}", sub.alias, sub.count_label), Value::from(n));
                row
            })
            .collect();
        Ok(Self::hash_join(rows, grouped, &sub.on, &ColumnRef::new(&sub.alias, &sub.group_label)))
    }
}
