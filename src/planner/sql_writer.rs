use std::fmt::Write;

use crate::planner::{CompiledQuery, SortOrder};

/// Renders a [`CompiledQuery`] as PostgreSQL text.
pub struct SqlWriter<'a> {
    query: &'a CompiledQuery,
}

impl<'a> SqlWriter<'a> {
    pub fn new(query: &'a CompiledQuery) -> Self {
        Self { query }
    }

    /// The full statement, optionally restricted to the rows `[start, end)`.
    pub fn statement(&self, window: Option<(u64, u64)>) -> String {
        let q = self.query;
        let mut sql = String::from("SELECT ");

        let columns: Vec<String> = q.projection.iter().map(|p| p.column().to_string()).collect();
        sql.push_str(&columns.join(", "));

        let _ = write!(sql, " FROM {}", q.join_plan.anchor.qualified());
        for step in &q.join_plan.steps {
            let _ = write!(sql, " JOIN {} ON {}", step.table.qualified(), step.on);
        }
        for alias in &q.alias_joins {
            let _ = write!(
                sql,
                " JOIN {} AS {} ON {} = {}.{}",
                alias.table, alias.alias, alias.on, alias.alias, alias.column
            );
        }
        for sub in &q.subqueries {
            let _ = write!(
                sql,
                " JOIN (SELECT {t}.{g} AS {gl}, count({t}.{k}) AS {cl} FROM {s}.{t}",
                t = sub.table,
                g = sub.group_column,
                gl = sub.group_label,
                k = sub.key_column,
                cl = sub.count_label,
                s = sub.schema,
            );
            if let Some(filter) = &sub.filter {
                let _ = write!(sql, " WHERE {filter}");
            }
            let _ = write!(
                sql,
                " GROUP BY {}.{}) AS {} ON {}.{} = {}",
                sub.table, sub.group_column, sub.alias, sub.alias, sub.group_label, sub.on
            );
        }

        if let Some(predicate) = &q.predicate {
            let _ = write!(sql, " WHERE {predicate}");
        }

        if q.is_grouped() {
            let keys: Vec<String> = q.group_by.iter().map(|c| c.to_string()).collect();
            let _ = write!(sql, " GROUP BY {}", keys.join(", "));
        }

        if let Some(order) = &q.order_by {
            let dir = match order.order {
                SortOrder::Asc => "ASC",
                SortOrder::Desc => "DESC",
            };
            let _ = write!(sql, " ORDER BY {} {}", order.column, dir);
        }

        if let Some((start, end)) = window {
            let _ = write!(sql, " LIMIT {} OFFSET {}", end.saturating_sub(start), start);
        }

        sql
    }

    /// `SELECT count(*)` over the statement.
    pub fn count(&self) -> String {
        format!("SELECT count(*) FROM ({}) AS counted", self.statement(None))
    }
}
