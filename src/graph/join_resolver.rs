use std::collections::VecDeque;

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    graph::{EdgeId, JoinGraph, JoinOn, JoinPlan, JoinStep, TableId},
    QueryError, QueryResult,
};

/// Connects a set of tables over the static join graph.
pub struct JoinResolver<'a> {
    graph: &'a JoinGraph,
}

impl<'a> JoinResolver<'a> {
    pub fn new(graph: &'a JoinGraph) -> Self {
        Self { graph }
    }

    /// The most frequently referenced table, first occurrence winning ties;
    /// `fallback` when nothing is referenced.
    pub fn choose_anchor<'t>(referenced: impl IntoIterator<Item = &'t str>, fallback: &str) -> String {
        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for table in referenced {
            *counts.entry(table).or_default() += 1;
        }

        let mut best: Option<(&str, usize)> = None;
        for (table, count) in counts {
            if best.is_none_or(|(_, c)| count > c) {
                best = Some((table, count));
            }
        }

        best.map(|(t, _)| t.to_string()).unwrap_or_else(|| fallback.to_string())
    }

    /// Join every table of `tables` to `anchor`.
    ///
    /// Each table not yet placed is reached by a breadth-first walk to the
    /// nearest placed table; the intermediate tables of that walk are placed
    /// first, in path order.
    pub fn resolve(&self, tables: &[String], anchor: &str) -> QueryResult<JoinPlan> {
        let anchor_id = self
            .graph
            .table_id(anchor)
            .ok_or_else(|| QueryError::usage(format!("unknown anchor table '{anchor}'")))?;

        let mut placed = vec![false; self.graph.tables().len()];
        placed[anchor_id] = true;
        let mut plan = JoinPlan::new(self.graph.table(anchor_id).clone());

        for name in tables {
            let target = self
                .graph
                .table_id(name)
                .ok_or_else(|| QueryError::UnknownParameter(format!("table {name}")))?;
            if placed[target] {
                continue;
            }

            let path = self.path_to_placed(target, &placed).ok_or_else(|| QueryError::NoPath {
                from: plan.anchor.name.clone(),
                to: self.graph.table(target).name.clone(),
            })?;

            for (edge_id, table) in path {
                placed[table] = true;
                plan.steps.push(self.step(edge_id, table));
            }
        }

        debug!(anchor = %plan.anchor.name, joins = ?plan.table_names(), "resolved join plan");
        Ok(plan)
    }

    /// Steps from the placed side outward to `target`, each with the edge
    /// linking it to the previous table.
    fn path_to_placed(&self, target: TableId, placed: &[bool]) -> Option<Vec<(EdgeId, TableId)>> {
        let mut previous: Vec<Option<(EdgeId, TableId)>> = vec![None; placed.len()];
        let mut seen = vec![false; placed.len()];
        let mut queue = VecDeque::from([target]);
        seen[target] = true;

        while let Some(current) = queue.pop_front() {
            if placed[current] {
                let mut path = Vec::new();
                let mut node = current;
                while node != target {
                    let (edge, toward_target) = previous[node]?;
                    path.push((edge, toward_target));
                    node = toward_target;
                }
                return Some(path);
            }

            for (edge, next) in self.graph.neighbors(current) {
                if !seen[next] {
                    seen[next] = true;
                    previous[next] = Some((edge, current));
                    queue.push_back(next);
                }
            }
        }

        None
    }

    fn step(&self, edge_id: EdgeId, table: TableId) -> JoinStep {
        let edge = self.graph.edge(edge_id);
        JoinStep {
            table: self.graph.table(table).clone(),
            on: JoinOn {
                table: self.graph.table(edge.table).name.clone(),
                column: edge.column.clone(),
                ref_table: self.graph.table(edge.ref_table).name.clone(),
                ref_column: edge.ref_column.clone(),
            },
            variant: edge.variant.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{TableInfo, MANGA_CATALOG};

    fn tables(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn single_table_has_no_joins() {
        let resolver = JoinResolver::new(MANGA_CATALOG.join_graph());
        let plan = resolver.resolve(&tables(&["cube"]), "cube").unwrap();
        assert!(!plan.has_joins());
        assert_eq!(plan.table_names(), vec!["cube"]);
    }

    #[test]
    fn cube_to_nsa_goes_through_target_tables() {
        let resolver = JoinResolver::new(MANGA_CATALOG.join_graph());
        let plan = resolver.resolve(&tables(&["cube", "nsa"]), "cube").unwrap();
        assert_eq!(plan.table_names(), vec!["cube", "manga_target", "manga_target_to_nsa", "nsa"]);

        let on: Vec<String> = plan.steps.iter().map(|s| s.on.to_string()).collect();
        assert_eq!(
            on,
            vec![
                "cube.manga_target_pk = manga_target.pk",
                "manga_target_to_nsa.manga_target_pk = manga_target.pk",
                "manga_target_to_nsa.nsa_pk = nsa.pk",
            ]
        );
    }

    #[test]
    fn every_step_touches_a_placed_table() {
        let resolver = JoinResolver::new(MANGA_CATALOG.join_graph());
        let plan = resolver
            .resolve(&tables(&["spaxelprop", "nsa", "template", "bintype", "ifudesign"]), "spaxelprop")
            .unwrap();

        let mut placed = vec![plan.anchor.name.clone()];
        for step in &plan.steps {
            let other = if step.on.table == step.table.name { &step.on.ref_table } else { &step.on.table };
            assert!(placed.contains(other), "{} joined before {}", step.table.name, other);
            placed.push(step.table.name.clone());
        }
        assert_eq!(placed.len(), plan.table_names().len());
    }

    #[test]
    fn template_uses_kinematic_edge() {
        let resolver = JoinResolver::new(MANGA_CATALOG.join_graph());
        let plan = resolver.resolve(&tables(&["cube", "template"]), "cube").unwrap();
        let step = plan.steps.iter().find(|s| s.table.name == "template").unwrap();
        assert_eq!(step.on.column, "template_kin_pk");
        assert_eq!(step.variant.as_deref(), Some("template_kin"));
    }

    #[test]
    fn tables_are_never_joined_twice() {
        let resolver = JoinResolver::new(MANGA_CATALOG.join_graph());
        let plan = resolver
            .resolve(&tables(&["cube", "bintype", "template", "mangadapdb.file", "file"]), "cube")
            .unwrap();
        let names = plan.table_names();
        let mut unique = names.clone();
        unique.dedup();
        assert_eq!(names.iter().filter(|n| *n == "file").count(), 1);
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn disconnected_tables_fail() {
        let mut graph = JoinGraph::new(vec![TableInfo::new("a", "left"), TableInfo::new("a", "right")]);
        graph.add_edge("left", "id", "left", "parent_id").unwrap();
        let err = JoinResolver::new(&graph).resolve(&tables(&["left", "right"]), "left").unwrap_err();
        assert_eq!(err, QueryError::NoPath { from: "left".into(), to: "right".into() });
    }

    #[test]
    fn anchor_is_most_referenced_table() {
        let anchor = JoinResolver::choose_anchor(["cube", "nsa", "nsa", "cube", "nsa"], "cube");
        assert_eq!(anchor, "nsa");
        assert_eq!(JoinResolver::choose_anchor(["file", "nsa"], "cube"), "file");
        assert_eq!(JoinResolver::choose_anchor(Vec::<&str>::new(), "cube"), "cube");
    }
}
