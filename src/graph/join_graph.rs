use std::collections::HashMap;

use crate::{catalog::TableInfo, QueryError, QueryResult};

pub type TableId = usize;
pub type EdgeId = usize;

/// A foreign-key relationship between two tables.
///
/// `table.column` references `ref_table.ref_column`. When two tables are linked
/// by several edges (a structure row points at a kinematic and a population
/// template), each edge carries a `variant` label and exactly one of them is
/// `preferred` for automatic joins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinEdge {
    pub id: EdgeId,
    pub table: TableId,
    pub column: String,
    pub ref_table: TableId,
    pub ref_column: String,
    pub variant: Option<String>,
    pub preferred: bool,
}

impl JoinEdge {
    /// The endpoint opposite to `table`, if `table` is an endpoint at all.
    pub fn other(&self, table: TableId) -> Option<TableId> {
        if self.table == table {
            Some(self.ref_table)
        } else if self.ref_table == table {
            Some(self.table)
        } else {
            None
        }
    }
}

/// Static adjacency structure over the dataset's tables.
///
/// Built once with the catalog and shared read-only afterwards; resolving a
/// join never touches store metadata.
#[derive(Debug, Clone, Default)]
pub struct JoinGraph {
    nodes: Vec<TableInfo>,
    index: HashMap<String, TableId>,
    edges: Vec<JoinEdge>,
    adjacency: Vec<Vec<EdgeId>>,
}

impl JoinGraph {
    pub fn new(tables: Vec<TableInfo>) -> Self {
        let mut index = HashMap::new();
        for (id, table) in tables.iter().enumerate() {
            index.insert(table.name.clone(), id);
            index.insert(table.qualified(), id);
        }
        let adjacency = vec![Vec::new(); tables.len()];

        Self { nodes: tables, index, edges: Vec::new(), adjacency }
    }

    pub fn add_edge(&mut self, table: &str, column: &str, ref_table: &str, ref_column: &str) -> QueryResult<EdgeId> {
        self.add_variant_edge(table, column, ref_table, ref_column, None, true)
    }

    pub fn add_variant_edge(
        &mut self,
        table: &str,
        column: &str,
        ref_table: &str,
        ref_column: &str,
        variant: Option<&str>,
        preferred: bool,
    ) -> QueryResult<EdgeId> {
        let from = self.require(table)?;
        let to = self.require(ref_table)?;
        let id = self.edges.len();

        self.edges.push(JoinEdge {
            id,
            table: from,
            column: column.to_string(),
            ref_table: to,
            ref_column: ref_column.to_string(),
            variant: variant.map(str::to_string),
            preferred,
        });
        self.adjacency[from].push(id);
        if from != to {
            self.adjacency[to].push(id);
        }

        Ok(id)
    }

    /// Look up a table by bare or schema-qualified name.
    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.index.get(name).copied()
    }

    pub fn table(&self, id: TableId) -> &TableInfo {
        &self.nodes[id]
    }

    pub fn tables(&self) -> &[TableInfo] {
        &self.nodes
    }

    pub fn edge(&self, id: EdgeId) -> &JoinEdge {
        &self.edges[id]
    }

    /// Neighbouring tables of `table` with the edge reaching each of them.
    /// Parallel edges collapse to the preferred one.
    pub fn neighbors(&self, table: TableId) -> Vec<(EdgeId, TableId)> {
        let mut out: Vec<(EdgeId, TableId)> = Vec::new();
        for edge_id in &self.adjacency[table] {
            let edge = &self.edges[*edge_id];
            let Some(other) = edge.other(table) else { continue };
            match out.iter_mut().find(|(_, t)| *t == other) {
                Some(slot) => {
                    if edge.preferred && !self.edges[slot.0].preferred {
                        slot.0 = *edge_id;
                    }
                }
                None => out.push((*edge_id, other)),
            }
        }
        out
    }

    /// The edge used to join `a` and `b`, preferring the flagged variant.
    pub fn edge_between(&self, a: TableId, b: TableId) -> Option<&JoinEdge> {
        self.neighbors(a)
            .into_iter()
            .find(|(_, other)| *other == b)
            .map(|(edge_id, _)| &self.edges[edge_id])
    }

    fn require(&self, name: &str) -> QueryResult<TableId> {
        self.table_id(name)
            .ok_or_else(|| QueryError::usage(format!("join graph has no table '{name}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> JoinGraph {
        let mut g = JoinGraph::new(vec![
            TableInfo::new("dap", "structure"),
            TableInfo::new("dap", "template"),
            TableInfo::new("dap", "bintype"),
        ]);
        g.add_edge("structure", "bintype_pk", "bintype", "pk").unwrap();
        g.add_variant_edge("structure", "template_pop_pk", "template", "pk", Some("template_pop"), false).unwrap();
        g.add_variant_edge("structure", "template_kin_pk", "template", "pk", Some("template_kin"), true).unwrap();
        g
    }

    #[test]
    fn lookup_by_bare_and_qualified_name() {
        let g = graph();
        assert_eq!(g.table_id("template"), g.table_id("dap.template"));
        assert!(g.table_id("cube").is_none());
    }

    #[test]
    fn parallel_edges_collapse_to_preferred_variant() {
        let g = graph();
        let structure = g.table_id("structure").unwrap();
        let template = g.table_id("template").unwrap();

        assert_eq!(g.neighbors(structure).len(), 2);
        let edge = g.edge_between(template, structure).unwrap();
        assert_eq!(edge.variant.as_deref(), Some("template_kin"));
        assert_eq!(edge.column, "template_kin_pk");
    }

    #[test]
    fn unknown_table_in_edge_is_rejected() {
        let mut g = graph();
        assert!(g.add_edge("structure", "x", "nowhere", "pk").is_err());
    }
}
