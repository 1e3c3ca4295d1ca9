use std::{collections::HashMap, fmt};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    catalog::{FieldReference, ParamType, ReturnType, TableInfo},
    graph::JoinGraph,
    QueryError, QueryResult,
};

/// Which parameter names `list_params` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDisplay {
    All,
    /// Only the vetted parameters.
    Best,
}

/// The two processing pipelines whose version is pinned on every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pipeline {
    /// primary reduction
    Drp,
    /// derived analysis
    Dap,
}

impl Pipeline {
    pub fn label(&self) -> &'static str {
        match self {
            Pipeline::Drp => "DRP",
            Pipeline::Dap => "DAP",
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a pipeline-version row is joined into a compiled query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionBinding {
    pub pipeline: Pipeline,
    /// table holding the foreign key, only bound when present in the join
    pub table: String,
    pub column: String,
    /// alias given to the joined pipeline-info table
    pub alias: String,
    /// qualified pipeline-info table
    pub info_table: String,
    pub info_column: String,
}

/// The per-element table counted by aggregate ("percent of good") filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSource {
    pub table: String,
    pub group_key: String,
    pub key: String,
    /// rows where `column == value` are invalid elements
    pub invalid: Option<(String, i64)>,
}

/// Read-only map from parameter names to fully qualified columns.
///
/// Built once and shared by reference between requests.
#[derive(Debug, Clone)]
pub struct ParameterCatalog {
    params: IndexMap<String, FieldReference>,
    shortcuts: IndexMap<String, String>,
    graph: JoinGraph,
    primary_table: String,
    base_defaults: Vec<FieldReference>,
    return_defaults: HashMap<ReturnType, Vec<FieldReference>>,
    per_element_defaults: Vec<FieldReference>,
    aggregate_source: Option<AggregateSource>,
    version_bindings: Vec<VersionBinding>,
}

impl ParameterCatalog {
    pub fn builder(primary_table: &str) -> CatalogBuilder {
        CatalogBuilder::new(primary_table)
    }

    /// Canonical name for a shortcut, or the input unchanged.
    pub fn expand_shortcut(&self, name: &str) -> String {
        self.shortcuts
            .get(&name.trim().to_ascii_lowercase())
            .cloned()
            .unwrap_or_else(|| name.trim().to_string())
    }

    pub fn shortcuts(&self) -> impl Iterator<Item = (&String, &String)> {
        self.shortcuts.iter()
    }

    /// Resolve a parameter name, shortcut, bare column or schema-qualified
    /// column to exactly one field.
    pub fn resolve(&self, name: &str) -> QueryResult<FieldReference> {
        let canonical = self.expand_shortcut(name).to_ascii_lowercase();

        if let Some(field) = self.params.get(&canonical) {
            return Ok(field.clone());
        }

        let parts: Vec<&str> = canonical.split('.').collect();
        match parts.as_slice() {
            [column] => {
                let matches: Vec<&FieldReference> = self.params.values().filter(|f| f.column == *column).collect();
                match matches.len() {
                    1 => Ok(matches[0].clone()),
                    0 => Err(QueryError::UnknownParameter(name.to_string())),
                    _ => Err(QueryError::UnknownParameter(format!(
                        "{} is ambiguous between {}",
                        name,
                        matches.iter().map(|f| f.name.as_str()).collect::<Vec<_>>().join(", ")
                    ))),
                }
            }
            [schema, table, column] => self
                .params
                .get(&format!("{table}.{column}"))
                .filter(|f| f.schema == *schema)
                .cloned()
                .ok_or_else(|| QueryError::UnknownParameter(name.to_string())),
            _ => Err(QueryError::UnknownParameter(name.to_string())),
        }
    }

    /// Default fields for a return type, base identifiers first.
    pub fn default_fields(&self, return_type: Option<ReturnType>) -> Vec<FieldReference> {
        let mut out = self.base_defaults.clone();
        if let Some(extra) = return_type.and_then(|rt| self.return_defaults.get(&rt)) {
            for field in extra {
                if !out.contains(field) {
                    out.push(field.clone());
                }
            }
        }
        out
    }

    /// Fields added whenever any field touches a per-element table.
    pub fn per_element_defaults(&self) -> &[FieldReference] {
        &self.per_element_defaults
    }

    pub fn list_params(&self, display: ParamDisplay) -> Vec<String> {
        self.params
            .values()
            .filter(|f| display == ParamDisplay::All || f.best)
            .map(|f| f.name.clone())
            .collect()
    }

    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.graph.table_id(name).map(|id| self.graph.table(id))
    }

    pub fn tables(&self) -> &[TableInfo] {
        self.graph.tables()
    }

    pub fn is_per_element(&self, field: &FieldReference) -> bool {
        self.table(&field.table).is_some_and(|t| t.per_element)
    }

    pub fn join_graph(&self) -> &JoinGraph {
        &self.graph
    }

    pub fn primary_table(&self) -> &str {
        &self.primary_table
    }

    pub fn aggregate_source(&self) -> Option<&AggregateSource> {
        self.aggregate_source.as_ref()
    }

    pub fn version_bindings(&self) -> &[VersionBinding] {
        &self.version_bindings
    }
}

/// Incremental construction of a [`ParameterCatalog`]; every name is checked
/// in [`CatalogBuilder::build`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    primary_table: String,
    tables: Vec<TableInfo>,
    params: Vec<FieldReference>,
    shortcuts: Vec<(String, String)>,
    edges: Vec<(String, String, String, String, Option<String>, bool)>,
    base_defaults: Vec<String>,
    return_defaults: Vec<(ReturnType, Vec<String>)>,
    per_element_defaults: Vec<String>,
    aggregate_source: Option<AggregateSource>,
    version_bindings: Vec<VersionBinding>,
}

impl CatalogBuilder {
    pub fn new(primary_table: &str) -> Self {
        Self { primary_table: primary_table.to_string(), ..Default::default() }
    }

    pub fn table(mut self, table: TableInfo) -> Self {
        self.tables.push(table);
        self
    }

    pub fn param(mut self, table: &str, column: &str, ty: ParamType, display: &str, best: bool) -> Self {
        let mut field = FieldReference::new("", table, column, ty).with_display(display);
        if best {
            field = field.with_best();
        }
        self.params.push(field);
        self
    }

    /// Mark an already declared parameter as implying a join to `table`.
    pub fn requires(mut self, param: &str, table: &str) -> Self {
        if let Some(field) = self.params.iter_mut().find(|f| f.name == param) {
            field.requires = Some(table.to_string());
        }
        self
    }

    pub fn shortcut(mut self, short: &str, canonical: &str) -> Self {
        self.shortcuts.push((short.to_ascii_lowercase(), canonical.to_string()));
        self
    }

    pub fn edge(mut self, table: &str, column: &str, ref_table: &str, ref_column: &str) -> Self {
        self.edges.push((table.into(), column.into(), ref_table.into(), ref_column.into(), None, true));
        self
    }

    pub fn variant_edge(
        mut self,
        table: &str,
        column: &str,
        ref_table: &str,
        ref_column: &str,
        variant: &str,
        preferred: bool,
    ) -> Self {
        self.edges.push((table.into(), column.into(), ref_table.into(), ref_column.into(), Some(variant.into()), preferred));
        self
    }

    pub fn base_defaults(mut self, names: &[&str]) -> Self {
        self.base_defaults = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn return_defaults(mut self, return_type: ReturnType, names: &[&str]) -> Self {
        self.return_defaults.push((return_type, names.iter().map(|n| n.to_string()).collect()));
        self
    }

    pub fn per_element_defaults(mut self, names: &[&str]) -> Self {
        self.per_element_defaults = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn aggregate_source(mut self, source: AggregateSource) -> Self {
        self.aggregate_source = Some(source);
        self
    }

    pub fn version_binding(mut self, binding: VersionBinding) -> Self {
        self.version_bindings.push(binding);
        self
    }

    pub fn build(self) -> QueryResult<ParameterCatalog> {
        let mut graph = JoinGraph::new(self.tables);
        for (table, column, ref_table, ref_column, variant, preferred) in &self.edges {
            graph.add_variant_edge(table, column, ref_table, ref_column, variant.as_deref(), *preferred)?;
        }
        if graph.table_id(&self.primary_table).is_none() {
            return Err(QueryError::usage(format!("primary table '{}' is not declared", self.primary_table)));
        }

        let mut params = IndexMap::new();
        for mut field in self.params {
            let table = graph
                .table_id(&field.table)
                .map(|id| graph.table(id))
                .ok_or_else(|| QueryError::usage(format!("parameter '{}' names an undeclared table", field.name)))?;
            field.schema = table.schema.clone();
            if let Some(required) = &field.requires {
                if graph.table_id(required).is_none() {
                    return Err(QueryError::usage(format!("parameter '{}' requires undeclared table '{required}'", field.name)));
                }
            }
            params.insert(field.name.to_ascii_lowercase(), field);
        }

        let mut shortcuts = IndexMap::new();
        for (short, canonical) in self.shortcuts {
            if !params.contains_key(&canonical.to_ascii_lowercase()) {
                return Err(QueryError::usage(format!("shortcut '{short}' targets unknown parameter '{canonical}'")));
            }
            shortcuts.insert(short, canonical);
        }

        let lookup = |names: &[String]| -> QueryResult<Vec<FieldReference>> {
            names
                .iter()
                .map(|n| params.get(&n.to_ascii_lowercase()).cloned().ok_or_else(|| QueryError::UnknownParameter(n.clone())))
                .collect()
        };

        let base_defaults = lookup(&self.base_defaults)?;
        let per_element_defaults = lookup(&self.per_element_defaults)?;
        let mut return_defaults = HashMap::new();
        for (return_type, names) in &self.return_defaults {
            return_defaults.insert(*return_type, lookup(names)?);
        }

        if let Some(source) = &self.aggregate_source {
            if graph.table_id(&source.table).is_none() {
                return Err(QueryError::usage(format!("aggregate source '{}' is not declared", source.table)));
            }
        }
        for binding in &self.version_bindings {
            if graph.table_id(&binding.table).is_none() {
                return Err(QueryError::usage(format!("version binding table '{}' is not declared", binding.table)));
            }
        }

        Ok(ParameterCatalog {
            params,
            shortcuts,
            graph,
            primary_table: self.primary_table,
            base_defaults,
            return_defaults,
            per_element_defaults,
            aggregate_source: self.aggregate_source,
            version_bindings: self.version_bindings,
        })
    }
}
