use tracing::debug;

use crate::{
    catalog::{FieldReference, ParameterCatalog},
    config::ReleaseVersions,
    graph::JoinResolver,
    parser::FilterParser,
    planner::{bind_versions, AggregateRewrite, CompiledQuery, FilterBinder, PipelineLookup, Predicate, ProjectedField, QueryRequest},
    QueryResult,
};

pub const DEFAULT_SORT: &str = "cube.mangaid";

/// Compiles a [`QueryRequest`] against a catalog and the versions of one release.
pub struct QueryCompiler<'a> {
    catalog: &'a ParameterCatalog,
    versions: &'a ReleaseVersions,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(catalog: &'a ParameterCatalog, versions: &'a ReleaseVersions) -> Self {
        Self { catalog, versions }
    }

    pub fn compile(&self, request: &QueryRequest, lookup: &dyn PipelineLookup) -> QueryResult<CompiledQuery> {
        let catalog = self.catalog;

        // defaults
        let mut fields = catalog.default_fields(request.return_type);
        for name in &request.default_params {
            push_unique(&mut fields, catalog.resolve(name)?);
        }
        let mut defaults = fields.clone();
        debug!(defaults = ?names(&defaults), "default fields");

        // requested fields
        for name in &request.return_params {
            push_unique(&mut fields, catalog.resolve(name)?);
        }

        // filter
        let filter = request.filter_text().map(|text| FilterParser::parse(text, catalog)).transpose()?;
        let mut filter_fields = Vec::new();
        if let Some(filter) = &filter {
            for name in filter.fields() {
                push_unique(&mut filter_fields, catalog.resolve(&name)?);
            }
            for field in &filter_fields {
                push_unique(&mut fields, field.clone());
            }
        }

        // per-element defaults
        if fields.iter().any(|f| catalog.is_per_element(f)) {
            for field in catalog.per_element_defaults() {
                push_unique(&mut fields, field.clone());
                push_unique(&mut defaults, field.clone());
            }
        }
        let projection: Vec<ProjectedField> = fields
            .iter()
            .map(|f| ProjectedField { label: f.name.clone(), field: f.clone() })
            .collect();
        debug!(fields = ?names(&fields), "projection");

        // joins
        let sort_field = catalog.resolve(request.sort.as_deref().unwrap_or(DEFAULT_SORT))?;
        let mut referenced: Vec<&str> = Vec::new();
        for field in &fields {
            referenced.push(&field.table);
            if let Some(required) = &field.requires {
                referenced.push(required);
            }
        }
        let mut tables: Vec<String> = Vec::new();
        for table in referenced.iter().copied().chain([sort_field.table.as_str()]) {
            if !tables.iter().any(|t| t == table) {
                tables.push(table.to_string());
            }
        }
        let anchor = match &request.anchor {
            Some(pinned) => pinned.clone(),
            None => JoinResolver::choose_anchor(referenced, catalog.primary_table()),
        };
        let join_plan = JoinResolver::new(catalog.join_graph()).resolve(&tables, &anchor)?;

        let mut query = CompiledQuery::new(projection, join_plan);
        query.return_type = request.return_type;

        // filter validation and binding
        let binder = FilterBinder::new(catalog);
        if let Some(filter) = &filter {
            binder.validate(filter)?;
            query.predicate = binder.bind(filter)?;
        }

        // release versions
        let (alias_joins, version_filters) = bind_versions(catalog, &query.join_plan, self.versions, lookup)?;
        query.alias_joins = alias_joins;
        query.predicate = Predicate::all(query.predicate.take().into_iter().chain(version_filters).collect());

        // aggregate rewrite
        let rewrite = AggregateRewrite::new(catalog);
        if rewrite.applies_to(&filter_fields) {
            let functions = filter.as_ref().map(|f| f.functions.as_slice()).unwrap_or_default();
            rewrite.apply(&mut query, functions, &defaults)?;
            let aggregate_joined = query.join_plan.tables().any(|t| t.aggregate);
            if aggregate_joined && !query.is_grouped() {
                rewrite.group_by_objects(&mut query, &defaults);
            }
        }

        query.filter = filter;
        query.sort_by(catalog, &sort_field.name, request.order)?;

        debug!(sql = %query.to_sql(), "compiled query");
        Ok(query)
    }
}

fn push_unique(fields: &mut Vec<FieldReference>, field: FieldReference) {
    if !fields.contains(&field) {
        fields.push(field);
    }
}

fn names(fields: &[FieldReference]) -> Vec<&str> {
    fields.iter().map(|f| f.name.as_str()).collect()
}
