use tracing::debug;

use crate::{
    catalog::{ParameterCatalog, Pipeline},
    config::ReleaseVersions,
    graph::JoinPlan,
    parser::ast::{ComparatorOp, Literal},
    planner::{AliasJoin, ColumnRef, Predicate},
    QueryError, QueryResult,
};

/// Finds the pipeline-info row of a software version.
pub trait PipelineLookup {
    /// Primary key of the row for `pipeline` at `version`, `None` if there is none.
    fn pipeline_info_pk(&self, pipeline: Pipeline, version: &str) -> QueryResult<Option<i64>>;
}

/// Aliased joins and equality filters pinning each joined pipeline table to
/// the active release. A pipeline whose table is not joined is skipped.
pub fn bind_versions(
    catalog: &ParameterCatalog,
    plan: &JoinPlan,
    versions: &ReleaseVersions,
    lookup: &dyn PipelineLookup,
) -> QueryResult<(Vec<AliasJoin>, Vec<Predicate>)> {
    let mut joins = Vec::new();
    let mut filters = Vec::new();

    for binding in catalog.version_bindings() {
        if !plan.contains(&binding.table) {
            debug!(pipeline = %binding.pipeline, table = %binding.table, "table not joined, skipping version binding");
            continue;
        }

        let version = match binding.pipeline {
            Pipeline::Drp => &versions.drpver,
            Pipeline::Dap => &versions.dapver,
        };
        let pk = lookup.pipeline_info_pk(binding.pipeline, version)?.ok_or_else(|| {
            QueryError::Validation(vec![format!("no {} pipeline info for version {version}", binding.pipeline)])
        })?;

        joins.push(AliasJoin {
            alias: binding.alias.clone(),
            table: binding.info_table.clone(),
            column: binding.info_column.clone(),
            on: ColumnRef::new(&binding.table, &binding.column),
        });
        filters.push(Predicate::compare(
            ColumnRef::new(&binding.alias, &binding.info_column),
            ComparatorOp::Eq,
            Literal::Int(pk),
        ));
    }

    Ok((joins, filters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog::MANGA_CATALOG, graph::JoinResolver};

    struct Fixed;

    impl PipelineLookup for Fixed {
        fn pipeline_info_pk(&self, pipeline: Pipeline, version: &str) -> QueryResult<Option<i64>> {
            Ok(match (pipeline, version) {
                (Pipeline::Drp, "v2_4_3") => Some(25),
                (Pipeline::Dap, "2.2.1") => Some(26),
                _ => None,
            })
        }
    }

    fn plan(tables: &[&str]) -> JoinPlan {
        let tables: Vec<String> = tables.iter().map(|t| t.to_string()).collect();
        JoinResolver::new(MANGA_CATALOG.join_graph()).resolve(&tables, "cube").unwrap()
    }

    #[test]
    fn only_joined_pipelines_are_bound() {
        let versions = ReleaseVersions::new("v2_4_3", "2.2.1");
        let (joins, filters) = bind_versions(&MANGA_CATALOG, &plan(&["cube", "nsa"]), &versions, &Fixed).unwrap();
        assert_eq!(joins.len(), 1);
        assert_eq!(joins[0].alias, "drpalias");
        assert_eq!(filters[0].to_string(), "drpalias.pk = 25");

        let (joins, filters) = bind_versions(&MANGA_CATALOG, &plan(&["cube", "file"]), &versions, &Fixed).unwrap();
        assert_eq!(joins.len(), 2);
        assert_eq!(filters[1].to_string(), "dapalias.pk = 26");
    }

    #[test]
    fn missing_version_row_fails_validation() {
        let versions = ReleaseVersions::new("v9_9_9", "2.2.1");
        let err = bind_versions(&MANGA_CATALOG, &plan(&["cube"]), &versions, &Fixed).unwrap_err();
        assert!(matches!(err, QueryError::Validation(_)));
    }
}
