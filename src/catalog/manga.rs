use once_cell::sync::Lazy;

use crate::{
    catalog::{AggregateSource, ParamType, ParameterCatalog, Pipeline, ReturnType, TableInfo, VersionBinding},
    QueryResult,
};

pub const DATA_SCHEMA: &str = "mangadatadb";
pub const SAMPLE_SCHEMA: &str = "mangasampledb";
pub const DAP_SCHEMA: &str = "mangadapdb";

/// Process-wide catalog of the survey dataset.
pub static MANGA_CATALOG: Lazy<ParameterCatalog> =
    Lazy::new(|| ParameterCatalog::manga().expect("built-in catalog is consistent"));

impl ParameterCatalog {
    /// The survey dataset: reduced cubes, the NSA sample catalog and the
    /// derived-analysis products.
    pub fn manga() -> QueryResult<Self> {
        use ParamType::*;

        ParameterCatalog::builder("cube")
            // tables
            .table(TableInfo::new(DATA_SCHEMA, "cube"))
            .table(TableInfo::new(DATA_SCHEMA, "ifudesign"))
            .table(TableInfo::new(SAMPLE_SCHEMA, "manga_target"))
            .table(TableInfo::new(SAMPLE_SCHEMA, "manga_target_to_nsa"))
            .table(TableInfo::new(SAMPLE_SCHEMA, "nsa"))
            .table(TableInfo::new(DAP_SCHEMA, "file"))
            .table(TableInfo::new(DAP_SCHEMA, "structure"))
            .table(TableInfo::new(DAP_SCHEMA, "bintype"))
            .table(TableInfo::new(DAP_SCHEMA, "template"))
            .table(TableInfo::new(DAP_SCHEMA, "spaxelprop").per_element())
            .table(TableInfo::new(DAP_SCHEMA, "modelspaxel").per_element())
            .table(TableInfo::new(DAP_SCHEMA, "dapall").aggregate())
            // cube
            .param("cube", "mangaid", String, "MaNGA ID", true)
            .param("cube", "plateifu", String, "plate-IFU", true)
            .requires("cube.plateifu", "ifudesign")
            .param("cube", "plate", Int, "plate", true)
            .param("cube", "ra", Float, "RA", true)
            .param("cube", "dec", Float, "Dec", true)
            .param("ifudesign", "name", String, "IFU design", true)
            .param("ifudesign", "nfiber", Int, "fibers", false)
            // sample
            .param("nsa", "z", Float, "redshift", true)
            .param("nsa", "elpetro_mass", Float, "stellar mass", true)
            .param("nsa", "sersic_n", Float, "Sersic index", true)
            .param("nsa", "iauname", String, "IAU name", false)
            // analysis
            .param("file", "filename", String, "file name", false)
            .param("bintype", "name", String, "bin type", true)
            .param("template", "name", String, "template", true)
            .param("spaxelprop", "x", Int, "spaxel x", true)
            .param("spaxelprop", "y", Int, "spaxel y", true)
            .param("spaxelprop", "binid", Int, "bin id", false)
            .param("spaxelprop", "emline_gflux_ha_6564", Float, "H-alpha flux", true)
            .param("spaxelprop", "stellar_vel", Float, "stellar velocity", true)
            .param("modelspaxel", "binned_flux", Float, "binned flux", false)
            .param("dapall", "ha_gflux_1re", Float, "H-alpha flux within 1 Re", true)
            .param("dapall", "stellar_sigma_1re", Float, "stellar dispersion within 1 Re", true)
            // shortcuts
            .shortcut("mangaid", "cube.mangaid")
            .shortcut("plateifu", "cube.plateifu")
            .shortcut("ra", "cube.ra")
            .shortcut("dec", "cube.dec")
            .shortcut("redshift", "nsa.z")
            .shortcut("nsa.redshift", "nsa.z")
            .shortcut("nsa.mass", "nsa.elpetro_mass")
            .shortcut("haflux", "spaxelprop.emline_gflux_ha_6564")
            .shortcut("bintype", "bintype.name")
            .shortcut("template", "template.name")
            // relationships
            .edge("cube", "ifudesign_pk", "ifudesign", "pk")
            .edge("cube", "manga_target_pk", "manga_target", "pk")
            .edge("manga_target_to_nsa", "manga_target_pk", "manga_target", "pk")
            .edge("manga_target_to_nsa", "nsa_pk", "nsa", "pk")
            .edge("file", "cube_pk", "cube", "pk")
            .edge("file", "structure_pk", "structure", "pk")
            .edge("structure", "bintype_pk", "bintype", "pk")
            .variant_edge("structure", "template_kin_pk", "template", "pk", "template_kin", true)
            .variant_edge("structure", "template_pop_pk", "template", "pk", "template_pop", false)
            .edge("spaxelprop", "file_pk", "file", "pk")
            .edge("modelspaxel", "file_pk", "file", "pk")
            .edge("dapall", "file_pk", "file", "pk")
            // defaults
            .base_defaults(&["cube.mangaid", "cube.plateifu"])
            .return_defaults(ReturnType::Maps, &["bintype.name", "template.name"])
            .return_defaults(ReturnType::ModelCube, &["bintype.name", "template.name"])
            .return_defaults(ReturnType::Spaxel, &["spaxelprop.x", "spaxelprop.y", "bintype.name", "template.name"])
            .per_element_defaults(&["spaxelprop.x", "spaxelprop.y", "bintype.name", "template.name"])
            // analysis rewrites
            .aggregate_source(AggregateSource {
                table: "spaxelprop".to_string(),
                group_key: "file_pk".to_string(),
                key: "pk".to_string(),
                invalid: Some(("binid".to_string(), -1)),
            })
            .version_binding(VersionBinding {
                pipeline: Pipeline::Drp,
                table: "cube".to_string(),
                column: "pipeline_info_pk".to_string(),
                alias: "drpalias".to_string(),
                info_table: format!("{DATA_SCHEMA}.pipeline_info"),
                info_column: "pk".to_string(),
            })
            .version_binding(VersionBinding {
                pipeline: Pipeline::Dap,
                table: "file".to_string(),
                column: "pipeline_info_pk".to_string(),
                alias: "dapalias".to_string(),
                info_table: format!("{DATA_SCHEMA}.pipeline_info"),
                info_column: "pk".to_string(),
            })
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ParamDisplay;

    fn names(fields: Vec<crate::catalog::FieldReference>) -> Vec<String> {
        fields.into_iter().map(|f| f.name).collect()
    }

    #[test]
    fn builtin_catalog_builds() {
        let catalog = &*MANGA_CATALOG;
        assert_eq!(catalog.primary_table(), "cube");
        assert_eq!(catalog.version_bindings().len(), 2);
        assert!(catalog.table("spaxelprop").unwrap().per_element);
        assert!(catalog.table("dapall").unwrap().aggregate);
        assert!(catalog.list_params(ParamDisplay::Best).len() < catalog.list_params(ParamDisplay::All).len());
    }

    #[test]
    fn every_return_type_includes_object_identifiers() {
        for rt in ReturnType::ALL {
            let defaults = names(MANGA_CATALOG.default_fields(Some(rt)));
            assert!(defaults.contains(&"cube.mangaid".to_string()), "{rt}");
            assert!(defaults.contains(&"cube.plateifu".to_string()), "{rt}");
        }
    }

    #[test]
    fn map_like_return_types_add_binning_and_template() {
        for rt in [ReturnType::Maps, ReturnType::ModelCube, ReturnType::Spaxel] {
            let defaults = names(MANGA_CATALOG.default_fields(Some(rt)));
            assert!(defaults.contains(&"bintype.name".to_string()));
            assert!(defaults.contains(&"template.name".to_string()));
        }
        let cube = names(MANGA_CATALOG.default_fields(Some(ReturnType::Cube)));
        assert_eq!(cube, vec!["cube.mangaid", "cube.plateifu"]);
    }

    #[test]
    fn spaxel_adds_coordinates() {
        let defaults = names(MANGA_CATALOG.default_fields(Some(ReturnType::Spaxel)));
        assert_eq!(
            defaults,
            vec!["cube.mangaid", "cube.plateifu", "spaxelprop.x", "spaxelprop.y", "bintype.name", "template.name"]
        );
        let rss = names(MANGA_CATALOG.default_fields(Some(ReturnType::Rss)));
        assert!(!rss.contains(&"spaxelprop.x".to_string()));
    }

    #[test]
    fn plateifu_implies_ifudesign() {
        let field = MANGA_CATALOG.resolve("plateifu").unwrap();
        assert_eq!(field.requires.as_deref(), Some("ifudesign"));
        assert_eq!(field.schema, DATA_SCHEMA);
    }
}
