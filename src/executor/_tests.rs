pub mod fixtures {
    use serde_json::{json, Value};

    use crate::{
        catalog::{Pipeline, MANGA_CATALOG},
        config::QueryConfig,
        database::MemoryStore,
        planner::{CompiledQuery, QueryCompiler, QueryRequest},
    };

    pub fn create_pipeline_info(store: &MemoryStore) {
        store.add_pipeline_version(25, Pipeline::Drp, "v2_4_3").unwrap();
        store.add_pipeline_version(26, Pipeline::Dap, "2.2.1").unwrap();
        store.add_pipeline_version(11, Pipeline::Drp, "v2_0_1").unwrap();
    }

    /// Four cubes; only the first is nearby and massive under DR15.
    pub fn create_cubes(store: &MemoryStore) {
        store.load_from_json("mangadatadb.cube", json!([
            { "pk": 1, "mangaid": "1-209232", "plateifu": "8485-1901",  "plate": 8485, "ra": 232.54, "dec": 48.69, "ifudesign_pk": 10, "manga_target_pk": 100, "pipeline_info_pk": 25 },
            { "pk": 2, "mangaid": "1-113520", "plateifu": "7443-12701", "plate": 7443, "ra": 229.52, "dec": 42.74, "ifudesign_pk": 11, "manga_target_pk": 101, "pipeline_info_pk": 25 },
            { "pk": 3, "mangaid": "1-24246",  "plateifu": "8486-1901",  "plate": 8486, "ra": 240.10, "dec": 45.12, "ifudesign_pk": 10, "manga_target_pk": 102, "pipeline_info_pk": 25 },
            { "pk": 4, "mangaid": "1-209232", "plateifu": "8485-1901",  "plate": 8485, "ra": 232.54, "dec": 48.69, "ifudesign_pk": 10, "manga_target_pk": 100, "pipeline_info_pk": 11 }
        ])).unwrap();
        store.load_from_json("mangadatadb.ifudesign", json!([
            { "pk": 10, "name": "1901",  "nfiber": 19 },
            { "pk": 11, "name": "12701", "nfiber": 127 }
        ])).unwrap();
    }

    pub fn create_sample(store: &MemoryStore) {
        store.load_from_json("mangasampledb.manga_target", json!([
            { "pk": 100, "mangaid": "1-209232" },
            { "pk": 101, "mangaid": "1-113520" },
            { "pk": 102, "mangaid": "1-24246" }
        ])).unwrap();
        store.load_from_json("mangasampledb.manga_target_to_nsa", json!([
            { "manga_target_pk": 100, "nsa_pk": 1000 },
            { "manga_target_pk": 101, "nsa_pk": 1001 },
            { "manga_target_pk": 102, "nsa_pk": 1002 }
        ])).unwrap();
        store.load_from_json("mangasampledb.nsa", json!([
            { "pk": 1000, "z": 0.0407, "elpetro_mass": 3.1e10, "sersic_n": 1.2, "iauname": "J153010.73+484124.8" },
            { "pk": 1001, "z": 0.2,    "elpetro_mass": 8.0e10, "sersic_n": 3.9, "iauname": "J151805.07+424432.4" },
            { "pk": 1002, "z": 0.0301, "elpetro_mass": 5.0e9,  "sersic_n": 2.0, "iauname": "J160024.00+450712.0" }
        ])).unwrap();
    }

    fn spaxels(file_pk: i64, first_pk: i64, valid: usize, bright: usize, invalid: usize) -> Value {
        let rows: Vec<Value> = (0..valid + invalid)
            .map(|i| {
                let is_valid = i < valid;
                let flux = if is_valid && i < bright { 40.0 } else if is_valid { 10.0 } else { 99.0 };
                json!({
                    "pk": first_pk + i as i64,
                    "file_pk": file_pk,
                    "x": (i % 10) as i64,
                    "y": (i / 10) as i64,
                    "binid": if is_valid { i as i64 } else { -1 },
                    "emline_gflux_ha_6564": flux,
                    "stellar_vel": 0.0
                })
            })
            .collect();
        Value::Array(rows)
    }

    /// Analysis products of cubes 1 and 2: 100 valid spaxels each, 30 and 15
    /// of them above 25 in H-alpha flux, plus invalid bright spaxels.
    pub fn create_analysis(store: &MemoryStore) {
        store.load_from_json("mangadapdb.file", json!([
            { "pk": 1, "cube_pk": 1, "structure_pk": 1, "pipeline_info_pk": 26, "filename": "manga-8485-1901-MAPS-SPX-GAU-MILESHC.fits.gz" },
            { "pk": 2, "cube_pk": 2, "structure_pk": 1, "pipeline_info_pk": 26, "filename": "manga-7443-12701-MAPS-SPX-GAU-MILESHC.fits.gz" }
        ])).unwrap();
        store.load_from_json("mangadapdb.structure", json!([
            { "pk": 1, "bintype_pk": 1, "template_kin_pk": 1, "template_pop_pk": 2 }
        ])).unwrap();
        store.load_from_json("mangadapdb.bintype", json!([{ "pk": 1, "name": "SPX" }])).unwrap();
        store.load_from_json("mangadapdb.template", json!([
            { "pk": 1, "name": "GAU-MILESHC" },
            { "pk": 2, "name": "MILES" }
        ])).unwrap();
        store.load_from_json("mangadapdb.spaxelprop", spaxels(1, 1, 100, 30, 20)).unwrap();
        store.load_from_json("mangadapdb.spaxelprop", spaxels(2, 1001, 100, 15, 20)).unwrap();
    }

    pub fn survey_store() -> MemoryStore {
        let store = MemoryStore::new();
        create_pipeline_info(&store);
        create_cubes(&store);
        create_sample(&store);
        create_analysis(&store);
        store
    }

    /// `n` cubes on one IFU design, all under DR15.
    pub fn many_cubes_store(n: usize) -> MemoryStore {
        let store = MemoryStore::new();
        create_pipeline_info(&store);
        let cubes: Vec<Value> = (0..n)
            .map(|i| json!({
                "pk": i as i64,
                "mangaid": format!("1-{:06}", i),
                "plateifu": format!("{}-1901", 7000 + i % 50),
                "plate": 7000 + (i % 50) as i64,
                "ra": 100.0 + i as f64 / 100.0,
                "dec": 10.0,
                "ifudesign_pk": 10,
                "pipeline_info_pk": 25
            }))
            .collect();
        store.load_from_json("mangadatadb.cube", Value::Array(cubes)).unwrap();
        store.load_from_json("mangadatadb.ifudesign", json!([{ "pk": 10, "name": "1901" }])).unwrap();
        store
    }

    pub fn compile(store: &MemoryStore, config: &QueryConfig, request: &QueryRequest) -> CompiledQuery {
        let versions = config.versions().unwrap();
        QueryCompiler::new(&MANGA_CATALOG, versions).compile(request, store).unwrap()
    }
}

mod tests {
    use serde_json::json;

    use super::fixtures::*;
    use crate::{
        catalog::ReturnType,
        config::QueryConfig,
        executor::{Cell, FetchStrategy, QueryRunner, RunOptions},
        planner::{QueryRequest, SortOrder},
    };

    fn text(cell: &Cell) -> &str {
        cell.as_str().unwrap()
    }

    #[test]
    fn nearby_massive_galaxies() {
        let store = survey_store();
        let config = QueryConfig::default();
        let request = QueryRequest::new()
            .with_filter("nsa.z < 0.1 and nsa.mass > 1e10")
            .with_return_params(&["cube.ra", "cube.dec"])
            .with_return_type(ReturnType::Cube);
        let query = compile(&store, &config, &request);

        let result = QueryRunner::new(&store, &config).run(&query, &RunOptions::new()).unwrap();
        assert_eq!(result.columns[..4], ["cube.mangaid", "cube.plateifu", "cube.ra", "cube.dec"]);
        assert_eq!(result.len(), 1);
        assert_eq!(text(&result.rows[0].0[0]), "1-209232");
        assert_eq!(result.total_count, 1);
        assert_eq!(result.count, 1);
        assert_eq!(result.chunk, 100);
        assert_eq!(result.return_type, Some(ReturnType::Cube));
        assert!(result.warnings.is_empty());
        assert!(result.sql.contains("drpalias.pk = 25"));
    }

    #[test]
    fn percent_of_good_spaxels() {
        let store = survey_store();
        let config = QueryConfig::default();

        let request = QueryRequest::new().with_filter("npergood(haflux > 25) >= 20");
        let query = compile(&store, &config, &request);
        let result = QueryRunner::new(&store, &config).run(&query, &RunOptions::new()).unwrap();
        assert_eq!(result.columns, ["cube.mangaid", "cube.plateifu", "bintype.name", "template.name"]);
        assert_eq!(result.len(), 1, "{:?}", result.to_json());
        assert_eq!(result.rows[0].to_json(&result.columns), json!({
            "cube.mangaid": "1-209232",
            "cube.plateifu": "8485-1901",
            "bintype.name": "SPX",
            "template.name": "GAU-MILESHC"
        }));

        // 15 of 100 pass at 10 percent
        let request = QueryRequest::new().with_filter("npergood(haflux > 25) >= 10");
        let query = compile(&store, &config, &request);
        let result = QueryRunner::new(&store, &config).run(&query, &RunOptions::new()).unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn aggregate_table_rows_collapse_per_object() {
        let store = survey_store();
        store.load_from_json("mangadapdb.file", json!([
            { "pk": 3, "cube_pk": 1, "structure_pk": 1, "pipeline_info_pk": 26, "filename": "manga-8485-1901-MAPS-HYB10-GAU-MILESHC.fits.gz" }
        ])).unwrap();
        store.load_from_json("mangadapdb.dapall", json!([
            { "pk": 1, "file_pk": 1, "ha_gflux_1re": 10.0 },
            { "pk": 2, "file_pk": 3, "ha_gflux_1re": 20.0 },
            { "pk": 3, "file_pk": 2, "ha_gflux_1re": 1.0 }
        ])).unwrap();
        let config = QueryConfig::default();

        let request = QueryRequest::new()
            .with_filter("dapall.ha_gflux_1re > 5")
            .with_return_params(&["cube.ra"])
            .with_return_type(ReturnType::Cube);
        let query = compile(&store, &config, &request);
        let result = QueryRunner::new(&store, &config).run(&query, &RunOptions::new()).unwrap();

        assert_eq!(result.columns, ["cube.mangaid", "cube.plateifu"]);
        assert_eq!(result.len(), 1, "{:?}", result.to_json());
        assert_eq!(text(&result.rows[0].0[0]), "1-209232");
        assert_eq!(result.total_count, 1);
    }

    #[test]
    fn pagination_collapses_large_results() {
        let store = many_cubes_store(5000);
        let config = QueryConfig::default();
        let query = compile(&store, &config, &QueryRequest::new());
        let runner = QueryRunner::new(&store, &config);

        let result = runner.run(&query, &RunOptions::new()).unwrap();
        assert_eq!(result.total_count, 5000);
        assert_eq!(result.len(), 100);
        assert_eq!((result.start, result.end), (Some(0), Some(100)));
        assert_eq!(result.warnings.len(), 1);
        assert!(result.is_truncated());
        assert!(result.sql.ends_with("LIMIT 100 OFFSET 0"));

        let all = runner.run(&query, &RunOptions::new().with_return_all(true)).unwrap();
        assert_eq!(all.len(), 5000);
        assert_eq!((all.start, all.end), (None, None));
        assert!(!all.is_truncated());

        let window = runner.run(&query, &RunOptions::new().with_window(Some(4990), Some(5010))).unwrap();
        assert_eq!(window.len(), 10);
        assert_eq!(text(&window.rows[0].0[0]), "1-004990");
    }

    #[test]
    fn history_counts_runs_and_caches_count() {
        let store = survey_store();
        let config = QueryConfig::default();
        let query = compile(&store, &config, &QueryRequest::new().with_filter("nsa.z < 0.1"));
        let runner = QueryRunner::new(&store, &config);

        let first = runner.run(&query, &RunOptions::new()).unwrap();
        let history = store.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].n_run, 1);
        assert_eq!(history[0].count, first.total_count);
        assert_eq!(history[0].search_filter, "nsa.z<0.1");
        assert_eq!(history[0].release, "DR15");

        // the stored count wins over a live one
        store.load_from_json("mangadatadb.cube", json!([
            { "pk": 9, "mangaid": "1-999", "plateifu": "9999-1901", "ifudesign_pk": 10, "manga_target_pk": 100, "pipeline_info_pk": 25 }
        ])).unwrap();
        let second = runner.run(&query, &RunOptions::new()).unwrap();
        assert_eq!(second.total_count, first.total_count);
        assert_eq!(second.len(), first.len() + 1);

        let history = store.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].n_run, 2);
    }

    #[test]
    fn concurrent_runs_share_one_history_record() {
        let store = survey_store();
        let config = QueryConfig::default();
        let query = compile(&store, &config, &QueryRequest::new().with_return_params(&["nsa.z"]));

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    QueryRunner::new(&store, &config).run(&query, &RunOptions::new()).unwrap();
                });
            }
        });

        let history = store.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].n_run, 8);
    }

    #[test]
    fn strategies_return_identical_rows() {
        let store = survey_store();
        let config = QueryConfig::default().with_chunk_size(7);
        let request = QueryRequest::new()
            .with_filter("haflux > 25")
            .with_sort("spaxelprop.x", SortOrder::Desc);
        let query = compile(&store, &config, &request);
        let runner = QueryRunner::new(&store, &config);

        let results: Vec<_> = [FetchStrategy::Cursor, FetchStrategy::Connection, FetchStrategy::Chunked]
            .into_iter()
            .map(|strategy| runner.run(&query, &RunOptions::new().with_strategy(strategy).with_return_all(true)).unwrap())
            .collect();

        // 30 + 15 bright valid spaxels and 40 invalid ones
        assert_eq!(results[0].len(), 85);
        for other in &results[1..] {
            assert_eq!(other.columns, results[0].columns);
            assert_eq!(other.rows, results[0].rows);
        }

        let unstreamed = QueryConfig::default().with_streaming(false);
        let single = QueryRunner::new(&store, &unstreamed)
            .run(&query, &RunOptions::new().with_strategy(FetchStrategy::Chunked))
            .unwrap();
        assert_eq!(single.rows, results[0].rows);
    }

    #[test]
    fn unreachable_store_fails_without_history() {
        let store = survey_store();
        let config = QueryConfig::default();
        let query = compile(&store, &config, &QueryRequest::new());

        store.set_connected(false);
        let err = QueryRunner::new(&store, &config).run(&query, &RunOptions::new()).unwrap_err();
        assert!(err.is_connectivity());

        store.set_connected(true);
        assert!(store.history().unwrap().is_empty());
    }
}
