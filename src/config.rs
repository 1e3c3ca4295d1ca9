use std::{fmt::Display, fs, path::Path, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{QueryError, QueryResult};

/// Where a query is compiled and executed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Local,
    Remote,
    /// Local first, remote once on a connectivity failure.
    #[default]
    Auto,
}

impl FromStr for Mode {
    type Err = QueryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Mode::Local),
            "remote" => Ok(Mode::Remote),
            "auto" => Ok(Mode::Auto),
            other => Err(QueryError::usage(format!("mode must be local, remote or auto, got '{other}'"))),
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Local => f.write_str("local"),
            Mode::Remote => f.write_str("remote"),
            Mode::Auto => f.write_str("auto"),
        }
    }
}

/// Processing-software versions bound to a data release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseVersions {
    /// primary reduction pipeline version
    pub drpver: String,
    /// derived-analysis pipeline version
    pub dapver: String,
}

impl ReleaseVersions {
    pub fn new(drpver: &str, dapver: &str) -> Self {
        Self { drpver: drpver.to_string(), dapver: dapver.to_string() }
    }
}

/// Configuration read by the compiler and the runner.
///
/// - `release` selects the version bindings in `releases`.
/// - `count_threshold` is the row count above which results are truncated to
///   `limit` unless "return all" is requested.
/// - `chunk_size` bounds the rows pulled per fetch round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub release: String,
    pub mode: Mode,
    pub count_threshold: u64,
    pub limit: u64,
    pub streaming: bool,
    pub chunk_size: usize,
    pub releases: IndexMap<String, ReleaseVersions>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        let mut releases = IndexMap::new();
        releases.insert("MPL-4".to_string(), ReleaseVersions::new("v1_5_1", "1.1.1"));
        releases.insert("MPL-5".to_string(), ReleaseVersions::new("v2_0_1", "2.0.2"));
        releases.insert("MPL-6".to_string(), ReleaseVersions::new("v2_3_1", "2.1.3"));
        releases.insert("DR15".to_string(), ReleaseVersions::new("v2_4_3", "2.2.1"));

        Self {
            release: "DR15".to_string(),
            mode: Mode::Auto,
            count_threshold: 1000,
            limit: 100,
            streaming: true,
            chunk_size: 100_000,
            releases,
        }
    }
}

impl QueryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_release(mut self, release: &str) -> Self { self.release = release.to_string(); self }
    pub fn with_mode(mut self, mode: Mode) -> Self { self.mode = mode; self }
    pub fn with_count_threshold(mut self, threshold: u64) -> Self { self.count_threshold = threshold; self }
    pub fn with_limit(mut self, limit: u64) -> Self { self.limit = limit; self }
    pub fn with_streaming(mut self, streaming: bool) -> Self { self.streaming = streaming; self }
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self { self.chunk_size = chunk_size.max(1); self }

    /// Defaults overridden by `MANGAQL_*` environment variables.
    pub fn from_env() -> QueryResult<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`QueryConfig::from_env`] with an explicit variable source.
    pub fn from_vars<F>(lookup: F) -> QueryResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(release) = lookup("MANGAQL_RELEASE") {
            config.release = release.trim().to_string();
        }
        if let Some(mode) = lookup("MANGAQL_MODE") {
            config.mode = mode.parse()?;
        }
        if let Some(threshold) = lookup("MANGAQL_COUNT_THRESHOLD") {
            config.count_threshold = Self::parse_var("MANGAQL_COUNT_THRESHOLD", &threshold)?;
        }
        if let Some(limit) = lookup("MANGAQL_LIMIT") {
            config.limit = Self::parse_var("MANGAQL_LIMIT", &limit)?;
        }
        if let Some(streaming) = lookup("MANGAQL_STREAMING") {
            config.streaming = Self::parse_var("MANGAQL_STREAMING", &streaming)?;
        }
        if let Some(chunk) = lookup("MANGAQL_CHUNK_SIZE") {
            let chunk: usize = Self::parse_var("MANGAQL_CHUNK_SIZE", &chunk)?;
            config.chunk_size = chunk.max(1);
        }

        Ok(config)
    }

    /// Load a JSON configuration file; absent keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| QueryError::usage(format!("cannot read config {}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| QueryError::usage(format!("invalid config {}: {e}", path.display())))
    }

    /// Versions bound to the active release.
    pub fn versions(&self) -> QueryResult<&ReleaseVersions> {
        self.releases
            .get(&self.release)
            .ok_or_else(|| QueryError::usage(format!("unknown release '{}'", self.release)))
    }

    fn parse_var<T: FromStr>(key: &str, value: &str) -> QueryResult<T> {
        value
            .trim()
            .parse()
            .map_err(|_| QueryError::usage(format!("invalid value '{value}' for {key}")))
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, io::Write};

    use super::*;

    #[test]
    fn defaults_match_pagination_policy() {
        let config = QueryConfig::default();
        assert_eq!(config.count_threshold, 1000);
        assert_eq!(config.limit, 100);
        assert_eq!(config.chunk_size, 100_000);
        assert!(config.streaming);
        assert_eq!(config.versions().unwrap().drpver, "v2_4_3");
    }

    #[test]
    fn vars_override_defaults() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("MANGAQL_RELEASE", "MPL-5"),
            ("MANGAQL_MODE", "Remote"),
            ("MANGAQL_COUNT_THRESHOLD", "50"),
            ("MANGAQL_STREAMING", "false"),
        ]);
        let config = QueryConfig::from_vars(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.release, "MPL-5");
        assert_eq!(config.mode, Mode::Remote);
        assert_eq!(config.count_threshold, 50);
        assert!(!config.streaming);
        assert_eq!(config.versions().unwrap().dapver, "2.0.2");
    }

    #[test]
    fn bad_var_is_usage_error() {
        let result = QueryConfig::from_vars(|k| (k == "MANGAQL_LIMIT").then(|| "lots".to_string()));
        assert!(matches!(result, Err(QueryError::Usage(_))));
    }

    #[test]
    fn unknown_release_is_usage_error() {
        let config = QueryConfig::default().with_release("DR99");
        assert!(matches!(config.versions(), Err(QueryError::Usage(_))));
    }

    #[test]
    fn loads_partial_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "release": "MPL-6", "limit": 10, "mode": "local" }}"#).unwrap();

        let config = QueryConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.release, "MPL-6");
        assert_eq!(config.limit, 10);
        assert_eq!(config.mode, Mode::Local);
        assert_eq!(config.count_threshold, 1000);
        assert!(config.releases.contains_key("DR15"));
    }
}
