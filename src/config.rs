//! Pipeline and engine configuration.

use std::fmt;
use std::path::PathBuf;

use smol_str::SmolStr;

use crate::error::ConfigError;

/// Batches with at least this many units start with the incremental worker.
pub const INCREMENTAL_THRESHOLD: usize = 500;

/// Annotation processing may add one follow-up round of generated sources.
pub const DEFAULT_MAX_ROUNDS: usize = 2;

const ENV_THRESHOLD: &str = "SRCINDEX_INCREMENTAL_THRESHOLD";
const ENV_NO_INCREMENTAL: &str = "SRCINDEX_NO_INCREMENTAL";
const ENV_PREFETCH: &str = "SRCINDEX_PREFETCH";

/// How source text is fetched ahead of the worker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "persist", derive(serde::Serialize, serde::Deserialize))]
pub enum PrefetchMode {
    /// Load a window of upcoming units in parallel.
    #[default]
    Concurrent,
    /// Load each unit when it is requested.
    Sequential,
}

/// Paths the compiler engine resolves symbols against.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "persist", derive(serde::Serialize, serde::Deserialize))]
pub struct ClasspathConfig {
    pub boot: Vec<PathBuf>,
    pub module_boot: Vec<PathBuf>,
    pub compile: Vec<PathBuf>,
    pub module_compile: Vec<PathBuf>,
    pub source: Vec<PathBuf>,
}

impl ClasspathConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_boot(mut self, path: impl Into<PathBuf>) -> Self {
        self.boot.push(path.into());
        self
    }

    pub fn with_compile(mut self, path: impl Into<PathBuf>) -> Self {
        self.compile.push(path.into());
        self
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source.push(path.into());
        self
    }
}

/// Full classpath dump, written to the log when the engine reports
/// inconsistent state.
impl fmt::Display for ClasspathConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sections = [
            ("bootPath", &self.boot),
            ("moduleBootPath", &self.module_boot),
            ("classPath", &self.compile),
            ("moduleClassPath", &self.module_compile),
            ("sourcePath", &self.source),
        ];
        for (i, (label, paths)) in sections.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{label}=[")?;
            for (j, path) in paths.iter().enumerate() {
                if j > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", path.display())?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

/// Everything needed to create one compiler engine instance.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "persist", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    pub classpath: ClasspathConfig,
    pub language_level: SmolStr,
    /// Run annotation processors while analyzing.
    pub annotation_processing: bool,
    pub annotation_processor_path: Vec<PathBuf>,
    pub compiler_options: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            classpath: ClasspathConfig::default(),
            language_level: SmolStr::new_static("17"),
            annotation_processing: false,
            annotation_processor_path: Vec::new(),
            compiler_options: Vec::new(),
        }
    }
}

/// Settings for one [`IndexingPipeline`](crate::pipeline::IndexingPipeline).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "persist", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineConfig {
    pub incremental_threshold: usize,
    pub max_rounds: usize,
    pub prefetch: PrefetchMode,
    /// Only ever run the batch worker.
    pub disable_incremental: bool,
    pub engine: EngineConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            incremental_threshold: INCREMENTAL_THRESHOLD,
            max_rounds: DEFAULT_MAX_ROUNDS,
            prefetch: PrefetchMode::default(),
            disable_incremental: false,
            engine: EngineConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.incremental_threshold = threshold;
        self
    }

    pub fn with_prefetch(mut self, mode: PrefetchMode) -> Self {
        self.prefetch = mode;
        self
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_incremental_disabled(mut self, disabled: bool) -> Self {
        self.disable_incremental = disabled;
        self
    }

    /// Defaults overridden by `SRCINDEX_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the `SRCINDEX_*` keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_THRESHOLD) {
            config.incremental_threshold =
                value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: ENV_THRESHOLD,
                    value: value.clone(),
                })?;
        }

        if let Some(value) = lookup(ENV_NO_INCREMENTAL) {
            config.disable_incremental = parse_bool(&value).ok_or(ConfigError::InvalidValue {
                key: ENV_NO_INCREMENTAL,
                value: value.clone(),
            })?;
        }

        if let Some(value) = lookup(ENV_PREFETCH) {
            config.prefetch = match value.trim().to_ascii_lowercase().as_str() {
                "concurrent" => PrefetchMode::Concurrent,
                "sequential" => PrefetchMode::Sequential,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: ENV_PREFETCH,
                        value,
                    });
                }
            };
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: FxHashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.incremental_threshold, 500);
        assert_eq!(config.max_rounds, 2);
        assert_eq!(config.prefetch, PrefetchMode::Concurrent);
        assert!(!config.disable_incremental);
    }

    #[test]
    fn test_env_overrides() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            (ENV_THRESHOLD, "42"),
            (ENV_NO_INCREMENTAL, "true"),
            (ENV_PREFETCH, "Sequential"),
        ]))
        .unwrap();

        assert_eq!(config.incremental_threshold, 42);
        assert!(config.disable_incremental);
        assert_eq!(config.prefetch, PrefetchMode::Sequential);
    }

    #[test]
    fn test_env_rejects_garbage() {
        let err = PipelineConfig::from_lookup(lookup_from(&[(ENV_THRESHOLD, "many")])).unwrap_err();
        assert!(err.to_string().contains(ENV_THRESHOLD));

        assert!(PipelineConfig::from_lookup(lookup_from(&[(ENV_PREFETCH, "eager")])).is_err());
        assert!(PipelineConfig::from_lookup(lookup_from(&[(ENV_NO_INCREMENTAL, "maybe")])).is_err());
    }

    #[test]
    fn test_classpath_dump() {
        let cp = ClasspathConfig::new()
            .with_boot("/jdk/lib/rt.jar")
            .with_source("/src")
            .with_source("/gen");
        let dump = cp.to_string();
        assert!(dump.contains("bootPath=[/jdk/lib/rt.jar]"));
        assert!(dump.contains("sourcePath=[/src, /gen]"));
        assert!(dump.contains("classPath=[]"));
    }
}
