//! Configuration loading and root folder resolution
//!
//! Each binary reads an optional TOML file at
//! `<config_dir>/mvbench/<module>.toml`. A missing or unparsable file is never
//! fatal: a warning is logged and compiled defaults apply.
//!
//! Root folder priority:
//! 1. Command-line argument (highest priority)
//! 2. `MVBENCH_ROOT_FOLDER` environment variable
//! 3. `root_folder` in the TOML file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "MVBENCH_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "mvbench.db";

// ============================================================================
// TOML schema
// ============================================================================

/// Logging section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Loader section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Records per transform/insert batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Maximum concurrent insert batches
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            workers: default_workers(),
        }
    }
}

fn default_batch_size() -> usize {
    10_000
}

fn default_workers() -> usize {
    8
}

/// Benchmark section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Per-sample timeout; an execution exceeding it is a failed sample
    #[serde(default = "default_sample_timeout_ms")]
    pub sample_timeout_ms: u64,
    #[serde(default = "default_v1_collection")]
    pub v1_collection: String,
    #[serde(default = "default_v2_collection")]
    pub v2_collection: String,
    #[serde(default = "default_output_folder")]
    pub output_folder: PathBuf,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            sample_timeout_ms: default_sample_timeout_ms(),
            v1_collection: default_v1_collection(),
            v2_collection: default_v2_collection(),
            output_folder: default_output_folder(),
        }
    }
}

fn default_iterations() -> u32 {
    3
}

fn default_sample_timeout_ms() -> u64 {
    30_000
}

fn default_v1_collection() -> String {
    "movies".to_string()
}

fn default_v2_collection() -> String {
    "movies_optimized".to_string()
}

fn default_output_folder() -> PathBuf {
    PathBuf::from("output")
}

/// Contents of `<module>.toml`; every section is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_folder: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub benchmark: BenchmarkConfig,
}

impl TomlConfig {
    /// Load the module's TOML file, falling back to defaults on any problem
    pub fn load_or_default(module_name: &str) -> Self {
        let Some(path) = config_file_path(module_name) else {
            warn!(module = module_name, "Could not determine config directory, using defaults");
            return Self::default();
        };

        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }

        match load_toml_config(&path) {
            Ok(config) => {
                info!(path = %path.display(), "Loaded configuration");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable config file, using defaults");
                Self::default()
            }
        }
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// `<config_dir>/mvbench/<module>.toml`
pub fn config_file_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mvbench").join(format!("{}.toml", module_name)))
}

// ============================================================================
// Defaults
// ============================================================================

/// Values used when neither CLI, environment nor TOML provide one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: default_log_level(),
        }
    }
}

/// `<data_local_dir>/mvbench`, or `./mvbench_data` when the platform has none
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("mvbench"))
        .unwrap_or_else(|| PathBuf::from("./mvbench_data"))
}

// ============================================================================
// Root folder
// ============================================================================

/// Resolves the root folder in priority order
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_override: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_override: None,
            toml_root: None,
        }
    }

    /// Value of the `--root-folder` argument, if given
    pub fn with_cli_override(mut self, path: Option<PathBuf>) -> Self {
        self.cli_override = path;
        self
    }

    /// `root_folder` from an already loaded TOML file
    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_override {
            debug!(path = %path.display(), "Root folder from command line");
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.is_empty() {
                debug!(path = %path, "Root folder from {}", ROOT_FOLDER_ENV);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            debug!(module = %self.module_name, path = %path.display(), "Root folder from TOML");
            return path.clone();
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder and locates the database inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Create the folder (and parents) if missing; idempotent
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!(path = %self.root_folder.display(), "Created root folder");
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
        assert_eq!(config.loader.batch_size, 10_000);
        assert_eq!(config.loader.workers, 8);
        assert_eq!(config.benchmark.iterations, 3);
        assert_eq!(config.benchmark.v2_collection, "movies_optimized");
    }

    #[test]
    fn test_partial_sections() {
        let config: TomlConfig = toml::from_str(
            r#"
            [benchmark]
            iterations = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.benchmark.iterations, 10);
        assert_eq!(config.benchmark.sample_timeout_ms, 30_000);
        assert_eq!(config.logging.level, "info");
    }
}
