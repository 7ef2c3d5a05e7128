//! Bootstrap configuration loading and resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! The column schema is validated once at startup so that a layout change in
//! the lab export is a configuration change rather than a code change.

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Input file read when nothing else is configured
pub const DEFAULT_INPUT_FILE: &str = "genetics_data.csv";

/// Entity definition that result records are created from
pub const DEFAULT_ENTITY_NAME: &str = "GeneticResults";

/// SKU name identifying the sample tube order item
pub const DEFAULT_CONTAINER_SKU: &str = "Test Tube";

/// Marker key → CSV column index, labelled like the lab report
pub const DEFAULT_MARKERS: [(&str, usize); 3] = [("FTO", 8), ("MC4R", 15), ("DRD2", 22)];

pub const DEFAULT_CONTAINER_COLUMN: usize = 1;
pub const DEFAULT_DATE_COLUMN: usize = 24;
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Environment variable naming the TOML config file
pub const CONFIG_ENV_VAR: &str = "GENETICS_LOADER_CONFIG";
/// Environment variable naming the input CSV file
pub const INPUT_ENV_VAR: &str = "GENETICS_INPUT";
/// Environment variable naming the SQLite database file
pub const DATABASE_ENV_VAR: &str = "GENETICS_DATABASE";

/// Bootstrap configuration as read from the TOML file
///
/// Every section is optional; missing keys fall back to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    /// Input CSV file
    pub input: Option<PathBuf>,
    pub database: DatabaseConfig,
    pub ingest: IngestConfig,
    pub columns: ColumnSchema,
    pub logging: LoggingConfig,
}

/// Database connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: Option<PathBuf>,

    /// Echo every executed statement to the log at debug level
    pub log_statements: bool,

    /// Upper bound on pooled connections
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            log_statements: false,
            max_connections: 1,
        }
    }
}

/// Settings for the reconciliation procedure
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// Name of the entity definition new records are created from
    pub entity_name: String,

    /// SKU name of the order item carrying the container tracking value
    pub container_sku: String,

    /// Whether the first CSV line is a header to be skipped
    pub has_headers: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            entity_name: DEFAULT_ENTITY_NAME.to_string(),
            container_sku: DEFAULT_CONTAINER_SKU.to_string(),
            has_headers: false,
        }
    }
}

/// One marker result column
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkerColumn {
    /// Key written under `results` in the record metadata
    pub key: String,
    /// 0-based CSV column index
    pub column: usize,
}

/// Positional mapping from CSV columns to row fields (0-based indices)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnSchema {
    pub container_id: usize,
    pub date: usize,
    /// chrono format string for the date column
    pub date_format: String,
    pub markers: Vec<MarkerColumn>,
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self {
            container_id: DEFAULT_CONTAINER_COLUMN,
            date: DEFAULT_DATE_COLUMN,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            markers: DEFAULT_MARKERS
                .iter()
                .map(|(key, column)| MarkerColumn {
                    key: key.to_string(),
                    column: *column,
                })
                .collect(),
        }
    }
}

impl ColumnSchema {
    /// Check the mapping for internal consistency
    ///
    /// Requires at least one marker, unique non-empty marker keys, a non-empty
    /// date format, and no column index mapped to two fields.
    pub fn validate(&self) -> Result<()> {
        if self.markers.is_empty() {
            return Err(Error::Config(
                "columns.markers must name at least one marker".to_string(),
            ));
        }

        if self.date_format.trim().is_empty() {
            return Err(Error::Config("columns.date_format is empty".to_string()));
        }

        let mut keys = HashSet::new();
        for marker in &self.markers {
            if marker.key.trim().is_empty() {
                return Err(Error::Config(format!(
                    "Marker at column {} has an empty key",
                    marker.column
                )));
            }
            if !keys.insert(marker.key.as_str()) {
                return Err(Error::Config(format!(
                    "Marker key '{}' is mapped more than once",
                    marker.key
                )));
            }
        }

        let mut columns = HashSet::new();
        let fields = [("container_id", self.container_id), ("date", self.date)]
            .into_iter()
            .chain(self.markers.iter().map(|m| (m.key.as_str(), m.column)));
        for (field, column) in fields {
            if !columns.insert(column) {
                return Err(Error::Config(format!(
                    "Column {} is mapped to more than one field (second use: {})",
                    column, field
                )));
            }
        }

        Ok(())
    }

    /// Minimum number of fields a row must carry
    pub fn min_width(&self) -> usize {
        self.markers
            .iter()
            .map(|m| m.column)
            .chain([self.container_id, self.date])
            .max()
            .map_or(0, |max| max + 1)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Read and parse a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Read TOML failed ({}): {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub input: Option<PathBuf>,
    pub database: Option<PathBuf>,
}

/// Fully resolved configuration for one run
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub input: PathBuf,
    pub database_path: PathBuf,
    pub database: DatabaseConfig,
    pub ingest: IngestConfig,
    pub columns: ColumnSchema,
    pub logging: LoggingConfig,
}

impl LoaderConfig {
    /// Resolve configuration from CLI overrides, environment, TOML and defaults
    ///
    /// Fails if an explicitly named config file cannot be read, if no database
    /// path is configured anywhere, or if the column schema is inconsistent.
    pub fn resolve(overrides: &Overrides) -> Result<Self> {
        let toml_config = match locate_config_file(overrides.config_file.as_deref())? {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                TomlConfig::load(&path)?
            }
            None => TomlConfig::default(),
        };

        Self::from_sources(overrides, toml_config)
    }

    /// Merge already-loaded TOML configuration with CLI and environment values
    pub fn from_sources(overrides: &Overrides, toml_config: TomlConfig) -> Result<Self> {
        let input = resolve_path(overrides.input.as_deref(), INPUT_ENV_VAR, toml_config.input)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_FILE));

        let database_path = resolve_path(
            overrides.database.as_deref(),
            DATABASE_ENV_VAR,
            toml_config.database.path.clone(),
        )
        .ok_or_else(|| {
            Error::Config(format!(
                "No database configured. Use --database, {} or [database].path",
                DATABASE_ENV_VAR
            ))
        })?;

        toml_config.columns.validate()?;

        if toml_config.database.max_connections == 0 {
            return Err(Error::Config(
                "database.max_connections must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            input,
            database_path,
            database: toml_config.database,
            ingest: toml_config.ingest,
            columns: toml_config.columns,
            logging: toml_config.logging,
        })
    }
}

/// Pick a path by priority: CLI argument, environment variable, TOML value
fn resolve_path(cli_arg: Option<&Path>, env_var_name: &str, toml_value: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    toml_value
}

/// Find the TOML config file to load, if any
///
/// An explicitly named file (CLI or environment) must exist. The per-user
/// default location is optional.
pub fn locate_config_file(cli_arg: Option<&Path>) -> Result<Option<PathBuf>> {
    let explicit = cli_arg
        .map(Path::to_path_buf)
        .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from));

    if let Some(path) = explicit {
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let user_config = dirs::config_dir().map(|d| d.join("genetics-loader").join("config.toml"));
    match user_config {
        Some(path) if path.exists() => {
            info!("Using config file {}", path.display());
            Ok(Some(path))
        }
        _ => Ok(None),
    }
}
