//! Harness configuration.
//!
//! Values come from defaults, then an optional TOML file, then `RTDB_*`
//! environment variables. Command-line flags are applied by the binary last.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::generator::{
    default_base_date, ChunkDateMode, GeneratorConfig, DEFAULT_CHUNK_SIZE, DEFAULT_RECORD_COUNT,
    DEFAULT_SAMPLE_STRIDE,
};
use crate::record::KeyPath;
use crate::scenarios::{BulkFixture, SimulationConfig};
use crate::writer::DEFAULT_MAX_IN_FLIGHT;

/// Harness configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Database base URL for the REST store (e.g. `https://my-app.firebaseio.com`)
    pub database_url: Option<String>,
    /// Service credential JSON file
    pub credentials_path: Option<PathBuf>,
    /// Per-scenario timeout in milliseconds
    pub default_timeout_ms: u64,
    /// Timeout for the simulation suite in milliseconds
    pub simulation_timeout_ms: u64,
    /// HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Collection used by the bulk suite
    pub bulk_path: String,
    /// Records written by the bulk suite
    pub bulk_records: i64,
    /// Collection used by the simulation
    pub simulation_path: String,
    /// Records generated by the simulation
    pub record_count: usize,
    /// Operations per chunk
    pub chunk_size: usize,
    /// Every n-th record is sampled for deletion
    pub sample_stride: usize,
    /// Day stamped on the first chunk
    pub base_date: NaiveDate,
    /// Window queried by the simulation, in days from `base_date`
    pub window_days: u64,
    pub date_mode: ChunkDateMode,
    /// Concurrent chunk updates
    pub max_in_flight: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            credentials_path: None,
            default_timeout_ms: 5_000,
            simulation_timeout_ms: 480_000, // 8 minutes
            request_timeout_ms: 60_000,
            bulk_path: "test".to_string(),
            bulk_records: 10,
            simulation_path: "transactions".to_string(),
            record_count: DEFAULT_RECORD_COUNT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            sample_stride: DEFAULT_SAMPLE_STRIDE,
            base_date: default_base_date(),
            window_days: 30,
            date_mode: ChunkDateMode::PerChunk,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

impl HarnessConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string. Missing keys keep their defaults.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Toml(e.to_string()))
    }

    /// Applies environment variable overrides.
    /// Environment variables are prefixed with `RTDB_`.
    /// Example: `RTDB_RECORD_COUNT=5000` overrides `record_count`.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| env::var(var).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("RTDB_DATABASE_URL") {
            self.database_url = Some(val);
        }
        if let Some(val) = lookup("RTDB_CREDENTIALS") {
            self.credentials_path = Some(PathBuf::from(val));
        }
        override_parsed(&lookup, "RTDB_DEFAULT_TIMEOUT_MS", &mut self.default_timeout_ms)?;
        override_parsed(&lookup, "RTDB_SIMULATION_TIMEOUT_MS", &mut self.simulation_timeout_ms)?;
        override_parsed(&lookup, "RTDB_REQUEST_TIMEOUT_MS", &mut self.request_timeout_ms)?;
        if let Some(val) = lookup("RTDB_BULK_PATH") {
            self.bulk_path = val;
        }
        override_parsed(&lookup, "RTDB_BULK_RECORDS", &mut self.bulk_records)?;
        if let Some(val) = lookup("RTDB_SIMULATION_PATH") {
            self.simulation_path = val;
        }
        override_parsed(&lookup, "RTDB_RECORD_COUNT", &mut self.record_count)?;
        override_parsed(&lookup, "RTDB_CHUNK_SIZE", &mut self.chunk_size)?;
        override_parsed(&lookup, "RTDB_SAMPLE_STRIDE", &mut self.sample_stride)?;
        override_parsed(&lookup, "RTDB_BASE_DATE", &mut self.base_date)?;
        override_parsed(&lookup, "RTDB_WINDOW_DAYS", &mut self.window_days)?;
        override_parsed(&lookup, "RTDB_MAX_IN_FLIGHT", &mut self.max_in_flight)?;
        if let Some(val) = lookup("RTDB_DATE_MODE") {
            self.date_mode = match val.as_str() {
                "per_chunk" => ChunkDateMode::PerChunk,
                "shared" => ChunkDateMode::Shared,
                _ => {
                    return Err(ConfigError::Env {
                        var: "RTDB_DATE_MODE",
                        value: val,
                    })
                }
            };
        }
        Ok(())
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn simulation_timeout(&self) -> Duration {
        Duration::from_millis(self.simulation_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Fixture for the bulk suite.
    pub fn bulk_fixture(&self) -> Result<BulkFixture, ConfigError> {
        if self.bulk_records < 1 {
            return Err(ConfigError::Invalid(format!(
                "bulk_records must be at least 1, got {}",
                self.bulk_records
            )));
        }
        Ok(BulkFixture {
            collection: collection_path("bulk_path", &self.bulk_path)?,
            record_count: self.bulk_records,
        })
    }

    /// Generator and query parameters for the simulation suite.
    pub fn simulation_config(&self) -> Result<SimulationConfig, ConfigError> {
        if self.chunk_size == 0 || self.sample_stride == 0 {
            return Err(ConfigError::Invalid(
                "chunk_size and sample_stride must be greater than 0".to_string(),
            ));
        }
        Ok(SimulationConfig {
            generator: GeneratorConfig {
                collection: collection_path("simulation_path", &self.simulation_path)?,
                record_count: self.record_count,
                chunk_size: self.chunk_size,
                sample_stride: self.sample_stride,
                base_date: self.base_date,
                date_mode: self.date_mode,
            },
            window_days: self.window_days,
            max_in_flight: self.max_in_flight,
            ..SimulationConfig::default()
        })
    }
}

fn override_parsed<F, T>(lookup: &F, var: &'static str, slot: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(value) = lookup(var) {
        *slot = value
            .parse()
            .map_err(|_| ConfigError::Env { var, value })?;
    }
    Ok(())
}

fn collection_path(field: &str, raw: &str) -> Result<KeyPath, ConfigError> {
    let path = KeyPath::parse(raw).map_err(|e| ConfigError::Invalid(format!("{}: {}", field, e)))?;
    if path.is_root() {
        return Err(ConfigError::Invalid(format!(
            "{} must name a collection, got '{}'",
            field, raw
        )));
    }
    Ok(path)
}
