use std::path::PathBuf;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};

const DEFAULT_CONFIG: &str = include_str!("default.toml");

/// The prefix of environment variables that override configuration.
/// Nested keys are separated by `__`, e.g. `SLUICE__PARQUET__COMPRESSION`.
pub const CONFIG_ENV_PREFIX: &str = "SLUICE__";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub parquet: ParquetConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> CommonResult<Self> {
        Figment::from(Toml::string(DEFAULT_CONFIG))
            .admerge(Env::prefixed(CONFIG_ENV_PREFIX).map(|p| p.as_str().replace("__", ".").into()))
            .extract()
            .map_err(CommonError::from)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub sources: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParquetConfig {
    pub compression: ParquetCompression,
    pub max_row_group_size: usize,
}

impl Default for ParquetConfig {
    fn default() -> Self {
        Self {
            compression: ParquetCompression::Snappy,
            max_row_group_size: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParquetCompression {
    Uncompressed,
    Snappy,
    Zstd,
    Gzip,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub trace_spans: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn test_default_config() {
        Jail::expect_with(|_| {
            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.paths.sources, PathBuf::from("sources"));
            assert_eq!(config.paths.output, PathBuf::from(".sluice/data"));
            assert_eq!(config.parquet.compression, ParquetCompression::Snappy);
            assert_eq!(config.parquet.max_row_group_size, 1048576);
            assert!(!config.telemetry.trace_spans);
            Ok(())
        });
    }

    #[test]
    fn test_env_override() {
        Jail::expect_with(|jail| {
            jail.set_env("SLUICE__PARQUET__COMPRESSION", "zstd");
            jail.set_env("SLUICE__PARQUET__MAX_ROW_GROUP_SIZE", "4096");
            jail.set_env("SLUICE__PATHS__OUTPUT", "/tmp/out");
            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.parquet.compression, ParquetCompression::Zstd);
            assert_eq!(config.parquet.max_row_group_size, 4096);
            assert_eq!(config.paths.output, PathBuf::from("/tmp/out"));
            Ok(())
        });
    }

    #[test]
    fn test_invalid_compression() {
        Jail::expect_with(|jail| {
            jail.set_env("SLUICE__PARQUET__COMPRESSION", "lzma");
            let error = AppConfig::load().unwrap_err();
            assert!(matches!(error, CommonError::InvalidConfig(_)));
            Ok(())
        });
    }
}
