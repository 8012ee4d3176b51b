use crate::{env_or_default, ConfigError, FromEnv};

/// Tunables for the pipeline's concurrency and memory discipline (spec §5, §6).
#[derive(Clone, Debug)]
pub struct PerformanceConfig {
    /// Number of Parquet files read concurrently within one partition.
    pub parallel_readers: usize,
    /// Whether the reader emits a lazy, bounded sequence of row-batches
    /// (`true`) or a single in-memory table (`false`).
    pub use_streaming: bool,
    /// Row-batch size used in streaming mode.
    pub chunk_size: usize,
    /// Worker-task pool size for the CPU-bound aggregation stages.
    pub max_workers: usize,
    /// Whether predicate post-filters may use Arrow's vectorised compute
    /// kernels instead of a row-at-a-time scan.
    pub use_arrow_compute: bool,
    /// Whether the warehouse writer uses the streaming `COPY` path instead
    /// of row-at-a-time `INSERT`s.
    pub use_bulk_copy: bool,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            parallel_readers: 4,
            use_streaming: true,
            chunk_size: 50_000,
            max_workers: 4,
            use_arrow_compute: true,
            use_bulk_copy: true,
        }
    }
}

impl FromEnv for PerformanceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let parse = |key: &str, default: &str| -> Result<usize, ConfigError> {
            env_or_default(key, default)
                .parse()
                .map_err(|e| ConfigError::ParseError {
                    key: key.to_string(),
                    details: format!("{}", e),
                })
        };
        let parse_bool = |key: &str, default: &str| -> Result<bool, ConfigError> {
            env_or_default(key, default)
                .parse()
                .map_err(|e| ConfigError::ParseError {
                    key: key.to_string(),
                    details: format!("{}", e),
                })
        };

        let config = Self {
            parallel_readers: parse("PARALLEL_READERS", "4")?,
            use_streaming: parse_bool("USE_STREAMING", "true")?,
            chunk_size: parse("CHUNK_SIZE", "50000")?,
            max_workers: parse("MAX_WORKERS", "4")?,
            use_arrow_compute: parse_bool("USE_ARROW_COMPUTE", "true")?,
            use_bulk_copy: parse_bool("USE_BULK_COPY", "true")?,
        };

        if config.parallel_readers == 0 {
            return Err(ConfigError::ParseError {
                key: "PARALLEL_READERS".to_string(),
                details: "must be >= 1".to_string(),
            });
        }
        if config.chunk_size == 0 {
            return Err(ConfigError::ParseError {
                key: "CHUNK_SIZE".to_string(),
                details: "must be >= 1".to_string(),
            });
        }
        if config.max_workers == 0 {
            return Err(ConfigError::ParseError {
                key: "MAX_WORKERS".to_string(),
                details: "must be >= 1".to_string(),
            });
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_performance_config_defaults() {
        let config = PerformanceConfig::default();
        assert_eq!(config.parallel_readers, 4);
        assert!(config.use_streaming);
    }

    #[test]
    fn test_performance_config_rejects_zero_chunk_size() {
        temp_env::with_var("CHUNK_SIZE", Some("0"), || {
            let result = PerformanceConfig::from_env();
            assert!(result.is_err());
        });
    }

    #[test]
    fn test_performance_config_from_env_custom() {
        temp_env::with_vars(
            [("PARALLEL_READERS", Some("8")), ("CHUNK_SIZE", Some("10000"))],
            || {
                let config = PerformanceConfig::from_env().unwrap();
                assert_eq!(config.parallel_readers, 8);
                assert_eq!(config.chunk_size, 10000);
            },
        );
    }
}
