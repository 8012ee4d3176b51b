use crate::{env_or_default, env_required, ConfigError, FromEnv};

/// Connection settings for the S3-compatible object store that holds the
/// Parquet partitions this pipeline reads.
#[derive(Clone, Debug)]
pub struct ObjectStoreConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

impl FromEnv for ObjectStoreConfig {
    /// Requires `OBJECT_STORE_ENDPOINT`, `OBJECT_STORE_BUCKET`,
    /// `OBJECT_STORE_ACCESS_KEY` and `OBJECT_STORE_SECRET_KEY`.
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: env_required("OBJECT_STORE_ENDPOINT")?,
            bucket: env_required("OBJECT_STORE_BUCKET")?,
            access_key: env_or_default("OBJECT_STORE_ACCESS_KEY", ""),
            secret_key: env_or_default("OBJECT_STORE_SECRET_KEY", ""),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_store_config_from_env() {
        temp_env::with_vars(
            [
                ("OBJECT_STORE_ENDPOINT", Some("https://s3.example.com")),
                ("OBJECT_STORE_BUCKET", Some("cost-usage")),
                ("OBJECT_STORE_ACCESS_KEY", Some("key")),
                ("OBJECT_STORE_SECRET_KEY", Some("secret")),
            ],
            || {
                let config = ObjectStoreConfig::from_env().unwrap();
                assert_eq!(config.endpoint, "https://s3.example.com");
                assert_eq!(config.bucket, "cost-usage");
            },
        );
    }

    #[test]
    fn test_object_store_config_missing_bucket() {
        temp_env::with_vars(
            [
                ("OBJECT_STORE_ENDPOINT", Some("https://s3.example.com")),
                ("OBJECT_STORE_BUCKET", None::<&str>),
            ],
            || {
                let result = ObjectStoreConfig::from_env();
                assert!(result.is_err());
            },
        );
    }
}
