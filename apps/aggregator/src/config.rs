//! Loads the YAML-shaped pipeline configuration and the environment
//! variables that override it for container deployments.

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use core_config::object_store::ObjectStoreConfig;
use core_config::performance::PerformanceConfig;
use database::postgres::PostgresConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("config invalid: {0}")]
    Invalid(String),
}

/// The provider kind a [`ProviderConfig`] entry runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ProviderType {
    #[serde(rename = "OCP")]
    Ocp,
    #[serde(rename = "OCP_AWS")]
    OcpAws,
}

/// One entry of the `providers` list. `source_uuid` is the OCP source for
/// an `OCP` provider; `OCP_AWS` providers carry `ocp_source_uuid` and
/// `aws_source_uuid` instead and `source_uuid` is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    #[serde(rename = "type")]
    pub kind: ProviderType,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub source_uuid: Option<Uuid>,
    pub ocp_source_uuid: Option<Uuid>,
    pub aws_source_uuid: Option<Uuid>,
    #[serde(default)]
    pub markup: Decimal,
    pub cluster_id_override: Option<String>,
    pub cluster_alias_override: Option<String>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DateRangeConfig {
    pub year: i32,
    pub month: u32,
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub db: String,
    pub user: String,
    pub password: String,
    pub schema: String,
}

impl DatabaseConfig {
    /// Builds a connection URL with `options=-csearch_path=<schema>` so every
    /// physical connection sea_orm opens from the pool defaults to this
    /// schema, not just the one `ensure_schema` runs its `SET` on.
    fn into_postgres_config(self) -> PostgresConfig {
        let url = format!(
            "postgresql://{}:{}@{}:{}/{}?options=-csearch_path%3D{}",
            self.user, self.password, self.host, self.port, self.db, self.schema
        );
        PostgresConfig::new(url)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ObjectStoreYaml {
    endpoint: String,
    bucket: String,
    #[serde(default)]
    access_key: String,
    #[serde(default)]
    secret_key: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PerformanceYaml {
    parallel_readers: Option<usize>,
    use_streaming: Option<bool>,
    chunk_size: Option<usize>,
    max_workers: Option<usize>,
    use_arrow_compute: Option<bool>,
    use_bulk_copy: Option<bool>,
}

impl PerformanceYaml {
    fn into_config(self) -> PerformanceConfig {
        let default = PerformanceConfig::default();
        PerformanceConfig {
            parallel_readers: self.parallel_readers.unwrap_or(default.parallel_readers),
            use_streaming: self.use_streaming.unwrap_or(default.use_streaming),
            chunk_size: self.chunk_size.unwrap_or(default.chunk_size),
            max_workers: self.max_workers.unwrap_or(default.max_workers),
            use_arrow_compute: self.use_arrow_compute.unwrap_or(default.use_arrow_compute),
            use_bulk_copy: self.use_bulk_copy.unwrap_or(default.use_bulk_copy),
        }
    }
}

/// The top-level YAML document. Unknown keys at every nesting level are
/// rejected rather than silently ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct PipelineConfigYaml {
    org_id: String,
    providers: Vec<ProviderConfig>,
    date_range: DateRangeConfig,
    database: DatabaseConfig,
    object_store: ObjectStoreYaml,
    #[serde(default)]
    performance: PerformanceYaml,
}

/// Fully resolved pipeline configuration: the YAML document plus whatever
/// environment-variable overrides apply to a container deployment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub org_id: String,
    pub providers: Vec<ProviderConfig>,
    pub date_range: DateRangeConfig,
    pub database: PostgresConfig,
    pub schema: String,
    pub object_store: ObjectStoreConfig,
    pub performance: PerformanceConfig,
}

impl PipelineConfig {
    /// Loads `path` as YAML, then applies the environment-variable
    /// overrides documented for container deployments: `POC_YEAR`,
    /// `POC_MONTH`, `OCP_PROVIDER_UUID`, `AWS_PROVIDER_UUID`,
    /// `OCP_CLUSTER_ID`, `DATABASE_URL`, and the `OBJECT_STORE_*`
    /// credential variables.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let yaml: PipelineConfigYaml = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml(yaml)
    }

    fn from_yaml(yaml: PipelineConfigYaml) -> Result<Self, ConfigError> {
        for provider in &yaml.providers {
            if provider.markup < Decimal::ZERO || provider.markup > Decimal::ONE {
                return Err(ConfigError::Invalid(format!(
                    "markup {} outside [0,1]",
                    provider.markup
                )));
            }
            match provider.kind {
                ProviderType::Ocp if provider.source_uuid.is_none() => {
                    return Err(ConfigError::Invalid("OCP provider missing source_uuid".into()));
                }
                ProviderType::OcpAws if provider.ocp_source_uuid.is_none() || provider.aws_source_uuid.is_none() => {
                    return Err(ConfigError::Invalid(
                        "OCP_AWS provider requires both ocp_source_uuid and aws_source_uuid".into(),
                    ));
                }
                _ => {}
            }
        }

        let object_store = ObjectStoreConfig {
            endpoint: env_override("OBJECT_STORE_ENDPOINT", yaml.object_store.endpoint),
            bucket: env_override("OBJECT_STORE_BUCKET", yaml.object_store.bucket),
            access_key: env_override("OBJECT_STORE_ACCESS_KEY", yaml.object_store.access_key),
            secret_key: env_override("OBJECT_STORE_SECRET_KEY", yaml.object_store.secret_key),
        };

        let schema = yaml.database.schema.clone();
        let database = if let Ok(url) = std::env::var("DATABASE_URL") {
            PostgresConfig::new(url)
        } else {
            yaml.database.into_postgres_config()
        };

        let mut date_range = yaml.date_range;
        if let Ok(year) = std::env::var("POC_YEAR") {
            date_range.year = year.parse().map_err(|_| ConfigError::Invalid("POC_YEAR must be an integer".into()))?;
        }
        if let Ok(month) = std::env::var("POC_MONTH") {
            date_range.month = month.parse().map_err(|_| ConfigError::Invalid("POC_MONTH must be an integer".into()))?;
        }

        let ocp_override = std::env::var("OCP_PROVIDER_UUID").ok();
        let aws_override = std::env::var("AWS_PROVIDER_UUID").ok();
        let cluster_override = std::env::var("OCP_CLUSTER_ID").ok();

        let providers = yaml
            .providers
            .into_iter()
            .map(|mut provider| {
                if let Some(uuid) = &ocp_override {
                    let parsed = Uuid::parse_str(uuid)
                        .map_err(|_| ConfigError::Invalid("OCP_PROVIDER_UUID is not a valid UUID".into()))?;
                    match provider.kind {
                        ProviderType::Ocp => provider.source_uuid = Some(parsed),
                        ProviderType::OcpAws => provider.ocp_source_uuid = Some(parsed),
                    }
                }
                if let Some(uuid) = &aws_override {
                    if provider.kind == ProviderType::OcpAws {
                        provider.aws_source_uuid = Some(
                            Uuid::parse_str(uuid)
                                .map_err(|_| ConfigError::Invalid("AWS_PROVIDER_UUID is not a valid UUID".into()))?,
                        );
                    }
                }
                if let Some(cluster_id) = &cluster_override {
                    provider.cluster_id_override = Some(cluster_id.clone());
                }
                Ok(provider)
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            org_id: yaml.org_id,
            providers,
            date_range,
            database,
            schema,
            object_store,
            performance: yaml.performance.into_config(),
        })
    }
}

fn env_override(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

/// A handle to every provider this run will attempt, resolved from
/// [`PipelineConfig`] into the identifiers the coordinator needs.
#[derive(Debug, Clone)]
pub enum ResolvedProvider {
    Ocp { source_uuid: Uuid },
    OcpAws { ocp_source_uuid: Uuid, aws_source_uuid: Uuid },
}

impl ProviderConfig {
    pub fn resolve(&self) -> Result<ResolvedProvider, ConfigError> {
        match self.kind {
            ProviderType::Ocp => Ok(ResolvedProvider::Ocp {
                source_uuid: self.source_uuid.ok_or_else(|| ConfigError::Invalid("OCP provider missing source_uuid".into()))?,
            }),
            ProviderType::OcpAws => Ok(ResolvedProvider::OcpAws {
                ocp_source_uuid: self
                    .ocp_source_uuid
                    .ok_or_else(|| ConfigError::Invalid("OCP_AWS provider missing ocp_source_uuid".into()))?,
                aws_source_uuid: self
                    .aws_source_uuid
                    .ok_or_else(|| ConfigError::Invalid("OCP_AWS provider missing aws_source_uuid".into()))?,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
org_id: "org-1"
providers:
  - type: "OCP"
    enabled: true
    source_uuid: "11111111-1111-1111-1111-111111111111"
    markup: "0.1"
date_range:
  year: 2026
  month: 6
database:
  host: localhost
  port: 5432
  db: cost_usage
  user: postgres
  password: postgres
  schema: public
object_store:
  endpoint: "https://s3.example.com"
  bucket: "cost-usage"
  access_key: "key"
  secret_key: "secret"
"#
    }

    #[test]
    fn parses_minimal_document_and_fills_performance_defaults() {
        let yaml: PipelineConfigYaml = serde_yaml::from_str(sample_yaml()).unwrap();
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.date_range.year, 2026);
        assert_eq!(config.performance.parallel_readers, 4);
        assert_eq!(config.schema, "public");
    }

    #[test]
    fn rejects_unknown_top_level_key() {
        let mut text = sample_yaml().to_string();
        text.push_str("extra_key: true\n");
        let result: Result<PipelineConfigYaml, _> = serde_yaml::from_str(&text);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_markup_outside_unit_interval() {
        let text = sample_yaml().replace("markup: \"0.1\"", "markup: \"1.5\"");
        let yaml: PipelineConfigYaml = serde_yaml::from_str(&text).unwrap();
        let result = PipelineConfig::from_yaml(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn ocp_provider_resolves_to_its_source_uuid() {
        let yaml: PipelineConfigYaml = serde_yaml::from_str(sample_yaml()).unwrap();
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        match config.providers[0].resolve().unwrap() {
            ResolvedProvider::Ocp { source_uuid } => {
                assert_eq!(source_uuid.to_string(), "11111111-1111-1111-1111-111111111111");
            }
            ResolvedProvider::OcpAws { .. } => panic!("expected OCP"),
        }
    }

    #[test]
    fn ocp_aws_provider_requires_both_uuids() {
        let text = sample_yaml().replace(
            r#"  - type: "OCP"
    enabled: true
    source_uuid: "11111111-1111-1111-1111-111111111111"
    markup: "0.1""#,
            r#"  - type: "OCP_AWS"
    enabled: true
    ocp_source_uuid: "11111111-1111-1111-1111-111111111111"
    markup: "0.1""#,
        );
        let yaml: PipelineConfigYaml = serde_yaml::from_str(&text).unwrap();
        let result = PipelineConfig::from_yaml(yaml);
        assert!(result.is_err());
    }
}
