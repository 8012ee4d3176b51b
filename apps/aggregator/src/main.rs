//! Aggregator — batch cost-and-usage aggregation engine.
//!
//! Loads a YAML pipeline configuration, runs every enabled provider through
//! [`domain_cost_aggregation::coordinator`] in declaration order, and exits
//! with the status code that matches the first error the run produced.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use core_config::tracing::init_tracing;
use core_config::Environment;
use domain_cost_aggregation::coordinator::{self, ProviderRun};
use object_store::aws::AmazonS3Builder;
use object_store::ObjectStore;
use tokio::sync::watch;
use tracing::{error, info};

mod config;

use config::{PipelineConfig, ResolvedProvider};

#[derive(Parser)]
#[command(name = "aggregator")]
#[command(about = "Aggregate OCP and AWS usage Parquet partitions into warehouse summary tables")]
struct Cli {
    /// Path to the YAML pipeline configuration.
    #[arg(short, long, default_value = "config.yaml", env = "CONFIG_PATH")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every enabled provider for the configured partition.
    Run {
        /// Replace the whole table instead of only the run's partition.
        #[arg(long)]
        truncate: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let environment = Environment::from_env();
    init_tracing(&environment);
    observability::init_metrics();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

async fn run() -> Result<(), u8> {
    let cli = Cli::parse();
    let Commands::Run { truncate } = cli.command;

    let config = PipelineConfig::load(&cli.config).map_err(|err| {
        error!(%err, "failed to load configuration");
        1u8
    })?;

    let db = database::postgres::connect_from_config_with_retry(config.database.clone(), None)
        .await
        .map_err(|err| {
            error!(%err, "failed to connect to warehouse");
            4u8
        })?;

    ensure_schema(&db, &config.schema).await.map_err(|err| {
        error!(%err, schema = %config.schema, "failed to prepare warehouse schema");
        4u8
    })?;

    database::postgres::run_migrations::<migration::Migrator>(&db, "aggregator")
        .await
        .map_err(|err| {
            error!(%err, "failed to run warehouse migrations");
            4u8
        })?;

    let store = build_object_store(&config).map_err(|err| {
        error!(%err, "failed to configure object store");
        1u8
    })?;

    let (_cancel_tx, cancel_rx) = watch::channel(false);

    let mut exit_code = 0u8;
    for provider in &config.providers {
        if !provider.enabled {
            continue;
        }
        let resolved = provider.resolve().map_err(|err| {
            error!(%err, "invalid provider configuration");
            1u8
        })?;

        let provider_run = ProviderRun {
            org_id: config.org_id.clone(),
            schema: config.schema.clone(),
            year: config.date_range.year,
            month: config.date_range.month,
            markup: provider.markup,
            cluster_id_override: provider.cluster_id_override.clone(),
            cluster_alias_override: provider.cluster_alias_override.clone(),
            truncate,
            parallel_readers: config.performance.parallel_readers,
        };

        let result = match resolved {
            ResolvedProvider::Ocp { source_uuid } => {
                info!(provider = "OCP", %source_uuid, "starting run");
                coordinator::run_ocp_only(&db, store.clone(), &provider_run, source_uuid, cancel_rx.clone()).await
            }
            ResolvedProvider::OcpAws { ocp_source_uuid, aws_source_uuid } => {
                info!(provider = "OCP_AWS", %ocp_source_uuid, %aws_source_uuid, "starting run");
                coordinator::run_ocp_on_aws(&db, store.clone(), &provider_run, ocp_source_uuid, aws_source_uuid, cancel_rx.clone()).await
            }
        };

        if let Err(err) = result {
            exit_code = err.exit_code() as u8;
            break;
        }
    }

    if exit_code == 0 {
        Ok(())
    } else {
        Err(exit_code)
    }
}

/// Creates `schema` if it doesn't exist yet. The connection URL already
/// carries `options=-csearch_path=<schema>` (see `config::DatabaseConfig`),
/// so every pooled connection defaults to it once this runs.
async fn ensure_schema(db: &sea_orm::DatabaseConnection, schema: &str) -> Result<(), sea_orm::DbErr> {
    use sea_orm::ConnectionTrait;
    db.execute_unprepared(&format!("CREATE SCHEMA IF NOT EXISTS {schema}")).await?;
    Ok(())
}

fn build_object_store(config: &PipelineConfig) -> Result<Arc<dyn ObjectStore>, object_store::Error> {
    let store = AmazonS3Builder::new()
        .with_endpoint(&config.object_store.endpoint)
        .with_bucket_name(&config.object_store.bucket)
        .with_access_key_id(&config.object_store.access_key)
        .with_secret_access_key(&config.object_store.secret_key)
        .with_allow_http(!config.object_store.endpoint.starts_with("https"))
        .build()?;
    Ok(Arc::new(store))
}
