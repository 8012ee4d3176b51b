//! Pipeline coordinator: drives one provider's run through the forward-only
//! state machine below — reading, aggregating, optionally
//! matching/attributing, and writing — wiring retries, cancellation and
//! metrics around the pure functions the other modules expose.
//!
//! The read stage's concurrency is bounded by `ObjectStoreReader` itself; the
//! coordinator's own job is the cancellation signal checked between stages
//! and the retry-with-metrics wrapper around reads. There is no broker here,
//! so there is no consumer group or dead-letter queue, only the cancellation
//! and backoff shape generalised to an in-process batch run.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, TransactionTrait};
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use database::common::retry::{retry_with_backoff, RetryConfig};
use observability::PipelineMetrics;

use crate::attribution::{attribute, AttributionContext};
use crate::decode::{decode_aws_line_items, decode_ocp_pods, decode_ocp_volumes};
use crate::error::{PipelineError, PipelineResult, Stage};
use crate::matcher::{match_line_items, MatchContext};
use crate::model::{OcpPodRecord, OcpVolumeRecord, PartitionKey, ProviderKind};
use crate::ocp_aggregate::{aggregate_pods, aggregate_volumes};
use crate::ocp_on_aws::{by_account, by_region, by_service, cluster_totals, compute_summary, database_summary, detailed_line_items, network_summary, storage_summary};
use crate::reader::{partition_prefix, NoPredicate, ObjectStoreReader};
use crate::summary::AttributedCostRow;
use crate::unallocated::{compute_storage_unattributed, compute_unallocated};
use crate::warehouse::{self, Record, WriteMode};

/// Forward-only run state machine (`§4.10`). No transition ever moves
/// backward; `Committed` and `Failed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Reading,
    Aggregating,
    Matching,
    Attributing,
    Writing,
    Committed,
    Failed,
}

/// Everything the coordinator needs for one provider's partition, gathered
/// from configuration into primitives so this crate stays decoupled from
/// the CLI's YAML/env config types.
#[derive(Clone, Debug)]
pub struct ProviderRun {
    pub org_id: String,
    pub schema: String,
    pub year: i32,
    pub month: u32,
    pub markup: Decimal,
    pub cluster_id_override: Option<String>,
    pub cluster_alias_override: Option<String>,
    pub truncate: bool,
    pub parallel_readers: usize,
}

const POD_SUBTYPE: &str = "openshift_pod_usage_line_items_daily";
const VOLUME_SUBTYPE: &str = "openshift_storage_usage_line_items_daily";
const AWS_SUBTYPE: &str = "aws_line_items_daily";

fn read_retry_config() -> RetryConfig {
    RetryConfig::new().with_max_retries(4).with_initial_delay(200).with_max_delay(5_000)
}

/// Retries a read operation with exponential backoff, recording one
/// `aggregator_retries_total` sample per attempt beyond the first.
async fn with_read_retry<T, F, Fut>(mut operation: F) -> PipelineResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = PipelineResult<T>>,
{
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();
    let result = retry_with_backoff(
        move || {
            counter.fetch_add(1, Ordering::Relaxed);
            operation()
        },
        read_retry_config(),
    )
    .await;
    for _ in 1..attempts.load(Ordering::Relaxed) {
        PipelineMetrics::record_retry(&Stage::Reading.to_string());
    }
    result
}

fn check_cancelled(cancel: &watch::Receiver<bool>, provider: &str, stage: Stage) -> PipelineResult<()> {
    if *cancel.borrow() {
        return Err(PipelineError::Timeout { provider: provider.to_string(), stage });
    }
    Ok(())
}

async fn list_and_read(reader: &ObjectStoreReader, prefix: &str, provider: &str) -> PipelineResult<Vec<arrow::array::RecordBatch>> {
    let paths: Vec<ObjectPath> = with_read_retry(|| reader.list_partition(prefix, provider)).await?;
    with_read_retry(|| reader.read_full(&paths, &[], &NoPredicate, provider)).await
}

async fn read_ocp_pods(reader: &ObjectStoreReader, org_id: &str, source_uuid: Uuid, year: i32, month: u32, provider: &str) -> PipelineResult<Vec<OcpPodRecord>> {
    let prefix = partition_prefix(org_id, ProviderKind::Ocp, &source_uuid, year, month, POD_SUBTYPE);
    let batches = list_and_read(reader, &prefix, provider).await?;
    let mut rows = Vec::new();
    for batch in &batches {
        rows.extend(decode_ocp_pods(batch, provider)?);
    }
    PipelineMetrics::record_rows_read(provider, POD_SUBTYPE, rows.len());
    Ok(rows)
}

async fn read_ocp_volumes(reader: &ObjectStoreReader, org_id: &str, source_uuid: Uuid, year: i32, month: u32, provider: &str) -> PipelineResult<Vec<OcpVolumeRecord>> {
    let prefix = partition_prefix(org_id, ProviderKind::Ocp, &source_uuid, year, month, VOLUME_SUBTYPE);
    let batches = list_and_read(reader, &prefix, provider).await?;
    let mut rows = Vec::new();
    for batch in &batches {
        rows.extend(decode_ocp_volumes(batch, provider)?);
    }
    PipelineMetrics::record_rows_read(provider, VOLUME_SUBTYPE, rows.len());
    Ok(rows)
}

async fn read_aws_line_items(reader: &ObjectStoreReader, org_id: &str, source_uuid: Uuid, year: i32, month: u32, provider: &str) -> PipelineResult<Vec<crate::model::AwsLineItem>> {
    let prefix = partition_prefix(org_id, ProviderKind::Aws, &source_uuid, year, month, AWS_SUBTYPE);
    let batches = list_and_read(reader, &prefix, provider).await?;
    let mut rows = Vec::new();
    for batch in &batches {
        rows.extend(decode_aws_line_items(batch, provider)?);
    }
    PipelineMetrics::record_rows_read(provider, AWS_SUBTYPE, rows.len());
    Ok(rows)
}

/// Applies an operator-configured cluster identity override to every
/// decoded record before aggregation or matching sees them. Some OCP
/// sources never populate `cluster_id`/`cluster_alias` reliably in their
/// Parquet export; the override lets an operator pin the identity the
/// warehouse rows carry instead of discarding the partition.
fn apply_cluster_override(pods: &mut [OcpPodRecord], volumes: &mut [OcpVolumeRecord], cluster_id: Option<&str>, cluster_alias: Option<&str>) {
    if let Some(id) = cluster_id {
        for pod in pods.iter_mut() {
            pod.cluster_id = id.to_string();
        }
        for volume in volumes.iter_mut() {
            volume.cluster_id = id.to_string();
        }
    }
    if let Some(alias) = cluster_alias {
        for pod in pods.iter_mut() {
            pod.cluster_alias = Some(alias.to_string());
        }
        for volume in volumes.iter_mut() {
            volume.cluster_alias = Some(alias.to_string());
        }
    }
}

fn write_mode(truncate: bool) -> WriteMode {
    if truncate {
        WriteMode::Truncate
    } else {
        WriteMode::PartitionReplace
    }
}

async fn write_group<C: ConnectionTrait + TransactionTrait>(db: &C, schema: &str, table: &'static str, partition: &PartitionKey, mode: WriteMode, records: Vec<Record>) -> PipelineResult<()> {
    let rows = records.len();
    warehouse::write_table(db, schema, table, partition, mode, records).await?;
    PipelineMetrics::record_rows_written(table, rows);
    Ok(())
}

/// Runs one OCP-only partition: reads pod and volume records, aggregates
/// them, computes unallocated capacity, and writes every row to
/// [`warehouse::OCP_SUMMARY_TABLE`] in a single transaction so the
/// partition-replace delete never observes a partial previous write.
pub async fn run_ocp_only<C: ConnectionTrait + TransactionTrait>(
    db: &C,
    store: Arc<dyn ObjectStore>,
    run: &ProviderRun,
    source_uuid: Uuid,
    cancel: watch::Receiver<bool>,
) -> PipelineResult<()> {
    let started = Instant::now();
    let provider = "OCP";
    let result = run_ocp_only_inner(db, store, run, source_uuid, provider, &cancel).await;
    record_outcome(provider, &source_uuid, started, &result);
    result
}

async fn run_ocp_only_inner<C: ConnectionTrait + TransactionTrait>(
    db: &C,
    store: Arc<dyn ObjectStore>,
    run: &ProviderRun,
    source_uuid: Uuid,
    provider: &str,
    cancel: &watch::Receiver<bool>,
) -> PipelineResult<()> {
    check_cancelled(cancel, provider, Stage::Reading)?;
    let reader = ObjectStoreReader::new(store, run.parallel_readers);

    let mut pods = read_ocp_pods(&reader, &run.org_id, source_uuid, run.year, run.month, provider).await?;
    let mut volumes = read_ocp_volumes(&reader, &run.org_id, source_uuid, run.year, run.month, provider).await?;
    apply_cluster_override(&mut pods, &mut volumes, run.cluster_id_override.as_deref(), run.cluster_alias_override.as_deref());

    check_cancelled(cancel, provider, Stage::Aggregating)?;
    let enabled_tag_keys = crate::tagkeys::load(db, &run.schema).await.map_err(|err| PipelineError::ConfigInvalid {
        provider: provider.to_string(),
        stage: Stage::Aggregating,
        message: format!("loading enabled tag keys: {err}"),
    })?;

    let pod_summaries = aggregate_pods(&pods, &enabled_tag_keys);
    let volume_summaries = aggregate_volumes(&volumes, &enabled_tag_keys);
    let unallocated = compute_unallocated(&pods);
    let storage_unattributed = compute_storage_unattributed(&volumes);
    PipelineMetrics::record_rows_aggregated("Pod", pod_summaries.len());
    PipelineMetrics::record_rows_aggregated("Storage", volume_summaries.len());
    PipelineMetrics::record_rows_aggregated("Node", unallocated.len());

    check_cancelled(cancel, provider, Stage::Writing)?;
    let partition = PartitionKey {
        org_id: run.org_id.clone(),
        provider_kind: ProviderKind::Ocp,
        source_uuid,
        year: run.year,
        month: run.month,
    };
    let mut records: Vec<Record> = Vec::with_capacity(pod_summaries.len() + volume_summaries.len() + unallocated.len() + storage_unattributed.len());
    records.extend(pod_summaries.iter().map(|row| warehouse::pod_summary_record(row, &partition)));
    records.extend(volume_summaries.iter().map(|row| warehouse::volume_summary_record(row, &partition)));
    records.extend(unallocated.iter().map(|row| warehouse::unallocated_record(row, &partition)));
    records.extend(storage_unattributed.iter().map(|row| warehouse::unallocated_record(row, &partition)));

    write_group(db, &run.schema, warehouse::OCP_SUMMARY_TABLE, &partition, write_mode(run.truncate), records).await?;
    Ok(())
}

/// Runs one OCP-on-AWS partition pair: reads OCP pod/volume records and AWS
/// line items, matches, attributes proportional cost, and writes all nine
/// grouped outputs, each in its own partition-replace transaction scoped to
/// the OCP provider's `source_uuid`.
pub async fn run_ocp_on_aws<C: ConnectionTrait + TransactionTrait>(
    db: &C,
    store: Arc<dyn ObjectStore>,
    run: &ProviderRun,
    ocp_source_uuid: Uuid,
    aws_source_uuid: Uuid,
    cancel: watch::Receiver<bool>,
) -> PipelineResult<()> {
    let started = Instant::now();
    let provider = "OCP_AWS";
    let result = run_ocp_on_aws_inner(db, store, run, ocp_source_uuid, aws_source_uuid, provider, &cancel).await;
    record_outcome(provider, &ocp_source_uuid, started, &result);
    result
}

async fn run_ocp_on_aws_inner<C: ConnectionTrait + TransactionTrait>(
    db: &C,
    store: Arc<dyn ObjectStore>,
    run: &ProviderRun,
    ocp_source_uuid: Uuid,
    aws_source_uuid: Uuid,
    provider: &str,
    cancel: &watch::Receiver<bool>,
) -> PipelineResult<()> {
    check_cancelled(cancel, provider, Stage::Reading)?;
    let reader = ObjectStoreReader::new(store, run.parallel_readers);

    let mut pods = read_ocp_pods(&reader, &run.org_id, ocp_source_uuid, run.year, run.month, provider).await?;
    let mut volumes = read_ocp_volumes(&reader, &run.org_id, ocp_source_uuid, run.year, run.month, provider).await?;
    apply_cluster_override(&mut pods, &mut volumes, run.cluster_id_override.as_deref(), run.cluster_alias_override.as_deref());
    let aws_items = read_aws_line_items(&reader, &run.org_id, aws_source_uuid, run.year, run.month, provider).await?;

    check_cancelled(cancel, provider, Stage::Matching)?;
    let enabled_tag_keys = crate::tagkeys::load(db, &run.schema).await.map_err(|err| PipelineError::ConfigInvalid {
        provider: provider.to_string(),
        stage: Stage::Matching,
        message: format!("loading enabled tag keys: {err}"),
    })?;

    let cluster_id = pods
        .first()
        .map(|pod| pod.cluster_id.clone())
        .or_else(|| volumes.first().map(|volume| volume.cluster_id.clone()))
        .unwrap_or_default();
    let cluster_alias = pods.first().and_then(|pod| pod.cluster_alias.clone());

    let ctx = MatchContext::build(&pods, &volumes, &cluster_id, cluster_alias.as_deref());
    let matched = match_line_items(aws_items, &ctx, &enabled_tag_keys);
    let matched_count = matched.iter().filter(|item| item.resource_id_matched).count();
    PipelineMetrics::record_rows_matched(true, matched_count);
    PipelineMetrics::record_rows_matched(false, matched.len() - matched_count);

    check_cancelled(cancel, provider, Stage::Attributing)?;
    let pod_summaries = aggregate_pods(&pods, &enabled_tag_keys);
    let volume_summaries = aggregate_volumes(&volumes, &enabled_tag_keys);
    let attribution_ctx = AttributionContext {
        pods: &pod_summaries,
        volumes: &volume_summaries,
        markup: run.markup,
        provider,
    };
    let attributed = attribute(matched, &attribution_ctx)?;
    if attributed.is_empty() && matched_count > 0 {
        warn!(provider, "every resource-matched AWS row was dropped by the attribution rules");
    }

    check_cancelled(cancel, provider, Stage::Writing)?;
    let partition = PartitionKey {
        org_id: run.org_id.clone(),
        provider_kind: ProviderKind::Ocp,
        source_uuid: ocp_source_uuid,
        year: run.year,
        month: run.month,
    };
    write_ocp_on_aws_tables(db, &run.schema, &partition, write_mode(run.truncate), &attributed).await?;
    Ok(())
}

async fn write_ocp_on_aws_tables<C: ConnectionTrait + TransactionTrait>(db: &C, schema: &str, partition: &PartitionKey, mode: WriteMode, rows: &[AttributedCostRow]) -> PipelineResult<()> {
    fn records<R>(rows: Vec<R>, build: impl Fn(&R, &PartitionKey) -> Record, partition: &PartitionKey) -> Vec<Record> {
        rows.iter().map(|row| build(row, partition)).collect()
    }

    write_group(db, schema, warehouse::DETAILED_LINE_ITEM_TABLE, partition, mode, records(detailed_line_items(rows), warehouse::detailed_line_item_record, partition)).await?;
    write_group(db, schema, warehouse::CLUSTER_TOTALS_TABLE, partition, mode, records(cluster_totals(rows), warehouse::cluster_totals_record, partition)).await?;
    write_group(db, schema, warehouse::BY_ACCOUNT_TABLE, partition, mode, records(by_account(rows), warehouse::by_account_record, partition)).await?;
    write_group(db, schema, warehouse::BY_SERVICE_TABLE, partition, mode, records(by_service(rows), warehouse::by_service_record, partition)).await?;
    write_group(db, schema, warehouse::BY_REGION_TABLE, partition, mode, records(by_region(rows), warehouse::by_region_record, partition)).await?;
    write_group(db, schema, warehouse::COMPUTE_SUMMARY_TABLE, partition, mode, records(compute_summary(rows), warehouse::compute_summary_record, partition)).await?;
    write_group(db, schema, warehouse::STORAGE_SUMMARY_TABLE, partition, mode, records(storage_summary(rows), warehouse::storage_summary_record, partition)).await?;
    write_group(db, schema, warehouse::DATABASE_SUMMARY_TABLE, partition, mode, records(database_summary(rows), warehouse::product_code_summary_record, partition)).await?;
    write_group(db, schema, warehouse::NETWORK_SUMMARY_TABLE, partition, mode, records(network_summary(rows), warehouse::product_code_summary_record, partition)).await?;
    Ok(())
}

fn record_outcome(provider: &str, source_uuid: &Uuid, started: Instant, result: &PipelineResult<()>) {
    let elapsed = started.elapsed().as_secs_f64();
    match result {
        Ok(()) => {
            PipelineMetrics::record_run_duration(&source_uuid.to_string(), elapsed);
            info!(provider, source_uuid = %source_uuid, elapsed_seconds = elapsed, state = ?RunState::Committed, "run committed");
        }
        Err(err) => {
            PipelineMetrics::record_failure(&source_uuid.to_string(), err.kind());
            warn!(provider, source_uuid = %source_uuid, elapsed_seconds = elapsed, stage = %err.stage(), kind = err.kind(), state = ?RunState::Failed, "run failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Labels;
    use chrono::NaiveDate;

    fn pod(cluster_id: &str) -> OcpPodRecord {
        OcpPodRecord {
            usage_start: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            cluster_id: cluster_id.into(),
            cluster_alias: None,
            node: "node-1".into(),
            resource_id: String::new(),
            namespace: "ns-1".into(),
            pod: "pod-1".into(),
            pod_labels: Labels::new(),
            node_labels: Labels::new(),
            namespace_labels: Labels::new(),
            pod_usage_cpu_core_seconds: 0.0,
            pod_request_cpu_core_seconds: 0.0,
            pod_limit_cpu_core_seconds: 0.0,
            pod_usage_memory_byte_seconds: 0.0,
            pod_request_memory_byte_seconds: 0.0,
            pod_limit_memory_byte_seconds: 0.0,
            node_capacity_cpu_core_seconds: 0.0,
            node_capacity_memory_byte_seconds: 0.0,
            pod_seconds: 0.0,
        }
    }

    #[test]
    fn cluster_override_replaces_every_record() {
        let mut pods = vec![pod("unknown"), pod("unknown")];
        let mut volumes: Vec<OcpVolumeRecord> = Vec::new();
        apply_cluster_override(&mut pods, &mut volumes, Some("cluster-a"), Some("alias-a"));
        assert!(pods.iter().all(|p| p.cluster_id == "cluster-a"));
        assert!(pods.iter().all(|p| p.cluster_alias.as_deref() == Some("alias-a")));
    }

    #[test]
    fn override_absent_leaves_records_untouched() {
        let mut pods = vec![pod("cluster-original")];
        let mut volumes: Vec<OcpVolumeRecord> = Vec::new();
        apply_cluster_override(&mut pods, &mut volumes, None, None);
        assert_eq!(pods[0].cluster_id, "cluster-original");
    }

    #[test]
    fn write_mode_matches_truncate_flag() {
        assert_eq!(write_mode(true), WriteMode::Truncate);
        assert_eq!(write_mode(false), WriteMode::PartitionReplace);
    }
}
