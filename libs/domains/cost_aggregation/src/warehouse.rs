//! Warehouse writer: truncate-and-bulk-load of one run's output
//! rows into the Postgres warehouse, one transaction per table.
//!
//! Grounded in `database::postgres::connector`'s transaction/retry style;
//! SeaORM has no streaming `COPY` path on top of `sqlx-postgres`, so the bulk
//! load is a single multi-row `INSERT` per table built from `sea_orm::Value`
//! bindings rather than a binary copy stream (noted in `DESIGN.md`).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, DatabaseTransaction, DbBackend, Statement, TransactionTrait, Value};
use uuid::Uuid;

use crate::error::{PipelineError, Stage};
use crate::model::{Labels, PartitionKey};
use crate::ocp_on_aws::{
    ByAccountKey, ByRegionKey, ByServiceKey, ComputeSummaryKey, DetailedLineItemRow, GroupedCostRow, ProductCodeSummaryKey, StorageSummaryKey,
};
use crate::summary::{PodDailySummary, UnallocatedSummary, VolumeDailySummary};

/// One warehouse row: column names paired with bound values, in the order
/// the target table's `INSERT` statement expects them.
pub struct Record {
    pub columns: &'static [&'static str],
    pub values: Vec<Value>,
}

/// Whether a write deletes only the incoming run's partition, or clears the
/// whole table first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    PartitionReplace,
    Truncate,
}

fn label_json(labels: &Labels) -> Value {
    Value::Json(Some(Box::new(serde_json::to_value(labels).unwrap_or(serde_json::Value::Null))))
}

fn opt_string(value: Option<&str>) -> Value {
    Value::String(value.map(|v| Box::new(v.to_string())))
}

/// Writes one table's rows inside a fresh transaction, deleting the target
/// run's partition (or truncating) first, then checking the post-commit row
/// count matches what was inserted.
pub async fn write_table<C: ConnectionTrait + TransactionTrait>(
    db: &C,
    schema: &str,
    table: &str,
    partition: &PartitionKey,
    mode: WriteMode,
    records: Vec<Record>,
) -> Result<(), PipelineError> {
    let txn = db.begin().await.map_err(|err| PipelineError::WarehouseConflict {
        provider: partition.provider_kind.to_string(),
        stage: Stage::Writing,
        message: format!("failed to open transaction for {schema}.{table}: {err}"),
    })?;

    delete_partition(&txn, schema, table, partition, mode).await?;

    let input_len = records.len();
    if !records.is_empty() {
        bulk_insert(&txn, schema, table, records).await?;
    }

    let actual_count = count_partition(&txn, schema, table, partition).await?;
    if actual_count as usize != input_len {
        return Err(PipelineError::WarehouseConflict {
            provider: partition.provider_kind.to_string(),
            stage: Stage::Writing,
            message: format!("{schema}.{table}: expected {input_len} rows after commit, found {actual_count}"),
        });
    }

    txn.commit().await.map_err(|err| PipelineError::WarehouseConflict {
        provider: partition.provider_kind.to_string(),
        stage: Stage::Writing,
        message: format!("commit failed for {schema}.{table}: {err}"),
    })?;

    Ok(())
}

async fn delete_partition(txn: &DatabaseTransaction, schema: &str, table: &str, partition: &PartitionKey, mode: WriteMode) -> Result<(), PipelineError> {
    let sql = match mode {
        WriteMode::Truncate => format!("TRUNCATE TABLE {schema}.{table}"),
        WriteMode::PartitionReplace => format!("DELETE FROM {schema}.{table} WHERE source_uuid = $1 AND year = $2 AND month = $3"),
    };
    let statement = match mode {
        WriteMode::Truncate => Statement::from_string(DbBackend::Postgres, sql),
        WriteMode::PartitionReplace => Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [Value::Uuid(Some(Box::new(partition.source_uuid))), Value::Int(Some(partition.year)), Value::Unsigned(Some(partition.month))],
        ),
    };
    txn.execute(statement).await.map_err(|err| PipelineError::WarehouseConflict {
        provider: partition.provider_kind.to_string(),
        stage: Stage::Writing,
        message: format!("failed clearing {schema}.{table}: {err}"),
    })?;
    Ok(())
}

async fn count_partition(txn: &DatabaseTransaction, schema: &str, table: &str, partition: &PartitionKey) -> Result<i64, PipelineError> {
    let statement = Statement::from_sql_and_values(
        DbBackend::Postgres,
        format!("SELECT count(*) AS count FROM {schema}.{table} WHERE source_uuid = $1 AND year = $2 AND month = $3"),
        [Value::Uuid(Some(Box::new(partition.source_uuid))), Value::Int(Some(partition.year)), Value::Unsigned(Some(partition.month))],
    );
    let row = txn.query_one(statement).await.map_err(|err| PipelineError::WarehouseConflict {
        provider: partition.provider_kind.to_string(),
        stage: Stage::Writing,
        message: format!("row count query failed for {schema}.{table}: {err}"),
    })?;
    match row {
        Some(row) => row.try_get("", "count").map_err(|err| PipelineError::WarehouseConflict {
            provider: partition.provider_kind.to_string(),
            stage: Stage::Writing,
            message: format!("row count decode failed for {schema}.{table}: {err}"),
        }),
        None => Ok(0),
    }
}

/// Postgres's wire protocol caps a single statement at 65535 bind
/// parameters, so one run's rows are chunked into batches that stay under
/// that limit regardless of how many columns the target table has.
const MAX_BIND_PARAMETERS: usize = 65_535;

fn rows_per_batch(placeholders_per_row: usize) -> usize {
    (MAX_BIND_PARAMETERS / placeholders_per_row).max(1)
}

/// Builds one `INSERT ... VALUES (...), (...), ...` statement for `batch`,
/// numbering placeholders from 1 regardless of any earlier batch.
fn build_insert_statement(schema: &str, table: &str, batch: &[Record]) -> Statement {
    let placeholders_per_row = batch[0].columns.len();
    let columns = batch[0].columns;
    let mut sql = format!("INSERT INTO {schema}.{table} ({}) VALUES ", columns.join(", "));
    let mut values = Vec::with_capacity(batch.len() * placeholders_per_row);
    for (row_index, record) in batch.iter().enumerate() {
        if row_index > 0 {
            sql.push(',');
        }
        sql.push('(');
        for col_index in 0..placeholders_per_row {
            if col_index > 0 {
                sql.push(',');
            }
            sql.push_str(&format!("${}", row_index * placeholders_per_row + col_index + 1));
        }
        sql.push(')');
        values.extend(record.values.iter().cloned());
    }
    Statement::from_sql_and_values(DbBackend::Postgres, sql, values)
}

async fn bulk_insert(txn: &DatabaseTransaction, schema: &str, table: &str, records: Vec<Record>) -> Result<(), PipelineError> {
    let placeholders_per_row = records[0].columns.len();
    for batch in records.chunks(rows_per_batch(placeholders_per_row)) {
        let statement = build_insert_statement(schema, table, batch);
        txn.execute(statement).await.map_err(|err| PipelineError::WarehouseConflict {
            provider: String::new(),
            stage: Stage::Writing,
            message: format!("bulk insert into {schema}.{table} failed: {err}"),
        })?;
    }
    Ok(())
}

fn partition_values(partition: &PartitionKey) -> (Value, Value, Value) {
    (Value::Uuid(Some(Box::new(partition.source_uuid))), Value::Int(Some(partition.year)), Value::Unsigned(Some(partition.month)))
}

pub const OCP_SUMMARY_TABLE: &str = "ocp_usage_line_item_daily_summary";

pub const DETAILED_LINE_ITEM_TABLE: &str = "ocp_aws_cost_line_item_daily";
pub const CLUSTER_TOTALS_TABLE: &str = "ocp_aws_cost_daily_summary";
pub const BY_ACCOUNT_TABLE: &str = "ocp_aws_cost_by_account_daily_summary";
pub const BY_SERVICE_TABLE: &str = "ocp_aws_cost_by_service_daily_summary";
pub const BY_REGION_TABLE: &str = "ocp_aws_cost_by_region_daily_summary";
pub const COMPUTE_SUMMARY_TABLE: &str = "ocp_aws_compute_summary";
pub const STORAGE_SUMMARY_TABLE: &str = "ocp_aws_storage_summary";
pub const DATABASE_SUMMARY_TABLE: &str = "ocp_aws_database_summary";
pub const NETWORK_SUMMARY_TABLE: &str = "ocp_aws_network_summary";

/// Shared by `pod_summary_record`, `volume_summary_record` and
/// `unallocated_record`: the three row kinds all land in
/// [`OCP_SUMMARY_TABLE`], discriminated by `data_source`, so a single run's
/// output must present one uniform column list for `bulk_insert` to build
/// one `INSERT` from.
const OCP_SUMMARY_COLUMNS: &[&str] = &[
    "uuid",
    "source_uuid",
    "year",
    "month",
    "usage_start",
    "cluster_id",
    "cluster_alias",
    "data_source",
    "namespace",
    "node",
    "pod",
    "persistentvolumeclaim",
    "persistentvolume",
    "storageclass",
    "pod_usage_cpu_core_hours",
    "pod_request_cpu_core_hours",
    "pod_effective_usage_cpu_core_hours",
    "pod_limit_cpu_core_hours",
    "pod_usage_memory_gigabyte_hours",
    "pod_request_memory_gigabyte_hours",
    "pod_effective_usage_memory_gigabyte_hours",
    "pod_limit_memory_gigabyte_hours",
    "node_capacity_cpu_core_hours",
    "node_capacity_memory_gigabyte_hours",
    "cluster_capacity_cpu_core_hours",
    "cluster_capacity_memory_gigabyte_hours",
    "persistentvolumeclaim_capacity_gigabyte_months",
    "persistentvolumeclaim_usage_gigabyte_months",
    "volume_request_storage_gigabyte_months",
    "pod_labels",
    "volume_labels",
    "all_labels",
];

pub fn pod_summary_record(row: &PodDailySummary, partition: &PartitionKey) -> Record {
    let (source_uuid, year, month) = partition_values(partition);
    Record {
        columns: OCP_SUMMARY_COLUMNS,
        values: vec![
            Value::Uuid(Some(Box::new(Uuid::new_v4()))),
            source_uuid,
            year,
            month,
            date_value(row.usage_start),
            Value::String(Some(Box::new(row.cluster_id.clone()))),
            opt_string(row.cluster_alias.as_deref()),
            Value::String(Some(Box::new("Pod".to_string()))),
            Value::String(Some(Box::new(row.namespace.clone()))),
            Value::String(Some(Box::new(row.node.clone()))),
            Value::String(None),
            Value::String(None),
            Value::String(None),
            Value::String(None),
            decimal_value(row.pod_usage_cpu_core_hours),
            decimal_value(row.pod_request_cpu_core_hours),
            decimal_value(row.pod_effective_usage_cpu_core_hours),
            decimal_value(row.pod_limit_cpu_core_hours),
            decimal_value(row.pod_usage_memory_gigabyte_hours),
            decimal_value(row.pod_request_memory_gigabyte_hours),
            decimal_value(row.pod_effective_usage_memory_gigabyte_hours),
            decimal_value(row.pod_limit_memory_gigabyte_hours),
            decimal_value(row.node_capacity_cpu_core_hours),
            decimal_value(row.node_capacity_memory_gigabyte_hours),
            decimal_value(row.cluster_capacity_cpu_core_hours),
            decimal_value(row.cluster_capacity_memory_gigabyte_hours),
            Value::Decimal(None),
            Value::Decimal(None),
            Value::Decimal(None),
            label_json(&row.pod_labels),
            Value::Json(None),
            Value::Json(None),
        ],
    }
}

pub fn volume_summary_record(row: &VolumeDailySummary, partition: &PartitionKey) -> Record {
    let (source_uuid, year, month) = partition_values(partition);
    Record {
        columns: OCP_SUMMARY_COLUMNS,
        values: vec![
            Value::Uuid(Some(Box::new(Uuid::new_v4()))),
            source_uuid,
            year,
            month,
            date_value(row.usage_start),
            Value::String(Some(Box::new(row.cluster_id.clone()))),
            opt_string(row.cluster_alias.as_deref()),
            Value::String(Some(Box::new("Storage".to_string()))),
            Value::String(Some(Box::new(row.namespace.clone()))),
            Value::String(Some(Box::new(row.node.clone()))),
            Value::String(None),
            Value::String(Some(Box::new(row.persistentvolumeclaim.clone()))),
            Value::String(Some(Box::new(row.persistentvolume.clone()))),
            Value::String(Some(Box::new(row.storageclass.clone()))),
            Value::Decimal(None),
            Value::Decimal(None),
            Value::Decimal(None),
            Value::Decimal(None),
            Value::Decimal(None),
            Value::Decimal(None),
            Value::Decimal(None),
            Value::Decimal(None),
            Value::Decimal(None),
            Value::Decimal(None),
            Value::Decimal(None),
            Value::Decimal(None),
            decimal_value(row.persistentvolumeclaim_capacity_gigabyte_months),
            decimal_value(row.persistentvolumeclaim_usage_gigabyte_months),
            decimal_value(row.volume_request_storage_gigabyte_months),
            Value::Json(None),
            label_json(&row.volume_labels),
            label_json(&row.all_labels),
        ],
    }
}

pub fn unallocated_record(row: &UnallocatedSummary, partition: &PartitionKey) -> Record {
    let (source_uuid, year, month) = partition_values(partition);
    let is_storage = matches!(row.data_source, crate::model::DataSource::Storage);
    Record {
        columns: OCP_SUMMARY_COLUMNS,
        values: vec![
            Value::Uuid(Some(Box::new(Uuid::new_v4()))),
            source_uuid,
            year,
            month,
            date_value(row.usage_start),
            Value::String(Some(Box::new(row.cluster_id.clone()))),
            opt_string(row.cluster_alias.as_deref()),
            Value::String(Some(Box::new(row.data_source.to_string()))),
            Value::String(Some(Box::new(row.namespace.to_string()))),
            opt_string(row.node.as_deref()),
            Value::String(None),
            Value::String(None),
            Value::String(None),
            Value::String(None),
            if is_storage { Value::Decimal(None) } else { decimal_value(row.cpu_core_hours) },
            Value::Decimal(None),
            Value::Decimal(None),
            Value::Decimal(None),
            if is_storage { Value::Decimal(None) } else { decimal_value(row.memory_gigabyte_hours) },
            Value::Decimal(None),
            Value::Decimal(None),
            Value::Decimal(None),
            Value::Decimal(None),
            Value::Decimal(None),
            Value::Decimal(None),
            Value::Decimal(None),
            if is_storage { decimal_value(row.capacity_gigabyte_months) } else { Value::Decimal(None) },
            Value::Decimal(None),
            Value::Decimal(None),
            Value::Json(None),
            Value::Json(None),
            Value::Json(None),
        ],
    }
}

const LINE_ITEM_COLUMNS: &[&str] = &[
    "uuid",
    "source_uuid",
    "year",
    "month",
    "usage_start",
    "cluster_id",
    "cluster_alias",
    "data_source",
    "namespace",
    "node",
    "persistentvolumeclaim",
    "persistentvolume",
    "storageclass",
    "resource_id",
    "product_code",
    "instance_type",
    "usage_account_id",
    "availability_zone",
    "region",
    "unit",
    "data_transfer_direction",
    "usage_amount",
    "infrastructure_data_in_gigabytes",
    "infrastructure_data_out_gigabytes",
    "currency_code",
    "tags",
    "resource_id_matched",
    "tag_matched",
    "unblended_cost",
    "markup_cost",
    "blended_cost",
    "markup_cost_blended",
    "savingsplan_effective_cost",
    "markup_cost_savingsplan",
    "calculated_amortized_cost",
    "markup_cost_amortized",
];

pub fn detailed_line_item_record(row: &DetailedLineItemRow, partition: &PartitionKey) -> Record {
    let (source_uuid, year, month) = partition_values(partition);
    let data_source = match row.key.data_source {
        crate::ocp_on_aws::DataSourceKey::Pod => "Pod",
        crate::ocp_on_aws::DataSourceKey::Storage => "Storage",
        crate::ocp_on_aws::DataSourceKey::Node => "Node",
    };
    let direction = row.key.data_transfer_direction.map(|d| match d {
        crate::ocp_on_aws::DataTransferDirectionKey::In => "IN",
        crate::ocp_on_aws::DataTransferDirectionKey::Out => "OUT",
    });
    Record {
        columns: LINE_ITEM_COLUMNS,
        values: vec![
            Value::Uuid(Some(Box::new(Uuid::new_v4()))),
            source_uuid,
            year,
            month,
            date_value(row.key.usage_start),
            Value::String(Some(Box::new(row.cluster_id.clone()))),
            opt_string(row.cluster_alias.as_deref()),
            Value::String(Some(Box::new(data_source.to_string()))),
            Value::String(Some(Box::new(row.key.namespace.clone()))),
            opt_string(row.key.node.as_deref()),
            opt_string(row.key.persistentvolumeclaim.as_deref()),
            opt_string(row.key.persistentvolume.as_deref()),
            opt_string(row.key.storageclass.as_deref()),
            opt_string(row.key.resource_id.as_deref()),
            opt_string(row.key.product_code.as_deref()),
            opt_string(row.key.instance_type.as_deref()),
            opt_string(row.key.usage_account_id.as_deref()),
            opt_string(row.key.availability_zone.as_deref()),
            opt_string(row.key.region.as_deref()),
            opt_string(row.key.unit.as_deref()),
            opt_string(direction),
            decimal_value(row.usage_amount),
            decimal_value(row.infrastructure_data_in_gigabytes),
            decimal_value(row.infrastructure_data_out_gigabytes),
            opt_string(row.currency_code.as_deref()),
            label_json(&row.tags),
            Value::Bool(Some(row.resource_id_matched)),
            Value::String(Some(Box::new(row.tag_matched.clone()))),
            decimal_value(row.cost.unblended_cost),
            decimal_value(row.cost.markup_cost),
            decimal_value(row.cost.blended_cost),
            decimal_value(row.cost.markup_cost_blended),
            decimal_value(row.cost.savingsplan_effective_cost),
            decimal_value(row.cost.markup_cost_savingsplan),
            decimal_value(row.cost.calculated_amortized_cost),
            decimal_value(row.cost.markup_cost_amortized),
        ],
    }
}

macro_rules! grouped_cost_columns {
    ($($descriptive:expr),* $(,)?) => {
        &[$($descriptive,)* "cluster_id", "cluster_alias", "currency_code",
          "unblended_cost", "markup_cost", "blended_cost", "markup_cost_blended",
          "savingsplan_effective_cost", "markup_cost_savingsplan",
          "calculated_amortized_cost", "markup_cost_amortized"]
    };
}

fn cost_values(row: &crate::summary::CostShare) -> Vec<Value> {
    vec![
        decimal_value(row.unblended_cost),
        decimal_value(row.markup_cost),
        decimal_value(row.blended_cost),
        decimal_value(row.markup_cost_blended),
        decimal_value(row.savingsplan_effective_cost),
        decimal_value(row.markup_cost_savingsplan),
        decimal_value(row.calculated_amortized_cost),
        decimal_value(row.markup_cost_amortized),
    ]
}

const CLUSTER_TOTALS_COLUMNS: &[&str] = &[
    "uuid",
    "source_uuid",
    "year",
    "month",
    "usage_start",
    "cluster_id",
    "cluster_alias",
    "currency_code",
    "unblended_cost",
    "markup_cost",
    "blended_cost",
    "markup_cost_blended",
    "savingsplan_effective_cost",
    "markup_cost_savingsplan",
    "calculated_amortized_cost",
    "markup_cost_amortized",
];

pub fn cluster_totals_record(row: &GroupedCostRow<NaiveDate>, partition: &PartitionKey) -> Record {
    let (source_uuid, year, month) = partition_values(partition);
    let mut values = vec![
        Value::Uuid(Some(Box::new(Uuid::new_v4()))),
        source_uuid,
        year,
        month,
        date_value(row.key),
        Value::String(Some(Box::new(row.cluster_id.clone()))),
        opt_string(row.cluster_alias.as_deref()),
        opt_string(row.currency_code.as_deref()),
    ];
    values.extend(cost_values(&row.cost));
    Record {
        columns: CLUSTER_TOTALS_COLUMNS,
        values,
    }
}

const BY_ACCOUNT_COLUMNS: &[&str] = grouped_cost_columns!("uuid", "source_uuid", "year", "month", "usage_start", "usage_account_id", "account_alias_id");

pub fn by_account_record(row: &GroupedCostRow<ByAccountKey>, partition: &PartitionKey) -> Record {
    let (source_uuid, year, month) = partition_values(partition);
    let mut values = vec![
        Value::Uuid(Some(Box::new(Uuid::new_v4()))),
        source_uuid,
        year,
        month,
        date_value(row.key.usage_start),
        opt_string(row.key.usage_account_id.as_deref()),
        Value::String(None), // account_alias_id: not carried by the ingested CUR columns
        Value::String(Some(Box::new(row.cluster_id.clone()))),
        opt_string(row.cluster_alias.as_deref()),
        opt_string(row.currency_code.as_deref()),
    ];
    values.extend(cost_values(&row.cost));
    Record {
        columns: BY_ACCOUNT_COLUMNS,
        values,
    }
}

const BY_SERVICE_COLUMNS: &[&str] =
    grouped_cost_columns!("uuid", "source_uuid", "year", "month", "usage_start", "usage_account_id", "account_alias_id", "product_code", "product_family");

pub fn by_service_record(row: &GroupedCostRow<ByServiceKey>, partition: &PartitionKey) -> Record {
    let (source_uuid, year, month) = partition_values(partition);
    let mut values = vec![
        Value::Uuid(Some(Box::new(Uuid::new_v4()))),
        source_uuid,
        year,
        month,
        date_value(row.key.usage_start),
        opt_string(row.key.usage_account_id.as_deref()),
        Value::String(None),
        opt_string(row.key.product_code.as_deref()),
        opt_string(row.key.product_family.as_deref()),
        Value::String(Some(Box::new(row.cluster_id.clone()))),
        opt_string(row.cluster_alias.as_deref()),
        opt_string(row.currency_code.as_deref()),
    ];
    values.extend(cost_values(&row.cost));
    Record {
        columns: BY_SERVICE_COLUMNS,
        values,
    }
}

const BY_REGION_COLUMNS: &[&str] =
    grouped_cost_columns!("uuid", "source_uuid", "year", "month", "usage_start", "usage_account_id", "account_alias_id", "region", "availability_zone");

pub fn by_region_record(row: &GroupedCostRow<ByRegionKey>, partition: &PartitionKey) -> Record {
    let (source_uuid, year, month) = partition_values(partition);
    let mut values = vec![
        Value::Uuid(Some(Box::new(Uuid::new_v4()))),
        source_uuid,
        year,
        month,
        date_value(row.key.usage_start),
        opt_string(row.key.usage_account_id.as_deref()),
        Value::String(None),
        opt_string(row.key.region.as_deref()),
        opt_string(row.key.availability_zone.as_deref()),
        Value::String(Some(Box::new(row.cluster_id.clone()))),
        opt_string(row.cluster_alias.as_deref()),
        opt_string(row.currency_code.as_deref()),
    ];
    values.extend(cost_values(&row.cost));
    Record {
        columns: BY_REGION_COLUMNS,
        values,
    }
}

const COMPUTE_SUMMARY_COLUMNS: &[&str] =
    grouped_cost_columns!("uuid", "source_uuid", "year", "month", "usage_start", "usage_account_id", "account_alias_id", "instance_type", "resource_id");

pub fn compute_summary_record(row: &GroupedCostRow<ComputeSummaryKey>, partition: &PartitionKey) -> Record {
    let (source_uuid, year, month) = partition_values(partition);
    let mut values = vec![
        Value::Uuid(Some(Box::new(Uuid::new_v4()))),
        source_uuid,
        year,
        month,
        date_value(row.key.usage_start),
        opt_string(row.key.usage_account_id.as_deref()),
        Value::String(None),
        opt_string(row.key.instance_type.as_deref()),
        opt_string(row.key.resource_id.as_deref()),
        Value::String(Some(Box::new(row.cluster_id.clone()))),
        opt_string(row.cluster_alias.as_deref()),
        opt_string(row.currency_code.as_deref()),
    ];
    values.extend(cost_values(&row.cost));
    Record {
        columns: COMPUTE_SUMMARY_COLUMNS,
        values,
    }
}

const STORAGE_SUMMARY_COLUMNS: &[&str] =
    grouped_cost_columns!("uuid", "source_uuid", "year", "month", "usage_start", "usage_account_id", "account_alias_id", "product_family");

pub fn storage_summary_record(row: &GroupedCostRow<StorageSummaryKey>, partition: &PartitionKey) -> Record {
    let (source_uuid, year, month) = partition_values(partition);
    let mut values = vec![
        Value::Uuid(Some(Box::new(Uuid::new_v4()))),
        source_uuid,
        year,
        month,
        date_value(row.key.usage_start),
        opt_string(row.key.usage_account_id.as_deref()),
        Value::String(None),
        opt_string(row.key.product_family.as_deref()),
        Value::String(Some(Box::new(row.cluster_id.clone()))),
        opt_string(row.cluster_alias.as_deref()),
        opt_string(row.currency_code.as_deref()),
    ];
    values.extend(cost_values(&row.cost));
    Record {
        columns: STORAGE_SUMMARY_COLUMNS,
        values,
    }
}

const PRODUCT_CODE_SUMMARY_COLUMNS: &[&str] =
    grouped_cost_columns!("uuid", "source_uuid", "year", "month", "usage_start", "usage_account_id", "account_alias_id", "product_code");

pub fn product_code_summary_record(row: &GroupedCostRow<ProductCodeSummaryKey>, partition: &PartitionKey) -> Record {
    let (source_uuid, year, month) = partition_values(partition);
    let mut values = vec![
        Value::Uuid(Some(Box::new(Uuid::new_v4()))),
        source_uuid,
        year,
        month,
        date_value(row.key.usage_start),
        opt_string(row.key.usage_account_id.as_deref()),
        Value::String(None),
        opt_string(row.key.product_code.as_deref()),
        Value::String(Some(Box::new(row.cluster_id.clone()))),
        opt_string(row.cluster_alias.as_deref()),
        opt_string(row.currency_code.as_deref()),
    ];
    values.extend(cost_values(&row.cost));
    Record {
        columns: PRODUCT_CODE_SUMMARY_COLUMNS,
        values,
    }
}

fn date_value(date: NaiveDate) -> Value {
    Value::ChronoDate(Some(Box::new(date)))
}

fn decimal_value(value: Decimal) -> Value {
    Value::Decimal(Some(Box::new(value)))
}

#[allow(dead_code)]
fn stage() -> Stage {
    Stage::Writing
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use uuid::Uuid as UuidType;

    fn partition() -> PartitionKey {
        PartitionKey {
            org_id: "org-1".into(),
            provider_kind: crate::model::ProviderKind::Ocp,
            source_uuid: UuidType::new_v4(),
            year: 2026,
            month: 7,
        }
    }

    #[test]
    fn pod_summary_record_has_matching_column_and_value_counts() {
        let row = PodDailySummary {
            usage_start: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            cluster_id: "cluster-a".into(),
            cluster_alias: None,
            namespace: "ns-1".into(),
            node: "node-1".into(),
            resource_id: "i-abc".into(),
            pod_usage_cpu_core_hours: Decimal::ZERO,
            pod_request_cpu_core_hours: Decimal::ZERO,
            pod_effective_usage_cpu_core_hours: Decimal::ZERO,
            pod_limit_cpu_core_hours: Decimal::ZERO,
            pod_usage_memory_gigabyte_hours: Decimal::ZERO,
            pod_request_memory_gigabyte_hours: Decimal::ZERO,
            pod_effective_usage_memory_gigabyte_hours: Decimal::ZERO,
            pod_limit_memory_gigabyte_hours: Decimal::ZERO,
            node_capacity_cpu_core_hours: Decimal::ZERO,
            node_capacity_memory_gigabyte_hours: Decimal::ZERO,
            cluster_capacity_cpu_core_hours: Decimal::ZERO,
            cluster_capacity_memory_gigabyte_hours: Decimal::ZERO,
            pod_labels: HashMap::new(),
        };
        let record = pod_summary_record(&row, &partition());
        assert_eq!(record.columns.len(), record.values.len());
    }

    fn dummy_record() -> Record {
        Record {
            columns: &["a", "b", "c"],
            values: vec![Value::Int(Some(1)), Value::Int(Some(2)), Value::Int(Some(3))],
        }
    }

    #[test]
    fn rows_per_batch_stays_under_the_bind_parameter_cap() {
        let batch_size = rows_per_batch(3);
        assert!(batch_size * 3 <= MAX_BIND_PARAMETERS);
        assert_eq!(batch_size, MAX_BIND_PARAMETERS / 3);
    }

    #[test]
    fn rows_per_batch_never_returns_zero_for_wide_tables() {
        assert_eq!(rows_per_batch(MAX_BIND_PARAMETERS * 2), 1);
    }

    #[test]
    fn build_insert_statement_numbers_placeholders_from_one_per_batch() {
        let records = vec![dummy_record(), dummy_record()];
        let statement = build_insert_statement("public", "t", &records);
        assert!(statement.sql.contains("($1,$2,$3),($4,$5,$6)"));
    }
}
