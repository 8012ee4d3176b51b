//! Converts Arrow `RecordBatch`es read from Parquet into the domain records
//! of `model.rs`. Kept separate from `reader` so the aggregator, matcher and
//! attributor never depend on Arrow column layout directly.

use std::collections::HashMap;

use arrow::array::{Array, Float64Array, StringArray};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{PipelineError, Stage};
use crate::model::{AwsLineItem, Labels, OcpPodRecord, OcpVolumeRecord};

fn column<'a>(batch: &'a RecordBatch, name: &str, provider: &str) -> Result<&'a arrow::array::ArrayRef, PipelineError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| PipelineError::InputSchema {
            provider: provider.to_string(),
            stage: Stage::Reading,
            message: format!("missing required column `{name}`"),
        })
}

fn string_at(col: &arrow::array::ArrayRef, row: usize) -> String {
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|arr| if arr.is_null(row) { String::new() } else { arr.value(row).to_string() })
        .unwrap_or_default()
}

fn string_opt_at(col: &arrow::array::ArrayRef, row: usize) -> Option<String> {
    col.as_any().downcast_ref::<StringArray>().and_then(|arr| {
        if arr.is_null(row) {
            None
        } else {
            Some(arr.value(row).to_string())
        }
    })
}

fn f64_at(col: &arrow::array::ArrayRef, row: usize) -> f64 {
    col.as_any()
        .downcast_ref::<Float64Array>()
        .map(|arr| if arr.is_null(row) { 0.0 } else { arr.value(row) })
        .unwrap_or(0.0)
}

fn decimal_at(col: &arrow::array::ArrayRef, row: usize) -> Decimal {
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|arr| {
            if arr.is_null(row) {
                Decimal::ZERO
            } else {
                Decimal::from_str(arr.value(row)).unwrap_or(Decimal::ZERO)
            }
        })
        .unwrap_or(Decimal::ZERO)
}

fn json_labels_at(col: &arrow::array::ArrayRef, row: usize) -> Labels {
    let raw = string_at(col, row);
    if raw.is_empty() {
        return Labels::new();
    }
    serde_json::from_str(&raw).unwrap_or_default()
}

fn date_at(col: &arrow::array::ArrayRef, row: usize, provider: &str) -> Result<NaiveDate, PipelineError> {
    let raw = string_at(col, row);
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .or_else(|_| chrono::DateTime::parse_from_rfc3339(&raw).map(|dt| dt.date_naive()))
        .map_err(|_| PipelineError::InputSchema {
            provider: provider.to_string(),
            stage: Stage::Reading,
            message: format!("unparseable usage_start value `{raw}`"),
        })
}

/// Decodes every row of `batch` into `OcpPodRecord`s. Negative usage columns
/// are rejected here so the aggregator never has to re-validate.
pub fn decode_ocp_pods(batch: &RecordBatch, provider: &str) -> Result<Vec<OcpPodRecord>, PipelineError> {
    let usage_start = column(batch, "usage_start", provider)?;
    let cluster_id = column(batch, "cluster_id", provider)?;
    let cluster_alias = column(batch, "cluster_alias", provider)?;
    let node = column(batch, "node", provider)?;
    let resource_id = column(batch, "resource_id", provider)?;
    let namespace = column(batch, "namespace", provider)?;
    let pod = column(batch, "pod", provider)?;
    let pod_labels = column(batch, "pod_labels", provider)?;
    let node_labels = column(batch, "node_labels", provider)?;
    let namespace_labels = column(batch, "namespace_labels", provider)?;
    let pod_usage_cpu = column(batch, "pod_usage_cpu_core_seconds", provider)?;
    let pod_request_cpu = column(batch, "pod_request_cpu_core_seconds", provider)?;
    let pod_limit_cpu = column(batch, "pod_limit_cpu_core_seconds", provider)?;
    let pod_usage_mem = column(batch, "pod_usage_memory_byte_seconds", provider)?;
    let pod_request_mem = column(batch, "pod_request_memory_byte_seconds", provider)?;
    let pod_limit_mem = column(batch, "pod_limit_memory_byte_seconds", provider)?;
    let node_cap_cpu = column(batch, "node_capacity_cpu_core_seconds", provider)?;
    let node_cap_mem = column(batch, "node_capacity_memory_byte_seconds", provider)?;
    let pod_seconds = column(batch, "pod_seconds", provider)?;

    let mut records = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let record = OcpPodRecord {
            usage_start: date_at(usage_start, row, provider)?,
            cluster_id: string_at(cluster_id, row),
            cluster_alias: string_opt_at(cluster_alias, row),
            node: string_at(node, row),
            resource_id: string_at(resource_id, row),
            namespace: string_at(namespace, row),
            pod: string_at(pod, row),
            pod_labels: json_labels_at(pod_labels, row),
            node_labels: json_labels_at(node_labels, row),
            namespace_labels: json_labels_at(namespace_labels, row),
            pod_usage_cpu_core_seconds: f64_at(pod_usage_cpu, row),
            pod_request_cpu_core_seconds: f64_at(pod_request_cpu, row),
            pod_limit_cpu_core_seconds: f64_at(pod_limit_cpu, row),
            pod_usage_memory_byte_seconds: f64_at(pod_usage_mem, row),
            pod_request_memory_byte_seconds: f64_at(pod_request_mem, row),
            pod_limit_memory_byte_seconds: f64_at(pod_limit_mem, row),
            node_capacity_cpu_core_seconds: f64_at(node_cap_cpu, row),
            node_capacity_memory_byte_seconds: f64_at(node_cap_mem, row),
            pod_seconds: f64_at(pod_seconds, row),
        };

        if record.pod_usage_cpu_core_seconds < 0.0
            || record.pod_request_cpu_core_seconds < 0.0
            || record.pod_limit_cpu_core_seconds < 0.0
            || record.pod_usage_memory_byte_seconds < 0.0
            || record.pod_request_memory_byte_seconds < 0.0
            || record.pod_limit_memory_byte_seconds < 0.0
            || record.pod_seconds < 0.0
        {
            return Err(PipelineError::AggregationArithmetic {
                provider: provider.to_string(),
                stage: Stage::Aggregating,
                message: format!("negative usage metric on pod {} in namespace {}", record.pod, record.namespace),
            });
        }

        records.push(record);
    }
    Ok(records)
}

/// Decodes every row of `batch` into `OcpVolumeRecord`s.
pub fn decode_ocp_volumes(batch: &RecordBatch, provider: &str) -> Result<Vec<OcpVolumeRecord>, PipelineError> {
    let usage_start = column(batch, "usage_start", provider)?;
    let cluster_id = column(batch, "cluster_id", provider)?;
    let cluster_alias = column(batch, "cluster_alias", provider)?;
    let namespace = column(batch, "namespace", provider)?;
    let node = column(batch, "node", provider)?;
    let pvc = column(batch, "persistentvolumeclaim", provider)?;
    let pv = column(batch, "persistentvolume", provider)?;
    let storageclass = column(batch, "storageclass", provider)?;
    let csi_handle = column(batch, "csi_volume_handle", provider)?;
    let volume_labels = column(batch, "volume_labels", provider)?;
    let pod_labels = column(batch, "pod_labels", provider)?;
    let namespace_labels = column(batch, "namespace_labels", provider)?;
    let capacity_bytes = column(batch, "persistentvolumeclaim_capacity_bytes", provider)?;
    let usage_byte_seconds = column(batch, "persistentvolumeclaim_usage_byte_seconds", provider)?;
    let request_byte_seconds = column(batch, "volume_request_storage_byte_seconds", provider)?;

    let mut records = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let record = OcpVolumeRecord {
            usage_start: date_at(usage_start, row, provider)?,
            cluster_id: string_at(cluster_id, row),
            cluster_alias: string_opt_at(cluster_alias, row),
            namespace: string_at(namespace, row),
            node: string_at(node, row),
            persistentvolumeclaim: string_at(pvc, row),
            persistentvolume: string_at(pv, row),
            storageclass: string_at(storageclass, row),
            csi_volume_handle: string_at(csi_handle, row),
            volume_labels: json_labels_at(volume_labels, row),
            pod_labels: json_labels_at(pod_labels, row),
            namespace_labels: json_labels_at(namespace_labels, row),
            persistentvolumeclaim_capacity_bytes: f64_at(capacity_bytes, row),
            persistentvolumeclaim_usage_byte_seconds: f64_at(usage_byte_seconds, row),
            volume_request_storage_byte_seconds: f64_at(request_byte_seconds, row),
        };

        if record.persistentvolumeclaim_capacity_bytes < 0.0
            || record.persistentvolumeclaim_usage_byte_seconds < 0.0
            || record.volume_request_storage_byte_seconds < 0.0
        {
            return Err(PipelineError::AggregationArithmetic {
                provider: provider.to_string(),
                stage: Stage::Aggregating,
                message: format!("negative usage metric on volume {}", record.persistentvolume),
            });
        }

        records.push(record);
    }
    Ok(records)
}

/// Decodes every row of `batch` into `AwsLineItem`s. `resourcetags` and
/// `costcategory` are JSON-encoded string maps in the source Parquet.
pub fn decode_aws_line_items(batch: &RecordBatch, provider: &str) -> Result<Vec<AwsLineItem>, PipelineError> {
    let usage_start = column(batch, "usage_start", provider)?;
    let resourceid = column(batch, "lineitem_resourceid", provider)?;
    let productcode = column(batch, "lineitem_productcode", provider)?;
    let productfamily = column(batch, "product_productfamily", provider)?;
    let productname = column(batch, "product_productname", provider)?;
    let instancetype = column(batch, "product_instancetype", provider)?;
    let region = column(batch, "product_region", provider)?;
    let usagetype = column(batch, "lineitem_usagetype", provider)?;
    let operation = column(batch, "lineitem_operation", provider)?;
    let usageamount = column(batch, "lineitem_usageamount", provider)?;
    let unblendedcost = column(batch, "lineitem_unblendedcost", provider)?;
    let unblendedrate = column(batch, "lineitem_unblendedrate", provider)?;
    let blendedcost = column(batch, "lineitem_blendedcost", provider)?;
    let lineitemtype = column(batch, "lineitem_lineitemtype", provider)?;
    let savingsplan_cost = column(batch, "savingsplan_savingsplaneffectivecost", provider)?;
    let billingentity = column(batch, "bill_billingentity", provider)?;
    let usageaccountid = column(batch, "lineitem_usageaccountid", provider)?;
    let az = column(batch, "lineitem_availabilityzone", provider)?;
    let currencycode = column(batch, "lineitem_currencycode", provider)?;
    let pricingunit = column(batch, "pricing_unit", provider)?;
    let resourcetags = column(batch, "resourcetags", provider)?;
    let costcategory = column(batch, "costcategory", provider)?;

    let mut records = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let tags: HashMap<String, String> = json_labels_at(resourcetags, row);
        let category: HashMap<String, String> = json_labels_at(costcategory, row);

        records.push(AwsLineItem {
            usage_start: date_at(usage_start, row, provider)?,
            lineitem_resourceid: string_at(resourceid, row),
            lineitem_productcode: string_at(productcode, row),
            product_productfamily: string_at(productfamily, row),
            product_productname: string_at(productname, row),
            product_instancetype: string_opt_at(instancetype, row),
            product_region: string_opt_at(region, row),
            lineitem_usagetype: string_at(usagetype, row),
            lineitem_operation: string_at(operation, row),
            lineitem_usageamount: decimal_at(usageamount, row),
            lineitem_unblendedcost: decimal_at(unblendedcost, row),
            lineitem_unblendedrate: decimal_at(unblendedrate, row),
            lineitem_blendedcost: decimal_at(blendedcost, row),
            lineitem_lineitemtype: string_at(lineitemtype, row),
            savingsplan_savingsplaneffectivecost: decimal_at(savingsplan_cost, row),
            bill_billingentity: string_at(billingentity, row),
            lineitem_usageaccountid: string_at(usageaccountid, row),
            lineitem_availabilityzone: string_opt_at(az, row),
            lineitem_currencycode: string_at(currencycode, row),
            pricing_unit: string_opt_at(pricingunit, row),
            resourcetags: tags,
            costcategory: category,
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    const POD_COLUMNS: &[&str] = &[
        "usage_start",
        "cluster_id",
        "cluster_alias",
        "node",
        "resource_id",
        "namespace",
        "pod",
        "pod_labels",
        "node_labels",
        "namespace_labels",
        "pod_usage_cpu_core_seconds",
        "pod_request_cpu_core_seconds",
        "pod_limit_cpu_core_seconds",
        "pod_usage_memory_byte_seconds",
        "pod_request_memory_byte_seconds",
        "pod_limit_memory_byte_seconds",
        "node_capacity_cpu_core_seconds",
        "node_capacity_memory_byte_seconds",
        "pod_seconds",
    ];

    fn pod_batch(pod_usage_cpu_core_seconds: f64) -> RecordBatch {
        let string_cols = [
            "usage_start",
            "cluster_id",
            "cluster_alias",
            "node",
            "resource_id",
            "namespace",
            "pod",
            "pod_labels",
            "node_labels",
            "namespace_labels",
        ];
        let mut fields = Vec::new();
        let mut columns: Vec<arrow::array::ArrayRef> = Vec::new();
        for name in POD_COLUMNS {
            if string_cols.contains(name) {
                fields.push(Field::new(*name, DataType::Utf8, true));
                let value = match *name {
                    "usage_start" => "2026-07-01",
                    "cluster_id" => "cluster-a",
                    "pod" => "pod-1",
                    "namespace" => "ns-1",
                    "node" => "node-1",
                    "pod_labels" | "node_labels" | "namespace_labels" => "",
                    _ => "",
                };
                columns.push(Arc::new(StringArray::from(vec![value])));
            } else {
                fields.push(Field::new(*name, DataType::Float64, true));
                let value = if *name == "pod_usage_cpu_core_seconds" { pod_usage_cpu_core_seconds } else { 1.0 };
                columns.push(Arc::new(Float64Array::from(vec![value])));
            }
        }
        RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).unwrap()
    }

    #[test]
    fn decode_ocp_pods_reads_every_column() {
        let batch = pod_batch(3600.0);
        let records = decode_ocp_pods(&batch, "OCP").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].cluster_id, "cluster-a");
        assert_eq!(records[0].pod, "pod-1");
        assert_eq!(records[0].usage_start, NaiveDate::from_ymd_opt(2026, 7, 1).unwrap());
        assert_eq!(records[0].pod_usage_cpu_core_seconds, 3600.0);
    }

    #[test]
    fn decode_ocp_pods_rejects_negative_usage() {
        let batch = pod_batch(-1.0);
        let err = decode_ocp_pods(&batch, "OCP").unwrap_err();
        assert!(matches!(err, PipelineError::AggregationArithmetic { .. }));
    }

    #[test]
    fn decode_ocp_pods_reports_missing_column() {
        let batch = pod_batch(1.0);
        let schema = batch.schema();
        let keep: Vec<usize> = (0..schema.fields().len()).filter(|&i| schema.field(i).name() != "pod").collect();
        let truncated = batch.project(&keep).unwrap();
        let err = decode_ocp_pods(&truncated, "OCP").unwrap_err();
        assert!(matches!(err, PipelineError::InputSchema { .. }));
    }

    #[test]
    fn date_at_accepts_both_date_and_rfc3339_forms() {
        let col: arrow::array::ArrayRef = Arc::new(StringArray::from(vec!["2026-07-01", "2026-07-01T00:00:00Z"]));
        assert_eq!(date_at(&col, 0, "OCP").unwrap(), NaiveDate::from_ymd_opt(2026, 7, 1).unwrap());
        assert_eq!(date_at(&col, 1, "OCP").unwrap(), NaiveDate::from_ymd_opt(2026, 7, 1).unwrap());
    }

    #[test]
    fn decimal_at_falls_back_to_zero_on_unparseable_value() {
        let col: arrow::array::ArrayRef = Arc::new(StringArray::from(vec!["not-a-number"]));
        assert_eq!(decimal_at(&col, 0), Decimal::ZERO);
    }
}
