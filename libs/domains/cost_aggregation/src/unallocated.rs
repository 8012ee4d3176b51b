//! Unallocated engine: residual node capacity not claimed by any
//! pod, split into `Worker unallocated` and `Platform unallocated` rows, plus
//! `Storage unattributed` rows for volumes with no owning pod.

use std::collections::HashMap;

use crate::model::{reserved_namespace, DataSource, OcpPodRecord, OcpVolumeRecord};
use crate::summary::{dec, UnallocatedSummary, GIBIBYTE, SECONDS_PER_HOUR};

/// Computes per-`(day, cluster, node)` residual capacity rows from raw pod
/// records. A node's residual is its capacity minus the sum of
/// `pod_effective_usage` across every pod scheduled on it that day, floored
/// at zero.
pub fn compute_unallocated(records: &[OcpPodRecord]) -> Vec<UnallocatedSummary> {
    struct NodeAccumulator {
        cluster_alias: Option<String>,
        is_platform: bool,
        capacity_cpu: f64,
        capacity_mem: f64,
        effective_usage_cpu: f64,
        effective_usage_mem: f64,
    }

    // Per-pod dedup mirrors the aggregator: sum usage across duplicate rows
    // for the same pod, keep the latest capacity observation.
    struct PodAccumulator {
        usage_cpu: f64,
        request_cpu: f64,
        usage_mem: f64,
        request_mem: f64,
        node_capacity_cpu: f64,
        node_capacity_mem: f64,
    }

    let mut per_pod: HashMap<(chrono::NaiveDate, &str, &str, &str), (PodAccumulator, bool, Option<&str>)> = HashMap::new();
    for record in records {
        let key = (record.usage_start, record.cluster_id.as_str(), record.node.as_str(), record.pod.as_str());
        if record.pod_seconds > 0.0 {
            let entry = per_pod.entry(key).or_insert_with(|| {
                (
                    PodAccumulator {
                        usage_cpu: 0.0,
                        request_cpu: 0.0,
                        usage_mem: 0.0,
                        request_mem: 0.0,
                        node_capacity_cpu: 0.0,
                        node_capacity_mem: 0.0,
                    },
                    record.is_platform_node(),
                    record.cluster_alias.as_deref(),
                )
            });
            entry.0.usage_cpu += record.pod_usage_cpu_core_seconds;
            entry.0.request_cpu += record.pod_request_cpu_core_seconds;
            entry.0.usage_mem += record.pod_usage_memory_byte_seconds;
            entry.0.request_mem += record.pod_request_memory_byte_seconds;
            entry.0.node_capacity_cpu = record.node_capacity_cpu_core_seconds;
            entry.0.node_capacity_mem = record.node_capacity_memory_byte_seconds;
        }
    }

    let mut nodes: HashMap<(chrono::NaiveDate, &str, &str), NodeAccumulator> = HashMap::new();
    for ((usage_start, cluster_id, node, _pod), (acc, is_platform, cluster_alias)) in &per_pod {
        let effective_cpu = acc.usage_cpu.max(acc.request_cpu);
        let effective_mem = acc.usage_mem.max(acc.request_mem);
        let entry = nodes.entry((*usage_start, cluster_id, node)).or_insert_with(|| NodeAccumulator {
            cluster_alias: cluster_alias.map(str::to_string),
            is_platform: *is_platform,
            capacity_cpu: 0.0,
            capacity_mem: 0.0,
            effective_usage_cpu: 0.0,
            effective_usage_mem: 0.0,
        });
        entry.capacity_cpu = entry.capacity_cpu.max(acc.node_capacity_cpu);
        entry.capacity_mem = entry.capacity_mem.max(acc.node_capacity_mem);
        entry.effective_usage_cpu += effective_cpu;
        entry.effective_usage_mem += effective_mem;
    }

    nodes
        .into_iter()
        .map(|((usage_start, cluster_id, node), acc)| {
            let residual_cpu = (acc.capacity_cpu - acc.effective_usage_cpu).max(0.0);
            let residual_mem = (acc.capacity_mem - acc.effective_usage_mem).max(0.0);
            UnallocatedSummary {
                usage_start,
                cluster_id: cluster_id.to_string(),
                cluster_alias: acc.cluster_alias,
                namespace: if acc.is_platform {
                    reserved_namespace::PLATFORM_UNALLOCATED
                } else {
                    reserved_namespace::WORKER_UNALLOCATED
                },
                node: Some(node.to_string()),
                data_source: DataSource::Node,
                cpu_core_hours: dec(residual_cpu / SECONDS_PER_HOUR),
                memory_gigabyte_hours: dec(residual_mem / SECONDS_PER_HOUR / GIBIBYTE),
                capacity_gigabyte_months: dec(0.0),
            }
        })
        .collect()
}

/// Emits a `Storage unattributed` row for every volume record whose
/// namespace is empty.
pub fn compute_storage_unattributed(records: &[OcpVolumeRecord]) -> Vec<UnallocatedSummary> {
    records
        .iter()
        .filter(|record| record.namespace.is_empty())
        .map(|record| UnallocatedSummary {
            usage_start: record.usage_start,
            cluster_id: record.cluster_id.clone(),
            cluster_alias: record.cluster_alias.clone(),
            namespace: reserved_namespace::STORAGE_UNATTRIBUTED,
            node: None,
            data_source: DataSource::Storage,
            cpu_core_hours: dec(0.0),
            memory_gigabyte_hours: dec(0.0),
            capacity_gigabyte_months: dec(record.persistentvolumeclaim_capacity_bytes / GIBIBYTE),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Labels;
    use chrono::NaiveDate;

    fn pod(usage_cpu: f64, request_cpu: f64, capacity_cpu: f64, platform: bool) -> OcpPodRecord {
        let mut node_labels = Labels::new();
        if platform {
            node_labels.insert("node_role_kubernetes_io_infra".into(), "true".into());
        }
        OcpPodRecord {
            usage_start: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            cluster_id: "cluster-a".into(),
            cluster_alias: None,
            node: "node-1".into(),
            resource_id: "i-abc".into(),
            namespace: "ns-1".into(),
            pod: "pod-1".into(),
            pod_labels: Labels::new(),
            node_labels,
            namespace_labels: Labels::new(),
            pod_usage_cpu_core_seconds: usage_cpu,
            pod_request_cpu_core_seconds: request_cpu,
            pod_limit_cpu_core_seconds: 0.0,
            pod_usage_memory_byte_seconds: 0.0,
            pod_request_memory_byte_seconds: 0.0,
            pod_limit_memory_byte_seconds: 0.0,
            node_capacity_cpu_core_seconds: capacity_cpu,
            node_capacity_memory_byte_seconds: 0.0,
            pod_seconds: 3600.0,
        }
    }

    #[test]
    fn residual_never_goes_negative() {
        // pod requests 2x the node's entire capacity
        let records = vec![pod(0.0, 2.0 * 86_400.0, 86_400.0, false)];
        let rows = compute_unallocated(&records);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cpu_core_hours, dec(0.0));
    }

    #[test]
    fn platform_node_routes_to_platform_unallocated() {
        let records = vec![pod(0.0, 0.0, 86_400.0, true)];
        let rows = compute_unallocated(&records);
        assert_eq!(rows[0].namespace, reserved_namespace::PLATFORM_UNALLOCATED);
    }

    #[test]
    fn worker_node_routes_to_worker_unallocated() {
        let records = vec![pod(0.0, 0.0, 86_400.0, false)];
        let rows = compute_unallocated(&records);
        assert_eq!(rows[0].namespace, reserved_namespace::WORKER_UNALLOCATED);
    }
}
