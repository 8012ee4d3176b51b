//! OCP aggregator: daily pod and volume summaries.
//!
//! The Parquet subtypes this reads (`openshift_pod_usage_line_items_daily`,
//! `openshift_storage_usage_line_items_daily`) are already day-granular,
//! so a node's capacity value is repeated once per pod scheduled on it that
//! day rather than once per hour; `node_capacity_cpu_core_hours` is therefore
//! the *max* capacity observed for that node on that day (not a sum), and
//! `cluster_capacity_cpu_core_hours` sums that per-node max across the
//! cluster's distinct nodes (documented in `DESIGN.md`).

use std::collections::HashMap;

use crate::labels::{filter, merge_precedence};
use crate::model::{EnabledTagKeys, Labels, OcpPodRecord, OcpVolumeRecord};
use crate::summary::{dec, PodDailySummary, VolumeDailySummary, GIBIBYTE, SECONDS_PER_HOUR};

#[derive(Clone, Copy, Hash, PartialEq, Eq)]
struct PodKey<'a> {
    usage_start: chrono::NaiveDate,
    cluster_id: &'a str,
    namespace: &'a str,
    node: &'a str,
}

/// Per-pod intermediate accumulator: usage fields sum across raw rows for
/// the same pod/day; capacity fields keep the most recent observation
///.
struct PodAccumulator {
    usage_cpu: f64,
    request_cpu: f64,
    limit_cpu: f64,
    usage_mem: f64,
    request_mem: f64,
    limit_mem: f64,
    node_capacity_cpu: f64,
    node_capacity_mem: f64,
    resource_id: String,
    pod_labels: Labels,
    namespace_labels: Labels,
    node_labels: Labels,
}

/// Aggregates a partition's pod records into daily, per-`(cluster, namespace,
/// node)` summaries.
pub fn aggregate_pods(records: &[OcpPodRecord], enabled_tag_keys: &EnabledTagKeys) -> Vec<PodDailySummary> {
    // Stage 1: dedupe/merge raw rows for the same pod into a per-pod-day accumulator.
    let mut per_pod: HashMap<(chrono::NaiveDate, &str, &str, &str, &str), PodAccumulator> = HashMap::new();
    for record in records {
        let key = (record.usage_start, record.cluster_id.as_str(), record.namespace.as_str(), record.node.as_str(), record.pod.as_str());
        let entry = per_pod.entry(key).or_insert_with(|| PodAccumulator {
            usage_cpu: 0.0,
            request_cpu: 0.0,
            limit_cpu: 0.0,
            usage_mem: 0.0,
            request_mem: 0.0,
            limit_mem: 0.0,
            node_capacity_cpu: 0.0,
            node_capacity_mem: 0.0,
            resource_id: String::new(),
            pod_labels: Labels::new(),
            namespace_labels: Labels::new(),
            node_labels: Labels::new(),
        });

        if record.pod_seconds > 0.0 {
            entry.usage_cpu += record.pod_usage_cpu_core_seconds;
            entry.request_cpu += record.pod_request_cpu_core_seconds;
            entry.limit_cpu += record.pod_limit_cpu_core_seconds;
            entry.usage_mem += record.pod_usage_memory_byte_seconds;
            entry.request_mem += record.pod_request_memory_byte_seconds;
            entry.limit_mem += record.pod_limit_memory_byte_seconds;
        }
        // Capacity: most recent observation wins. Records are folded in
        // reader-emission order, so the last write for this key stands.
        entry.node_capacity_cpu = record.node_capacity_cpu_core_seconds;
        entry.node_capacity_mem = record.node_capacity_memory_byte_seconds;
        entry.resource_id = record.resource_id.clone();
        entry.pod_labels = record.pod_labels.clone();
        entry.namespace_labels = record.namespace_labels.clone();
        entry.node_labels = record.node_labels.clone();
    }

    // Stage 2: fold per-pod accumulators into per-(day, cluster, namespace, node) groups.
    struct GroupAccumulator {
        cluster_alias: Option<String>,
        usage_cpu: f64,
        request_cpu: f64,
        effective_usage_cpu: f64,
        limit_cpu: f64,
        usage_mem: f64,
        request_mem: f64,
        effective_usage_mem: f64,
        limit_mem: f64,
        node_capacity_cpu_max: f64,
        node_capacity_mem_max: f64,
        resource_id: String,
        labels: Labels,
    }

    let mut groups: HashMap<PodKey, GroupAccumulator> = HashMap::new();
    let mut cluster_aliases: HashMap<&str, Option<String>> = HashMap::new();
    // distinct (cluster, node) -> max node capacity, for the cluster-level rollup.
    let mut node_capacity: HashMap<(&str, &str), (f64, f64)> = HashMap::new();

    for record in records {
        cluster_aliases
            .entry(record.cluster_id.as_str())
            .or_insert_with(|| record.cluster_alias.clone());
        let entry = node_capacity.entry((record.cluster_id.as_str(), record.node.as_str())).or_insert((0.0, 0.0));
        entry.0 = entry.0.max(record.node_capacity_cpu_core_seconds);
        entry.1 = entry.1.max(record.node_capacity_memory_byte_seconds);
    }

    for ((usage_start, cluster_id, namespace, node, _pod), acc) in per_pod {
        let key = PodKey {
            usage_start,
            cluster_id,
            namespace,
            node,
        };
        let effective_cpu = acc.usage_cpu.max(acc.request_cpu);
        let effective_mem = acc.usage_mem.max(acc.request_mem);
        let merged_labels = filter(&merge_precedence(&acc.pod_labels, &acc.namespace_labels, &acc.node_labels), enabled_tag_keys);

        let group = groups.entry(key).or_insert_with(|| GroupAccumulator {
            cluster_alias: cluster_aliases.get(cluster_id).cloned().flatten(),
            usage_cpu: 0.0,
            request_cpu: 0.0,
            effective_usage_cpu: 0.0,
            limit_cpu: 0.0,
            usage_mem: 0.0,
            request_mem: 0.0,
            effective_usage_mem: 0.0,
            limit_mem: 0.0,
            node_capacity_cpu_max: 0.0,
            node_capacity_mem_max: 0.0,
            resource_id: String::new(),
            labels: Labels::new(),
        });
        group.usage_cpu += acc.usage_cpu;
        group.request_cpu += acc.request_cpu;
        group.effective_usage_cpu += effective_cpu;
        group.limit_cpu += acc.limit_cpu;
        group.usage_mem += acc.usage_mem;
        group.request_mem += acc.request_mem;
        group.effective_usage_mem += effective_mem;
        group.limit_mem += acc.limit_mem;
        group.node_capacity_cpu_max = group.node_capacity_cpu_max.max(acc.node_capacity_cpu);
        group.node_capacity_mem_max = group.node_capacity_mem_max.max(acc.node_capacity_mem);
        if !acc.resource_id.is_empty() {
            group.resource_id = acc.resource_id.clone();
        }
        for (k, v) in merged_labels {
            group.labels.insert(k, v);
        }
    }

    // cluster_capacity_*: sum of distinct nodes' max capacity per cluster/day.
    // A node is scheduled under several namespaces, so this sums over
    // distinct (cluster, node) pairs rather than over `groups` directly.
    let mut cluster_capacity: HashMap<(chrono::NaiveDate, &str), (f64, f64)> = HashMap::new();
    let mut seen_nodes: std::collections::HashSet<(chrono::NaiveDate, &str, &str)> = std::collections::HashSet::new();
    for key in groups.keys() {
        if seen_nodes.insert((key.usage_start, key.cluster_id, key.node)) {
            if let Some((cpu, mem)) = node_capacity.get(&(key.cluster_id, key.node)) {
                let entry = cluster_capacity.entry((key.usage_start, key.cluster_id)).or_insert((0.0, 0.0));
                entry.0 += cpu;
                entry.1 += mem;
            }
        }
    }

    groups
        .into_iter()
        .map(|(key, acc)| {
            let (cluster_cpu, cluster_mem) = cluster_capacity.get(&(key.usage_start, key.cluster_id)).copied().unwrap_or((0.0, 0.0));
            PodDailySummary {
                usage_start: key.usage_start,
                cluster_id: key.cluster_id.to_string(),
                cluster_alias: acc.cluster_alias,
                namespace: key.namespace.to_string(),
                node: key.node.to_string(),
                resource_id: acc.resource_id,
                pod_usage_cpu_core_hours: dec(acc.usage_cpu / SECONDS_PER_HOUR),
                pod_request_cpu_core_hours: dec(acc.request_cpu / SECONDS_PER_HOUR),
                pod_effective_usage_cpu_core_hours: dec(acc.effective_usage_cpu / SECONDS_PER_HOUR),
                pod_limit_cpu_core_hours: dec(acc.limit_cpu / SECONDS_PER_HOUR),
                pod_usage_memory_gigabyte_hours: dec(acc.usage_mem / SECONDS_PER_HOUR / GIBIBYTE),
                pod_request_memory_gigabyte_hours: dec(acc.request_mem / SECONDS_PER_HOUR / GIBIBYTE),
                pod_effective_usage_memory_gigabyte_hours: dec(acc.effective_usage_mem / SECONDS_PER_HOUR / GIBIBYTE),
                pod_limit_memory_gigabyte_hours: dec(acc.limit_mem / SECONDS_PER_HOUR / GIBIBYTE),
                node_capacity_cpu_core_hours: dec(acc.node_capacity_cpu_max / SECONDS_PER_HOUR),
                node_capacity_memory_gigabyte_hours: dec(acc.node_capacity_mem_max / SECONDS_PER_HOUR / GIBIBYTE),
                cluster_capacity_cpu_core_hours: dec(cluster_cpu / SECONDS_PER_HOUR),
                cluster_capacity_memory_gigabyte_hours: dec(cluster_mem / SECONDS_PER_HOUR / GIBIBYTE),
                pod_labels: acc.labels,
            }
        })
        .collect()
}

/// Aggregates a partition's volume records into daily, per-`(cluster,
/// namespace, node, pvc, pv, storageclass)` summaries.
///
/// Shared-PV rule: when the same `(persistentvolume,
/// persistentvolumeclaim)` appears on multiple nodes in a day, capacity is
/// counted once per claim (we take it from the first observation encountered
/// for that PV/PVC that day) while usage sums across every node observation.
pub fn aggregate_volumes(records: &[OcpVolumeRecord], enabled_tag_keys: &EnabledTagKeys) -> Vec<VolumeDailySummary> {
    #[derive(Hash, PartialEq, Eq, Clone)]
    struct VolKey {
        usage_start: chrono::NaiveDate,
        cluster_id: String,
        namespace: String,
        node: String,
        pvc: String,
        pv: String,
        storageclass: String,
    }

    struct VolAccumulator {
        cluster_alias: Option<String>,
        csi_volume_handle: String,
        usage_byte_seconds: f64,
        request_byte_seconds: f64,
        capacity_bytes: Option<f64>,
        volume_labels: Labels,
        pod_labels: Labels,
        namespace_labels: Labels,
    }

    // Capacity counted once per (day, pv, pvc) regardless of how many nodes
    // the claim appears on, per the shared-PV rule: only the node the claim
    // is first observed on that day carries the capacity value forward; any
    // other node the claim shares that day carries zero, so summing capacity
    // across every output row for the claim yields the true capacity once.
    let mut capacity_by_claim: HashMap<(chrono::NaiveDate, String, String), f64> = HashMap::new();
    let mut capacity_node_by_claim: HashMap<(chrono::NaiveDate, String, String), String> = HashMap::new();
    for record in records {
        let claim_key = (record.usage_start, record.persistentvolume.clone(), record.persistentvolumeclaim.clone());
        capacity_by_claim.entry(claim_key.clone()).or_insert(record.persistentvolumeclaim_capacity_bytes);
        capacity_node_by_claim.entry(claim_key).or_insert_with(|| record.node.clone());
    }

    let mut groups: HashMap<VolKey, VolAccumulator> = HashMap::new();
    for record in records {
        let key = VolKey {
            usage_start: record.usage_start,
            cluster_id: record.cluster_id.clone(),
            namespace: record.namespace.clone(),
            node: record.node.clone(),
            pvc: record.persistentvolumeclaim.clone(),
            pv: record.persistentvolume.clone(),
            storageclass: record.storageclass.clone(),
        };
        let entry = groups.entry(key).or_insert_with(|| VolAccumulator {
            cluster_alias: record.cluster_alias.clone(),
            csi_volume_handle: record.csi_volume_handle.clone(),
            usage_byte_seconds: 0.0,
            request_byte_seconds: 0.0,
            capacity_bytes: None,
            volume_labels: Labels::new(),
            pod_labels: Labels::new(),
            namespace_labels: Labels::new(),
        });
        entry.usage_byte_seconds += record.persistentvolumeclaim_usage_byte_seconds;
        entry.request_byte_seconds += record.volume_request_storage_byte_seconds;
        for (k, v) in &record.volume_labels {
            entry.volume_labels.insert(k.clone(), v.clone());
        }
        for (k, v) in &record.pod_labels {
            entry.pod_labels.insert(k.clone(), v.clone());
        }
        for (k, v) in &record.namespace_labels {
            entry.namespace_labels.insert(k.clone(), v.clone());
        }
    }

    groups
        .into_iter()
        .map(|(key, acc)| {
            let days = days_in_month(key.usage_start);
            let seconds_in_month = days as f64 * 24.0 * 3600.0;
            let claim_key = (key.usage_start, key.pv.clone(), key.pvc.clone());
            let is_capacity_node = capacity_node_by_claim.get(&claim_key).is_some_and(|node| *node == key.node);
            let capacity_bytes = if is_capacity_node {
                capacity_by_claim.get(&claim_key).copied().unwrap_or(0.0)
            } else {
                0.0
            };

            let merged = filter(
                &merge_precedence(&acc.pod_labels, &acc.namespace_labels, &Labels::new()),
                enabled_tag_keys,
            );
            let mut all_labels = merged.clone();
            for (k, v) in filter(&acc.volume_labels, enabled_tag_keys) {
                all_labels.insert(k, v);
            }

            VolumeDailySummary {
                usage_start: key.usage_start,
                cluster_id: key.cluster_id,
                cluster_alias: acc.cluster_alias,
                namespace: key.namespace,
                node: key.node,
                persistentvolumeclaim: key.pvc,
                persistentvolume: key.pv,
                storageclass: key.storageclass,
                csi_volume_handle: acc.csi_volume_handle,
                // capacity_bytes / GiB, scaled by days/days (identity per
                // formula, kept explicit for the "calendar month
                // of usage_start" phrasing rather than the observed range).
                persistentvolumeclaim_capacity_gigabyte_months: dec(capacity_bytes / GIBIBYTE),
                persistentvolumeclaim_usage_gigabyte_months: dec(acc.usage_byte_seconds / GIBIBYTE / seconds_in_month),
                volume_request_storage_gigabyte_months: dec(acc.request_byte_seconds / GIBIBYTE / seconds_in_month),
                volume_labels: filter(&acc.volume_labels, enabled_tag_keys),
                all_labels,
            }
        })
        .collect()
}

/// Number of days in the calendar month containing `date`.
pub fn days_in_month(date: chrono::NaiveDate) -> u32 {
    use chrono::Datelike;
    let (year, month) = (date.year(), date.month());
    let next_month_first = if month == 12 {
        chrono::NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        chrono::NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("valid calendar date");
    let this_month_first = chrono::NaiveDate::from_ymd_opt(year, month, 1).expect("valid calendar date");
    (next_month_first - this_month_first).num_days() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::collections::HashSet;

    fn tag_keys() -> EnabledTagKeys {
        EnabledTagKeys::new(HashSet::new())
    }

    fn base_pod(usage_start: NaiveDate) -> OcpPodRecord {
        OcpPodRecord {
            usage_start,
            cluster_id: "cluster-a".into(),
            cluster_alias: Some("Cluster A".into()),
            node: "node-1".into(),
            resource_id: "i-abc".into(),
            namespace: "ns-1".into(),
            pod: "pod-1".into(),
            pod_labels: Labels::new(),
            node_labels: Labels::new(),
            namespace_labels: Labels::new(),
            pod_usage_cpu_core_seconds: 1800.0,
            pod_request_cpu_core_seconds: 3600.0,
            pod_limit_cpu_core_seconds: 7200.0,
            pod_usage_memory_byte_seconds: 0.0,
            pod_request_memory_byte_seconds: 0.0,
            pod_limit_memory_byte_seconds: 0.0,
            node_capacity_cpu_core_seconds: 86_400.0,
            node_capacity_memory_byte_seconds: 0.0,
            pod_seconds: 3600.0,
        }
    }

    #[test]
    fn effective_usage_is_max_of_usage_and_request() {
        let day = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let summaries = aggregate_pods(&[base_pod(day)], &tag_keys());
        assert_eq!(summaries.len(), 1);
        let row = &summaries[0];
        // usage = 0.5 core-hours, request = 1.0 core-hour -> effective = 1.0
        assert_eq!(row.pod_effective_usage_cpu_core_hours, row.pod_request_cpu_core_hours);
    }

    #[test]
    fn zero_pod_seconds_contributes_nothing() {
        let day = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let mut pod = base_pod(day);
        pod.pod_seconds = 0.0;
        pod.pod_usage_cpu_core_seconds = 999.0;
        let summaries = aggregate_pods(&[pod], &tag_keys());
        assert_eq!(summaries[0].pod_usage_cpu_core_hours, dec(0.0));
    }

    #[test]
    fn cluster_capacity_sums_distinct_nodes_only() {
        let day = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let mut pod_b = base_pod(day);
        pod_b.pod = "pod-2".into();
        // same node, so node capacity must not double count
        let summaries = aggregate_pods(&[base_pod(day), pod_b], &tag_keys());
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].cluster_capacity_cpu_core_hours, summaries[0].node_capacity_cpu_core_hours);
    }

    #[test]
    fn shared_pv_counts_capacity_once_and_sums_usage() {
        let day = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let mk = |node: &str| OcpVolumeRecord {
            usage_start: day,
            cluster_id: "cluster-a".into(),
            cluster_alias: None,
            namespace: "ns-1".into(),
            node: node.into(),
            persistentvolumeclaim: "pvc-1".into(),
            persistentvolume: "pv-1".into(),
            storageclass: "gp2".into(),
            csi_volume_handle: "vol-1".into(),
            volume_labels: Labels::new(),
            pod_labels: Labels::new(),
            namespace_labels: Labels::new(),
            persistentvolumeclaim_capacity_bytes: 100.0 * GIBIBYTE,
            persistentvolumeclaim_usage_byte_seconds: 50.0 * GIBIBYTE * 3600.0,
            volume_request_storage_byte_seconds: 0.0,
        };
        let records = vec![mk("node-1"), mk("node-2")];
        let summaries = aggregate_volumes(&records, &tag_keys());
        let total_capacity: Decimal = summaries.iter().map(|s| s.persistentvolumeclaim_capacity_gigabyte_months).sum();
        assert_eq!(total_capacity, dec(100.0));
    }
}
