//! Entity shapes shared across readers, aggregators, and the warehouse
//! writer, independent of their Parquet or warehouse storage layout.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Which provider a partition belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
pub enum ProviderKind {
    Ocp,
    Aws,
}

/// `(org_id, provider_kind, source_uuid, year, month)` — scopes every input
/// and output of a single provider run.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PartitionKey {
    pub org_id: String,
    pub provider_kind: ProviderKind,
    pub source_uuid: Uuid,
    pub year: i32,
    pub month: u32,
}

/// Opaque string-to-string label map. Values are never interpreted; they are
/// merged, filtered, and serialised for substring matching only.
pub type Labels = HashMap<String, String>;

/// One hourly or daily observation of a pod on a node.
#[derive(Clone, Debug)]
pub struct OcpPodRecord {
    pub usage_start: NaiveDate,
    pub cluster_id: String,
    pub cluster_alias: Option<String>,
    pub node: String,
    /// Empty string means "no known instance".
    pub resource_id: String,
    pub namespace: String,
    pub pod: String,
    pub pod_labels: Labels,
    pub node_labels: Labels,
    pub namespace_labels: Labels,
    pub pod_usage_cpu_core_seconds: f64,
    pub pod_request_cpu_core_seconds: f64,
    pub pod_limit_cpu_core_seconds: f64,
    pub pod_usage_memory_byte_seconds: f64,
    pub pod_request_memory_byte_seconds: f64,
    pub pod_limit_memory_byte_seconds: f64,
    pub node_capacity_cpu_core_seconds: f64,
    pub node_capacity_memory_byte_seconds: f64,
    pub pod_seconds: f64,
}

impl OcpPodRecord {
    /// True when the node carries an OpenShift infra/master role label,
    /// per the unallocated engine's platform/worker split.
    pub fn is_platform_node(&self) -> bool {
        matches!(
            self.node_labels.get("node_role_kubernetes_io_infra").map(String::as_str),
            Some("true")
        ) || matches!(
            self.node_labels.get("node_role_kubernetes_io_master").map(String::as_str),
            Some("true")
        )
    }
}

/// A volume observation; identity for aggregation is `(persistentvolume,
/// persistentvolumeclaim)`.
#[derive(Clone, Debug)]
pub struct OcpVolumeRecord {
    pub usage_start: NaiveDate,
    pub cluster_id: String,
    pub cluster_alias: Option<String>,
    pub namespace: String,
    pub node: String,
    pub persistentvolumeclaim: String,
    pub persistentvolume: String,
    pub storageclass: String,
    /// Empty when the volume has no CSI backing.
    pub csi_volume_handle: String,
    pub volume_labels: Labels,
    pub pod_labels: Labels,
    pub namespace_labels: Labels,
    pub persistentvolumeclaim_capacity_bytes: f64,
    pub persistentvolumeclaim_usage_byte_seconds: f64,
    pub volume_request_storage_byte_seconds: f64,
}

/// CUR line item.
#[derive(Clone, Debug)]
pub struct AwsLineItem {
    pub usage_start: NaiveDate,
    pub lineitem_resourceid: String,
    pub lineitem_productcode: String,
    pub product_productfamily: String,
    pub product_productname: String,
    pub product_instancetype: Option<String>,
    pub product_region: Option<String>,
    pub lineitem_usagetype: String,
    pub lineitem_operation: String,
    pub lineitem_usageamount: Decimal,
    pub lineitem_unblendedcost: Decimal,
    pub lineitem_unblendedrate: Decimal,
    pub lineitem_blendedcost: Decimal,
    pub lineitem_lineitemtype: String,
    pub savingsplan_savingsplaneffectivecost: Decimal,
    pub bill_billingentity: String,
    pub lineitem_usageaccountid: String,
    pub lineitem_availabilityzone: Option<String>,
    pub lineitem_currencycode: String,
    pub pricing_unit: Option<String>,
    pub resourcetags: HashMap<String, String>,
    pub costcategory: HashMap<String, String>,
}

/// Set of tag keys a run is allowed to carry into a summary row.
/// `vm_kubevirt_io_name`, `openshift_cluster`,
/// `openshift_node` and `openshift_project` are always members regardless of
/// what the warehouse's enabled-tag-keys table returns.
#[derive(Clone, Debug, Default)]
pub struct EnabledTagKeys(HashSet<String>);

pub const ALWAYS_ENABLED_TAG_KEYS: &[&str] = &[
    "openshift_cluster",
    "openshift_node",
    "openshift_project",
    "vm_kubevirt_io_name",
];

impl EnabledTagKeys {
    pub fn new(mut keys: HashSet<String>) -> Self {
        for always in ALWAYS_ENABLED_TAG_KEYS {
            keys.insert((*always).to_string());
        }
        Self(keys)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

/// Data source discriminator for OCP-only and OCP-on-AWS summary rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum DataSource {
    Pod,
    Storage,
    Node,
}

/// Direction of a data-transfer AWS line item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum DataTransferDirection {
    In,
    Out,
}

/// The reserved namespace buckets this pipeline emits instead of a real
/// OCP namespace.
pub mod reserved_namespace {
    pub const WORKER_UNALLOCATED: &str = "Worker unallocated";
    pub const PLATFORM_UNALLOCATED: &str = "Platform unallocated";
    pub const STORAGE_UNATTRIBUTED: &str = "Storage unattributed";
    pub const NETWORK_UNATTRIBUTED: &str = "Network unattributed";
}
