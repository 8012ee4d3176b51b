//! Output row shapes produced by the OCP aggregator, unallocated engine and
//! OCP-on-AWS aggregator.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::model::{DataSource, DataTransferDirection, Labels};

pub const GIBIBYTE: f64 = 1_073_741_824.0;
pub const SECONDS_PER_HOUR: f64 = 3_600.0;

/// Converts an f64 usage/capacity accumulator into the `Decimal` the
/// warehouse's `decimal(24,9)` columns expect.
pub fn dec(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap_or(Decimal::ZERO)
}

/// Pod-level daily summary.
#[derive(Clone, Debug)]
pub struct PodDailySummary {
    pub usage_start: NaiveDate,
    pub cluster_id: String,
    pub cluster_alias: Option<String>,
    pub namespace: String,
    pub node: String,
    /// Most recently observed `resource_id` for this node ("OCP
    /// pod record"); used by the attributor's node suffix match, not
    /// persisted to the warehouse row.
    pub resource_id: String,
    pub pod_usage_cpu_core_hours: Decimal,
    pub pod_request_cpu_core_hours: Decimal,
    pub pod_effective_usage_cpu_core_hours: Decimal,
    pub pod_limit_cpu_core_hours: Decimal,
    pub pod_usage_memory_gigabyte_hours: Decimal,
    pub pod_request_memory_gigabyte_hours: Decimal,
    pub pod_effective_usage_memory_gigabyte_hours: Decimal,
    pub pod_limit_memory_gigabyte_hours: Decimal,
    pub node_capacity_cpu_core_hours: Decimal,
    pub node_capacity_memory_gigabyte_hours: Decimal,
    pub cluster_capacity_cpu_core_hours: Decimal,
    pub cluster_capacity_memory_gigabyte_hours: Decimal,
    pub pod_labels: Labels,
}

/// Volume-level daily summary.
#[derive(Clone, Debug)]
pub struct VolumeDailySummary {
    pub usage_start: NaiveDate,
    pub cluster_id: String,
    pub cluster_alias: Option<String>,
    pub namespace: String,
    pub node: String,
    pub persistentvolumeclaim: String,
    pub persistentvolume: String,
    pub storageclass: String,
    pub csi_volume_handle: String,
    pub persistentvolumeclaim_capacity_gigabyte_months: Decimal,
    pub persistentvolumeclaim_usage_gigabyte_months: Decimal,
    pub volume_request_storage_gigabyte_months: Decimal,
    pub volume_labels: Labels,
    pub all_labels: Labels,
}

/// Unallocated-capacity row: `namespace` is always one of the
/// reserved `reserved_namespace` constants.
#[derive(Clone, Debug)]
pub struct UnallocatedSummary {
    pub usage_start: NaiveDate,
    pub cluster_id: String,
    pub cluster_alias: Option<String>,
    pub namespace: &'static str,
    pub node: Option<String>,
    pub data_source: DataSource,
    pub cpu_core_hours: Decimal,
    pub memory_gigabyte_hours: Decimal,
    pub capacity_gigabyte_months: Decimal,
}

/// Every cost field attributed to one namespace for one `(resource, day)`.
#[derive(Clone, Debug, Default)]
pub struct CostShare {
    pub unblended_cost: Decimal,
    pub markup_cost: Decimal,
    pub blended_cost: Decimal,
    pub markup_cost_blended: Decimal,
    pub savingsplan_effective_cost: Decimal,
    pub markup_cost_savingsplan: Decimal,
    pub calculated_amortized_cost: Decimal,
    pub markup_cost_amortized: Decimal,
}

impl CostShare {
    pub fn scaled_by(&self, ratio: Decimal) -> Self {
        Self {
            unblended_cost: self.unblended_cost * ratio,
            markup_cost: self.markup_cost * ratio,
            blended_cost: self.blended_cost * ratio,
            markup_cost_blended: self.markup_cost_blended * ratio,
            savingsplan_effective_cost: self.savingsplan_effective_cost * ratio,
            markup_cost_savingsplan: self.markup_cost_savingsplan * ratio,
            calculated_amortized_cost: self.calculated_amortized_cost * ratio,
            markup_cost_amortized: self.markup_cost_amortized * ratio,
        }
    }

    pub fn add(&mut self, other: &CostShare) {
        self.unblended_cost += other.unblended_cost;
        self.markup_cost += other.markup_cost;
        self.blended_cost += other.blended_cost;
        self.markup_cost_blended += other.markup_cost_blended;
        self.savingsplan_effective_cost += other.savingsplan_effective_cost;
        self.markup_cost_savingsplan += other.markup_cost_savingsplan;
        self.calculated_amortized_cost += other.calculated_amortized_cost;
        self.markup_cost_amortized += other.markup_cost_amortized;
    }
}

/// One attributed-cost row (contract).
#[derive(Clone, Debug)]
pub struct AttributedCostRow {
    pub usage_start: NaiveDate,
    pub cluster_id: String,
    pub cluster_alias: Option<String>,
    pub data_source: DataSource,
    pub namespace: String,
    pub node: Option<String>,
    pub persistentvolumeclaim: Option<String>,
    pub persistentvolume: Option<String>,
    pub storageclass: Option<String>,
    pub resource_id: Option<String>,
    pub product_code: Option<String>,
    pub product_family: Option<String>,
    pub instance_type: Option<String>,
    pub usage_account_id: Option<String>,
    pub availability_zone: Option<String>,
    pub region: Option<String>,
    pub unit: Option<String>,
    pub usage_amount: Decimal,
    pub currency_code: Option<String>,
    pub tags: Labels,
    pub aws_cost_category: Labels,
    pub resource_id_matched: bool,
    pub tag_matched: String,
    pub data_transfer_direction: Option<DataTransferDirection>,
    pub infrastructure_data_in_gigabytes: Decimal,
    pub infrastructure_data_out_gigabytes: Decimal,
    pub cost: CostShare,
}
