//! Cost attributor: turns matched AWS line items plus OCP
//! summaries for the same day into per-namespace attributed cost rows.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec as literal;

use crate::error::{PipelineError, PipelineResult, Stage};
use crate::matcher::MatchedLineItem;
use crate::model::{reserved_namespace, AwsLineItem, DataSource, DataTransferDirection};
use crate::ocp_aggregate::days_in_month;
use crate::summary::{AttributedCostRow, CostShare, PodDailySummary, VolumeDailySummary};

/// One unit in the last fractional digit this pipeline preserves through
/// attribution (`rust_decimal::Decimal` keeps at least nine); the ε the §8
/// overflow invariant is checked against.
fn epsilon() -> Decimal {
    literal!(0.000000001)
}

/// Line item after "line-item preprocessing" step, applied
/// before any attribution rule runs.
struct PreprocessedLineItem {
    line_item: AwsLineItem,
    calculated_amortized_cost: Decimal,
    product_code: String,
    data_transfer_direction: Option<DataTransferDirection>,
    resource_id_matched: bool,
    matched_tag: String,
    tags: crate::model::Labels,
}

fn preprocess(item: MatchedLineItem) -> PreprocessedLineItem {
    let mut line_item = item.line_item;

    if line_item.lineitem_lineitemtype == "SavingsPlanCoveredUsage" {
        line_item.lineitem_unblendedcost = Decimal::ZERO;
        line_item.lineitem_blendedcost = Decimal::ZERO;
    }

    let calculated_amortized_cost = if matches!(line_item.lineitem_lineitemtype.as_str(), "Tax" | "Usage") {
        line_item.lineitem_unblendedcost
    } else {
        line_item.savingsplan_savingsplaneffectivecost
    };

    let product_code = if line_item.bill_billingentity == "AWS Marketplace" {
        if !line_item.product_productname.is_empty() {
            line_item.product_productname.clone()
        } else {
            line_item.lineitem_productcode.clone()
        }
    } else {
        line_item.lineitem_productcode.clone()
    };

    let data_transfer_direction = derive_data_transfer_direction(&line_item);

    PreprocessedLineItem {
        resource_id_matched: item.resource_id_matched,
        matched_tag: item.matched_tag,
        tags: item.tags,
        calculated_amortized_cost,
        product_code,
        data_transfer_direction,
        line_item,
    }
}

fn derive_data_transfer_direction(item: &AwsLineItem) -> Option<DataTransferDirection> {
    if item.lineitem_productcode != "AmazonEC2" || item.product_productfamily != "Data Transfer" {
        return None;
    }
    let usage_type = item.lineitem_usagetype.to_lowercase();
    let operation = item.lineitem_operation.to_lowercase();
    if usage_type.contains("in-bytes") {
        return Some(DataTransferDirection::In);
    }
    if usage_type.contains("out-bytes") {
        return Some(DataTransferDirection::Out);
    }
    if usage_type.contains("regional-bytes") {
        if operation.contains("-in") {
            return Some(DataTransferDirection::In);
        }
        if operation.contains("-out") {
            return Some(DataTransferDirection::Out);
        }
    }
    None
}

fn cost_share_of(item: &PreprocessedLineItem, markup: Decimal) -> CostShare {
    let unblended_cost = item.line_item.lineitem_unblendedcost;
    let blended_cost = item.line_item.lineitem_blendedcost;
    let savingsplan_effective_cost = item.line_item.savingsplan_savingsplaneffectivecost;
    let calculated_amortized_cost = item.calculated_amortized_cost;
    CostShare {
        unblended_cost,
        markup_cost: unblended_cost * markup,
        blended_cost,
        markup_cost_blended: blended_cost * markup,
        savingsplan_effective_cost,
        markup_cost_savingsplan: savingsplan_effective_cost * markup,
        calculated_amortized_cost,
        markup_cost_amortized: calculated_amortized_cost * markup,
    }
}

fn base_row(item: &PreprocessedLineItem) -> AttributedCostRow {
    AttributedCostRow {
        usage_start: item.line_item.usage_start,
        cluster_id: String::new(),
        cluster_alias: None,
        data_source: DataSource::Pod,
        namespace: String::new(),
        node: None,
        persistentvolumeclaim: None,
        persistentvolume: None,
        storageclass: None,
        resource_id: Some(item.line_item.lineitem_resourceid.clone()),
        product_code: Some(item.product_code.clone()),
        product_family: Some(item.line_item.product_productfamily.clone()),
        instance_type: item.line_item.product_instancetype.clone(),
        usage_account_id: Some(item.line_item.lineitem_usageaccountid.clone()),
        availability_zone: item.line_item.lineitem_availabilityzone.clone(),
        region: item.line_item.product_region.clone(),
        unit: item.line_item.pricing_unit.clone(),
        usage_amount: item.line_item.lineitem_usageamount,
        currency_code: Some(item.line_item.lineitem_currencycode.clone()),
        tags: item.tags.clone(),
        aws_cost_category: item.line_item.costcategory.clone(),
        resource_id_matched: item.resource_id_matched,
        tag_matched: item.matched_tag.clone(),
        data_transfer_direction: item.data_transfer_direction,
        infrastructure_data_in_gigabytes: Decimal::ZERO,
        infrastructure_data_out_gigabytes: Decimal::ZERO,
        cost: CostShare::default(),
    }
}

/// Per-run inputs the attributor needs beyond the matched line items
/// themselves: OCP summaries keyed for the lookups each rule performs.
pub struct AttributionContext<'a> {
    pub pods: &'a [PodDailySummary],
    pub volumes: &'a [VolumeDailySummary],
    pub markup: Decimal,
    pub provider: &'a str,
}

/// Runs every attribution rule over one day's matched AWS rows, returning
/// the attributed-cost rows the OCP-on-AWS aggregator consumes. Fatal per
/// `§7 AttributionInvariant` when a disk-capacity computation collapses to
/// zero against a nonzero PVC claim, or when a single line item's attributed
/// shares exceed its source cost by more than one preserved fractional unit.
pub fn attribute(items: Vec<MatchedLineItem>, ctx: &AttributionContext) -> PipelineResult<Vec<AttributedCostRow>> {
    let preprocessed: Vec<PreprocessedLineItem> = items.into_iter().map(preprocess).collect();

    let mut rows = Vec::new();
    for item in &preprocessed {
        let item_rows = attribute_one(item, ctx)?;
        check_cost_overflow(item, &item_rows, ctx)?;
        rows.extend(item_rows);
    }
    Ok(rows)
}

fn attribute_one(item: &PreprocessedLineItem, ctx: &AttributionContext) -> PipelineResult<Vec<AttributedCostRow>> {
    if let Some(direction) = item.data_transfer_direction {
        return Ok(attribute_network(item, direction, ctx));
    }
    if item.resource_id_matched {
        let compute_rows = attribute_compute(item, ctx);
        if !compute_rows.is_empty() {
            return Ok(compute_rows);
        }
        return attribute_storage_csi(item, ctx);
    }
    // The step-4/5 assertions are comma-joined in fixed cluster/node/project
    // order (`matcher::match_one`); a row matched on more than one tag still
    // carries the project assertion somewhere in that list, not necessarily
    // at the front.
    if item.matched_tag.contains("openshift_project=") {
        return Ok(attribute_tag_only_storage(item, ctx));
    }
    Ok(Vec::new())
}

/// `Σ namespace.unblended_cost ≤ Σ source.unblended_cost + ε` for a single
/// `(resource, day)` — here, a single already-per-resource-day line item.
fn check_cost_overflow(item: &PreprocessedLineItem, rows: &[AttributedCostRow], ctx: &AttributionContext) -> PipelineResult<()> {
    let attributed = total_attributed_cost(rows).get("unblended_cost").copied().unwrap_or(Decimal::ZERO);
    let source = item.line_item.lineitem_unblendedcost;
    if attributed > source + epsilon() {
        return Err(PipelineError::AttributionInvariant {
            provider: ctx.provider.to_string(),
            stage: Stage::Attributing,
            message: format!(
                "attributed unblended cost {attributed} exceeds source cost {source} for resource {} on {}",
                item.line_item.lineitem_resourceid, item.line_item.usage_start
            ),
        });
    }
    Ok(())
}

fn attribute_compute(item: &PreprocessedLineItem, ctx: &AttributionContext) -> Vec<AttributedCostRow> {
    let matches: Vec<&PodDailySummary> = ctx
        .pods
        .iter()
        .filter(|pod| !pod.resource_id.is_empty() && item.line_item.lineitem_resourceid.ends_with(pod.resource_id.as_str()) && pod.usage_start == item.line_item.usage_start)
        .collect();
    if matches.is_empty() {
        return Vec::new();
    }

    matches
        .into_iter()
        .map(|pod| {
            let cpu_ratio = if pod.node_capacity_cpu_core_hours.is_zero() {
                Decimal::ZERO
            } else {
                pod.pod_usage_cpu_core_hours / pod.node_capacity_cpu_core_hours
            };
            let mem_ratio = if pod.node_capacity_memory_gigabyte_hours.is_zero() {
                Decimal::ZERO
            } else {
                pod.pod_usage_memory_gigabyte_hours / pod.node_capacity_memory_gigabyte_hours
            };
            let ratio = cpu_ratio.max(mem_ratio);

            let mut row = base_row(item);
            row.cluster_id = pod.cluster_id.clone();
            row.cluster_alias = pod.cluster_alias.clone();
            row.namespace = pod.namespace.clone();
            row.node = Some(pod.node.clone());
            row.data_source = DataSource::Pod;
            row.cost = cost_share_of(item, ctx.markup).scaled_by(ratio);
            row
        })
        .collect()
}

fn attribute_storage_csi(item: &PreprocessedLineItem, ctx: &AttributionContext) -> PipelineResult<Vec<AttributedCostRow>> {
    let volumes: Vec<&VolumeDailySummary> = ctx
        .volumes
        .iter()
        .filter(|v| !v.csi_volume_handle.is_empty() && item.line_item.lineitem_resourceid.contains(v.csi_volume_handle.as_str()) && v.usage_start == item.line_item.usage_start)
        .collect();

    if volumes.is_empty() {
        return Ok(Vec::new());
    }

    let hours_in_month = Decimal::from(days_in_month(item.line_item.usage_start)) * literal!(24);
    let disk_capacity = if item.line_item.lineitem_unblendedrate.is_zero() || hours_in_month.is_zero() {
        Decimal::ZERO
    } else {
        (item.line_item.lineitem_unblendedcost / (item.line_item.lineitem_unblendedrate / hours_in_month)).round()
    };

    if disk_capacity.is_zero() {
        let claims_nonzero_capacity = volumes.iter().any(|v| !v.persistentvolumeclaim_capacity_gigabyte_months.is_zero());
        if claims_nonzero_capacity {
            return Err(PipelineError::AttributionInvariant {
                provider: ctx.provider.to_string(),
                stage: Stage::Attributing,
                message: format!(
                    "disk capacity computed as zero for resource {} on {} but matched PVC(s) carry nonzero capacity",
                    item.line_item.lineitem_resourceid, item.line_item.usage_start
                ),
            });
        }
        return Ok(Vec::new());
    }

    let mut claimed_ratio = Decimal::ZERO;
    let mut rows: Vec<AttributedCostRow> = volumes
        .iter()
        .map(|volume| {
            let ratio = volume.persistentvolumeclaim_capacity_gigabyte_months / disk_capacity;
            claimed_ratio += ratio;
            let mut row = base_row(item);
            row.cluster_id = volume.cluster_id.clone();
            row.cluster_alias = volume.cluster_alias.clone();
            row.namespace = if volume.namespace.is_empty() {
                reserved_namespace::STORAGE_UNATTRIBUTED.to_string()
            } else {
                volume.namespace.clone()
            };
            row.node = Some(volume.node.clone());
            row.persistentvolumeclaim = Some(volume.persistentvolumeclaim.clone());
            row.persistentvolume = Some(volume.persistentvolume.clone());
            row.storageclass = Some(volume.storageclass.clone());
            row.data_source = DataSource::Storage;
            row.cost = cost_share_of(item, ctx.markup).scaled_by(ratio);
            row
        })
        .collect();

    // Capacity no PVC claimed that day goes to the canonical cluster's
    // "Storage unattributed" bucket; single-cluster CSI matches fall into
    // this too whenever the disk's capacity exceeds the sum of matched claims.
    let residual_ratio = literal!(1) - claimed_ratio;
    if residual_ratio > Decimal::ZERO {
        if let Some(canonical) = canonical_cluster(volumes.iter().map(|v| v.cluster_id.as_str())) {
            let anchor = volumes.iter().find(|v| v.cluster_id == canonical).expect("canonical cluster came from volumes");
            let mut row = base_row(item);
            row.cluster_id = anchor.cluster_id.clone();
            row.cluster_alias = anchor.cluster_alias.clone();
            row.namespace = reserved_namespace::STORAGE_UNATTRIBUTED.to_string();
            row.storageclass = Some(anchor.storageclass.clone());
            row.data_source = DataSource::Storage;
            row.cost = cost_share_of(item, ctx.markup).scaled_by(residual_ratio);
            rows.push(row);
        }
    }

    Ok(rows)
}

fn attribute_tag_only_storage(item: &PreprocessedLineItem, ctx: &AttributionContext) -> Vec<AttributedCostRow> {
    let namespace = item
        .matched_tag
        .split(',')
        .find_map(|assertion| assertion.strip_prefix("openshift_project="))
        .unwrap_or_default()
        .to_string();
    let volume = ctx.volumes.iter().find(|v| v.namespace == namespace && v.usage_start == item.line_item.usage_start);

    let mut row = base_row(item);
    row.namespace = namespace;
    row.data_source = DataSource::Storage;
    if let Some(volume) = volume {
        row.cluster_id = volume.cluster_id.clone();
        row.cluster_alias = volume.cluster_alias.clone();
        row.node = Some(volume.node.clone());
        row.persistentvolumeclaim = Some(volume.persistentvolumeclaim.clone());
        row.persistentvolume = Some(volume.persistentvolume.clone());
        row.storageclass = Some(volume.storageclass.clone());
    }
    row.cost = cost_share_of(item, ctx.markup);
    vec![row]
}

fn attribute_network(item: &PreprocessedLineItem, direction: DataTransferDirection, ctx: &AttributionContext) -> Vec<AttributedCostRow> {
    let node = ctx
        .pods
        .iter()
        .find(|pod| !pod.resource_id.is_empty() && item.line_item.lineitem_resourceid.ends_with(pod.resource_id.as_str()) && pod.usage_start == item.line_item.usage_start);

    let mut row = base_row(item);
    row.namespace = reserved_namespace::NETWORK_UNATTRIBUTED.to_string();
    row.data_source = DataSource::Node;
    if let Some(pod) = node {
        row.cluster_id = pod.cluster_id.clone();
        row.cluster_alias = pod.cluster_alias.clone();
        row.node = Some(pod.node.clone());
    }
    match direction {
        DataTransferDirection::In => row.infrastructure_data_in_gigabytes = item.line_item.lineitem_usageamount,
        DataTransferDirection::Out => row.infrastructure_data_out_gigabytes = item.line_item.lineitem_usageamount,
    }
    row.cost = cost_share_of(item, ctx.markup);
    vec![row]
}

/// Splits residual CSI disk capacity not claimed by any PVC to the canonical
/// cluster for that volume: the cluster with the lexicographically smallest
/// `cluster_id` among those that reference the volume that day.
pub fn canonical_cluster<'a>(cluster_ids: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    cluster_ids.min()
}

/// Sum of every cost field a set of attributed rows carries for one
/// `(resource, day)`, used by tests verifying the "one unit in the last
/// preserved fractional place" invariant.
pub fn total_attributed_cost(rows: &[AttributedCostRow]) -> HashMap<&'static str, Decimal> {
    let mut totals = HashMap::new();
    let mut unblended = Decimal::ZERO;
    for row in rows {
        unblended += row.cost.unblended_cost;
    }
    totals.insert("unblended_cost", unblended);
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashMap as Map;

    fn sample_item() -> AwsLineItem {
        AwsLineItem {
            usage_start: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            lineitem_resourceid: "arn:aws:ec2:us-east-1:1234:instance/i-node1".into(),
            lineitem_productcode: "AmazonEC2".into(),
            product_productfamily: "Compute Instance".into(),
            product_productname: "Amazon Elastic Compute Cloud".into(),
            product_instancetype: Some("m5.large".into()),
            product_region: Some("us-east-1".into()),
            lineitem_usagetype: "BoxUsage".into(),
            lineitem_operation: "RunInstances".into(),
            lineitem_usageamount: literal!(24),
            lineitem_unblendedcost: literal!(10),
            lineitem_unblendedrate: literal!(0.5),
            lineitem_blendedcost: literal!(10),
            lineitem_lineitemtype: "Usage".into(),
            savingsplan_savingsplaneffectivecost: Decimal::ZERO,
            bill_billingentity: "AWS".into(),
            lineitem_usageaccountid: "1234".into(),
            lineitem_availabilityzone: Some("us-east-1a".into()),
            lineitem_currencycode: "USD".into(),
            pricing_unit: Some("Hrs".into()),
            resourcetags: Map::new(),
            costcategory: Map::new(),
        }
    }

    fn sample_pod() -> PodDailySummary {
        PodDailySummary {
            usage_start: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            cluster_id: "cluster-a".into(),
            cluster_alias: None,
            namespace: "ns-1".into(),
            node: "node1".into(),
            resource_id: "i-node1".into(),
            pod_usage_cpu_core_hours: literal!(12),
            pod_request_cpu_core_hours: literal!(12),
            pod_effective_usage_cpu_core_hours: literal!(12),
            pod_limit_cpu_core_hours: literal!(12),
            pod_usage_memory_gigabyte_hours: Decimal::ZERO,
            pod_request_memory_gigabyte_hours: Decimal::ZERO,
            pod_effective_usage_memory_gigabyte_hours: Decimal::ZERO,
            pod_limit_memory_gigabyte_hours: Decimal::ZERO,
            node_capacity_cpu_core_hours: literal!(24),
            node_capacity_memory_gigabyte_hours: Decimal::ZERO,
            cluster_capacity_cpu_core_hours: literal!(24),
            cluster_capacity_memory_gigabyte_hours: Decimal::ZERO,
            pod_labels: Map::new(),
        }
    }

    #[test]
    fn savings_plan_covered_usage_zeroes_unblended_and_blended() {
        let mut item = sample_item();
        item.lineitem_lineitemtype = "SavingsPlanCoveredUsage".into();
        item.savingsplan_savingsplaneffectivecost = literal!(5);
        let pre = preprocess(MatchedLineItem {
            line_item: item,
            resource_id_matched: true,
            matched_tag: String::new(),
            tags: Map::new(),
        });
        assert_eq!(pre.line_item.lineitem_unblendedcost, Decimal::ZERO);
        assert_eq!(pre.calculated_amortized_cost, literal!(5));
    }

    #[test]
    fn compute_attribution_scales_by_usage_ratio() {
        let pods = vec![sample_pod()];
        let ctx = AttributionContext {
            pods: &pods,
            volumes: &[],
            markup: Decimal::ZERO,
            provider: "OCP_AWS",
        };
        let matched = vec![MatchedLineItem {
            line_item: sample_item(),
            resource_id_matched: true,
            matched_tag: String::new(),
            tags: Map::new(),
        }];
        let rows = attribute(matched, &ctx).expect("attribution should succeed");
        assert_eq!(rows.len(), 1);
        // usage ratio 12/24 = 0.5, cost 10 -> 5
        assert_eq!(rows[0].cost.unblended_cost, literal!(5));
        assert_eq!(rows[0].namespace, "ns-1");
    }

    #[test]
    fn data_transfer_direction_detected_from_usage_type() {
        let mut item = sample_item();
        item.product_productfamily = "Data Transfer".into();
        item.lineitem_usagetype = "USE1-In-Bytes".into();
        assert_eq!(derive_data_transfer_direction(&item), Some(DataTransferDirection::In));
    }

    #[test]
    fn canonical_cluster_picks_lexicographically_smallest() {
        let clusters = vec!["cluster-b", "cluster-a", "cluster-c"];
        assert_eq!(canonical_cluster(clusters.into_iter()), Some("cluster-a"));
    }

    fn sample_volume(pvc: &str, capacity: Decimal) -> VolumeDailySummary {
        VolumeDailySummary {
            usage_start: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            cluster_id: "cluster-a".into(),
            cluster_alias: None,
            namespace: "ns-1".into(),
            node: "node1".into(),
            persistentvolumeclaim: pvc.into(),
            persistentvolume: format!("pv-{pvc}"),
            storageclass: "gp2".into(),
            csi_volume_handle: "vol-handle-1".into(),
            persistentvolumeclaim_capacity_gigabyte_months: capacity,
            persistentvolumeclaim_usage_gigabyte_months: Decimal::ZERO,
            volume_request_storage_gigabyte_months: Decimal::ZERO,
            volume_labels: Map::new(),
            all_labels: Map::new(),
        }
    }

    #[test]
    fn storage_csi_match_splits_residual_to_unattributed_namespace() {
        let mut item = sample_item();
        item.lineitem_resourceid = "arn:aws:ec2:us-east-1:1234:volume/vol-handle-1".into();
        item.lineitem_productcode = "AmazonEC2".into();
        item.product_productfamily = "Storage".into();
        item.lineitem_unblendedcost = literal!(20);
        let hours_in_month = Decimal::from(days_in_month(item.usage_start)) * literal!(24);
        item.lineitem_unblendedrate = literal!(0.5) * hours_in_month;

        // disk_capacity = 20 / (rate/hours) = 40; claimed 20 is half the disk.
        let volumes = vec![sample_volume("pvc-1", literal!(20))];
        let ctx = AttributionContext {
            pods: &[],
            volumes: &volumes,
            markup: Decimal::ZERO,
            provider: "OCP_AWS",
        };
        let matched = vec![MatchedLineItem {
            line_item: item,
            resource_id_matched: true,
            matched_tag: String::new(),
            tags: Map::new(),
        }];
        let rows = attribute(matched, &ctx).expect("attribution should succeed");
        assert_eq!(rows.len(), 2);
        let claimed = rows.iter().find(|r| r.namespace == "ns-1").unwrap();
        let residual = rows.iter().find(|r| r.namespace == reserved_namespace::STORAGE_UNATTRIBUTED).unwrap();
        assert_eq!(claimed.cost.unblended_cost, literal!(10));
        assert_eq!(residual.cost.unblended_cost, literal!(10));
        assert_eq!(residual.cluster_id, "cluster-a");
    }

    #[test]
    fn zero_disk_capacity_against_nonzero_pvc_claim_is_fatal() {
        let mut item = sample_item();
        item.lineitem_resourceid = "arn:aws:ec2:us-east-1:1234:volume/vol-handle-1".into();
        item.lineitem_productcode = "AmazonEC2".into();
        item.product_productfamily = "Storage".into();
        item.lineitem_unblendedcost = literal!(20);
        // rate left at zero -> disk_capacity computes to zero.
        item.lineitem_unblendedrate = Decimal::ZERO;

        let volumes = vec![sample_volume("pvc-1", literal!(20))];
        let ctx = AttributionContext {
            pods: &[],
            volumes: &volumes,
            markup: Decimal::ZERO,
            provider: "OCP_AWS",
        };
        let matched = vec![MatchedLineItem {
            line_item: item,
            resource_id_matched: true,
            matched_tag: String::new(),
            tags: Map::new(),
        }];
        let err = attribute(matched, &ctx).expect_err("zero disk capacity against a nonzero claim must be fatal");
        assert!(matches!(err, PipelineError::AttributionInvariant { .. }));
    }

    #[test]
    fn tag_only_storage_fires_when_project_assertion_is_not_first() {
        let mut item = sample_item();
        item.bill_billingentity = "AWS".into();
        item.lineitem_unblendedcost = literal!(10);
        let ctx = AttributionContext {
            pods: &[],
            volumes: &[],
            markup: Decimal::ZERO,
            provider: "OCP_AWS",
        };
        let matched = vec![MatchedLineItem {
            line_item: item,
            resource_id_matched: false,
            matched_tag: "openshift_cluster=cluster-a,openshift_project=prod-app".to_string(),
            tags: Map::new(),
        }];
        let rows = attribute(matched, &ctx).expect("attribution should succeed");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].namespace, "prod-app");
        assert_eq!(rows[0].cost.unblended_cost, literal!(10));
    }
}
