//! OCP-on-AWS aggregator: groups the attributed-cost stream into
//! the nine pre-aggregated output tables the warehouse writer persists.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::model::{DataSource, Labels};
use crate::summary::{AttributedCostRow, CostShare};

/// Generic grouped-and-summed row: every output table shares this shape,
/// differing only in which descriptive columns are carried in `key` and
/// which rows are admitted by the caller's filter.
#[derive(Clone, Debug)]
pub struct GroupedCostRow<K> {
    pub key: K,
    pub cluster_id: String,
    pub cluster_alias: Option<String>,
    pub currency_code: Option<String>,
    pub cost: CostShare,
}

fn group_by<K, F>(rows: &[AttributedCostRow], key_fn: F) -> Vec<GroupedCostRow<K>>
where
    K: std::hash::Hash + Eq + Clone,
    F: Fn(&AttributedCostRow) -> K,
{
    struct Accumulator {
        cluster_id: String,
        cluster_alias: Option<String>,
        currency_code: Option<String>,
        cost: CostShare,
    }

    let mut groups: HashMap<K, Accumulator> = HashMap::new();
    for row in rows {
        let key = key_fn(row);
        let entry = groups.entry(key).or_insert_with(|| Accumulator {
            cluster_id: row.cluster_id.clone(),
            cluster_alias: row.cluster_alias.clone(),
            currency_code: row.currency_code.clone(),
            cost: CostShare::default(),
        });
        entry.cluster_id = entry.cluster_id.clone().max(row.cluster_id.clone());
        if row.cluster_alias.is_some() {
            entry.cluster_alias = entry.cluster_alias.clone().max(row.cluster_alias.clone());
        }
        if row.currency_code.is_some() {
            entry.currency_code = entry.currency_code.clone().max(row.currency_code.clone());
        }
        entry.cost.add(&row.cost);
    }

    groups
        .into_iter()
        .map(|(key, acc)| GroupedCostRow {
            key,
            cluster_id: acc.cluster_id,
            cluster_alias: acc.cluster_alias,
            currency_code: acc.currency_code,
            cost: acc.cost,
        })
        .collect()
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct DetailedLineItemKey {
    pub usage_start: NaiveDate,
    pub data_source: DataSourceKey,
    pub namespace: String,
    pub node: Option<String>,
    pub persistentvolumeclaim: Option<String>,
    pub persistentvolume: Option<String>,
    pub storageclass: Option<String>,
    pub resource_id: Option<String>,
    pub product_code: Option<String>,
    pub instance_type: Option<String>,
    pub usage_account_id: Option<String>,
    pub availability_zone: Option<String>,
    pub region: Option<String>,
    pub unit: Option<String>,
    pub data_transfer_direction: Option<DataTransferDirectionKey>,
}

/// `DataSource` wrapped so `GroupedCostRow`'s key can derive `Hash`/`Eq`
/// without requiring those on `DataSource` itself elsewhere in the crate.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum DataSourceKey {
    Pod,
    Storage,
    Node,
}

impl From<DataSource> for DataSourceKey {
    fn from(value: DataSource) -> Self {
        match value {
            DataSource::Pod => DataSourceKey::Pod,
            DataSource::Storage => DataSourceKey::Storage,
            DataSource::Node => DataSourceKey::Node,
        }
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum DataTransferDirectionKey {
    In,
    Out,
}

/// Detailed line item row: the one output granular enough that the
/// per-AWS-row match bookkeeping (`§3`'s `tags`, `resource_id_matched`,
/// `tag_matched`, `aws_cost_category`) still belongs on it, even though the
/// generic `GroupedCostRow` the other eight outputs use has no room for it.
#[derive(Clone, Debug)]
pub struct DetailedLineItemRow {
    pub key: DetailedLineItemKey,
    pub cluster_id: String,
    pub cluster_alias: Option<String>,
    pub currency_code: Option<String>,
    pub cost: CostShare,
    pub tags: Labels,
    pub aws_cost_category: Labels,
    pub resource_id_matched: bool,
    pub tag_matched: String,
    pub usage_amount: Decimal,
    pub infrastructure_data_in_gigabytes: Decimal,
    pub infrastructure_data_out_gigabytes: Decimal,
}

pub fn detailed_line_items(rows: &[AttributedCostRow]) -> Vec<DetailedLineItemRow> {
    struct Accumulator {
        cluster_id: String,
        cluster_alias: Option<String>,
        currency_code: Option<String>,
        cost: CostShare,
        tags: Labels,
        aws_cost_category: Labels,
        resource_id_matched: bool,
        tag_matched: Vec<String>,
        usage_amount: Decimal,
        infrastructure_data_in_gigabytes: Decimal,
        infrastructure_data_out_gigabytes: Decimal,
    }

    let mut groups: HashMap<DetailedLineItemKey, Accumulator> = HashMap::new();
    for row in rows {
        let key = DetailedLineItemKey {
            usage_start: row.usage_start,
            data_source: row.data_source.into(),
            namespace: row.namespace.clone(),
            node: row.node.clone(),
            persistentvolumeclaim: row.persistentvolumeclaim.clone(),
            persistentvolume: row.persistentvolume.clone(),
            storageclass: row.storageclass.clone(),
            resource_id: row.resource_id.clone(),
            product_code: row.product_code.clone(),
            instance_type: row.instance_type.clone(),
            usage_account_id: row.usage_account_id.clone(),
            availability_zone: row.availability_zone.clone(),
            region: row.region.clone(),
            unit: row.unit.clone(),
            data_transfer_direction: row.data_transfer_direction.map(|d| match d {
                crate::model::DataTransferDirection::In => DataTransferDirectionKey::In,
                crate::model::DataTransferDirection::Out => DataTransferDirectionKey::Out,
            }),
        };
        let entry = groups.entry(key).or_insert_with(|| Accumulator {
            cluster_id: row.cluster_id.clone(),
            cluster_alias: row.cluster_alias.clone(),
            currency_code: row.currency_code.clone(),
            cost: CostShare::default(),
            tags: Labels::new(),
            aws_cost_category: Labels::new(),
            resource_id_matched: false,
            tag_matched: Vec::new(),
            usage_amount: Decimal::ZERO,
            infrastructure_data_in_gigabytes: Decimal::ZERO,
            infrastructure_data_out_gigabytes: Decimal::ZERO,
        });
        entry.cluster_id = entry.cluster_id.clone().max(row.cluster_id.clone());
        if row.cluster_alias.is_some() {
            entry.cluster_alias = entry.cluster_alias.clone().max(row.cluster_alias.clone());
        }
        if row.currency_code.is_some() {
            entry.currency_code = entry.currency_code.clone().max(row.currency_code.clone());
        }
        entry.cost.add(&row.cost);
        for (k, v) in &row.tags {
            entry.tags.insert(k.clone(), v.clone());
        }
        for (k, v) in &row.aws_cost_category {
            entry.aws_cost_category.insert(k.clone(), v.clone());
        }
        entry.resource_id_matched |= row.resource_id_matched;
        if !row.tag_matched.is_empty() && !entry.tag_matched.iter().any(|existing| existing == &row.tag_matched) {
            entry.tag_matched.push(row.tag_matched.clone());
        }
        entry.usage_amount += row.usage_amount;
        entry.infrastructure_data_in_gigabytes += row.infrastructure_data_in_gigabytes;
        entry.infrastructure_data_out_gigabytes += row.infrastructure_data_out_gigabytes;
    }

    groups
        .into_iter()
        .map(|(key, acc)| DetailedLineItemRow {
            key,
            cluster_id: acc.cluster_id,
            cluster_alias: acc.cluster_alias,
            currency_code: acc.currency_code,
            cost: acc.cost,
            tags: acc.tags,
            aws_cost_category: acc.aws_cost_category,
            resource_id_matched: acc.resource_id_matched,
            tag_matched: acc.tag_matched.join(","),
            usage_amount: acc.usage_amount,
            infrastructure_data_in_gigabytes: acc.infrastructure_data_in_gigabytes,
            infrastructure_data_out_gigabytes: acc.infrastructure_data_out_gigabytes,
        })
        .collect()
}

pub fn cluster_totals(rows: &[AttributedCostRow]) -> Vec<GroupedCostRow<NaiveDate>> {
    group_by(rows, |row| row.usage_start)
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ByAccountKey {
    pub usage_start: NaiveDate,
    pub usage_account_id: Option<String>,
}

pub fn by_account(rows: &[AttributedCostRow]) -> Vec<GroupedCostRow<ByAccountKey>> {
    group_by(rows, |row| ByAccountKey {
        usage_start: row.usage_start,
        usage_account_id: row.usage_account_id.clone(),
    })
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ByServiceKey {
    pub usage_start: NaiveDate,
    pub usage_account_id: Option<String>,
    pub product_code: Option<String>,
    pub product_family: Option<String>,
}

pub fn by_service(rows: &[AttributedCostRow]) -> Vec<GroupedCostRow<ByServiceKey>> {
    group_by(rows, |row| ByServiceKey {
        usage_start: row.usage_start,
        usage_account_id: row.usage_account_id.clone(),
        product_code: row.product_code.clone(),
        product_family: row.product_family.clone(),
    })
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ByRegionKey {
    pub usage_start: NaiveDate,
    pub usage_account_id: Option<String>,
    pub region: Option<String>,
    pub availability_zone: Option<String>,
}

pub fn by_region(rows: &[AttributedCostRow]) -> Vec<GroupedCostRow<ByRegionKey>> {
    group_by(rows, |row| ByRegionKey {
        usage_start: row.usage_start,
        usage_account_id: row.usage_account_id.clone(),
        region: row.region.clone(),
        availability_zone: row.availability_zone.clone(),
    })
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ComputeSummaryKey {
    pub usage_start: NaiveDate,
    pub usage_account_id: Option<String>,
    pub instance_type: Option<String>,
    pub resource_id: Option<String>,
}

pub fn compute_summary(rows: &[AttributedCostRow]) -> Vec<GroupedCostRow<ComputeSummaryKey>> {
    let filtered: Vec<AttributedCostRow> = rows.iter().filter(|row| row.instance_type.is_some()).cloned().collect();
    group_by(&filtered, |row| ComputeSummaryKey {
        usage_start: row.usage_start,
        usage_account_id: row.usage_account_id.clone(),
        instance_type: row.instance_type.clone(),
        resource_id: row.resource_id.clone(),
    })
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct StorageSummaryKey {
    pub usage_start: NaiveDate,
    pub usage_account_id: Option<String>,
    pub product_family: Option<String>,
}

pub fn storage_summary(rows: &[AttributedCostRow]) -> Vec<GroupedCostRow<StorageSummaryKey>> {
    let filtered: Vec<AttributedCostRow> = rows
        .iter()
        .filter(|row| {
            row.product_family.as_deref().is_some_and(|family| family.contains("Storage")) && row.unit.as_deref() == Some("GB-Mo")
        })
        .cloned()
        .collect();
    group_by(&filtered, |row| StorageSummaryKey {
        usage_start: row.usage_start,
        usage_account_id: row.usage_account_id.clone(),
        product_family: row.product_family.clone(),
    })
}

const DATABASE_PRODUCT_CODES: &[&str] = &["AmazonRDS", "AmazonDynamoDB", "AmazonElastiCache", "AmazonNeptune", "AmazonRedshift", "AmazonDocumentDB"];
const NETWORK_PRODUCT_CODES: &[&str] = &["AmazonVPC", "AmazonCloudFront", "AmazonRoute53", "AmazonAPIGateway"];

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ProductCodeSummaryKey {
    pub usage_start: NaiveDate,
    pub usage_account_id: Option<String>,
    pub product_code: Option<String>,
}

pub fn database_summary(rows: &[AttributedCostRow]) -> Vec<GroupedCostRow<ProductCodeSummaryKey>> {
    filtered_by_product_code(rows, DATABASE_PRODUCT_CODES)
}

pub fn network_summary(rows: &[AttributedCostRow]) -> Vec<GroupedCostRow<ProductCodeSummaryKey>> {
    filtered_by_product_code(rows, NETWORK_PRODUCT_CODES)
}

fn filtered_by_product_code(rows: &[AttributedCostRow], codes: &[&str]) -> Vec<GroupedCostRow<ProductCodeSummaryKey>> {
    let filtered: Vec<AttributedCostRow> = rows
        .iter()
        .filter(|row| row.product_code.as_deref().is_some_and(|code| codes.contains(&code)))
        .cloned()
        .collect();
    group_by(&filtered, |row| ProductCodeSummaryKey {
        usage_start: row.usage_start,
        usage_account_id: row.usage_account_id.clone(),
        product_code: row.product_code.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Labels;

    fn row(usage_start: NaiveDate, namespace: &str, product_code: &str, cost: Decimal) -> AttributedCostRow {
        AttributedCostRow {
            usage_start,
            cluster_id: "cluster-a".into(),
            cluster_alias: None,
            data_source: DataSource::Pod,
            namespace: namespace.into(),
            node: Some("node-1".into()),
            persistentvolumeclaim: None,
            persistentvolume: None,
            storageclass: None,
            resource_id: Some("i-abc".into()),
            product_code: Some(product_code.into()),
            product_family: Some("Compute Instance".into()),
            instance_type: Some("m5.large".into()),
            usage_account_id: Some("1234".into()),
            availability_zone: None,
            region: None,
            unit: Some("Hrs".into()),
            usage_amount: Decimal::ZERO,
            currency_code: Some("USD".into()),
            tags: Labels::new(),
            aws_cost_category: Labels::new(),
            resource_id_matched: true,
            tag_matched: String::new(),
            data_transfer_direction: None,
            infrastructure_data_in_gigabytes: Decimal::ZERO,
            infrastructure_data_out_gigabytes: Decimal::ZERO,
            cost: CostShare {
                unblended_cost: cost,
                ..Default::default()
            },
        }
    }

    #[test]
    fn cluster_totals_sums_across_namespaces() {
        let day = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let rows = vec![row(day, "ns-1", "AmazonEC2", rust_decimal_macros::dec!(5)), row(day, "ns-2", "AmazonEC2", rust_decimal_macros::dec!(7))];
        let totals = cluster_totals(&rows);
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].cost.unblended_cost, rust_decimal_macros::dec!(12));
    }

    #[test]
    fn database_summary_only_admits_known_product_codes() {
        let day = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let rows = vec![row(day, "ns-1", "AmazonRDS", rust_decimal_macros::dec!(5)), row(day, "ns-1", "AmazonEC2", rust_decimal_macros::dec!(7))];
        let summary = database_summary(&rows);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].cost.unblended_cost, rust_decimal_macros::dec!(5));
    }

    #[test]
    fn compute_summary_excludes_rows_without_instance_type() {
        let day = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let mut no_instance = row(day, "ns-1", "AmazonEC2", rust_decimal_macros::dec!(5));
        no_instance.instance_type = None;
        let rows = vec![no_instance];
        assert!(compute_summary(&rows).is_empty());
    }

    #[test]
    fn detailed_line_items_preserves_match_bookkeeping() {
        let day = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let mut tagged = row(day, "ns-1", "AmazonEC2", rust_decimal_macros::dec!(5));
        tagged.resource_id_matched = false;
        tagged.tag_matched = "openshift_project".into();
        tagged.tags.insert("env".into(), "prod".into());
        tagged.usage_amount = rust_decimal_macros::dec!(2);
        tagged.infrastructure_data_in_gigabytes = rust_decimal_macros::dec!(1.5);

        let mut resource_matched = row(day, "ns-1", "AmazonEC2", rust_decimal_macros::dec!(3));
        resource_matched.resource_id_matched = true;
        resource_matched.tag_matched = String::new();
        resource_matched.usage_amount = rust_decimal_macros::dec!(1);

        let rows = vec![tagged, resource_matched];
        let detailed = detailed_line_items(&rows);
        assert_eq!(detailed.len(), 1);
        let merged = &detailed[0];
        assert!(merged.resource_id_matched, "resource_id_matched must OR across merged AWS rows");
        assert_eq!(merged.tag_matched, "openshift_project");
        assert_eq!(merged.tags.get("env").map(String::as_str), Some("prod"));
        assert_eq!(merged.usage_amount, rust_decimal_macros::dec!(3));
        assert_eq!(merged.infrastructure_data_in_gigabytes, rust_decimal_macros::dec!(1.5));
        assert_eq!(merged.cost.unblended_cost, rust_decimal_macros::dec!(8));
    }
}
