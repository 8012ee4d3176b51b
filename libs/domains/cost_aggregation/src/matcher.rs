//! Resource matcher: annotates AWS line items with
//! `resource_id_matched`/`matched_tag` against OCP pod and volume records,
//! OCP-on-AWS mode only.

use std::collections::HashSet;

use crate::labels::{filter, first_generic_match, serialize};
use crate::model::{AwsLineItem, EnabledTagKeys, Labels, OcpPodRecord, OcpVolumeRecord};

/// An AWS line item after matching, carrying everything the cost attributor
/// needs plus the match bookkeeping the pipeline requires downstream.
#[derive(Clone, Debug)]
pub struct MatchedLineItem {
    pub line_item: AwsLineItem,
    pub resource_id_matched: bool,
    pub matched_tag: String,
    pub tags: Labels,
}

/// Known OCP identifiers a run's AWS rows are matched against.
pub struct MatchContext<'a> {
    pub node_resource_ids: HashSet<&'a str>,
    pub pv_names: HashSet<&'a str>,
    pub csi_handles: HashSet<&'a str>,
    pub cluster_id: &'a str,
    pub cluster_alias: Option<&'a str>,
    pub node_names: HashSet<&'a str>,
    pub namespaces: HashSet<&'a str>,
    /// Serialised `pod_labels`/`volume_labels` blob for every OCP pod and
    /// volume record, one entry each, for the step-5 generic tag fallback.
    pub ocp_label_blobs: Vec<String>,
}

impl<'a> MatchContext<'a> {
    pub fn build(pods: &'a [OcpPodRecord], volumes: &'a [OcpVolumeRecord], cluster_id: &'a str, cluster_alias: Option<&'a str>) -> Self {
        let node_resource_ids = pods
            .iter()
            .map(|p| p.resource_id.as_str())
            .filter(|id| !id.is_empty())
            .collect();
        let node_names = pods.iter().map(|p| p.node.as_str()).collect();
        let mut namespaces: HashSet<&str> = pods.iter().map(|p| p.namespace.as_str()).collect();
        namespaces.extend(volumes.iter().map(|v| v.namespace.as_str()));
        let pv_names = volumes
            .iter()
            .map(|v| v.persistentvolume.as_str())
            .filter(|name| !name.is_empty())
            .collect();
        let csi_handles = volumes
            .iter()
            .map(|v| v.csi_volume_handle.as_str())
            .filter(|handle| !handle.is_empty())
            .collect();
        let ocp_label_blobs = pods
            .iter()
            .map(|p| serialize(&p.pod_labels))
            .chain(volumes.iter().map(|v| serialize(&v.volume_labels)))
            .collect();
        Self {
            node_resource_ids,
            pv_names,
            csi_handles,
            cluster_id,
            cluster_alias,
            node_names,
            namespaces,
            ocp_label_blobs,
        }
    }
}

/// Runs the full match pipeline over one partition's AWS rows, discarding
/// rows that neither resource-match nor tag-match.
pub fn match_line_items(items: Vec<AwsLineItem>, ctx: &MatchContext, enabled_tag_keys: &EnabledTagKeys) -> Vec<MatchedLineItem> {
    items
        .into_iter()
        .filter_map(|item| match_one(item, ctx, enabled_tag_keys))
        .collect()
}

fn match_one(item: AwsLineItem, ctx: &MatchContext, enabled_tag_keys: &EnabledTagKeys) -> Option<MatchedLineItem> {
    let resource_id_matched = ctx.node_resource_ids.iter().any(|id| item.lineitem_resourceid.ends_with(id))
        || ctx.pv_names.iter().any(|pv| item.lineitem_resourceid.ends_with(pv))
        || ctx.csi_handles.iter().any(|handle| item.lineitem_resourceid.contains(handle));

    let tags = filter(&item.resourcetags, enabled_tag_keys);

    let mut assertions = Vec::new();
    if let Some(cluster_value) = tags.get("openshift_cluster") {
        if cluster_value == ctx.cluster_id || Some(cluster_value.as_str()) == ctx.cluster_alias {
            assertions.push(format!("openshift_cluster={cluster_value}"));
        }
    }
    if let Some(node_value) = tags.get("openshift_node") {
        if ctx.node_names.contains(node_value.as_str()) {
            assertions.push(format!("openshift_node={node_value}"));
        }
    }
    if let Some(project_value) = tags.get("openshift_project") {
        if ctx.namespaces.contains(project_value.as_str()) {
            assertions.push(format!("openshift_project={project_value}"));
        }
    }

    let mut matched_tag = assertions.join(",");

    if !resource_id_matched && matched_tag.is_empty() {
        if let Some(assertion) = generic_tag_match(&tags, &ctx.ocp_label_blobs) {
            matched_tag = assertion;
        }
    }

    if !resource_id_matched && matched_tag.is_empty() {
        return None;
    }

    Some(MatchedLineItem {
        line_item: item,
        resource_id_matched,
        matched_tag,
        tags,
    })
}

/// Step 5 fallback: substring-matches AWS tag keys against each OCP record's
/// serialised label blob, returning a `key=value` assertion for the first
/// hit (value taken from the AWS tag, same shape as the step-4 assertions).
fn generic_tag_match(tags: &Labels, ocp_label_blobs: &[String]) -> Option<String> {
    for blob in ocp_label_blobs {
        if let Some(key) = first_generic_match(tags, blob) {
            if let Some(value) = tags.get(key) {
                return Some(format!("{key}={value}"));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::collections::HashMap;

    fn line_item(resource_id: &str, tags: &[(&str, &str)]) -> AwsLineItem {
        AwsLineItem {
            usage_start: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            lineitem_resourceid: resource_id.to_string(),
            lineitem_productcode: "AmazonEC2".into(),
            product_productfamily: "Compute Instance".into(),
            product_productname: "Amazon Elastic Compute Cloud".into(),
            product_instancetype: Some("m5.large".into()),
            product_region: Some("us-east-1".into()),
            lineitem_usagetype: "BoxUsage".into(),
            lineitem_operation: "RunInstances".into(),
            lineitem_usageamount: Decimal::ZERO,
            lineitem_unblendedcost: Decimal::ZERO,
            lineitem_unblendedrate: Decimal::ZERO,
            lineitem_blendedcost: Decimal::ZERO,
            lineitem_lineitemtype: "Usage".into(),
            savingsplan_savingsplaneffectivecost: Decimal::ZERO,
            bill_billingentity: "AWS".into(),
            lineitem_usageaccountid: "1234".into(),
            lineitem_availabilityzone: Some("us-east-1a".into()),
            lineitem_currencycode: "USD".into(),
            pricing_unit: Some("Hrs".into()),
            resourcetags: tags.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            costcategory: HashMap::new(),
        }
    }

    #[test]
    fn node_suffix_match_sets_resource_id_matched() {
        let ctx = MatchContext {
            node_resource_ids: HashSet::from(["i-0abc123"]),
            pv_names: HashSet::new(),
            csi_handles: HashSet::new(),
            cluster_id: "cluster-a",
            cluster_alias: None,
            node_names: HashSet::new(),
            namespaces: HashSet::new(),
            ocp_label_blobs: Vec::new(),
        };
        let item = line_item("arn:aws:ec2:us-east-1:1234:instance/i-0abc123", &[]);
        let tag_keys = EnabledTagKeys::new(HashSet::new());
        let matched = match_one(item, &ctx, &tag_keys).expect("should match");
        assert!(matched.resource_id_matched);
    }

    #[test]
    fn unmatched_row_is_discarded() {
        let ctx = MatchContext {
            node_resource_ids: HashSet::new(),
            pv_names: HashSet::new(),
            csi_handles: HashSet::new(),
            cluster_id: "cluster-a",
            cluster_alias: None,
            node_names: HashSet::new(),
            namespaces: HashSet::new(),
            ocp_label_blobs: Vec::new(),
        };
        let item = line_item("arn:aws:ec2:us-east-1:1234:instance/i-unrelated", &[]);
        let tag_keys = EnabledTagKeys::new(HashSet::new());
        assert!(match_one(item, &ctx, &tag_keys).is_none());
    }

    #[test]
    fn tag_match_records_assertion() {
        let ctx = MatchContext {
            node_resource_ids: HashSet::new(),
            pv_names: HashSet::new(),
            csi_handles: HashSet::new(),
            cluster_id: "cluster-a",
            cluster_alias: None,
            node_names: HashSet::new(),
            namespaces: HashSet::from(["ns-1"]),
            ocp_label_blobs: Vec::new(),
        };
        let item = line_item("arn:aws:ec2:us-east-1:1234:instance/i-unrelated", &[("openshift_project", "ns-1")]);
        let tag_keys = EnabledTagKeys::new(HashSet::from(["openshift_project".to_string()]));
        let matched = match_one(item, &ctx, &tag_keys).expect("should match");
        assert!(!matched.resource_id_matched);
        assert_eq!(matched.matched_tag, "openshift_project=ns-1");
    }

    #[test]
    fn generic_tag_match_falls_back_to_ocp_label_blob_substring() {
        let ctx = MatchContext {
            node_resource_ids: HashSet::new(),
            pv_names: HashSet::new(),
            csi_handles: HashSet::new(),
            cluster_id: "cluster-a",
            cluster_alias: None,
            node_names: HashSet::new(),
            namespaces: HashSet::new(),
            ocp_label_blobs: vec![r#"{"team":"sre"}"#.to_string()],
        };
        let item = line_item("arn:aws:ec2:us-east-1:1234:instance/i-unrelated", &[("team", "billing-value")]);
        let tag_keys = EnabledTagKeys::new(HashSet::from(["team".to_string()]));
        let matched = match_one(item, &ctx, &tag_keys).expect("should match via generic fallback");
        assert!(!matched.resource_id_matched);
        assert_eq!(matched.matched_tag, "team=billing-value");
    }

    #[test]
    fn generic_tag_match_does_not_trivially_match_its_own_serialised_tags() {
        // Regression: the fallback must scan OCP label blobs, not the AWS
        // row's own filtered tags re-serialised (which would always match).
        let ctx = MatchContext {
            node_resource_ids: HashSet::new(),
            pv_names: HashSet::new(),
            csi_handles: HashSet::new(),
            cluster_id: "cluster-a",
            cluster_alias: None,
            node_names: HashSet::new(),
            namespaces: HashSet::new(),
            ocp_label_blobs: vec![r#"{"unrelated":"value"}"#.to_string()],
        };
        let item = line_item("arn:aws:ec2:us-east-1:1234:instance/i-unrelated", &[("team", "sre")]);
        let tag_keys = EnabledTagKeys::new(HashSet::from(["team".to_string()]));
        assert!(match_one(item, &ctx, &tag_keys).is_none());
    }
}
