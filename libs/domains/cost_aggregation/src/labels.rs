//! Label engine: precedence merge, enabled-tag-key filtering, and
//! the substring-based generic tag match used by the resource matcher as a
//! fallback when suffix/substring/tag-equality matching fails.

use crate::model::{EnabledTagKeys, Labels};

/// Drops any key not present in `allowed_keys`. Value strings are opaque;
/// insertion order is not meaningful.
pub fn filter(labels: &Labels, allowed_keys: &EnabledTagKeys) -> Labels {
    labels
        .iter()
        .filter(|(k, _)| allowed_keys.contains(k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Merges three label sources by precedence: pod overrides namespace
/// overrides node. Empty-string values are treated as absent at every level,
/// so a pod-level empty override falls through to namespace/node.
pub fn merge_precedence(pod: &Labels, namespace: &Labels, node: &Labels) -> Labels {
    let mut merged = Labels::new();
    for source in [node, namespace, pod] {
        for (key, value) in source {
            if value.is_empty() {
                continue;
            }
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// True iff at least one key of `aws_tags` appears as a case-sensitive
/// substring of the serialised OCP label blob. This tolerates label blobs
/// that are not strictly parseable JSON, matching the reference SQL engine's
/// `LIKE '%key%'` behaviour.
pub fn generic_match(aws_tags: &Labels, ocp_label_blob: &str) -> bool {
    aws_tags.keys().any(|key| ocp_label_blob.contains(key.as_str()))
}

/// Same as `generic_match` but returns the first matching key, for callers
/// (the resource matcher) that need to record which tag triggered the match.
pub fn first_generic_match<'a>(aws_tags: &'a Labels, ocp_label_blob: &str) -> Option<&'a str> {
    aws_tags
        .keys()
        .find(|key| ocp_label_blob.contains(key.as_str()))
        .map(String::as_str)
}

/// Serialises a label map the same way it is carried in `tags`/`*_labels`
/// summary-row columns, and the same representation `generic_match` scans.
pub fn serialize(labels: &Labels) -> String {
    serde_json::to_string(labels).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn filter_drops_keys_outside_allow_list() {
        let allowed = EnabledTagKeys::new(HashSet::from(["env".to_string()]));
        let input = labels(&[("env", "prod"), ("team", "sre")]);
        let filtered = filter(&input, &allowed);
        assert_eq!(filtered.get("env"), Some(&"prod".to_string()));
        assert!(!filtered.contains_key("team"));
    }

    #[test]
    fn filter_always_keeps_vm_kubevirt_name() {
        let allowed = EnabledTagKeys::new(HashSet::new());
        let input = labels(&[("vm_kubevirt_io_name", "vm1")]);
        let filtered = filter(&input, &allowed);
        assert_eq!(filtered.get("vm_kubevirt_io_name"), Some(&"vm1".to_string()));
    }

    #[test]
    fn merge_precedence_pod_wins_over_namespace_and_node() {
        let pod = labels(&[("env", "pod-value")]);
        let namespace = labels(&[("env", "ns-value"), ("team", "ns-team")]);
        let node = labels(&[("env", "node-value"), ("zone", "us-east")]);
        let merged = merge_precedence(&pod, &namespace, &node);
        assert_eq!(merged.get("env"), Some(&"pod-value".to_string()));
        assert_eq!(merged.get("team"), Some(&"ns-team".to_string()));
        assert_eq!(merged.get("zone"), Some(&"us-east".to_string()));
    }

    #[test]
    fn merge_precedence_empty_pod_value_falls_through() {
        let pod = labels(&[("env", "")]);
        let namespace = labels(&[("env", "ns-value")]);
        let node = Labels::new();
        let merged = merge_precedence(&pod, &namespace, &node);
        assert_eq!(merged.get("env"), Some(&"ns-value".to_string()));
    }

    #[test]
    fn generic_match_is_case_sensitive_substring() {
        let tags = labels(&[("openshift_project", "ignored-value")]);
        assert!(generic_match(&tags, r#"{"openshift_project":"prod-app"}"#));
        assert!(!generic_match(&tags, r#"{"OPENSHIFT_PROJECT":"prod-app"}"#));
    }

    #[test]
    fn first_generic_match_returns_matching_key() {
        let tags = labels(&[("team", "x"), ("openshift_project", "y")]);
        let hit = first_generic_match(&tags, r#"{"openshift_project":"prod"}"#);
        assert_eq!(hit, Some("openshift_project"));
    }
}
