//! Enabled-tag-key cache: a read-only snapshot of which AWS/OCP
//! tag keys are allowed into a summary row, loaded once per provider before
//! attribution begins.

use std::collections::HashSet;

use sea_orm::{ConnectionTrait, DbErr, FromQueryResult, Statement};

use crate::model::EnabledTagKeys;

/// Loads the enabled tag keys configured for `schema` from the warehouse's
/// `enabled_tag_keys` table, always augmented with the fixed set from
/// `model::ALWAYS_ENABLED_TAG_KEYS`.
pub async fn load<C: ConnectionTrait>(db: &C, schema: &str) -> Result<EnabledTagKeys, DbErr> {
    #[derive(FromQueryResult)]
    struct Row {
        key: String,
    }

    let stmt = Statement::from_string(
        db.get_database_backend(),
        format!("SELECT key FROM {schema}.enabled_tag_keys WHERE enabled = true"),
    );

    let rows = Row::find_by_statement(stmt).all(db).await?;
    let keys: HashSet<String> = rows.into_iter().map(|r| r.key).collect();
    Ok(EnabledTagKeys::new(keys))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_enabled_keys_survive_an_empty_warehouse_set() {
        let keys = EnabledTagKeys::new(HashSet::new());
        assert!(keys.contains("openshift_cluster"));
        assert!(keys.contains("openshift_node"));
        assert!(keys.contains("openshift_project"));
        assert!(keys.contains("vm_kubevirt_io_name"));
    }
}
