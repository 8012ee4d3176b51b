pub use sea_orm_migration::prelude::*;

mod m20241128_000000_bootstrap;
mod m20260101_000001_create_ocp_summary;
mod m20260101_000002_create_ocp_on_aws_summary;
mod m20260101_000003_create_enabled_tag_keys;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20241128_000000_bootstrap::Migration),
            Box::new(m20260101_000001_create_ocp_summary::Migration),
            Box::new(m20260101_000002_create_ocp_on_aws_summary::Migration),
            Box::new(m20260101_000003_create_enabled_tag_keys::Migration),
        ]
    }
}
