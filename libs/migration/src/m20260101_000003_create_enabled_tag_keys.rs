use sea_orm_migration::{prelude::*, schema::*};

/// Backs the enabled-tag-key cache: an operator-curated allow list of
/// AWS/OCP tag keys, on top of the fixed set `domain_cost_aggregation`
/// always carries regardless of what this table holds.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EnabledTagKeys::Table)
                    .if_not_exists()
                    .col(pk_uuid(EnabledTagKeys::Uuid))
                    .col(string_uniq(EnabledTagKeys::Key))
                    .col(boolean(EnabledTagKeys::Enabled).default(true))
                    .col(
                        timestamp_with_time_zone(EnabledTagKeys::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EnabledTagKeys::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum EnabledTagKeys {
    Table,
    Uuid,
    Key,
    Enabled,
    CreatedAt,
}
