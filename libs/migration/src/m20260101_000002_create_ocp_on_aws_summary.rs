use sea_orm_migration::{prelude::*, schema::*};

/// The nine grouped OCP-on-AWS outputs of `§4.7`. Every table shares the same
/// cost-field vocabulary (`unblended_cost` .. `markup_cost_amortized`) and the
/// same run-identity columns; they differ only in which descriptive columns
/// their `GROUP BY` tuple retains.
#[derive(DeriveMigrationName)]
pub struct Migration;

macro_rules! cost_columns {
    ($t:expr) => {
        $t.col(decimal_len_null(CostFields::UnblendedCost, 24, 9))
            .col(decimal_len_null(CostFields::MarkupCost, 24, 9))
            .col(decimal_len_null(CostFields::BlendedCost, 24, 9))
            .col(decimal_len_null(CostFields::MarkupCostBlended, 24, 9))
            .col(decimal_len_null(CostFields::SavingsplanEffectiveCost, 24, 9))
            .col(decimal_len_null(CostFields::MarkupCostSavingsplan, 24, 9))
            .col(decimal_len_null(CostFields::CalculatedAmortizedCost, 24, 9))
            .col(decimal_len_null(CostFields::MarkupCostAmortized, 24, 9))
    };
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Detailed line items: (day, cluster, data_source, namespace, node, pvc, pv,
        // storageclass, resource_id, product_code, instance_type, account, az, region,
        // unit, direction)
        manager
            .create_table({
                let mut t = Table::create();
                t.table(OcpAwsCostLineItemDaily::Table)
                    .if_not_exists()
                    .col(pk_uuid(OcpAwsCostLineItemDaily::Uuid))
                    .col(uuid(OcpAwsCostLineItemDaily::SourceUuid))
                    .col(integer(OcpAwsCostLineItemDaily::Year))
                    .col(integer(OcpAwsCostLineItemDaily::Month))
                    .col(date(OcpAwsCostLineItemDaily::UsageStart))
                    .col(string(OcpAwsCostLineItemDaily::ClusterId))
                    .col(string_null(OcpAwsCostLineItemDaily::ClusterAlias))
                    .col(string(OcpAwsCostLineItemDaily::DataSource))
                    .col(string(OcpAwsCostLineItemDaily::Namespace))
                    .col(string_null(OcpAwsCostLineItemDaily::Node))
                    .col(string_null(OcpAwsCostLineItemDaily::Persistentvolumeclaim))
                    .col(string_null(OcpAwsCostLineItemDaily::Persistentvolume))
                    .col(string_null(OcpAwsCostLineItemDaily::Storageclass))
                    .col(string_null(OcpAwsCostLineItemDaily::ResourceId))
                    .col(string_null(OcpAwsCostLineItemDaily::ProductCode))
                    .col(string_null(OcpAwsCostLineItemDaily::InstanceType))
                    .col(string_null(OcpAwsCostLineItemDaily::UsageAccountId))
                    .col(string_null(OcpAwsCostLineItemDaily::AvailabilityZone))
                    .col(string_null(OcpAwsCostLineItemDaily::Region))
                    .col(string_null(OcpAwsCostLineItemDaily::Unit))
                    .col(string_null(OcpAwsCostLineItemDaily::DataTransferDirection))
                    .col(decimal_len_null(OcpAwsCostLineItemDaily::UsageAmount, 24, 9))
                    .col(decimal_len_null(OcpAwsCostLineItemDaily::InfrastructureDataInGigabytes, 24, 9))
                    .col(decimal_len_null(OcpAwsCostLineItemDaily::InfrastructureDataOutGigabytes, 24, 9))
                    .col(string_null(OcpAwsCostLineItemDaily::CurrencyCode))
                    .col(json_null(OcpAwsCostLineItemDaily::Tags))
                    .col(boolean(OcpAwsCostLineItemDaily::ResourceIdMatched).default(false))
                    .col(string_null(OcpAwsCostLineItemDaily::TagMatched));
                cost_columns!(t)
                    .col(
                        timestamp_with_time_zone(OcpAwsCostLineItemDaily::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned()
            })
            .await?;

        // Cluster totals: (day)
        manager
            .create_table({
                let mut t = Table::create();
                t.table(OcpAwsCostDailySummary::Table)
                    .if_not_exists()
                    .col(pk_uuid(OcpAwsCostDailySummary::Uuid))
                    .col(uuid(OcpAwsCostDailySummary::SourceUuid))
                    .col(integer(OcpAwsCostDailySummary::Year))
                    .col(integer(OcpAwsCostDailySummary::Month))
                    .col(date(OcpAwsCostDailySummary::UsageStart))
                    .col(string_null(OcpAwsCostDailySummary::ClusterId))
                    .col(string_null(OcpAwsCostDailySummary::ClusterAlias))
                    .col(string_null(OcpAwsCostDailySummary::CurrencyCode));
                cost_columns!(t)
                    .col(
                        timestamp_with_time_zone(OcpAwsCostDailySummary::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned()
            })
            .await?;

        // By account: (day, usage_account_id, account_alias_id)
        manager
            .create_table({
                let mut t = Table::create();
                t.table(OcpAwsCostByAccountDailySummary::Table)
                    .if_not_exists()
                    .col(pk_uuid(OcpAwsCostByAccountDailySummary::Uuid))
                    .col(uuid(OcpAwsCostByAccountDailySummary::SourceUuid))
                    .col(integer(OcpAwsCostByAccountDailySummary::Year))
                    .col(integer(OcpAwsCostByAccountDailySummary::Month))
                    .col(date(OcpAwsCostByAccountDailySummary::UsageStart))
                    .col(string_null(OcpAwsCostByAccountDailySummary::UsageAccountId))
                    .col(string_null(OcpAwsCostByAccountDailySummary::AccountAliasId))
                    .col(string_null(OcpAwsCostByAccountDailySummary::ClusterId))
                    .col(string_null(OcpAwsCostByAccountDailySummary::ClusterAlias))
                    .col(string_null(OcpAwsCostByAccountDailySummary::CurrencyCode));
                cost_columns!(t)
                    .col(
                        timestamp_with_time_zone(OcpAwsCostByAccountDailySummary::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned()
            })
            .await?;

        // By service: (day, account, account_alias_id, product_code, product_family)
        manager
            .create_table({
                let mut t = Table::create();
                t.table(OcpAwsCostByServiceDailySummary::Table)
                    .if_not_exists()
                    .col(pk_uuid(OcpAwsCostByServiceDailySummary::Uuid))
                    .col(uuid(OcpAwsCostByServiceDailySummary::SourceUuid))
                    .col(integer(OcpAwsCostByServiceDailySummary::Year))
                    .col(integer(OcpAwsCostByServiceDailySummary::Month))
                    .col(date(OcpAwsCostByServiceDailySummary::UsageStart))
                    .col(string_null(OcpAwsCostByServiceDailySummary::UsageAccountId))
                    .col(string_null(OcpAwsCostByServiceDailySummary::AccountAliasId))
                    .col(string_null(OcpAwsCostByServiceDailySummary::ProductCode))
                    .col(string_null(OcpAwsCostByServiceDailySummary::ProductFamily))
                    .col(string_null(OcpAwsCostByServiceDailySummary::ClusterId))
                    .col(string_null(OcpAwsCostByServiceDailySummary::ClusterAlias))
                    .col(string_null(OcpAwsCostByServiceDailySummary::CurrencyCode));
                cost_columns!(t)
                    .col(
                        timestamp_with_time_zone(OcpAwsCostByServiceDailySummary::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned()
            })
            .await?;

        // By region: (day, account, account_alias_id, region, availability_zone)
        manager
            .create_table({
                let mut t = Table::create();
                t.table(OcpAwsCostByRegionDailySummary::Table)
                    .if_not_exists()
                    .col(pk_uuid(OcpAwsCostByRegionDailySummary::Uuid))
                    .col(uuid(OcpAwsCostByRegionDailySummary::SourceUuid))
                    .col(integer(OcpAwsCostByRegionDailySummary::Year))
                    .col(integer(OcpAwsCostByRegionDailySummary::Month))
                    .col(date(OcpAwsCostByRegionDailySummary::UsageStart))
                    .col(string_null(OcpAwsCostByRegionDailySummary::UsageAccountId))
                    .col(string_null(OcpAwsCostByRegionDailySummary::AccountAliasId))
                    .col(string_null(OcpAwsCostByRegionDailySummary::Region))
                    .col(string_null(OcpAwsCostByRegionDailySummary::AvailabilityZone))
                    .col(string_null(OcpAwsCostByRegionDailySummary::ClusterId))
                    .col(string_null(OcpAwsCostByRegionDailySummary::ClusterAlias))
                    .col(string_null(OcpAwsCostByRegionDailySummary::CurrencyCode));
                cost_columns!(t)
                    .col(
                        timestamp_with_time_zone(OcpAwsCostByRegionDailySummary::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned()
            })
            .await?;

        // Compute summary: (day, account, account_alias_id, instance_type, resource_id)
        manager
            .create_table({
                let mut t = Table::create();
                t.table(OcpAwsComputeSummary::Table)
                    .if_not_exists()
                    .col(pk_uuid(OcpAwsComputeSummary::Uuid))
                    .col(uuid(OcpAwsComputeSummary::SourceUuid))
                    .col(integer(OcpAwsComputeSummary::Year))
                    .col(integer(OcpAwsComputeSummary::Month))
                    .col(date(OcpAwsComputeSummary::UsageStart))
                    .col(string_null(OcpAwsComputeSummary::UsageAccountId))
                    .col(string_null(OcpAwsComputeSummary::AccountAliasId))
                    .col(string_null(OcpAwsComputeSummary::InstanceType))
                    .col(string_null(OcpAwsComputeSummary::ResourceId))
                    .col(string_null(OcpAwsComputeSummary::ClusterId))
                    .col(string_null(OcpAwsComputeSummary::ClusterAlias))
                    .col(string_null(OcpAwsComputeSummary::CurrencyCode));
                cost_columns!(t)
                    .col(
                        timestamp_with_time_zone(OcpAwsComputeSummary::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned()
            })
            .await?;

        // Storage summary: (day, account, account_alias_id, product_family), unit = GB-Mo
        manager
            .create_table({
                let mut t = Table::create();
                t.table(OcpAwsStorageSummary::Table)
                    .if_not_exists()
                    .col(pk_uuid(OcpAwsStorageSummary::Uuid))
                    .col(uuid(OcpAwsStorageSummary::SourceUuid))
                    .col(integer(OcpAwsStorageSummary::Year))
                    .col(integer(OcpAwsStorageSummary::Month))
                    .col(date(OcpAwsStorageSummary::UsageStart))
                    .col(string_null(OcpAwsStorageSummary::UsageAccountId))
                    .col(string_null(OcpAwsStorageSummary::AccountAliasId))
                    .col(string_null(OcpAwsStorageSummary::ProductFamily))
                    .col(string_null(OcpAwsStorageSummary::ClusterId))
                    .col(string_null(OcpAwsStorageSummary::ClusterAlias))
                    .col(string_null(OcpAwsStorageSummary::CurrencyCode));
                cost_columns!(t)
                    .col(
                        timestamp_with_time_zone(OcpAwsStorageSummary::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned()
            })
            .await?;

        // Database summary: (day, account, account_alias_id, product_code), fixed product set
        manager
            .create_table({
                let mut t = Table::create();
                t.table(OcpAwsDatabaseSummary::Table)
                    .if_not_exists()
                    .col(pk_uuid(OcpAwsDatabaseSummary::Uuid))
                    .col(uuid(OcpAwsDatabaseSummary::SourceUuid))
                    .col(integer(OcpAwsDatabaseSummary::Year))
                    .col(integer(OcpAwsDatabaseSummary::Month))
                    .col(date(OcpAwsDatabaseSummary::UsageStart))
                    .col(string_null(OcpAwsDatabaseSummary::UsageAccountId))
                    .col(string_null(OcpAwsDatabaseSummary::AccountAliasId))
                    .col(string_null(OcpAwsDatabaseSummary::ProductCode))
                    .col(string_null(OcpAwsDatabaseSummary::ClusterId))
                    .col(string_null(OcpAwsDatabaseSummary::ClusterAlias))
                    .col(string_null(OcpAwsDatabaseSummary::CurrencyCode));
                cost_columns!(t)
                    .col(
                        timestamp_with_time_zone(OcpAwsDatabaseSummary::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned()
            })
            .await?;

        // Network summary: (day, account, account_alias_id, product_code), fixed product set
        manager
            .create_table({
                let mut t = Table::create();
                t.table(OcpAwsNetworkSummary::Table)
                    .if_not_exists()
                    .col(pk_uuid(OcpAwsNetworkSummary::Uuid))
                    .col(uuid(OcpAwsNetworkSummary::SourceUuid))
                    .col(integer(OcpAwsNetworkSummary::Year))
                    .col(integer(OcpAwsNetworkSummary::Month))
                    .col(date(OcpAwsNetworkSummary::UsageStart))
                    .col(string_null(OcpAwsNetworkSummary::UsageAccountId))
                    .col(string_null(OcpAwsNetworkSummary::AccountAliasId))
                    .col(string_null(OcpAwsNetworkSummary::ProductCode))
                    .col(string_null(OcpAwsNetworkSummary::ClusterId))
                    .col(string_null(OcpAwsNetworkSummary::ClusterAlias))
                    .col(string_null(OcpAwsNetworkSummary::CurrencyCode));
                cost_columns!(t)
                    .col(
                        timestamp_with_time_zone(OcpAwsNetworkSummary::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned()
            })
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ocp_aws_line_item_run")
                    .table(OcpAwsCostLineItemDaily::Table)
                    .col(OcpAwsCostLineItemDaily::SourceUuid)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OcpAwsNetworkSummary::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OcpAwsDatabaseSummary::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OcpAwsStorageSummary::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OcpAwsComputeSummary::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OcpAwsCostByRegionDailySummary::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OcpAwsCostByServiceDailySummary::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OcpAwsCostByAccountDailySummary::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OcpAwsCostDailySummary::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OcpAwsCostLineItemDaily::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum CostFields {
    UnblendedCost,
    MarkupCost,
    BlendedCost,
    MarkupCostBlended,
    SavingsplanEffectiveCost,
    MarkupCostSavingsplan,
    CalculatedAmortizedCost,
    MarkupCostAmortized,
}

#[derive(DeriveIden)]
enum OcpAwsCostLineItemDaily {
    Table,
    Uuid,
    SourceUuid,
    Year,
    Month,
    UsageStart,
    ClusterId,
    ClusterAlias,
    DataSource,
    Namespace,
    Node,
    Persistentvolumeclaim,
    Persistentvolume,
    Storageclass,
    ResourceId,
    ProductCode,
    InstanceType,
    UsageAccountId,
    AvailabilityZone,
    Region,
    Unit,
    DataTransferDirection,
    UsageAmount,
    InfrastructureDataInGigabytes,
    InfrastructureDataOutGigabytes,
    CurrencyCode,
    Tags,
    ResourceIdMatched,
    TagMatched,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OcpAwsCostDailySummary {
    Table,
    Uuid,
    SourceUuid,
    Year,
    Month,
    UsageStart,
    ClusterId,
    ClusterAlias,
    CurrencyCode,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OcpAwsCostByAccountDailySummary {
    Table,
    Uuid,
    SourceUuid,
    Year,
    Month,
    UsageStart,
    UsageAccountId,
    AccountAliasId,
    ClusterId,
    ClusterAlias,
    CurrencyCode,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OcpAwsCostByServiceDailySummary {
    Table,
    Uuid,
    SourceUuid,
    Year,
    Month,
    UsageStart,
    UsageAccountId,
    AccountAliasId,
    ProductCode,
    ProductFamily,
    ClusterId,
    ClusterAlias,
    CurrencyCode,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OcpAwsCostByRegionDailySummary {
    Table,
    Uuid,
    SourceUuid,
    Year,
    Month,
    UsageStart,
    UsageAccountId,
    AccountAliasId,
    Region,
    AvailabilityZone,
    ClusterId,
    ClusterAlias,
    CurrencyCode,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OcpAwsComputeSummary {
    Table,
    Uuid,
    SourceUuid,
    Year,
    Month,
    UsageStart,
    UsageAccountId,
    AccountAliasId,
    InstanceType,
    ResourceId,
    ClusterId,
    ClusterAlias,
    CurrencyCode,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OcpAwsStorageSummary {
    Table,
    Uuid,
    SourceUuid,
    Year,
    Month,
    UsageStart,
    UsageAccountId,
    AccountAliasId,
    ProductFamily,
    ClusterId,
    ClusterAlias,
    CurrencyCode,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OcpAwsDatabaseSummary {
    Table,
    Uuid,
    SourceUuid,
    Year,
    Month,
    UsageStart,
    UsageAccountId,
    AccountAliasId,
    ProductCode,
    ClusterId,
    ClusterAlias,
    CurrencyCode,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OcpAwsNetworkSummary {
    Table,
    Uuid,
    SourceUuid,
    Year,
    Month,
    UsageStart,
    UsageAccountId,
    AccountAliasId,
    ProductCode,
    ClusterId,
    ClusterAlias,
    CurrencyCode,
    CreatedAt,
}
