use sea_orm_migration::{prelude::*, schema::*};

/// OCP-only summary rows (`§3 Summary row (OCP-only)`): one wide table keyed by
/// `(source_uuid, year, month)` per run, discriminated by `data_source`. Pod and
/// storage metrics share a table because both are emitted by the same run and
/// queried together per cluster/day; unused columns for a given `data_source`
/// are left null.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OcpUsageLineItemDailySummary::Table)
                    .if_not_exists()
                    .col(pk_uuid(OcpUsageLineItemDailySummary::Uuid))
                    .col(uuid(OcpUsageLineItemDailySummary::SourceUuid))
                    .col(integer(OcpUsageLineItemDailySummary::Year))
                    .col(integer(OcpUsageLineItemDailySummary::Month))
                    .col(date(OcpUsageLineItemDailySummary::UsageStart))
                    .col(string(OcpUsageLineItemDailySummary::ClusterId))
                    .col(string_null(OcpUsageLineItemDailySummary::ClusterAlias))
                    .col(string(OcpUsageLineItemDailySummary::DataSource))
                    .col(string(OcpUsageLineItemDailySummary::Namespace))
                    .col(string_null(OcpUsageLineItemDailySummary::Node))
                    .col(string_null(OcpUsageLineItemDailySummary::Pod))
                    .col(string_null(OcpUsageLineItemDailySummary::Persistentvolumeclaim))
                    .col(string_null(OcpUsageLineItemDailySummary::Persistentvolume))
                    .col(string_null(OcpUsageLineItemDailySummary::Storageclass))
                    .col(decimal_len_null(OcpUsageLineItemDailySummary::PodUsageCpuCoreHours, 24, 9))
                    .col(decimal_len_null(OcpUsageLineItemDailySummary::PodRequestCpuCoreHours, 24, 9))
                    .col(decimal_len_null(OcpUsageLineItemDailySummary::PodEffectiveUsageCpuCoreHours, 24, 9))
                    .col(decimal_len_null(OcpUsageLineItemDailySummary::PodLimitCpuCoreHours, 24, 9))
                    .col(decimal_len_null(OcpUsageLineItemDailySummary::PodUsageMemoryGigabyteHours, 24, 9))
                    .col(decimal_len_null(OcpUsageLineItemDailySummary::PodRequestMemoryGigabyteHours, 24, 9))
                    .col(decimal_len_null(OcpUsageLineItemDailySummary::PodEffectiveUsageMemoryGigabyteHours, 24, 9))
                    .col(decimal_len_null(OcpUsageLineItemDailySummary::PodLimitMemoryGigabyteHours, 24, 9))
                    .col(decimal_len_null(OcpUsageLineItemDailySummary::NodeCapacityCpuCoreHours, 24, 9))
                    .col(decimal_len_null(OcpUsageLineItemDailySummary::NodeCapacityMemoryGigabyteHours, 24, 9))
                    .col(decimal_len_null(OcpUsageLineItemDailySummary::ClusterCapacityCpuCoreHours, 24, 9))
                    .col(decimal_len_null(OcpUsageLineItemDailySummary::ClusterCapacityMemoryGigabyteHours, 24, 9))
                    .col(decimal_len_null(OcpUsageLineItemDailySummary::PersistentvolumeclaimCapacityGigabyteMonths, 24, 9))
                    .col(decimal_len_null(OcpUsageLineItemDailySummary::PersistentvolumeclaimUsageGigabyteMonths, 24, 9))
                    .col(decimal_len_null(OcpUsageLineItemDailySummary::VolumeRequestStorageGigabyteMonths, 24, 9))
                    .col(json_null(OcpUsageLineItemDailySummary::PodLabels))
                    .col(json_null(OcpUsageLineItemDailySummary::VolumeLabels))
                    .col(json_null(OcpUsageLineItemDailySummary::AllLabels))
                    .col(
                        timestamp_with_time_zone(OcpUsageLineItemDailySummary::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ocp_usage_run")
                    .table(OcpUsageLineItemDailySummary::Table)
                    .col(OcpUsageLineItemDailySummary::SourceUuid)
                    .col(OcpUsageLineItemDailySummary::Year)
                    .col(OcpUsageLineItemDailySummary::Month)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ocp_usage_cluster_day")
                    .table(OcpUsageLineItemDailySummary::Table)
                    .col(OcpUsageLineItemDailySummary::ClusterId)
                    .col(OcpUsageLineItemDailySummary::UsageStart)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OcpUsageLineItemDailySummary::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum OcpUsageLineItemDailySummary {
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
    Pod,
    Persistentvolumeclaim,
    Persistentvolume,
    Storageclass,
    PodUsageCpuCoreHours,
    PodRequestCpuCoreHours,
    PodEffectiveUsageCpuCoreHours,
    PodLimitCpuCoreHours,
    PodUsageMemoryGigabyteHours,
    PodRequestMemoryGigabyteHours,
    PodEffectiveUsageMemoryGigabyteHours,
    PodLimitMemoryGigabyteHours,
    NodeCapacityCpuCoreHours,
    NodeCapacityMemoryGigabyteHours,
    ClusterCapacityCpuCoreHours,
    ClusterCapacityMemoryGigabyteHours,
    PersistentvolumeclaimCapacityGigabyteMonths,
    PersistentvolumeclaimUsageGigabyteMonths,
    VolumeRequestStorageGigabyteMonths,
    PodLabels,
    VolumeLabels,
    AllLabels,
    CreatedAt,
}
