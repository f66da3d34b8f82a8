use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum MerchantTransactions {
    Table,
    Id,
    OrderId,
    MerchantId,
    OrderAmount,
    PlatformFeePercent,
    PlatformFeeAmount,
    GstOnFeeAmount,
    PaymentGatewayFee,
    FinalPayableAmount,
    PaymentStatus,
    SettlementDate,
    PaidAt,
    PayoutBatchId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MerchantTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MerchantTransactions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MerchantTransactions::OrderId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(MerchantTransactions::MerchantId)
                            .big_integer()
                            .not_null(),
                    )
                    // 金额均以最小货币单位(paise)存储
                    .col(
                        ColumnDef::new(MerchantTransactions::OrderAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MerchantTransactions::PlatformFeePercent)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MerchantTransactions::PlatformFeeAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MerchantTransactions::GstOnFeeAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MerchantTransactions::PaymentGatewayFee)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MerchantTransactions::FinalPayableAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MerchantTransactions::PaymentStatus)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(MerchantTransactions::SettlementDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MerchantTransactions::PaidAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MerchantTransactions::PayoutBatchId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MerchantTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(MerchantTransactions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 结算查询: 按商户+状态过滤, 按结算日期排序
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_merchant_transactions_merchant_status_date")
                    .table(MerchantTransactions::Table)
                    .col(MerchantTransactions::MerchantId)
                    .col(MerchantTransactions::PaymentStatus)
                    .col(MerchantTransactions::SettlementDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MerchantTransactions::Table).to_owned())
            .await?;
        Ok(())
    }
}
