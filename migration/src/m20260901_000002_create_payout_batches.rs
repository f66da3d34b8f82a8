use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum PayoutBatches {
    Table,
    Id,
    IdempotencyKey,
    Status,
    Selections,
    RequestedIds,
    TransactionIds,
    Payouts,
    TotalAmount,
    UpdatedCount,
    Error,
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
                    .table(PayoutBatches::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PayoutBatches::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PayoutBatches::IdempotencyKey)
                            .string_len(128)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(PayoutBatches::Status)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PayoutBatches::Selections).json().not_null())
                    .col(ColumnDef::new(PayoutBatches::RequestedIds).json().not_null())
                    .col(ColumnDef::new(PayoutBatches::TransactionIds).json().not_null())
                    .col(ColumnDef::new(PayoutBatches::Payouts).json().not_null())
                    .col(
                        ColumnDef::new(PayoutBatches::TotalAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PayoutBatches::UpdatedCount).big_integer().null())
                    .col(ColumnDef::new(PayoutBatches::Error).text().null())
                    .col(
                        ColumnDef::new(PayoutBatches::CreatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PayoutBatches::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_payout_batches_status")
                    .table(PayoutBatches::Table)
                    .col(PayoutBatches::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PayoutBatches::Table).to_owned())
            .await?;
        Ok(())
    }
}
