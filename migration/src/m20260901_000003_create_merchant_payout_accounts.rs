use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum MerchantPayoutAccounts {
    Table,
    MerchantId,
    FundAccountId,
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
                    .table(MerchantPayoutAccounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MerchantPayoutAccounts::MerchantId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MerchantPayoutAccounts::FundAccountId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MerchantPayoutAccounts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MerchantPayoutAccounts::Table).to_owned())
            .await?;
        Ok(())
    }
}
