pub use sea_orm_migration::prelude::*;

mod m20260901_000001_create_merchant_transactions;
mod m20260901_000002_create_payout_batches;
mod m20260901_000003_create_merchant_payout_accounts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260901_000001_create_merchant_transactions::Migration),
            Box::new(m20260901_000002_create_payout_batches::Migration),
            Box::new(m20260901_000003_create_merchant_payout_accounts::Migration),
        ]
    }
}
