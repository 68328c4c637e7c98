pub use sea_orm_migration::prelude::*;

mod util;
mod m20250810_091500_init;
mod m20250812_141812_seed_accounts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250810_091500_init::Migration),
            Box::new(m20250812_141812_seed_accounts::Migration),
        ]
    }
}
