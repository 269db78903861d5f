//! Migrator registering compose migrations in dependency order.
pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_compose_namespace;
mod m20240101_000002_create_compose_chart;
mod m20240101_000003_create_labels;
mod m20240101_000004_create_resource_translations;
mod m20240101_000005_create_actionlog;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_compose_namespace::Migration),
            Box::new(m20240101_000002_create_compose_chart::Migration),
            Box::new(m20240101_000003_create_labels::Migration),
            Box::new(m20240101_000004_create_resource_translations::Migration),
            Box::new(m20240101_000005_create_actionlog::Migration),
        ]
    }
}
