//! Create `compose_namespace` table.
//! Namespaces scope charts (and every other compose resource); this layer only reads them.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ComposeNamespace::Table)
                    .if_not_exists()
                    .col(big_integer(ComposeNamespace::Id).primary_key())
                    .col(string_len(ComposeNamespace::Name, 256).not_null())
                    .col(string_len(ComposeNamespace::Slug, 256).not_null())
                    .col(boolean(ComposeNamespace::Enabled).not_null())
                    .col(timestamp_with_time_zone(ComposeNamespace::CreatedAt).not_null())
                    .col(ColumnDef::new(ComposeNamespace::UpdatedAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(ComposeNamespace::DeletedAt).timestamp_with_time_zone().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ComposeNamespace::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ComposeNamespace {
    Table,
    Id,
    Name,
    Slug,
    Enabled,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
