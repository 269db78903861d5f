//! Create `resource_translations` table.
//! Stores per-language overrides of translatable resource fields.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ResourceTranslations::Table)
                    .if_not_exists()
                    .col(big_integer(ResourceTranslations::Id).primary_key().auto_increment())
                    .col(string_len(ResourceTranslations::Lang, 32).not_null())
                    .col(string_len(ResourceTranslations::Resource, 512).not_null())
                    .col(string_len(ResourceTranslations::K, 256).not_null())
                    .col(text(ResourceTranslations::Message).not_null())
                    .col(timestamp_with_time_zone(ResourceTranslations::CreatedAt).not_null())
                    .col(ColumnDef::new(ResourceTranslations::UpdatedAt).timestamp_with_time_zone().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uniq_resource_translations")
                    .table(ResourceTranslations::Table)
                    .col(ResourceTranslations::Lang)
                    .col(ResourceTranslations::Resource)
                    .col(ResourceTranslations::K)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ResourceTranslations::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ResourceTranslations {
    Table,
    Id,
    Lang,
    Resource,
    K,
    Message,
    CreatedAt,
    UpdatedAt,
}
