//! Create `labels` table.
//! One row per (resource kind, resource id, label name).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Labels::Table)
                    .if_not_exists()
                    .col(string_len(Labels::Kind, 64).not_null())
                    .col(big_integer(Labels::RelResource).not_null())
                    .col(string_len(Labels::Name, 512).not_null())
                    .col(text(Labels::Value).not_null())
                    .primary_key(
                        Index::create()
                            .col(Labels::Kind)
                            .col(Labels::RelResource)
                            .col(Labels::Name),
                    )
                    .to_owned(),
            )
            .await?;

        // Label search goes by (kind, name, value)
        manager
            .create_index(
                Index::create()
                    .name("idx_labels_lookup")
                    .table(Labels::Table)
                    .col(Labels::Kind)
                    .col(Labels::Name)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Labels::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Labels {
    Table,
    Kind,
    RelResource,
    Name,
    Value,
}
