//! Create `compose_chart` table with FK to `compose_namespace`.
//!
//! Chart configuration (reports, metrics) is stored as a JSON document.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ComposeChart::Table)
                    .if_not_exists()
                    .col(big_integer(ComposeChart::Id).primary_key())
                    .col(big_integer(ComposeChart::RelNamespace).not_null())
                    .col(string_len(ComposeChart::Handle, 256).not_null())
                    .col(text(ComposeChart::Name).not_null())
                    .col(json_binary(ComposeChart::Config).not_null())
                    .col(timestamp_with_time_zone(ComposeChart::CreatedAt).not_null())
                    .col(ColumnDef::new(ComposeChart::UpdatedAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(ComposeChart::DeletedAt).timestamp_with_time_zone().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_compose_chart_namespace")
                            .from(ComposeChart::Table, ComposeChart::RelNamespace)
                            .to(ComposeNamespace::Table, ComposeNamespace::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Handles are unique among live charts of one namespace; sea-query has no partial index builder.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS uniq_compose_chart_handle \
                 ON compose_chart (rel_namespace, LOWER(handle)) \
                 WHERE LENGTH(handle) > 0 AND deleted_at IS NULL",
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ComposeChart::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ComposeChart {
    Table,
    Id,
    RelNamespace,
    Handle,
    Name,
    Config,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum ComposeNamespace { Table, Id }
