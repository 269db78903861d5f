//! Create `actionlog` table.
//!
//! Audit trail of every attempted service action, successful or not.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Actionlog::Table)
                    .if_not_exists()
                    .col(big_integer(Actionlog::Id).primary_key().auto_increment())
                    .col(timestamp_with_time_zone(Actionlog::Ts).not_null())
                    .col(uuid(Actionlog::RequestId).not_null())
                    .col(big_integer(Actionlog::ActorId).not_null())
                    .col(string_len(Actionlog::Resource, 512).not_null())
                    .col(string_len(Actionlog::Action, 64).not_null())
                    .col(ColumnDef::new(Actionlog::Error).text().null())
                    .col(small_integer(Actionlog::Severity).not_null())
                    .col(text(Actionlog::Description).not_null())
                    .col(json_binary(Actionlog::Meta).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_actionlog_ts")
                    .table(Actionlog::Table)
                    .col(Actionlog::Ts)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Actionlog::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Actionlog {
    Table,
    Id,
    Ts,
    RequestId,
    ActorId,
    Resource,
    Action,
    Error,
    Severity,
    Description,
    Meta,
}
