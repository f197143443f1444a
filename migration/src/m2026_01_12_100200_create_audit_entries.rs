//! Migration to create the audit_entries table.
//!
//! Append-only log of every mutation to query profiles and alert bindings,
//! written in the same transaction as the mutation it describes.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AuditEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuditEntries::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuditEntries::ActorUserId).uuid().null())
                    .col(ColumnDef::new(AuditEntries::Action).text().not_null())
                    .col(ColumnDef::new(AuditEntries::ResourceType).text().not_null())
                    .col(ColumnDef::new(AuditEntries::ResourceId).uuid().not_null())
                    .col(ColumnDef::new(AuditEntries::RequestId).text().null())
                    .col(
                        ColumnDef::new(AuditEntries::SnapshotBefore)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AuditEntries::SnapshotAfter)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AuditEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_audit_entries_resource")
                    .table(AuditEntries::Table)
                    .col(AuditEntries::ResourceType)
                    .col(AuditEntries::ResourceId)
                    .col(AuditEntries::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_audit_entries_resource").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(AuditEntries::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AuditEntries {
    Table,
    Id,
    ActorUserId,
    Action,
    ResourceType,
    ResourceId,
    RequestId,
    SnapshotBefore,
    SnapshotAfter,
    CreatedAt,
}
