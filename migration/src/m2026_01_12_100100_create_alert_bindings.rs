//! Migration to create the alert_bindings table.
//!
//! An alert binding links a query profile to exactly one remote alert and
//! carries the sync lifecycle state. Identity uniqueness on remote_alert_id
//! is enforced here, not in application code.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Statement;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AlertBindings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AlertBindings::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AlertBindings::ProfileId).uuid().not_null())
                    .col(ColumnDef::new(AlertBindings::ConnectorId).uuid().null())
                    .col(
                        ColumnDef::new(AlertBindings::RemoteAlertId)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AlertBindings::Status)
                            .text()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(AlertBindings::SyncState)
                            .text()
                            .not_null()
                            .default("pending_backfill"),
                    )
                    .col(
                        ColumnDef::new(AlertBindings::ValidationStatus)
                            .text()
                            .not_null()
                            .default("unknown"),
                    )
                    .col(
                        ColumnDef::new(AlertBindings::LastValidatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AlertBindings::LastValidationError)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AlertBindings::LastSyncAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(AlertBindings::LastSyncError).text().null())
                    .col(
                        ColumnDef::new(AlertBindings::BackfillStartedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AlertBindings::BackfillCompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AlertBindings::BackfillCursor)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AlertBindings::Metadata)
                            .json_binary()
                            .null(),
                    )
                    .col(ColumnDef::new(AlertBindings::CreatedBy).uuid().null())
                    .col(ColumnDef::new(AlertBindings::UpdatedBy).uuid().null())
                    .col(
                        ColumnDef::new(AlertBindings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(AlertBindings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_alert_bindings_profile_id")
                            .from(AlertBindings::Table, AlertBindings::ProfileId)
                            .to(QueryProfiles::Table, QueryProfiles::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // One binding per remote alert identity
        manager
            .create_index(
                Index::create()
                    .name("uq_alert_bindings_remote_alert_id")
                    .table(AlertBindings::Table)
                    .col(AlertBindings::RemoteAlertId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Candidate selection scans status = active ordered by staleness
        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "CREATE INDEX IF NOT EXISTS idx_alert_bindings_status_updated ON alert_bindings (status, updated_at ASC)".to_string(),
            ))
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_alert_bindings_profile_id")
                    .table(AlertBindings::Table)
                    .col(AlertBindings::ProfileId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_alert_bindings_profile_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_alert_bindings_status_updated")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("uq_alert_bindings_remote_alert_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(AlertBindings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AlertBindings {
    Table,
    Id,
    ProfileId,
    ConnectorId,
    RemoteAlertId,
    Status,
    SyncState,
    ValidationStatus,
    LastValidatedAt,
    LastValidationError,
    LastSyncAt,
    LastSyncError,
    BackfillStartedAt,
    BackfillCompletedAt,
    BackfillCursor,
    Metadata,
    CreatedBy,
    UpdatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum QueryProfiles {
    Table,
    Id,
}
