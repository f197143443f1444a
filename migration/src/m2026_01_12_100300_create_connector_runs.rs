//! Migration to create the connector_runs table.
//!
//! Each row records one provider-level sync invocation with aggregate
//! metrics and latency.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ConnectorRuns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ConnectorRuns::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ConnectorRuns::ConnectorId).uuid().null())
                    .col(
                        ColumnDef::new(ConnectorRuns::Status)
                            .text()
                            .not_null()
                            .default("running"),
                    )
                    .col(
                        ColumnDef::new(ConnectorRuns::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ConnectorRuns::FinishedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ConnectorRuns::BindingsProcessed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ConnectorRuns::PagesFetched)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ConnectorRuns::ErrorCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ConnectorRuns::LastError).text().null())
                    .col(ColumnDef::new(ConnectorRuns::LatencyMs).big_integer().null())
                    .col(
                        ColumnDef::new(ConnectorRuns::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ConnectorRuns::UpdatedAt)
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
                    .name("idx_connector_runs_connector_started")
                    .table(ConnectorRuns::Table)
                    .col(ConnectorRuns::ConnectorId)
                    .col(ConnectorRuns::StartedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_connector_runs_connector_started")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ConnectorRuns::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ConnectorRuns {
    Table,
    Id,
    ConnectorId,
    Status,
    StartedAt,
    FinishedAt,
    BindingsProcessed,
    PagesFetched,
    ErrorCount,
    LastError,
    LatencyMs,
    CreatedAt,
    UpdatedAt,
}
