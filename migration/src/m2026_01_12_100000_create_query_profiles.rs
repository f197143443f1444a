//! Migration to create the query_profiles table.
//!
//! Query profiles hold the "what are we listening for" configuration that
//! alert bindings belong to.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(QueryProfiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QueryProfiles::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(QueryProfiles::Name).text().not_null())
                    .col(ColumnDef::new(QueryProfiles::Objective).text().null())
                    .col(ColumnDef::new(QueryProfiles::QueryText).text().not_null())
                    .col(ColumnDef::new(QueryProfiles::Sources).json_binary().null())
                    .col(ColumnDef::new(QueryProfiles::Language).text().null())
                    .col(
                        ColumnDef::new(QueryProfiles::Countries)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(QueryProfiles::Status)
                            .text()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(QueryProfiles::Metadata).json_binary().null())
                    .col(ColumnDef::new(QueryProfiles::CreatedBy).uuid().null())
                    .col(ColumnDef::new(QueryProfiles::UpdatedBy).uuid().null())
                    .col(
                        ColumnDef::new(QueryProfiles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(QueryProfiles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Index for listing non-archived profiles
        manager
            .create_index(
                Index::create()
                    .name("idx_query_profiles_status_updated")
                    .table(QueryProfiles::Table)
                    .col(QueryProfiles::Status)
                    .col(QueryProfiles::UpdatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_query_profiles_status_updated")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(QueryProfiles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum QueryProfiles {
    Table,
    Id,
    Name,
    Objective,
    QueryText,
    Sources,
    Language,
    Countries,
    Status,
    Metadata,
    CreatedBy,
    UpdatedBy,
    CreatedAt,
    UpdatedAt,
}
