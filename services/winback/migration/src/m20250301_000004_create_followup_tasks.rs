use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FollowupTasks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FollowupTasks::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FollowupTasks::LeadId).uuid().not_null())
                    .col(ColumnDef::new(FollowupTasks::TaskType).string().not_null())
                    .col(ColumnDef::new(FollowupTasks::Title).string().not_null())
                    .col(ColumnDef::new(FollowupTasks::Description).text())
                    .col(
                        ColumnDef::new(FollowupTasks::Priority)
                            .string()
                            .not_null()
                            .default("medium"),
                    )
                    .col(
                        ColumnDef::new(FollowupTasks::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(FollowupTasks::DueAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FollowupTasks::WinbackAttemptId).uuid())
                    .col(
                        ColumnDef::new(FollowupTasks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FollowupTasks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(FollowupTasks::Table, FollowupTasks::LeadId)
                            .to(Leads::Table, Leads::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(FollowupTasks::Table)
                    .col(FollowupTasks::LeadId)
                    .col(FollowupTasks::Status)
                    .name("idx_followup_tasks_lead_id_status")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(FollowupTasks::Table)
                    .col(FollowupTasks::WinbackAttemptId)
                    .name("idx_followup_tasks_winback_attempt_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FollowupTasks::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum FollowupTasks {
    Table,
    Id,
    LeadId,
    TaskType,
    Title,
    Description,
    Priority,
    Status,
    DueAt,
    WinbackAttemptId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Leads {
    Table,
    Id,
}
