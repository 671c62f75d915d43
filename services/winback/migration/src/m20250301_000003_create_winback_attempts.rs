use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WinbackAttempts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WinbackAttempts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WinbackAttempts::LeadId).uuid().not_null())
                    .col(ColumnDef::new(WinbackAttempts::SequenceId).uuid().not_null())
                    // -1 marks the post-sequence review.
                    .col(
                        ColumnDef::new(WinbackAttempts::StepIndex)
                            .integer()
                            .not_null()
                            .check(Expr::col(WinbackAttempts::StepIndex).gte(-1)),
                    )
                    .col(ColumnDef::new(WinbackAttempts::Channel).string().not_null())
                    .col(
                        ColumnDef::new(WinbackAttempts::ScheduledAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WinbackAttempts::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(WinbackAttempts::ClaimedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(WinbackAttempts::ExecutedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(WinbackAttempts::Notes).text())
                    .col(ColumnDef::new(WinbackAttempts::Response).json_binary())
                    .col(
                        ColumnDef::new(WinbackAttempts::RetryCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(WinbackAttempts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(WinbackAttempts::Table, WinbackAttempts::LeadId)
                            .to(Leads::Table, Leads::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(WinbackAttempts::Table, WinbackAttempts::SequenceId)
                            .to(WinbackSequences::Table, WinbackSequences::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Claim query: status filter + scheduled_at range.
        manager
            .create_index(
                Index::create()
                    .table(WinbackAttempts::Table)
                    .col(WinbackAttempts::Status)
                    .col(WinbackAttempts::ScheduledAt)
                    .name("idx_winback_attempts_status_scheduled_at")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(WinbackAttempts::Table)
                    .col(WinbackAttempts::LeadId)
                    .col(WinbackAttempts::SequenceId)
                    .name("idx_winback_attempts_lead_id_sequence_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WinbackAttempts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum WinbackAttempts {
    Table,
    Id,
    LeadId,
    SequenceId,
    StepIndex,
    Channel,
    ScheduledAt,
    Status,
    ClaimedAt,
    ExecutedAt,
    Notes,
    Response,
    RetryCount,
    CreatedAt,
}

#[derive(Iden)]
enum Leads {
    Table,
    Id,
}

#[derive(Iden)]
enum WinbackSequences {
    Table,
    Id,
}
