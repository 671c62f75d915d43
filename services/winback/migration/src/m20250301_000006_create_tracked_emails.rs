use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TrackedEmails::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TrackedEmails::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TrackedEmails::LeadId).uuid())
                    .col(ColumnDef::new(TrackedEmails::EmailAccountId).uuid().not_null())
                    .col(ColumnDef::new(TrackedEmails::Recipient).string().not_null())
                    .col(ColumnDef::new(TrackedEmails::Subject).string().not_null())
                    .col(
                        ColumnDef::new(TrackedEmails::SentAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TrackedEmails::OpenCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(TrackedEmails::ClickCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(TrackedEmails::WinbackAttemptId).uuid())
                    .foreign_key(
                        ForeignKey::create()
                            .from(TrackedEmails::Table, TrackedEmails::EmailAccountId)
                            .to(EmailAccounts::Table, EmailAccounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Engagement lookups: by lead over a trailing sent_at window.
        manager
            .create_index(
                Index::create()
                    .table(TrackedEmails::Table)
                    .col(TrackedEmails::LeadId)
                    .col(TrackedEmails::SentAt)
                    .name("idx_tracked_emails_lead_id_sent_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TrackedEmails::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum TrackedEmails {
    Table,
    Id,
    LeadId,
    EmailAccountId,
    Recipient,
    Subject,
    SentAt,
    OpenCount,
    ClickCount,
    WinbackAttemptId,
}

#[derive(Iden)]
enum EmailAccounts {
    Table,
    Id,
}
