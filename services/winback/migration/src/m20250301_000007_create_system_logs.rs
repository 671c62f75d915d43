use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SystemLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SystemLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SystemLogs::Level).string().not_null())
                    .col(ColumnDef::new(SystemLogs::Source).string().not_null())
                    .col(ColumnDef::new(SystemLogs::Message).text().not_null())
                    .col(ColumnDef::new(SystemLogs::Details).json_binary().not_null())
                    .col(
                        ColumnDef::new(SystemLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(SystemLogs::Table)
                    .col(SystemLogs::CreatedAt)
                    .name("idx_system_logs_created_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SystemLogs::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SystemLogs {
    Table,
    Id,
    Level,
    Source,
    Message,
    Details,
    CreatedAt,
}
