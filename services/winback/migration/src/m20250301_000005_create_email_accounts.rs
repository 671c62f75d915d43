use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EmailAccounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EmailAccounts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EmailAccounts::EmailAddress).string().not_null())
                    .col(ColumnDef::new(EmailAccounts::DisplayName).string())
                    .col(
                        ColumnDef::new(EmailAccounts::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(EmailAccounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EmailAccounts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum EmailAccounts {
    Table,
    Id,
    EmailAddress,
    DisplayName,
    IsActive,
    CreatedAt,
}
