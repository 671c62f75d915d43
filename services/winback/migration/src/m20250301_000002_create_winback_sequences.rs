use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WinbackSequences::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WinbackSequences::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WinbackSequences::Name).string().not_null())
                    .col(ColumnDef::new(WinbackSequences::TriggerCondition).string())
                    .col(
                        ColumnDef::new(WinbackSequences::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(WinbackSequences::Steps)
                            .json_binary()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WinbackSequences::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WinbackSequences::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WinbackSequences::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum WinbackSequences {
    Table,
    Id,
    Name,
    TriggerCondition,
    Active,
    Steps,
    CreatedAt,
    UpdatedAt,
}
