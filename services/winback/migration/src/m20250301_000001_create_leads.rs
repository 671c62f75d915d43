use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Leads::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Leads::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Leads::Name).string().not_null())
                    .col(ColumnDef::new(Leads::Email).string())
                    .col(ColumnDef::new(Leads::Phone).string())
                    .col(ColumnDef::new(Leads::Company).string())
                    .col(ColumnDef::new(Leads::LostReason).string())
                    .col(ColumnDef::new(Leads::WinbackStage).string())
                    .col(
                        ColumnDef::new(Leads::Score)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Leads::LastWinbackAttempt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Leads::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Leads::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Leads {
    Table,
    Id,
    Name,
    Email,
    Phone,
    Company,
    LostReason,
    WinbackStage,
    Score,
    LastWinbackAttempt,
    UpdatedAt,
}
