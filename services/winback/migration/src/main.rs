use sea_orm_migration::prelude::*;

use mandate_winback_migration::Migrator;

#[tokio::main]
async fn main() {
    cli::run_cli(Migrator).await;
}
