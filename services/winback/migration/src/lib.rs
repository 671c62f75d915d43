use sea_orm_migration::prelude::*;

mod m20250301_000001_create_leads;
mod m20250301_000002_create_winback_sequences;
mod m20250301_000003_create_winback_attempts;
mod m20250301_000004_create_followup_tasks;
mod m20250301_000005_create_email_accounts;
mod m20250301_000006_create_tracked_emails;
mod m20250301_000007_create_system_logs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_leads::Migration),
            Box::new(m20250301_000002_create_winback_sequences::Migration),
            Box::new(m20250301_000003_create_winback_attempts::Migration),
            Box::new(m20250301_000004_create_followup_tasks::Migration),
            Box::new(m20250301_000005_create_email_accounts::Migration),
            Box::new(m20250301_000006_create_tracked_emails::Migration),
            Box::new(m20250301_000007_create_system_logs::Migration),
        ]
    }
}
