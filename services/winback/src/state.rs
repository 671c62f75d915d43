use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::domain::types::WinbackSettings;
use crate::infra::db::{
    DbAttemptRepository, DbAuditLog, DbFollowUpTaskRepository, DbLeadRepository,
    DbMailboxRepository, DbSequenceRepository,
};
use crate::infra::email::HttpEmailGateway;
use crate::usecase::cycle::RunCycleUseCase;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub email: HttpEmailGateway,
    pub settings: WinbackSettings,
    /// Bearer secret for `POST /winback/run`; `None` leaves it open.
    pub cron_secret: Option<Arc<str>>,
}

pub type DbRunCycleUseCase = RunCycleUseCase<
    DbAttemptRepository,
    DbLeadRepository,
    DbFollowUpTaskRepository,
    DbMailboxRepository,
    HttpEmailGateway,
    DbAuditLog,
>;

impl AppState {
    pub fn attempt_repo(&self) -> DbAttemptRepository {
        DbAttemptRepository {
            db: self.db.clone(),
        }
    }

    pub fn sequence_repo(&self) -> DbSequenceRepository {
        DbSequenceRepository {
            db: self.db.clone(),
        }
    }

    pub fn lead_repo(&self) -> DbLeadRepository {
        DbLeadRepository {
            db: self.db.clone(),
        }
    }

    pub fn run_cycle_usecase(&self) -> DbRunCycleUseCase {
        RunCycleUseCase {
            attempts: self.attempt_repo(),
            leads: self.lead_repo(),
            tasks: DbFollowUpTaskRepository {
                db: self.db.clone(),
            },
            mailbox: DbMailboxRepository {
                db: self.db.clone(),
            },
            gateway: self.email.clone(),
            audit: DbAuditLog {
                db: self.db.clone(),
            },
            settings: self.settings,
        }
    }
}
