//! sea-orm entities for the tables the winback processor reads and writes.
//!
//! `leads`, `followup_tasks`, `email_accounts` and `tracked_emails` belong to
//! the wider CRM; the entities here mirror only the columns this service uses.

pub mod email_accounts;
pub mod followup_tasks;
pub mod leads;
pub mod system_logs;
pub mod tracked_emails;
pub mod winback_attempts;
pub mod winback_sequences;
