use sea_orm::entity::prelude::*;

/// Sent email with open/click counters maintained by the tracking service.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tracked_emails")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub lead_id: Option<Uuid>,
    pub email_account_id: Uuid,
    pub recipient: String,
    pub subject: String,
    pub sent_at: chrono::DateTime<chrono::Utc>,
    pub open_count: i32,
    pub click_count: i32,
    pub winback_attempt_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
