use sea_orm::entity::prelude::*;

/// CRM lead. Only the winback columns (`winback_stage`, `score`,
/// `last_winback_attempt`) are written by this service.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "leads")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub lost_reason: Option<String>,
    pub winback_stage: Option<String>,
    pub score: i32,
    pub last_winback_attempt: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::winback_attempts::Entity")]
    WinbackAttempts,
    #[sea_orm(has_many = "super::followup_tasks::Entity")]
    FollowupTasks,
}

impl Related<super::winback_attempts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WinbackAttempts.def()
    }
}

impl Related<super::followup_tasks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FollowupTasks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
