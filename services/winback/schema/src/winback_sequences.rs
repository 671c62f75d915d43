use sea_orm::entity::prelude::*;

/// Named outreach template. `steps` is a JSON array of
/// `{dias, canal, asunto?, mensaje?, script?, prioridad?}` objects.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "winback_sequences")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    /// Lost reason that auto-enrolls a lead into this sequence.
    pub trigger_condition: Option<String>,
    pub active: bool,
    pub steps: Json,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::winback_attempts::Entity")]
    WinbackAttempts,
}

impl Related<super::winback_attempts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WinbackAttempts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
