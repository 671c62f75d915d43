use sea_orm::entity::prelude::*;

/// One scheduled or executed outreach attempt.
///
/// `step_index` is an index into the sequence's steps, or `-1` for the
/// post-sequence review. `status` moves `pending → processing → terminal`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "winback_attempts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub lead_id: Uuid,
    pub sequence_id: Uuid,
    pub step_index: i32,
    pub channel: String,
    pub scheduled_at: chrono::DateTime<chrono::Utc>,
    pub status: String,
    /// Start of the current processing lease; null unless claimed.
    pub claimed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub executed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub notes: Option<String>,
    pub response: Option<Json>,
    pub retry_count: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::leads::Entity",
        from = "Column::LeadId",
        to = "super::leads::Column::Id"
    )]
    Lead,
    #[sea_orm(
        belongs_to = "super::winback_sequences::Entity",
        from = "Column::SequenceId",
        to = "super::winback_sequences::Column::Id"
    )]
    Sequence,
}

impl Related<super::leads::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lead.def()
    }
}

impl Related<super::winback_sequences::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sequence.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
