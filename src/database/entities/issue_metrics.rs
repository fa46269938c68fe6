use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "issue_metrics")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub issue_id: i32,
    pub metric_type: String,
    #[sea_orm(column_type = "Double")]
    pub value: f64,
    pub recorded_at: ChronoDateTimeUtc,
    /// JSON context payload
    pub additional_data: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::issues::Entity",
        from = "Column::IssueId",
        to = "super::issues::Column::Id"
    )]
    Issues,
}

impl Related<super::issues::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Issues.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn additional_data_json(&self) -> Option<serde_json::Value> {
        self.additional_data
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}
