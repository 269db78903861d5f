use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::namespace;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "compose_chart")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    pub rel_namespace: i64,
    pub handle: String,
    pub name: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub config: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: Option<DateTimeWithTimeZone>,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Namespace }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Namespace => Entity::belongs_to(namespace::Entity)
                .from(Column::RelNamespace)
                .to(namespace::Column::Id)
                .into(),
        }
    }
}

impl Related<namespace::Entity> for Entity {
    fn to() -> RelationDef { Relation::Namespace.def() }
}

impl ActiveModelBehavior for ActiveModel {}
