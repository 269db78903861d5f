use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "actionlog")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub ts: DateTimeWithTimeZone,
    pub request_id: Uuid,
    pub actor_id: i64,
    pub resource: String,
    pub action: String,
    pub error: Option<String>,
    pub severity: i16,
    pub description: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub meta: Json,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef { panic!("no relations defined here") }
}

impl ActiveModelBehavior for ActiveModel {}
