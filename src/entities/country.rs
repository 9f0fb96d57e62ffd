use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Country reference row. Maintained outside this crate; addresses and
/// regions only point at it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "countries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    #[sea_orm(column_name = "iso_3166_2", nullable)]
    pub iso_3166_2: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::region::Entity")]
    Regions,
    #[sea_orm(has_many = "super::address::Entity")]
    Addresses,
}

impl Related<super::region::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Regions.def()
    }
}

impl Related<super::address::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Addresses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
