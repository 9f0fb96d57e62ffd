use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{QueryOrder, Select};
use serde::{Deserialize, Serialize};

use crate::config::{AddressesConfig, LabelConfig};
use crate::errors::ServiceResult;
use crate::owners::{OwnerRef, OwnerRegistry};

/// Columns that may be referenced by a label configuration
pub const LABEL_ATTRIBUTES: [&str; 15] = [
    "apartment",
    "floor",
    "entry",
    "building",
    "building_type",
    "number",
    "street",
    "street_type",
    "sub_administrative_area",
    "city",
    "administrative_area",
    "postal_area",
    "obs",
    "lat",
    "long",
];

/// Postal address attached to any registered owner through the
/// (`addressable_type`, `addressable_id`) pair
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "addresses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub addressable_id: i64,
    pub addressable_type: String,
    #[sea_orm(nullable)]
    pub country_id: Option<i64>,
    pub is_default: bool,
    #[sea_orm(nullable)]
    pub apartment: Option<String>,
    #[sea_orm(nullable)]
    pub floor: Option<String>,
    #[sea_orm(nullable)]
    pub entry: Option<String>,
    #[sea_orm(nullable)]
    pub building: Option<String>,
    #[sea_orm(nullable)]
    pub building_type: Option<String>,
    #[sea_orm(nullable)]
    pub number: Option<String>,
    #[sea_orm(nullable)]
    pub street: Option<String>,
    #[sea_orm(nullable)]
    pub street_type: Option<String>,
    #[sea_orm(nullable)]
    pub sub_administrative_area: Option<String>,
    #[sea_orm(nullable)]
    pub city: Option<String>,
    #[sea_orm(nullable)]
    pub administrative_area: Option<String>,
    #[sea_orm(nullable)]
    pub postal_area: Option<String>,
    /// Free-text observations
    #[sea_orm(nullable)]
    pub obs: Option<String>,
    #[sea_orm(nullable)]
    pub lat: Option<f64>,
    #[sea_orm(nullable)]
    pub long: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::country::Entity",
        from = "Column::CountryId",
        to = "super::country::Column::Id"
    )]
    Country,
}

impl Related<super::country::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Country.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Typed reference to the owner, checked against the registry
    pub fn owner_ref(&self, registry: &OwnerRegistry) -> ServiceResult<OwnerRef> {
        registry.owner_ref(self.addressable_id, &self.addressable_type)
    }

    /// Text value of a labelable column as stored, `None` when unset or empty
    pub fn attribute(&self, name: &str) -> Option<String> {
        let value = match name {
            "apartment" => self.apartment.clone(),
            "floor" => self.floor.clone(),
            "entry" => self.entry.clone(),
            "building" => self.building.clone(),
            "building_type" => self.building_type.clone(),
            "number" => self.number.clone(),
            "street" => self.street.clone(),
            "street_type" => self.street_type.clone(),
            "sub_administrative_area" => self.sub_administrative_area.clone(),
            "city" => self.city.clone(),
            "administrative_area" => self.administrative_area.clone(),
            "postal_area" => self.postal_area.clone(),
            "obs" => self.obs.clone(),
            "lat" => self.lat.map(|lat| lat.to_string()),
            "long" => self.long.map(|long| long.to_string()),
            _ => None,
        }?;

        (!value.is_empty()).then_some(value)
    }

    /// Single-line rendering: configured attributes in order, empty ones skipped,
    /// joined with the configured separator
    pub fn label(&self, config: &LabelConfig) -> String {
        config
            .attributes
            .iter()
            .filter_map(|attribute| self.attribute(attribute))
            .collect::<Vec<_>>()
            .join(&config.separator)
    }

    /// Relation name the audit log records address changes under
    pub fn loggable_morph<'a>(&self, config: &'a AddressesConfig) -> &'a str {
        &config.loggable_morph
    }
}

/// Reusable filters over address queries
pub trait AddressScopes {
    /// Only addresses flagged as default
    fn default_only(self) -> Self;

    fn not_default(self) -> Self;

    /// Addresses of exactly one polymorphic owner
    fn for_owner(self, owner_id: i64, owner_type: &str) -> Self;

    fn for_owner_ref(self, owner: &OwnerRef) -> Self;

    /// Default addresses first, then by id
    fn ordered(self) -> Self;
}

impl AddressScopes for Select<Entity> {
    fn default_only(self) -> Self {
        self.filter(Column::IsDefault.eq(true))
    }

    fn not_default(self) -> Self {
        self.filter(Column::IsDefault.eq(false))
    }

    fn for_owner(self, owner_id: i64, owner_type: &str) -> Self {
        self.filter(Column::AddressableId.eq(owner_id))
            .filter(Column::AddressableType.eq(owner_type))
    }

    fn for_owner_ref(self, owner: &OwnerRef) -> Self {
        self.for_owner(owner.id, owner.kind.as_str())
    }

    fn ordered(self) -> Self {
        self.order_by_desc(Column::IsDefault)
            .order_by_asc(Column::Id)
    }
}
