//! Polymorphic address owners.
//!
//! Any sea-orm entity can own addresses by implementing [`Addressable`] and
//! being registered in an [`OwnerRegistry`]. Addresses store the owner as an
//! (`addressable_type`, `addressable_id`) pair; the registry turns the stored
//! tag back into an [`OwnerKind`] and knows how to load, lock and touch the
//! owning row.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, QueryFilter,
    QuerySelect,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use strum::{Display, EnumString};

use crate::errors::{ServiceError, ServiceResult};

/// How many addresses an owner type may hold
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AddressCardinality {
    /// At most one address row
    Single,
    /// Any number of addresses, at most one flagged default
    Multiple,
}

impl AddressCardinality {
    pub fn can_be_multiple(self) -> bool {
        matches!(self, Self::Multiple)
    }
}

/// Tag stored in `addresses.addressable_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct OwnerKind(&'static str);

impl OwnerKind {
    pub const fn new(tag: &'static str) -> Self {
        Self(tag)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Reference to one owning row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct OwnerRef {
    pub id: i64,
    pub kind: OwnerKind,
}

impl OwnerRef {
    pub fn new(id: i64, kind: OwnerKind) -> Self {
        Self { id, kind }
    }

    /// Reference to row `id` of owner type `E`
    pub fn of<E: Addressable>(id: i64) -> Self {
        Self::new(id, E::KIND)
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

/// Capability contract for entities that own addresses
pub trait Addressable: EntityTrait {
    const KIND: OwnerKind;
    const CARDINALITY: AddressCardinality;

    fn id_column() -> Self::Column;

    /// Timestamp column bumped whenever one of the owner's addresses changes
    fn touch_column() -> Self::Column;
}

/// Owner row loaded through the registry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedOwner {
    pub owner: OwnerRef,
    pub cardinality: AddressCardinality,
    pub record: JsonValue,
}

#[async_trait]
trait OwnerLoader: Send + Sync {
    fn cardinality(&self) -> AddressCardinality;

    async fn find(&self, db: &DatabaseConnection, id: i64) -> Result<Option<JsonValue>, DbErr>;

    /// Locks the owner row for the rest of the transaction, false if it is gone
    async fn lock(&self, txn: &DatabaseTransaction, id: i64) -> Result<bool, DbErr>;

    async fn touch(&self, txn: &DatabaseTransaction, id: i64) -> Result<(), DbErr>;
}

struct EntityLoader<E>(PhantomData<fn() -> E>);

#[async_trait]
impl<E> OwnerLoader for EntityLoader<E>
where
    E: Addressable + 'static,
{
    fn cardinality(&self) -> AddressCardinality {
        E::CARDINALITY
    }

    async fn find(&self, db: &DatabaseConnection, id: i64) -> Result<Option<JsonValue>, DbErr> {
        E::find()
            .filter(E::id_column().eq(id))
            .into_json()
            .one(db)
            .await
    }

    async fn lock(&self, txn: &DatabaseTransaction, id: i64) -> Result<bool, DbErr> {
        let row = E::find()
            .filter(E::id_column().eq(id))
            .lock_exclusive()
            .into_json()
            .one(txn)
            .await?;

        Ok(row.is_some())
    }

    async fn touch(&self, txn: &DatabaseTransaction, id: i64) -> Result<(), DbErr> {
        E::update_many()
            .col_expr(E::touch_column(), Expr::value(Utc::now()))
            .filter(E::id_column().eq(id))
            .exec(txn)
            .await?;

        Ok(())
    }
}

/// Maps owner kinds to the loaders of their entities
#[derive(Clone, Default)]
pub struct OwnerRegistry {
    loaders: HashMap<&'static str, Arc<dyn OwnerLoader>>,
}

impl fmt::Debug for OwnerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.loaders.keys().collect();
        kinds.sort();
        f.debug_struct("OwnerRegistry").field("kinds", &kinds).finish()
    }
}

impl OwnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `E` as an address owner under `E::KIND`
    pub fn register<E>(mut self) -> Self
    where
        E: Addressable + 'static,
    {
        self.loaders
            .insert(E::KIND.as_str(), Arc::new(EntityLoader::<E>(PhantomData)));
        self
    }

    pub fn kinds(&self) -> impl Iterator<Item = OwnerKind> + '_ {
        self.loaders.keys().map(|tag| OwnerKind(*tag))
    }

    /// Looks up the kind registered under a stored type tag
    pub fn kind(&self, tag: &str) -> ServiceResult<OwnerKind> {
        self.loaders
            .get_key_value(tag)
            .map(|(registered, _)| OwnerKind(*registered))
            .ok_or_else(|| ServiceError::NotFound(format!("Unknown address owner type '{}'", tag)))
    }

    pub fn owner_ref(&self, id: i64, tag: &str) -> ServiceResult<OwnerRef> {
        Ok(OwnerRef::new(id, self.kind(tag)?))
    }

    fn loader(&self, kind: OwnerKind) -> ServiceResult<&Arc<dyn OwnerLoader>> {
        self.loaders.get(kind.as_str()).ok_or_else(|| {
            ServiceError::NotFound(format!("Unknown address owner type '{}'", kind))
        })
    }

    pub fn cardinality(&self, owner: &OwnerRef) -> ServiceResult<AddressCardinality> {
        Ok(self.loader(owner.kind)?.cardinality())
    }

    /// Whether the owner type supports more than one address
    pub fn can_be_multiple(&self, owner: &OwnerRef) -> ServiceResult<bool> {
        Ok(self.cardinality(owner)?.can_be_multiple())
    }

    /// Loads the owning row, whatever its entity type
    pub async fn resolve(
        &self,
        db: &DatabaseConnection,
        owner: &OwnerRef,
    ) -> ServiceResult<ResolvedOwner> {
        let loader = self.loader(owner.kind)?;
        let record = loader
            .find(db, owner.id)
            .await?
            .ok_or_else(|| missing_owner(owner))?;

        Ok(ResolvedOwner {
            owner: *owner,
            cardinality: loader.cardinality(),
            record,
        })
    }

    /// Loads the owning row as a typed model of `E`
    pub async fn resolve_as<E>(
        &self,
        db: &DatabaseConnection,
        owner: &OwnerRef,
    ) -> ServiceResult<E::Model>
    where
        E: Addressable + 'static,
    {
        self.loader(owner.kind)?;
        if owner.kind != E::KIND {
            return Err(ServiceError::NotFound(format!(
                "Address owner {} is not a {}",
                owner,
                E::KIND
            )));
        }

        E::find()
            .filter(E::id_column().eq(owner.id))
            .one(db)
            .await?
            .ok_or_else(|| missing_owner(owner))
    }

    pub(crate) async fn lock(&self, txn: &DatabaseTransaction, owner: &OwnerRef) -> ServiceResult<()> {
        if self.loader(owner.kind)?.lock(txn, owner.id).await? {
            Ok(())
        } else {
            Err(missing_owner(owner))
        }
    }

    pub(crate) async fn touch(&self, txn: &DatabaseTransaction, owner: &OwnerRef) -> ServiceResult<()> {
        self.loader(owner.kind)?.touch(txn, owner.id).await?;
        Ok(())
    }
}

fn missing_owner(owner: &OwnerRef) -> ServiceError {
    ServiceError::NotFound(format!("Address owner {} not found", owner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    mod warehouse {
        use chrono::{DateTime, Utc};
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "warehouses")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i64,
            pub updated_at: DateTime<Utc>,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    impl Addressable for warehouse::Entity {
        const KIND: OwnerKind = OwnerKind::new("warehouse");
        const CARDINALITY: AddressCardinality = AddressCardinality::Single;

        fn id_column() -> warehouse::Column {
            warehouse::Column::Id
        }

        fn touch_column() -> warehouse::Column {
            warehouse::Column::UpdatedAt
        }
    }

    fn registry() -> OwnerRegistry {
        OwnerRegistry::new().register::<warehouse::Entity>()
    }

    #[test]
    fn registered_kind_round_trips_from_tag() {
        let registry = registry();
        let owner = registry.owner_ref(3, "warehouse").unwrap();

        assert_eq!(owner, OwnerRef::of::<warehouse::Entity>(3));
        assert_eq!(owner.to_string(), "warehouse#3");
        assert_eq!(
            registry.cardinality(&owner).unwrap(),
            AddressCardinality::Single
        );
        assert!(!registry.can_be_multiple(&owner).unwrap());
    }

    #[test]
    fn unknown_tag_is_not_found() {
        let err = registry().kind("spaceship").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(ref msg) if msg.contains("spaceship")));
    }

    #[test]
    fn unregistered_kind_has_no_cardinality() {
        let owner = OwnerRef::new(1, OwnerKind::new("ghost"));
        assert!(matches!(
            registry().cardinality(&owner),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn cardinality_parses_and_prints_snake_case() {
        assert_eq!(
            AddressCardinality::from_str("multiple").unwrap(),
            AddressCardinality::Multiple
        );
        assert_eq!(AddressCardinality::Single.to_string(), "single");
        assert!(AddressCardinality::Multiple.can_be_multiple());
    }

    #[test]
    fn debug_lists_registered_kinds() {
        assert_eq!(
            format!("{:?}", registry()),
            r#"OwnerRegistry { kinds: ["warehouse"] }"#
        );
    }
}
