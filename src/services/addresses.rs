use crate::{
    config::AddressesConfig,
    entities::{address, country, Address, AddressModel, AddressScopes, CountryModel},
    errors::{ServiceError, ServiceResult},
    events::{AddressChange, Event, EventSender},
    owners::{Addressable, OwnerRef, OwnerRegistry, ResolvedOwner},
};
use chrono::Utc;
use metrics::{counter, histogram};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;
use tracing::{error, info, instrument, warn};
use validator::Validate;

/// Address management for every registered owner type
#[derive(Clone)]
pub struct AddressService {
    db: Arc<DatabaseConnection>,
    owners: Arc<OwnerRegistry>,
    config: Arc<AddressesConfig>,
    event_sender: Arc<EventSender>,
}

impl AddressService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        owners: Arc<OwnerRegistry>,
        config: Arc<AddressesConfig>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            owners,
            config,
            event_sender,
        }
    }

    /// Addresses of an owner, default first
    #[instrument(skip(self, owner), fields(owner = %owner))]
    pub async fn index(&self, owner: &OwnerRef) -> ServiceResult<Vec<AddressModel>> {
        self.owners.cardinality(owner)?;

        Ok(Address::find()
            .for_owner_ref(owner)
            .ordered()
            .all(&*self.db)
            .await?)
    }

    /// Id and label pairs for select inputs
    #[instrument(skip(self, owner), fields(owner = %owner))]
    pub async fn options(&self, owner: &OwnerRef) -> ServiceResult<Vec<AddressOption>> {
        Ok(self
            .index(owner)
            .await?
            .iter()
            .map(|address| AddressOption {
                id: address.id,
                label: self.label(address),
            })
            .collect())
    }

    /// Get address by ID
    #[instrument(skip(self))]
    pub async fn find(&self, id: i64) -> ServiceResult<AddressModel> {
        find_address(&*self.db, id).await
    }

    pub fn label(&self, address: &AddressModel) -> String {
        address.label(&self.config.label)
    }

    /// Create an address for `owner`
    ///
    /// Single-address owners that already have an address are rejected with
    /// a validation error. When the new address is flagged default, the
    /// owner's other defaults are cleared in the same transaction.
    #[instrument(skip(self, owner, input), fields(owner = %owner))]
    pub async fn store(&self, owner: OwnerRef, input: AddressInput) -> ServiceResult<AddressModel> {
        input.validate()?;

        let txn = self.begin().await?;
        self.owners.lock(&txn, &owner).await?;

        if self.should_be_single_in(&txn, &owner).await? {
            return Err(ServiceError::ValidationError(format!(
                "A {} can only have one address",
                owner.kind
            )));
        }

        if input.is_default {
            clear_defaults(&txn, &owner).await?;
        }

        let now = Utc::now();
        let mut model = address::ActiveModel {
            addressable_id: Set(owner.id),
            addressable_type: Set(owner.kind.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        input.apply(&mut model);

        let address = model.insert(&txn).await?;
        self.owners.touch(&txn, &owner).await?;

        txn.commit().await.map_err(ServiceError::transaction_failed)?;

        info!("Address stored for {}: {}", owner, address.id);
        self.emit(Event::AddressStored(self.change(&address))).await;

        Ok(address)
    }

    /// Replace the editable fields of an address
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: i64, input: AddressInput) -> ServiceResult<AddressModel> {
        input.validate()?;

        let txn = self.begin().await?;
        let existing = find_address(&txn, id).await?;
        let owner = existing.owner_ref(&self.owners)?;
        self.owners.lock(&txn, &owner).await?;

        if input.is_default {
            clear_defaults(&txn, &owner).await?;
        }

        let mut model: address::ActiveModel = existing.into();
        input.apply(&mut model);
        model.updated_at = Set(Utc::now());

        let address = model.update(&txn).await?;
        self.owners.touch(&txn, &owner).await?;

        txn.commit().await.map_err(ServiceError::transaction_failed)?;

        info!("Address updated: {}", address.id);
        self.emit(Event::AddressUpdated(self.change(&address))).await;

        Ok(address)
    }

    /// Promote an address to be its owner's only default
    ///
    /// Clearing the previous defaults and flagging this address happen in one
    /// transaction that holds the owner row lock, so concurrent promotions for
    /// the same owner serialize and the last to commit wins. Storage failures
    /// roll everything back and surface as `TransactionFailed`.
    #[instrument(skip(self))]
    pub async fn make_default(&self, id: i64) -> ServiceResult<AddressModel> {
        let start = Instant::now();
        let txn = self.begin().await?;

        let address = match self.promote(&txn, id).await {
            Ok(address) => address,
            Err(e) => {
                counter!("addresses.make_default.rolled_back", 1);
                warn!(address_id = id, error = %e, "Default address change rolled back");
                return Err(match e {
                    ServiceError::DatabaseError(e) => ServiceError::transaction_failed(e),
                    other => other,
                });
            }
        };

        txn.commit().await.map_err(|e| {
            counter!("addresses.make_default.rolled_back", 1);
            error!(address_id = id, error = %e, "Default address change failed to commit");
            ServiceError::transaction_failed(e)
        })?;

        counter!("addresses.make_default.committed", 1);
        histogram!("addresses.make_default.duration", start.elapsed());

        info!(
            "Address {} is now the default for {}#{}",
            address.id, address.addressable_type, address.addressable_id
        );
        self.emit(Event::AddressMadeDefault(self.change(&address))).await;

        Ok(address)
    }

    async fn promote(&self, txn: &DatabaseTransaction, id: i64) -> ServiceResult<AddressModel> {
        let address = find_address(txn, id).await?;
        let owner = address.owner_ref(&self.owners)?;
        self.owners.lock(txn, &owner).await?;

        clear_defaults(txn, &owner).await?;

        let mut model: address::ActiveModel = address.into();
        model.is_default = Set(true);
        model.updated_at = Set(Utc::now());
        let address = model.update(txn).await?;

        self.owners.touch(txn, &owner).await?;

        Ok(address)
    }

    /// Delete an address
    ///
    /// Rows still referencing the address make this fail with `Conflict`.
    #[instrument(skip(self))]
    pub async fn destroy(&self, id: i64) -> ServiceResult<()> {
        let txn = self.begin().await?;
        let address = find_address(&txn, id).await?;
        let owner = address.owner_ref(&self.owners)?;
        self.owners.lock(&txn, &owner).await?;

        let change = self.change(&address);
        address
            .delete(&txn)
            .await
            .map_err(|e| ServiceError::from_delete(e, "address"))?;
        self.owners.touch(&txn, &owner).await?;

        txn.commit().await.map_err(ServiceError::transaction_failed)?;

        info!("Address deleted: {}", id);
        self.emit(Event::AddressDeleted(change)).await;

        Ok(())
    }

    /// Load the entity owning an address
    #[instrument(skip(self, address), fields(address_id = address.id))]
    pub async fn owner(&self, address: &AddressModel) -> ServiceResult<ResolvedOwner> {
        let owner = address.owner_ref(&self.owners)?;
        self.owners.resolve(&self.db, &owner).await
    }

    /// Load the owning entity as a typed model of `E`
    #[instrument(skip(self, address), fields(address_id = address.id))]
    pub async fn owner_as<E>(&self, address: &AddressModel) -> ServiceResult<E::Model>
    where
        E: Addressable + 'static,
    {
        let owner = address.owner_ref(&self.owners)?;
        self.owners.resolve_as::<E>(&self.db, &owner).await
    }

    #[instrument(skip(self, address), fields(address_id = address.id))]
    pub async fn country(&self, address: &AddressModel) -> ServiceResult<Option<CountryModel>> {
        Ok(address
            .find_related(country::Entity)
            .one(&*self.db)
            .await?)
    }

    /// Whether the owner type supports more than one address
    pub fn can_be_multiple(&self, owner: &OwnerRef) -> ServiceResult<bool> {
        self.owners.can_be_multiple(owner)
    }

    /// True when `owner` is a single-address owner that already has an
    /// address, meaning another one must not be stored
    #[instrument(skip(self, owner), fields(owner = %owner))]
    pub async fn should_be_single(&self, owner: &OwnerRef) -> ServiceResult<bool> {
        self.should_be_single_in(&*self.db, owner).await
    }

    async fn should_be_single_in<C>(&self, conn: &C, owner: &OwnerRef) -> ServiceResult<bool>
    where
        C: ConnectionTrait,
    {
        if self.owners.can_be_multiple(owner)? {
            return Ok(false);
        }

        Ok(owner_has_addresses(conn, owner, None).await?)
    }

    /// True when the address belongs to a multi-address owner that has at
    /// least one other address
    #[instrument(skip(self, address), fields(address_id = address.id))]
    pub async fn is_not_single(&self, address: &AddressModel) -> ServiceResult<bool> {
        let owner = address.owner_ref(&self.owners)?;
        if !self.owners.can_be_multiple(&owner)? {
            return Ok(false);
        }

        Ok(owner_has_addresses(&*self.db, &owner, Some(address.id)).await?)
    }

    async fn begin(&self) -> ServiceResult<DatabaseTransaction> {
        self.db
            .begin()
            .await
            .map_err(ServiceError::transaction_failed)
    }

    fn change(&self, address: &AddressModel) -> AddressChange {
        AddressChange {
            id: Uuid::new_v4(),
            address_id: address.id,
            owner_type: address.addressable_type.clone(),
            owner_id: address.addressable_id,
            loggable_morph: address.loggable_morph(&self.config).to_string(),
            at: Utc::now(),
        }
    }

    async fn emit(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            warn!("Audit event dropped: {}", e);
        }
    }
}

async fn find_address<C>(conn: &C, id: i64) -> ServiceResult<AddressModel>
where
    C: ConnectionTrait,
{
    Address::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Address {} not found", id)))
}

/// Clears the default flag on every address of `owner`
async fn clear_defaults<C>(conn: &C, owner: &OwnerRef) -> Result<u64, DbErr>
where
    C: ConnectionTrait,
{
    let result = Address::update_many()
        .col_expr(address::Column::IsDefault, Expr::value(false))
        .col_expr(address::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(address::Column::AddressableId.eq(owner.id))
        .filter(address::Column::AddressableType.eq(owner.kind.as_str()))
        .filter(address::Column::IsDefault.eq(true))
        .exec(conn)
        .await?;

    Ok(result.rows_affected)
}

async fn owner_has_addresses<C>(
    conn: &C,
    owner: &OwnerRef,
    except: Option<i64>,
) -> Result<bool, DbErr>
where
    C: ConnectionTrait,
{
    let mut query = Address::find().for_owner_ref(owner);
    if let Some(id) = except {
        query = query.filter(address::Column::Id.ne(id));
    }

    Ok(query.count(conn).await? > 0)
}

/// Input for storing or updating an address
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AddressInput {
    pub country_id: Option<i64>,
    #[serde(default)]
    pub is_default: bool,
    #[validate(length(max = 64))]
    pub apartment: Option<String>,
    #[validate(length(max = 64))]
    pub floor: Option<String>,
    #[validate(length(max = 64))]
    pub entry: Option<String>,
    #[validate(length(max = 64))]
    pub building: Option<String>,
    #[validate(length(max = 64))]
    pub building_type: Option<String>,
    #[validate(length(max = 64))]
    pub number: Option<String>,
    #[validate(length(max = 255))]
    pub street: Option<String>,
    #[validate(length(max = 64))]
    pub street_type: Option<String>,
    #[validate(length(max = 255))]
    pub sub_administrative_area: Option<String>,
    #[validate(length(max = 255))]
    pub city: Option<String>,
    #[validate(length(max = 255))]
    pub administrative_area: Option<String>,
    #[validate(length(max = 32))]
    pub postal_area: Option<String>,
    #[validate(length(max = 1000))]
    pub obs: Option<String>,
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub lat: Option<f64>,
    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "Longitude must be between -180 and 180"
    ))]
    pub long: Option<f64>,
}

impl AddressInput {
    fn apply(self, model: &mut address::ActiveModel) {
        model.country_id = Set(self.country_id);
        model.is_default = Set(self.is_default);
        model.apartment = Set(self.apartment);
        model.floor = Set(self.floor);
        model.entry = Set(self.entry);
        model.building = Set(self.building);
        model.building_type = Set(self.building_type);
        model.number = Set(self.number);
        model.street = Set(self.street);
        model.street_type = Set(self.street_type);
        model.sub_administrative_area = Set(self.sub_administrative_area);
        model.city = Set(self.city);
        model.administrative_area = Set(self.administrative_area);
        model.postal_area = Set(self.postal_area);
        model.obs = Set(self.obs);
        model.lat = Set(self.lat);
        model.long = Set(self.long);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressOption {
    pub id: i64,
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_out_of_range_are_rejected() {
        let input = AddressInput {
            lat: Some(91.0),
            long: Some(-181.0),
            ..Default::default()
        };

        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("lat"));
        assert!(fields.contains_key("long"));
    }

    #[test]
    fn overlong_postal_area_is_rejected() {
        let input = AddressInput {
            postal_area: Some("9".repeat(33)),
            ..Default::default()
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn empty_input_is_valid() {
        assert!(AddressInput::default().validate().is_ok());
    }

    #[test]
    fn is_default_defaults_to_false_when_absent() {
        let input: AddressInput = serde_json::from_str(r#"{"street": "Main"}"#).unwrap();
        assert!(!input.is_default);
        assert_eq!(input.street.as_deref(), Some("Main"));
    }
}
