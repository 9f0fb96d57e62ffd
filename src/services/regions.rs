use crate::{
    entities::{
        active_state::set_active, locality, region, ActiveState, Country, CountryModel, Locality,
        LocalityModel, Region, RegionModel,
    },
    errors::{ServiceError, ServiceResult},
    events::{Event, EventSender},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Region and locality lookups backing the address forms
#[derive(Clone)]
pub struct RegionService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl RegionService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Active regions of a country, by name
    #[instrument(skip(self))]
    pub async fn regions(&self, country_id: i64) -> ServiceResult<Vec<RegionModel>> {
        Ok(Region::active()
            .filter(region::Column::CountryId.eq(country_id))
            .order_by_asc(region::Column::Name)
            .all(&*self.db)
            .await?)
    }

    /// Active localities of a region, by name
    #[instrument(skip(self))]
    pub async fn localities(&self, region_id: i64) -> ServiceResult<Vec<LocalityModel>> {
        Ok(Locality::active()
            .filter(locality::Column::RegionId.eq(region_id))
            .order_by_asc(locality::Column::Name)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn find(&self, id: i64) -> ServiceResult<RegionModel> {
        Region::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Region {} not found", id)))
    }

    #[instrument(skip(self, region), fields(region_id = region.id))]
    pub async fn country(&self, region: &RegionModel) -> ServiceResult<CountryModel> {
        region
            .find_related(Country)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Country {} not found", region.country_id))
            })
    }

    /// Every locality of a region, inactive ones included
    #[instrument(skip(self, region), fields(region_id = region.id))]
    pub async fn all_localities(&self, region: &RegionModel) -> ServiceResult<Vec<LocalityModel>> {
        Ok(region
            .find_related(Locality)
            .order_by_asc(locality::Column::Name)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn activate(&self, id: i64) -> ServiceResult<RegionModel> {
        self.set_active(id, true).await
    }

    #[instrument(skip(self))]
    pub async fn deactivate(&self, id: i64) -> ServiceResult<RegionModel> {
        self.set_active(id, false).await
    }

    async fn set_active(&self, id: i64, active: bool) -> ServiceResult<RegionModel> {
        if set_active::<Region, _>(&*self.db, id, active).await? == 0 {
            return Err(ServiceError::NotFound(format!("Region {} not found", id)));
        }

        let event = if active {
            info!("Region activated: {}", id);
            Event::RegionActivated(id)
        } else {
            info!("Region deactivated: {}", id);
            Event::RegionDeactivated(id)
        };

        if let Err(e) = self.event_sender.send(event).await {
            warn!("Audit event dropped: {}", e);
        }

        self.find(id).await
    }
}
