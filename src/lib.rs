//! Polymorphic postal addresses
//!
//! Addresses attach to any entity registered in an [`owners::OwnerRegistry`].
//! Each owner type is either single-address or multi-address; multi-address
//! owners keep at most one default, maintained by
//! [`services::AddressService::make_default`].
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod migrator;
pub mod owners;
pub mod permissions;
pub mod services;

use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::errors::ServiceResult;
use crate::events::{Event, EventSender};
use crate::owners::OwnerRegistry;
use crate::services::{AddressService, RegionService};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: AppConfig,
    pub event_sender: Arc<EventSender>,
    pub addresses: AddressService,
    pub regions: RegionService,
}

impl AppState {
    /// Wires the services over an open connection. The returned receiver
    /// yields the audit events; hand it to [`events::process_events`] or
    /// [`events::dispatch_events`].
    pub fn new(
        db: DatabaseConnection,
        config: AppConfig,
        owners: OwnerRegistry,
    ) -> (Self, mpsc::Receiver<Event>) {
        let (sender, rx) = EventSender::channel(config.event_channel_capacity);
        let db = Arc::new(db);
        let event_sender = Arc::new(sender);

        let addresses = AddressService::new(
            db.clone(),
            Arc::new(owners),
            Arc::new(config.addresses.clone()),
            event_sender.clone(),
        );
        let regions = RegionService::new(db.clone(), event_sender.clone());

        let state = Self {
            db,
            config,
            event_sender,
            addresses,
            regions,
        };

        (state, rx)
    }

    /// Connects using the configured pool settings, then wires the services
    pub async fn connect(
        config: AppConfig,
        owners: OwnerRegistry,
    ) -> ServiceResult<(Self, mpsc::Receiver<Event>)> {
        let db = db::establish_connection_from_app_config(&config).await?;
        Ok(Self::new(db, config, owners))
    }
}
