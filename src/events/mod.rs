use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Creates a sender together with the receiving end of a bounded channel
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Audit trail entry for an address change, recorded against the owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressChange {
    /// Unique id of the audit entry
    pub id: Uuid,
    pub address_id: i64,
    pub owner_type: String,
    pub owner_id: i64,
    /// Relation name the audit log files the change under
    pub loggable_morph: String,
    pub at: DateTime<Utc>,
}

// Changes the audit log cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    AddressStored(AddressChange),
    AddressUpdated(AddressChange),
    AddressDeleted(AddressChange),
    AddressMadeDefault(AddressChange),

    RegionActivated(i64),
    RegionDeactivated(i64),
}

impl Event {
    /// Address change carried by the event, if any
    pub fn address_change(&self) -> Option<&AddressChange> {
        match self {
            Event::AddressStored(change)
            | Event::AddressUpdated(change)
            | Event::AddressDeleted(change)
            | Event::AddressMadeDefault(change) => Some(change),
            Event::RegionActivated(_) | Event::RegionDeactivated(_) => None,
        }
    }
}

// Handlers implementing this trait consume events asynchronously.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: Event) -> Result<(), String>;
}

/// Logs every event until all senders are dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::AddressStored(change) => info!(
                event_id = %change.id,
                address_id = change.address_id,
                owner = %change.owner_type,
                owner_id = change.owner_id,
                morph = %change.loggable_morph,
                "Address stored"
            ),
            Event::AddressUpdated(change) => info!(
                address_id = change.address_id,
                owner = %change.owner_type,
                owner_id = change.owner_id,
                morph = %change.loggable_morph,
                "Address updated"
            ),
            Event::AddressDeleted(change) => info!(
                address_id = change.address_id,
                owner = %change.owner_type,
                owner_id = change.owner_id,
                morph = %change.loggable_morph,
                "Address deleted"
            ),
            Event::AddressMadeDefault(change) => info!(
                address_id = change.address_id,
                owner = %change.owner_type,
                owner_id = change.owner_id,
                morph = %change.loggable_morph,
                "Address made default"
            ),
            Event::RegionActivated(region_id) => info!("Region activated: {}", region_id),
            Event::RegionDeactivated(region_id) => info!("Region deactivated: {}", region_id),
        }
    }

    warn!("Event processing loop has ended");
}

/// Fans every event out to all handlers. A failing handler is logged and
/// does not stop the others.
pub async fn dispatch_events(mut rx: mpsc::Receiver<Event>, handlers: Vec<Arc<dyn EventHandler>>) {
    info!(handlers = handlers.len(), "Starting event dispatch loop");

    while let Some(event) = rx.recv().await {
        let results = join_all(
            handlers
                .iter()
                .map(|handler| handler.handle_event(event.clone())),
        )
        .await;

        for e in results.into_iter().filter_map(Result::err) {
            error!("Failed to handle event {:?}: {}", event, e);
        }
    }

    warn!("Event dispatch loop has ended");
}
