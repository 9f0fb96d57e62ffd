#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use addresses::{
    config::AppConfig,
    entities::{country, locality, region, CountryModel, LocalityModel, RegionModel},
    events::{dispatch_events, Event, EventHandler},
    owners::{AddressCardinality, Addressable, OwnerKind, OwnerRef, OwnerRegistry},
    services::AddressInput,
    AppState,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Schema, Set,
};
use tokio::sync::Mutex;

/// Multi-address owner used by the tests
pub mod company {
    use chrono::{DateTime, Utc};
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "companies")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub name: String,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Single-address owner used by the tests
pub mod person {
    use chrono::{DateTime, Utc};
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "people")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub name: String,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl Addressable for company::Entity {
    const KIND: OwnerKind = OwnerKind::new("company");
    const CARDINALITY: AddressCardinality = AddressCardinality::Multiple;

    fn id_column() -> company::Column {
        company::Column::Id
    }

    fn touch_column() -> company::Column {
        company::Column::UpdatedAt
    }
}

impl Addressable for person::Entity {
    const KIND: OwnerKind = OwnerKind::new("person");
    const CARDINALITY: AddressCardinality = AddressCardinality::Single;

    fn id_column() -> person::Column {
        person::Column::Id
    }

    fn touch_column() -> person::Column {
        person::Column::UpdatedAt
    }
}

/// Collects every audit event the services emit
#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<Event>>,
}

#[async_trait]
impl EventHandler for EventLog {
    async fn handle_event(&self, event: Event) -> Result<(), String> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

/// Timestamp far enough in the past that any touch moves it forward
pub fn long_ago() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2000-01-01T00:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

/// Helper harness for spinning up the services over an in-memory SQLite database.
pub struct TestApp {
    pub state: AppState,
    pub events: Arc<EventLog>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(Self::config()).await
    }

    /// Minimal configuration suitable for tests
    pub fn config() -> AppConfig {
        let mut cfg = AppConfig::new("sqlite::memory:".to_string(), "test".to_string());
        cfg.auto_migrate = true;
        // One connection keeps the in-memory database alive and shared.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg
    }

    pub async fn with_config(cfg: AppConfig) -> Self {
        let owners = OwnerRegistry::new()
            .register::<company::Entity>()
            .register::<person::Entity>();

        let (state, rx) = AppState::connect(cfg, owners)
            .await
            .expect("failed to create test database");

        let schema = Schema::new(state.db.get_database_backend());
        for stmt in [
            schema.create_table_from_entity(company::Entity),
            schema.create_table_from_entity(person::Entity),
        ] {
            state
                .db
                .execute(state.db.get_database_backend().build(&stmt))
                .await
                .expect("create owner table");
        }

        let events = Arc::new(EventLog::default());
        let handlers: Vec<Arc<dyn EventHandler>> = vec![events.clone()];
        let event_task = tokio::spawn(dispatch_events(rx, handlers));

        Self {
            state,
            events,
            _event_task: event_task,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    pub async fn company(&self, name: &str) -> OwnerRef {
        let company = company::ActiveModel {
            name: Set(name.to_string()),
            updated_at: Set(long_ago()),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("insert company");

        OwnerRef::of::<company::Entity>(company.id)
    }

    pub async fn person(&self, name: &str) -> OwnerRef {
        let person = person::ActiveModel {
            name: Set(name.to_string()),
            updated_at: Set(long_ago()),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("insert person");

        OwnerRef::of::<person::Entity>(person.id)
    }

    pub async fn company_touched_at(&self, owner: &OwnerRef) -> DateTime<Utc> {
        company::Entity::find_by_id(owner.id)
            .one(self.db())
            .await
            .expect("load company")
            .expect("company exists")
            .updated_at
    }

    pub async fn country(&self, name: &str) -> CountryModel {
        country::ActiveModel {
            name: Set(name.to_string()),
            iso_3166_2: Set(None),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("insert country")
    }

    pub async fn region(&self, country_id: i64, name: &str, is_active: bool) -> RegionModel {
        region::ActiveModel {
            country_id: Set(country_id),
            name: Set(name.to_string()),
            is_active: Set(is_active),
            created_at: Set(Utc::now()),
            updated_at: Set(long_ago()),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("insert region")
    }

    pub async fn locality(&self, region_id: i64, name: &str, is_active: bool) -> LocalityModel {
        locality::ActiveModel {
            region_id: Set(region_id),
            name: Set(name.to_string()),
            is_active: Set(is_active),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("insert locality")
    }

    /// Waits until at least `count` events were handled
    pub async fn wait_for_events(&self, count: usize) -> Vec<Event> {
        for _ in 0..100 {
            {
                let events = self.events.events.lock().await;
                if events.len() >= count {
                    return events.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        self.events.events.lock().await.clone()
    }
}

pub fn street(street: &str) -> AddressInput {
    AddressInput {
        street: Some(street.to_string()),
        ..Default::default()
    }
}

pub fn default_street(street: &str) -> AddressInput {
    AddressInput {
        is_default: true,
        ..self::street(street)
    }
}
