//! Notifications published on the bus after a ledger commit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agrichain_actors::{ActorEvent, ActorType};
use agrichain_core::{Address, ProductId};
use agrichain_events::{Event, EventEnvelope};
use agrichain_products::ProductEvent;

/// What external observers are told about. Only registrations and product creations
/// are announced; every other change is visible through reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerNotification {
    ActorRegistered {
        address: Address,
        name: String,
        actor_type: ActorType,
        occurred_at: DateTime<Utc>,
    },
    ProductCreated {
        product_id: ProductId,
        name: String,
        creator: Address,
        occurred_at: DateTime<Utc>,
    },
}

/// Message type carried by the ledger's bus.
pub type NotificationEnvelope = EventEnvelope<LedgerNotification>;

impl LedgerNotification {
    pub fn from_actor_event(event: &ActorEvent) -> Option<Self> {
        match event {
            ActorEvent::ActorRegistered(e) => Some(LedgerNotification::ActorRegistered {
                address: e.address,
                name: e.name.clone(),
                actor_type: e.actor_type,
                occurred_at: e.occurred_at,
            }),
        }
    }

    pub fn from_product_event(event: &ProductEvent) -> Option<Self> {
        match event {
            ProductEvent::ProductCreated(e) => Some(LedgerNotification::ProductCreated {
                product_id: e.product_id,
                name: e.product.name.clone(),
                creator: e.creator,
                occurred_at: e.occurred_at,
            }),
            _ => None,
        }
    }
}

impl Event for LedgerNotification {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerNotification::ActorRegistered { .. } => "ledger.actor_registered",
            LedgerNotification::ProductCreated { .. } => "ledger.product_created",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerNotification::ActorRegistered { occurred_at, .. }
            | LedgerNotification::ProductCreated { occurred_at, .. } => *occurred_at,
        }
    }
}
