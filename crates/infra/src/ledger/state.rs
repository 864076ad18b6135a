//! Materialized ledger state and the journal codec for ledger events.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use agrichain_actors::{Actor, ActorEvent};
use agrichain_core::{Address, Aggregate, Amount, ProductId};
use agrichain_events::StreamId;
use agrichain_products::{Product, ProductEvent};
use agrichain_settlement::{Account, AccountEvent};

use crate::event_store::{EventStoreError, StoredEvent, UncommittedEvent};
use crate::ledger::error::LedgerError;

pub const ACTOR_STREAM: &str = "actors.actor";
pub const PRODUCT_STREAM: &str = "products.product";
pub const ACCOUNT_STREAM: &str = "settlement.account";

/// Any event the ledger writes, tagged by the aggregate it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    Actor(ActorEvent),
    Product(ProductEvent),
    Account(AccountEvent),
}

impl LedgerEvent {
    pub fn stream(&self) -> StreamId {
        match self {
            LedgerEvent::Actor(ActorEvent::ActorRegistered(e)) => {
                StreamId::new(ACTOR_STREAM, e.address)
            }
            LedgerEvent::Product(e) => StreamId::new(PRODUCT_STREAM, product_id_of(e)),
            LedgerEvent::Account(e) => StreamId::new(ACCOUNT_STREAM, e.address()),
        }
    }

    pub fn to_uncommitted(
        &self,
        caller: Option<Address>,
    ) -> Result<UncommittedEvent, EventStoreError> {
        let stream = self.stream();
        let event_id = Uuid::now_v7();
        match self {
            LedgerEvent::Actor(e) => UncommittedEvent::from_typed(stream, event_id, caller, e),
            LedgerEvent::Product(e) => UncommittedEvent::from_typed(stream, event_id, caller, e),
            LedgerEvent::Account(e) => UncommittedEvent::from_typed(stream, event_id, caller, e),
        }
    }

    /// Decode a journal entry back into a typed event, dispatching on its stream type.
    pub fn decode(stored: &StoredEvent) -> Result<Self, LedgerError> {
        let payload = stored.payload.clone();
        let decoded = match stored.stream.aggregate_type.as_str() {
            ACTOR_STREAM => serde_json::from_value(payload).map(LedgerEvent::Actor),
            PRODUCT_STREAM => serde_json::from_value(payload).map(LedgerEvent::Product),
            ACCOUNT_STREAM => serde_json::from_value(payload).map(LedgerEvent::Account),
            other => {
                return Err(LedgerError::Deserialize {
                    position: stored.position,
                    message: format!("unknown stream type '{other}'"),
                });
            }
        };
        decoded.map_err(|e| LedgerError::Deserialize {
            position: stored.position,
            message: e.to_string(),
        })
    }
}

pub(crate) fn product_id_of(event: &ProductEvent) -> ProductId {
    match event {
        ProductEvent::ProductCreated(e) => e.product_id,
        ProductEvent::ProductTransferred(e) => e.product_id,
        ProductEvent::ProductStateChanged(e) => e.product_id,
        ProductEvent::QualityCertificateAdded(e) => e.product_id,
        ProductEvent::ProductPurchased(e) => e.product_id,
    }
}

/// Everything the ledger knows, as of its last committed journal position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerState {
    actors: HashMap<Address, Actor>,
    actor_order: Vec<Address>,
    products: BTreeMap<ProductId, Product>,
    accounts: HashMap<Address, Account>,
    head: u64,
    last_committed_at: Option<DateTime<Utc>>,
}

impl LedgerState {
    /// Rebuild state by applying every journal entry in position order.
    pub fn replay(history: &[StoredEvent]) -> Result<Self, LedgerError> {
        let mut state = Self::default();
        for stored in history {
            if stored.position <= state.head {
                return Err(LedgerError::Deserialize {
                    position: stored.position,
                    message: format!("journal position not increasing (head {})", state.head),
                });
            }
            let event = LedgerEvent::decode(stored)?;
            state.apply(&event);
            state.record_commit(stored);
        }
        Ok(state)
    }

    pub fn apply(&mut self, event: &LedgerEvent) {
        match event {
            LedgerEvent::Actor(e) => {
                let ActorEvent::ActorRegistered(registered) = e;
                let address = registered.address;
                let actor = self
                    .actors
                    .entry(address)
                    .or_insert_with(|| Actor::empty(address));
                if !actor.is_registered() {
                    self.actor_order.push(address);
                }
                actor.apply(e);
            }
            LedgerEvent::Product(e) => {
                let id = product_id_of(e);
                self.products
                    .entry(id)
                    .or_insert_with(|| Product::empty(id))
                    .apply(e);
            }
            LedgerEvent::Account(e) => {
                let address = e.address();
                self.accounts
                    .entry(address)
                    .or_insert_with(|| Account::empty(address))
                    .apply(e);
            }
        }
    }

    pub(crate) fn record_commit(&mut self, stored: &StoredEvent) {
        self.head = stored.position;
        self.last_committed_at = Some(match self.last_committed_at {
            Some(last) if last > stored.occurred_at => last,
            _ => stored.occurred_at,
        });
    }

    pub fn head(&self) -> u64 {
        self.head
    }

    pub fn last_committed_at(&self) -> Option<DateTime<Utc>> {
        self.last_committed_at
    }

    pub fn actor(&self, address: &Address) -> Option<&Actor> {
        self.actors.get(address).filter(|a| a.is_registered())
    }

    /// Registered actor, or the inactive default record for the identity.
    pub fn actor_or_empty(&self, address: Address) -> Actor {
        self.actor(&address)
            .cloned()
            .unwrap_or_else(|| Actor::empty(address))
    }

    pub fn is_active(&self, address: &Address) -> bool {
        self.actor(address).is_some_and(|a| a.is_active())
    }

    /// Actors in registration order.
    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actor_order.iter().filter_map(|a| self.actors.get(a))
    }

    pub fn total_actors(&self) -> usize {
        self.actor_order.len()
    }

    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id).filter(|p| p.exists())
    }

    pub fn product_or_empty(&self, id: ProductId) -> Product {
        self.product(id)
            .cloned()
            .unwrap_or_else(|| Product::empty(id))
    }

    /// Products in creation (id) order.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values().filter(|p| p.exists())
    }

    pub fn total_products(&self) -> usize {
        self.products().count()
    }

    pub fn next_product_id(&self) -> ProductId {
        self.products
            .keys()
            .next_back()
            .map(|id| id.next())
            .unwrap_or(ProductId::FIRST)
    }

    pub fn account_or_empty(&self, address: Address) -> Account {
        self.accounts
            .get(&address)
            .cloned()
            .unwrap_or_else(|| Account::empty(address))
    }

    pub fn balance_of(&self, address: &Address) -> Amount {
        self.accounts
            .get(address)
            .map(|a| a.balance())
            .unwrap_or(Amount::ZERO)
    }
}
