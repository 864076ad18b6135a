//! The transactional ledger: one store, one writer at a time, one global order.
//!
//! ## Commit pipeline
//!
//! ```text
//! operation(caller, args)
//!   ↓
//! 1. take the write lock (serializes every mutating operation)
//!   ↓
//! 2. resolve cross-record facts (caller registration, recipient, balances)
//!   ↓
//! 3. decide events on the aggregates (pure, no mutation)
//!   ↓
//! 4. append the whole batch to the journal, expecting the current head
//!   ↓
//! 5. apply the committed events to the materialized state
//!   ↓
//! 6. publish notifications (best effort, after commit)
//! ```
//!
//! A failure in steps 2 to 4 leaves both the journal and the state untouched.

pub mod error;
pub mod state;

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use agrichain_actors::{Actor, ActorCommand, ActorType, RegisterActor};
use agrichain_core::{Address, Aggregate, Amount, DomainError, ExpectedVersion, ProductId};
use agrichain_events::{EventBus, Subscription};
use agrichain_products::{
    AddQualityCertificate, ChangeProductState, CreateProduct, NewProduct, Product,
    ProductCommand, ProductEvent, ProductPurchased, ProductState, PurchaseProduct, StateChange,
    TransferProduct,
};
use agrichain_settlement::{AccountCommand, CreditAccount, TransferReason, settle};

use crate::clock::Clock;
use crate::event_store::{EventStore, StoredEvent};
use crate::notification::{LedgerNotification, NotificationEnvelope};

pub use error::LedgerError;
pub use state::{LedgerEvent, LedgerState};

/// The ledger service.
///
/// Generic over the journal `S` and the notification bus `B` so tests and the server
/// can plug in the in-memory implementations.
pub struct Ledger<S, B> {
    store: S,
    bus: B,
    clock: Arc<dyn Clock>,
    state: RwLock<LedgerState>,
}

impl<S, B> core::fmt::Debug for Ledger<S, B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Ledger").finish_non_exhaustive()
    }
}

impl<S, B> Ledger<S, B>
where
    S: EventStore,
    B: EventBus<NotificationEnvelope>,
{
    /// Open a ledger over `store`, rebuilding state from whatever the journal holds.
    pub fn open(store: S, bus: B, clock: Arc<dyn Clock>) -> Result<Self, LedgerError> {
        let history = store.load_all()?;
        let state = LedgerState::replay(&history)?;

        info!(
            head = state.head(),
            actors = state.total_actors(),
            products = state.total_products(),
            "ledger opened"
        );

        Ok(Self {
            store,
            bus,
            clock,
            state: RwLock::new(state),
        })
    }

    pub fn subscribe(&self) -> Subscription<NotificationEnvelope> {
        self.bus.subscribe()
    }

    // ---- mutating operations -------------------------------------------------------

    /// Register the caller as an actor.
    pub fn register_actor(
        &self,
        caller: Address,
        name: &str,
        location: &str,
        actor_type: ActorType,
    ) -> Result<Actor, LedgerError> {
        let mut state = self.write()?;
        let now = self.now(&state);

        let actor = state.actor_or_empty(caller);
        let cmd = ActorCommand::RegisterActor(RegisterActor {
            address: caller,
            name: name.to_string(),
            location: location.to_string(),
            actor_type,
            occurred_at: now,
        });
        let decided = actor
            .handle(&cmd)
            .map_err(|e| rejected("register_actor", caller, e))?;

        let committed = self.commit(
            &mut state,
            Some(caller),
            decided.into_iter().map(LedgerEvent::Actor).collect(),
        )?;
        info!(
            op = "register_actor",
            %caller,
            actor_type = %actor_type,
            position = last_position(&committed),
            "ledger commit"
        );

        Ok(state.actor_or_empty(caller))
    }

    /// Create a product owned by the caller. Returns the allocated id.
    pub fn create_product(
        &self,
        caller: Address,
        details: NewProduct,
    ) -> Result<ProductId, LedgerError> {
        let mut state = self.write()?;
        let now = self.now(&state);

        let product_id = state.next_product_id();
        let creator_role = state.actor(&caller).filter(|a| a.is_active()).map(|a| a.actor_type());

        let cmd = ProductCommand::CreateProduct(CreateProduct {
            product_id,
            creator: caller,
            creator_role,
            product: details,
            occurred_at: now,
        });
        let decided = Product::empty(product_id)
            .handle(&cmd)
            .map_err(|e| rejected("create_product", caller, e))?;

        let committed = self.commit(
            &mut state,
            Some(caller),
            decided.into_iter().map(LedgerEvent::Product).collect(),
        )?;
        info!(
            op = "create_product",
            %caller,
            %product_id,
            position = last_position(&committed),
            "ledger commit"
        );

        Ok(product_id)
    }

    pub fn transfer_product(
        &self,
        caller: Address,
        product_id: ProductId,
        new_owner: Address,
    ) -> Result<(), LedgerError> {
        let mut state = self.write()?;
        let now = self.now(&state);

        let cmd = ProductCommand::TransferProduct(TransferProduct {
            product_id,
            caller,
            caller_active: state.is_active(&caller),
            new_owner,
            recipient_active: state.is_active(&new_owner),
            occurred_at: now,
        });
        let decided = state
            .product_or_empty(product_id)
            .handle(&cmd)
            .map_err(|e| rejected("transfer_product", caller, e))?;

        let committed = self.commit(
            &mut state,
            Some(caller),
            decided.into_iter().map(LedgerEvent::Product).collect(),
        )?;
        info!(
            op = "transfer_product",
            %caller,
            %product_id,
            %new_owner,
            position = last_position(&committed),
            "ledger commit"
        );

        Ok(())
    }

    pub fn change_product_state(
        &self,
        caller: Address,
        product_id: ProductId,
        new_state: ProductState,
        notes: &str,
    ) -> Result<(), LedgerError> {
        let mut state = self.write()?;
        let now = self.now(&state);

        let location = state
            .actor(&caller)
            .map(|a| a.location().to_string())
            .unwrap_or_default();
        let cmd = ProductCommand::ChangeProductState(ChangeProductState {
            product_id,
            caller,
            caller_active: state.is_active(&caller),
            location,
            new_state,
            notes: notes.to_string(),
            occurred_at: now,
        });
        let decided = state
            .product_or_empty(product_id)
            .handle(&cmd)
            .map_err(|e| rejected("change_product_state", caller, e))?;

        let committed = self.commit(
            &mut state,
            Some(caller),
            decided.into_iter().map(LedgerEvent::Product).collect(),
        )?;
        info!(
            op = "change_product_state",
            %caller,
            %product_id,
            new_state = %new_state,
            position = last_position(&committed),
            "ledger commit"
        );

        Ok(())
    }

    pub fn add_quality_certificate(
        &self,
        caller: Address,
        product_id: ProductId,
        certificate: &str,
    ) -> Result<(), LedgerError> {
        let mut state = self.write()?;
        let now = self.now(&state);

        let cmd = ProductCommand::AddQualityCertificate(AddQualityCertificate {
            product_id,
            caller,
            caller_active: state.is_active(&caller),
            certificate: certificate.to_string(),
            occurred_at: now,
        });
        let decided = state
            .product_or_empty(product_id)
            .handle(&cmd)
            .map_err(|e| rejected("add_quality_certificate", caller, e))?;

        let committed = self.commit(
            &mut state,
            Some(caller),
            decided.into_iter().map(LedgerEvent::Product).collect(),
        )?;
        info!(
            op = "add_quality_certificate",
            %caller,
            %product_id,
            position = last_position(&committed),
            "ledger commit"
        );

        Ok(())
    }

    /// Buy a received product with `value` attached. The buyer need not be registered.
    ///
    /// Ownership, state, history and all balance movements commit as one journal batch.
    pub fn purchase_product(
        &self,
        buyer: Address,
        product_id: ProductId,
        value: Amount,
    ) -> Result<ProductPurchased, LedgerError> {
        let mut state = self.write()?;
        let now = self.now(&state);

        let cmd = ProductCommand::PurchaseProduct(PurchaseProduct {
            product_id,
            buyer,
            payment: value,
            occurred_at: now,
        });
        let product_events = state
            .product_or_empty(product_id)
            .handle(&cmd)
            .map_err(|e| rejected("purchase_product", buyer, e))?;

        let purchased = product_events
            .iter()
            .find_map(|e| match e {
                ProductEvent::ProductPurchased(p) => Some(p.clone()),
                _ => None,
            })
            .ok_or_else(|| {
                LedgerError::Inconsistent(format!("purchase of {product_id} decided no sale"))
            })?;

        let account_events = settle(
            &purchased,
            &state.account_or_empty(buyer),
            &state.account_or_empty(purchased.seller),
        )
        .map_err(|e| rejected("purchase_product", buyer, e))?;

        let batch = product_events
            .into_iter()
            .map(LedgerEvent::Product)
            .chain(account_events.into_iter().map(LedgerEvent::Account))
            .collect();
        let committed = self.commit(&mut state, Some(buyer), batch)?;
        info!(
            op = "purchase_product",
            %buyer,
            seller = %purchased.seller,
            %product_id,
            price = %purchased.price,
            refund = %purchased.refund,
            position = last_position(&committed),
            "ledger commit"
        );

        Ok(purchased)
    }

    /// Credit `amount` to `address` outside any purchase (genesis allocation, faucet).
    pub fn fund_account(&self, address: Address, amount: Amount) -> Result<Amount, LedgerError> {
        let mut state = self.write()?;
        let now = self.now(&state);

        let cmd = AccountCommand::Credit(CreditAccount {
            address,
            amount,
            reason: TransferReason::Funding,
            occurred_at: now,
        });
        let decided = state
            .account_or_empty(address)
            .handle(&cmd)
            .map_err(|e| rejected("fund_account", address, e))?;

        let committed = self.commit(
            &mut state,
            None,
            decided.into_iter().map(LedgerEvent::Account).collect(),
        )?;
        info!(
            op = "fund_account",
            %address,
            %amount,
            position = last_position(&committed),
            "ledger commit"
        );

        Ok(state.balance_of(&address))
    }

    // ---- reads ---------------------------------------------------------------------

    pub fn get_actor(&self, address: &Address) -> Result<Option<Actor>, LedgerError> {
        Ok(self.read()?.actor(address).cloned())
    }

    /// Registered actors in registration order.
    pub fn get_all_actors(&self) -> Result<Vec<Actor>, LedgerError> {
        Ok(self.read()?.actors().cloned().collect())
    }

    pub fn get_total_actors(&self) -> Result<usize, LedgerError> {
        Ok(self.read()?.total_actors())
    }

    pub fn get_product(&self, product_id: ProductId) -> Result<Product, LedgerError> {
        self.read()?
            .product(product_id)
            .cloned()
            .ok_or(LedgerError::Domain(DomainError::ProductNotFound(product_id)))
    }

    pub fn get_product_history(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<StateChange>, LedgerError> {
        Ok(self.get_product(product_id)?.history().to_vec())
    }

    pub fn get_product_ownership_history(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Address>, LedgerError> {
        Ok(self.get_product(product_id)?.ownership_history().to_vec())
    }

    /// All product ids in creation order.
    pub fn get_all_products(&self) -> Result<Vec<ProductId>, LedgerError> {
        Ok(self.read()?.products().map(|p| p.id_typed()).collect())
    }

    /// Ids of the products `owner` currently owns, in id order.
    pub fn get_actor_products(&self, owner: &Address) -> Result<Vec<ProductId>, LedgerError> {
        Ok(self
            .read()?
            .products()
            .filter(|p| &p.current_owner() == owner)
            .map(|p| p.id_typed())
            .collect())
    }

    pub fn get_total_products(&self) -> Result<usize, LedgerError> {
        Ok(self.read()?.total_products())
    }

    /// Whether the product's expiry date has been reached. Informational only.
    pub fn is_product_expired(&self, product_id: ProductId) -> Result<bool, LedgerError> {
        let state = self.read()?;
        let product = state
            .product(product_id)
            .ok_or(LedgerError::Domain(DomainError::ProductNotFound(product_id)))?;
        Ok(product.is_expired(self.now(&state)))
    }

    pub fn balance_of(&self, address: &Address) -> Result<Amount, LedgerError> {
        Ok(self.read()?.balance_of(address))
    }

    /// Journal position of the last committed event.
    pub fn head(&self) -> Result<u64, LedgerError> {
        Ok(self.read()?.head())
    }

    /// Copy of the full materialized state.
    pub fn snapshot(&self) -> Result<LedgerState, LedgerError> {
        Ok(self.read()?.clone())
    }

    // ---- internals -----------------------------------------------------------------

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerState>, LedgerError> {
        self.state.read().map_err(|_| LedgerError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LedgerState>, LedgerError> {
        self.state.write().map_err(|_| LedgerError::Poisoned)
    }

    /// Ledger time never runs backwards, even if the wall clock does.
    fn now(&self, state: &LedgerState) -> DateTime<Utc> {
        let now = self.clock.now();
        match state.last_committed_at() {
            Some(last) if last > now => last,
            _ => now,
        }
    }

    fn commit(
        &self,
        state: &mut LedgerState,
        caller: Option<Address>,
        events: Vec<LedgerEvent>,
    ) -> Result<Vec<StoredEvent>, LedgerError> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        let uncommitted = events
            .iter()
            .map(|e| e.to_uncommitted(caller))
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self
            .store
            .append(uncommitted, ExpectedVersion::Exact(state.head()))?;

        for (event, stored) in events.iter().zip(&committed) {
            state.apply(event);
            state.record_commit(stored);
        }

        for (event, stored) in events.iter().zip(&committed) {
            self.notify(event, stored);
        }

        Ok(committed)
    }

    fn notify(&self, event: &LedgerEvent, stored: &StoredEvent) {
        let notification = match event {
            LedgerEvent::Actor(e) => LedgerNotification::from_actor_event(e),
            LedgerEvent::Product(e) => LedgerNotification::from_product_event(e),
            LedgerEvent::Account(_) => None,
        };
        let Some(notification) = notification else {
            return;
        };

        if let Err(err) = self.bus.publish(stored.envelope(notification)) {
            warn!(position = stored.position, error = ?err, "failed to publish ledger notification");
        }
    }
}

fn rejected(op: &'static str, caller: Address, err: DomainError) -> LedgerError {
    debug!(op, %caller, code = err.code(), error = %err, "ledger operation rejected");
    LedgerError::Domain(err)
}

fn last_position(committed: &[StoredEvent]) -> u64 {
    committed.last().map(|e| e.position).unwrap_or(0)
}
