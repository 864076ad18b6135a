//! End-to-end ledger tests.
//!
//! Operation → aggregates → journal → materialized state → notifications.
//!
//! Verifies:
//! - the full farm-to-consumer supply chain scenario
//! - failed operations leave journal, state and balances untouched
//! - replaying the journal reproduces the state
//! - two writers sharing one journal cannot interleave

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use agrichain_actors::ActorType;
use agrichain_core::{Address, Amount, DomainError, ProductId};
use agrichain_events::{EventBus, InMemoryEventBus};
use agrichain_products::{NewProduct, ProduceType, ProductState};
use agrichain_settlement::TransferReason;

use crate::clock::{Clock, ManualClock};
use crate::event_store::{EventStore, InMemoryEventStore};
use crate::ledger::{Ledger, LedgerError, LedgerEvent, LedgerState};
use crate::notification::{LedgerNotification, NotificationEnvelope};

type TestLedger =
    Ledger<Arc<InMemoryEventStore>, Arc<InMemoryEventBus<NotificationEnvelope>>>;

const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

fn price() -> Amount {
    Amount::new(ONE_ETHER / 10)
}

fn farmer() -> Address {
    Address::from_low_u64(1)
}
fn processor() -> Address {
    Address::from_low_u64(2)
}
fn distributor() -> Address {
    Address::from_low_u64(3)
}
fn retailer() -> Address {
    Address::from_low_u64(4)
}
fn consumer() -> Address {
    Address::from_low_u64(5)
}

struct Harness {
    ledger: TestLedger,
    store: Arc<InMemoryEventStore>,
    bus: Arc<InMemoryEventBus<NotificationEnvelope>>,
    clock: Arc<ManualClock>,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryEventStore::new());
    let bus = Arc::new(InMemoryEventBus::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let ledger = Ledger::open(store.clone(), bus.clone(), clock.clone()).unwrap();
    Harness {
        ledger,
        store,
        bus,
        clock,
    }
}

fn apples(now: DateTime<Utc>) -> NewProduct {
    NewProduct {
        name: "Organic Apples".to_string(),
        description: "Fresh organic apples from local farm".to_string(),
        produce_type: ProduceType::Fruits,
        quantity: 1000,
        price: price(),
        expiry_date: now + Duration::days(30),
        origin_farm: "Green Valley Farm".to_string(),
    }
}

fn register_chain(ledger: &TestLedger) {
    ledger
        .register_actor(farmer(), "John Farmer", "Green Valley, CA", ActorType::Farmer)
        .unwrap();
    ledger
        .register_actor(processor(), "Fresh Processing Co", "Industrial Park, CA", ActorType::Processor)
        .unwrap();
    ledger
        .register_actor(distributor(), "Fast Logistics", "Distribution Center, CA", ActorType::Distributor)
        .unwrap();
    ledger
        .register_actor(retailer(), "Green Grocer", "Downtown Market, CA", ActorType::Retailer)
        .unwrap();
}

/// Walk product 1 from the farmer to the retailer, in `Received`.
fn deliver_to_retailer(h: &Harness) -> ProductId {
    let l = &h.ledger;
    let id = l.create_product(farmer(), apples(h.clock.now())).unwrap();
    l.transfer_product(farmer(), id, processor()).unwrap();
    l.change_product_state(processor(), id, ProductState::Processed, "packaged")
        .unwrap();
    l.transfer_product(processor(), id, distributor()).unwrap();
    l.change_product_state(distributor(), id, ProductState::Shipped, "in transit")
        .unwrap();
    l.transfer_product(distributor(), id, retailer()).unwrap();
    l.change_product_state(retailer(), id, ProductState::Received, "on shelf")
        .unwrap();
    id
}

#[test]
fn full_supply_chain_scenario() {
    let h = harness();
    register_chain(&h.ledger);
    h.ledger.fund_account(consumer(), Amount::new(ONE_ETHER)).unwrap();

    let id = h
        .ledger
        .create_product(farmer(), apples(h.clock.now()))
        .unwrap();
    assert_eq!(id, ProductId::FIRST);
    assert_eq!(
        h.ledger.get_product(id).unwrap().current_state(),
        ProductState::Harvested
    );

    h.ledger.transfer_product(farmer(), id, processor()).unwrap();
    h.ledger
        .change_product_state(processor(), id, ProductState::Processed, "packaged")
        .unwrap();
    assert_eq!(h.ledger.get_product_history(id).unwrap().len(), 2);

    h.ledger.transfer_product(processor(), id, distributor()).unwrap();
    h.ledger
        .change_product_state(distributor(), id, ProductState::Shipped, "in transit")
        .unwrap();
    h.ledger.transfer_product(distributor(), id, retailer()).unwrap();
    h.ledger
        .change_product_state(retailer(), id, ProductState::Received, "on shelf")
        .unwrap();
    assert_eq!(h.ledger.get_product_history(id).unwrap().len(), 4);

    let receipt = h.ledger.purchase_product(consumer(), id, price()).unwrap();
    assert_eq!(receipt.seller, retailer());
    assert_eq!(receipt.refund, Amount::ZERO);

    let product = h.ledger.get_product(id).unwrap();
    assert_eq!(product.current_state(), ProductState::Sold);
    assert_eq!(product.current_owner(), consumer());
    assert_eq!(product.history().len(), 5);
    assert_eq!(product.history()[4].actor, consumer());
    assert_eq!(product.history()[4].notes, "Purchased");
    assert_eq!(
        h.ledger.get_product_ownership_history(id).unwrap(),
        vec![farmer(), processor(), distributor(), retailer(), consumer()]
    );

    assert_eq!(h.ledger.balance_of(&retailer()).unwrap(), price());
    assert_eq!(
        h.ledger.balance_of(&consumer()).unwrap(),
        Amount::new(ONE_ETHER - price().get())
    );
    assert_eq!(h.ledger.get_actor_products(&consumer()).unwrap(), vec![id]);
    assert!(h.ledger.get_actor_products(&retailer()).unwrap().is_empty());
}

#[test]
fn state_change_history_records_caller_location() {
    let h = harness();
    register_chain(&h.ledger);
    let id = h
        .ledger
        .create_product(farmer(), apples(h.clock.now()))
        .unwrap();
    h.ledger.transfer_product(farmer(), id, processor()).unwrap();
    h.ledger
        .change_product_state(processor(), id, ProductState::Processed, "packaged")
        .unwrap();

    let history = h.ledger.get_product_history(id).unwrap();
    assert_eq!(history[0].location, "Green Valley Farm");
    assert_eq!(history[0].notes, "Created");
    assert_eq!(history[1].location, "Industrial Park, CA");
    assert_eq!(history[1].actor, processor());
}

#[test]
fn overpayment_is_refunded_to_buyer() {
    let h = harness();
    register_chain(&h.ledger);
    h.ledger.fund_account(consumer(), Amount::new(ONE_ETHER)).unwrap();
    let id = deliver_to_retailer(&h);

    let paid = Amount::new(3 * price().get());
    let receipt = h.ledger.purchase_product(consumer(), id, paid).unwrap();
    assert_eq!(receipt.refund, Amount::new(2 * price().get()));
    assert_eq!(
        h.ledger.balance_of(&consumer()).unwrap(),
        Amount::new(ONE_ETHER - price().get())
    );
    assert_eq!(h.ledger.balance_of(&retailer()).unwrap(), price());

    // Settlement events share the purchase's batch.
    let journal = h.store.load_all().unwrap();
    let tail: Vec<_> = journal.iter().rev().take(4).collect();
    let reasons: Vec<TransferReason> = tail
        .iter()
        .filter_map(|e| match LedgerEvent::decode(e).unwrap() {
            LedgerEvent::Account(agrichain_settlement::AccountEvent::AccountCredited(c)) => {
                Some(c.reason)
            }
            LedgerEvent::Account(agrichain_settlement::AccountEvent::AccountDebited(d)) => {
                Some(d.reason)
            }
            _ => None,
        })
        .collect();
    assert!(reasons.contains(&TransferReason::Payment(id)));
    assert!(reasons.contains(&TransferReason::Sale(id)));
    assert!(reasons.contains(&TransferReason::Refund(id)));
}

#[test]
fn failed_purchase_changes_nothing() {
    let h = harness();
    register_chain(&h.ledger);
    h.ledger.fund_account(consumer(), Amount::new(ONE_ETHER)).unwrap();
    let id = deliver_to_retailer(&h);

    let before = h.ledger.snapshot().unwrap();
    let head = h.store.head().unwrap();

    let half = Amount::new(price().get() / 2);
    let err = h.ledger.purchase_product(consumer(), id, half).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Domain(DomainError::InsufficientPayment { .. })
    ));

    // Unfunded buyer: the product decision passes but settlement fails.
    let broke = Address::from_low_u64(99);
    let err = h.ledger.purchase_product(broke, id, price()).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Domain(DomainError::ValueTransferFailed(_))
    ));

    assert_eq!(h.ledger.snapshot().unwrap(), before);
    assert_eq!(h.store.head().unwrap(), head);
    assert_eq!(
        h.ledger.get_product(id).unwrap().current_state(),
        ProductState::Received
    );
}

#[test]
fn purchase_before_received_is_rejected() {
    let h = harness();
    register_chain(&h.ledger);
    h.ledger.fund_account(consumer(), Amount::new(ONE_ETHER)).unwrap();
    let id = h
        .ledger
        .create_product(farmer(), apples(h.clock.now()))
        .unwrap();

    let err = h.ledger.purchase_product(consumer(), id, price()).unwrap_err();
    assert!(matches!(err, LedgerError::Domain(DomainError::NotReadyForSale)));
}

#[test]
fn rejections_follow_check_order() {
    let h = harness();
    register_chain(&h.ledger);
    let now = h.clock.now();
    let stranger = Address::from_low_u64(77);

    let err = h.ledger.create_product(processor(), apples(now)).unwrap_err();
    assert!(matches!(err, LedgerError::Domain(DomainError::NotFarmer)));
    let err = h.ledger.create_product(stranger, apples(now)).unwrap_err();
    assert!(matches!(err, LedgerError::Domain(DomainError::NotAuthorized)));

    let id = h.ledger.create_product(farmer(), apples(now)).unwrap();

    let err = h
        .ledger
        .transfer_product(farmer(), ProductId::new(999), processor())
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Domain(DomainError::ProductNotFound(_))
    ));
    let err = h.ledger.transfer_product(stranger, id, processor()).unwrap_err();
    assert!(matches!(err, LedgerError::Domain(DomainError::NotAuthorized)));
    let err = h.ledger.transfer_product(processor(), id, retailer()).unwrap_err();
    assert!(matches!(err, LedgerError::Domain(DomainError::NotOwner)));
    let err = h.ledger.transfer_product(farmer(), id, stranger).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Domain(DomainError::UnregisteredRecipient)
    ));
    let err = h.ledger.transfer_product(farmer(), id, farmer()).unwrap_err();
    assert!(matches!(err, LedgerError::Domain(DomainError::SelfTransfer)));

    let err = h
        .ledger
        .change_product_state(farmer(), id, ProductState::Shipped, "skip")
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Domain(DomainError::InvalidTransition { from: 0, to: 2 })
    ));
}

#[test]
fn registration_is_once_per_identity() {
    let h = harness();
    h.ledger
        .register_actor(farmer(), "John Farmer", "Green Valley, CA", ActorType::Farmer)
        .unwrap();
    let err = h
        .ledger
        .register_actor(farmer(), "Duplicate Farmer", "Elsewhere", ActorType::Farmer)
        .unwrap_err();
    assert!(matches!(err, LedgerError::Domain(DomainError::AlreadyRegistered)));

    let err = h
        .ledger
        .register_actor(processor(), "", "Nowhere", ActorType::Processor)
        .unwrap_err();
    assert!(matches!(err, LedgerError::Domain(DomainError::EmptyName)));

    assert_eq!(h.ledger.get_total_actors().unwrap(), 1);
    assert!(h.ledger.get_actor(&processor()).unwrap().is_none());
    let actor = h.ledger.get_actor(&farmer()).unwrap().unwrap();
    assert_eq!(actor.name(), "John Farmer");
    assert!(actor.is_active());
}

#[test]
fn listings_preserve_order() {
    let h = harness();
    register_chain(&h.ledger);
    let now = h.clock.now();
    let first = h.ledger.create_product(farmer(), apples(now)).unwrap();
    let second = h.ledger.create_product(farmer(), apples(now)).unwrap();
    h.ledger.transfer_product(farmer(), first, processor()).unwrap();

    assert_eq!(h.ledger.get_all_products().unwrap(), vec![first, second]);
    assert_eq!(h.ledger.get_total_products().unwrap(), 2);
    assert_eq!(h.ledger.get_actor_products(&farmer()).unwrap(), vec![second]);
    assert_eq!(h.ledger.get_actor_products(&processor()).unwrap(), vec![first]);

    let names: Vec<String> = h
        .ledger
        .get_all_actors()
        .unwrap()
        .iter()
        .map(|a| a.name().to_string())
        .collect();
    assert_eq!(
        names,
        vec!["John Farmer", "Fresh Processing Co", "Fast Logistics", "Green Grocer"]
    );
}

#[test]
fn certificates_accumulate() {
    let h = harness();
    register_chain(&h.ledger);
    let id = h
        .ledger
        .create_product(farmer(), apples(h.clock.now()))
        .unwrap();
    h.ledger
        .add_quality_certificate(farmer(), id, "Organic Certification")
        .unwrap();
    h.ledger
        .add_quality_certificate(farmer(), id, "Fair Trade Certification")
        .unwrap();
    assert_eq!(
        h.ledger.get_product(id).unwrap().quality_certificates(),
        "Organic Certification; Fair Trade Certification"
    );

    let err = h
        .ledger
        .add_quality_certificate(processor(), id, "Unauthorized cert")
        .unwrap_err();
    assert!(matches!(err, LedgerError::Domain(DomainError::NotOwner)));
}

#[test]
fn expiry_is_informational() {
    let h = harness();
    register_chain(&h.ledger);
    h.ledger.fund_account(consumer(), Amount::new(ONE_ETHER)).unwrap();
    let id = deliver_to_retailer(&h);
    assert!(!h.ledger.is_product_expired(id).unwrap());

    h.clock.advance(Duration::days(31));
    assert!(h.ledger.is_product_expired(id).unwrap());

    // An expired product can still be sold.
    h.ledger.purchase_product(consumer(), id, price()).unwrap();
    assert_eq!(
        h.ledger.get_product(id).unwrap().current_state(),
        ProductState::Sold
    );
}

#[test]
fn creation_rejects_expiry_not_in_future() {
    let h = harness();
    register_chain(&h.ledger);
    let now = h.clock.now();
    let mut details = apples(now);
    details.expiry_date = now - Duration::seconds(1000);
    let err = h.ledger.create_product(farmer(), details).unwrap_err();
    assert!(matches!(err, LedgerError::Domain(DomainError::ExpiredDate)));

    let mut details = apples(now);
    details.quantity = 0;
    let err = h.ledger.create_product(farmer(), details).unwrap_err();
    assert!(matches!(err, LedgerError::Domain(DomainError::InvalidQuantity)));
}

#[test]
fn ledger_time_never_runs_backwards() {
    let h = harness();
    h.ledger
        .register_actor(farmer(), "John Farmer", "Green Valley, CA", ActorType::Farmer)
        .unwrap();
    let registered_at = h.ledger.get_actor(&farmer()).unwrap().unwrap().registration_date();

    h.clock.advance(Duration::seconds(-3600));
    h.ledger
        .register_actor(processor(), "Fresh Processing Co", "Industrial Park, CA", ActorType::Processor)
        .unwrap();
    let second = h.ledger.get_actor(&processor()).unwrap().unwrap().registration_date();
    assert!(second >= registered_at);
}

#[test]
fn replay_rebuilds_identical_state() {
    let h = harness();
    register_chain(&h.ledger);
    h.ledger.fund_account(consumer(), Amount::new(ONE_ETHER)).unwrap();
    let id = deliver_to_retailer(&h);
    h.ledger
        .add_quality_certificate(retailer(), id, "Organic Certification")
        .unwrap();
    h.ledger.purchase_product(consumer(), id, price()).unwrap();

    let reopened = Ledger::open(h.store.clone(), h.bus.clone(), h.clock.clone()).unwrap();
    assert_eq!(reopened.snapshot().unwrap(), h.ledger.snapshot().unwrap());
    assert_eq!(
        LedgerState::replay(&h.store.load_all().unwrap()).unwrap(),
        h.ledger.snapshot().unwrap()
    );
}

#[test]
fn writers_sharing_a_journal_cannot_interleave() {
    let h = harness();
    let other = Ledger::open(h.store.clone(), h.bus.clone(), h.clock.clone()).unwrap();

    h.ledger
        .register_actor(farmer(), "John Farmer", "Green Valley, CA", ActorType::Farmer)
        .unwrap();

    let err = other
        .register_actor(processor(), "Fresh Processing Co", "Industrial Park, CA", ActorType::Processor)
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(h.store.head().unwrap(), 1);
}

#[test]
fn notifications_follow_commits() {
    let h = harness();
    let sub = h.bus.subscribe();
    register_chain(&h.ledger);
    let id = h
        .ledger
        .create_product(farmer(), apples(h.clock.now()))
        .unwrap();
    h.ledger.transfer_product(farmer(), id, processor()).unwrap();

    let mut received = Vec::new();
    while let Ok(env) = sub.try_recv() {
        received.push(env);
    }
    assert_eq!(received.len(), 5);
    match received[0].payload() {
        LedgerNotification::ActorRegistered { name, actor_type, .. } => {
            assert_eq!(name, "John Farmer");
            assert_eq!(*actor_type, ActorType::Farmer);
        }
        other => panic!("expected ActorRegistered, got {other:?}"),
    }
    match received[4].payload() {
        LedgerNotification::ProductCreated {
            product_id,
            creator,
            ..
        } => {
            assert_eq!(*product_id, id);
            assert_eq!(*creator, farmer());
        }
        other => panic!("expected ProductCreated, got {other:?}"),
    }
    assert!(received.windows(2).all(|w| w[0].position() < w[1].position()));

    // A rejected operation announces nothing.
    let _ = h.ledger.register_actor(farmer(), "Again", "x", ActorType::Farmer);
    assert!(sub.try_recv().is_err());
}
