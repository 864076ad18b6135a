//! Purchase settlement: turn a decided purchase into account movements.

use std::collections::BTreeMap;

use agrichain_core::{Address, Aggregate, Amount, DomainError};
use agrichain_products::ProductPurchased;

use crate::account::{
    Account, AccountCommand, AccountEvent, CreditAccount, DebitAccount, TransferReason,
};

/// Compute the account events for a purchase.
///
/// Steps run in order against working copies of the accounts:
/// 1. debit the buyer the full attached value (fails if the buyer cannot cover it)
/// 2. credit the seller the price (fails on overflow)
/// 3. credit the buyer the refund
///
/// The first failing step fails the whole settlement and nothing is returned. When
/// buyer and seller are the same identity the steps share one working copy, so the
/// net effect is zero.
pub fn settle(
    purchase: &ProductPurchased,
    buyer: &Account,
    seller: &Account,
) -> Result<Vec<AccountEvent>, DomainError> {
    let mut working: BTreeMap<Address, Account> = BTreeMap::new();
    working.insert(buyer.address(), buyer.clone());
    working
        .entry(seller.address())
        .or_insert_with(|| seller.clone());

    let product_id = purchase.product_id;
    let at = purchase.occurred_at;

    let steps = [
        AccountCommand::Debit(DebitAccount {
            address: purchase.buyer,
            amount: purchase.paid,
            reason: TransferReason::Payment(product_id),
            occurred_at: at,
        }),
        AccountCommand::Credit(CreditAccount {
            address: purchase.seller,
            amount: purchase.price,
            reason: TransferReason::Sale(product_id),
            occurred_at: at,
        }),
        AccountCommand::Credit(CreditAccount {
            address: purchase.buyer,
            amount: purchase.refund,
            reason: TransferReason::Refund(product_id),
            occurred_at: at,
        }),
    ];

    let mut events = Vec::new();
    for cmd in steps {
        let address = match &cmd {
            AccountCommand::Credit(c) => c.address,
            AccountCommand::Debit(d) => d.address,
        };
        let account = working
            .entry(address)
            .or_insert_with(|| Account::empty(address));
        let decided = account.handle(&cmd)?;
        for e in &decided {
            account.apply(e);
        }
        events.extend(decided);
    }

    Ok(events)
}

/// Net balance change per identity described by a batch of account events.
pub fn net_effect(events: &[AccountEvent]) -> BTreeMap<Address, i128> {
    let mut net: BTreeMap<Address, i128> = BTreeMap::new();
    for e in events {
        let (address, delta) = match e {
            AccountEvent::AccountCredited(c) => (c.address, signed(c.amount)),
            AccountEvent::AccountDebited(d) => (d.address, -signed(d.amount)),
        };
        *net.entry(address).or_default() += delta;
    }
    net
}

fn signed(amount: Amount) -> i128 {
    i128::try_from(amount.get()).unwrap_or(i128::MAX)
}
