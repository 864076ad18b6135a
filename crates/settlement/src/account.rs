use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agrichain_core::{Address, Aggregate, AggregateRoot, Amount, DomainError, ProductId};
use agrichain_events::Event;

/// Why value moved in or out of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "product_id", rename_all = "snake_case")]
pub enum TransferReason {
    /// Genesis allocation or faucet credit.
    Funding,
    /// Buyer's attached value leaving their account.
    Payment(ProductId),
    /// Price credited to the seller.
    Sale(ProductId),
    /// Excess over the price returned to the buyer.
    Refund(ProductId),
}

/// Aggregate root: Account (one per identity).
///
/// Balances never go negative and never overflow; both are enforced by `handle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    address: Address,
    balance: Amount,
    version: u64,
}

impl Account {
    /// Empty aggregate for rehydration (zero balance).
    pub fn empty(address: Address) -> Self {
        Self {
            address,
            balance: Amount::ZERO,
            version: 0,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }
}

impl AggregateRoot for Account {
    type Id = Address;

    fn id(&self) -> &Self::Id {
        &self.address
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreditAccount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditAccount {
    pub address: Address,
    pub amount: Amount,
    pub reason: TransferReason,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DebitAccount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitAccount {
    pub address: Address,
    pub amount: Amount,
    pub reason: TransferReason,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountCommand {
    Credit(CreditAccount),
    Debit(DebitAccount),
}

/// Event: AccountCredited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCredited {
    pub address: Address,
    pub amount: Amount,
    pub reason: TransferReason,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AccountDebited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDebited {
    pub address: Address,
    pub amount: Amount,
    pub reason: TransferReason,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountEvent {
    AccountCredited(AccountCredited),
    AccountDebited(AccountDebited),
}

impl AccountEvent {
    pub fn address(&self) -> Address {
        match self {
            AccountEvent::AccountCredited(e) => e.address,
            AccountEvent::AccountDebited(e) => e.address,
        }
    }
}

impl Event for AccountEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AccountEvent::AccountCredited(_) => "settlement.account.credited",
            AccountEvent::AccountDebited(_) => "settlement.account.debited",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AccountEvent::AccountCredited(e) => e.occurred_at,
            AccountEvent::AccountDebited(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Account {
    type Command = AccountCommand;
    type Event = AccountEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        // `handle` has already proven these cannot overflow or underflow.
        match event {
            AccountEvent::AccountCredited(e) => {
                self.balance = Amount::new(self.balance.get().saturating_add(e.amount.get()));
            }
            AccountEvent::AccountDebited(e) => {
                self.balance = Amount::new(self.balance.get().saturating_sub(e.amount.get()));
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AccountCommand::Credit(cmd) => self.handle_credit(cmd),
            AccountCommand::Debit(cmd) => self.handle_debit(cmd),
        }
    }
}

impl Account {
    fn ensure_address(&self, address: Address) -> Result<(), DomainError> {
        if address != self.address {
            return Err(DomainError::value_transfer(format!(
                "command for {address} routed to account {}",
                self.address
            )));
        }
        Ok(())
    }

    fn handle_credit(&self, cmd: &CreditAccount) -> Result<Vec<AccountEvent>, DomainError> {
        self.ensure_address(cmd.address)?;

        // Zero movements leave no trace in the journal.
        if cmd.amount.is_zero() {
            return Ok(vec![]);
        }

        if self.balance.checked_add(cmd.amount).is_none() {
            return Err(DomainError::value_transfer(format!(
                "balance of {} would overflow",
                self.address
            )));
        }

        Ok(vec![AccountEvent::AccountCredited(AccountCredited {
            address: cmd.address,
            amount: cmd.amount,
            reason: cmd.reason,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_debit(&self, cmd: &DebitAccount) -> Result<Vec<AccountEvent>, DomainError> {
        self.ensure_address(cmd.address)?;

        if cmd.amount.is_zero() {
            return Ok(vec![]);
        }

        if self.balance.checked_sub(cmd.amount).is_none() {
            return Err(DomainError::value_transfer(format!(
                "insufficient balance for {} (have {}, need {})",
                self.address, self.balance, cmd.amount
            )));
        }

        Ok(vec![AccountEvent::AccountDebited(AccountDebited {
            address: cmd.address,
            amount: cmd.amount,
            reason: cmd.reason,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> Address {
        Address::from_low_u64(9)
    }

    fn credit(amount: u128) -> AccountCommand {
        AccountCommand::Credit(CreditAccount {
            address: addr(),
            amount: Amount::new(amount),
            reason: TransferReason::Funding,
            occurred_at: Utc::now(),
        })
    }

    fn debit(amount: u128) -> AccountCommand {
        AccountCommand::Debit(DebitAccount {
            address: addr(),
            amount: Amount::new(amount),
            reason: TransferReason::Payment(ProductId::FIRST),
            occurred_at: Utc::now(),
        })
    }

    fn run(account: &mut Account, cmd: AccountCommand) -> Result<(), DomainError> {
        for e in account.handle(&cmd)? {
            account.apply(&e);
        }
        Ok(())
    }

    #[test]
    fn credit_then_debit_moves_balance() {
        let mut account = Account::empty(addr());
        run(&mut account, credit(100)).unwrap();
        run(&mut account, debit(40)).unwrap();
        assert_eq!(account.balance(), Amount::new(60));
        assert_eq!(account.version(), 2);
    }

    #[test]
    fn debit_beyond_balance_fails() {
        let mut account = Account::empty(addr());
        run(&mut account, credit(10)).unwrap();
        let err = account.handle(&debit(11)).unwrap_err();
        assert!(matches!(err, DomainError::ValueTransferFailed(_)));
        assert_eq!(account.balance(), Amount::new(10));
    }

    #[test]
    fn credit_overflow_fails() {
        let mut account = Account::empty(addr());
        run(&mut account, credit(u128::MAX)).unwrap();
        let err = account.handle(&credit(1)).unwrap_err();
        assert!(matches!(err, DomainError::ValueTransferFailed(_)));
    }

    #[test]
    fn zero_amounts_emit_nothing() {
        let account = Account::empty(addr());
        assert!(account.handle(&credit(0)).unwrap().is_empty());
        assert!(account.handle(&debit(0)).unwrap().is_empty());
    }

    #[test]
    fn misrouted_command_is_rejected() {
        let account = Account::empty(Address::from_low_u64(1));
        assert!(account.handle(&credit(5)).is_err());
    }

    #[test]
    fn reason_serializes_with_product_id() {
        let json = serde_json::to_value(TransferReason::Refund(ProductId::new(3))).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "refund", "product_id": 3}));
        let json = serde_json::to_value(TransferReason::Funding).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "funding"}));
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: the balance never goes negative and always equals credits minus
            /// accepted debits.
            #[test]
            fn balance_tracks_accepted_movements(
                ops in proptest::collection::vec((any::<bool>(), 0u128..1_000), 0..50)
            ) {
                let mut account = Account::empty(addr());
                let mut expected: u128 = 0;
                for (is_credit, amount) in ops {
                    let cmd = if is_credit { credit(amount) } else { debit(amount) };
                    match run(&mut account, cmd) {
                        Ok(()) if is_credit => expected += amount,
                        Ok(()) => expected -= amount,
                        Err(_) => prop_assert!(!is_credit && amount > expected),
                    }
                    prop_assert_eq!(account.balance(), Amount::new(expected));
                }
            }
        }
    }
}
