//! Settlement module (value accounts, event-sourced).
//!
//! Per-identity balances in the smallest currency unit, plus the pure computation that
//! turns a product purchase into account movements (payment, sale proceeds, refund).
//! No IO, no persistence concerns.

pub mod account;
pub mod settle;

pub use account::{
    Account, AccountCommand, AccountCredited, AccountDebited, AccountEvent, CreditAccount,
    DebitAccount, TransferReason,
};
pub use settle::{net_effect, settle};
