//! `agrichain-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the registry, the product
//! ledger and settlement (no infrastructure concerns).

pub mod aggregate;
pub mod amount;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use amount::Amount;
pub use error::{DomainError, DomainResult, ErrorCategory};
pub use id::{Address, ProductId};
pub use value_object::ValueObject;
