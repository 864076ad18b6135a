//! Append-only journal boundary.
//!
//! Every committed ledger operation lands here as a batch of events; the ledger's
//! materialized state is a pure function of the journal.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
