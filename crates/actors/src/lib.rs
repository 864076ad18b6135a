//! Actor registry domain module (event-sourced).
//!
//! Supply-chain participants register once, under their caller identity, with a
//! declared role. Implemented purely as deterministic domain logic (no IO, no HTTP,
//! no storage).

pub mod actor;

pub use actor::{Actor, ActorCommand, ActorEvent, ActorRegistered, ActorType, RegisterActor};
