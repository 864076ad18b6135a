use serde::{Deserialize, Serialize};
use uuid::Uuid;

use agrichain_core::Address;

use crate::stream::StreamId;

/// Envelope for a committed event, carrying journal metadata.
///
/// This is the unit published to notification subscribers.
///
/// Notes:
/// - `position` is the event's place in the ledger's single global total order.
/// - `sequence_number` is the event's place inside its own aggregate stream.
/// - `caller` is the identity the committing operation was attributed to
///   (`None` for environment-level operations such as genesis funding).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    stream: StreamId,

    /// Monotonically increasing position in the global journal.
    position: u64,

    /// Monotonically increasing position in the aggregate stream.
    sequence_number: u64,

    caller: Option<Address>,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        stream: StreamId,
        position: u64,
        sequence_number: u64,
        caller: Option<Address>,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            stream,
            position,
            sequence_number,
            caller,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn stream(&self) -> &StreamId {
        &self.stream
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn caller(&self) -> Option<Address> {
        self.caller
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }
}
