use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use agrichain_core::{Address, ExpectedVersion};
use agrichain_events::{EventEnvelope, StreamId};
use std::sync::Arc;

/// An event ready to be appended to the journal (not yet positioned).
///
/// Built from a typed domain event with [`UncommittedEvent::from_typed`], which
/// serializes the payload and captures the metadata needed to decode it on replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub stream: StreamId,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,
    pub caller: Option<Address>,

    pub payload: JsonValue,
}

/// An event committed to the journal.
///
/// ## Positions
///
/// - `position`: place in the journal's single global order (1, 2, 3, ...). Every
///   committed operation occupies a contiguous run of positions.
/// - `sequence_number`: place inside the event's own stream (1, 2, 3, ...).
///
/// Neither ever changes once assigned, and neither has gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub stream: StreamId,

    pub position: u64,
    pub sequence_number: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,
    pub caller: Option<Address>,

    pub payload: JsonValue,
}

impl StoredEvent {
    /// Wrap an arbitrary payload with this event's journal metadata.
    pub fn envelope<M>(&self, payload: M) -> EventEnvelope<M> {
        EventEnvelope::new(
            self.event_id,
            self.stream.clone(),
            self.position,
            self.sequence_number,
            self.caller,
            payload,
        )
    }
}

/// Journal operation error.
///
/// These are infrastructure errors, kept apart from the deterministic domain errors.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// The journal head moved since the writer last looked at it.
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("journal lock poisoned")]
    Poisoned,
}

/// Append-only journal of committed ledger events.
///
/// ## Append semantics
///
/// `append()`:
/// - checks `expected_head` against the current global head position
/// - accepts a batch spanning any number of streams
/// - assigns positions `head + 1 ..` and per-stream sequence numbers
/// - persists the whole batch or nothing
///
/// ## Load semantics
///
/// `load_all()` returns every event in position order; `load_stream()` returns one
/// stream in sequence order (empty if the stream does not exist).
pub trait EventStore: Send + Sync {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_head: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    fn load_stream(&self, stream: &StreamId) -> Result<Vec<StoredEvent>, EventStoreError>;

    fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Position of the last committed event (0 for an empty journal).
    fn head(&self) -> Result<u64, EventStoreError>;
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_head: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).append(events, expected_head)
    }

    fn load_stream(&self, stream: &StreamId) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_stream(stream)
    }

    fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_all()
    }

    fn head(&self) -> Result<u64, EventStoreError> {
        (**self).head()
    }
}

impl UncommittedEvent {
    /// Convenience constructor from a typed domain event.
    pub fn from_typed<E>(
        stream: StreamId,
        event_id: Uuid,
        caller: Option<Address>,
        event: &E,
    ) -> Result<Self, EventStoreError>
    where
        E: agrichain_events::Event + Serialize,
    {
        let payload = serde_json::to_value(event)
            .map_err(|e| EventStoreError::InvalidAppend(format!("payload serialization failed: {e}")))?;

        Ok(Self {
            event_id,
            stream,
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            caller,
            payload,
        })
    }
}
