use std::collections::HashMap;
use std::sync::RwLock;

use agrichain_core::ExpectedVersion;
use agrichain_events::StreamId;

use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Default)]
struct Journal {
    events: Vec<StoredEvent>,
    stream_heads: HashMap<StreamId, u64>,
}

impl Journal {
    fn head(&self) -> u64 {
        self.events.last().map(|e| e.position).unwrap_or(0)
    }
}

/// In-memory append-only journal.
///
/// Intended for tests/dev and single-process deployments; contents are lost on exit.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    journal: RwLock<Journal>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_head: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        for (idx, e) in events.iter().enumerate() {
            if e.stream.aggregate_type.is_empty() || e.stream.key.is_empty() {
                return Err(EventStoreError::InvalidAppend(format!(
                    "event at index {idx} has an incomplete stream id"
                )));
            }
            if e.event_type.is_empty() {
                return Err(EventStoreError::InvalidAppend(format!(
                    "event at index {idx} has no event_type"
                )));
            }
        }

        let mut journal = self.journal.write().map_err(|_| EventStoreError::Poisoned)?;

        let head = journal.head();
        if !expected_head.matches(head) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_head:?}, found head {head}"
            )));
        }

        // Everything below is infallible, so the batch lands whole.
        let mut position = head;
        let mut committed = Vec::with_capacity(events.len());
        for e in events {
            position += 1;
            let sequence_number = {
                let stream_head = journal.stream_heads.entry(e.stream.clone()).or_insert(0);
                *stream_head += 1;
                *stream_head
            };
            let stored = StoredEvent {
                event_id: e.event_id,
                stream: e.stream,
                position,
                sequence_number,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                caller: e.caller,
                payload: e.payload,
            };
            journal.events.push(stored.clone());
            committed.push(stored);
        }

        Ok(committed)
    }

    fn load_stream(&self, stream: &StreamId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let journal = self.journal.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(journal
            .events
            .iter()
            .filter(|e| &e.stream == stream)
            .cloned()
            .collect())
    }

    fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
        let journal = self.journal.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(journal.events.clone())
    }

    fn head(&self) -> Result<u64, EventStoreError> {
        let journal = self.journal.read().map_err(|_| EventStoreError::Poisoned)?;
        Ok(journal.head())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn event(stream: &StreamId, event_type: &str) -> UncommittedEvent {
        UncommittedEvent {
            event_id: Uuid::now_v7(),
            stream: stream.clone(),
            event_type: event_type.to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            caller: None,
            payload: serde_json::json!({}),
        }
    }

    #[test]
    fn batch_spanning_streams_gets_global_and_stream_positions() {
        let store = InMemoryEventStore::new();
        let product = StreamId::new("products.product", 1u64);
        let account = StreamId::new("settlement.account", "0xabc");

        store
            .append(vec![event(&product, "created")], ExpectedVersion::Exact(0))
            .unwrap();
        let committed = store
            .append(
                vec![event(&product, "purchased"), event(&account, "credited")],
                ExpectedVersion::Exact(1),
            )
            .unwrap();

        assert_eq!(committed[0].position, 2);
        assert_eq!(committed[0].sequence_number, 2);
        assert_eq!(committed[1].position, 3);
        assert_eq!(committed[1].sequence_number, 1);
        assert_eq!(store.head().unwrap(), 3);
        assert_eq!(store.load_stream(&product).unwrap().len(), 2);
        assert_eq!(store.load_all().unwrap().len(), 3);
    }

    #[test]
    fn stale_head_is_rejected_without_effect() {
        let store = InMemoryEventStore::new();
        let stream = StreamId::new("actors.actor", "0x01");
        store
            .append(vec![event(&stream, "registered")], ExpectedVersion::Exact(0))
            .unwrap();

        let err = store
            .append(vec![event(&stream, "registered")], ExpectedVersion::Exact(0))
            .unwrap_err();
        assert!(matches!(err, EventStoreError::Concurrency(_)));
        assert_eq!(store.head().unwrap(), 1);
    }

    #[test]
    fn invalid_event_rejects_whole_batch() {
        let store = InMemoryEventStore::new();
        let stream = StreamId::new("actors.actor", "0x01");
        let err = store
            .append(
                vec![event(&stream, "registered"), event(&stream, "")],
                ExpectedVersion::Any,
            )
            .unwrap_err();
        assert!(matches!(err, EventStoreError::InvalidAppend(_)));
        assert_eq!(store.head().unwrap(), 0);
        assert!(store.load_stream(&stream).unwrap().is_empty());
    }
}
