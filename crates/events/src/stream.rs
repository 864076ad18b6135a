use serde::{Deserialize, Serialize};

/// Address of one aggregate's stream inside the journal.
///
/// `aggregate_type` selects the event schema used to decode the stream on replay;
/// `key` is the aggregate identifier rendered as text (an address, a product id).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StreamId {
    pub aggregate_type: String,
    pub key: String,
}

impl StreamId {
    pub fn new(aggregate_type: impl Into<String>, key: impl ToString) -> Self {
        Self {
            aggregate_type: aggregate_type.into(),
            key: key.to_string(),
        }
    }
}

impl core::fmt::Display for StreamId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.aggregate_type, self.key)
    }
}
