use chrono::{DateTime, Utc};

/// A domain event recorded in the ledger journal.
///
/// Events are immutable facts, versioned for schema evolution and append-only.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "products.product.transferred").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// Ledger time at which the operation that produced the event committed.
    fn occurred_at(&self) -> DateTime<Utc>;
}
