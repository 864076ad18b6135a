//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values: two
/// [`Amount`](crate::Amount)s of 100 are the same amount, two
/// [`Address`](crate::Address)es with the same bytes are the same identity reference.
/// Records with continuity over time (actors, products) are aggregates instead.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
