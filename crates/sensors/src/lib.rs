//! IoT sensor relay model.
//!
//! Readings posted by field devices (temperature/humidity probes attached to a
//! product's batch) and the pure read-side summaries built from them. Independent of
//! the ledger: a reading names a product id but is never checked against it.

pub mod reading;
pub mod summary;

pub use reading::{DEFAULT_SENSOR_TYPE, DeviceStatus, DeviceView, NewReading, SensorReading};
pub use summary::{
    DeviceList, EnvironmentalOverview, ProductEnvironmental, ProductOverview, RelayStatistics,
};
