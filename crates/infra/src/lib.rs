//! Infrastructure layer: journal, clock, the transactional ledger and the sensor
//! relay store.

pub mod clock;
pub mod event_store;
pub mod ledger;
pub mod notification;
pub mod sensor_store;

#[cfg(test)]
mod integration_tests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ledger::{Ledger, LedgerError, LedgerEvent, LedgerState};
pub use notification::{LedgerNotification, NotificationEnvelope};
pub use sensor_store::{
    InMemorySensorStore, RecordOutcome, SensorStore, SensorStoreConfig, SensorStoreError,
};
