//! Storage for the IoT sensor relay.
//!
//! Independent of the ledger: its own lock, no journal, contents lost on restart.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::info;

use agrichain_core::{DomainError, ProductId};
use agrichain_sensors::{
    DeviceList, DeviceView, EnvironmentalOverview, NewReading, ProductEnvironmental,
    ProductOverview, RelayStatistics, SensorReading,
};

use crate::clock::Clock;

#[derive(Debug, Error)]
pub enum SensorStoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("sensor store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorStoreConfig {
    /// A device is online if it reported within this window.
    pub online_window: Duration,
    /// Readings retained per product (oldest dropped first).
    pub history_limit: usize,
}

impl Default for SensorStoreConfig {
    fn default() -> Self {
        Self {
            online_window: Duration::seconds(120),
            history_limit: 100,
        }
    }
}

/// Result of storing one reading.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    pub reading: SensorReading,
    /// Readings now retained for the reading's product.
    pub readings_stored: usize,
}

pub trait SensorStore: Send + Sync {
    fn record(&self, reading: NewReading) -> Result<RecordOutcome, SensorStoreError>;

    /// Unknown products yield an empty summary.
    fn product_environmental(
        &self,
        product_id: ProductId,
    ) -> Result<ProductEnvironmental, SensorStoreError>;

    fn device(&self, device_id: &str) -> Result<DeviceView, SensorStoreError>;

    fn devices(&self) -> Result<DeviceList, SensorStoreError>;

    fn environmental_overview(&self) -> Result<EnvironmentalOverview, SensorStoreError>;

    fn statistics(&self) -> Result<RelayStatistics, SensorStoreError>;
}

impl<T> SensorStore for Arc<T>
where
    T: SensorStore + ?Sized,
{
    fn record(&self, reading: NewReading) -> Result<RecordOutcome, SensorStoreError> {
        (**self).record(reading)
    }

    fn product_environmental(
        &self,
        product_id: ProductId,
    ) -> Result<ProductEnvironmental, SensorStoreError> {
        (**self).product_environmental(product_id)
    }

    fn device(&self, device_id: &str) -> Result<DeviceView, SensorStoreError> {
        (**self).device(device_id)
    }

    fn devices(&self) -> Result<DeviceList, SensorStoreError> {
        (**self).devices()
    }

    fn environmental_overview(&self) -> Result<EnvironmentalOverview, SensorStoreError> {
        (**self).environmental_overview()
    }

    fn statistics(&self) -> Result<RelayStatistics, SensorStoreError> {
        (**self).statistics()
    }
}

#[derive(Debug, Default)]
struct Readings {
    latest_by_device: HashMap<String, SensorReading>,
    device_order: Vec<String>,
    by_product: BTreeMap<ProductId, VecDeque<SensorReading>>,
}

impl Readings {
    fn devices_in_order(&self) -> impl Iterator<Item = &SensorReading> {
        self.device_order
            .iter()
            .filter_map(|d| self.latest_by_device.get(d))
    }
}

pub struct InMemorySensorStore {
    config: SensorStoreConfig,
    clock: Arc<dyn Clock>,
    started_at: DateTime<Utc>,
    readings: RwLock<Readings>,
}

impl core::fmt::Debug for InMemorySensorStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemorySensorStore")
            .field("config", &self.config)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

impl InMemorySensorStore {
    pub fn new(config: SensorStoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            started_at: clock.now(),
            clock,
            readings: RwLock::new(Readings::default()),
        }
    }

    pub fn config(&self) -> SensorStoreConfig {
        self.config
    }
}

impl SensorStore for InMemorySensorStore {
    fn record(&self, reading: NewReading) -> Result<RecordOutcome, SensorStoreError> {
        let reading = reading.into_reading(self.clock.now())?;
        let mut readings = self.readings.write().map_err(|_| SensorStoreError::Poisoned)?;

        if !readings.latest_by_device.contains_key(&reading.device_id) {
            readings.device_order.push(reading.device_id.clone());
        }
        readings
            .latest_by_device
            .insert(reading.device_id.clone(), reading.clone());

        let history = readings.by_product.entry(reading.product_id).or_default();
        history.push_back(reading.clone());
        while history.len() > self.config.history_limit {
            history.pop_front();
        }
        let readings_stored = history.len();

        info!(
            device_id = %reading.device_id,
            product_id = %reading.product_id,
            temperature = reading.temperature,
            humidity = reading.humidity,
            quality = reading.quality.as_deref().unwrap_or("-"),
            readings_stored,
            "sensor reading stored"
        );

        Ok(RecordOutcome {
            reading,
            readings_stored,
        })
    }

    fn product_environmental(
        &self,
        product_id: ProductId,
    ) -> Result<ProductEnvironmental, SensorStoreError> {
        let readings = self.readings.read().map_err(|_| SensorStoreError::Poisoned)?;
        let history: Vec<SensorReading> = readings
            .by_product
            .get(&product_id)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default();
        Ok(ProductEnvironmental::from_history(product_id, &history))
    }

    fn device(&self, device_id: &str) -> Result<DeviceView, SensorStoreError> {
        let readings = self.readings.read().map_err(|_| SensorStoreError::Poisoned)?;
        let reading = readings
            .latest_by_device
            .get(device_id)
            .cloned()
            .ok_or_else(|| DomainError::DeviceNotFound(device_id.to_string()))?;
        Ok(DeviceView::new(reading, self.clock.now(), self.config.online_window))
    }

    fn devices(&self) -> Result<DeviceList, SensorStoreError> {
        let readings = self.readings.read().map_err(|_| SensorStoreError::Poisoned)?;
        let now = self.clock.now();
        let views = readings
            .devices_in_order()
            .map(|r| DeviceView::new(r.clone(), now, self.config.online_window))
            .collect();
        Ok(DeviceList::new(views))
    }

    fn environmental_overview(&self) -> Result<EnvironmentalOverview, SensorStoreError> {
        let readings = self.readings.read().map_err(|_| SensorStoreError::Poisoned)?;
        let products = readings
            .by_product
            .iter()
            .map(|(id, history)| {
                let history: Vec<SensorReading> = history.iter().cloned().collect();
                ProductOverview::from_history(*id, &history)
            })
            .collect();
        Ok(EnvironmentalOverview::new(products))
    }

    fn statistics(&self) -> Result<RelayStatistics, SensorStoreError> {
        let readings = self.readings.read().map_err(|_| SensorStoreError::Poisoned)?;
        let now = self.clock.now();
        let active_devices = readings
            .devices_in_order()
            .filter(|r| {
                DeviceView::new((*r).clone(), now, self.config.online_window).is_online()
            })
            .count();

        Ok(RelayStatistics {
            total_products: readings.by_product.len(),
            total_devices: readings.latest_by_device.len(),
            active_devices,
            total_readings: readings.by_product.values().map(VecDeque::len).sum(),
            uptime: RelayStatistics::uptime_secs(self.started_at, now),
            server_started: self.started_at,
        })
    }
}
